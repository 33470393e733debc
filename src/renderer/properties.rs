use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use uuid::Uuid;

new_key_type! {
    /// Generational handle of one property bag.
    pub struct PropertyKey;
}

/// Per-object renderer state, keyed by the engine object's [`Uuid`].
///
/// Bags live in a generational arena; the uuid table only maps identities to
/// arena slots. Removing an entry drops its value, so GPU wrappers stored
/// inside release their native objects right there.
pub struct GlProperties<T> {
    entries: SlotMap<PropertyKey, (Uuid, T)>,
    lookup: FxHashMap<Uuid, PropertyKey>,
}

impl<T> Default for GlProperties<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> GlProperties<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            lookup: FxHashMap::default(),
        }
    }

    /// The bag for `uuid`, created with `init` if absent.
    pub fn get_or_insert_with(&mut self, uuid: Uuid, init: impl FnOnce() -> T) -> &mut T {
        let key = match self.lookup.get(&uuid) {
            Some(&key) => key,
            None => {
                let key = self.entries.insert((uuid, init()));
                self.lookup.insert(uuid, key);
                key
            }
        };
        &mut self.entries[key].1
    }

    pub fn get(&self, uuid: &Uuid) -> Option<&T> {
        let key = self.lookup.get(uuid)?;
        self.entries.get(*key).map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, uuid: &Uuid) -> Option<&mut T> {
        let key = self.lookup.get(uuid)?;
        self.entries.get_mut(*key).map(|(_, value)| value)
    }

    #[must_use]
    pub fn key(&self, uuid: &Uuid) -> Option<PropertyKey> {
        self.lookup.get(uuid).copied()
    }

    /// Looks a bag up by handle; stale handles resolve to `None`.
    #[must_use]
    pub fn by_key(&self, key: PropertyKey) -> Option<&T> {
        self.entries.get(key).map(|(_, value)| value)
    }

    #[must_use]
    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.lookup.contains_key(uuid)
    }

    pub fn remove(&mut self, uuid: &Uuid) -> Option<T> {
        let key = self.lookup.remove(uuid)?;
        self.entries.remove(key).map(|(_, value)| value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &T)> {
        self.entries.values().map(|(uuid, value)| (uuid, value))
    }

    /// Drops every bag.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lookup.clear();
    }
}

impl<T: Default> GlProperties<T> {
    /// The bag for `uuid`, default-created if absent.
    pub fn entry(&mut self, uuid: Uuid) -> &mut T {
        self.get_or_insert_with(uuid, T::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_is_created_once() {
        let mut properties: GlProperties<u32> = GlProperties::new();
        let id = Uuid::new_v4();
        *properties.entry(id) += 1;
        *properties.entry(id) += 1;
        assert_eq!(properties.get(&id), Some(&2));
        assert_eq!(properties.len(), 1);
    }

    #[test]
    fn removed_key_goes_stale() {
        let mut properties: GlProperties<&str> = GlProperties::new();
        let id = Uuid::new_v4();
        properties.get_or_insert_with(id, || "bag");
        let key = properties.key(&id).unwrap();
        assert_eq!(properties.remove(&id), Some("bag"));
        assert!(properties.by_key(key).is_none());
        assert!(!properties.contains(&id));

        properties.get_or_insert_with(id, || "again");
        assert_ne!(properties.key(&id), Some(key));
    }
}
