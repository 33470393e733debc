use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;

use super::properties::GlProperties;
use crate::errors::Result;
use crate::resources::BufferGeometry;
use crate::scene::{ObjectGeometry, RenderObject};

/// Resolves the [`BufferGeometry`] drawn for an object.
///
/// Flat geometries are used as-is. Legacy geometries are converted once
/// through [`BufferGeometry::set_from_object`] and the result is memoized by
/// the source geometry's identity.
#[derive(Default)]
pub struct GlGeometries {
    geometries: GlProperties<Rc<RefCell<BufferGeometry>>>,
}

impl GlGeometries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, object: &RenderObject) -> Result<Rc<RefCell<BufferGeometry>>> {
        let uuid = object.geometry.uuid();
        if let Some(geometry) = self.geometries.get(&uuid) {
            return Ok(Rc::clone(geometry));
        }

        let geometry = match &object.geometry {
            ObjectGeometry::Buffer(geometry) => Rc::clone(geometry),
            ObjectGeometry::Legacy(legacy) => {
                let mut derived = BufferGeometry::new();
                derived.set_from_object(&object.kind, &legacy.borrow())?;
                log::debug!("Derived buffer geometry for legacy geometry {uuid}");
                Rc::new(RefCell::new(derived))
            }
        };
        self.geometries
            .get_or_insert_with(uuid, || Rc::clone(&geometry));
        Ok(geometry)
    }

    #[must_use]
    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.geometries.contains(uuid)
    }

    /// Forgets the geometry registered under `uuid`, returning what was drawn.
    pub fn remove(&mut self, uuid: &Uuid) -> Option<Rc<RefCell<BufferGeometry>>> {
        self.geometries.remove(uuid)
    }

    /// Geometries currently registered.
    #[must_use]
    pub fn count(&self) -> usize {
        self.geometries.len()
    }

    pub fn clear(&mut self) {
        self.geometries.clear();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::resources::{Face3, Geometry};

    fn triangle() -> Geometry {
        let mut geometry = Geometry::new();
        geometry.vertices = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        geometry.faces.push(Face3::new(0, 1, 2));
        geometry
    }

    #[test]
    fn legacy_geometry_is_derived_once() {
        let object = RenderObject::mesh(triangle());
        let mut geometries = GlGeometries::new();

        let first = geometries.get(&object).unwrap();
        let second = geometries.get(&object).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.borrow().attribute("position").unwrap().count(), 3);
        assert_eq!(geometries.count(), 1);
    }

    #[test]
    fn buffer_geometry_is_returned_as_is() {
        let object = RenderObject::mesh(BufferGeometry::new());
        let ObjectGeometry::Buffer(source) = &object.geometry else {
            unreachable!()
        };
        let mut geometries = GlGeometries::new();
        assert!(Rc::ptr_eq(&geometries.get(&object).unwrap(), source));
    }

    #[test]
    fn objects_sharing_a_geometry_share_the_derivation() {
        let object = RenderObject::mesh(triangle());
        let twin = RenderObject::new(object.kind.clone(), object.geometry.clone());
        let mut geometries = GlGeometries::new();
        let a = geometries.get(&object).unwrap();
        let b = geometries.get(&twin).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }
}
