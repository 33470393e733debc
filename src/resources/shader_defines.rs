//! Custom `#define`s attached to a material.
//!
//! They are emitted after the generated prefix of both shader stages and
//! enter the program code, so two materials share a program only when their
//! custom defines agree. Entries are ordered by name, giving the same code for
//! the same set whatever the insertion order.
//!
//! ```rust,ignore
//! let mut defines = ShaderDefines::new();
//! defines.set("MAX_STEPS", "8");
//! defines.set_flag("USE_UV_OFFSET");
//! assert_eq!(defines.to_glsl_lines(), ["#define MAX_STEPS 8", "#define USE_UV_OFFSET"]);
//! ```

use std::fmt::Write as _;
use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};
use smallvec::SmallVec;

/// Define names and values are few and repeat across materials.
static DEFINE_STRINGS: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

type Symbol = Spur;

fn intern(s: &str) -> Symbol {
    DEFINE_STRINGS.get_or_intern(s)
}

fn resolve(symbol: Symbol) -> &'static str {
    DEFINE_STRINGS.resolve(&symbol)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderDefines {
    entries: SmallVec<[(Symbol, Symbol); 4]>,
}

impl ShaderDefines {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, name: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|&(key, _)| resolve(key).cmp(name))
    }

    /// Defines `name` as `value`, replacing an earlier value.
    pub fn set(&mut self, name: &str, value: &str) {
        let value = intern(value);
        match self.find(name) {
            Ok(at) => self.entries[at].1 = value,
            Err(at) => self.entries.insert(at, (intern(name), value)),
        }
    }

    /// Defines `name` without a value, for `#ifdef` tests.
    pub fn set_flag(&mut self, name: &str) {
        self.set(name, "");
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.find(name).map(|at| self.entries.remove(at)).is_ok()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static str> {
        let at = self.find(name).ok()?;
        Some(resolve(self.entries[at].1))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(name, value)` pairs by name.
    pub fn iter_strings(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries
            .iter()
            .map(|&(name, value)| (resolve(name), resolve(value)))
    }

    #[must_use]
    pub fn to_glsl_lines(&self) -> Vec<String> {
        self.iter_strings()
            .map(|(name, value)| {
                if value.is_empty() {
                    format!("#define {name}")
                } else {
                    format!("#define {name} {value}")
                }
            })
            .collect()
    }

    /// Appends `,name,value` per entry to a program code string.
    pub fn write_key(&self, code: &mut String) {
        for (name, value) in self.iter_strings() {
            let _ = write!(code, ",{name},{value}");
        }
    }
}

impl<'a> Extend<(&'a str, &'a str)> for ShaderDefines {
    fn extend<I: IntoIterator<Item = (&'a str, &'a str)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.set(name, value);
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for ShaderDefines {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut defines = Self::new();
        defines.extend(iter);
        defines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_does_not_matter() {
        let a: ShaderDefines = [("ZETA", "1"), ("ALPHA", "2")].into_iter().collect();
        let b: ShaderDefines = [("ALPHA", "2"), ("ZETA", "1")].into_iter().collect();
        assert_eq!(a, b);

        let (mut key_a, mut key_b) = (String::new(), String::new());
        a.write_key(&mut key_a);
        b.write_key(&mut key_b);
        assert_eq!(key_a, ",ALPHA,2,ZETA,1");
        assert_eq!(key_a, key_b);
    }

    #[test]
    fn set_replaces_and_remove_forgets() {
        let mut defines = ShaderDefines::new();
        defines.set("STEPS", "4");
        defines.set("STEPS", "8");
        assert_eq!(defines.len(), 1);
        assert_eq!(defines.get("STEPS"), Some("8"));

        assert!(defines.remove("STEPS"));
        assert!(!defines.remove("STEPS"));
        assert!(defines.is_empty());
    }

    #[test]
    fn flags_render_without_a_value() {
        let mut defines = ShaderDefines::new();
        defines.set_flag("USE_UV_OFFSET");
        defines.set("PI2", "6.28");
        assert!(defines.contains("USE_UV_OFFSET"));
        assert_eq!(
            defines.to_glsl_lines(),
            ["#define PI2 6.28", "#define USE_UV_OFFSET"]
        );
    }
}
