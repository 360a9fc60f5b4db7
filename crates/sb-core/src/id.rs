use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Next suffix handed out by [`ElementId::with_prefix`]. Shared by all
/// prefixes and never rewound.
static NEXT_SUFFIX: AtomicU64 = AtomicU64::new(1);

/// Interned element identifier. Copy, and compares as a `u32`.
///
/// Generated ids are unique for the lifetime of the process, so an id that
/// belonged to a deleted element is never handed out again.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(Spur);

impl ElementId {
    pub fn intern(s: &str) -> Self {
        Self(INTERNER.get_or_intern(s))
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Fresh `<prefix>_<n>` id, e.g. `rect_7`.
    ///
    /// Suffixes whose name is already interned (say a template shipped its
    /// own `rect_3`) are skipped.
    pub fn with_prefix(prefix: &str) -> Self {
        loop {
            let name = format!("{prefix}_{}", NEXT_SUFFIX.fetch_add(1, Ordering::Relaxed));
            if INTERNER.get(&name).is_none() {
                return Self::intern(&name);
            }
        }
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self::intern(s)
    }
}

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Ok(Self::intern(&s))
    }
}
