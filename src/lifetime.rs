use std::fmt::{self, Display, Formatter};

/// Policy controlling how instances of a registered service are reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Lifetime {
    /// One instance per [`crate::Provider`], built eagerly when the provider is built.
    Singleton,
    /// A new instance for every resolve.
    Transient,
    /// One instance per [`crate::Scope`]. Resolving it on a provider is an error.
    Scoped,
}

impl Lifetime {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Transient => "transient",
            Lifetime::Scoped => "scoped",
        }
    }

    /// Returns `true` if resolved instances are cached somewhere (provider or scope).
    #[inline]
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::Scoped)
    }
}

impl Display for Lifetime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
