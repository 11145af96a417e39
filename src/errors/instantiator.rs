/// Which side of an activation failed: resolving a constructor argument, or the
/// factory/constructor itself. Both sides display as the inner error.
#[derive(thiserror::Error, Debug)]
pub enum InstantiatorErrorKind<D, F> {
    /// A constructor parameter could not be resolved.
    #[error(transparent)]
    Deps(D),
    #[error(transparent)]
    Factory(F),
}

impl<D, F> InstantiatorErrorKind<D, F> {
    #[inline]
    #[must_use]
    pub const fn is_deps(&self) -> bool {
        matches!(self, Self::Deps(_))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::InstantiatorErrorKind;
    use crate::{
        any::TypeInfo,
        errors::{InstantiateErrorKind, ResolveErrorKind},
    };

    struct Session;

    type Kind = InstantiatorErrorKind<Box<ResolveErrorKind>, InstantiateErrorKind>;

    #[test]
    fn test_display_forwards_inner() {
        let deps: Kind = InstantiatorErrorKind::Deps(Box::new(ResolveErrorKind::ScopeRequired {
            identity: TypeInfo::of::<Session>(),
        }));
        assert!(deps.is_deps());
        assert!(deps.to_string().ends_with("can only be resolved from a scope"));

        let factory: Kind = InstantiatorErrorKind::Factory(InstantiateErrorKind::MissingArgument { name: "session" });
        assert!(!factory.is_deps());
        assert_eq!(factory.to_string(), "Argument `session` was not provided to the constructor");
        assert!(factory.source().is_none());
    }
}
