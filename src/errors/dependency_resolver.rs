use std::any::TypeId;

use super::{instantiate::InstantiateErrorKind, instantiator::InstantiatorErrorKind};
use crate::any::TypeInfo;

fn while_instantiating(requester: &Option<TypeInfo>) -> String {
    match requester {
        Some(requester) => format!(" while instantiating '{requester}'"),
        None => String::new(),
    }
}

fn render_path(path: &[TypeInfo]) -> String {
    path.iter().map(TypeInfo::short_name).collect::<Vec<_>>().join(" -> ")
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Failed to locate registration for '{identity}'{}", while_instantiating(.requester))]
    UnregisteredDependency {
        identity: TypeInfo,
        requester: Option<TypeInfo>,
    },
    #[error("Cyclic dependency detected: {identity} ({})", render_path(.path))]
    CyclicDependency { identity: TypeInfo, path: Vec<TypeInfo> },
    #[error("Scoped service '{identity}' can only be resolved from a scope")]
    ScopeRequired { identity: TypeInfo },
    #[error("Incorrect type of '{expected}' in cache")]
    IncorrectType { expected: TypeInfo, actual: TypeId },
    #[error(transparent)]
    Instantiator(InstantiatorErrorKind<Box<ResolveErrorKind>, InstantiateErrorKind>),
}

impl ResolveErrorKind {
    /// Innermost error, skipping the wrapping added by every constructor on the way down.
    #[must_use]
    pub fn root_cause(&self) -> &ResolveErrorKind {
        match self {
            Self::Instantiator(InstantiatorErrorKind::Deps(inner)) => inner.root_cause(),
            Self::Instantiator(InstantiatorErrorKind::Factory(InstantiateErrorKind::Resolve(inner))) => inner.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResolveErrorKind;
    use crate::{
        any::TypeInfo,
        errors::{InstantiateErrorKind, InstantiatorErrorKind},
    };

    struct Database;
    struct Repository;

    #[test]
    fn test_unregistered_message_names_requester() {
        let err = ResolveErrorKind::UnregisteredDependency {
            identity: TypeInfo::of::<Database>(),
            requester: Some(TypeInfo::of::<Repository>()),
        };
        let message = err.to_string();

        assert!(message.starts_with("Failed to locate registration for '"));
        assert!(message.contains("Database"));
        assert!(message.contains("while instantiating"));
        assert!(message.contains("Repository"));
    }

    #[test]
    fn test_cyclic_message() {
        let err = ResolveErrorKind::CyclicDependency {
            identity: TypeInfo::of::<Database>(),
            path: vec![TypeInfo::of::<Database>(), TypeInfo::of::<Repository>(), TypeInfo::of::<Database>()],
        };

        assert!(err.to_string().starts_with("Cyclic dependency detected: "));
        assert!(err.to_string().contains("Database -> Repository -> Database"));
    }

    #[test]
    fn test_root_cause() {
        let inner = ResolveErrorKind::ScopeRequired {
            identity: TypeInfo::of::<Database>(),
        };
        let wrapped = ResolveErrorKind::Instantiator(InstantiatorErrorKind::Factory(InstantiateErrorKind::Resolve(Box::new(
            ResolveErrorKind::Instantiator(InstantiatorErrorKind::Deps(Box::new(inner))),
        ))));

        assert!(matches!(wrapped.root_cause(), ResolveErrorKind::ScopeRequired { .. }));
    }
}
