use super::dependency_resolver::ResolveErrorKind;

/// Error returned by factories, constructors and finalizers.
///
/// Resolve errors raised inside a factory convert into [`InstantiateErrorKind::Resolve`],
/// so `resolver.resolve::<T>()?` works in factory bodies.
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error("Argument `{name}` was not provided to the constructor")]
    MissingArgument { name: &'static str },
    #[error(transparent)]
    Resolve(Box<ResolveErrorKind>),
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

impl From<ResolveErrorKind> for InstantiateErrorKind {
    #[inline]
    fn from(err: ResolveErrorKind) -> Self {
        Self::Resolve(Box::new(err))
    }
}
