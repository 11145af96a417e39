use std::{any::Any, sync::Arc};

use crate::{
    any::{downcast, RcAny, TypeInfo},
    errors::{InstantiateErrorKind, ResolveErrorKind},
};

/// A named constructor parameter together with the identity it must be resolved from.
///
/// A parameter without an identity is rejected when the owning service is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub name: &'static str,
    pub identity: Option<TypeInfo>,
}

impl Parameter {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            identity: Some(TypeInfo::of::<T>()),
        }
    }

    #[inline]
    #[must_use]
    pub const fn unannotated(name: &'static str) -> Self {
        Self { name, identity: None }
    }
}

/// Resolved constructor arguments, in declaration order.
pub struct Arguments {
    values: Vec<(&'static str, RcAny)>,
}

impl Arguments {
    #[inline]
    #[must_use]
    pub(crate) const fn new(values: Vec<(&'static str, RcAny)>) -> Self {
        Self { values }
    }

    /// Takes the argument resolved for parameter `name`.
    ///
    /// # Errors
    /// - [`InstantiateErrorKind::MissingArgument`] if no parameter with this name was declared
    /// - [`InstantiateErrorKind::Resolve`] if the resolved value is not an `Arc<T>`
    pub fn take<T>(&mut self, name: &'static str) -> Result<Arc<T>, InstantiateErrorKind>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let Some(position) = self.values.iter().position(|(param, _)| *param == name) else {
            return Err(InstantiateErrorKind::MissingArgument { name });
        };
        let (_, value) = self.values.swap_remove(position);

        downcast::<T>(&value).ok_or_else(|| {
            ResolveErrorKind::IncorrectType {
                expected: TypeInfo::of::<T>(),
                actual: (*value).type_id(),
            }
            .into()
        })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Types that can be built from their declared constructor parameters.
///
/// Usually implemented with [`crate::injectable!`].
pub trait Injectable: Sized + Send + Sync + 'static {
    fn parameters() -> Vec<Parameter>;

    /// # Errors
    /// Any error is propagated to the resolve call that triggered construction.
    fn construct(arguments: Arguments) -> Result<Self, InstantiateErrorKind>;
}

/// Implements [`Injectable`] for a struct whose fields are all `Arc` dependencies.
///
/// ```
/// use std::sync::Arc;
///
/// struct Config;
/// struct Database {
///     config: Arc<Config>,
/// }
///
/// depi::injectable!(Config {});
/// depi::injectable!(Database { config: Config });
/// ```
#[macro_export]
macro_rules! injectable {
    ($ty:ty { $($field:ident : $dep:ty),* $(,)? }) => {
        impl $crate::Injectable for $ty {
            fn parameters() -> ::std::vec::Vec<$crate::Parameter> {
                ::std::vec![$($crate::Parameter::of::<$dep>(::core::stringify!($field))),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn construct(
                mut arguments: $crate::Arguments,
            ) -> ::core::result::Result<Self, $crate::InstantiateErrorKind> {
                ::core::result::Result::Ok(Self {
                    $($field: arguments.take::<$dep>(::core::stringify!($field))?,)*
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Arguments, Injectable, Parameter};
    use crate::{
        any::{erase, TypeInfo},
        errors::{InstantiateErrorKind, ResolveErrorKind},
    };

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    struct Fixed;

    impl Clock for Fixed {
        fn now(&self) -> u64 {
            42
        }
    }

    struct Settings(u8);

    struct Worker {
        settings: Arc<Settings>,
        clock: Arc<dyn Clock>,
    }

    crate::injectable!(Worker { settings: Settings, clock: dyn Clock });

    #[test]
    fn test_parameters_in_declaration_order() {
        assert_eq!(
            Worker::parameters(),
            vec![Parameter::of::<Settings>("settings"), Parameter::of::<dyn Clock>("clock")]
        );
    }

    #[test]
    fn test_construct() {
        let clock: Arc<dyn Clock> = Arc::new(Fixed);
        let arguments = Arguments::new(vec![("settings", erase(Arc::new(Settings(3)))), ("clock", erase(clock))]);

        let worker = Worker::construct(arguments).unwrap();
        assert_eq!(worker.settings.0, 3);
        assert_eq!(worker.clock.now(), 42);
    }

    #[test]
    fn test_missing_argument() {
        let arguments = Arguments::new(vec![("settings", erase(Arc::new(Settings(3))))]);

        let Err(err) = Worker::construct(arguments) else {
            panic!("construct must fail");
        };
        assert!(matches!(err, InstantiateErrorKind::MissingArgument { name: "clock" }));
    }

    #[test]
    fn test_incorrect_type() {
        let mut arguments = Arguments::new(vec![("settings", erase(Arc::new(1u8)))]);

        let Err(InstantiateErrorKind::Resolve(err)) = arguments.take::<Settings>("settings") else {
            panic!("take must fail with a resolve error");
        };
        assert!(matches!(*err, ResolveErrorKind::IncorrectType { expected, .. } if expected == TypeInfo::of::<Settings>()));
    }
}
