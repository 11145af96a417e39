use std::{
    any::{type_name, Any, TypeId},
    cmp::Ordering,
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
    sync::Arc,
};

/// Identity of a capability: the key every descriptor, cache and lock is stored under.
///
/// Two identities are equal iff their [`TypeId`]s are equal, the name is only used for messages.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit_once("::").map_or(self.name, |(_, name)| name)
    }
}

/// Type-erased shared instance. The erased value is always an `Arc<T>` of the identity `T`,
/// so unsized identities (`dyn Trait`) are stored the same way as sized ones.
pub(crate) type RcAny = Arc<dyn Any + Send + Sync>;

pub(crate) type Map = BTreeMap<TypeInfo, RcAny>;

#[inline]
#[must_use]
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> RcAny {
    Arc::new(value)
}

#[inline]
#[must_use]
pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(value: &RcAny) -> Option<Arc<T>> {
    value.downcast_ref::<Arc<T>>().cloned()
}

#[cfg(test)]
mod tests {
    use super::{downcast, erase, TypeInfo};

    use std::sync::Arc;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    #[test]
    fn test_type_info_eq_by_id() {
        assert_eq!(TypeInfo::of::<English>(), TypeInfo::of::<English>());
        assert_ne!(TypeInfo::of::<English>(), TypeInfo::of::<dyn Greeter>());
        assert_eq!(TypeInfo::of::<dyn Greeter>().short_name(), "Greeter");
    }

    #[test]
    fn test_erase_unsized() {
        let value: Arc<dyn Greeter> = Arc::new(English);
        let erased = erase(value.clone());

        let restored = downcast::<dyn Greeter>(&erased).unwrap();
        assert!(Arc::ptr_eq(&value, &restored));
        assert_eq!(restored.greet(), "hello");
        assert!(downcast::<English>(&erased).is_none());
    }
}
