use std::collections::BTreeMap;
use tracing::{debug, error};

use crate::{any::TypeInfo, errors::ResolveErrorKind, lifetime::Lifetime, registry::Registry};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// On the current DFS path.
    Gray,
    /// Finished and emitted.
    Black,
}

/// Depth-first check of the declared dependency graph.
///
/// Produces the identities in finish order, so every identity comes after its dependencies.
/// [`GraphValidator::build_order`] starts from eagerly built singletons, [`GraphValidator::validate_from`]
/// from a single lazily resolved identity.
pub struct GraphValidator<'a> {
    registry: &'a Registry,
    marks: BTreeMap<TypeInfo, Mark>,
    stack: Vec<TypeInfo>,
    order: Vec<TypeInfo>,
}

impl<'a> GraphValidator<'a> {
    #[must_use]
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            marks: BTreeMap::new(),
            stack: Vec::new(),
            order: Vec::with_capacity(registry.len()),
        }
    }

    /// # Errors
    /// - [`ResolveErrorKind::CyclicDependency`] naming the concrete identity that closes a cycle
    /// - [`ResolveErrorKind::UnregisteredDependency`] naming the missing identity and its requester
    pub fn build_order(mut self) -> Result<Vec<TypeInfo>, ResolveErrorKind> {
        let registry = self.registry;
        for descriptor in registry
            .descriptors()
            .filter(|descriptor| descriptor.lifetime() == Lifetime::Singleton && !descriptor.has_instance())
        {
            if let Err(err) = self.visit(descriptor.abstract_identity(), None) {
                error!("{}", err);
                return Err(err);
            }
        }

        debug!(len = self.order.len(), "Build order computed");
        Ok(self.order)
    }

    /// Checks the graph reachable from `identity` over declared edges, whatever the lifetimes.
    /// Returns every identity visited.
    ///
    /// # Errors
    /// Same as [`GraphValidator::build_order`].
    pub fn validate_from(mut self, identity: TypeInfo) -> Result<Vec<TypeInfo>, ResolveErrorKind> {
        if let Err(err) = self.visit(identity, None) {
            error!("{}", err);
            return Err(err);
        }
        Ok(self.order)
    }

    fn visit(&mut self, identity: TypeInfo, requester: Option<TypeInfo>) -> Result<(), ResolveErrorKind> {
        let registry = self.registry;
        match self.marks.get(&identity) {
            Some(Mark::Black) => return Ok(()),
            Some(Mark::Gray) => {
                let start = self.stack.iter().position(|node| *node == identity).unwrap_or(0);
                let mut path = self.stack[start..].to_vec();
                path.push(identity);

                let closing = registry
                    .get(&identity)
                    .map_or(identity, |descriptor| descriptor.concrete_identity());
                return Err(ResolveErrorKind::CyclicDependency { identity: closing, path });
            }
            None => {}
        }

        let Some(descriptor) = registry.get(&identity) else {
            return Err(ResolveErrorKind::UnregisteredDependency { identity, requester });
        };

        self.marks.insert(identity, Mark::Gray);
        self.stack.push(identity);

        for dependency in descriptor.dependencies() {
            self.visit(dependency, Some(descriptor.concrete_identity()))?;
        }

        self.stack.pop();
        self.marks.insert(identity, Mark::Black);
        self.order.push(identity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tracing_test::traced_test;

    use super::GraphValidator;
    use crate::{any::TypeInfo, errors::ResolveErrorKind, factory, injectable, Registry};

    struct Config;
    struct Pool {
        config: Arc<Config>,
    }
    struct Repo {
        pool: Arc<Pool>,
    }

    injectable!(Config {});
    injectable!(Pool { config: Config });
    injectable!(Repo { pool: Pool });

    struct A {
        b: Arc<B>,
    }
    struct B {
        c: Arc<C>,
    }
    struct C {
        a: Arc<A>,
    }

    injectable!(A { b: B });
    injectable!(B { c: C });
    injectable!(C { a: A });

    struct Selfish {
        me: Arc<Selfish>,
    }

    injectable!(Selfish { me: Selfish });

    #[test]
    #[traced_test]
    fn test_order_dependencies_first() {
        let registry = Registry::new()
            .register_singleton::<Repo>()
            .unwrap()
            .register_transient::<Pool>()
            .unwrap()
            .register_singleton::<Config>()
            .unwrap();

        let order = GraphValidator::new(&registry).build_order().unwrap();
        assert_eq!(order, [TypeInfo::of::<Config>(), TypeInfo::of::<Pool>(), TypeInfo::of::<Repo>()]);
    }

    #[test]
    #[traced_test]
    fn test_multi_hop_cycle() {
        let registry = Registry::new()
            .register_singleton::<A>()
            .unwrap()
            .register_singleton::<B>()
            .unwrap()
            .register_singleton::<C>()
            .unwrap();

        let Err(ResolveErrorKind::CyclicDependency { identity, path }) = GraphValidator::new(&registry).build_order() else {
            panic!("cycle must be detected");
        };
        assert_eq!(identity, TypeInfo::of::<A>());
        assert_eq!(
            path,
            [TypeInfo::of::<A>(), TypeInfo::of::<B>(), TypeInfo::of::<C>(), TypeInfo::of::<A>()]
        );
    }

    #[test]
    #[traced_test]
    fn test_self_loop() {
        let registry = Registry::new().register_singleton::<Selfish>().unwrap();

        let Err(ResolveErrorKind::CyclicDependency { identity, path }) = GraphValidator::new(&registry).build_order() else {
            panic!("self loop must be detected");
        };
        assert_eq!(identity, TypeInfo::of::<Selfish>());
        assert_eq!(path.len(), 2);
    }

    #[test]
    #[traced_test]
    fn test_unregistered_names_requester() {
        let registry = Registry::new().register_singleton::<Pool>().unwrap();

        let Err(ResolveErrorKind::UnregisteredDependency { identity, requester }) = GraphValidator::new(&registry).build_order()
        else {
            panic!("missing dependency must be detected");
        };
        assert_eq!(identity, TypeInfo::of::<Config>());
        assert_eq!(requester, Some(TypeInfo::of::<Pool>()));
    }

    #[test]
    #[traced_test]
    fn test_lazy_lifetimes_not_roots() {
        let registry = Registry::new()
            .register_transient::<Pool>()
            .unwrap()
            .register_scoped_with(factory(|_| Ok(Config)).depends_on::<Repo>())
            .unwrap();

        assert!(GraphValidator::new(&registry).build_order().unwrap().is_empty());
    }

    #[test]
    #[traced_test]
    fn test_validate_from_lazy_root() {
        let registry = Registry::new()
            .register_scoped::<A>()
            .unwrap()
            .register_transient::<B>()
            .unwrap()
            .register_scoped::<C>()
            .unwrap();

        let Err(ResolveErrorKind::CyclicDependency { path, .. }) = GraphValidator::new(&registry).validate_from(TypeInfo::of::<B>())
        else {
            panic!("cycle must be detected from a lazy root");
        };
        assert_eq!(
            path,
            [TypeInfo::of::<B>(), TypeInfo::of::<C>(), TypeInfo::of::<A>(), TypeInfo::of::<B>()]
        );

        let registry = Registry::new()
            .register_singleton::<Config>()
            .unwrap()
            .register_scoped::<Pool>()
            .unwrap()
            .register_transient::<Repo>()
            .unwrap();
        let visited = GraphValidator::new(&registry).validate_from(TypeInfo::of::<Repo>()).unwrap();
        assert_eq!(visited, [TypeInfo::of::<Config>(), TypeInfo::of::<Pool>(), TypeInfo::of::<Repo>()]);
    }
}
