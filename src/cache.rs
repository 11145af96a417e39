use std::collections::vec_deque::VecDeque;
use tracing::{debug, warn};

use crate::{
    any::{self, RcAny, TypeInfo},
    finalizer::{BoxedCloneAsyncFinalizer, BoxedCloneFinalizer},
    service::Service as _,
};

/// Instances owned by a provider or a scope, plus the finalizable ones in activation order.
#[derive(Default)]
pub(crate) struct Cache {
    map: any::Map,
    resolved: ResolvedSet,
}

impl Cache {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            map: any::Map::new(),
            resolved: ResolvedSet::new(),
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, identity: &TypeInfo) -> Option<RcAny> {
        self.map.get(identity).cloned()
    }

    #[inline]
    pub(crate) fn insert(&mut self, identity: TypeInfo, value: RcAny) -> Option<RcAny> {
        self.map.insert(identity, value)
    }

    #[inline]
    pub(crate) fn push_resolved(&mut self, resolved: Resolved) {
        self.resolved.push(resolved);
    }

    /// Empties the cache, handing back what still has to be finalized.
    #[inline]
    #[must_use]
    pub(crate) fn take(&mut self) -> ResolvedSet {
        self.map.clear();
        std::mem::take(&mut self.resolved)
    }

    /// Hands back what has to be finalized, keeping the instances cached.
    #[inline]
    #[must_use]
    pub(crate) fn take_resolved(&mut self) -> ResolvedSet {
        std::mem::take(&mut self.resolved)
    }

    /// Forgets the finalizable entries without running anything.
    #[inline]
    pub(crate) fn forget_resolved(&mut self) {
        self.resolved = ResolvedSet::new();
    }

    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    #[must_use]
    #[cfg(test)]
    pub(crate) fn resolved_len(&self) -> usize {
        self.resolved.0.len()
    }
}

pub(crate) struct Resolved {
    pub(crate) identity: TypeInfo,
    pub(crate) dependency: RcAny,
    pub(crate) finalizer: Option<BoxedCloneFinalizer>,
    pub(crate) async_finalizer: Option<BoxedCloneAsyncFinalizer>,
}

#[derive(Default)]
pub(crate) struct ResolvedSet(pub(crate) VecDeque<Resolved>);

impl ResolvedSet {
    pub(crate) const fn new() -> Self {
        Self(VecDeque::new())
    }

    pub(crate) fn push(&mut self, resolved: Resolved) {
        self.0.push_back(resolved);
    }

    /// Most recently activated first.
    pub(crate) fn pop(&mut self) -> Option<Resolved> {
        self.0.pop_back()
    }

    /// Runs every finalizer in LIFO order. Failures are logged and do not stop the remaining ones.
    pub(crate) fn finalize(mut self) {
        while let Some(resolved) = self.pop() {
            if let Some(mut finalizer) = resolved.finalizer {
                report(resolved.identity, finalizer.call(resolved.dependency.clone()));
            }
            if let Some(mut finalizer) = resolved.async_finalizer {
                report(resolved.identity, futures_executor::block_on(finalizer.call(resolved.dependency)));
            }
        }
    }

    pub(crate) async fn finalize_async(mut self) {
        while let Some(resolved) = self.pop() {
            if let Some(mut finalizer) = resolved.finalizer {
                report(resolved.identity, finalizer.call(resolved.dependency.clone()));
            }
            if let Some(mut finalizer) = resolved.async_finalizer {
                report(resolved.identity, finalizer.call(resolved.dependency).await);
            }
        }
    }
}

fn report(identity: TypeInfo, result: Result<(), anyhow::Error>) {
    match result {
        Ok(()) => debug!(dependency = identity.short_name(), "Finalizer called"),
        Err(err) => warn!(dependency = identity.short_name(), "Failed to dispose: {err:#}"),
    }
}
