use std::{collections::BTreeMap, sync::Arc};

use crate::any::TypeInfo;

/// One activation lock per identity.
///
/// Building a service may build its dependencies, which take their own locks, so a single
/// shared lock would deadlock on the first nested activation.
#[derive(Default)]
pub(crate) struct ActivationLocks {
    locks: parking_lot::Mutex<BTreeMap<TypeInfo, Arc<async_lock::Mutex<()>>>>,
}

impl ActivationLocks {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub(crate) fn get(&self, identity: TypeInfo) -> Arc<async_lock::Mutex<()>> {
        self.locks.lock().entry(identity).or_default().clone()
    }
}
