//! A lifetime-aware inversion-of-control container.
//!
//! Services are registered in a [`Registry`] with one of three [`Lifetime`]s, then
//! [`Registry::build`] validates the singleton graph and returns a [`Provider`]. Per unit of work,
//! a [`Scope`] is created from the provider to resolve scoped services.
//!
//! ```
//! use std::sync::Arc;
//!
//! use depi::{factory, injectable, Registry};
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Database {
//!     config: Arc<Config>,
//! }
//!
//! struct Repo {
//!     database: Arc<Database>,
//! }
//!
//! injectable!(Database { config: Config });
//! injectable!(Repo { database: Database });
//!
//! let provider = Registry::new()
//!     .register_singleton_with(factory(|_| Ok(Config { url: "sqlite::memory:".to_owned() })))?
//!     .register_singleton::<Database>()?
//!     .register_scoped::<Repo>()?
//!     .build()?;
//!
//! let scope = provider.create_scope();
//! let repo = scope.resolve::<Repo>()?;
//! assert!(Arc::ptr_eq(&repo, &scope.resolve::<Repo>()?));
//! assert_eq!(repo.database.config.url, "sqlite::memory:");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub(crate) mod any;
pub(crate) mod cache;
pub(crate) mod descriptor;
pub(crate) mod errors;
pub(crate) mod finalizer;
pub(crate) mod graph;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod lifetime;
pub(crate) mod lock;
pub(crate) mod provider;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod scope;
pub(crate) mod service;
pub(crate) mod utils;

pub use any::TypeInfo;
pub use descriptor::{ConstructorParam, Service, ServiceDefinition, ServiceDescriptor};
pub use errors::{InstantiateErrorKind, InstantiatorErrorKind, RegistrationErrorKind, ResolveErrorKind};
pub use finalizer::Dispose;
pub use graph::GraphValidator;
pub use inject::{Arguments, Injectable, Parameter};
pub use instantiator::{
    async_factory, bind, constructor, factory, instance, shared_async_factory, shared_factory, shared_instance,
};
pub use lifetime::Lifetime;
pub use provider::Provider;
pub use registry::Registry;
pub use resolver::Resolver;
pub use scope::Scope;
pub use utils::future::BoxFuture;
