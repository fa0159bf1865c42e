//! Service container that builds named bindings.
//!
//! # Responsibility
//! - Instantiate models (and plain services) by binding name.
//! - Hand the shared database handle to repositories it constructs.
//!
//! # Invariants
//! - A binding records at registration time whether it yields a `Model`;
//!   that flag is the only capability information available later.
//! - At most one container is installed process-wide.

use crate::db::Database;
use crate::model::Model;
use log::info;
use once_cell::sync::OnceCell;
use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

static GLOBAL_CONTAINER: OnceCell<Container> = OnceCell::new();

type ModelFactory = Arc<dyn Fn() -> Arc<dyn Model> + Send + Sync>;
type ServiceFactory = Arc<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;

#[derive(Clone)]
enum Binding {
    Model(ModelFactory),
    Service(ServiceFactory),
}

/// Value produced by [`Container::make`].
pub enum Instance {
    Model(Arc<dyn Model>),
    Service(Box<dyn Any + Send>),
}

impl Instance {
    /// Returns the model when the binding satisfies the record capability.
    pub fn into_model(self) -> Option<Arc<dyn Model>> {
        match self {
            Self::Model(model) => Some(model),
            Self::Service(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    Unbound(String),
    NotInstalled,
    AlreadyInstalled,
}

impl Display for ContainerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbound(name) => write!(f, "no container binding named `{name}`"),
            Self::NotInstalled => write!(f, "no global container has been installed"),
            Self::AlreadyInstalled => write!(f, "a global container is already installed"),
        }
    }
}

impl Error for ContainerError {}

pub struct Container {
    db: Database,
    bindings: BTreeMap<String, Binding>,
}

impl Container {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            bindings: BTreeMap::new(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Binds `name` to a model built with `Default`.
    pub fn bind_model<M: Model + Default>(&mut self, name: impl Into<String>) -> &mut Self {
        self.bind_model_with(name, M::default)
    }

    pub fn bind_model_with<M, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        M: Model,
        F: Fn() -> M + Send + Sync + 'static,
    {
        let factory: ModelFactory = Arc::new(move || Arc::new(factory()) as Arc<dyn Model>);
        self.bindings.insert(name.into(), Binding::Model(factory));
        self
    }

    /// Binds `name` to a plain service value.
    pub fn bind<T: Any + Send + Default>(&mut self, name: impl Into<String>) -> &mut Self {
        let factory: ServiceFactory = Arc::new(|| Box::new(T::default()) as Box<dyn Any + Send>);
        self.bindings.insert(name.into(), Binding::Service(factory));
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Builds a fresh instance of the named binding.
    pub fn make(&self, name: &str) -> Result<Instance, ContainerError> {
        match self.bindings.get(name) {
            Some(Binding::Model(factory)) => Ok(Instance::Model(factory())),
            Some(Binding::Service(factory)) => Ok(Instance::Service(factory())),
            None => Err(ContainerError::Unbound(name.to_string())),
        }
    }

    /// Installs this container as the process-wide ambient container.
    ///
    /// Used by `Repository::instance()`. Can only happen once per process.
    pub fn install_global(self) -> Result<&'static Container, ContainerError> {
        let mut installed = false;
        let container = GLOBAL_CONTAINER.get_or_init(|| {
            installed = true;
            self
        });
        if !installed {
            return Err(ContainerError::AlreadyInstalled);
        }
        info!(
            "event=container_install module=container status=ok bindings={}",
            container.bindings.len()
        );
        Ok(container)
    }

    pub fn global() -> Option<&'static Container> {
        GLOBAL_CONTAINER.get()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
