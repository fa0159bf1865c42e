//! Process-wide repository instances.
//!
//! # Invariants
//! - At most one instance exists per `RepositoryDefinition` type.
//! - An instance is built on first access from an explicit or the
//!   globally installed container and lives until process exit.

use super::error::RepoResult;
use super::repository::{Repository, RepositoryDefinition};
use crate::container::{Container, ContainerError};
use log::{debug, info};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

type Slot = &'static (dyn Any + Send + Sync);

static INSTANCES: Lazy<Mutex<HashMap<TypeId, Slot>>> = Lazy::new(|| Mutex::new(HashMap::new()));

impl<D: RepositoryDefinition + Default> Repository<D> {
    /// Shared instance built from the globally installed container.
    ///
    /// # Errors
    /// - `Container(NotInstalled)` on first access without a global container.
    /// - Any construction error of [`Repository::new`] on first access.
    pub fn instance() -> RepoResult<&'static Mutex<Repository<D>>> {
        let container = Container::global().ok_or(ContainerError::NotInstalled)?;
        Self::instance_in(container)
    }

    /// Shared instance, built from `container` if it does not exist yet.
    ///
    /// The registry lock is not held while the model factory runs, so a
    /// factory may itself resolve other shared repositories. When two
    /// callers race on first access, the later build is discarded.
    pub fn instance_in(container: &Container) -> RepoResult<&'static Mutex<Repository<D>>> {
        let known: Option<Slot> = INSTANCES.lock().get(&TypeId::of::<D>()).copied();
        if let Some(existing) = known.and_then(downcast::<D>) {
            return Ok(existing);
        }

        let repository = Repository::new(container, D::default())?;
        let mut instances = INSTANCES.lock();
        match instances.entry(TypeId::of::<D>()) {
            Entry::Occupied(mut slot) => {
                let current: Slot = *slot.get();
                if let Some(existing) = downcast::<D>(current) {
                    debug!(
                        "event=repo_instance module=repo status=discarded definition={}",
                        std::any::type_name::<D>()
                    );
                    return Ok(existing);
                }
                let leaked = leak(repository);
                slot.insert(leaked);
                Ok(leaked)
            }
            Entry::Vacant(slot) => {
                let leaked = leak(repository);
                slot.insert(leaked);
                info!(
                    "event=repo_instance module=repo status=ok definition={}",
                    std::any::type_name::<D>()
                );
                Ok(leaked)
            }
        }
    }
}

fn downcast<D: RepositoryDefinition>(slot: Slot) -> Option<&'static Mutex<Repository<D>>> {
    slot.downcast_ref::<Mutex<Repository<D>>>()
}

fn leak<D: RepositoryDefinition>(repository: Repository<D>) -> &'static Mutex<Repository<D>> {
    Box::leak(Box::new(Mutex::new(repository)))
}

#[cfg(test)]
mod tests {
    use crate::container::Container;
    use crate::db::open_db_in_memory;
    use crate::model::Model;
    use crate::repo::repository::{Repository, RepositoryDefinition};
    use once_cell::sync::Lazy;

    #[derive(Default)]
    struct Tokens;

    impl Model for Tokens {
        fn table(&self) -> &str {
            "tokens"
        }

        fn fillable(&self) -> &[&'static str] {
            &["token"]
        }
    }

    #[derive(Default)]
    struct Accounts;

    impl Model for Accounts {
        fn table(&self) -> &str {
            "accounts"
        }

        fn fillable(&self) -> &[&'static str] {
            &["name"]
        }
    }

    #[derive(Default)]
    struct TokenRepository;

    impl RepositoryDefinition for TokenRepository {
        fn take_model(&self) -> &str {
            "tokens"
        }
    }

    #[derive(Default)]
    struct AccountRepository;

    impl RepositoryDefinition for AccountRepository {
        fn take_model(&self) -> &str {
            "accounts"
        }
    }

    static TOKENS: Lazy<Container> = Lazy::new(|| {
        let mut container = Container::new(open_db_in_memory().expect("in-memory db"));
        container.bind_model::<Tokens>("tokens");
        container
    });

    #[test]
    fn model_factory_may_resolve_other_shared_repositories() {
        let mut accounts = Container::new(open_db_in_memory().expect("in-memory db"));
        accounts.bind_model_with("accounts", || {
            Repository::<TokenRepository>::instance_in(&TOKENS).expect("nested instance");
            Accounts
        });

        let first = Repository::<AccountRepository>::instance_in(&accounts).expect("accounts");
        let second = Repository::<AccountRepository>::instance_in(&accounts).expect("accounts");
        assert!(std::ptr::eq(first, second));

        let tokens = Repository::<TokenRepository>::instance_in(&TOKENS).expect("tokens");
        assert_eq!(tokens.lock().model().table(), "tokens");
    }
}
