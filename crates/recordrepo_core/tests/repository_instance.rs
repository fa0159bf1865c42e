mod common;

use common::{container, make_users, UserRepository};
use recordrepo_core::{Container, ContainerError, RepoError, Repository};

// The global container is process-wide, so this binary holds a single test.
#[test]
fn instance_is_shared_after_global_install() {
    let err = Repository::<UserRepository>::instance().err().unwrap();
    assert!(matches!(
        err,
        RepoError::Container(ContainerError::NotInstalled)
    ));

    let shared = container();
    make_users(shared.database(), 3);
    let global = shared.install_global().unwrap();
    assert!(std::ptr::eq(global, Container::global().unwrap()));

    let first = Repository::<UserRepository>::instance().unwrap();
    let second = Repository::<UserRepository>::instance().unwrap();
    assert!(std::ptr::eq(first, second));
    assert_eq!(first.lock().count().unwrap(), 3);

    assert!(matches!(
        container().install_global(),
        Err(ContainerError::AlreadyInstalled)
    ));
}
