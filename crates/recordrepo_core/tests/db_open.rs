use recordrepo_core::{attributes, open_db, open_db_in_memory, Builder, Model, Value};
use std::sync::Arc;

#[derive(Default)]
struct Entry;

impl Model for Entry {
    fn table(&self) -> &str {
        "entries"
    }

    fn fillable(&self) -> &[&'static str] {
        &["label"]
    }
}

#[test]
fn open_db_in_memory_enables_foreign_keys() {
    let db = open_db_in_memory().unwrap();

    assert_eq!(pragma(&db, "foreign_keys"), 1);
}

#[test]
fn reopening_file_database_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recordrepo.db");

    let first = open_db(&path).unwrap();
    first
        .execute_batch("CREATE TABLE entries (id INTEGER PRIMARY KEY, label TEXT NOT NULL);")
        .unwrap();
    let id = Builder::new(first.clone(), Arc::new(Entry))
        .insert(&attributes([("label", "kept")]))
        .unwrap();
    drop(first);

    let second = open_db(&path).unwrap();
    let found = Builder::new(second.clone(), Arc::new(Entry))
        .find(id, &[])
        .unwrap()
        .unwrap();
    assert_eq!(found.get("label"), Some(&Value::from("kept")));
    assert_eq!(pragma(&second, "foreign_keys"), 1);
}

#[test]
fn clones_share_one_connection() {
    let db = open_db_in_memory().unwrap();
    let other = open_db_in_memory().unwrap();

    assert!(db.same_connection(&db.clone()));
    assert!(!db.same_connection(&other));
}

#[test]
fn opening_directory_path_fails() {
    let dir = tempfile::tempdir().unwrap();

    assert!(open_db(dir.path()).is_err());
}

fn pragma(db: &recordrepo_core::Database, name: &str) -> i64 {
    db.lock()
        .query_row(&format!("PRAGMA {name};"), [], |row| row.get(0))
        .unwrap()
}
