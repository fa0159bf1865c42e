#![allow(dead_code)]

use recordrepo_core::{
    attributes, open_db_in_memory, Builder, Container, Database, Model, Record, Relation,
    Repository, RepositoryDefinition,
};
use std::sync::Arc;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    created_at INTEGER,
    updated_at INTEGER
);
CREATE TABLE password_resets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token TEXT NOT NULL
);
";

#[derive(Default)]
pub struct User;

impl Model for User {
    fn table(&self) -> &str {
        "users"
    }

    fn fillable(&self) -> &[&'static str] {
        &["email", "password"]
    }

    fn timestamps(&self) -> bool {
        true
    }

    fn relation(&self, name: &str) -> Option<Relation> {
        match name {
            "token" | "other_token" => Some(Relation::has_one(PasswordReset, "id", "id")),
            "resets" => Some(Relation::has_many(PasswordReset, "user_id", "id")),
            _ => None,
        }
    }

    fn model_name(&self) -> &str {
        "User"
    }
}

#[derive(Default)]
pub struct PasswordReset;

impl Model for PasswordReset {
    fn table(&self) -> &str {
        "password_resets"
    }

    fn fillable(&self) -> &[&'static str] {
        &["user_id", "token"]
    }

    fn relation(&self, name: &str) -> Option<Relation> {
        match name {
            "user" => Some(Relation::belongs_to(User, "user_id", "id")),
            _ => None,
        }
    }
}

/// Registered in the container but not a model.
#[derive(Default)]
pub struct Mailer;

#[derive(Default)]
pub struct UserRepository;

impl RepositoryDefinition for UserRepository {
    fn take_model(&self) -> &str {
        "user"
    }
}

#[derive(Default)]
pub struct PasswordResetRepository;

impl RepositoryDefinition for PasswordResetRepository {
    fn take_model(&self) -> &str {
        "password_reset"
    }
}

#[derive(Default)]
pub struct BadRepository;

impl RepositoryDefinition for BadRepository {
    fn take_model(&self) -> &str {
        "mailer"
    }
}

pub fn container() -> Container {
    let db = open_db_in_memory().unwrap();
    db.execute_batch(SCHEMA).unwrap();

    let mut container = Container::new(db);
    container
        .bind_model::<User>("user")
        .bind_model::<PasswordReset>("password_reset")
        .bind::<Mailer>("mailer");
    container
}

pub fn user_repository(container: &Container) -> Repository<UserRepository> {
    Repository::new(container, UserRepository).unwrap()
}

/// Inserts one user with a unique email and password `secret`.
pub fn make_user(db: &Database) -> Record {
    let email = format!("{}@example.test", Uuid::new_v4());
    let query = Builder::new(db.clone(), Arc::new(User));
    let id = query
        .insert(&attributes([
            ("email", email.as_str()),
            ("password", "secret"),
        ]))
        .unwrap();
    query.find(id, &[]).unwrap().unwrap()
}

pub fn make_users(db: &Database, count: usize) -> Vec<Record> {
    (0..count).map(|_| make_user(db)).collect()
}

/// Inserts a user plus a password reset sharing its id.
pub fn make_password_reset(db: &Database) -> (Record, Record) {
    let user = make_user(db);
    let user_id = user.key().cloned().unwrap();
    let query = Builder::new(db.clone(), Arc::new(PasswordReset));
    let id = query
        .insert(&attributes([
            ("id", user_id.clone()),
            ("user_id", user_id),
            ("token", format!("token-{}", Uuid::new_v4()).into()),
        ]))
        .unwrap();
    let reset = query.find(id, &[]).unwrap().unwrap();
    (reset, user)
}

pub fn only_credentials(record: &Record) -> recordrepo_core::Attributes {
    record.only(&["email", "password"])
}
