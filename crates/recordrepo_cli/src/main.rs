//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `recordrepo_core` linkage with a repository round-trip against
//!   an in-memory database.
//! - Keep output deterministic for quick local sanity checks.

use recordrepo_core::{
    attributes, open_db_in_memory, Container, Model, RepoResult, Repository,
    RepositoryDefinition,
};

#[derive(Default)]
struct Probe;

impl Model for Probe {
    fn table(&self) -> &str {
        "probes"
    }

    fn fillable(&self) -> &[&'static str] {
        &["label"]
    }
}

#[derive(Default)]
struct ProbeRepository;

impl RepositoryDefinition for ProbeRepository {
    fn take_model(&self) -> &str {
        "probe"
    }
}

fn main() {
    println!("recordrepo_core ping={}", recordrepo_core::ping());
    println!("recordrepo_core version={}", recordrepo_core::core_version());

    match run_probe() {
        Ok((count, table)) => println!("recordrepo_core probe=ok rows={count} table={table}"),
        Err(err) => {
            eprintln!("recordrepo_core probe=error error={err}");
            std::process::exit(1);
        }
    }
}

fn run_probe() -> RepoResult<(u64, String)> {
    let db = open_db_in_memory()?;
    db.execute_batch(
        "CREATE TABLE probes (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT NOT NULL);",
    )?;

    let mut container = Container::new(db);
    container.bind_model::<Probe>("probe");

    let mut repo = Repository::new(&container, ProbeRepository)?;
    repo.create(attributes([("label", "first")]))?;
    repo.create(attributes([("label", "second")]))?;

    let table = match repo.call("getTable", &[])? {
        recordrepo_core::Dispatched::Text(table) => table,
        other => format!("{other:?}"),
    };
    Ok((repo.count()?, table))
}
