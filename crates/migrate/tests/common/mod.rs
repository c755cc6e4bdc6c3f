//! In-memory stand-in for a PostgreSQL database.
//!
//! Understands just enough SQL to reproduce the SQLSTATE codes the migration
//! engine reacts to. Each batch runs as one implicit transaction, like a
//! simple-protocol query string: if any statement fails, nothing in the batch
//! is kept.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;
use tidemark_migrate::{DatabaseFailure, SqlConnection};

#[derive(Debug, Clone, Default)]
struct Catalog {
    tables: BTreeSet<String>,
    /// Indexes share the relation namespace with tables
    indexes: BTreeSet<String>,
    types: BTreeSet<String>,
    /// `table:values` pairs, every row behaves as a unique key
    rows: BTreeSet<String>,
}

#[derive(Default)]
pub struct FakePostgres {
    catalog: Mutex<Catalog>,
    executed: Mutex<Vec<String>>,
    report_failure: Option<DatabaseFailure>,
    table_queries: AtomicUsize,
    closes: AtomicUsize,
}

impl FakePostgres {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the schema listing fail with `failure`
    pub fn with_report_failure(mut self, failure: DatabaseFailure) -> Self {
        self.report_failure = Some(failure);
        self
    }

    /// SQL batches received, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn tables(&self) -> Vec<String> {
        self.catalog.lock().unwrap().tables.iter().cloned().collect()
    }

    pub fn table_queries(&self) -> usize {
        self.table_queries.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Reset call counters between runs, keeping the schema
    pub fn reopen(&self) {
        self.executed.lock().unwrap().clear();
        self.table_queries.store(0, Ordering::SeqCst);
        self.closes.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl SqlConnection for FakePostgres {
    async fn execute_batch(&self, sql: &str) -> Result<(), DatabaseFailure> {
        self.executed.lock().unwrap().push(sql.to_string());

        let mut catalog = self.catalog.lock().unwrap();
        let mut working = catalog.clone();
        for statement in statements(sql) {
            apply(&mut working, &statement)?;
        }
        *catalog = working;
        Ok(())
    }

    async fn table_names(&self, _schema: &str) -> Result<Vec<String>, DatabaseFailure> {
        self.table_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = &self.report_failure {
            return Err(failure.clone());
        }
        // Deliberately unsorted; the reporter owns ordering
        Ok(self.catalog.lock().unwrap().tables.iter().rev().cloned().collect())
    }

    async fn close(&self) -> bool {
        self.closes.fetch_add(1, Ordering::SeqCst) == 0
    }
}

fn statements(sql: &str) -> Vec<String> {
    let stripped: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    stripped
        .split(';')
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .collect()
}

fn ident(token: &str) -> String {
    token
        .trim_matches(|c: char| c == '"' || c == '(')
        .to_lowercase()
}

fn already_exists(kind: &str, name: &str) -> DatabaseFailure {
    let code = if kind == "type" { "42710" } else { "42P07" };
    DatabaseFailure::with_code(code, format!("{} \"{}\" already exists", kind, name))
}

fn missing_relation(name: &str) -> DatabaseFailure {
    DatabaseFailure::with_code("42P01", format!("relation \"{}\" does not exist", name))
}

fn apply(catalog: &mut Catalog, statement: &str) -> Result<(), DatabaseFailure> {
    let lower = statement.to_lowercase();
    let words: Vec<&str> = lower.split(' ').collect();

    match words.as_slice() {
        ["create", "table", "if", "not", "exists", name, ..] => {
            catalog.tables.insert(ident(name));
            Ok(())
        }
        ["create", "table", name, ..] => {
            let name = ident(name);
            if catalog.tables.contains(&name) || catalog.indexes.contains(&name) {
                return Err(already_exists("relation", &name));
            }
            catalog.tables.insert(name);
            Ok(())
        }
        ["create", "unique", "index", name, "on", table, ..] | ["create", "index", name, "on", table, ..] => {
            let (name, table) = (ident(name), ident(table));
            if catalog.tables.contains(&name) || catalog.indexes.contains(&name) {
                return Err(already_exists("relation", &name));
            }
            if !catalog.tables.contains(&table) {
                return Err(missing_relation(&table));
            }
            catalog.indexes.insert(name);
            Ok(())
        }
        ["create", "type", name, ..] => {
            let name = ident(name);
            if !catalog.types.insert(name.clone()) {
                return Err(already_exists("type", &name));
            }
            Ok(())
        }
        ["alter", "table", name, ..] => {
            let name = ident(name);
            if !catalog.tables.contains(&name) {
                return Err(missing_relation(&name));
            }
            Ok(())
        }
        ["insert", "into", table, rest @ ..] => {
            let table = ident(table);
            if !catalog.tables.contains(&table) {
                return Err(missing_relation(&table));
            }
            if !catalog.rows.insert(format!("{}:{}", table, rest.join(" "))) {
                return Err(DatabaseFailure::with_code(
                    "23505",
                    format!("duplicate key value violates unique constraint \"{}_pkey\"", table),
                ));
            }
            Ok(())
        }
        _ => Err(DatabaseFailure::with_code(
            "42601",
            format!("syntax error at or near \"{}\"", words.first().copied().unwrap_or_default()),
        )),
    }
}

/// Write `files` into a fresh temporary migrations directory
pub fn migrations_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, sql) in files {
        fs::write(dir.path().join(name), sql).unwrap();
    }
    dir
}

pub const CREATE_USERS: &str = "-- users\nCREATE TABLE users (\n    id SERIAL PRIMARY KEY,\n    email TEXT NOT NULL\n);";
pub const ALTER_USERS: &str = "ALTER TABLE users ADD COLUMN display_name TEXT;";
pub const CREATE_ORDERS: &str = "CREATE TABLE orders (id SERIAL PRIMARY KEY, user_id INT REFERENCES users (id));\nCREATE INDEX orders_user_id_idx ON orders (user_id);";
