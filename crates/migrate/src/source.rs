//! Migration Source - discovers migration files on disk
//!
//! Lists a directory, keeps `.sql` files, drops baseline files (names starting
//! with `000`), and returns them in byte-wise lexical order with their SQL text
//! already loaded.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MigrationError, MigrationResult};

/// Default file suffix for migrations
pub const MIGRATION_SUFFIX: &str = ".sql";

/// Files starting with this prefix are baseline files applied out-of-band
pub const BASELINE_PREFIX: &str = "000";

/// Default migrations directory, relative to the working directory
pub const DEFAULT_MIGRATIONS_DIR: &str = "database/migrations";

/// A migration file read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// File name, also the ordering key
    pub name: String,
    pub path: PathBuf,
    /// Full SQL text, executed as one batch
    pub sql: String,
}

/// Directory scanner for migration files
#[derive(Debug, Clone)]
pub struct MigrationSource {
    dir: PathBuf,
    suffix: String,
    baseline_prefix: String,
}

impl MigrationSource {
    /// Create a source with the default suffix and baseline prefix
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            suffix: MIGRATION_SUFFIX.to_string(),
            baseline_prefix: BASELINE_PREFIX.to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_baseline_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.baseline_prefix = prefix.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Check whether a file name qualifies as a migration to run
    pub fn accepts(&self, name: &str) -> bool {
        name.ends_with(&self.suffix) && !name.starts_with(&self.baseline_prefix)
    }

    /// Names of qualifying files, sorted, without reading their contents
    pub fn list_names(&self) -> MigrationResult<Vec<String>> {
        let metadata = fs::metadata(&self.dir)
            .map_err(|e| MigrationError::source_error(&self.dir, e))?;
        if !metadata.is_dir() {
            return Err(MigrationError::source_error(
                &self.dir,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
            ));
        }

        let entries = fs::read_dir(&self.dir)
            .map_err(|e| MigrationError::source_error(&self.dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MigrationError::source_error(&self.dir, e))?;

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!("Skipping migration entry with non UTF-8 name: {:?}", raw);
                    continue;
                }
            };

            if !self.accepts(&name) {
                tracing::debug!("Ignoring {}", name);
                continue;
            }

            // Follows symlinks. A dangling link is kept and fails when read.
            match fs::metadata(entry.path()) {
                Ok(metadata) if !metadata.is_file() => {
                    tracing::debug!("Ignoring non-file entry {}", name);
                    continue;
                }
                _ => {}
            }

            names.push(name);
        }

        // String ordering is byte-wise, which is the ordering contract
        names.sort();
        Ok(names)
    }

    /// Discover and read all migration files, in application order
    pub fn list(&self) -> MigrationResult<Vec<MigrationFile>> {
        let names = self.list_names()?;
        let mut migrations = Vec::with_capacity(names.len());

        for name in names {
            let path = self.dir.join(&name);
            let sql = fs::read_to_string(&path)
                .map_err(|e| MigrationError::source_error(&path, e))?;
            migrations.push(MigrationFile { name, path, sql });
        }

        tracing::debug!(
            "Discovered {} migration(s) in {}",
            migrations.len(),
            self.dir.display()
        );
        Ok(migrations)
    }
}

/// Discover migrations in `dir` using the default suffix and baseline prefix
pub fn list_migrations(dir: impl AsRef<Path>) -> MigrationResult<Vec<MigrationFile>> {
    MigrationSource::new(dir.as_ref()).list()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, sql: &str) {
        fs::write(dir.path().join(name), sql).unwrap();
    }

    #[test]
    fn test_orders_lexically_and_skips_baseline() {
        let dir = TempDir::new().unwrap();
        write(&dir, "010_add_index.sql", "CREATE INDEX idx ON users (email);");
        write(&dir, "000_baseline.sql", "CREATE TABLE legacy (id INT);");
        write(&dir, "002_create_orders.sql", "CREATE TABLE orders (id INT);");
        write(&dir, "001_create_users.sql", "CREATE TABLE users (id INT);");

        let migrations = list_migrations(dir.path()).unwrap();
        let names: Vec<_> = migrations.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["001_create_users.sql", "002_create_orders.sql", "010_add_index.sql"]
        );
        assert_eq!(migrations[0].sql, "CREATE TABLE users (id INT);");
        assert_eq!(migrations[0].path, dir.path().join("001_create_users.sql"));
    }

    #[test]
    fn test_ignores_other_extensions_and_directories() {
        let dir = TempDir::new().unwrap();
        write(&dir, "001_create_users.sql", "SELECT 1;");
        write(&dir, "README.md", "docs");
        write(&dir, "002_notes.sql.bak", "SELECT 2;");
        fs::create_dir(dir.path().join("003_nested.sql")).unwrap();

        let names = MigrationSource::new(dir.path()).list_names().unwrap();
        assert_eq!(names, vec!["001_create_users.sql"]);
    }

    #[test]
    fn test_byte_order_not_numeric_order() {
        let dir = TempDir::new().unwrap();
        write(&dir, "10_b.sql", "");
        write(&dir, "9_a.sql", "");
        write(&dir, "B_upper.sql", "");
        write(&dir, "a_lower.sql", "");

        let names = MigrationSource::new(dir.path()).list_names().unwrap();
        assert_eq!(names, vec!["10_b.sql", "9_a.sql", "B_upper.sql", "a_lower.sql"]);
    }

    #[test]
    fn test_custom_suffix_and_prefix() {
        let dir = TempDir::new().unwrap();
        write(&dir, "base_schema.up.sql", "");
        write(&dir, "001_users.up.sql", "");
        write(&dir, "001_users.down.sql", "");

        let source = MigrationSource::new(dir.path())
            .with_suffix(".up.sql")
            .with_baseline_prefix("base_");
        assert_eq!(source.list_names().unwrap(), vec!["001_users.up.sql"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_migrations_are_kept() {
        let dir = TempDir::new().unwrap();
        let shared = TempDir::new().unwrap();
        write(&dir, "001_a.sql", "CREATE TABLE a (id INT);");
        fs::write(shared.path().join("b.sql"), "CREATE TABLE b (id INT);").unwrap();
        std::os::unix::fs::symlink(shared.path().join("b.sql"), dir.path().join("002_b.sql")).unwrap();
        fs::create_dir(shared.path().join("nested.sql")).unwrap();
        std::os::unix::fs::symlink(shared.path().join("nested.sql"), dir.path().join("003_dir.sql")).unwrap();

        let migrations = list_migrations(dir.path()).unwrap();
        let names: Vec<_> = migrations.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["001_a.sql", "002_b.sql"]);
        assert_eq!(migrations[1].sql, "CREATE TABLE b (id INT);");
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_source_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "001_a.sql", "");
        std::os::unix::fs::symlink(dir.path().join("gone.sql.orig"), dir.path().join("002_gone.sql")).unwrap();

        let source = MigrationSource::new(dir.path());
        assert_eq!(source.list_names().unwrap(), vec!["001_a.sql", "002_gone.sql"]);

        match source.list().unwrap_err() {
            MigrationError::Source { path, source } => {
                assert_eq!(path, dir.path().join("002_gone.sql"));
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected source error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(list_migrations(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_directory_is_source_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");

        let err = list_migrations(&missing).unwrap_err();
        match err {
            MigrationError::Source { path, source } => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected source error, got {:?}", other),
        }
    }

    #[test]
    fn test_file_instead_of_directory_is_source_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "plain.sql", "");

        let err = list_migrations(dir.path().join("plain.sql")).unwrap_err();
        assert!(matches!(err, MigrationError::Source { .. }));
    }
}
