use std::path::Path;

use anyhow::Context;
use tidemark_core::DatabaseConfig;
use tidemark_migrate::{list_migrations, run_migrations, MigrationOutcome, RunSummary};

/// Apply every pending migration in `migrations_dir`
pub async fn run(migrations_dir: &Path) -> anyhow::Result<()> {
    let config = DatabaseConfig::from_env()?;

    println!("🚀 Running migrations from {}", migrations_dir.display());
    let summary = run_migrations(&config, migrations_dir).await?;

    print_summary(&summary);
    Ok(())
}

/// Print the files a run would apply, in order, without touching the database
pub async fn list(migrations_dir: &Path) -> anyhow::Result<()> {
    let migrations = list_migrations(migrations_dir)
        .with_context(|| format!("Cannot list migrations in {}", migrations_dir.display()))?;

    if migrations.is_empty() {
        println!("No migrations found in {}", migrations_dir.display());
        return Ok(());
    }

    println!("Found {} migration(s):", migrations.len());
    for migration in &migrations {
        println!("  {}", migration.name);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for result in &summary.results {
        match &result.outcome {
            MigrationOutcome::Applied => println!("✅ {}", result.name),
            MigrationOutcome::SkippedAlreadyExists { failure } => {
                println!("⚠️  {} skipped, objects already exist ({})", result.name, failure)
            }
            MigrationOutcome::Failed { failure, .. } => println!("❌ {}: {}", result.name, failure),
        }
    }

    println!("\n📊 Tables in {} schema: {}", summary.snapshot.schema, summary.snapshot.len());
    for table in &summary.snapshot.tables {
        println!("  - {}", table);
    }

    println!(
        "\n✅ All migrations completed in {}ms ({} applied, {} skipped)",
        summary.elapsed.as_millis(),
        summary.applied_count(),
        summary.skipped_count()
    );
}
