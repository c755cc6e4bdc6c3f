use tidemark_core::DatabaseConfig;
use tidemark_migrate::{check_connection, diagnose, ManagedPool};

/// Test connectivity and print what the server reports
pub async fn run() -> anyhow::Result<()> {
    println!("🔍 Testing database connection...");

    let config = DatabaseConfig::from_env()?;
    println!("Connection config: {}", config);

    let pool = ManagedPool::connect_lazy(&config)?;
    let result = check_connection(&pool).await;
    pool.close().await;

    let report = match result {
        Ok(report) => report,
        Err(failure) => {
            eprintln!("❌ Database connection failed!");
            eprintln!("Error message: {}", failure.message);
            eprintln!("Error code: {}", failure.code().unwrap_or("none"));

            let diagnosis = diagnose(&failure);
            eprintln!("\n💡 Fix: {}", diagnosis.title());
            for step in diagnosis.suggestions(&config) {
                eprintln!("   - {}", step);
            }
            anyhow::bail!("connection check failed: {}", failure);
        }
    };

    println!("✅ Database connection successful!");
    println!("Current time: {}", report.server_time);
    println!("PostgreSQL version: {}", report.server_version);

    println!("\n📊 Tables in database: {}", report.tables.len());
    if report.is_empty_database() {
        println!("Database is empty - ready for migrations!");
    } else {
        println!("Existing tables: {}", report.tables.join(", "));
    }
    Ok(())
}
