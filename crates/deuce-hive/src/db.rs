use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

const CONNECT_ATTEMPTS: u32 = 30;

/// Connects to Postgres and makes sure the match tables exist.
pub async fn init_db(db_url: &str) -> Result<PgPool, sqlx::Error> {
    info!("🔌 Connecting to PostgreSQL...");
    let pool = connect_with_retry(db_url, CONNECT_ATTEMPTS, Duration::from_secs(1)).await?;

    apply_schema(&pool, include_str!("../schema.sql")).await?;
    info!("✅ Database connected and schema applied.");
    Ok(pool)
}

async fn connect_with_retry(
    db_url: &str,
    attempts: u32,
    delay: Duration,
) -> Result<PgPool, sqlx::Error> {
    let mut attempt = 1;
    loop {
        match PgPoolOptions::new()
            .max_connections(20)
            .connect(db_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < attempts => {
                warn!(
                    "⚠️  DB connection attempt {}/{} failed: {}. Retrying...",
                    attempt, attempts, e
                );
                attempt += 1;
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn apply_schema(pool: &PgPool, schema: &str) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for (i, sql) in statements(schema).iter().enumerate() {
        if let Err(e) = sqlx::query(sql).execute(&mut *tx).await {
            error!("🚨 Schema error in statement #{}:\n{}", i + 1, sql);
            return Err(e);
        }
    }
    tx.commit().await
}

/// Splits a schema file on statement-ending semicolons, dropping `--` comments.
fn statements(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for line in raw.lines() {
        let code = line.split("--").next().unwrap_or("").trim_end();
        if code.trim().is_empty() {
            continue;
        }
        current.push_str(code);
        current.push('\n');
        if code.ends_with(';') {
            out.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}
