//! Database connection pool and schema bootstrap

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await
}

/// Split SQL into statements, keeping `$$` delimited blocks intact
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_dollar_block = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);

        if c == '$' && chars.peek() == Some(&'$') {
            current.push('$');
            chars.next();
            in_dollar_block = !in_dollar_block;
        } else if c == ';' && !in_dollar_block {
            if has_sql_content(&current) {
                statements.push(current.trim().to_string());
            }
            current.clear();
        }
    }

    if has_sql_content(&current) {
        statements.push(current.trim().to_string());
    }

    statements
}

/// Check if a string has actual SQL content (not just comments)
fn has_sql_content(s: &str) -> bool {
    s.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with("--")
    })
}

/// Run database migrations
///
/// Every statement is idempotent, so a failure is logged and the remaining
/// statements still run.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    let migration_sql = include_str!("migrations/001_initial.sql");

    for statement in split_sql_statements(migration_sql) {
        if let Err(e) = sqlx::query(&statement).execute(pool).await {
            tracing::warn!("Migration statement failed (possibly already applied): {}", e);
        }
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_dollar_blocks_whole() {
        let sql = r#"
            -- types
            DO $$ BEGIN
                CREATE TYPE t AS ENUM ('A');
            EXCEPTION WHEN duplicate_object THEN NULL;
            END $$;
            CREATE TABLE x (id INT);
        "#;
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("-- types"));
        assert!(statements[0].contains("EXCEPTION WHEN duplicate_object"));
        assert_eq!(statements[1], "CREATE TABLE x (id INT);");
    }

    #[test]
    fn test_comment_only_tail_is_dropped() {
        let statements = split_sql_statements("SELECT 1;\n-- trailing note\n");
        assert_eq!(statements, vec!["SELECT 1;".to_string()]);
    }

    #[test]
    fn test_bundled_migration_splits() {
        let statements = split_sql_statements(include_str!("migrations/001_initial.sql"));
        assert!(statements
            .iter()
            .any(|s| s.contains("CREATE TABLE IF NOT EXISTS permit_applications")));
    }
}
