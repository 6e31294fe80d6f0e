use super::model::{AuditEntry, AuditOutcome, NewAuditEntry};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    // every connection to an in-memory URL is a separate database
    let max_connections = if normalized.starts_with("sqlite::memory") {
        1
    } else {
        5
    };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(&normalized)
        .await
        .with_context(|| format!("failed to open audit database {normalized}"))?;
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    // mode=rwc so a fresh data dir gets its database created
    let query = query_part.unwrap_or("mode=rwc");
    format!("sqlite://{expanded_path}?{query}")
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Append one operation and return its operation id.
#[instrument(skip_all, fields(operation = %entry.operation, outcome = %entry.outcome))]
pub async fn record_operation(pool: &Pool, entry: &NewAuditEntry) -> Result<Uuid> {
    let operation_id = Uuid::new_v4();
    let course_ids = serde_json::to_string(&entry.course_ids)?;
    sqlx::query(
        "INSERT INTO audit_log \
             (operation_id, operation, course_ids, reason, outcome, message, actor, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(operation_id.to_string())
    .bind(&entry.operation)
    .bind(course_ids)
    .bind(entry.reason.as_deref().filter(|r| !r.trim().is_empty()))
    .bind(entry.outcome.as_str())
    .bind(&entry.message)
    .bind(entry.actor.as_deref())
    .bind(Utc::now())
    .execute(pool)
    .await
    .context("failed to write audit entry")?;
    Ok(operation_id)
}

/// Newest first.
#[instrument(skip_all)]
pub async fn list_recent(pool: &Pool, limit: i64) -> Result<Vec<AuditEntry>> {
    let rows = sqlx::query(
        "SELECT id, operation_id, operation, course_ids, reason, outcome, message, actor, created_at \
         FROM audit_log ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.iter().map(entry_from_row).collect()
}

/// Entries touching `course_id`, newest first.
#[instrument(skip_all, fields(course_id = course_id))]
pub async fn list_for_course(pool: &Pool, course_id: i64) -> Result<Vec<AuditEntry>> {
    let rows = sqlx::query(
        "SELECT id, operation_id, operation, course_ids, reason, outcome, message, actor, created_at \
         FROM audit_log \
         WHERE EXISTS (SELECT 1 FROM json_each(audit_log.course_ids) WHERE value = ?) \
         ORDER BY id DESC",
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(entry_from_row).collect()
}

pub async fn count_by_outcome(pool: &Pool, outcome: AuditOutcome) -> Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_log WHERE outcome = ?")
        .bind(outcome.as_str())
        .fetch_one(pool)
        .await?;
    Ok(n)
}

fn entry_from_row(row: &SqliteRow) -> Result<AuditEntry> {
    let id: i64 = row.get("id");
    let operation_id: String = row.get("operation_id");
    let outcome: String = row.get("outcome");
    let course_ids: String = row.get("course_ids");
    Ok(AuditEntry {
        id,
        operation_id: Uuid::parse_str(&operation_id)
            .with_context(|| format!("audit entry {id} has a malformed operation id"))?,
        operation: row.get("operation"),
        course_ids: serde_json::from_str(&course_ids).unwrap_or_default(),
        reason: row.try_get::<Option<String>, _>("reason").ok().flatten(),
        outcome: AuditOutcome::parse(&outcome)
            .ok_or_else(|| anyhow!("audit entry {} has unknown outcome {}", id, outcome))?,
        message: row.get("message"),
        actor: row.try_get::<Option<String>, _>("actor").ok().flatten(),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}
