use crate::constants::DB_PRAGMAS;
use crate::tool::{Category, Tool, DEFAULT_CATEGORY_NAMES};
use crate::types::{Result, ToolforgeError};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;

pub type DbPool = SqlitePool;

pub async fn init_db<P: AsRef<Path>>(path: P) -> Result<DbPool> {
    let path_str = match path.as_ref().to_str() {
        Some(s) => s,
        None => {
            return Err(ToolforgeError::internal(
                "Invalid database path: Path contains non-UTF8 characters",
            )
            .into())
        }
    };
    let url = format!("sqlite:{}?mode=rwc", path_str);

    let pool = SqlitePool::connect(&url).await?;

    configure_db(&pool).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    verify_schema_version(&pool).await;

    if let Err(e) = seed_default_categories(&pool).await {
        tracing::warn!("Seeding default categories failed: {}", e);
    }

    Ok(pool)
}

async fn configure_db(pool: &DbPool) -> Result<()> {
    for pragma in DB_PRAGMAS {
        sqlx::query(pragma).execute(pool).await?;
    }
    Ok(())
}

async fn verify_schema_version(pool: &DbPool) {
    let version_row: std::result::Result<(String,), sqlx::Error> =
        sqlx::query_as("SELECT value FROM schema_metadata WHERE key = 'schema_version'")
            .fetch_one(pool)
            .await;

    match version_row {
        Ok((version,)) => {
            tracing::info!("Database initialized. Schema version: {}", version);
        }
        Err(e) => {
            tracing::warn!("Could not verify schema version: {}", e);
        }
    }
}

/// Inserts the default categories into an empty table.
pub async fn seed_default_categories(pool: &DbPool) -> Result<()> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    for name in DEFAULT_CATEGORY_NAMES {
        sqlx::query("INSERT OR IGNORE INTO categories (id, name) VALUES (?, ?)")
            .bind(new_category_id())
            .bind(name)
            .execute(pool)
            .await?;
    }
    tracing::info!("Default categories inserted");
    Ok(())
}

/// `cat_<unix millis>_<5 random chars>`
fn new_category_id() -> String {
    let suffix: String = (0..5)
        .map(|_| {
            let n = fastrand::u8(0..36);
            if n < 10 {
                (b'0' + n) as char
            } else {
                (b'a' + n - 10) as char
            }
        })
        .collect();
    format!("cat_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}

fn to_json_text<T: Serialize>(value: &Option<T>) -> Result<Option<String>> {
    match value {
        Some(v) => Ok(Some(serde_json::to_string(v)?)),
        None => Ok(None),
    }
}

fn json_column(row: &SqliteRow, column: &str) -> Result<Value> {
    let raw: Option<String> = row.try_get(column)?;
    match raw {
        Some(text) => Ok(serde_json::from_str(&text)?),
        None => Ok(Value::Null),
    }
}

fn row_to_tool(row: &SqliteRow) -> Result<Tool> {
    let value = json!({
        "id": row.try_get::<String, _>("id")?,
        "name": row.try_get::<String, _>("name")?,
        "description": row.try_get::<String, _>("description")?,
        "category": row.try_get::<String, _>("category")?,
        "status": row.try_get::<String, _>("status")?,
        "version": row.try_get::<Option<String>, _>("version")?,
        "parameters": json_column(row, "parameters")?,
        "rawParameters": json_column(row, "raw_parameters")?,
        "inputSchema": json_column(row, "input_schema")?,
        "annotations": json_column(row, "annotations")?,
        "returns": json_column(row, "returns")?,
        "lastModified": row.try_get::<String, _>("last_modified")?,
    });
    Ok(serde_json::from_value(value)?)
}

pub async fn list_tools(pool: &DbPool) -> Result<Vec<Tool>> {
    let rows = sqlx::query("SELECT * FROM tools ORDER BY last_modified DESC")
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_tool).collect()
}

pub async fn get_tool(pool: &DbPool, id: &str) -> Result<Option<Tool>> {
    let row = sqlx::query("SELECT * FROM tools WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_tool).transpose()
}

/// Insert or replace, keyed by `tool.id`.
pub async fn save_tool(pool: &DbPool, tool: &Tool) -> Result<()> {
    sqlx::query(
        "INSERT OR REPLACE INTO tools \
         (id, name, description, category, status, version, parameters, raw_parameters, \
          input_schema, annotations, returns, last_modified) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&tool.id)
    .bind(&tool.name)
    .bind(&tool.description)
    .bind(&tool.category)
    .bind(tool.status.as_str())
    .bind(&tool.version)
    .bind(serde_json::to_string(&tool.parameters)?)
    .bind(to_json_text(&tool.raw_parameters)?)
    .bind(to_json_text(&tool.input_schema)?)
    .bind(to_json_text(&tool.annotations)?)
    .bind(to_json_text(&tool.returns)?)
    .bind(&tool.last_modified)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns `false` when no row matched.
pub async fn delete_tool(pool: &DbPool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM tools WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_categories(pool: &DbPool) -> Result<Vec<Category>> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(pool)
            .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| Category { id, name })
        .collect())
}

/// Names are unique ignoring case; a duplicate is a `Conflict`.
pub async fn insert_category(pool: &DbPool, name: &str) -> Result<Category> {
    let category = Category {
        id: new_category_id(),
        name: name.to_string(),
    };

    let result = sqlx::query("INSERT INTO categories (id, name) VALUES (?, ?)")
        .bind(&category.id)
        .bind(&category.name)
        .execute(pool)
        .await;

    match result {
        Ok(_) => Ok(category),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(ToolforgeError::Conflict("Category already exists".into()).into())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn delete_category(pool: &DbPool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_id_shape() {
        let id = new_category_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "cat");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 5);
        assert!(parts[2].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
