use tempfile::tempdir;
use toolforge::db::{self, init_db};
use toolforge::ToolforgeError;

#[tokio::test]
async fn test_migrations_and_schema() {
    let dir = match tempdir() {
        Ok(d) => d,
        Err(e) => panic!("Failed to create temp dir: {:?}", e),
    };
    let db_path = dir.path().join("test_toolforge.db");

    // 1. Initialize DB (runs migrations and seeds categories)
    let pool = match init_db(&db_path).await {
        Ok(p) => p,
        Err(e) => panic!("Failed to init DB: {:?}", e),
    };

    // 2. Verify WAL mode
    let journal_mode: (String,) = match sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
    {
        Ok(jm) => jm,
        Err(e) => panic!("Failed to query journal_mode: {:?}", e),
    };
    assert_eq!(journal_mode.0.to_uppercase(), "WAL");

    // 3. Verify Tables exist
    let tables: Vec<(String,)> =
        match sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table'")
            .fetch_all(&pool)
            .await
        {
            Ok(t) => t,
            Err(e) => panic!("Failed to query tables: {:?}", e),
        };

    let table_names: Vec<String> = tables.into_iter().map(|t| t.0).collect();
    assert!(table_names.contains(&"tools".to_string()));
    assert!(table_names.contains(&"categories".to_string()));
    assert!(table_names.contains(&"schema_metadata".to_string()));

    // 4. Verify Indexes exist
    let indexes: Vec<(String,)> =
        match sqlx::query_as("SELECT name FROM sqlite_master WHERE type='index'")
            .fetch_all(&pool)
            .await
        {
            Ok(i) => i,
            Err(e) => panic!("Failed to query indexes: {:?}", e),
        };

    let index_names: Vec<String> = indexes.into_iter().map(|i| i.0).collect();
    assert!(index_names.contains(&"idx_tools_category".to_string()));
    assert!(index_names.contains(&"idx_tools_last_modified".to_string()));

    // 5. Verify Columns in tools
    let columns: Vec<(i64, String, String, i64, Option<String>, i64)> =
        match sqlx::query_as("PRAGMA table_info(tools)")
            .fetch_all(&pool)
            .await
        {
            Ok(c) => c,
            Err(e) => panic!("Failed to query table_info: {:?}", e),
        };

    let col_names: Vec<String> = columns.into_iter().map(|c| c.1).collect();
    for expected in ["raw_parameters", "input_schema", "annotations", "returns", "last_modified"] {
        assert!(col_names.contains(&expected.to_string()), "missing column {}", expected);
    }

    pool.close().await;
}

#[tokio::test]
async fn test_default_categories_seeded_once() {
    let dir = match tempdir() {
        Ok(d) => d,
        Err(e) => panic!("Failed to create temp dir: {:?}", e),
    };
    let db_path = dir.path().join("test_seed.db");

    let pool = match init_db(&db_path).await {
        Ok(p) => p,
        Err(e) => panic!("Failed to init DB: {:?}", e),
    };
    let names: Vec<String> = match db::list_categories(&pool).await {
        Ok(c) => c.into_iter().map(|c| c.name).collect(),
        Err(e) => panic!("Failed to list categories: {:?}", e),
    };
    assert_eq!(names, vec!["API", "CLI", "Data", "General"]);
    pool.close().await;

    // Re-opening must not insert the defaults again
    let pool = match init_db(&db_path).await {
        Ok(p) => p,
        Err(e) => panic!("Failed to re-open DB: {:?}", e),
    };
    let count: (i64,) = match sqlx::query_as("SELECT COUNT(*) FROM categories")
        .fetch_one(&pool)
        .await
    {
        Ok(c) => c,
        Err(e) => panic!("Failed to count categories: {:?}", e),
    };
    assert_eq!(count.0, 4);

    pool.close().await;
}

#[tokio::test]
async fn test_category_names_unique_ignoring_case() {
    let dir = match tempdir() {
        Ok(d) => d,
        Err(e) => panic!("Failed to create temp dir: {:?}", e),
    };
    let pool = match init_db(dir.path().join("test_unique.db")).await {
        Ok(p) => p,
        Err(e) => panic!("Failed to init DB: {:?}", e),
    };

    let created = match db::insert_category(&pool, "Search").await {
        Ok(c) => c,
        Err(e) => panic!("Failed to insert category: {:?}", e),
    };
    assert!(created.id.starts_with("cat_"));

    match db::insert_category(&pool, "search").await {
        Ok(c) => panic!("Duplicate category accepted: {:?}", c),
        Err(e) => assert!(matches!(e.inner, ToolforgeError::Conflict(_))),
    }

    match db::delete_category(&pool, &created.id).await {
        Ok(deleted) => assert!(deleted),
        Err(e) => panic!("Failed to delete category: {:?}", e),
    }
    match db::delete_category(&pool, &created.id).await {
        Ok(deleted) => assert!(!deleted),
        Err(e) => panic!("Failed to delete category: {:?}", e),
    }

    pool.close().await;
}
