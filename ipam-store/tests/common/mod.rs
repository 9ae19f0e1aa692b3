//! Shared helpers for backend tests.

#![allow(dead_code)]

use ipam_store::{MemoryBackend, RequestContext, StorageBackend};

pub fn cx() -> RequestContext {
    RequestContext::background()
}

pub fn memory() -> Box<dyn StorageBackend> {
    Box::new(MemoryBackend::new())
}

/// Get test database URL from environment.
pub fn test_db_url() -> Option<String> {
    std::env::var("TEST_POSTGRES_URL").ok()
}

/// Postgres backend on a fresh table, or `None` when no database is configured.
#[cfg(feature = "postgres")]
pub async fn postgres() -> Option<Box<dyn StorageBackend>> {
    use ipam_store::PostgresBackend;
    use sqlx::postgres::PgPoolOptions;

    let Some(url) = test_db_url() else {
        eprintln!("Skipping postgres: TEST_POSTGRES_URL not set");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to TEST_POSTGRES_URL");
    let table = format!("prefixes_{}", uuid::Uuid::new_v4().simple());
    let backend = PostgresBackend::with_table(pool, &table[..40])
        .await
        .expect("create test table");
    Some(Box::new(backend))
}

#[cfg(not(feature = "postgres"))]
pub async fn postgres() -> Option<Box<dyn StorageBackend>> {
    None
}

/// Every backend available in this environment.
pub async fn backends() -> Vec<Box<dyn StorageBackend>> {
    let mut backends = vec![memory()];
    if let Some(pg) = postgres().await {
        backends.push(pg);
    }
    backends
}
