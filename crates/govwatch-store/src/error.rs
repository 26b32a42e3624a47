use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("schema error: {0}")]
    Schema(#[from] govwatch_core::SchemaError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
