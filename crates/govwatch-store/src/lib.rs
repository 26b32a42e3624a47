//! Storage layer: the `ScoreStore` contract, an in-memory store, DuckDB
//! (behind the `duckdb` feature), and the temporal service on top.

mod aggregator;
mod error;
mod memory;
mod store;

pub use aggregator::TemporalService;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{ScoreStore, WeekRange};

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;
