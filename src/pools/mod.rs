pub mod entry;
pub mod fetcher;
pub mod source;

pub use entry::{parse_pool_list, PoolEntry};
pub use fetcher::{FetchState, PoolListFetcher};
pub use source::{HttpPoolSource, PoolSource};
