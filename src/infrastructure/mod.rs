mod cache_memory;
mod data_source_watcher;
mod executor_watching;
mod fetcher_graphql;
mod fetcher_rate_limiter;
mod fetcher_retrier;

pub use cache_memory::*;
pub use data_source_watcher::*;
pub use executor_watching::*;
pub use fetcher_graphql::*;
pub use fetcher_rate_limiter::*;
pub use fetcher_retrier::*;
