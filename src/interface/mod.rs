mod data_source;
mod executor;
mod fetcher;

pub use data_source::*;
pub use executor::*;
pub use fetcher::*;
