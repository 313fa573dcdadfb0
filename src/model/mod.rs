mod entities;
mod error;
mod query;
mod response;
mod sink;

pub use entities::*;
pub use error::*;
pub use query::*;
pub use response::*;
pub use sink::*;
