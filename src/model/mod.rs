pub mod common;
pub mod entities;
pub mod query;
pub mod schema;
pub mod select;

pub use common::*;
pub use entities::*;
pub use query::*;
pub use schema::*;
pub use select::*;
