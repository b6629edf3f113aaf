//! Error types for the tablewatch protocol layer.

mod schema;
mod session;
mod store;

pub use schema::*;
pub use session::*;
pub use store::*;
