//! MongoDB backend over the official driver.

mod backend;
mod collection;

pub use backend::MongoBackend;
pub use collection::MongoCollection;
