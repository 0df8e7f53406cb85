pub mod backend;
pub mod health_impl;
pub mod queries;
pub mod schema;

pub use backend::DuckDbBackend;
