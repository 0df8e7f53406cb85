pub mod anomaly;
pub mod config;
pub mod error;
pub mod health;
pub mod occurrence;
pub mod window;
