//! SQLite-backed conversation and poll store

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::SqliteStore;
