pub mod common;
pub mod delete;
pub mod favorite;
pub mod list;
pub mod related;
pub mod validate;
