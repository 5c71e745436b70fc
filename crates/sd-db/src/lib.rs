//! sd-db: database access and persistence layer.
//!
//! This crate provides SQLite-backed storage for school records with
//! connection pooling, embedded migrations, a typed model, and query
//! functions.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
