//! Database query modules.

pub mod schools;
