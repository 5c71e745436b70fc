//! Typed identifier for school records.
//!
//! The record store assigns ids (SQLite rowids), so unlike random UUIDs the
//! wrapper never generates a value itself; it only carries one around.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a school, assigned by the record store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchoolId(i64);

impl SchoolId {
    /// Return the raw integer value.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for SchoolId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl From<SchoolId> for i64 {
    fn from(id: SchoolId) -> Self {
        id.0
    }
}

impl fmt::Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SchoolId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}
