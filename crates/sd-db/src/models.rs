//! Rust structs mapping to database tables.

use sd_core::{Contact, SchoolId};

/// A persisted school record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct School {
    pub id: SchoolId,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: Contact,
    pub email_id: String,
    /// Public URL or path of the school's image.
    pub image: String,
    /// Blob store key used to delete the image.
    pub image_key: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Column list matching [`School::from_row`].
pub(crate) const SCHOOL_COLUMNS: &str =
    "id, name, address, city, state, contact, email_id, image, image_key, created_at, updated_at";

impl School {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let raw_contact: i64 = row.get(5)?;
        let contact = Contact::from_stored(raw_contact).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Integer,
                Box::new(e),
            )
        })?;

        Ok(Self {
            id: SchoolId::from(row.get::<_, i64>(0)?),
            name: row.get(1)?,
            address: row.get(2)?,
            city: row.get(3)?,
            state: row.get(4)?,
            contact,
            email_id: row.get(6)?,
            image: row.get(7)?,
            image_key: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}
