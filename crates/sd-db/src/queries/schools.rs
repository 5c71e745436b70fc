//! School CRUD operations.

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::Connection;
use sd_core::{Error, ImageRef, Result, SchoolFields, SchoolId, SchoolPatch};

use crate::models::{School, SCHOOL_COLUMNS};

/// Insert a new school and return it with its assigned id.
pub fn create_school(conn: &Connection, fields: &SchoolFields, image: &ImageRef) -> Result<School> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO schools (name, address, city, state, contact, email_id, image, image_key, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        rusqlite::params![
            fields.name,
            fields.address,
            fields.city,
            fields.state,
            fields.contact.as_i64(),
            fields.email_id,
            image.url,
            image.key,
            now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(School {
        id: SchoolId::from(conn.last_insert_rowid()),
        name: fields.name.clone(),
        address: fields.address.clone(),
        city: fields.city.clone(),
        state: fields.state.clone(),
        contact: fields.contact,
        email_id: fields.email_id.clone(),
        image: image.url.clone(),
        image_key: image.key.clone(),
        created_at: now.clone(),
        updated_at: now,
    })
}

/// Get a school by ID.
pub fn get_school(conn: &Connection, id: SchoolId) -> Result<Option<School>> {
    let result = conn.query_row(
        &format!("SELECT {SCHOOL_COLUMNS} FROM schools WHERE id = ?1"),
        [id.get()],
        School::from_row,
    );
    match result {
        Ok(s) => Ok(Some(s)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List all schools in insertion order.
pub fn list_schools(conn: &Connection) -> Result<Vec<School>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {SCHOOL_COLUMNS} FROM schools ORDER BY id"))
        .map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], School::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Apply a partial update, optionally replacing the image reference.
///
/// Only the supplied columns change, in a single statement. `updated_at` is
/// always refreshed. Returns `None` if no school has this id.
pub fn update_school(
    conn: &Connection,
    id: SchoolId,
    patch: &SchoolPatch,
    image: Option<&ImageRef>,
) -> Result<Option<School>> {
    let mut sets: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    let text_columns = [
        ("name = ?", &patch.name),
        ("address = ?", &patch.address),
        ("city = ?", &patch.city),
        ("state = ?", &patch.state),
        ("email_id = ?", &patch.email_id),
    ];
    for (set, value) in text_columns {
        if let Some(v) = value {
            sets.push(set);
            values.push(Value::Text(v.clone()));
        }
    }
    if let Some(contact) = patch.contact {
        sets.push("contact = ?");
        values.push(Value::Integer(contact.as_i64()));
    }
    if let Some(image) = image {
        sets.push("image = ?");
        values.push(Value::Text(image.url.clone()));
        sets.push("image_key = ?");
        values.push(Value::Text(image.key.clone()));
    }
    sets.push("updated_at = ?");
    values.push(Value::Text(Utc::now().to_rfc3339()));
    values.push(Value::Integer(id.get()));

    let sql = format!("UPDATE schools SET {} WHERE id = ?", sets.join(", "));
    let n = conn
        .execute(&sql, rusqlite::params_from_iter(values))
        .map_err(|e| Error::database(e.to_string()))?;

    if n == 0 {
        return Ok(None);
    }
    get_school(conn, id)
}

/// Delete a school. Returns `false` if it did not exist.
pub fn delete_school(conn: &Connection, id: SchoolId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM schools WHERE id = ?1", [id.get()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
