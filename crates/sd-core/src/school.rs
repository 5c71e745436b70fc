//! School field types and boundary validation.
//!
//! Raw form values arrive as [`RawFields`] and are turned into either a
//! complete [`SchoolFields`] (create) or a partial [`SchoolPatch`] (update).
//! Every value that leaves this module has already been validated, so the
//! record store never re-checks formats.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Number of digits in a contact number.
pub const CONTACT_DIGITS: usize = 10;

/// Largest value a 10-digit contact can hold.
const CONTACT_MAX: i64 = 9_999_999_999;

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// A 10-digit contact number.
///
/// Stored as an integer, but always rendered as a zero-padded decimal string
/// (on the wire and in `Display`) so `0123456789` survives a round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Contact(i64);

impl Contact {
    /// Parse a contact from user input. Exactly 10 ASCII digits are accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.len() != CONTACT_DIGITS || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Validation(
                "Contact must be a 10-digit number".into(),
            ));
        }
        raw.parse::<i64>()
            .map(Self)
            .map_err(|e| Error::Validation(format!("Invalid contact number: {e}")))
    }

    /// Rebuild a contact from its stored integer form.
    pub fn from_stored(value: i64) -> Result<Self> {
        if (0..=CONTACT_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::Internal(format!(
                "stored contact {value} is outside the 10-digit range"
            )))
        }
    }

    /// Integer form used by the record store.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = CONTACT_DIGITS)
    }
}

impl Serialize for Contact {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Contact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Contact::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$",
        )
        .expect("email pattern compiles")
    })
}

/// Check that `raw` is a syntactically valid email address and return it trimmed.
pub fn validate_email(raw: &str) -> Result<String> {
    let email = raw.trim();
    if email.contains("..") || !email_pattern().is_match(email) {
        return Err(Error::Validation("Invalid email address".into()));
    }
    Ok(email.to_string())
}

// ---------------------------------------------------------------------------
// Image reference
// ---------------------------------------------------------------------------

/// Where a stored image lives.
///
/// `url` is what clients display (a public path or a full URL); `key` is the
/// identifier the blob store needs to delete it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub key: String,
}

// ---------------------------------------------------------------------------
// Field sets
// ---------------------------------------------------------------------------

/// The complete, validated field set required to create a school.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolFields {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub contact: Contact,
    pub email_id: String,
}

/// A validated partial update. `None` means "keep the stored value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchoolPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub contact: Option<Contact>,
    pub email_id: Option<String>,
}

impl SchoolPatch {
    /// True when no field is being changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.contact.is_none()
            && self.email_id.is_none()
    }
}

/// Unvalidated text fields as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub contact: Option<String>,
    pub email_id: Option<String>,
}

impl RawFields {
    /// Record a submitted field. Returns `false` if the name is not a school field.
    ///
    /// A repeated field keeps the last value.
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "address" => &mut self.address,
            "city" => &mut self.city,
            "state" => &mut self.state,
            "contact" => &mut self.contact,
            "email_id" => &mut self.email_id,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Validate a complete field set. All problems are reported at once.
    pub fn into_fields(self) -> Result<SchoolFields> {
        let mut problems = Vec::new();

        let name = required_text(self.name, "School name is required", &mut problems);
        let address = required_text(self.address, "Address is required", &mut problems);
        let city = required_text(self.city, "City is required", &mut problems);
        let state = required_text(self.state, "State is required", &mut problems);
        let contact = collect(
            self.contact
                .as_deref()
                .map(Contact::parse)
                .unwrap_or_else(|| Err(Error::Validation("Contact must be a 10-digit number".into()))),
            &mut problems,
        );
        let email_id = collect(
            self.email_id
                .as_deref()
                .map(validate_email)
                .unwrap_or_else(|| Err(Error::Validation("Invalid email address".into()))),
            &mut problems,
        );

        match (name, address, city, state, contact, email_id) {
            (Some(name), Some(address), Some(city), Some(state), Some(contact), Some(email_id))
                if problems.is_empty() =>
            {
                Ok(SchoolFields {
                    name,
                    address,
                    city,
                    state,
                    contact,
                    email_id,
                })
            }
            _ => Err(Error::Validation(problems.join("; "))),
        }
    }

    /// Validate whichever fields were supplied.
    pub fn into_patch(self) -> Result<SchoolPatch> {
        let mut problems = Vec::new();

        let patch = SchoolPatch {
            name: optional_text(self.name, "School name is required", &mut problems),
            address: optional_text(self.address, "Address is required", &mut problems),
            city: optional_text(self.city, "City is required", &mut problems),
            state: optional_text(self.state, "State is required", &mut problems),
            contact: self
                .contact
                .and_then(|raw| collect(Contact::parse(&raw), &mut problems)),
            email_id: self
                .email_id
                .and_then(|raw| collect(validate_email(&raw), &mut problems)),
        };

        if problems.is_empty() {
            Ok(patch)
        } else {
            Err(Error::Validation(problems.join("; ")))
        }
    }
}

fn required_text(value: Option<String>, message: &str, problems: &mut Vec<String>) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            problems.push(message.to_string());
            None
        }
    }
}

fn optional_text(value: Option<String>, message: &str, problems: &mut Vec<String>) -> Option<String> {
    value.and_then(|v| required_text(Some(v), message, problems))
}

fn collect<T>(result: Result<T>, problems: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(Error::Validation(msg)) => {
            problems.push(msg);
            None
        }
        Err(other) => {
            problems.push(other.to_string());
            None
        }
    }
}
