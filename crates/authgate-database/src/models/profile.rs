//! Partial profile updates restricted to a fixed set of columns.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use authgate_core::{AppError, AppResult};

/// A user column that may be changed through a profile update.
///
/// Anything not listed here (digest, privilege flags, activity flag) can
/// only be changed through its dedicated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Username,
    FirstName,
    LastName,
    Email,
    Phone,
    Country,
}

impl ProfileField {
    /// Every updatable field.
    pub const ALL: [ProfileField; 6] = [
        Self::Username,
        Self::FirstName,
        Self::LastName,
        Self::Email,
        Self::Phone,
        Self::Country,
    ];

    /// The `users` column backing this field.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Country => "country",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl FromStr for ProfileField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.column() == s)
            .ok_or_else(|| AppError::validation(format!("Field '{s}' cannot be updated")))
    }
}

/// One column assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// Target column.
    pub field: ProfileField,
    /// New value.
    pub value: String,
}

impl ProfileUpdate {
    /// Parse a JSON object of `column -> string` pairs.
    ///
    /// Fails on an empty object, an unknown key, a non-string value or an
    /// empty username.
    pub fn from_json(map: &Map<String, Value>) -> AppResult<Vec<Self>> {
        if map.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }

        map.iter()
            .map(|(key, value)| {
                let field: ProfileField = key.parse()?;
                let value = value.as_str().ok_or_else(|| {
                    AppError::validation(format!("Field '{key}' must be a string"))
                })?;
                if field == ProfileField::Username && value.trim().is_empty() {
                    return Err(AppError::validation("Username cannot be empty"));
                }
                Ok(Self {
                    field,
                    value: value.to_string(),
                })
            })
            .collect()
    }
}
