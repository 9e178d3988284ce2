//! Client domain model.
//!
//! # Responsibility
//! - Define the client record exchanged between callers and the DAO.
//! - Make the full-record update contract explicit at the type level.
//!
//! # Invariants
//! - `id` is assigned by storage and never changes once set.
//! - Optional fields use `None` for absence end to end; there is no sentinel value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Storage-assigned client identifier.
pub type ClientId = i64;

/// Gender recorded for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Returns the persisted text form (`male` / `female`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl Display for Gender {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ClientValidationError;

    /// Parses the exact persisted form. Matching is case-sensitive.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            other => Err(ClientValidationError::UnknownGender(other.to_string())),
        }
    }
}

/// Client record as seen by callers.
///
/// A freshly built record has `id = None`; the DAO fills identifiers on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Option<ClientId>,
    pub name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<Gender>,
}

impl Client {
    /// Creates an unsaved client with the given name and no optional fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            birthday: None,
            gender: None,
        }
    }

    pub fn with_birthday(mut self, birthday: NaiveDate) -> Self {
        self.birthday = Some(birthday);
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    /// Returns whether storage has assigned an identifier.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Full replacement of a persisted client row.
///
/// Every column is required; there is no partial-update path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientUpdate {
    pub id: ClientId,
    pub name: String,
    pub birthday: NaiveDate,
    pub gender: Gender,
}

impl TryFrom<&Client> for ClientUpdate {
    type Error = ClientValidationError;

    fn try_from(client: &Client) -> Result<Self, Self::Error> {
        let id = client.id.ok_or(ClientValidationError::MissingId)?;
        if id < 0 {
            return Err(ClientValidationError::NegativeId(id));
        }

        Ok(Self {
            id,
            name: client
                .name
                .clone()
                .ok_or(ClientValidationError::MissingField("name"))?,
            birthday: client
                .birthday
                .ok_or(ClientValidationError::MissingField("birthday"))?,
            gender: client
                .gender
                .ok_or(ClientValidationError::MissingField("gender"))?,
        })
    }
}

impl From<ClientUpdate> for Client {
    fn from(update: ClientUpdate) -> Self {
        Self {
            id: Some(update.id),
            name: Some(update.name),
            birthday: Some(update.birthday),
            gender: Some(update.gender),
        }
    }
}

/// Contract violations detected before any SQL runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientValidationError {
    MissingId,
    MissingField(&'static str),
    NegativeId(ClientId),
    UnknownGender(String),
}

impl Display for ClientValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "client has no storage-assigned id"),
            Self::MissingField(field) => write!(f, "client field `{field}` is required"),
            Self::NegativeId(id) => write!(f, "client id must be non-negative, got {id}"),
            Self::UnknownGender(value) => {
                write!(f, "unknown gender `{value}`; expected male|female")
            }
        }
    }
}

impl Error for ClientValidationError {}
