use crate::error::{Error, Result};
use std::borrow::Borrow;
use std::fmt;

const MAX_ID_LEN: usize = 256;

fn validate_id(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidId("provider id must not be empty".to_string()));
    }
    if trimmed.len() > MAX_ID_LEN {
        return Err(Error::InvalidId(format!(
            "provider id length must be <= {MAX_ID_LEN}"
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(Error::InvalidId(
            "provider id contains control characters".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Identifier assigned by the identity provider to a user or role.
///
/// Provider ids are opaque (`auth0|5f7c8ec7`, `rol_x1Yz`). They are only
/// ever obtained from the provider itself and handed back to it verbatim.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates a validated identifier.
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        validate_id(value.as_ref()).map(Self)
    }

    /// Creates an identifier from a trusted string without validation.
    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    /// Returns the underlying string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProviderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ProviderId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::from_string(value)
    }
}

/// A user as reported by the identity provider.
///
/// The email is the principal's name for role queries. Providers may return
/// users without one (machine accounts, unverified social logins); such users
/// cannot be addressed by name.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectoryUser {
    /// Provider identifier.
    pub id: ProviderId,
    /// Email address, used as the principal name.
    pub email: Option<String>,
}

impl DirectoryUser {
    /// Creates a user with an email.
    pub fn new(id: ProviderId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: Some(email.into()),
        }
    }

    /// Creates a user the provider reports without an email.
    pub fn without_email(id: ProviderId) -> Self {
        Self { id, email: None }
    }
}

/// A role (group) as reported by the identity provider.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectoryRole {
    /// Provider identifier.
    pub id: ProviderId,
    /// Human-readable role name.
    pub name: String,
}

impl DirectoryRole {
    /// Creates a role.
    pub fn new(id: ProviderId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}
