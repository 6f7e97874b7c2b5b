//! Lookup subject: an email address and/or a username.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Errors raised while building an [`Identifier`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// Neither an email nor a username was given
    #[error("an email or a username is required")]
    Missing,

    /// The email does not look like `local@domain`
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
}

/// Which part of the identifier a tool consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    /// Email address
    Email,
    /// Username / handle
    Username,
    /// Email when present, otherwise username
    Any,
}

/// The subject of one lookup run.
///
/// A username is always available: when none is given it is the local part
/// of the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    email: Option<String>,
    username: String,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"))
}

impl Identifier {
    /// Build an identifier from optional CLI inputs.
    ///
    /// Blank strings are treated as absent.
    pub fn new(email: Option<String>, username: Option<String>) -> Result<Self, IdentifierError> {
        let email = email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        let username = username.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());

        if let Some(email) = &email {
            if !email_pattern().is_match(email) {
                return Err(IdentifierError::InvalidEmail(email.clone()));
            }
        }

        let username = match (username, &email) {
            (Some(username), _) => username,
            (None, Some(email)) => local_part(email).to_string(),
            (None, None) => return Err(IdentifierError::Missing),
        };

        Ok(Self { email, username })
    }

    /// Email address, if one was supplied.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Username, supplied or derived.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Resolve the value a tool of the given kind should receive.
    pub fn for_kind(&self, kind: IdentifierKind) -> Option<&str> {
        match kind {
            IdentifierKind::Email => self.email(),
            IdentifierKind::Username => Some(self.username()),
            IdentifierKind::Any => Some(self.email().unwrap_or(self.username())),
        }
    }
}

fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.email {
            Some(email) if local_part(email) != self.username => write!(f, "{} / {}", email, self.username),
            Some(email) => write!(f, "{}", email),
            None => write!(f, "{}", self.username),
        }
    }
}
