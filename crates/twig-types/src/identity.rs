use std::fmt;

use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Characters that would make a signature line ambiguous.
const FORBIDDEN_CHARS: &[char] = &['<', '>', '\n', '\0'];

/// Author or committer signature attached to a commit.
///
/// Timestamps carry the signer's timezone offset and are truncated to whole
/// seconds, so an identity serializes the same way no matter when it was
/// captured within a second.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Display name (e.g. "Dawa Ometto").
    pub name: String,
    /// Email address, without angle brackets.
    pub email: String,
    /// When the signature was made.
    pub when: DateTime<FixedOffset>,
}

impl Identity {
    /// Create an identity stamped with the current UTC time.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::at(name, email, Utc::now().into())
    }

    /// Create an identity with an explicit timestamp.
    pub fn at(
        name: impl Into<String>,
        email: impl Into<String>,
        when: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            when: when.trunc_subsecs(0),
        }
    }

    /// Same person, different timestamp.
    pub fn with_time(&self, when: DateTime<FixedOffset>) -> Self {
        Self::at(self.name.clone(), self.email.clone(), when)
    }

    /// Reject names and emails that cannot be written on a signature line.
    pub fn validate(&self) -> Result<(), TypeError> {
        if self.name.trim().is_empty() {
            return Err(TypeError::InvalidIdentity("name must not be empty".into()));
        }
        for (field, value) in [("name", &self.name), ("email", &self.email)] {
            if let Some(ch) = value.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
                return Err(TypeError::InvalidIdentity(format!(
                    "{field} contains forbidden character {ch:?}"
                )));
            }
        }
        Ok(())
    }

    /// Seconds since the UNIX epoch.
    pub fn seconds(&self) -> i64 {
        self.when.timestamp()
    }
}

impl fmt::Display for Identity {
    /// Git signature-line format: `Name <email> 1700000000 +0100`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.when.timestamp(),
            self.when.format("%z")
        )
    }
}
