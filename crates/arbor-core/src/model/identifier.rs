use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ArborError, Result};

/// Name of an entry within its enclosing container
///
/// Any non-empty string that neither starts nor ends with `-`. Dashes at the
/// edges are reserved for parameter segments in paths.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(Arc<str>);

impl Identifier {
    /// Validate and wrap a string
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` for empty strings or strings with a leading
    /// or trailing dash.
    pub fn new(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref();
        if value.is_empty() {
            return Err(ArborError::InvalidIdentifier {
                value: value.to_string(),
                reason: "identifier cannot be empty".to_string(),
            });
        }
        if value.starts_with('-') || value.ends_with('-') {
            return Err(ArborError::InvalidIdentifier {
                value: value.to_string(),
                reason: "identifier cannot start or end with '-'".to_string(),
            });
        }
        Ok(Self(Arc::from(value)))
    }

    /// Generate a fresh identifier with the given prefix (UUID v7 suffix)
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdentifier` if the prefix starts with a dash.
    pub fn unique(prefix: &str) -> Result<Self> {
        Self::new(format!("{}{}", prefix, Uuid::now_v7().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identifier {
    type Error = ArborError;

    fn try_from(value: String) -> Result<Self> {
        Identifier::new(value)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = ArborError;

    fn try_from(value: &str) -> Result<Self> {
        Identifier::new(value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0.to_string()
    }
}
