//! Identity: the key that selects a credential.

use std::fmt;

use crate::error::{Error, Result};

/// An (action, API scope) pair.
///
/// Two scopes of the same action are distinct identities with independent
/// credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    action: String,
    scope: String,
}

impl Identity {
    /// Creates an identity.
    pub fn new(action: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            scope: scope.into(),
        }
    }

    /// The action name.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The API scope label.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Rejects identities that cannot name a store record.
    pub fn validate(&self) -> Result<()> {
        check_part("action", &self.action)?;
        check_part("scope", &self.scope)
    }
}

fn check_part(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::config(format!("identity {} must not be empty", name)));
    }
    if value == "." || value == ".." {
        return Err(Error::config(format!(
            "identity {} must not be '{}'",
            name, value
        )));
    }
    Ok(())
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.action, self.scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn scopes_make_distinct_identities() {
        let sheets = Identity::new("formA", "sheets");
        let drive = Identity::new("formA", "drive");
        assert_ne!(sheets, drive);

        let set: HashSet<_> = [sheets.clone(), drive, sheets].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display() {
        assert_eq!(Identity::new("formA", "sheets").to_string(), "formA/sheets");
    }

    #[test]
    fn validate() {
        assert!(Identity::new("formA", "sheets").validate().is_ok());
        assert!(Identity::new("", "sheets").validate().is_err());
        assert!(Identity::new("formA", "  ").validate().is_err());
        assert!(Identity::new("..", "sheets").validate().is_err());
        assert!(Identity::new("formA", ".").validate().is_err());
    }
}
