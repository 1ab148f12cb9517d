//! Mapping between commit emails and contributor logins.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Resolves the emails found in commits to stable contributor logins.
pub trait IdentityResolver {
    fn login_for_email(&self, email: &str) -> Option<String>;

    fn emails_for_login(&self, login: &str) -> Vec<String>;
}

/// Identity table loaded from TOML:
///
/// ```toml
/// [logins]
/// alice = ["alice@example.com", "alice@users.noreply.example.com"]
/// ```
///
/// Emails match case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityTable {
    #[serde(default)]
    pub logins: BTreeMap<String, Vec<String>>,
}

impl IdentityTable {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read identity file '{}'", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse identity file '{}'", path.display()))
    }

    pub fn insert(&mut self, login: impl Into<String>, email: impl Into<String>) {
        let emails = self.logins.entry(login.into()).or_default();
        let email = email.into();
        if !emails.iter().any(|e| e.eq_ignore_ascii_case(&email)) {
            emails.push(email);
        }
    }
}

impl IdentityResolver for IdentityTable {
    fn login_for_email(&self, email: &str) -> Option<String> {
        self.logins
            .iter()
            .find(|(_, emails)| emails.iter().any(|e| e.eq_ignore_ascii_case(email)))
            .map(|(login, _)| login.clone())
    }

    fn emails_for_login(&self, login: &str) -> Vec<String> {
        self.logins.get(login).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut table = IdentityTable::default();
        table.insert("alice", "Alice@Example.com");
        table.insert("alice", "alice@example.com");
        table.insert("alice", "alice@home.example");

        assert_eq!(
            table.login_for_email("ALICE@example.COM").as_deref(),
            Some("alice")
        );
        assert_eq!(table.emails_for_login("alice").len(), 2);
        assert_eq!(table.login_for_email("bob@example.com"), None);
        assert!(table.emails_for_login("bob").is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identities.toml");
        std::fs::write(
            &path,
            r#"
[logins]
alice = ["alice@example.com"]
bob = ["bob@example.com", "robert@example.com"]
"#,
        )
        .unwrap();

        let table = IdentityTable::load(&path).unwrap();
        assert_eq!(
            table.login_for_email("robert@example.com").as_deref(),
            Some("bob")
        );
    }

    #[test]
    fn test_load_reports_path() {
        let err = IdentityTable::load(Path::new("/nonexistent/identities.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/identities.toml"));
    }
}
