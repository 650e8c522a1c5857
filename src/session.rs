//! Session and Identity
//!
//! Identification only: any employee code or email is accepted as-is.
//! The session lives in memory for one interactive run and is never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("enter your employee ID or email")]
    MissingIdentifier,

    #[error("email '{0}' has no name before '@'")]
    EmptyLocalPart(String),
}

/// Canonical identity derived from an employee code or an email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    /// Corporate address, constructed rather than verified
    pub email: String,
}

impl Identity {
    /// Derive an identity from an employee code (`NUT-00123`) or an email.
    ///
    /// For an email the user id is its local part; the address is kept when it
    /// belongs to `corporate_domain`, otherwise a corporate one is built.
    pub fn from_identifier(identifier: &str, corporate_domain: &str) -> Result<Self, LoginError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(LoginError::MissingIdentifier);
        }

        let domain = corporate_domain.trim_start_matches('@');
        match identifier.split_once('@') {
            Some((local, host)) => {
                if local.is_empty() {
                    return Err(LoginError::EmptyLocalPart(identifier.to_string()));
                }
                let email = if host.eq_ignore_ascii_case(domain) {
                    identifier.to_string()
                } else {
                    format!("{}@{}", local, domain)
                };
                Ok(Self {
                    user_id: local.to_string(),
                    email,
                })
            }
            None => Ok(Self {
                user_id: identifier.to_string(),
                email: format!("{}@{}", identifier, domain),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Transient per-user interaction state
#[derive(Debug, Default)]
pub struct Session {
    identity: Option<Identity>,
    chat_history: Vec<ChatMessage>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identify the user. Replaces any previous identity and starts a fresh history.
    pub fn login(
        &mut self,
        identifier: &str,
        corporate_domain: &str,
    ) -> Result<&Identity, LoginError> {
        let identity = Identity::from_identifier(identifier, corporate_domain)?;
        tracing::info!("User '{}' logged in", identity.user_id);
        self.chat_history.clear();
        let identity: &Identity = self.identity.insert(identity);
        Ok(identity)
    }

    /// Forget the identity and the chat history
    pub fn logout(&mut self) {
        if let Some(identity) = self.identity.take() {
            tracing::info!("User '{}' logged out", identity.user_id);
        }
        self.chat_history.clear();
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|identity| identity.user_id.as_str())
    }

    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) {
        self.chat_history.push(ChatMessage {
            role,
            content: content.into(),
        });
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    pub fn message_count(&self) -> usize {
        self.chat_history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "nutrisco.cl";

    #[test]
    fn test_employee_code() {
        let identity = Identity::from_identifier(" NUT-00123 ", DOMAIN).unwrap();
        assert_eq!(identity.user_id, "NUT-00123");
        assert_eq!(identity.email, "NUT-00123@nutrisco.cl");
    }

    #[test]
    fn test_corporate_email_is_kept() {
        let identity = Identity::from_identifier("maria.perez@nutrisco.cl", DOMAIN).unwrap();
        assert_eq!(identity.user_id, "maria.perez");
        assert_eq!(identity.email, "maria.perez@nutrisco.cl");
    }

    #[test]
    fn test_foreign_email_gets_corporate_address() {
        let identity = Identity::from_identifier("maria@gmail.com", DOMAIN).unwrap();
        assert_eq!(identity.user_id, "maria");
        assert_eq!(identity.email, "maria@nutrisco.cl");
    }

    #[test]
    fn test_invalid_identifiers() {
        assert_eq!(
            Identity::from_identifier("   ", DOMAIN),
            Err(LoginError::MissingIdentifier)
        );
        assert_eq!(
            Identity::from_identifier("@nutrisco.cl", DOMAIN),
            Err(LoginError::EmptyLocalPart("@nutrisco.cl".to_string()))
        );
    }

    #[test]
    fn test_login_logout_lifecycle() {
        let mut session = Session::new();
        assert!(!session.is_authenticated());

        session.login("NUT-1", DOMAIN).unwrap();
        session.push(ChatRole::User, "hola");
        session.push(ChatRole::Assistant, "menu");
        assert!(session.is_authenticated());
        assert_eq!(session.user_id(), Some("NUT-1"));
        assert_eq!(session.message_count(), 2);

        session.logout();
        assert!(!session.is_authenticated());
        assert_eq!(session.user_id(), None);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_failed_login_keeps_session() {
        let mut session = Session::new();
        session.login("NUT-1", DOMAIN).unwrap();
        session.push(ChatRole::User, "hola");

        assert!(session.login("", DOMAIN).is_err());
        assert_eq!(session.user_id(), Some("NUT-1"));
        assert_eq!(session.message_count(), 1);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatMessage {
            role: ChatRole::Assistant,
            content: "hola".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hola"}"#);
    }
}
