//! Explicit application context. Role and class restriction are carried in
//! a value object with a defined load/save/clear lifecycle against an
//! injected store; nothing reads ambient storage.

use serde::{Deserialize, Serialize};

use crate::errors::{FeeError, Result};
use crate::types::Role;

/// where the serialized session lives between visits (browser storage,
/// a file, an in-memory map in tests)
pub trait SessionStore {
    fn load(&self) -> Option<String>;
    fn save(&mut self, payload: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub class: String,
}

impl SessionContext {
    /// resolve an access code into a session.
    /// `principal-2025` is the admin, `account-2025` the accounts desk,
    /// `teacher-<CLASS>` a class-restricted teacher.
    pub fn login(code: &str) -> Result<Self> {
        let code = code.trim().to_lowercase();
        if code.is_empty() {
            return Err(FeeError::validation("Enter access code"));
        }
        if code == "principal-2025" {
            return Ok(Self {
                name: "Principal".to_string(),
                role: Role::Admin,
                class: String::new(),
            });
        }
        if code == "account-2025" || code == "accounts-2025" {
            return Ok(Self {
                name: "Accounts".to_string(),
                role: Role::Account,
                class: String::new(),
            });
        }
        if let Some(class) = code.strip_prefix("teacher-") {
            if class.is_empty() {
                return Err(FeeError::validation(
                    "Teacher code must include class, e.g., teacher-7A",
                ));
            }
            let class = class.to_uppercase();
            return Ok(Self {
                name: format!("Teacher {class}"),
                role: Role::Teacher,
                class,
            });
        }
        Err(FeeError::InvalidAccessCode)
    }

    /// class restriction applied to reports and reminders, if any
    pub fn scope_class(&self) -> Option<&str> {
        if self.role == Role::Teacher && !self.class.is_empty() {
            Some(&self.class)
        } else {
            None
        }
    }

    /// read a previously persisted session; a missing or corrupt payload
    /// simply means "not logged in"
    pub fn restore(store: &impl SessionStore) -> Option<Self> {
        store
            .load()
            .and_then(|payload| serde_json::from_str(&payload).ok())
    }

    pub fn persist(&self, store: &mut impl SessionStore) -> Result<()> {
        let payload = serde_json::to_string(self).map_err(|err| FeeError::Session {
            message: err.to_string(),
        })?;
        store.save(&payload)
    }

    pub fn logout(store: &mut impl SessionStore) -> Result<()> {
        store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemoryStore(Option<String>);

    impl SessionStore for MemoryStore {
        fn load(&self) -> Option<String> {
            self.0.clone()
        }

        fn save(&mut self, payload: &str) -> Result<()> {
            self.0 = Some(payload.to_string());
            Ok(())
        }

        fn clear(&mut self) -> Result<()> {
            self.0 = None;
            Ok(())
        }
    }

    #[test]
    fn test_login_codes() {
        assert_eq!(
            SessionContext::login("principal-2025").unwrap().role,
            Role::Admin
        );
        assert_eq!(
            SessionContext::login(" ACCOUNTS-2025 ").unwrap().role,
            Role::Account
        );
        let teacher = SessionContext::login("teacher-7a").unwrap();
        assert_eq!(teacher.role, Role::Teacher);
        assert_eq!(teacher.class, "7A");
        assert_eq!(teacher.name, "Teacher 7A");
    }

    #[test]
    fn test_bad_codes() {
        assert!(matches!(
            SessionContext::login(""),
            Err(FeeError::Validation { .. })
        ));
        assert!(matches!(
            SessionContext::login("teacher-"),
            Err(FeeError::Validation { .. })
        ));
        assert!(matches!(
            SessionContext::login("open-sesame"),
            Err(FeeError::InvalidAccessCode)
        ));
    }

    #[test]
    fn test_scope_class() {
        let teacher = SessionContext::login("teacher-7A").unwrap();
        assert_eq!(teacher.scope_class(), Some("7A"));
        let admin = SessionContext::login("principal-2025").unwrap();
        assert_eq!(admin.scope_class(), None);
    }

    #[test]
    fn test_persist_restore_clear_lifecycle() {
        let mut store = MemoryStore::default();
        assert!(SessionContext::restore(&store).is_none());

        let session = SessionContext::login("teacher-7A").unwrap();
        session.persist(&mut store).unwrap();
        assert_eq!(SessionContext::restore(&store), Some(session));

        SessionContext::logout(&mut store).unwrap();
        assert!(SessionContext::restore(&store).is_none());
    }

    #[test]
    fn test_corrupt_payload_restores_to_none() {
        let mut store = MemoryStore::default();
        store.save("not json").unwrap();
        assert!(SessionContext::restore(&store).is_none());
    }
}
