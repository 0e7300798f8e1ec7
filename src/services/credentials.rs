use std::collections::HashMap;
use crate::config::UserEntry;

/// Static username to password table, loaded once from configuration.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, String>,
}

impl CredentialStore {
    pub fn from_config(users: &HashMap<String, UserEntry>) -> Self {
        Self {
            users: users
                .iter()
                .map(|(name, entry)| (name.clone(), entry.password.clone()))
                .collect(),
        }
    }

    /// Exact match against the stored password. Unknown users simply fail.
    pub fn check(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|stored| stored == password)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        let mut users = HashMap::new();
        users.insert("alice".to_string(), UserEntry { password: "correct".to_string() });
        CredentialStore::from_config(&users)
    }

    #[test]
    fn accepts_matching_password() {
        assert!(store().check("alice", "correct"));
    }

    #[test]
    fn rejects_wrong_password() {
        assert!(!store().check("alice", "wrong"));
        assert!(!store().check("alice", "Correct"));
        assert!(!store().check("alice", ""));
    }

    #[test]
    fn rejects_unknown_user() {
        assert!(!store().check("ghost", "anything"));
    }
}
