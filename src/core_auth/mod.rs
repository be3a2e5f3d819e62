//! The user table. Credentials are compared as plain strings; this
//! server is meant for sandboxed and test deployments, not for the open
//! Internet.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a logged-in user may do. Read covers PWD/CWD/LIST/RETR/SIZE/MDTM;
/// write additionally unlocks STOR/MKD/RMD/DELE/RNFR/RNTO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Permission {
    #[serde(rename = "read-only")]
    ReadOnly,
    #[serde(rename = "read-write")]
    ReadWrite,
}

impl Permission {
    pub fn can_write(self) -> bool {
        matches!(self, Permission::ReadWrite)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub permission: Permission,
}

/// Immutable name -> (password, permission) map, built once at startup
/// and shared read-only across sessions.
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    entries: HashMap<String, (String, Permission)>,
}

impl UserTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, password: &str, permission: Permission) {
        self.entries
            .insert(name.to_string(), (password.to_string(), permission));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Checks the pair and hands back the user record on a match.
    pub fn authenticate(&self, name: &str, password: &str) -> Option<User> {
        match self.entries.get(name) {
            Some((stored, permission)) if stored == password => Some(User {
                name: name.to_string(),
                permission: *permission,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> UserTable {
        let mut t = UserTable::new();
        t.insert("user", "123456", Permission::ReadWrite);
        t.insert("guest", "guest", Permission::ReadOnly);
        t
    }

    #[test]
    fn authenticates_matching_pair() {
        let user = table().authenticate("user", "123456").unwrap();
        assert_eq!(user.name, "user");
        assert!(user.permission.can_write());
    }

    #[test]
    fn rejects_wrong_password_and_unknown_user() {
        let t = table();
        assert!(t.authenticate("user", "wrong").is_none());
        assert!(t.authenticate("nobody", "123456").is_none());
    }

    #[test]
    fn guest_is_read_only() {
        let guest = table().authenticate("guest", "guest").unwrap();
        assert!(!guest.permission.can_write());
    }
}
