//! Room definition
//!
//! The authentication domain every member of a chat session belongs to.

/// Password-protected chat room
///
/// Created once at server start and never mutated afterwards;
/// sessions share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    name: String,
    password: String,
}

impl Room {
    /// Create a new room with the given name and shared secret
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check a candidate password against the room secret
    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password == candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_creation() {
        let room = Room::new("lobby", "swordfish");
        assert_eq!(room.name(), "lobby");
        assert!(room.password_matches("swordfish"));
    }

    #[test]
    fn test_room_password_is_exact() {
        let room = Room::new("lobby", "swordfish");
        assert!(!room.password_matches("Swordfish"));
        assert!(!room.password_matches("swordfish "));
        assert!(!room.password_matches(""));
    }
}
