//! Identity of a live connection

use uuid::Uuid;

/// Handle for one accepted connection
///
/// Minted by the session as soon as the socket is accepted, before any
/// credentials are read, so session logs can name the connection early.
/// Registry entries are keyed by it, which lets two members share a
/// username but never a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberId(pub Uuid);

impl MemberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_id_unique() {
        let id1 = MemberId::new();
        let id2 = MemberId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_member_id_display_is_uuid() {
        let id = MemberId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }
}
