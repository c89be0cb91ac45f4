//! Membership registry
//!
//! The single source of truth for who is currently in the room.
//! All access goes through one reader/writer lock; the map itself is
//! never handed out.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;

use crate::message::Frame;
use crate::types::MemberId;

/// Write path to a member's connection
///
/// Frames pushed here are written to the socket by the member's own
/// writer task, in order.
pub type Outbox = mpsc::Sender<Frame>;

/// A registered (authenticated, still connected) participant
#[derive(Debug, Clone)]
pub struct Member {
    pub id: MemberId,
    pub username: String,
    pub outbox: Outbox,
}

impl Member {
    pub fn new(id: MemberId, username: impl Into<String>, outbox: Outbox) -> Self {
        Self {
            id,
            username: username.into(),
            outbox,
        }
    }
}

#[derive(Debug, Default)]
struct Members {
    by_id: HashMap<MemberId, Member>,
    /// First member of an empty room; informational only
    host: Option<MemberId>,
}

/// Concurrent-safe mapping from connection handle to member
#[derive(Debug, Default)]
pub struct MembershipRegistry {
    inner: RwLock<Members>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections never panic mid-update, so a poisoned lock still
    // guards a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, Members> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Members> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite the entry for `member.id`
    ///
    /// The first member of an empty room becomes its host.
    /// Returns the member count after insertion.
    pub fn register(&self, member: Member) -> usize {
        let mut members = self.write();

        if members.by_id.is_empty() {
            members.host = Some(member.id);
        }

        members.by_id.insert(member.id, member);
        members.by_id.len()
    }

    /// Remove the entry for `id` if present
    ///
    /// Idempotent: removing an absent handle is a no-op.
    /// Returns the member count after removal.
    pub fn deregister(&self, id: MemberId) -> usize {
        let mut members = self.write();

        if members.by_id.remove(&id).is_some() && members.host == Some(id) {
            members.host = None;
        }

        members.by_id.len()
    }

    /// Clone the current members for fan-out
    ///
    /// The read lock is released before the caller starts delivering, so a
    /// slow delivery never holds off joins and leaves.
    pub fn snapshot_for_broadcast(&self) -> Vec<Member> {
        self.read().by_id.values().cloned().collect()
    }

    pub fn member_count(&self) -> usize {
        self.read().by_id.len()
    }

    pub fn host(&self) -> Option<MemberId> {
        self.read().host
    }

    pub fn username_of(&self, id: MemberId) -> Option<String> {
        self.read().by_id.get(&id).map(|m| m.username.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn member(username: &str) -> (Member, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(8);
        (Member::new(MemberId::new(), username, tx), rx)
    }

    #[test]
    fn test_register_then_snapshot() {
        let registry = MembershipRegistry::new();
        let (alice, _rx) = member("alice");
        let id = alice.id;

        assert_eq!(registry.register(alice), 1);

        let snapshot = registry.snapshot_for_broadcast();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].username, "alice");
    }

    #[test]
    fn test_deregister_removes_from_snapshot() {
        let registry = MembershipRegistry::new();
        let (alice, _a) = member("alice");
        let (bob, _b) = member("bob");
        let alice_id = alice.id;

        registry.register(alice);
        registry.register(bob);

        assert_eq!(registry.deregister(alice_id), 1);
        assert!(registry
            .snapshot_for_broadcast()
            .iter()
            .all(|m| m.id != alice_id));
        assert_eq!(registry.username_of(alice_id), None);
    }

    #[test]
    fn test_deregister_absent_is_noop() {
        let registry = MembershipRegistry::new();
        let (alice, _rx) = member("alice");
        let id = alice.id;
        registry.register(alice);

        assert_eq!(registry.deregister(MemberId::new()), 1);
        assert_eq!(registry.deregister(id), 0);
        assert_eq!(registry.deregister(id), 0);
        assert_eq!(registry.member_count(), 0);
    }

    #[test]
    fn test_register_overwrites_same_handle() {
        let registry = MembershipRegistry::new();
        let (alice, _rx) = member("alice");
        let id = alice.id;
        let renamed = Member::new(id, "alicia", alice.outbox.clone());

        registry.register(alice);
        assert_eq!(registry.register(renamed), 1);
        assert_eq!(registry.username_of(id).as_deref(), Some("alicia"));
    }

    #[test]
    fn test_first_member_is_host() {
        let registry = MembershipRegistry::new();
        let (alice, _a) = member("alice");
        let (bob, _b) = member("bob");
        let (alice_id, bob_id) = (alice.id, bob.id);

        registry.register(alice);
        registry.register(bob);
        assert_eq!(registry.host(), Some(alice_id));

        // Non-host leaving keeps the host
        registry.deregister(bob_id);
        assert_eq!(registry.host(), Some(alice_id));

        registry.deregister(alice_id);
        assert_eq!(registry.host(), None);

        // Next member of the empty room takes over
        let (carol, _c) = member("carol");
        let carol_id = carol.id;
        registry.register(carol);
        assert_eq!(registry.host(), Some(carol_id));
    }

    #[test]
    fn test_concurrent_register_deregister() {
        let registry = Arc::new(MembershipRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let (tx, _rx) = mpsc::channel(1);
                    let ids: Vec<MemberId> = (0..50)
                        .map(|i| {
                            let id = MemberId::new();
                            registry.register(Member::new(id, format!("u{}-{}", t, i), tx.clone()));
                            id
                        })
                        .collect();
                    // Keep every even member, drop the odd ones
                    for id in ids.iter().skip(1).step_by(2) {
                        registry.deregister(*id);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.member_count(), 8 * 25);
        assert_eq!(registry.snapshot_for_broadcast().len(), 8 * 25);
    }
}
