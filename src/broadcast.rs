//! Message fan-out
//!
//! Delivers one message to every registered member except its sender.
//! Members are served concurrently and independently: a member that keeps
//! up receives every frame, while one whose outbox stays full past the
//! delivery timeout misses that frame. Failures are only logged and counted.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::error::DeliveryError;
use crate::message::{Frame, Message};
use crate::registry::{Member, MembershipRegistry};
use crate::types::MemberId;

/// Outcome of one broadcast call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans messages out to the members of a registry
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: Arc<MembershipRegistry>,
    delivery_timeout: Duration,
}

impl Broadcaster {
    pub fn new(registry: Arc<MembershipRegistry>, delivery_timeout: Duration) -> Self {
        Self {
            registry,
            delivery_timeout,
        }
    }

    /// Queue `msg` on every member's outbox except `exclude`
    ///
    /// Waits for outbox space, but never longer than the delivery timeout
    /// for any one member, and all members wait in parallel. Failing members
    /// are left registered; their own session notices the broken connection
    /// and deregisters itself.
    pub async fn broadcast(&self, msg: &Message, exclude: MemberId) -> BroadcastReport {
        let frame = msg.to_frame();
        let recipients: Vec<Member> = self
            .registry
            .snapshot_for_broadcast()
            .into_iter()
            .filter(|member| member.id != exclude)
            .collect();

        let outcomes = join_all(
            recipients
                .iter()
                .map(|member| deliver(member, &frame, self.delivery_timeout)),
        )
        .await;

        let mut report = BroadcastReport::default();
        for (member, outcome) in recipients.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        "Error sending message from {} to {}: {}",
                        msg.sender, member.username, e
                    );
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Broadcast from {}: {} delivered, {} failed",
            msg.sender, report.delivered, report.failed
        );

        report
    }
}

async fn deliver(member: &Member, frame: &Frame, wait: Duration) -> Result<(), DeliveryError> {
    match tokio::time::timeout(wait, member.outbox.send(Arc::clone(frame))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(DeliveryError::Disconnected),
        Err(_) => Err(DeliveryError::Backlogged),
    }
}
