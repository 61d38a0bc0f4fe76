//! Live membership feed aggregation.
//!
//! The backend pushes presence events for the operators' shared channel.
//! Two event kinds arrive on a typed stream: a full roster sync, which
//! recomputes the member counts from scratch, and a join, which leaves the
//! counts untouched (the roster sync that follows carries the new member)
//! and only surfaces a notice. A notice is suppressed when the joining
//! member is the operator themself.
//!
//! Unsubscribing is dropping the event sender; the aggregation task drains
//! the channel and returns.

use campus_trade_core::{IdentityId, Role};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One member visible on the presence channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceMember {
    pub id: IdentityId,
    pub role: Role,
    pub display_name: Option<String>,
}

/// Events pushed by the presence channel.
#[derive(Debug, Clone)]
pub enum PresenceEvent {
    /// Authoritative full roster; replaces all derived counts.
    Sync(Vec<PresenceMember>),
    /// A member came online. Informational only.
    Join(PresenceMember),
}

/// Member counts derived from the latest roster sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresenceCounts {
    pub total: u64,
    pub buyers: u64,
    /// Seller class: `seller` and `publisher_seller`.
    pub sellers: u64,
    /// Admin class: `admin` and `super_admin`.
    pub admins: u64,
}

/// A join worth telling the operator about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinNotice {
    pub member: PresenceMember,
}

impl JoinNotice {
    /// Human-readable notice line.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.member.display_name {
            Some(name) => format!("{name} is now online"),
            None => "A member is now online".to_string(),
        }
    }
}

/// Recompute counts from a full roster.
#[must_use]
pub fn counts_from_roster(roster: &[PresenceMember]) -> PresenceCounts {
    let mut counts = PresenceCounts {
        total: roster.len() as u64,
        ..PresenceCounts::default()
    };
    for member in roster {
        match member.role {
            Role::Buyer => counts.buyers += 1,
            Role::Seller | Role::PublisherSeller => counts.sellers += 1,
            Role::Admin | Role::SuperAdmin => counts.admins += 1,
            Role::NewsPublisher => {}
        }
    }
    counts
}

/// Consumes presence events and publishes derived counts and join notices.
#[derive(Debug)]
pub struct PresenceAggregator {
    /// Joins by this identity never produce a notice.
    operator_id: Option<IdentityId>,
    counts_tx: watch::Sender<PresenceCounts>,
    notices_tx: mpsc::Sender<JoinNotice>,
}

impl PresenceAggregator {
    /// Create an aggregator with its counts and notice channels.
    pub fn new(
        operator_id: Option<IdentityId>,
    ) -> (
        Self,
        watch::Receiver<PresenceCounts>,
        mpsc::Receiver<JoinNotice>,
    ) {
        let (counts_tx, counts_rx) = watch::channel(PresenceCounts::default());
        let (notices_tx, notices_rx) = mpsc::channel(16);
        (
            Self {
                operator_id,
                counts_tx,
                notices_tx,
            },
            counts_rx,
            notices_rx,
        )
    }

    /// Run the aggregation loop on its own task.
    pub fn spawn(self, events: mpsc::Receiver<PresenceEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    /// Aggregation loop; returns once the event sender is dropped.
    pub async fn run(self, mut events: mpsc::Receiver<PresenceEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                PresenceEvent::Sync(roster) => {
                    let counts = counts_from_roster(&roster);
                    debug!(total = counts.total, "Presence roster synced");
                    if self.counts_tx.send(counts).is_err() {
                        return;
                    }
                }
                PresenceEvent::Join(member) => {
                    if self.operator_id.is_some_and(|own| own == member.id) {
                        continue;
                    }
                    let notice = JoinNotice { member };
                    info!(message = %notice.message(), "Presence join");
                    // A full notice queue drops the oldest concern silently;
                    // notices are cosmetic and never back-pressure the feed.
                    let _ = self.notices_tx.try_send(notice);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn member(n: u128, role: Role) -> PresenceMember {
        PresenceMember {
            id: IdentityId::new(Uuid::from_u128(n)),
            role,
            display_name: None,
        }
    }

    #[test]
    fn roster_counts_bucket_by_capability() {
        let roster = vec![
            member(1, Role::Buyer),
            member(2, Role::Buyer),
            member(3, Role::Buyer),
            member(4, Role::Seller),
            member(5, Role::Admin),
        ];
        assert_eq!(
            counts_from_roster(&roster),
            PresenceCounts {
                total: 5,
                buyers: 3,
                sellers: 1,
                admins: 1,
            }
        );
    }

    #[test]
    fn publisher_seller_counts_as_seller() {
        let roster = vec![member(1, Role::PublisherSeller), member(2, Role::SuperAdmin)];
        let counts = counts_from_roster(&roster);
        assert_eq!(counts.sellers, 1);
        assert_eq!(counts.admins, 1);
        assert_eq!(counts.total, 2);
    }

    #[tokio::test]
    async fn join_leaves_counts_untouched_and_emits_notice() {
        let (aggregator, counts_rx, mut notices_rx) = PresenceAggregator::new(None);
        let (events_tx, events_rx) = mpsc::channel(4);
        let task = aggregator.spawn(events_rx);

        events_tx
            .send(PresenceEvent::Sync(vec![member(1, Role::Buyer)]))
            .await
            .expect("aggregator alive");
        events_tx
            .send(PresenceEvent::Join(member(2, Role::Seller)))
            .await
            .expect("aggregator alive");
        drop(events_tx);
        task.await.expect("aggregator task");

        assert_eq!(counts_rx.borrow().total, 1);
        let notice = notices_rx.recv().await.expect("one notice");
        assert_eq!(notice.member.id, IdentityId::new(Uuid::from_u128(2)));
        assert!(notices_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn own_join_is_suppressed() {
        let own = IdentityId::new(Uuid::from_u128(7));
        let (aggregator, _counts_rx, mut notices_rx) = PresenceAggregator::new(Some(own));
        let (events_tx, events_rx) = mpsc::channel(4);
        let task = aggregator.spawn(events_rx);

        events_tx
            .send(PresenceEvent::Join(PresenceMember {
                id: own,
                role: Role::Admin,
                display_name: Some("Me".to_string()),
            }))
            .await
            .expect("aggregator alive");
        drop(events_tx);
        task.await.expect("aggregator task");

        assert!(notices_rx.recv().await.is_none());
    }

    #[test]
    fn notice_message_prefers_display_name() {
        let notice = JoinNotice {
            member: PresenceMember {
                id: IdentityId::new(Uuid::from_u128(1)),
                role: Role::Buyer,
                display_name: Some("Priya".to_string()),
            },
        };
        assert_eq!(notice.message(), "Priya is now online");
    }
}
