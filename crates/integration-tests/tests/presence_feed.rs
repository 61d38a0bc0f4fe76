//! Presence aggregation driven through the public channel API.

use campus_trade_admin::services::{PresenceAggregator, PresenceCounts, PresenceEvent, PresenceMember};
use campus_trade_core::{IdentityId, Role};
use tokio::sync::mpsc;
use uuid::Uuid;

fn member(n: u128, role: Role, name: &str) -> PresenceMember {
    PresenceMember {
        id: IdentityId::new(Uuid::from_u128(n)),
        role,
        display_name: Some(name.to_string()),
    }
}

#[tokio::test]
async fn roster_sync_then_join_then_self_join() {
    let operator = IdentityId::new(Uuid::from_u128(100));
    let (aggregator, counts_rx, mut notices_rx) = PresenceAggregator::new(Some(operator));
    let (events_tx, events_rx) = mpsc::channel(8);
    let task = aggregator.spawn(events_rx);

    // Full roster: three buyers, one seller, one admin.
    events_tx
        .send(PresenceEvent::Sync(vec![
            member(1, Role::Buyer, "A"),
            member(2, Role::Buyer, "B"),
            member(3, Role::Buyer, "C"),
            member(4, Role::Seller, "D"),
            member(5, Role::Admin, "E"),
        ]))
        .await
        .expect("aggregator alive");

    // A join alone never changes the counts; the next sync carries it.
    events_tx
        .send(PresenceEvent::Join(member(6, Role::Buyer, "Fatima")))
        .await
        .expect("aggregator alive");

    // The operator's own join stays silent.
    events_tx
        .send(PresenceEvent::Join(PresenceMember {
            id: operator,
            role: Role::Admin,
            display_name: Some("Me".to_string()),
        }))
        .await
        .expect("aggregator alive");

    // Unsubscribe: drop the sender, let the task drain and finish.
    drop(events_tx);
    task.await.expect("aggregator task");

    assert_eq!(
        *counts_rx.borrow(),
        PresenceCounts {
            total: 5,
            buyers: 3,
            sellers: 1,
            admins: 1,
        }
    );

    let notice = notices_rx.recv().await.expect("one notice for the stranger");
    assert_eq!(notice.message(), "Fatima is now online");
    assert!(notices_rx.recv().await.is_none(), "self-join emits nothing");
}
