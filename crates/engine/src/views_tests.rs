use super::*;
use courier_core::delivery::{Delivery, DeliveryId};
use courier_core::message::{Message, MessageId};
use chrono::Utc;

fn seed_scheduled(store: &JsonStore, id: &str, user: &str, offset_secs: i64) {
    let now = Utc::now();
    let message_id = MessageId(format!("m-{}", id));
    store
        .save_message(&Message::new(
            message_id.clone(),
            user,
            format!("text {}", id),
            now,
        ))
        .unwrap();
    store
        .save_delivery(&Delivery::scheduled(
            DeliveryId(id.to_string()),
            message_id,
            user,
            "C456",
            now + chrono::Duration::seconds(offset_secs),
            now,
        ))
        .unwrap();
}

fn seed_sent(store: &JsonStore, id: &str, user: &str, sent_offset_secs: i64) {
    let now = Utc::now();
    let message_id = MessageId(format!("m-{}", id));
    store
        .save_message(&Message::new(
            message_id.clone(),
            user,
            format!("text {}", id),
            now,
        ))
        .unwrap();
    let mut delivery = Delivery::immediate(DeliveryId(id.to_string()), message_id, user, "C456", now);
    delivery.record_success(now + chrono::Duration::seconds(sent_offset_secs), None);
    store.save_delivery(&delivery).unwrap();
}

#[test]
fn list_scheduled_sorts_by_scheduled_time() {
    let store = JsonStore::open_temp().unwrap();
    seed_scheduled(&store, "d-late", "U123", 600);
    seed_scheduled(&store, "d-soon", "U123", 60);
    seed_scheduled(&store, "d-mid", "U123", 300);

    let listed = list_scheduled(&store, "U123").unwrap();
    let ids: Vec<_> = listed.iter().map(|m| m.delivery_id.as_str()).collect();
    assert_eq!(ids, vec!["d-soon", "d-mid", "d-late"]);
}

#[test]
fn list_scheduled_filters_by_user() {
    let store = JsonStore::open_temp().unwrap();
    seed_scheduled(&store, "d-mine", "U123", 60);
    seed_scheduled(&store, "d-theirs", "U999", 60);

    let listed = list_scheduled(&store, "U123").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].delivery_id, "d-mine");
    assert_eq!(listed[0].text, "text d-mine");
}

#[test]
fn list_scheduled_includes_failed_records() {
    let store = JsonStore::open_temp().unwrap();
    seed_scheduled(&store, "d-1", "U123", 60);

    let mut delivery = store.load_delivery("d-1").unwrap();
    delivery.record_failure(Utc::now(), "credential_unavailable", None);
    delivery.mark_failed();
    store.save_delivery(&delivery).unwrap();

    let listed = list_scheduled(&store, "U123").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, DeliveryStatus::Failed);
}

#[test]
fn list_scheduled_excludes_immediate_deliveries() {
    let store = JsonStore::open_temp().unwrap();
    seed_sent(&store, "d-immediate", "U123", 0);
    seed_scheduled(&store, "d-scheduled", "U123", 60);

    let listed = list_scheduled(&store, "U123").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].delivery_id, "d-scheduled");
}

#[test]
fn list_sent_sorts_most_recent_first() {
    let store = JsonStore::open_temp().unwrap();
    seed_sent(&store, "d-old", "U123", 0);
    seed_sent(&store, "d-new", "U123", 120);
    seed_sent(&store, "d-mid", "U123", 60);

    let listed = list_sent(&store, "U123").unwrap();
    let ids: Vec<_> = listed.iter().map(|m| m.delivery_id.as_str()).collect();
    assert_eq!(ids, vec!["d-new", "d-mid", "d-old"]);
}

#[test]
fn list_sent_excludes_queued_deliveries() {
    let store = JsonStore::open_temp().unwrap();
    seed_scheduled(&store, "d-queued", "U123", 60);
    seed_sent(&store, "d-sent", "U123", 0);

    let listed = list_sent(&store, "U123").unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].delivery_id, "d-sent");
}

#[test]
fn empty_store_lists_nothing() {
    let store = JsonStore::open_temp().unwrap();
    assert!(list_scheduled(&store, "U123").unwrap().is_empty());
    assert!(list_sent(&store, "U123").unwrap().is_empty());
}
