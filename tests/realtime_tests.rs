mod common;

use campaign_ledger::realtime::{
    ChatFeed, ChatMessage, Identity, LoopbackHub, MergeOutcome, RealtimeEvent, Session,
};
use campaign_ledger::errors::TransportError;
use chrono::Duration;
use common::{at, user};
use uuid::Uuid;

fn session(hub: &LoopbackHub, id: &str) -> Session {
    Session::new(Identity::new(user(id), format!("bearer-{}", id)), Box::new(hub.connection()))
}

#[test]
fn fetched_history_and_live_broadcast_render_once() {
    let hub = LoopbackHub::new();
    let room = Uuid::new_v4();
    let (mut ada, mut bo) = (session(&hub, "ada"), session(&hub, "bo"));
    ada.connect().unwrap();
    bo.connect().unwrap();

    let persisted = ada
        .compose(room, "Paid for March", at(2025, 3, 2))
        .unwrap()
        .with_id(Uuid::new_v4());
    bo.join(room, vec![persisted.clone()]).unwrap();
    ada.join(room, Vec::new()).unwrap();

    ada.send(persisted).unwrap();
    assert_eq!(bo.poll(), 0);
    assert_eq!(bo.feed(room).map(ChatFeed::len), Some(1));
    assert_eq!(ada.poll(), 0);
    assert_eq!(ada.feed(room).map(ChatFeed::len), Some(1));
}

#[test]
fn messages_from_others_arrive_in_order() {
    let hub = LoopbackHub::new();
    let room = Uuid::new_v4();
    let (mut ada, mut bo) = (session(&hub, "ada"), session(&hub, "bo"));
    for s in [&mut ada, &mut bo] {
        s.connect().unwrap();
        s.join(room, Vec::new()).unwrap();
    }

    let later = bo.compose(room, "second", at(2025, 3, 2)).unwrap();
    let earlier = bo
        .compose(room, "first", at(2025, 3, 2) - Duration::minutes(5))
        .unwrap();
    bo.send(later).unwrap();
    bo.send(earlier).unwrap();

    assert_eq!(ada.poll(), 2);
    let texts: Vec<&str> = ada
        .feed(room)
        .unwrap()
        .messages()
        .iter()
        .map(|message| message.text.as_str())
        .collect();
    assert_eq!(texts, vec!["first", "second"]);
}

#[test]
fn broadcasts_after_leaving_are_ignored() {
    let hub = LoopbackHub::new();
    let room = Uuid::new_v4();
    let (mut ada, mut bo) = (session(&hub, "ada"), session(&hub, "bo"));
    for s in [&mut ada, &mut bo] {
        s.connect().unwrap();
        s.join(room, Vec::new()).unwrap();
    }
    let message = bo.compose(room, "anyone?", at(2025, 3, 3)).unwrap();
    bo.send(message).unwrap();
    ada.leave(room).unwrap();

    assert_eq!(ada.poll(), 0);
    assert!(ada.feed(room).is_none());
    assert_eq!(hub.subscribers(room), 1);
}

#[test]
fn disconnect_clears_rooms_and_blocks_sending() {
    let hub = LoopbackHub::new();
    let room = Uuid::new_v4();
    let mut ada = session(&hub, "ada");
    ada.connect().unwrap();
    ada.join(room, Vec::new()).unwrap();
    ada.disconnect();

    assert!(!ada.is_connected());
    assert!(ada.feed(room).is_none());
    let message = ada.compose(room, "hello?", at(2025, 3, 3)).unwrap();
    assert_eq!(ada.send(message), Err(TransportError::NotConnected));
    assert_eq!(ada.join(room, Vec::new()).unwrap_err(), TransportError::NotConnected);
}

#[test]
fn wire_events_round_trip_through_json() {
    let room = Uuid::new_v4();
    let message = ChatMessage::compose(room, "ada".into(), "hi", at(2025, 3, 1)).unwrap();
    let event = RealtimeEvent::CampaignMessage(message.clone());
    let json = event.to_json().unwrap();
    assert!(json.starts_with(r#"{"event":"campaign-message""#));
    assert_eq!(RealtimeEvent::from_json(&json).unwrap(), event);

    let mut feed = ChatFeed::new(room);
    assert_eq!(feed.merge(message.clone()), MergeOutcome::Inserted);
    assert_eq!(feed.merge(message), MergeOutcome::Duplicate);
}
