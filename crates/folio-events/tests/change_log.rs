#![allow(missing_docs, unused_results)]

use assert_matches::assert_matches;
use folio_core::{AuditContext, EventId, Hlc, NodeId, RecordId};
use folio_events::entities::{CreateUserParams, UpdateUserParams};
use folio_events::{
    Action, ChangeEvent, ChangeEventLog, ChangeEventParams, ConnectionConfig, CreateEntity,
    Database, JsonBlob, Operation, Sqlite, StoreError, UpdateEntity, User, create, update,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn open_db() -> (TempDir, Database<Sqlite>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("folio.db");
    let db = Database::<Sqlite>::open(path.to_str().unwrap(), &ConnectionConfig::default()).unwrap();
    (dir, db)
}

fn event(db: &Database<Sqlite>, record_id: &RecordId) -> ChangeEventParams {
    ChangeEventParams {
        event_id: EventId::new(),
        hlc_timestamp: db.clock().now(),
        wall_timestamp: folio_core::time::now_ms(),
        node_id: NodeId::from("node-1"),
        table_name: "users".into(),
        record_id: record_id.clone(),
        operation: Operation::Insert,
        action: Action::Create,
        user_id: None,
        request_id: None,
        ip: None,
        old_values: None,
        new_values: Some(JsonBlob::from(serde_json::json!({ "username": "ada" }))),
        metadata: None,
    }
}

#[test]
fn record_get_count_delete_end_to_end() {
    let (_dir, db) = open_db();
    let record_id = RecordId::new();
    assert_eq!(record_id.as_str().len(), 26);

    let params = event(&db, &record_id);
    let e1 = params.event_id.clone();
    let recorded = db.record_change_event(&params).unwrap();

    let fetched = db.get_change_event(&e1).unwrap();
    assert_eq!(fetched, recorded);
    assert_eq!(fetched, ChangeEvent::from(params));
    assert_eq!(db.count_change_events().unwrap(), 1);

    db.delete_change_event(&e1).unwrap();
    assert_eq!(db.count_change_events().unwrap(), 0);
    assert_matches!(
        db.get_change_event(&e1),
        Err(StoreError::NotFound { entity: "change event", .. })
    );
}

#[test]
fn recorded_event_matches_what_is_read_back() {
    let (_dir, db) = open_db();
    let mut params = event(&db, &RecordId::new());
    params.action = Action::from("create");
    params.wall_timestamp = chrono::Utc::now();

    let recorded = db.record_change_event(&params).unwrap();
    let fetched = db.get_change_event(&params.event_id).unwrap();
    assert_eq!(fetched, recorded);
    assert_eq!(fetched.action, Action::Create);
    assert_eq!(fetched.wall_timestamp.timestamp_subsec_nanos() % 1_000_000, 0);
}

#[test]
fn payload_bytes_are_returned_verbatim() {
    let (_dir, db) = open_db();
    let mut params = event(&db, &RecordId::new());
    let raw = r#"{ "b": 1,  "a": [true, null] }"#;
    params.new_values = Some(JsonBlob::from_raw(raw.into()));
    db.record_change_event(&params).unwrap();

    let fetched = db.get_change_event(&params.event_id).unwrap();
    assert_eq!(fetched.new_values.unwrap().as_str(), raw);
}

#[test]
fn mark_synced_is_idempotent() {
    let (_dir, db) = open_db();
    let params = event(&db, &RecordId::new());
    db.record_change_event(&params).unwrap();
    assert_eq!(db.get_unsynced_events(10).unwrap().len(), 1);

    db.mark_event_synced(&params.event_id).unwrap();
    let first = db.get_change_event(&params.event_id).unwrap().synced_at;
    assert!(first.is_some());

    std::thread::sleep(std::time::Duration::from_millis(5));
    db.mark_event_synced(&params.event_id).unwrap();
    let event = db.get_change_event(&params.event_id).unwrap();
    assert_eq!(event.synced_at, first);
    assert!(!event.is_consumed());
    assert!(db.get_unsynced_events(10).unwrap().is_empty());
    assert_eq!(db.get_unconsumed_events(10).unwrap().len(), 1);
}

#[test]
fn history_by_record_is_hlc_ordered() {
    let (_dir, db) = open_db();
    let ctx = AuditContext::system(NodeId::from("node-1"));
    let cancel = CancellationToken::new();
    let user = create(
        &CreateEntity::<Sqlite, User>::new(
            &db,
            &ctx,
            CreateUserParams {
                username: "lin".into(),
                email: "lin@example.com".into(),
                role: 0,
            },
        ),
        &cancel,
    )
    .unwrap();
    for role in 1..=3 {
        update(
            &UpdateEntity::<Sqlite, User>::new(
                &db,
                &ctx,
                user.user_id.clone(),
                UpdateUserParams {
                    username: "lin".into(),
                    email: "lin@example.com".into(),
                    role,
                },
            ),
            &cancel,
        )
        .unwrap();
    }

    let history = db.get_change_events_by_record("users", &user.user_id).unwrap();
    assert_eq!(history.len(), 4);
    assert!(
        history
            .windows(2)
            .all(|w| w[0].hlc_timestamp <= w[1].hlc_timestamp)
    );
    let ops: Vec<_> = history.iter().map(|e| e.operation).collect();
    assert_eq!(
        ops,
        vec![Operation::Insert, Operation::Update, Operation::Update, Operation::Update]
    );
    assert!(db.get_change_events_by_record("content_data", &user.user_id).unwrap().is_empty());
}

#[test]
fn list_pages_newest_first() {
    let (_dir, db) = open_db();
    let ids: Vec<_> = (0..5)
        .map(|_| {
            let params = event(&db, &RecordId::new());
            db.record_change_event(&params).unwrap();
            params.event_id
        })
        .collect();

    let page: Vec<_> = db
        .list_change_events(2, 1)
        .unwrap()
        .into_iter()
        .map(|e| e.event_id)
        .collect();
    assert_eq!(page, vec![ids[3].clone(), ids[2].clone()]);
    assert!(db.list_change_events(10, 5).unwrap().is_empty());
}

#[test]
fn events_since_follows_a_cursor() {
    let (_dir, db) = open_db();
    let events: Vec<_> = (0..4)
        .map(|_| {
            let params = event(&db, &RecordId::new());
            db.record_change_event(&params).unwrap()
        })
        .collect();

    let after_second = db.get_events_since(events[1].hlc_timestamp, 10).unwrap();
    assert_eq!(after_second, events[2..].to_vec());

    let first_page = db.get_events_since(Hlc::from_i64(0), 3).unwrap();
    assert_eq!(first_page, events[..3].to_vec());
    let cursor = first_page.last().unwrap().hlc_timestamp;
    assert_eq!(db.get_events_since(cursor, 3).unwrap(), events[3..].to_vec());
}

#[test]
fn remote_timestamps_push_local_clock_forward() {
    let (_dir, db) = open_db();
    let local = db.clock().now();
    let remote = Hlc::new(local.physical_ms() + 60_000, 7);
    db.clock().observe(remote);

    let params = event(&db, &RecordId::new());
    db.record_change_event(&params).unwrap();
    assert!(params.hlc_timestamp > remote);
}

#[test]
fn unknown_ids_are_not_found() {
    let (_dir, db) = open_db();
    let missing = EventId::new();
    assert!(db.get_change_event(&missing).unwrap_err().is_not_found());
    assert!(db.mark_event_consumed(&missing).unwrap_err().is_not_found());
    assert!(db.delete_change_event(&missing).unwrap_err().is_not_found());
}
