use rego_database::*;
use rego_domain::constants::Collection;
use serde_json::{Value, json};

fn body(value: Value) -> Body {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

async fn connect(db: &str) -> Database {
    Database::builder()
        .url("mem://")
        .session("test_ns", db)
        .init()
        .await
        .expect("connect to mem://")
}

#[tokio::test]
async fn connect_in_memory_and_health_check() {
    let db = connect("health").await;
    db.health().await.expect("health check");
}

#[tokio::test]
async fn missing_parameters_fail_validation() {
    let err = Database::builder().init().await.unwrap_err();
    assert!(matches!(err, DatabaseError::Validation { .. }));
}

#[tokio::test]
async fn documents_round_trip_through_surreal_rows() {
    let db = connect("documents").await;
    db.create(
        Collection::Registrations,
        "reg-1",
        body(json!({ "status": "Draft", "craft": { "name": "Osprey" } })),
    )
    .await
    .expect("create");

    let stored = db.get(Collection::Registrations, "reg-1").await.expect("get").expect("present");
    assert_eq!(stored.status(), Some("Draft"));
    assert_eq!(stored.data["craft"]["name"], "Osprey");

    let duplicate = db.create(Collection::Registrations, "reg-1", Body::new()).await.unwrap_err();
    assert_eq!(duplicate.kind(), "already_exists");

    assert!(db.get(Collection::Registrations, "missing").await.expect("get").is_none());
}

#[tokio::test]
async fn list_filters_by_status_and_other_fields() {
    let db = connect("listing").await;
    for (id, status, inspector) in
        [("i-1", "Scheduled", "u1"), ("i-2", "Scheduled", "u2"), ("i-3", "Passed", "u1")]
    {
        db.create(
            Collection::Inspections,
            id,
            body(json!({ "status": status, "inspectorRef": inspector })),
        )
        .await
        .expect("create");
    }

    let scheduled =
        db.list(Collection::Inspections, &Filter::all().eq("status", "Scheduled")).await.unwrap();
    assert_eq!(scheduled.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), ["i-1", "i-2"]);

    let mine = db
        .list(
            Collection::Inspections,
            &Filter::all().eq("status", "Scheduled").eq("inspectorRef", "u1"),
        )
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn conditional_update_rejects_a_moved_record() {
    let db = connect("conditional").await;
    db.create(Collection::Infringements, "inf-1", body(json!({ "status": "PendingReview" })))
        .await
        .unwrap();

    let approved = db
        .update(
            Collection::Infringements,
            "inf-1",
            body(json!({ "status": "Approved" })),
            Some(Precondition::StatusIs("PendingReview".to_owned())),
        )
        .await
        .expect("first approve");
    assert_eq!(approved.status(), Some("Approved"));

    let err = db
        .update(
            Collection::Infringements,
            "inf-1",
            body(json!({ "status": "Approved" })),
            Some(Precondition::StatusIs("PendingReview".to_owned())),
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, DatabaseError::PreconditionFailed { ref actual, .. } if actual == "Approved")
    );
}

#[tokio::test]
async fn delete_drops_the_row() {
    let db = connect("deleting").await;
    db.create(Collection::CompetencyTests, "t-1", body(json!({ "location": "Dock" })))
        .await
        .expect("create");

    db.delete(Collection::CompetencyTests, "t-1").await.expect("delete");
    assert!(db.get(Collection::CompetencyTests, "t-1").await.expect("get").is_none());
    db.delete(Collection::CompetencyTests, "t-1").await.expect("delete missing");
}
