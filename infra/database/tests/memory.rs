use rego_database::*;
use rego_domain::constants::Collection;
use serde_json::{Value, json};
use std::sync::Arc;

fn body(value: Value) -> Body {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

#[tokio::test]
async fn update_merges_and_returns_the_new_body() {
    let store = MemoryStore::new();
    store
        .create(
            Collection::Registrations,
            "r1",
            body(json!({ "status": "Draft", "reviewNote": "x" })),
        )
        .await
        .unwrap();

    let updated = store
        .update(
            Collection::Registrations,
            "r1",
            body(json!({ "status": "Submitted", "reviewNote": null })),
            None,
        )
        .await
        .unwrap();

    assert_eq!(Value::Object(updated.data), json!({ "status": "Submitted" }));
}

#[tokio::test]
async fn update_of_missing_document_is_not_found() {
    let store = MemoryStore::new();
    let err = store.update(Collection::Inspections, "nope", Body::new(), None).await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
    assert_eq!(err.to_string(), "Document inspections/nope not found");
}

#[tokio::test]
async fn denied_collection_reports_permission_error() {
    let store = MemoryStore::new();
    store.deny(Collection::Infringements);

    let err = store.list(Collection::Infringements, &Filter::all()).await.unwrap_err();
    assert!(matches!(err, DatabaseError::PermissionDenied { collection: "infringements", .. }));

    store.allow(Collection::Infringements);
    assert!(store.list(Collection::Infringements, &Filter::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn unconditional_concurrent_writes_both_succeed() {
    let store = Arc::new(MemoryStore::new());
    store
        .create(Collection::Infringements, "inf", body(json!({ "status": "PendingReview" })))
        .await
        .unwrap();

    let writes = ["officer-a", "officer-b"].map(|who| {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .update(
                    Collection::Infringements,
                    "inf",
                    body(json!({ "status": "Approved", "approvedByRef": who })),
                    None,
                )
                .await
        })
    });

    for write in writes {
        assert!(write.await.unwrap().is_ok());
    }
    let stored = store.get(Collection::Infringements, "inf").await.unwrap().unwrap();
    assert_eq!(stored.status(), Some("Approved"));
    assert!(matches!(stored.data["approvedByRef"].as_str(), Some("officer-a" | "officer-b")));
}

#[tokio::test]
async fn delete_removes_and_tolerates_missing_documents() {
    let store = MemoryStore::new();
    store
        .create(Collection::CompetencyTests, "t1", body(json!({ "location": "Dock" })))
        .await
        .unwrap();

    store.delete(Collection::CompetencyTests, "t1").await.unwrap();
    assert!(store.get(Collection::CompetencyTests, "t1").await.unwrap().is_none());
    store.delete(Collection::CompetencyTests, "t1").await.unwrap();
}
