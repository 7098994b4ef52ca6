use async_trait::async_trait;
use chrono::{Duration, Utc};
use rego_database::{Body, DocumentStore, MemoryStore};
use rego_domain::config::WriteMode;
use rego_domain::constants::Collection;
use rego_domain::roles::Role;
use rego_domain::status::{ChecklistResult, InspectionStatus, InspectionType, OverallResult};
use rego_inspection::model::{
    AppendChecklistRequest, AssessItemRequest, CreateInspectionRequest, NewChecklistItem,
    OverallResultRequest, UpdateScheduleRequest,
};
use rego_inspection::suggest::{CraftContext, SuggestedItem};
use rego_inspection::{
    ChecklistSuggester, InspectionAction, InspectionCommand, InspectionService, SuggestionError,
};
use rego_kernel::context::{Principal, RequestContext};
use rego_kernel::repository::Repository;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

fn ctx(role: Role, user_id: &str) -> RequestContext {
    RequestContext::new(Principal { user_id: user_id.into(), display_name: user_id.into(), role })
}

fn body(value: Value) -> Body {
    value.as_object().cloned().unwrap_or_default()
}

async fn seeded() -> (Arc<MemoryStore>, Repository) {
    let store = Arc::new(MemoryStore::new());
    store
        .put(
            Collection::Users,
            "kim",
            body(json!({ "displayName": "Kim Ng", "role": "Inspector" })),
        )
        .await
        .unwrap();
    store
        .put(
            Collection::Users,
            "lee",
            body(json!({ "displayName": "Lee Fox", "role": "Inspector" })),
        )
        .await
        .unwrap();
    store
        .put(
            Collection::Registrations,
            "reg1",
            body(json!({
                "status": "Approved",
                "registrationNumber": "RC-2026-AAAA2222",
                "craft": {
                    "name": "Gull",
                    "hullIdentificationNumber": "HIN-1",
                    "make": "Quintrex",
                    "lengthMeters": 4.8,
                },
            })),
        )
        .await
        .unwrap();
    let repo = Repository::new(store.clone(), WriteMode::default());
    (store, repo)
}

fn request() -> CreateInspectionRequest {
    CreateInspectionRequest {
        registration_id: "reg1".into(),
        inspector_id: "kim".into(),
        scheduled_date: Utc::now() + Duration::days(3),
        inspection_type: InspectionType::Annual,
        location: Some("Marina 4".into()),
        notes: None,
    }
}

fn item(description: &str) -> NewChecklistItem {
    NewChecklistItem { item_id: None, description: description.into(), suggested: false }
}

async fn started(service: &InspectionService) -> String {
    let id = service.create(&ctx(Role::Registrar, "reg"), request()).await.unwrap().id;
    service.transition(&ctx(Role::Inspector, "kim"), &id, InspectionCommand::Start).await.unwrap();
    id
}

#[derive(Debug, Default)]
struct Canned {
    seen: Mutex<Vec<CraftContext>>,
}

#[async_trait]
impl ChecklistSuggester for Canned {
    async fn suggest(&self, context: &CraftContext) -> Result<Vec<SuggestedItem>, SuggestionError> {
        self.seen.lock().unwrap().push(context.clone());
        Ok(vec![SuggestedItem { description: "Navigation lights operate".into() }])
    }
}

#[tokio::test]
async fn scheduled_inspection_offers_start_to_its_inspector() {
    let (_, repo) = seeded().await;
    let service = InspectionService::new(repo);
    let created = service.create(&ctx(Role::Registrar, "reg"), request()).await.unwrap();

    assert_eq!(created.status, InspectionStatus::Scheduled);
    assert_eq!(created.registration.as_ref().and_then(|r| r.craft_name.as_deref()), Some("Gull"));
    assert_eq!(created.inspector.as_ref().and_then(|u| u.display_name.as_deref()), Some("Kim Ng"));

    let assigned = service.get(&ctx(Role::Inspector, "kim"), &created.id).await.unwrap();
    assert!(assigned.actions.contains(&InspectionAction::Start));

    let other = service.get(&ctx(Role::Inspector, "lee"), &created.id).await.unwrap();
    assert!(other.actions.is_empty());
}

#[tokio::test]
async fn create_checks_the_referenced_records() {
    let (_, repo) = seeded().await;
    let service = InspectionService::new(repo);
    let mut bad = request();
    bad.registration_id = "ghost".into();
    bad.inspector_id = "nobody".into();

    let err = service.create(&ctx(Role::Registrar, "reg"), bad).await.unwrap_err();
    assert_eq!(err.kind(), "validation");
    assert!(err.to_string().contains("registrationId"));

    let err = service.create(&ctx(Role::Inspector, "kim"), request()).await.unwrap_err();
    assert_eq!(err.kind(), "forbidden");
}

#[tokio::test]
async fn only_the_assigned_inspector_may_start() {
    let (_, repo) = seeded().await;
    let service = InspectionService::new(repo);
    let id = service.create(&ctx(Role::Registrar, "reg"), request()).await.unwrap().id;

    let err = service
        .transition(&ctx(Role::Inspector, "lee"), &id, InspectionCommand::Start)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "guard");

    let view = service
        .transition(&ctx(Role::Inspector, "kim"), &id, InspectionCommand::Start)
        .await
        .unwrap();
    assert_eq!(view.status, InspectionStatus::InProgress);
    assert!(view.started_at.is_some());
}

#[tokio::test]
async fn reassignment_moves_the_right_to_start() {
    let (_, repo) = seeded().await;
    let service = InspectionService::new(repo);
    let id = service.create(&ctx(Role::Registrar, "reg"), request()).await.unwrap().id;

    let update = UpdateScheduleRequest {
        inspector_id: Some("lee".into()),
        ..UpdateScheduleRequest::default()
    };
    service.update_schedule(&ctx(Role::Supervisor, "sup"), &id, update).await.unwrap();

    let view = service.get(&ctx(Role::Inspector, "lee"), &id).await.unwrap();
    assert!(view.actions.contains(&InspectionAction::Start));
    assert!(service.get(&ctx(Role::Inspector, "kim"), &id).await.unwrap().actions.is_empty());
}

#[tokio::test]
async fn checklist_is_editable_only_while_in_progress() {
    let (_, repo) = seeded().await;
    let service = InspectionService::new(repo);
    let kim = ctx(Role::Inspector, "kim");
    let id = service.create(&ctx(Role::Registrar, "reg"), request()).await.unwrap().id;

    let early = AppendChecklistRequest { items: vec![item("Hull sound")] };
    let err = service.append_checklist(&kim, &id, early).await.unwrap_err();
    assert_eq!(err.kind(), "guard");

    service.transition(&kim, &id, InspectionCommand::Start).await.unwrap();
    let view = service
        .append_checklist(
            &kim,
            &id,
            AppendChecklistRequest { items: vec![item("Hull sound"), item("Flares in date")] },
        )
        .await
        .unwrap();
    assert_eq!(view.checklist.len(), 2);
    assert!(view.checklist.iter().all(|i| i.item_id.len() == 12 && i.result.is_none()));

    service.transition(&kim, &id, InspectionCommand::Complete).await.unwrap();
    let late = AppendChecklistRequest { items: vec![item("Anchor")] };
    assert_eq!(service.append_checklist(&kim, &id, late).await.unwrap_err().kind(), "guard");
}

#[tokio::test]
async fn duplicate_and_blank_items_are_rejected() {
    let (_, repo) = seeded().await;
    let service = InspectionService::new(repo);
    let kim = ctx(Role::Inspector, "kim");
    let id = started(&service).await;

    let fixed = NewChecklistItem {
        item_id: Some("hull".into()),
        description: "Hull sound".into(),
        suggested: false,
    };
    service
        .append_checklist(&kim, &id, AppendChecklistRequest { items: vec![fixed.clone()] })
        .await
        .unwrap();

    let err = service
        .append_checklist(&kim, &id, AppendChecklistRequest { items: vec![fixed, item(" ")] })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");
    assert_eq!(service.get(&kim, &id).await.unwrap().checklist.len(), 1);
}

#[tokio::test]
async fn assessment_overwrites_and_overall_result_stays_manual() {
    let (_, repo) = seeded().await;
    let service = InspectionService::new(repo);
    let kim = ctx(Role::Inspector, "kim");
    let id = started(&service).await;
    let item_id = service
        .append_checklist(
            &kim,
            &id,
            AppendChecklistRequest { items: vec![item("Bilge pump works")] },
        )
        .await
        .unwrap()
        .checklist[0]
        .item_id
        .clone();

    let first =
        AssessItemRequest { result: Some(ChecklistResult::No), comments: Some("Seized".into()) };
    service.assess_item(&kim, &id, &item_id, first).await.unwrap();
    let second = AssessItemRequest { result: Some(ChecklistResult::Yes), comments: None };
    let view = service.assess_item(&kim, &id, &item_id, second).await.unwrap();
    assert_eq!(view.checklist[0].result, Some(ChecklistResult::Yes));
    assert!(view.checklist[0].comments.is_none());
    assert!(view.overall_result.is_none());

    let missing =
        AssessItemRequest { result: Some(ChecklistResult::NotApplicable), comments: None };
    assert_eq!(
        service.assess_item(&kim, &id, "nope", missing).await.unwrap_err().kind(),
        "not_found"
    );

    let view = service
        .set_overall_result(
            &kim,
            &id,
            OverallResultRequest { overall_result: Some(OverallResult::Conditional) },
        )
        .await
        .unwrap();
    assert_eq!(view.overall_result, Some(OverallResult::Conditional));
}

#[tokio::test]
async fn review_is_stamped_by_management() {
    let (_, repo) = seeded().await;
    let service = InspectionService::new(repo);
    let kim = ctx(Role::Inspector, "kim");
    let id = started(&service).await;
    let done = service.transition(&kim, &id, InspectionCommand::Complete).await.unwrap();
    assert_eq!(done.status, InspectionStatus::PendingReview);
    assert!(done.completed_at.is_some());
    assert!(done.actions.is_empty());

    assert_eq!(
        service.transition(&kim, &id, InspectionCommand::Pass).await.unwrap_err().kind(),
        "guard"
    );

    let passed = service
        .transition(&ctx(Role::Supervisor, "sup"), &id, InspectionCommand::Pass)
        .await
        .unwrap();
    assert_eq!(passed.status, InspectionStatus::Passed);
    assert!(passed.reviewed_at.is_some());
    assert_eq!(passed.reviewed_by.map(|u| u.id).as_deref(), Some("sup"));
}

#[tokio::test]
async fn cancel_needs_a_reason() {
    let (_, repo) = seeded().await;
    let service = InspectionService::new(repo);
    let registrar = ctx(Role::Registrar, "reg");
    let id = service.create(&registrar, request()).await.unwrap().id;

    let err = service
        .transition(&registrar, &id, InspectionCommand::Cancel { reason: String::new() })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");

    let view = service
        .transition(
            &registrar,
            &id,
            InspectionCommand::Cancel { reason: "Owner unavailable".into() },
        )
        .await
        .unwrap();
    assert_eq!(view.status, InspectionStatus::Cancelled);
    assert_eq!(view.cancellation_reason.as_deref(), Some("Owner unavailable"));
    assert!(view.actions.is_empty());
}

#[tokio::test]
async fn suggestions_need_a_configured_service() {
    let (_, repo) = seeded().await;
    let service = InspectionService::new(repo);
    let id = started(&service).await;

    let err = service.suggest(&ctx(Role::Inspector, "kim"), &id).await.unwrap_err();
    assert_eq!(err.kind(), "unavailable");
}

#[tokio::test]
async fn suggestions_describe_the_craft_and_are_not_saved() {
    let (_, repo) = seeded().await;
    let canned = Arc::new(Canned::default());
    let service = InspectionService::new(repo).with_suggester(canned.clone());
    let kim = ctx(Role::Inspector, "kim");
    let id = started(&service).await;
    service
        .append_checklist(&kim, &id, AppendChecklistRequest { items: vec![item("Hull sound")] })
        .await
        .unwrap();

    let items = service.suggest(&kim, &id).await.unwrap();
    assert_eq!(items, [SuggestedItem { description: "Navigation lights operate".into() }]);

    let seen = canned.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].craft_name.as_deref(), Some("Gull"));
    assert_eq!(seen[0].length_meters, Some(4.8));
    assert_eq!(seen[0].inspection_type, Some(InspectionType::Annual));
    assert_eq!(seen[0].existing, ["Hull sound"]);
    assert_eq!(service.get(&kim, &id).await.unwrap().checklist.len(), 1);

    let err = service.suggest(&ctx(Role::Inspector, "lee"), &id).await.unwrap_err();
    assert_eq!(err.kind(), "guard");
}

#[tokio::test]
async fn list_resolves_references_per_record() {
    let (store, repo) = seeded().await;
    let service = InspectionService::new(repo);
    service.create(&ctx(Role::Registrar, "reg"), request()).await.unwrap();
    store
        .put(
            Collection::Inspections,
            "legacy",
            body(json!({
                "status": "Passed",
                "registrationRef": { "id": "reg9", "craftName": "Tern" },
                "inspectorRef": "users/retired",
                "scheduledDate": { "_seconds": 1_700_000_000, "_nanoseconds": 0 },
            })),
        )
        .await
        .unwrap();

    let all = service.list(&ctx(Role::Supervisor, "sup"), None).await.unwrap();
    assert_eq!(all.len(), 2);
    let legacy = service
        .list(&ctx(Role::Supervisor, "sup"), Some(InspectionStatus::Passed))
        .await
        .unwrap();
    assert_eq!(legacy.len(), 1);
    assert_eq!(legacy[0].registration.as_ref().and_then(|r| r.craft_name.as_deref()), Some("Tern"));
    assert_eq!(legacy[0].inspector.as_ref().map(|u| u.id.as_str()), Some("retired"));
    assert!(legacy[0].scheduled_date.is_some());
}

#[tokio::test]
async fn one_undecodable_record_does_not_hide_the_rest() {
    let (store, repo) = seeded().await;
    let service = InspectionService::new(repo);
    let good = service.create(&ctx(Role::Registrar, "reg"), request()).await.unwrap().id;
    store
        .put(
            Collection::Inspections,
            "lowercase",
            body(
                json!(
                    {
                        "status": "Scheduled",
                        "inspectionType": "annual",
                        "registrationRef": "registrations/reg1",
                    }
                ),
            ),
        )
        .await
        .unwrap();

    let all = service.list(&ctx(Role::Supervisor, "sup"), None).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, good);
}
