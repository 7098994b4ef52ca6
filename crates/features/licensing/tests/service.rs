use async_trait::async_trait;
use chrono::{Duration, Utc};
use rego_database::{
    Body, DatabaseError, Document, DocumentStore, Filter, MemoryStore, Precondition,
};
use rego_domain::config::{ApiConfig, WriteMode};
use rego_domain::constants::Collection;
use rego_domain::roles::Role;
use rego_domain::status::{LicenseClass, LicenseStatus, TestResult};
use rego_kernel::context::{Principal, RequestContext};
use rego_kernel::repository::Repository;
use rego_licensing::model::{Applicant, CreateLicenseRequest, UpdateLicenseRequest};
use rego_licensing::{LicenseAction, LicenseCommand, LicenseService};
use serde_json::json;
use std::sync::Arc;

fn ctx(role: Role) -> RequestContext {
    let id = role.to_string().to_lowercase();
    RequestContext::new(Principal { user_id: id.clone(), display_name: id, role })
}

fn request() -> CreateLicenseRequest {
    CreateLicenseRequest {
        operator_id: None,
        applicant: Applicant {
            full_name: "Ada Byron".into(),
            email: Some("ada@example.org".into()),
            ..Applicant::default()
        },
        license_class: LicenseClass::General,
    }
}

async fn service() -> (Arc<MemoryStore>, LicenseService) {
    let store = Arc::new(MemoryStore::new());
    let mut examiner = Body::new();
    examiner.insert("displayName".into(), json!("Kim Ng"));
    examiner.insert("role".into(), json!("Inspector"));
    store.put(Collection::Users, "kim", examiner).await.unwrap();
    let repo = Repository::new(store.clone(), WriteMode::default());
    (store, LicenseService::new(repo, &ApiConfig::default().records))
}

async fn in_review(service: &LicenseService) -> String {
    let registrar = ctx(Role::Registrar);
    let id = service.create(&registrar, request()).await.unwrap().id;
    service.transition(&registrar, &id, LicenseCommand::Submit).await.unwrap();
    service.transition(&registrar, &id, LicenseCommand::BeginReview).await.unwrap();
    id
}

fn schedule() -> LicenseCommand {
    LicenseCommand::ScheduleTest {
        examiner_id: "kim".into(),
        scheduled_date: Utc::now() + Duration::days(7),
        location: "Harbour office".into(),
    }
}

#[tokio::test]
async fn new_application_is_a_draft_without_a_number() {
    let (_, service) = service().await;
    let view = service.create(&ctx(Role::Registrar), request()).await.unwrap();

    assert_eq!(view.status, LicenseStatus::Draft);
    assert_eq!(view.actions, [LicenseAction::Edit, LicenseAction::Submit]);
    assert!(view.assigned_license_number.is_none());
    assert!(view.test.is_none());
}

#[tokio::test]
async fn operator_link_must_name_a_user() {
    let (_, service) = service().await;
    let mut linked = request();
    linked.operator_id = Some("kim".into());
    let view = service.create(&ctx(Role::Registrar), linked).await.unwrap();
    assert_eq!(view.operator.and_then(|u| u.display_name).as_deref(), Some("Kim Ng"));

    let mut dangling = request();
    dangling.operator_id = Some("ghost".into());
    let err = service.create(&ctx(Role::Registrar), dangling).await.unwrap_err();
    assert_eq!(err.kind(), "validation");
}

#[tokio::test]
async fn direct_approval_assigns_number_and_five_year_term() {
    let (_, service) = service().await;
    let id = in_review(&service).await;

    let approved = service
        .transition(
            &ctx(Role::Admin),
            &id,
            LicenseCommand::Approve { effective_date: None, term_months: None },
        )
        .await
        .unwrap();
    assert_eq!(approved.status, LicenseStatus::Approved);
    let number = approved.assigned_license_number.unwrap();
    assert!(number.starts_with("OL-"), "{number}");
    let (effective, expiry) = (approved.effective_date.unwrap(), approved.expiry_date.unwrap());
    assert_eq!(rego_kernel::time::add_months(effective, 60), Some(expiry));
    assert_eq!(approved.approved_by.map(|u| u.id).as_deref(), Some("admin"));
}

#[tokio::test]
async fn number_is_set_only_on_approval() {
    let (_, service) = service().await;
    let id = in_review(&service).await;
    let registrar = ctx(Role::Registrar);
    service.transition(&registrar, &id, LicenseCommand::RequireTest).await.unwrap();
    let scheduled = service.transition(&registrar, &id, schedule()).await.unwrap();
    let passed = service
        .transition(
            &ctx(Role::Inspector),
            &id,
            LicenseCommand::RecordTestPass { score: Some(42), notes: None },
        )
        .await
        .unwrap();

    for view in [&scheduled, &passed] {
        assert!(view.assigned_license_number.is_none(), "{}", view.status);
    }
    assert_eq!(passed.status, LicenseStatus::TestPassed);
}

#[tokio::test]
async fn scheduled_test_is_its_own_document() {
    let (store, service) = service().await;
    let id = in_review(&service).await;
    let registrar = ctx(Role::Registrar);
    service.transition(&registrar, &id, LicenseCommand::RequireTest).await.unwrap();

    let view = service.transition(&registrar, &id, schedule()).await.unwrap();
    assert_eq!(view.status, LicenseStatus::TestScheduled);
    let test = view.test.unwrap();
    assert!(test.scheduled_date.is_some());
    assert!(test.result.is_none());

    let doc = store.get(Collection::CompetencyTests, &test.id).await.unwrap().unwrap();
    assert_eq!(doc.data["examinerRef"], json!({ "$ref": "users/kim" }));
    assert_eq!(
        doc.data["applicationRef"],
        json!({ "$ref": format!("operatorLicenseApplications/{id}") })
    );
    assert_eq!(doc.data["location"], json!("Harbour office"));
}

#[tokio::test]
async fn schedule_test_validates_its_fields() {
    let (_, service) = service().await;
    let id = in_review(&service).await;
    let registrar = ctx(Role::Registrar);
    service.transition(&registrar, &id, LicenseCommand::RequireTest).await.unwrap();

    let blank = LicenseCommand::ScheduleTest {
        examiner_id: " ".into(),
        scheduled_date: Utc::now(),
        location: String::new(),
    };
    let err = service.transition(&registrar, &id, blank).await.unwrap_err();
    assert_eq!(err.kind(), "validation");

    let unknown = LicenseCommand::ScheduleTest {
        examiner_id: "ghost".into(),
        scheduled_date: Utc::now(),
        location: "Dock".into(),
    };
    assert_eq!(
        service.transition(&registrar, &id, unknown).await.unwrap_err().kind(),
        "validation"
    );
    assert_eq!(service.get(&registrar, &id).await.unwrap().status, LicenseStatus::AwaitingTest);
}

#[tokio::test]
async fn failed_test_records_result_and_allows_a_retake() {
    let (store, service) = service().await;
    let id = in_review(&service).await;
    let registrar = ctx(Role::Registrar);
    service.transition(&registrar, &id, LicenseCommand::RequireTest).await.unwrap();
    let first = service.transition(&registrar, &id, schedule()).await.unwrap().test.unwrap().id;

    let failed = service
        .transition(
            &ctx(Role::Inspector),
            &id,
            LicenseCommand::RecordTestFail {
                score: Some(18),
                notes: Some("Missed buoyage".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(failed.status, LicenseStatus::TestFailed);
    assert_eq!(failed.test.as_ref().and_then(|t| t.result), Some(TestResult::Fail));
    let doc = store.get(Collection::CompetencyTests, &first).await.unwrap().unwrap();
    assert_eq!(doc.data["score"], json!(18));
    assert_eq!(doc.data["notes"], json!("Missed buoyage"));

    let retake = service.transition(&registrar, &id, schedule()).await.unwrap();
    let second = retake.test.unwrap();
    assert_ne!(second.id, first);
    assert!(second.result.is_none());
}

#[tokio::test]
async fn registrars_cannot_record_results() {
    let (_, service) = service().await;
    let id = in_review(&service).await;
    let registrar = ctx(Role::Registrar);
    service.transition(&registrar, &id, LicenseCommand::RequireTest).await.unwrap();
    service.transition(&registrar, &id, schedule()).await.unwrap();

    let err = service
        .transition(&registrar, &id, LicenseCommand::RecordTestPass { score: None, notes: None })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "guard");
}

#[tokio::test]
async fn reject_and_revoke_need_reasons() {
    let (_, service) = service().await;
    let admin = ctx(Role::Admin);
    let id = in_review(&service).await;
    let err = service
        .transition(&admin, &id, LicenseCommand::Reject { reason: String::new() })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");

    service
        .transition(
            &admin,
            &id,
            LicenseCommand::Approve { effective_date: None, term_months: Some(12) },
        )
        .await
        .unwrap();
    let err = service
        .transition(&admin, &id, LicenseCommand::Revoke { reason: "  ".into() })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation");

    let revoked = service
        .transition(&admin, &id, LicenseCommand::Revoke { reason: "Court order".into() })
        .await
        .unwrap();
    assert_eq!(revoked.status, LicenseStatus::Revoked);
    assert_eq!(revoked.revocation_reason.as_deref(), Some("Court order"));
    assert!(revoked.actions.is_empty());
}

#[tokio::test]
async fn supervisors_cannot_revoke() {
    let (_, service) = service().await;
    let id = in_review(&service).await;
    let supervisor = ctx(Role::Supervisor);
    service
        .transition(
            &supervisor,
            &id,
            LicenseCommand::Approve { effective_date: None, term_months: None },
        )
        .await
        .unwrap();

    let err = service
        .transition(&supervisor, &id, LicenseCommand::Revoke { reason: "x".into() })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "guard");
}

#[tokio::test]
async fn edits_only_while_draft_or_requires_info() {
    let (_, service) = service().await;
    let registrar = ctx(Role::Registrar);
    let id = in_review(&service).await;
    let change = || UpdateLicenseRequest {
        applicant: None,
        license_class: Some(LicenseClass::Commercial),
    };

    assert_eq!(service.update(&registrar, &id, change()).await.unwrap_err().kind(), "guard");

    service
        .transition(&registrar, &id, LicenseCommand::RequestInfo { note: "Need ID".into() })
        .await
        .unwrap();
    let edited = service.update(&registrar, &id, change()).await.unwrap();
    assert_eq!(edited.license_class, Some(LicenseClass::Commercial));
    assert_eq!(edited.status, LicenseStatus::RequiresInfo);
}

#[tokio::test]
async fn list_filters_by_status() {
    let (_, service) = service().await;
    in_review(&service).await;
    service.create(&ctx(Role::Registrar), request()).await.unwrap();

    let reviewer = ctx(Role::Supervisor);
    assert_eq!(service.list(&reviewer, None).await.unwrap().len(), 2);
    let pending = service.list(&reviewer, Some(LicenseStatus::PendingReview)).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].actions, [
        LicenseAction::RequestInfo,
        LicenseAction::RequireTest,
        LicenseAction::Approve,
        LicenseAction::Reject
    ]);
}

/// Loses every application write that links a test, as if another reviewer moved it first.
#[derive(Debug)]
struct Contested(Arc<MemoryStore>);

#[async_trait]
impl DocumentStore for Contested {
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, DatabaseError> {
        self.0.get(collection, id).await
    }

    async fn list(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, DatabaseError> {
        self.0.list(collection, filter).await
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        data: Body,
    ) -> Result<Document, DatabaseError> {
        self.0.create(collection, id, data).await
    }

    async fn put(
        &self,
        collection: Collection,
        id: &str,
        data: Body,
    ) -> Result<Document, DatabaseError> {
        self.0.put(collection, id, data).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Body,
        precondition: Option<Precondition>,
    ) -> Result<Document, DatabaseError> {
        if collection == Collection::OperatorLicenseApplications && patch.contains_key("testRef") {
            return Err(DatabaseError::PreconditionFailed {
                collection: collection.name(),
                id: id.to_owned(),
                expected: "AwaitingTest".into(),
                actual: "Rejected".into(),
                context: None,
            });
        }
        self.0.update(collection, id, patch, precondition).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), DatabaseError> {
        self.0.delete(collection, id).await
    }
}

#[tokio::test]
async fn lost_schedule_write_leaves_no_test_behind() {
    let (memory, _) = service().await;
    let repo = Repository::new(Arc::new(Contested(memory.clone())), WriteMode::CompareStatus);
    let service = LicenseService::new(repo, &ApiConfig::default().records);
    let id = in_review(&service).await;
    let registrar = ctx(Role::Registrar);
    service.transition(&registrar, &id, LicenseCommand::RequireTest).await.unwrap();

    let err = service.transition(&registrar, &id, schedule()).await.unwrap_err();
    assert!(matches!(
        err,
        rego_kernel::ServiceError::Store { source: DatabaseError::PreconditionFailed { .. }, .. }
    ));
    assert!(memory.list(Collection::CompetencyTests, &Filter::all()).await.unwrap().is_empty());
    assert_eq!(service.get(&registrar, &id).await.unwrap().status, LicenseStatus::AwaitingTest);
}

#[tokio::test]
async fn test_link_into_another_collection_is_not_a_scheduled_test() {
    let (store, service) = service().await;
    let id = in_review(&service).await;
    let registrar = ctx(Role::Registrar);
    service.transition(&registrar, &id, LicenseCommand::RequireTest).await.unwrap();
    service.transition(&registrar, &id, schedule()).await.unwrap();
    let mut relink = Body::new();
    relink.insert("testRef".into(), json!({ "$ref": "registrations/reg1" }));
    store.update(Collection::OperatorLicenseApplications, &id, relink, None).await.unwrap();

    let err = service
        .transition(
            &ctx(Role::Inspector),
            &id,
            LicenseCommand::RecordTestPass { score: None, notes: None },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "conflict");
}
