use rego_derive::api_model;
use rego_domain::roles::{Role, RoleSet};
use rego_domain::status::RegistrationStatus::{
    self, Approved, Draft, Expired, PendingReview, Rejected, RequiresInfo, Submitted,
};
use rego_kernel::lifecycle::{Lifecycle, Rule};
use strum_macros::Display;

#[api_model]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RegistrationAction {
    Edit,
    Submit,
    BeginReview,
    Approve,
    Reject,
    RequestInfo,
    Resubmit,
    Expire,
}

const OFFICE: RoleSet = RoleSet::of(&[Role::Registrar, Role::Admin, Role::Supervisor]);
const DECIDERS: RoleSet = RoleSet::MANAGEMENT;
const NOBODY: RoleSet = RoleSet::empty();

#[derive(Debug)]
pub struct RegistrationLifecycle;

impl Lifecycle for RegistrationLifecycle {
    type Status = RegistrationStatus;
    type Action = RegistrationAction;

    const ENTITY: &'static str = "Registration";
    const RULES: &'static [Rule<RegistrationStatus, RegistrationAction>] = &[
        Rule {
            action: RegistrationAction::Edit,
            from: &[Draft, RequiresInfo],
            to: None,
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: RegistrationAction::Submit,
            from: &[Draft],
            to: Some(Submitted),
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: RegistrationAction::BeginReview,
            from: &[Submitted],
            to: Some(PendingReview),
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: RegistrationAction::Approve,
            from: &[PendingReview],
            to: Some(Approved),
            roles: DECIDERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: RegistrationAction::Reject,
            from: &[PendingReview],
            to: Some(Rejected),
            roles: DECIDERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: RegistrationAction::RequestInfo,
            from: &[PendingReview],
            to: Some(RequiresInfo),
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: RegistrationAction::Resubmit,
            from: &[RequiresInfo],
            to: Some(Submitted),
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: RegistrationAction::Expire,
            from: &[Approved],
            to: Some(Expired),
            roles: DECIDERS,
            assignee_roles: NOBODY,
        },
    ];
}
