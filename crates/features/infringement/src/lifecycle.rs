use rego_derive::api_model;
use rego_domain::roles::{Role, RoleSet};
use rego_domain::status::InfringementStatus::{
    self, Approved, Draft, Issued, Overdue, Paid, PendingReview, Voided,
};
use rego_kernel::lifecycle::{Lifecycle, Rule};
use strum_macros::Display;

#[api_model]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum InfringementAction {
    Edit,
    Issue,
    SubmitForReview,
    Approve,
    RecordPayment,
    MarkOverdue,
    Void,
}

const REVIEWERS: RoleSet = RoleSet::MANAGEMENT;
/// Officers act only on notices they issued.
const ISSUER: RoleSet = RoleSet::of(&[Role::Officer]);
const CASHIERS: RoleSet = RoleSet::of(&[Role::Registrar, Role::Admin]);
const NOBODY: RoleSet = RoleSet::empty();

#[derive(Debug)]
pub struct InfringementLifecycle;

impl Lifecycle for InfringementLifecycle {
    type Status = InfringementStatus;
    type Action = InfringementAction;

    const ENTITY: &'static str = "Infringement";
    const RULES: &'static [Rule<InfringementStatus, InfringementAction>] = &[
        Rule {
            action: InfringementAction::Edit,
            from: &[Draft],
            to: None,
            roles: REVIEWERS,
            assignee_roles: ISSUER,
        },
        Rule {
            action: InfringementAction::Issue,
            from: &[Draft],
            to: Some(Issued),
            roles: REVIEWERS,
            assignee_roles: ISSUER,
        },
        Rule {
            action: InfringementAction::SubmitForReview,
            from: &[Issued],
            to: Some(PendingReview),
            roles: REVIEWERS,
            assignee_roles: ISSUER,
        },
        Rule {
            action: InfringementAction::Approve,
            from: &[PendingReview],
            to: Some(Approved),
            roles: REVIEWERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: InfringementAction::RecordPayment,
            from: &[Approved, Overdue],
            to: Some(Paid),
            roles: CASHIERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: InfringementAction::MarkOverdue,
            from: &[Approved],
            to: Some(Overdue),
            roles: REVIEWERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: InfringementAction::Void,
            from: &[Draft, Issued, PendingReview, Approved, Overdue],
            to: Some(Voided),
            roles: REVIEWERS,
            assignee_roles: NOBODY,
        },
    ];
}
