use rego_derive::api_model;
use rego_domain::roles::{Role, RoleSet};
use rego_domain::status::LicenseStatus::{
    self, Approved, AwaitingTest, Draft, Expired, PendingReview, Rejected, RequiresInfo, Revoked,
    Submitted, TestFailed, TestPassed, TestScheduled,
};
use rego_kernel::lifecycle::{Lifecycle, Rule};
use strum_macros::Display;

#[api_model]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum LicenseAction {
    Edit,
    Submit,
    BeginReview,
    RequestInfo,
    Resubmit,
    RequireTest,
    ScheduleTest,
    RecordTestPass,
    RecordTestFail,
    Approve,
    Reject,
    Revoke,
    Expire,
}

const OFFICE: RoleSet = RoleSet::OFFICE;
const DECIDERS: RoleSet = RoleSet::MANAGEMENT;
const EXAMINERS: RoleSet = RoleSet::of(&[Role::Inspector, Role::Admin, Role::Supervisor]);
const NOBODY: RoleSet = RoleSet::empty();

#[derive(Debug)]
pub struct LicenseLifecycle;

impl Lifecycle for LicenseLifecycle {
    type Status = LicenseStatus;
    type Action = LicenseAction;

    const ENTITY: &'static str = "Operator licence";
    const RULES: &'static [Rule<LicenseStatus, LicenseAction>] = &[
        Rule {
            action: LicenseAction::Edit,
            from: &[Draft, RequiresInfo],
            to: None,
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::Submit,
            from: &[Draft],
            to: Some(Submitted),
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::BeginReview,
            from: &[Submitted],
            to: Some(PendingReview),
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::RequestInfo,
            from: &[PendingReview],
            to: Some(RequiresInfo),
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::Resubmit,
            from: &[RequiresInfo],
            to: Some(Submitted),
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::RequireTest,
            from: &[PendingReview],
            to: Some(AwaitingTest),
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::ScheduleTest,
            from: &[AwaitingTest, TestFailed],
            to: Some(TestScheduled),
            roles: OFFICE,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::RecordTestPass,
            from: &[TestScheduled],
            to: Some(TestPassed),
            roles: EXAMINERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::RecordTestFail,
            from: &[TestScheduled],
            to: Some(TestFailed),
            roles: EXAMINERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::Approve,
            from: &[PendingReview, TestPassed],
            to: Some(Approved),
            roles: DECIDERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::Reject,
            from: &[PendingReview, TestFailed],
            to: Some(Rejected),
            roles: DECIDERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::Revoke,
            from: &[Approved],
            to: Some(Revoked),
            roles: RoleSet::ADMIN,
            assignee_roles: NOBODY,
        },
        Rule {
            action: LicenseAction::Expire,
            from: &[Approved],
            to: Some(Expired),
            roles: DECIDERS,
            assignee_roles: NOBODY,
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use rego_kernel::lifecycle::{Actor, actor_grid};

    #[test]
    fn a_failed_test_can_be_retaken_or_rejected() {
        let registrar = Actor::new(Role::Registrar);
        let admin = Actor::new(Role::Admin);
        assert_eq!(
            LicenseLifecycle::permitted_actions(TestFailed, &registrar),
            [LicenseAction::ScheduleTest]
        );
        assert_eq!(
            LicenseLifecycle::permitted_actions(TestFailed, &admin),
            [LicenseAction::ScheduleTest, LicenseAction::Reject]
        );
    }

    #[test]
    fn inspectors_only_record_results() {
        for (status, actor) in actor_grid::<LicenseLifecycle>() {
            if actor.role != Role::Inspector {
                continue;
            }
            let actions = LicenseLifecycle::permitted_actions(status, &actor);
            if status == TestScheduled {
                assert_eq!(actions, [LicenseAction::RecordTestPass, LicenseAction::RecordTestFail]);
            } else {
                assert!(actions.is_empty(), "{status}");
            }
        }
    }

    #[test]
    fn only_admins_revoke() {
        let supervisor = Actor::new(Role::Supervisor);
        assert_eq!(
            LicenseLifecycle::permitted_actions(Approved, &supervisor),
            [LicenseAction::Expire]
        );
        assert_eq!(
            LicenseLifecycle::permitted_actions(Approved, &Actor::new(Role::Admin)),
            [LicenseAction::Revoke, LicenseAction::Expire]
        );
    }

    #[test]
    fn officers_never_act() {
        for (status, actor) in actor_grid::<LicenseLifecycle>() {
            if actor.role == Role::Officer {
                assert!(LicenseLifecycle::permitted_actions(status, &actor).is_empty(), "{status}");
            }
        }
    }

    #[test]
    fn permitted_actions_agree_with_authorize() {
        for (status, actor) in actor_grid::<LicenseLifecycle>() {
            let permitted = LicenseLifecycle::permitted_actions(status, &actor);
            for rule in LicenseLifecycle::RULES {
                let allowed = LicenseLifecycle::authorize(status, rule.action, &actor).is_ok();
                assert_eq!(
                    allowed,
                    permitted.contains(&rule.action),
                    "{status} {actor:?} {}",
                    rule.action
                );
            }
        }
    }
}
