use rego_derive::api_model;
use rego_domain::roles::{Role, RoleSet};
use rego_domain::status::InspectionStatus::{
    self, Cancelled, Failed, InProgress, Passed, PendingReview, Scheduled,
};
use rego_kernel::lifecycle::{Lifecycle, Rule};
use strum_macros::Display;

#[api_model]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum InspectionAction {
    EditSchedule,
    Start,
    EditChecklist,
    Complete,
    Pass,
    Fail,
    Cancel,
}

const SCHEDULERS: RoleSet = RoleSet::of(&[Role::Supervisor, Role::Admin, Role::Registrar]);
const REVIEWERS: RoleSet = RoleSet::MANAGEMENT;
/// Inspectors act only on inspections assigned to them.
const ASSIGNED: RoleSet = RoleSet::of(&[Role::Inspector]);
const NOBODY: RoleSet = RoleSet::empty();

#[derive(Debug)]
pub struct InspectionLifecycle;

impl Lifecycle for InspectionLifecycle {
    type Status = InspectionStatus;
    type Action = InspectionAction;

    const ENTITY: &'static str = "Inspection";
    const RULES: &'static [Rule<InspectionStatus, InspectionAction>] = &[
        Rule {
            action: InspectionAction::EditSchedule,
            from: &[Scheduled],
            to: None,
            roles: SCHEDULERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: InspectionAction::Start,
            from: &[Scheduled],
            to: Some(InProgress),
            roles: REVIEWERS,
            assignee_roles: ASSIGNED,
        },
        Rule {
            action: InspectionAction::EditChecklist,
            from: &[InProgress],
            to: None,
            roles: REVIEWERS,
            assignee_roles: ASSIGNED,
        },
        Rule {
            action: InspectionAction::Complete,
            from: &[InProgress],
            to: Some(PendingReview),
            roles: REVIEWERS,
            assignee_roles: ASSIGNED,
        },
        Rule {
            action: InspectionAction::Pass,
            from: &[PendingReview],
            to: Some(Passed),
            roles: REVIEWERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: InspectionAction::Fail,
            from: &[PendingReview],
            to: Some(Failed),
            roles: REVIEWERS,
            assignee_roles: NOBODY,
        },
        Rule {
            action: InspectionAction::Cancel,
            from: &[Scheduled, InProgress],
            to: Some(Cancelled),
            roles: SCHEDULERS,
            assignee_roles: NOBODY,
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use rego_kernel::lifecycle::{Actor, actor_grid};

    #[test]
    fn assigned_inspector_may_start() {
        let assigned = Actor::new(Role::Inspector).assignee(true);
        assert!(
            InspectionLifecycle::permitted_actions(Scheduled, &assigned)
                .contains(&InspectionAction::Start)
        );
    }

    #[test]
    fn other_inspectors_see_nothing() {
        for (status, actor) in actor_grid::<InspectionLifecycle>() {
            if actor.role == Role::Inspector && !actor.is_assignee {
                assert!(
                    InspectionLifecycle::permitted_actions(status, &actor).is_empty(),
                    "{status}"
                );
            }
        }
    }

    #[test]
    fn registrar_schedules_but_never_inspects() {
        let registrar = Actor::new(Role::Registrar).assignee(true);
        assert_eq!(
            InspectionLifecycle::permitted_actions(Scheduled, &registrar),
            [InspectionAction::EditSchedule, InspectionAction::Cancel]
        );
        assert_eq!(
            InspectionLifecycle::permitted_actions(InProgress, &registrar),
            [InspectionAction::Cancel]
        );
    }

    #[test]
    fn review_is_management_only() {
        let assigned = Actor::new(Role::Inspector).assignee(true);
        assert!(InspectionLifecycle::permitted_actions(PendingReview, &assigned).is_empty());
        assert_eq!(
            InspectionLifecycle::permitted_actions(PendingReview, &Actor::new(Role::Supervisor)),
            [InspectionAction::Pass, InspectionAction::Fail]
        );
        for (status, actor) in actor_grid::<InspectionLifecycle>() {
            if matches!(status, Passed | Failed | Cancelled) {
                assert!(InspectionLifecycle::permitted_actions(status, &actor).is_empty());
            }
        }
    }

    #[test]
    fn permitted_actions_agree_with_authorize() {
        for (status, actor) in actor_grid::<InspectionLifecycle>() {
            let permitted = InspectionLifecycle::permitted_actions(status, &actor);
            for rule in InspectionLifecycle::RULES {
                let allowed = InspectionLifecycle::authorize(status, rule.action, &actor).is_ok();
                assert_eq!(allowed, permitted.contains(&rule.action));
            }
        }
    }
}
