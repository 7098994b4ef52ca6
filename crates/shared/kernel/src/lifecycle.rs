//! Status/role transition guard.
//!
//! Each record family declares a static rule table. The guard answers two
//! questions from it: which actions may this actor take now, and may this
//! actor take this action now. Services call [`Lifecycle::authorize`] against
//! the status re-read from the store immediately before they write.

use rego_domain::roles::{Role, RoleSet};
use std::borrow::Cow;
use std::fmt::{Debug, Display};
use strum::IntoEnumIterator;

#[rego_derive::rego_error]
#[derive(Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error(
        "{entity} action '{action}' is not available in status '{status}'{}",
        format_context(.context)
    )]
    InvalidStatus {
        entity: &'static str,
        action: String,
        status: String,
        context: Option<Cow<'static, str>>,
    },

    #[error("Role '{role}' may not {action} a {entity}{}", format_context(.context))]
    RoleNotPermitted {
        entity: &'static str,
        action: String,
        role: Role,
        context: Option<Cow<'static, str>>,
    },

    /// The role qualifies only on records assigned to the caller.
    #[error("Only the assigned {role} may {action} this {entity}{}", format_context(.context))]
    NotAssignee {
        entity: &'static str,
        action: String,
        role: Role,
        context: Option<Cow<'static, str>>,
    },

    #[error("{entity} has no rule for action '{action}'{}", format_context(.context))]
    UnknownAction { entity: &'static str, action: String, context: Option<Cow<'static, str>> },
}

/// Who is asking, as far as the guard cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub role: Role,
    /// The caller is the record's assignee (inspector, issuing officer).
    pub is_assignee: bool,
}

impl Actor {
    #[must_use]
    pub const fn new(role: Role) -> Self {
        Self { role, is_assignee: false }
    }

    #[must_use]
    pub const fn assignee(mut self, is_assignee: bool) -> Self {
        self.is_assignee = is_assignee;
        self
    }
}

/// One row of a decision table.
#[derive(Debug)]
pub struct Rule<S: 'static, A> {
    pub action: A,
    pub from: &'static [S],
    /// `None` edits the record without moving its status.
    pub to: Option<S>,
    /// Roles that may always take the action.
    pub roles: RoleSet,
    /// Roles that may take the action only on records assigned to them.
    pub assignee_roles: RoleSet,
}

impl<S: PartialEq, A> Rule<S, A> {
    #[must_use]
    pub fn applies_to(&self, status: &S) -> bool {
        self.from.contains(status)
    }

    #[must_use]
    pub fn admits(&self, actor: &Actor) -> bool {
        self.roles.allows(actor.role)
            || (actor.is_assignee && self.assignee_roles.allows(actor.role))
    }
}

/// An approved action: the status it was approved against and where it leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step<S> {
    pub from: S,
    pub to: Option<S>,
}

impl<S: Copy> Step<S> {
    /// Status after the write.
    pub fn target(&self) -> S {
        self.to.unwrap_or(self.from)
    }
}

pub trait Lifecycle: 'static {
    type Status: Copy + Eq + Debug + Display + IntoEnumIterator + Send + Sync + 'static;
    type Action: Copy + Eq + Debug + Display + Send + Sync + 'static;

    /// Name used in guard messages.
    const ENTITY: &'static str;
    const RULES: &'static [Rule<Self::Status, Self::Action>];

    /// Actions available to `actor` in `status`, in table order. Empty when none apply.
    fn permitted_actions(status: Self::Status, actor: &Actor) -> Vec<Self::Action> {
        Self::RULES
            .iter()
            .filter(|rule| rule.applies_to(&status) && rule.admits(actor))
            .map(|rule| rule.action)
            .collect()
    }

    fn authorize(
        status: Self::Status,
        action: Self::Action,
        actor: &Actor,
    ) -> Result<Step<Self::Status>, GuardError> {
        let Some(rule) = Self::RULES.iter().find(|rule| rule.action == action) else {
            return Err(GuardError::UnknownAction {
                entity: Self::ENTITY,
                action: action.to_string(),
                context: None,
            });
        };
        if !rule.applies_to(&status) {
            return Err(GuardError::InvalidStatus {
                entity: Self::ENTITY,
                action: action.to_string(),
                status: status.to_string(),
                context: None,
            });
        }
        if !rule.admits(actor) {
            if rule.assignee_roles.allows(actor.role) {
                return Err(GuardError::NotAssignee {
                    entity: Self::ENTITY,
                    action: action.to_string(),
                    role: actor.role,
                    context: None,
                });
            }
            return Err(GuardError::RoleNotPermitted {
                entity: Self::ENTITY,
                action: action.to_string(),
                role: actor.role,
                context: None,
            });
        }
        Ok(Step { from: status, to: rule.to })
    }
}

/// Every (status, role, assignee) combination, for table checks in tests.
pub fn actor_grid<L: Lifecycle>() -> impl Iterator<Item = (L::Status, Actor)> {
    L::Status::iter().flat_map(|status| {
        Role::iter().flat_map(move |role| {
            [false, true].into_iter().map(move |is_assignee| (status, Actor { role, is_assignee }))
        })
    })
}
