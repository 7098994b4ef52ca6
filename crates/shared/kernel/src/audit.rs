//! Audit fields carried by every lifecycle record.

use crate::context::RequestContext;
use crate::reference::RefField;
use crate::time;
use chrono::{DateTime, Utc};
use rego_database::Body;
use rego_derive::api_model;
use serde::Deserialize;

/// Audit block as stored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAudit {
    #[serde(default, with = "time::lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by_ref: RefField,
    #[serde(default, with = "time::lenient")]
    pub last_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated_by_ref: RefField,
}

/// Audit block as returned to callers.
#[api_model]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuditTrail {
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub last_updated_by: Option<String>,
}

impl From<&StoredAudit> for AuditTrail {
    fn from(stored: &StoredAudit) -> Self {
        Self {
            created_at: stored.created_at,
            created_by: stored.created_by_ref.id().map(str::to_owned),
            last_updated_at: stored.last_updated_at,
            last_updated_by: stored.last_updated_by_ref.id().map(str::to_owned),
        }
    }
}

/// Writes the created and last-updated pairs.
pub fn stamp_created(body: &mut Body, ctx: &RequestContext, at: DateTime<Utc>) {
    body.insert("createdAt".to_owned(), time::to_value(at));
    body.insert("createdByRef".to_owned(), ctx.user_ref().to_value());
    stamp_updated(body, ctx, at);
}

pub fn stamp_updated(body: &mut Body, ctx: &RequestContext, at: DateTime<Utc>) {
    body.insert("lastUpdatedAt".to_owned(), time::to_value(at));
    body.insert("lastUpdatedByRef".to_owned(), ctx.user_ref().to_value());
}

/// Writes an action-specific pair such as `approvedAt` / `approvedByRef`.
pub fn stamp_action(body: &mut Body, ctx: &RequestContext, at: DateTime<Utc>, prefix: &str) {
    body.insert(format!("{prefix}At"), time::to_value(at));
    body.insert(format!("{prefix}ByRef"), ctx.user_ref().to_value());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Principal;
    use rego_domain::roles::Role;
    use serde_json::{Value, json};

    #[test]
    fn stamps_read_back_through_the_stored_shape() {
        let ctx = RequestContext::new(Principal {
            user_id: "u9".into(),
            display_name: "Sam".into(),
            role: Role::Supervisor,
        });
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut body = Body::new();
        stamp_created(&mut body, &ctx, at);
        stamp_action(&mut body, &ctx, at, "approved");

        assert_eq!(body["createdByRef"], json!({ "$ref": "users/u9" }));
        assert!(body.contains_key("approvedAt"));

        let stored: StoredAudit = serde_json::from_value(Value::Object(body)).unwrap();
        let trail = AuditTrail::from(&stored);
        assert_eq!(trail.created_at, Some(at));
        assert_eq!(trail.last_updated_by.as_deref(), Some("u9"));
    }
}
