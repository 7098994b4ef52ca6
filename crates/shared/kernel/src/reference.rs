//! Denormalized references between records.
//!
//! A stored foreign key may be a pointer (`{"$ref": "users/abc"}` or
//! `"users/abc"`), a bare id, an embedded partial object carrying `id`, or
//! nothing at all. [`RefField`] names those cases once; [`resolve`] turns any
//! of them into a display projection without ever failing.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rego_database::{Body, DocumentStore};
use rego_derive::api_model;
use rego_domain::constants::Collection;
use rego_domain::roles::Role;
use rego_domain::status::TestResult;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::{debug, warn};

const POINTER_KEY: &str = "$ref";

/// A foreign key in whichever shape it was stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RefField {
    Pointer {
        collection: String,
        id: String,
    },
    Id(String),
    /// Partial copy of the target, always with a non-empty string `id`.
    Embedded(Body),
    #[default]
    Absent,
}

impl RefField {
    #[must_use]
    pub fn pointer(collection: Collection, id: impl Into<String>) -> Self {
        Self::Pointer { collection: collection.name().to_owned(), id: id.into() }
    }

    /// Classifies a stored value. Malformed shapes are logged and become [`RefField::Absent`].
    #[must_use]
    pub fn parse(value: &Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::String(text) => Self::from_text(text).unwrap_or_else(|| {
                warn!(value = %text, "Malformed reference string");
                Self::Absent
            }),
            Value::Object(map) => Self::from_object(map).unwrap_or_else(|| {
                warn!(keys = ?map.keys().collect::<Vec<_>>(), "Reference object without usable id");
                Self::Absent
            }),
            other => {
                warn!(value = %other, "Malformed reference value");
                Self::Absent
            }
        }
    }

    fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match text.split_once('/') {
            Some((collection, id)) if !collection.is_empty() && !id.is_empty() => {
                Some(Self::Pointer { collection: collection.to_owned(), id: id.to_owned() })
            }
            Some(_) => None,
            None => Some(Self::Id(text.to_owned())),
        }
    }

    fn from_object(map: &Map<String, Value>) -> Option<Self> {
        if let Some(pointer) = map.get(POINTER_KEY) {
            return pointer.as_str().and_then(Self::from_text);
        }
        let id = map.get("id").and_then(Value::as_str).map(str::trim)?;
        (!id.is_empty()).then(|| Self::Embedded(map.clone()))
    }

    /// Target id, for every shape except [`RefField::Absent`].
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Pointer { id, .. } | Self::Id(id) => Some(id),
            Self::Embedded(map) => map.get("id").and_then(Value::as_str),
            Self::Absent => None,
        }
    }

    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Target id, unless the reference is a pointer into another collection.
    ///
    /// Bare ids and embedded copies carry no collection and are taken as is.
    #[must_use]
    pub fn id_in(&self, collection: Collection) -> Option<&str> {
        match self {
            Self::Pointer { collection: target, .. } if target != collection.name() => None,
            other => other.id(),
        }
    }

    /// Whether this reference names the user `user_id`.
    #[must_use]
    pub fn is_user(&self, user_id: &str) -> bool {
        self.id_in(Collection::Users) == Some(user_id)
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Pointer { collection, id } => {
                let mut map = Map::new();
                map.insert(POINTER_KEY.to_owned(), Value::String(format!("{collection}/{id}")));
                Value::Object(map)
            }
            Self::Id(id) => Value::String(id.clone()),
            Self::Embedded(map) => Value::Object(map.clone()),
            Self::Absent => Value::Null,
        }
    }
}

impl Serialize for RefField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RefField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|value| Self::parse(&value))
    }
}

/// A display projection of a referenced document.
pub trait Projection: Sized + Send {
    const COLLECTION: Collection;

    /// What is shown when the target cannot be read.
    fn minimal(id: &str) -> Self;

    /// Builds the projection from a full or partial document body.
    fn project(id: &str, data: &Body) -> Self;
}

/// Resolves one reference. Fetch failures degrade to [`Projection::minimal`].
pub async fn resolve<P: Projection>(store: &dyn DocumentStore, field: &RefField) -> Option<P> {
    let id = match field {
        RefField::Absent => return None,
        RefField::Embedded(data) => {
            let id = field.id()?;
            return Some(P::project(id, data));
        }
        RefField::Pointer { collection, id } => {
            if Collection::from_str(collection).ok() != Some(P::COLLECTION) {
                warn!(
                    expected = P::COLLECTION.name(),
                    found = %collection,
                    %id,
                    "Reference points at an unexpected collection"
                );
                return Some(P::minimal(id));
            }
            id
        }
        RefField::Id(id) => id,
    };

    match store.get(P::COLLECTION, id).await {
        Ok(Some(doc)) => Some(P::project(&doc.id, &doc.data)),
        Ok(None) => {
            warn!(collection = P::COLLECTION.name(), %id, "Referenced document is missing");
            Some(P::minimal(id))
        }
        Err(err) => {
            warn!(collection = P::COLLECTION.name(), %id, error = %err, "Reference fetch failed");
            Some(P::minimal(id))
        }
    }
}

/// Resolves references concurrently. Each item degrades on its own.
pub async fn resolve_many<P: Projection>(
    store: &dyn DocumentStore,
    fields: &[&RefField],
) -> Vec<Option<P>> {
    debug!(collection = P::COLLECTION.name(), count = fields.len(), "Resolving references");
    join_all(fields.iter().map(|field| resolve::<P>(store, field))).await
}

fn text(data: &Body, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_owned)
}

#[api_model]
#[derive(Clone, PartialEq)]
pub struct UserSummary {
    pub id: String,
    pub display_name: Option<String>,
    pub role: Option<Role>,
}

impl Projection for UserSummary {
    const COLLECTION: Collection = Collection::Users;

    fn minimal(id: &str) -> Self {
        Self { id: id.to_owned(), display_name: None, role: None }
    }

    fn project(id: &str, data: &Body) -> Self {
        Self {
            id: id.to_owned(),
            display_name: text(data, "displayName"),
            role: data.get("role").and_then(Value::as_str).and_then(|r| Role::from_str(r).ok()),
        }
    }
}

#[api_model]
#[derive(Clone, PartialEq)]
pub struct RegistrationSummary {
    pub id: String,
    pub registration_number: Option<String>,
    pub craft_name: Option<String>,
    pub hull_identification_number: Option<String>,
}

impl Projection for RegistrationSummary {
    const COLLECTION: Collection = Collection::Registrations;

    fn minimal(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            registration_number: None,
            craft_name: None,
            hull_identification_number: None,
        }
    }

    /// Full documents nest craft details; embedded copies flatten them.
    fn project(id: &str, data: &Body) -> Self {
        let craft = data.get("craft").and_then(Value::as_object);
        let craft_field = |nested: &str, flat: &str| {
            craft.and_then(|c| text(c, nested)).or_else(|| text(data, flat))
        };
        Self {
            id: id.to_owned(),
            registration_number: text(data, "registrationNumber"),
            craft_name: craft_field("name", "craftName"),
            hull_identification_number: craft_field(
                "hullIdentificationNumber",
                "hullIdentificationNumber",
            ),
        }
    }
}

#[api_model]
#[derive(Clone, PartialEq)]
pub struct TestSummary {
    pub id: String,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub result: Option<TestResult>,
}

impl Projection for TestSummary {
    const COLLECTION: Collection = Collection::CompetencyTests;

    fn minimal(id: &str) -> Self {
        Self { id: id.to_owned(), scheduled_date: None, result: None }
    }

    fn project(id: &str, data: &Body) -> Self {
        Self {
            id: id.to_owned(),
            scheduled_date: data
                .get("scheduledDate")
                .and_then(|v| crate::time::normalize(v).instant()),
            result: data
                .get("result")
                .and_then(Value::as_str)
                .and_then(|r| TestResult::from_str(r).ok()),
        }
    }
}
