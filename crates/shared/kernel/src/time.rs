//! Timestamp normalization.
//!
//! Stored records carry times in whatever shape the writer produced: store
//! timestamps (`{seconds, nanoseconds}` or the admin-SDK `{_seconds, _nanoseconds}`),
//! RFC 3339 strings, naive date-times, plain dates and epoch milliseconds.
//! [`normalize`] folds all of them into one [`DateTime<Utc>`] or reports
//! [`Moment::Unrepresentable`]. It never fails.

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::warn;

/// Milliseconds beyond which no calendar date is representable.
const MAX_EPOCH_MILLIS: f64 = 8.0e15;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Outcome of normalizing one stored time value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moment {
    At(DateTime<Utc>),
    Unrepresentable,
}

impl Moment {
    #[must_use]
    pub const fn instant(self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(at) => Some(at),
            Self::Unrepresentable => None,
        }
    }
}

impl From<DateTime<Utc>> for Moment {
    fn from(at: DateTime<Utc>) -> Self {
        Self::At(at)
    }
}

impl From<StoreTimestamp> for Moment {
    fn from(ts: StoreTimestamp) -> Self {
        ts.to_datetime().map_or(Self::Unrepresentable, Self::At)
    }
}

/// Store-native timestamp shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTimestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl StoreTimestamp {
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }
}

impl From<DateTime<Utc>> for StoreTimestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self { seconds: at.timestamp(), nanoseconds: at.timestamp_subsec_nanos() }
    }
}

/// Normalizes any stored time value. Non-null garbage is logged at `warn`.
pub fn normalize(value: &Value) -> Moment {
    let moment = match value {
        Value::String(s) => from_text(s),
        Value::Number(n) => from_epoch_millis(n),
        Value::Object(map) => from_parts(map),
        Value::Null | Value::Bool(_) | Value::Array(_) => Moment::Unrepresentable,
    };
    if moment == Moment::Unrepresentable && !value.is_null() {
        warn!(value = %preview(value), "Unrepresentable timestamp");
    }
    moment
}

fn from_text(text: &str) -> Moment {
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Moment::At(at.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Moment::At(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(Moment::Unrepresentable, |naive| Moment::At(naive.and_utc()))
}

#[allow(clippy::cast_possible_truncation)]
fn from_epoch_millis(number: &Number) -> Moment {
    if let Some(millis) = number.as_i64() {
        return DateTime::from_timestamp_millis(millis).map_or(Moment::Unrepresentable, Moment::At);
    }
    let Some(millis) = number.as_f64().filter(|f| f.is_finite() && f.abs() < MAX_EPOCH_MILLIS)
    else {
        return Moment::Unrepresentable;
    };
    let whole = millis.floor();
    let sub_millis_nanos = ((millis - whole) * 1_000_000.0).round() as i64;
    DateTime::from_timestamp_millis(whole as i64)
        .and_then(|at| at.checked_add_signed(TimeDelta::nanoseconds(sub_millis_nanos)))
        .map_or(Moment::Unrepresentable, Moment::At)
}

fn from_parts(map: &Map<String, Value>) -> Moment {
    let field = |plain: &str, sdk: &str| map.get(plain).or_else(|| map.get(sdk));
    let Some(seconds) = field("seconds", "_seconds").and_then(Value::as_i64) else {
        return Moment::Unrepresentable;
    };
    let nanoseconds = match field("nanoseconds", "_nanoseconds") {
        None => Some(0),
        Some(value) => value.as_u64().and_then(|n| u32::try_from(n).ok()),
    };
    nanoseconds
        .filter(|n| *n < 1_000_000_000)
        .and_then(|n| DateTime::from_timestamp(seconds, n))
        .map_or(Moment::Unrepresentable, Moment::At)
}

fn preview(value: &Value) -> String {
    let mut text = value.to_string();
    if text.len() > 64 {
        let cut = (0..=64).rev().find(|i| text.is_char_boundary(*i)).unwrap_or_default();
        text.truncate(cut);
        text.push('…');
    }
    text
}

/// Current instant. All writers stamp through here.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Wire form of a written timestamp.
#[must_use]
pub fn to_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// `at` plus whole calendar months, clamped to the end of shorter months.
#[must_use]
pub fn add_months(at: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    at.checked_add_months(Months::new(months))
}

/// Serde adapter for stored `Option<DateTime<Utc>>` fields.
///
/// Reads go through [`normalize`]: unrepresentable values become `None`.
/// Writes emit RFC 3339 with millisecond precision.
///
/// ```rust
/// use chrono::{DateTime, Utc};
///
/// #[derive(serde::Deserialize)]
/// struct Stored {
///     #[serde(default, with = "rego_kernel::time::lenient")]
///     approved_at: Option<DateTime<Utc>>,
/// }
///
/// let stored: Stored = serde_json::from_str(r#"{"approved_at": {"_seconds": 0}}"#).unwrap();
/// assert_eq!(stored.approved_at, DateTime::from_timestamp(0, 0));
/// ```
pub mod lenient {
    use super::{normalize, to_value};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(to_value).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(normalize(&value).instant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn accepts_every_documented_shape() {
        let expected = at("2024-03-01T10:15:30.250Z");
        let shapes = [
            json!({ "seconds": 1_709_288_130, "nanoseconds": 250_000_000 }),
            json!({ "_seconds": 1_709_288_130, "_nanoseconds": 250_000_000 }),
            json!("2024-03-01T10:15:30.250Z"),
            json!("2024-03-01T12:15:30.250+02:00"),
            json!("2024-03-01T10:15:30.250"),
            json!(1_709_288_130_250_i64),
            json!(1_709_288_130_250.0_f64),
        ];
        for shape in shapes {
            assert_eq!(normalize(&shape), Moment::At(expected), "shape {shape}");
        }
    }

    #[test]
    fn plain_date_is_midnight_utc() {
        assert_eq!(normalize(&json!("2024-03-01")), Moment::At(at("2024-03-01T00:00:00Z")));
    }

    #[test]
    fn garbage_is_unrepresentable() {
        for value in [
            json!("not-a-date"),
            json!(null),
            json!(true),
            json!([1, 2]),
            json!({ "nanoseconds": 5 }),
            json!({ "seconds": 1, "nanoseconds": 2_000_000_000_u64 }),
            json!(1.0e300),
            json!(i64::MAX),
        ] {
            assert_eq!(normalize(&value), Moment::Unrepresentable, "value {value}");
        }
    }

    #[test]
    fn native_values_convert_directly() {
        let now = at("2025-07-04T08:00:00.123456789Z");
        assert_eq!(Moment::from(now), Moment::At(now));
        assert_eq!(Moment::from(StoreTimestamp::from(now)), Moment::At(now));
    }

    #[test]
    fn month_arithmetic_clamps() {
        assert_eq!(add_months(at("2024-01-31T00:00:00Z"), 1), Some(at("2024-02-29T00:00:00Z")));
        assert_eq!(add_months(at("2024-06-15T09:30:00Z"), 12), Some(at("2025-06-15T09:30:00Z")));
    }

    #[test]
    fn written_values_read_back() {
        let now = at("2025-07-04T08:00:00.123Z");
        assert_eq!(normalize(&to_value(now)), Moment::At(now));
    }

    proptest! {
        #[test]
        fn store_shapes_agree(seconds in 0_i64..4_102_444_800, millis in 0_u32..1000) {
            let nanos = millis * 1_000_000;
            let epoch_millis = seconds * 1000 + i64::from(millis);
            let expected = DateTime::from_timestamp(seconds, nanos).unwrap();

            let shapes = [
                json!({ "seconds": seconds, "nanoseconds": nanos }),
                json!({ "_seconds": seconds, "_nanoseconds": nanos }),
                to_value(expected),
                json!(epoch_millis),
            ];
            for shape in shapes {
                prop_assert_eq!(normalize(&shape), Moment::At(expected));
            }
        }

        #[test]
        fn arbitrary_text_never_panics(text in ".{0,40}") {
            let _ = normalize(&Value::String(text));
        }
    }
}
