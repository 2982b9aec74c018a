//! RFC 3339 date handling for stored records.
//!
//! Use with `#[serde(with = "crate::utils::time")]` on an `OffsetDateTime`.

use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Deserialize an RFC 3339 string, normalizing it to UTC.
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    OffsetDateTime::parse(&s, &Rfc3339)
        .map(|date| date.to_offset(UtcOffset::UTC))
        .map_err(serde::de::Error::custom)
}

/// Serialize as an RFC 3339 string.
pub fn serialize<S>(date: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = date.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

/// The current time, truncated to whole milliseconds so that it survives a
/// round trip through storage unchanged.
pub fn now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    let millis = now.millisecond();
    now.replace_nanosecond(u32::from(millis) * 1_000_000)
        .unwrap_or(now)
}

/// A short human-readable form, e.g. `Jan 10, 2024 14:30`.
pub fn display(date: &OffsetDateTime) -> String {
    let format = format_description!(
        "[month repr:short] [day padding:none], [year] [hour]:[minute]"
    );
    date.format(&format)
        .unwrap_or_else(|_| date.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use time::macros::datetime;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "super")]
        date: OffsetDateTime,
    }

    #[test]
    fn round_trip() {
        let stamped = Stamped {
            date: datetime!(2024-01-10 14:30:00 UTC),
        };
        let json = serde_json::to_string(&stamped).unwrap();
        assert_eq!(json, r#"{"date":"2024-01-10T14:30:00Z"}"#);
        let back: Stamped = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stamped);
    }

    #[test]
    fn offsets_are_normalized() {
        let back: Stamped = serde_json::from_str(r#"{"date":"2024-01-10T16:30:00+02:00"}"#).unwrap();
        assert_eq!(back.date, datetime!(2024-01-10 14:30:00 UTC));
        assert_eq!(back.date.offset(), UtcOffset::UTC);
    }

    #[test]
    fn invalid_dates_are_rejected() {
        assert!(serde_json::from_str::<Stamped>(r#"{"date":"yesterday"}"#).is_err());
    }

    #[test]
    fn display_format() {
        assert_eq!(display(&datetime!(2024-01-09 16:45:00 UTC)), "Jan 9, 2024 16:45");
    }

    #[test]
    fn now_has_millisecond_precision() {
        assert_eq!(now().nanosecond() % 1_000_000, 0);
    }
}
