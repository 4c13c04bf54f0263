//! Audit fields carried by every entity.

use crate::context::SyncContext;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Who created and last changed a record, and when.
///
/// Informational only; never consulted for identity or change detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    /// User that created the record.
    pub entered_by: String,
    /// User that last changed the record.
    pub updated_by: String,
    /// Creation time.
    pub entered_date: DateTime<Utc>,
    /// Last change time.
    pub updated_date: DateTime<Utc>,
}

impl AuditInfo {
    /// Audit fields for a record created now by the context's user.
    pub fn created(context: &SyncContext, now: DateTime<Utc>) -> Self {
        Self {
            entered_by: context.user.clone(),
            updated_by: context.user.clone(),
            entered_date: now,
            updated_date: now,
        }
    }

    /// Records a change by the context's user.
    pub fn touch(&mut self, context: &SyncContext, now: DateTime<Utc>) {
        self.updated_by.clone_from(&context.user);
        self.updated_date = now;
    }

    /// Builds audit fields from the remote authority's string form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decode`] naming the offending field if a date is
    /// not valid RFC 3339.
    pub fn from_wire(
        entered_by: impl Into<String>,
        updated_by: impl Into<String>,
        entered_date: &str,
        updated_date: &str,
    ) -> CoreResult<Self> {
        Ok(Self {
            entered_by: entered_by.into(),
            updated_by: updated_by.into(),
            entered_date: parse_date("entered_date", entered_date)?,
            updated_date: parse_date("updated_date", updated_date)?,
        })
    }

    /// Formats a date the way the remote authority expects it.
    #[must_use]
    pub fn format_date(date: &DateTime<Utc>) -> String {
        date.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Parses one RFC 3339 timestamp.
///
/// # Errors
///
/// Returns [`CoreError::Decode`] naming `field` on failure.
pub fn parse_date(field: &str, value: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| CoreError::decode(field, format!("{value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn context() -> SyncContext {
        SyncContext::new("acct-1", "dana", "device-a")
    }

    #[test]
    fn created_stamps_both_sides() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let audit = AuditInfo::created(&context(), now);
        assert_eq!(audit.entered_by, "dana");
        assert_eq!(audit.updated_by, "dana");
        assert_eq!(audit.entered_date, now);
        assert_eq!(audit.updated_date, now);
    }

    #[test]
    fn touch_only_moves_updated_fields() {
        let then = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let mut audit = AuditInfo::created(&context(), then);

        let other = SyncContext::new("acct-1", "sam", "device-b");
        audit.touch(&other, later);

        assert_eq!(audit.entered_by, "dana");
        assert_eq!(audit.entered_date, then);
        assert_eq!(audit.updated_by, "sam");
        assert_eq!(audit.updated_date, later);
    }

    #[test]
    fn wire_dates_parse() {
        let audit = AuditInfo::from_wire(
            "dana",
            "sam",
            "2026-03-01T09:30:00.000Z",
            "2026-03-02T12:00:00+02:00",
        )
        .unwrap();
        assert_eq!(
            audit.updated_date,
            Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
        );
        assert_eq!(
            AuditInfo::format_date(&audit.entered_date),
            "2026-03-01T09:30:00.000Z"
        );
    }

    #[test]
    fn bad_wire_date_is_typed_error() {
        let result = AuditInfo::from_wire("dana", "dana", "yesterday", "2026-03-02T10:00:00Z");
        match result {
            Err(CoreError::Decode { field, .. }) => assert_eq!(field, "entered_date"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
