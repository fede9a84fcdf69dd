use chrono::{DateTime, SecondsFormat, Utc};

/// Returns the current UTC time as an RFC 3339 / ISO 8601 string with
/// second precision and a `Z` suffix.
///
/// This is the format stored in `state.json` and in every `run.log` record.
///
/// # Examples
/// ```text
/// 2026-02-11T09:14:03Z
/// ```
pub fn current_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Formats an explicit instant the same way `current_timestamp` does.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_utc_with_z_suffix() {
        let at = Utc.with_ymd_and_hms(2026, 2, 11, 9, 14, 3).unwrap();
        assert_eq!(format_timestamp(at), "2026-02-11T09:14:03Z");
    }

    #[test]
    fn current_timestamp_parses_back() {
        let now = current_timestamp();
        assert!(DateTime::parse_from_rfc3339(&now).is_ok());
        assert!(now.ends_with('Z'));
    }
}
