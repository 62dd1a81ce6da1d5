#![forbid(unsafe_code)]

//! `xs:dateTime` attributes.

use chrono::{DateTime, SecondsFormat, Utc};
use samling_core::{Error, Result};
use samling_xml::Element;

/// Parse an `xs:dateTime` attribute value, normalised to UTC.
pub fn parse(value: &str, attribute: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Unmarshalling(format!("{attribute}=\"{value}\" is not a dateTime: {e}")))
}

/// Format as `xs:dateTime` in UTC with a `Z` suffix. Fractional seconds
/// are written only when present.
pub fn format(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Write `value` as the unqualified attribute `name`, if present.
pub(crate) fn write(element: &Element, name: &str, value: Option<&DateTime<Utc>>) {
    if let Some(value) = value {
        element.set_attribute_local(name, format(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn offsets_are_normalised() {
        let t = parse("2024-03-01T12:00:00+02:00", "IssueInstant").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        assert_eq!(format(&t), "2024-03-01T10:00:00Z");
    }

    #[test]
    fn fractions_survive() {
        let t = parse("2024-03-01T10:00:00.250Z", "NotBefore").unwrap();
        assert_eq!(format(&t), "2024-03-01T10:00:00.250Z");
    }

    #[test]
    fn garbage_is_an_unmarshalling_error() {
        assert!(matches!(
            parse("yesterday", "NotOnOrAfter"),
            Err(Error::Unmarshalling(_))
        ));
    }
}
