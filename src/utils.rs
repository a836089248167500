use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serializer;

/// Wire renderings for timestamps.
///
/// Period boundaries are whole seconds (`2025-08-01T23:59:59Z`) while stored
/// rows keep millisecond precision (`2025-08-01T12:30:00.000Z`).
pub mod iso8601 {
    use super::*;

    pub fn format_secs(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn format_millis(ts: &DateTime<Utc>) -> String {
        ts.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize_secs<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_secs(ts))
    }

    pub fn serialize_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_millis(ts))
    }
}

/// Turn a sensor code into a display name: `temperature_kitchen` becomes
/// `Temperature Kitchen`. Underscores, hyphens, whitespace and lower-to-upper
/// camel-case transitions all start a new word.
pub fn titleize(code: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in code.chars() {
        if ch == '_' || ch == '-' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Round half away from zero to `decimals` places. Values too large to scale
/// already have no fractional digits and are returned unchanged.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Parse an optional query-string integer, treating anything unparseable as absent.
pub fn parse_lenient_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn titleizes_snake_kebab_and_camel_codes() {
        assert_eq!(titleize("temperature_kitchen"), "Temperature Kitchen");
        assert_eq!(titleize("humidity-living-room"), "Humidity Living Room");
        assert_eq!(titleize("outdoorTemp"), "Outdoor Temp");
        assert_eq!(titleize("CO2_level"), "Co2 Level");
        assert_eq!(titleize("__pressure__"), "Pressure");
        assert_eq!(titleize(""), "");
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round_to(20.0, 2), 20.0);
        assert_eq!(round_to(21.456, 2), 21.46);
        assert_eq!(round_to(-1.005_01, 2), -1.01);
        assert_eq!(round_to(1.0 / 3.0, 2), 0.33);
        assert_eq!(round_to(1e308, 2), 1e308);
        assert_eq!(round_to(-f64::MAX, 2), -f64::MAX);
    }

    #[test]
    fn lenient_int_ignores_garbage() {
        assert_eq!(parse_lenient_int(Some("12")), Some(12));
        assert_eq!(parse_lenient_int(Some(" 3 ")), Some(3));
        assert_eq!(parse_lenient_int(Some("-1")), Some(-1));
        assert_eq!(parse_lenient_int(Some("abc")), None);
        assert_eq!(parse_lenient_int(Some("")), None);
        assert_eq!(parse_lenient_int(None), None);
    }

    #[test]
    fn timestamp_renderings() {
        let ts = Utc.with_ymd_and_hms(2025, 8, 15, 12, 30, 0).unwrap();
        assert_eq!(iso8601::format_secs(&ts), "2025-08-15T12:30:00Z");
        assert_eq!(iso8601::format_millis(&ts), "2025-08-15T12:30:00.000Z");
    }
}
