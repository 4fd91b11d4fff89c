use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::errors::ParseError;

/// Check notification as posted by an InfluxDB HTTP notification endpoint
///
/// All six keys are required and must be strings. Unknown keys are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPayload {
    #[serde(rename = "_check_id")]
    pub check_id: String,
    #[serde(rename = "_check_name")]
    pub check_name: String,
    #[serde(rename = "_level")]
    pub level: String,
    #[serde(rename = "_message")]
    pub message: String,
    #[serde(rename = "_time")]
    pub time: String,
    #[serde(rename = "_type")]
    pub notification_type: String,
}

impl TryFrom<NotificationPayload> for Notification {
    type Error = ParseError;

    fn try_from(payload: NotificationPayload) -> Result<Self, Self::Error> {
        let time = parse_time(&payload.time)?;

        Ok(Self {
            check_id: payload.check_id,
            check_name: payload.check_name,
            level: payload.level,
            message: payload.message,
            time,
            notification_type: payload.notification_type,
        })
    }
}

/// Parse RFC 3339 the way Go's `time.RFC3339` layout reads it: four-digit
/// year, uppercase `T` and `Z`, seconds 00 to 59, offset as `±hh:mm`
fn parse_time(value: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let invalid = |source| ParseError::InvalidTime {
        value: value.to_string(),
        source,
    };

    if !has_strict_layout(value.as_bytes()) {
        return Err(invalid(None));
    }
    DateTime::parse_from_rfc3339(value).map_err(|e| invalid(Some(e)))
}

fn has_strict_layout(b: &[u8]) -> bool {
    if b.len() < 20 {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);

    let date_time = digits(0..4)
        && b[4] == b'-'
        && digits(5..7)
        && b[7] == b'-'
        && digits(8..10)
        && b[10] == b'T'
        && digits(11..13)
        && b[13] == b':'
        && digits(14..16)
        && b[16] == b':'
        && digits(17..19);
    // No leap seconds
    if !date_time || b[17] >= b'6' {
        return false;
    }

    let mut rest = &b[19..];
    if let Some(fraction) = rest.strip_prefix(b".") {
        let len = fraction.iter().take_while(|c| c.is_ascii_digit()).count();
        if len == 0 {
            return false;
        }
        rest = &fraction[len..];
    }

    match rest {
        b"Z" => true,
        [sign, h1, h2, b':', m1, m2] => {
            matches!(sign, b'+' | b'-') && [h1, h2, m1, m2].iter().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// One alert event to relay
///
/// Built once per inbound request and never mutated afterwards. `time` keeps
/// the offset it was sent with.
///
/// # Example
///
/// ```rust
/// use influx_telegram_proxy::Notification;
///
/// let body = br#"{
///     "_check_id": "0a1b",
///     "_check_name": "disk",
///     "_level": "crit",
///     "_message": "disk full",
///     "_time": "2024-01-02T03:04:05+02:00",
///     "_type": "threshold"
/// }"#;
///
/// let notification = Notification::from_slice(body).unwrap();
/// assert_eq!(notification.check_name, "disk");
/// assert_eq!(notification.time.offset().local_minus_utc(), 7200);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub check_id: String,
    pub check_name: String,
    /// Severity as sent, e.g. `ok`, `warn`, `crit`; case is not normalized
    pub level: String,
    pub message: String,
    pub time: DateTime<FixedOffset>,
    pub notification_type: String,
}

impl Notification {
    /// Decode and validate a raw request body
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] if the body is not an object with the six
    /// string keys, and [`ParseError::InvalidTime`] if `_time` is not RFC 3339.
    pub fn from_slice(body: &[u8]) -> Result<Self, ParseError> {
        let payload: NotificationPayload = serde_json::from_slice(body).map_err(ParseError::Json)?;
        payload.try_into()
    }
}
