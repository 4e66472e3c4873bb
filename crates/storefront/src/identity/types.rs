//! Wire types for the identity API.
//!
//! Every success body is wrapped in `{ "data": ... }`. Fields are optional so
//! that a partial response becomes a domain error rather than a decode error.

use serde::{Deserialize, Serialize};

/// `{ "data": T }` envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct SendOtpBody<'a> {
    pub email: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpData {
    #[serde(default)]
    pub is_existing_user: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody<'a> {
    pub email: &'a str,
    pub otp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub is_new_user: Option<bool>,
}

/// Course id as returned by the lookup; some deployments send it quoted.
#[derive(Debug, Deserialize)]
pub struct CourseData {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl CourseData {
    /// The id if it is a positive integer.
    pub fn numeric_id(&self) -> Option<i64> {
        let id = match self.id.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64()?,
            serde_json::Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        (id > 0).then_some(id)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLinkBody<'a> {
    pub token: &'a str,
    pub course_id: i64,
    pub package_type: &'a str,
}

/// The payment service nests its own envelope: `data.data.redirectUrl`.
#[derive(Debug, Deserialize)]
pub struct PaymentLinkData {
    #[serde(default)]
    pub data: Option<PaymentLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLink {
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub package_id: Option<serde_json::Value>,
}

/// Error body: `{ "errors": [...] }` and/or `{ "message": "..." }`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    message: Option<String>,
}

/// Pick the message to show for a failed response.
///
/// A non-empty `errors` list is joined with single spaces; otherwise a
/// non-empty `message` is used; otherwise `fallback`. Bodies that are not
/// JSON fall back as well.
pub fn api_error_message(body: &str, fallback: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let joined = parsed
        .errors
        .unwrap_or_default()
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::String(s) => Some(s.trim().to_string()),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !joined.is_empty() {
        return joined;
    }

    parsed
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_list_is_joined() {
        let body = r#"{"errors":["Invalid email","Try again"],"message":"ignored"}"#;
        assert_eq!(api_error_message(body, "Failed to send OTP"), "Invalid email Try again");
    }

    #[test]
    fn test_message_used_when_errors_empty() {
        let body = r#"{"errors":[],"message":"OTP expired"}"#;
        assert_eq!(api_error_message(body, "OTP verification failed"), "OTP expired");
    }

    #[test]
    fn test_fallback_for_empty_or_garbage() {
        assert_eq!(api_error_message("{}", "Failed to send OTP"), "Failed to send OTP");
        assert_eq!(
            api_error_message("<html>502</html>", "Failed to send OTP"),
            "Failed to send OTP"
        );
        assert_eq!(
            api_error_message(r#"{"message":"  "}"#, "Course not found"),
            "Course not found"
        );
    }

    #[test]
    fn test_error_objects_use_their_message() {
        let body = r#"{"errors":[{"message":"Email is required"}]}"#;
        assert_eq!(api_error_message(body, "x"), "Email is required");
    }

    #[test]
    fn test_course_id_forms() {
        let data: CourseData = serde_json::from_str(r#"{"id":42}"#).unwrap();
        assert_eq!(data.numeric_id(), Some(42));
        let data: CourseData = serde_json::from_str(r#"{"id":"17"}"#).unwrap();
        assert_eq!(data.numeric_id(), Some(17));
        for bad in [r#"{"id":0}"#, r#"{"id":"abc"}"#, r#"{"id":null}"#, "{}"] {
            let data: CourseData = serde_json::from_str(bad).unwrap();
            assert_eq!(data.numeric_id(), None, "{bad}");
        }
    }

    #[test]
    fn test_login_body_omits_missing_details() {
        let body = LoginBody {
            email: "a@b.com",
            otp: "123456",
            name: None,
            phone_number: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"email": "a@b.com", "otp": "123456"})
        );
    }
}
