//! Standard JSON response envelope.
//!
//! ```json
//! {"success": true, "errors": [], "messages": [], "result": ..., "result_info": {...}}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ApiError;
use crate::pagination::ResultInfo;

/// One entry of the envelope's `errors` or `messages` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
    #[serde(default)]
    pub messages: Vec<ErrorDetail>,
    pub result: Option<T>,
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
}

#[derive(Deserialize)]
struct ErrorsOnly {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

/// Structured errors from a body, or empty if it is not an envelope.
pub fn error_details(body: &[u8]) -> Vec<ErrorDetail> {
    serde_json::from_slice::<ErrorsOnly>(body)
        .map(|e| e.errors)
        .unwrap_or_default()
}

/// Decode the envelope around a `T` result.
pub fn decode<T: DeserializeOwned>(operation: &str, body: &[u8]) -> Result<Envelope<T>, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::decode(operation, e, body))
}

/// Decode just the `result` field; a missing or null result is a decode error.
pub fn decode_result<T: DeserializeOwned>(operation: &str, body: &[u8]) -> Result<T, ApiError> {
    decode::<T>(operation, body)?
        .result
        .ok_or_else(|| ApiError::decode(operation, "response has no result", body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Zone {
        id: String,
    }

    #[test]
    fn decodes_result_and_info() {
        let body = br#"{"success":true,"errors":[],"messages":[],"result":[{"id":"a"},{"id":"b"}],"result_info":{"page":1,"per_page":2,"total_pages":3,"count":2,"total_count":5}}"#;
        let env: Envelope<Vec<Zone>> = decode("list zones", body).unwrap();
        assert!(env.success);
        assert_eq!(env.result.unwrap().len(), 2);
        let info = env.result_info.unwrap();
        assert_eq!(info.total_pages, Some(3));
        assert_eq!(info.total_count, Some(5));
    }

    #[test]
    fn missing_result_is_decode_error() {
        let err = decode_result::<Zone>("get zone", br#"{"success":true,"result":null}"#)
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Decode);
        assert!(err.to_string().contains("get zone"));
    }

    #[test]
    fn malformed_body_is_decode_error_with_body() {
        let err = decode_result::<Zone>("get zone", b"<html>oops</html>").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Decode);
        assert_eq!(err.body(), Some(&b"<html>oops</html>"[..]));
    }

    #[test]
    fn error_details_tolerates_non_envelopes() {
        assert!(error_details(b"not json").is_empty());
        assert!(error_details(br#"{"result":1}"#).is_empty());
        let d = error_details(br#"{"errors":[{"code":7003,"message":"Could not route"}]}"#);
        assert_eq!(d[0].to_string(), "Could not route (code 7003)");
    }
}
