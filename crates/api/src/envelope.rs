use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::ApiError;

/// Standard response wrapper used by every backend endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub data: T,
    #[serde(default)]
    pub message: String,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Decode a response into the payload type, reducing every failure mode to
/// an [`ApiError`] carrying a human-readable message.
pub(crate) async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| {
                String::from_utf8_lossy(&body)
                    .trim()
                    .chars()
                    .take(200)
                    .collect()
            });
        return Err(ApiError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    let envelope: ApiEnvelope<T> = serde_json::from_slice(&body)
        .map_err(|error| ApiError::Unexpected(format!("malformed response envelope: {error}")))?;

    if !envelope.success {
        return Err(ApiError::Rejected {
            status: envelope.status_code,
            message: envelope.message,
        });
    }

    Ok(envelope.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_decodes_payload_and_metadata() {
        let raw = r#"{"statusCode":200,"data":{"value":42},"message":"ok","success":true}"#;

        #[derive(Debug, Deserialize)]
        struct Payload {
            value: i32,
        }

        let envelope: ApiEnvelope<Payload> = serde_json::from_str(raw).expect("decode");
        assert_eq!(envelope.status_code, 200);
        assert_eq!(envelope.data.value, 42);
        assert!(envelope.success);
    }

    #[test]
    fn envelope_tolerates_missing_message() {
        let raw = r#"{"statusCode":200,"data":[],"success":true}"#;
        let envelope: ApiEnvelope<Vec<i32>> = serde_json::from_str(raw).expect("decode");
        assert!(envelope.message.is_empty());
    }
}
