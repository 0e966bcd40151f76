//! OpenAI client configuration and error classification.

use crate::error::SvarError;
use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Which backend a failed call belonged to. Determines the error variant
/// the failure is mapped to, since embedding and completion failures are
/// handled differently upstream.
#[derive(Debug, Clone, Copy)]
pub enum Service {
    Embedding,
    Completion,
}

/// Create an OpenAI client with a custom timeout.
///
/// The timeout bounds every API call so an unresponsive backend cannot
/// hang an interactive session.
pub fn create_client_with_timeout(timeout: Duration) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client");

    Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}

/// Map an OpenAI API error into the Svar error taxonomy.
///
/// Quota/rate-limit responses and request timeouts get their own variants
/// so callers can decide between degrading, retrying, and failing.
pub fn classify_error(err: OpenAIError, service: Service) -> SvarError {
    match err {
        OpenAIError::ApiError(api) => {
            let quota = api
                .code
                .as_deref()
                .map(|c| c == "insufficient_quota" || c == "rate_limit_exceeded")
                .unwrap_or(false)
                || api
                    .r#type
                    .as_deref()
                    .map(|t| t == "insufficient_quota" || t == "requests")
                    .unwrap_or(false)
                || api.message.to_lowercase().contains("quota")
                || api.message.to_lowercase().contains("rate limit");

            match (quota, service) {
                (true, Service::Embedding) => SvarError::EmbeddingQuota(api.message),
                (true, Service::Completion) => SvarError::CompletionQuota(api.message),
                (false, Service::Embedding) => SvarError::Embedding(api.message),
                (false, Service::Completion) => SvarError::Completion(api.message),
            }
        }
        OpenAIError::Reqwest(e) if e.is_timeout() => SvarError::Timeout(e.to_string()),
        OpenAIError::Reqwest(e) => match service {
            Service::Embedding => SvarError::Embedding(format!("network error: {}", e)),
            Service::Completion => SvarError::Completion(format!("network error: {}", e)),
        },
        other => match service {
            Service::Embedding => SvarError::Embedding(other.to_string()),
            Service::Completion => SvarError::Completion(other.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;

    #[test]
    fn test_quota_classification() {
        let err = OpenAIError::ApiError(ApiError {
            message: "You exceeded your current quota".to_string(),
            r#type: Some("insufficient_quota".to_string()),
            param: None,
            code: Some("insufficient_quota".to_string()),
        });

        let mapped = classify_error(err, Service::Completion);
        assert!(matches!(mapped, SvarError::CompletionQuota(_)));
        assert!(mapped.is_degradable());
    }

    #[test]
    fn test_non_quota_api_error() {
        let err = OpenAIError::ApiError(ApiError {
            message: "The model does not exist".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: None,
            code: None,
        });

        let mapped = classify_error(err, Service::Embedding);
        assert!(matches!(mapped, SvarError::Embedding(_)));
        assert!(!mapped.is_degradable());
    }
}
