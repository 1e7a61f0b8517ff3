// 🤖 AI Gateway - narrow wrappers around a hosted text model
//
// Four operations, each one request/response; no retries, no caching,
// no streaming. Degradation rules:
//   draft_status_message → templated fallback
//   suggest_next_action  → empty string
//   support_reply        → canned apology
//   parse_manifest       → error (there is no non-AI fallback)

pub mod gemini;
pub mod prompts;

use crate::config::AiConfig;
use crate::entities::{ManifestRecord, ShipmentStatus};
use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use gemini::GeminiClient;

pub const OFFLINE_REPLY: &str =
    "I'm sorry, my AI brain is currently offline. Please try again later.";
pub const FAILED_REPLY: &str = "I'm having trouble connecting to the server. Please try again.";

// ============================================================================
// MODEL SEAM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        ChatTurn {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        ChatTurn {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// What the gateway asks of a model
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system: Option<String>,
    pub turns: Vec<ChatTurn>,
    /// When set, the model must answer with JSON matching this schema
    pub response_schema: Option<serde_json::Value>,
}

impl GenerateRequest {
    pub fn prompt(text: impl Into<String>) -> Self {
        GenerateRequest {
            system: None,
            turns: vec![ChatTurn::user(text)],
            response_schema: None,
        }
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// A hosted (or stubbed) text-generation backend
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Raw response text
    async fn generate(&self, request: GenerateRequest) -> Result<String, GatewayError>;
}

// ============================================================================
// GATEWAY
// ============================================================================

/// Cheap to clone; `None` model means no credential configured
#[derive(Clone, Default)]
pub struct AiGateway {
    model: Option<Arc<dyn TextModel>>,
}

impl AiGateway {
    /// Gemini client when a credential is present, otherwise disabled
    pub fn from_config(config: &AiConfig) -> Self {
        match config.credential() {
            Some(key) => {
                tracing::debug!(model = %config.model, "AI gateway enabled");
                Self::with_model(Arc::new(GeminiClient::new(
                    key,
                    &config.model,
                    &config.endpoint,
                )))
            }
            None => {
                tracing::debug!("AI gateway disabled: no API key");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        AiGateway { model: None }
    }

    pub fn with_model(model: Arc<dyn TextModel>) -> Self {
        AiGateway { model: Some(model) }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// Short customer-facing status sentence, or the template on any failure
    pub async fn draft_status_message(
        &self,
        status: ShipmentStatus,
        location: &str,
        details: &str,
    ) -> String {
        let fallback = || fallback_status_message(status, location, details);

        let Some(model) = &self.model else {
            return fallback();
        };

        let request = GenerateRequest::prompt(prompts::status_message(status.as_str(), location, details));
        match model.generate(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback(),
            Err(err) => {
                tracing::warn!(error = %err, "status message drafting failed, using template");
                fallback()
            }
        }
    }

    /// Extract shipment records from free text
    ///
    /// Errors propagate: no credential, transport failure, or a body that is
    /// not a JSON array of records. Never returns a partial result.
    pub async fn parse_manifest(&self, text: &str) -> Result<Vec<ManifestRecord>, GatewayError> {
        let model = self.model.as_ref().ok_or(GatewayError::NotConfigured)?;

        let request =
            GenerateRequest::prompt(prompts::manifest(text)).with_schema(prompts::manifest_schema());
        let body = model.generate(request).await.map_err(|err| {
            tracing::error!(error = %err, "manifest parse request failed");
            err
        })?;

        let records: Vec<ManifestRecord> = serde_json::from_str(body.trim()).map_err(|err| {
            tracing::error!(error = %err, "manifest parse returned malformed JSON");
            GatewayError::from(err)
        })?;

        tracing::info!(count = records.len(), "manifest parsed");
        Ok(records)
    }

    /// Advisory 3-5 word next step; empty on any failure
    pub async fn suggest_next_action(&self, status: ShipmentStatus) -> String {
        let Some(model) = &self.model else {
            return String::new();
        };

        match model.generate(GenerateRequest::prompt(prompts::next_action(status))).await {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                tracing::debug!(error = %err, "next action suggestion unavailable");
                String::new()
            }
        }
    }

    /// Customer-support chat reply given prior turns
    pub async fn support_reply(&self, history: &[ChatTurn], message: &str) -> String {
        let Some(model) = &self.model else {
            return OFFLINE_REPLY.to_string();
        };

        let mut turns = history.to_vec();
        turns.push(ChatTurn::user(message));
        let request = GenerateRequest {
            system: Some(prompts::SUPPORT_INSTRUCTION.to_string()),
            turns,
            response_schema: None,
        };

        match model.generate(request).await {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "support reply failed");
                FAILED_REPLY.to_string()
            }
        }
    }
}

/// `"{status} at {location}. {details}"`
pub fn fallback_status_message(status: ShipmentStatus, location: &str, details: &str) -> String {
    format!("{} at {}. {}", status, location, details)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays a canned answer and records what it was asked
    struct ScriptedModel {
        answer: Result<String, u16>,
        seen: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedModel {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(ScriptedModel {
                answer: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(ScriptedModel {
                answer: Err(status),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextModel for ScriptedModel {
        async fn generate(&self, request: GenerateRequest) -> Result<String, GatewayError> {
            self.seen.lock().unwrap().push(request);
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(GatewayError::Api {
                    status: *status,
                    message: "boom".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_draft_without_credential_uses_template() {
        let gateway = AiGateway::disabled();
        let msg = gateway
            .draft_status_message(ShipmentStatus::InTransit, "Dallas, TX", "")
            .await;
        assert_eq!(msg, "In Transit at Dallas, TX. ");
    }

    #[tokio::test]
    async fn test_draft_trims_model_output() {
        let model = ScriptedModel::ok("  Your parcel is moving through Dallas.\n");
        let gateway = AiGateway::with_model(model.clone());

        let msg = gateway
            .draft_status_message(ShipmentStatus::InTransit, "Dallas, TX", "on time")
            .await;
        assert_eq!(msg, "Your parcel is moving through Dallas.");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].response_schema.is_none());
        assert!(seen[0].turns[0].text.contains("Location: Dallas, TX"));
    }

    #[tokio::test]
    async fn test_draft_failure_falls_back() {
        crate::logging::init_test();
        let gateway = AiGateway::with_model(ScriptedModel::failing(500));
        let msg = gateway
            .draft_status_message(ShipmentStatus::Exception, "Reno, NV", "Address issue")
            .await;
        assert_eq!(msg, "Exception at Reno, NV. Address issue");
    }

    #[tokio::test]
    async fn test_parse_manifest_without_credential_fails() {
        let gateway = AiGateway::disabled();
        let err = gateway.parse_manifest("2 pallets to Reno").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured));
    }

    #[tokio::test]
    async fn test_parse_manifest_decodes_records_and_sends_schema() {
        let model = ScriptedModel::ok(
            r#"[{"sender":"Acme","recipient":"Bo","origin":"Reno, NV","destination":"Provo, UT","trackingNumber":"TRK-1","status":"Created","estimatedDeliveryDays":4}]"#,
        );
        let gateway = AiGateway::with_model(model.clone());

        let records = gateway.parse_manifest("Acme ships to Bo").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].destination.as_deref(), Some("Provo, UT"));

        let seen = model.seen.lock().unwrap();
        assert!(seen[0].response_schema.is_some());
    }

    #[tokio::test]
    async fn test_parse_manifest_malformed_body_propagates() {
        let gateway = AiGateway::with_model(ScriptedModel::ok("Sure! Here are your shipments:"));
        let err = gateway.parse_manifest("whatever").await.unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));

        // An object instead of an array does not match the shape either
        let gateway = AiGateway::with_model(ScriptedModel::ok(r#"{"sender":"Acme"}"#));
        assert!(gateway.parse_manifest("whatever").await.is_err());
    }

    #[tokio::test]
    async fn test_parse_manifest_transport_error_propagates() {
        let gateway = AiGateway::with_model(ScriptedModel::failing(503));
        let err = gateway.parse_manifest("whatever").await.unwrap_err();
        assert!(matches!(err, GatewayError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_suggestion_degrades_to_empty() {
        assert_eq!(
            AiGateway::disabled()
                .suggest_next_action(ShipmentStatus::Exception)
                .await,
            ""
        );
        assert_eq!(
            AiGateway::with_model(ScriptedModel::failing(429))
                .suggest_next_action(ShipmentStatus::Exception)
                .await,
            ""
        );
        assert_eq!(
            AiGateway::with_model(ScriptedModel::ok(" Contact the recipient. "))
                .suggest_next_action(ShipmentStatus::Exception)
                .await,
            "Contact the recipient."
        );
    }

    #[tokio::test]
    async fn test_support_reply_history_and_fallbacks() {
        assert_eq!(AiGateway::disabled().support_reply(&[], "hi").await, OFFLINE_REPLY);
        assert_eq!(
            AiGateway::with_model(ScriptedModel::failing(500))
                .support_reply(&[], "hi")
                .await,
            FAILED_REPLY
        );

        let model = ScriptedModel::ok("Use the tracking lookup.");
        let gateway = AiGateway::with_model(model.clone());
        let history = vec![ChatTurn::user("Hello"), ChatTurn::model("Hi! How can I help?")];
        let reply = gateway.support_reply(&history, "Where is TRK-1?").await;
        assert_eq!(reply, "Use the tracking lookup.");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].turns.len(), 3);
        assert_eq!(seen[0].turns[2], ChatTurn::user("Where is TRK-1?"));
        assert!(seen[0].system.is_some());
    }

    #[test]
    fn test_from_config_gates_on_credential() {
        let mut config = AiConfig::default();
        assert!(!AiGateway::from_config(&config).is_configured());

        config.api_key = Some("   ".to_string());
        assert!(!AiGateway::from_config(&config).is_configured());

        config.api_key = Some("key".to_string());
        assert!(AiGateway::from_config(&config).is_configured());
    }
}
