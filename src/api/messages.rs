//! Outbound message endpoints
//!
//! Single sends and the batch confirmation pass. A batch pass walks the
//! eligible contacts in store order, sends serially with a configured pause
//! (provider rate limits), and checkpoints every attempt in the store, so an
//! interrupted pass resumes without double-sending. Provider failures mark
//! the contact and continue; store failures abort the pass.

use axum::{
    extract::Extension,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use rollcall_core::{ContactStore, Contact, SendRecord};
use rollcall_whatsapp::WhatsAppClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::ApiResponse;
use crate::server::config::AppConfig;

/// Template selector in a send request
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSpec {
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub params: Vec<String>,
}

/// Single send request: exactly one of `text` / `template`
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub template: Option<TemplateSpec>,
}

/// Batch send request; omitted fields fall back to configuration
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub template: Option<TemplateSpec>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub backup: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub message_id: String,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub total_processed: usize,
    pub sent: usize,
    pub errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    /// Store failure that stopped the pass early, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    pub results: Vec<ContactResult>,
}

#[derive(Debug, Serialize)]
pub struct ContactResult {
    pub phone: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
enum Payload {
    Text(String),
    Template {
        name: String,
        language: String,
        params: Vec<String>,
    },
}

impl Payload {
    fn resolve(
        text: Option<String>,
        template: Option<TemplateSpec>,
        config: &AppConfig,
    ) -> Result<Self, &'static str> {
        match (text, template) {
            (Some(_), Some(_)) => Err("provide either text or template, not both"),
            (Some(text), None) => Ok(Payload::Text(text)),
            (None, Some(spec)) => Ok(Payload::Template {
                name: spec.name,
                language: spec
                    .language
                    .unwrap_or_else(|| config.batch.default_language.clone()),
                params: spec.params,
            }),
            (None, None) => Ok(Payload::Template {
                name: config.batch.default_template.clone(),
                language: config.batch.default_language.clone(),
                params: Vec::new(),
            }),
        }
    }

    /// Fill `{name}` / `{cohort}` placeholders from the contact
    fn personalize(&self, contact: &Contact) -> Payload {
        let fill = |s: &str| {
            s.replace("{name}", contact.display_name.as_deref().unwrap_or(""))
                .replace("{cohort}", contact.cohort_name.as_deref().unwrap_or(""))
        };
        match self {
            Payload::Text(text) => Payload::Text(fill(text)),
            Payload::Template {
                name,
                language,
                params,
            } => Payload::Template {
                name: name.clone(),
                language: language.clone(),
                params: params.iter().map(|p| fill(p)).collect(),
            },
        }
    }

    async fn send(&self, client: &WhatsAppClient, to: &str) -> rollcall_whatsapp::Result<String> {
        match self {
            Payload::Text(text) => client.send_text(to, text).await,
            Payload::Template {
                name,
                language,
                params,
            } => client.send_template(to, name, language, params).await,
        }
    }
}

/// Send one message to one phone
async fn send_message(
    Extension(config): Extension<Arc<AppConfig>>,
    Extension(whatsapp): Extension<Arc<WhatsAppClient>>,
    Json(req): Json<SendRequest>,
) -> (StatusCode, Json<ApiResponse<SendResponse>>) {
    if req.text.is_none() && req.template.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("text or template is required")),
        );
    }
    let payload = match Payload::resolve(req.text, req.template, &config) {
        Ok(p) => p,
        Err(msg) => return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(msg))),
    };

    match payload.send(&whatsapp, &req.to).await {
        Ok(message_id) => (
            StatusCode::OK,
            Json(ApiResponse::success(SendResponse { message_id })),
        ),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}

/// Run a batch confirmation pass over all eligible contacts
async fn send_batch(
    Extension(config): Extension<Arc<AppConfig>>,
    Extension(store): Extension<Arc<dyn ContactStore>>,
    Extension(whatsapp): Extension<Arc<WhatsAppClient>>,
    Json(req): Json<BatchRequest>,
) -> (StatusCode, Json<ApiResponse<BatchResponse>>) {
    let payload = match Payload::resolve(req.text, req.template, &config) {
        Ok(p) => p,
        Err(msg) => return (StatusCode::BAD_REQUEST, Json(ApiResponse::error(msg))),
    };
    let delay = Duration::from_millis(req.delay_ms.unwrap_or(config.batch.delay_ms));

    let backup = if req.backup.unwrap_or(config.batch.backup_before_send) {
        match store.backup().await {
            Ok(path) => path,
            Err(e) => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::error(format!("backup failed: {e}"))),
                );
            }
        }
    } else {
        None
    };

    let roster = match store.load().await {
        Ok(roster) => roster,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("store load failed: {e}"))),
            );
        }
    };
    let eligible: Vec<Contact> = roster.into_iter().filter(Contact::is_eligible).collect();
    info!(eligible = eligible.len(), "starting batch send pass");

    let mut results = Vec::with_capacity(eligible.len());
    let mut sent = 0usize;
    let mut errors = 0usize;
    let mut aborted: Option<String> = None;

    for (i, contact) in eligible.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }

        // Re-check against the store: a reply or a concurrent pass may have
        // landed since the roster snapshot. A store failure is fatal for
        // the pass.
        match store.find(&contact.phone).await {
            Ok(Some(current)) if current.is_eligible() => {}
            Ok(_) => {
                info!(phone = %contact.phone, "skipping, no longer eligible");
                continue;
            }
            Err(e) => {
                error!(phone = %contact.phone, error = %e, "store failed, aborting pass");
                aborted = Some(format!("store failure at {}: {e}", contact.phone));
                break;
            }
        }

        let record = match payload.personalize(contact).send(&whatsapp, &contact.phone).await {
            Ok(message_id) => {
                sent += 1;
                results.push(ContactResult {
                    phone: contact.phone.clone(),
                    status: "sent",
                    message_id: Some(message_id.clone()),
                    error: None,
                });
                SendRecord::Sent {
                    message_id,
                    at: chrono::Utc::now(),
                }
            }
            Err(e) => {
                errors += 1;
                warn!(phone = %contact.phone, error = %e, "batch send failed");
                results.push(ContactResult {
                    phone: contact.phone.clone(),
                    status: "error",
                    message_id: None,
                    error: Some(e.to_string()),
                });
                SendRecord::Failed {
                    error: e.to_string(),
                    at: chrono::Utc::now(),
                }
            }
        };

        // Checkpoint before moving on, so an interrupted pass resumes here.
        // A lost checkpoint means the next pass would send again, so a store
        // failure stops the pass instead of continuing un-checkpointed.
        if let Err(e) = store
            .record_send(&contact.phone, contact.cohort_id.as_deref(), record)
            .await
        {
            error!(phone = %contact.phone, error = %e, "send checkpoint failed, aborting pass");
            aborted = Some(format!("store failure at {}: {e}", contact.phone));
            break;
        }
    }

    info!(sent, errors, aborted = aborted.is_some(), "batch send pass complete");
    (
        StatusCode::OK,
        Json(ApiResponse::success(BatchResponse {
            total_processed: results.len(),
            sent,
            errors,
            backup,
            aborted,
            results,
        })),
    )
}

/// Create message routes
pub fn messages_routes() -> Router {
    Router::new()
        .route("/api/v1/messages/send", post(send_message))
        .route("/api/v1/messages/send-batch", post(send_batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::AppConfig;

    fn config() -> AppConfig {
        toml::from_str(include_str!("../../config/default.toml")).unwrap()
    }

    #[test]
    fn test_payload_rejects_both() {
        let spec = TemplateSpec {
            name: "t".into(),
            language: None,
            params: vec![],
        };
        assert!(Payload::resolve(Some("hola".into()), Some(spec), &config()).is_err());
    }

    #[test]
    fn test_payload_defaults_to_configured_template() {
        match Payload::resolve(None, None, &config()).unwrap() {
            Payload::Template { name, language, .. } => {
                assert_eq!(name, "confirmacion_asistencia");
                assert_eq!(language, "es_CO");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_personalize_fills_placeholders() {
        let contact = Contact::new("573001112233").with_display_name("Ana");
        let payload = Payload::Text("Hola {name}".into()).personalize(&contact);
        match payload {
            Payload::Text(text) => assert_eq!(text, "Hola Ana"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    use axum::body::Body;
    use axum::http::Request;
    use chrono::{DateTime, Utc};
    use rollcall_core::{
        Decision, Error, FlatFileStore, OptIn, ReplyWrite, Result, StoreStats,
    };
    use rollcall_whatsapp::WhatsAppConfig;
    use tower::ServiceExt;

    /// Store whose send checkpoint always fails, as if the disk went away
    /// mid-pass
    struct CheckpointlessStore(FlatFileStore);

    #[async_trait::async_trait]
    impl ContactStore for CheckpointlessStore {
        async fn load(&self) -> Result<Vec<Contact>> {
            self.0.load().await
        }
        async fn save(&self, contacts: &[Contact]) -> Result<()> {
            self.0.save(contacts).await
        }
        async fn find(&self, phone: &str) -> Result<Option<Contact>> {
            self.0.find(phone).await
        }
        async fn upsert(&self, contact: Contact) -> Result<()> {
            self.0.upsert(contact).await
        }
        async fn record_reply(
            &self,
            phone: &str,
            decision: Decision,
            correlation_id: &str,
            now: DateTime<Utc>,
        ) -> Result<ReplyWrite> {
            self.0.record_reply(phone, decision, correlation_id, now).await
        }
        async fn record_send(
            &self,
            _phone: &str,
            _cohort_id: Option<&str>,
            _record: SendRecord,
        ) -> Result<()> {
            Err(Error::Store("write failed".to_string()))
        }
        async fn stats(&self) -> Result<StoreStats> {
            self.0.stats().await
        }
    }

    #[tokio::test]
    async fn test_batch_pass_aborts_when_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let inner = FlatFileStore::new(dir.path().join("contacts.csv"));
        for phone in ["573001112233", "573002223344"] {
            inner
                .upsert(Contact::new(phone).with_opt_in(OptIn::Yes))
                .await
                .unwrap();
        }
        let store: Arc<dyn ContactStore> = Arc::new(CheckpointlessStore(inner));

        // Empty credentials: the send attempt fails fast without network
        let whatsapp =
            Arc::new(WhatsAppClient::new(WhatsAppConfig::new("", "", "")).unwrap());
        let app = messages_routes()
            .layer(Extension(Arc::new(config())))
            .layer(Extension(store))
            .layer(Extension(whatsapp));

        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/messages/send-batch")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"text":"hola","delay_ms":0,"backup":false}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let data = &json["data"];

        // The first checkpoint failure stops the pass; the second contact
        // is never attempted
        assert_eq!(data["total_processed"], 1);
        assert_eq!(data["results"].as_array().unwrap().len(), 1);
        assert!(data["aborted"]
            .as_str()
            .unwrap()
            .contains("573001112233"));
    }
}
