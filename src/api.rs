//! REST ingress for the expense ledger agent
//!
//! Maps an HTTP body onto an inbound chat message and runs the handler.
//! The chat transport itself stays external; this adapter is what a bridge
//! process posts to.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::handler::MessageHandler;
use crate::models::{ImageAttachment, InboundMessage};
use crate::session;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageRequest {
    pub message_id: Option<String>,
    pub chat_id: Option<String>,
    pub chat_name: Option<String>,
    pub sender_id: Option<String>,
    /// UTC Unix epoch seconds; defaults to now
    pub timestamp_secs: Option<i64>,
    #[serde(default)]
    pub text: String,
    pub image_base64: Option<String>,
    pub image_mime_type: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub handler: Arc<MessageHandler>,
}

/// =============================
/// Helpers — Stable Ids
/// =============================

fn stable_uuid_from_string(input: &str) -> uuid::Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    uuid::Uuid::from_bytes(bytes)
}

fn id_or_stable_uuid(value: Option<&str>, fallback_seed: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => stable_uuid_from_string(fallback_seed).to_string(),
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Message Endpoint
/// =============================

async fn handle_message(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let sender_id = id_or_stable_uuid(req.sender_id.as_deref(), "anonymous-sender");

    // Self-authored events echo back from the transport; never ledger them.
    if session::is_self(&sender_id) {
        info!(sender_id = %sender_id, "Ignoring self-authored message");
        return (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "status": "ignored",
                "reason": "self-authored message"
            }))),
        );
    }

    let image = match (&req.image_base64, &req.image_mime_type) {
        (Some(data), Some(mime)) => Some(ImageAttachment {
            data_base64: data.clone(),
            mime_type: mime.clone(),
        }),
        (Some(_), None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    "image_base64 requires image_mime_type".to_string(),
                )),
            );
        }
        _ => None,
    };

    let message = InboundMessage {
        message_id: id_or_stable_uuid(
            req.message_id.as_deref(),
            &format!("{}:{}", sender_id, req.text),
        ),
        chat_id: id_or_stable_uuid(req.chat_id.as_deref(), "default-chat"),
        chat_name: req.chat_name.clone().unwrap_or_else(|| "direct".to_string()),
        sender_id,
        timestamp_secs: req
            .timestamp_secs
            .unwrap_or_else(|| chrono::Utc::now().timestamp()),
        body: req.text.clone(),
        image,
    };

    info!(
        message_id = %message.message_id,
        has_image = message.image.is_some(),
        "Received inbound message"
    );

    match state.handler.handle(&message).await {
        Ok(record) => {
            let confirmation = crate::handler::confirmation_text(&record);
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "status": "recorded",
                    "record": record,
                    "reply": confirmation,
                }))),
            )
        }
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error(format!("Message handling failed: {}", e))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(handler: Arc<MessageHandler>) -> Router {
    let state = ApiState { handler };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/message", post(handle_message))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    handler: Arc<MessageHandler>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(handler);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_uuid_is_deterministic() {
        let a = stable_uuid_from_string("user@chat");
        let b = stable_uuid_from_string("user@chat");
        let c = stable_uuid_from_string("other@chat");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.get_version_num(), 4);
    }

    #[test]
    fn test_id_passthrough_when_present() {
        assert_eq!(id_or_stable_uuid(Some(" msg-1 "), "seed"), "msg-1");
        let generated = id_or_stable_uuid(None, "seed");
        assert_eq!(generated, stable_uuid_from_string("seed").to_string());
    }
}
