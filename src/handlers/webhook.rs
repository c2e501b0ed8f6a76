use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Form;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::db::queries;
use crate::errors::AppError;
use crate::services::conversation;
use crate::state::AppState;

const FALLBACK_REPLY: &str =
    "Lo sentimos, estamos teniendo problemas técnicos. Por favor, inténtalo de nuevo en unos minutos.";

/// Twilio signs the full URL followed by every POST parameter, sorted by
/// name, with each name immediately followed by its value.
pub fn twilio_signature(auth_token: &str, url: &str, params: &[(String, String)]) -> Option<String> {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut data = url.to_string();
    for (key, value) in sorted {
        data.push_str(key);
        data.push_str(value);
    }

    let mut mac = Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()).ok()?;
    mac.update(data.as_bytes());
    Some(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn verify_request(
    auth_token: &str,
    headers: &HeaderMap,
    params: &[(String, String)],
) -> Result<(), AppError> {
    let signature = headers
        .get("x-twilio-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if signature.is_empty() {
        tracing::warn!("missing X-Twilio-Signature header");
        return Err(AppError::Forbidden("missing signature"));
    }

    // Reconstruct the public webhook URL when running behind a proxy
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get("host"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let url = format!("{proto}://{host}/webhook/sms");

    match twilio_signature(auth_token, &url, params) {
        Some(expected) if expected == signature => Ok(()),
        _ => {
            tracing::warn!(url = %url, "invalid Twilio signature");
            Err(AppError::Forbidden("invalid signature"))
        }
    }
}

pub async fn sms_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(params): Form<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    // Signature checks are skipped when no auth token is configured (dev mode)
    if !state.config.twilio_auth_token.is_empty() {
        verify_request(&state.config.twilio_auth_token, &headers, &params)?;
    }

    let from = param(&params, "From").unwrap_or("").trim().to_string();
    let body = param(&params, "Body").unwrap_or("").trim().to_string();
    if from.is_empty() {
        return Err(AppError::BadRequest("missing From".to_string()));
    }

    tracing::info!(from = %from, body = %body, "incoming SMS");

    let replies = match conversation::process_message(&state, &from, &body).await {
        Ok(replies) => replies,
        Err(e) => {
            tracing::error!(error = %e, from = %from, "conversation processing failed");
            vec![FALLBACK_REPLY.to_string()]
        }
    };

    for reply in &replies {
        if let Err(e) = state.messaging.send_message(&from, reply).await {
            tracing::error!(error = %e, to = %from, "failed to send reply");
            break;
        }
    }

    if let Ok(db) = state.db.lock() {
        match queries::expire_old_sessions(&db) {
            Ok(0) => {}
            Ok(count) => tracing::debug!(count, "expired idle sessions"),
            Err(e) => tracing::warn!(error = %e, "failed to expire sessions"),
        }
    }

    Ok(twiml_response())
}

fn twiml_response() -> Response {
    (
        [(header::CONTENT_TYPE, "application/xml")],
        "<Response></Response>",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<(String, String)> {
        vec![
            ("To".to_string(), "+15551234567".to_string()),
            ("From".to_string(), "+5493871234567".to_string()),
            ("Body".to_string(), "hola".to_string()),
        ]
    }

    #[test]
    fn test_signature_ignores_param_order() {
        let url = "https://turnos.example.com/webhook/sms";
        let mut reversed = params();
        reversed.reverse();
        assert_eq!(
            twilio_signature("secret", url, &params()),
            twilio_signature("secret", url, &reversed)
        );
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let url = "https://turnos.example.com/webhook/sms";
        let good = twilio_signature("secret", url, &params()).unwrap();

        let mut tampered = params();
        tampered[2].1 = "menu".to_string();
        assert_ne!(twilio_signature("secret", url, &tampered).unwrap(), good);
        assert_ne!(twilio_signature("other", url, &params()).unwrap(), good);
    }

    #[test]
    fn test_verify_request() {
        let sig = twilio_signature("secret", "https://bot.example.com/webhook/sms", &params()).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("host", "bot.example.com".parse().unwrap());
        assert!(verify_request("secret", &headers, &params()).is_err());

        headers.insert("x-twilio-signature", sig.parse().unwrap());
        assert!(verify_request("secret", &headers, &params()).is_ok());
        assert!(verify_request("wrong", &headers, &params()).is_err());
    }
}
