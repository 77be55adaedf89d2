//! Webhook intake: authenticate, decode, fan out, aggregate.

use {
    axum::{
        Json,
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
    },
    futures::future::join_all,
    hourbell_line::{SIGNATURE_HEADER, WebhookEnvelope, WebhookEvent, verify_signature},
    secrecy::ExposeSecret,
    serde::{Deserialize, Serialize},
    tracing::{debug, info, warn},
};

use crate::{error::IngressError, state::AppState};

/// Aggregate outcome of one webhook batch.
///
/// Every event is always attempted. The response is 200 only when none
/// failed; otherwise it is 500 with the same body, so a partial success is
/// never reported as a full one.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn status(&self) -> StatusCode {
        if self.failed == 0 {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<BatchSummary>), IngressError> {
    let Some(secret) = state.channel_secret.as_ref() else {
        warn!("webhook request refused: channel credentials are not configured");
        return Err(IngressError::NotConfigured);
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_signature(&body, signature, secret.expose_secret()) {
        warn!(
            has_header = headers.contains_key(SIGNATURE_HEADER),
            body_len = body.len(),
            "webhook signature verification failed"
        );
        return Err(IngressError::Unauthorized);
    }

    let envelope = WebhookEnvelope::parse(&body).map_err(|e| {
        warn!(error = %e, "malformed webhook payload");
        IngressError::from(e)
    })?;

    let total = envelope.events.len();
    let results = join_all(
        envelope
            .events
            .into_iter()
            .enumerate()
            .map(|(index, raw)| process_event(&state, index, raw)),
    )
    .await;

    let summary = BatchSummary {
        processed: total,
        failed: results.iter().filter(|ok| !**ok).count(),
    };
    if summary.failed > 0 {
        warn!(
            events = summary.processed,
            failed = summary.failed,
            "webhook batch had failures"
        );
    } else {
        debug!(events = summary.processed, "webhook batch processed");
    }
    Ok((summary.status(), Json(summary)))
}

/// Run one event through the interpreter and send its reply.
/// Returns `false` if anything on the way failed.
async fn process_event(state: &AppState, index: usize, raw: serde_json::Value) -> bool {
    let event = match WebhookEvent::decode(raw) {
        Ok(event) => event,
        Err(e) => {
            warn!(index, error = %e, "ignoring undecodable webhook event");
            return true;
        },
    };

    let reply = match state.interpreter.handle(&event).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return true,
        Err(e) => {
            warn!(
                index,
                kind = event.kind(),
                subscriber_id = event.user_id().unwrap_or_default(),
                error = %e,
                "failed to apply webhook event"
            );
            return false;
        },
    };

    let Some(reply_token) = event.reply_token() else {
        debug!(index, kind = event.kind(), "no reply token, reply dropped");
        return true;
    };

    let sent = tokio::time::timeout(
        state.reply_timeout,
        state.gateway.reply(reply_token, &reply),
    )
    .await;
    match sent {
        Ok(Ok(())) => {
            info!(index, kind = event.kind(), "replied to webhook event");
            true
        },
        Ok(Err(e)) => {
            warn!(index, error = %e, "reply failed");
            false
        },
        Err(_) => {
            warn!(index, timeout = ?state.reply_timeout, "reply timed out");
            false
        },
    }
}
