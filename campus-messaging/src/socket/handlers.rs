use std::sync::Arc;

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use socketioxide::extract::{Data, SocketRef};
use uuid::Uuid;

use crate::models::MatchThread;
use crate::schema::match_threads;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct SubscribePayload {
    match_id: Uuid,
}

fn get_user_id(socket: &SocketRef) -> Option<Uuid> {
    socket.extensions.get::<Uuid>()
}

pub async fn on_connect_with_state(socket: SocketRef, state: Arc<AppState>) {
    let user_id = match authenticate_socket(&socket, &state) {
        Ok(id) => id,
        Err(msg) => {
            tracing::warn!(error = %msg, "messaging socket auth failed");
            let _ = socket.emit(
                "error",
                &ErrorPayload {
                    code: "AUTH_FAILED".into(),
                    message: msg,
                },
            );
            socket.disconnect().ok();
            return;
        }
    };

    // Store user_id in socket extensions
    socket.extensions.insert(user_id);

    // Join the user-specific room so match/message notifications reach this
    // client even with no chat view open
    let user_room = format!("user:{user_id}");
    socket.join(user_room).ok();

    tracing::info!(user_id = %user_id, sid = %socket.id, "messaging socket connected");

    // Presence with TTL; the heartbeat refreshes it
    let _ = state.redis.set(&format!("online:{user_id}"), "1", 120).await;

    let _ = socket.emit("connected", &serde_json::json!({ "user_id": user_id }));

    // A chat view subscribes to its match while open and must unsubscribe on
    // exit; the room membership is the subscription handle.
    socket.on("subscribe", {
        let state = state.clone();
        move |socket: SocketRef, Data::<SubscribePayload>(payload)| {
            let state = state.clone();
            async move { on_subscribe(socket, payload, &state).await; }
        }
    });

    socket.on("unsubscribe", {
        move |socket: SocketRef, Data::<SubscribePayload>(payload)| {
            async move {
                let room = format!("match:{}", payload.match_id);
                socket.leave(room).ok();
            }
        }
    });

    // Heartbeat handler - refresh presence TTL
    socket.on("heartbeat", {
        let state = state.clone();
        move |socket: SocketRef| {
            let state = state.clone();
            async move {
                if let Some(user_id) = get_user_id(&socket) {
                    let _ = state.redis.set(&format!("online:{user_id}"), "1", 120).await;
                }
            }
        }
    });

    socket.on_disconnect({
        let state = state.clone();
        move |socket: SocketRef| {
            let state = state.clone();
            async move {
                if let Some(user_id) = get_user_id(&socket) {
                    tracing::info!(user_id = %user_id, sid = %socket.id, "messaging socket disconnected");
                    let _ = state.redis.del(&format!("online:{user_id}")).await;
                }
            }
        }
    });
}

async fn on_subscribe(socket: SocketRef, payload: SubscribePayload, state: &Arc<AppState>) {
    let user_id = match get_user_id(&socket) {
        Some(id) => id,
        None => return,
    };

    let thread = {
        let mut conn = match state.db.get() {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "db pool unavailable during subscribe");
                return;
            }
        };
        match_threads::table
            .filter(match_threads::match_id.eq(payload.match_id))
            .first::<MatchThread>(&mut conn)
            .optional()
            .unwrap_or(None)
    };

    let Some(thread) = thread else {
        let _ = socket.emit(
            "error",
            &ErrorPayload {
                code: "MATCH_NOT_FOUND".into(),
                message: "match not found".into(),
            },
        );
        return;
    };

    if !thread.involves(user_id) {
        let _ = socket.emit(
            "error",
            &ErrorPayload {
                code: "NOT_PARTICIPANT".into(),
                message: "you are not a participant of this match".into(),
            },
        );
        return;
    }

    let room = format!("match:{}", payload.match_id);
    socket.join(room).ok();

    tracing::debug!(user_id = %user_id, match_id = %payload.match_id, "subscribed to match");
}

fn authenticate_socket(socket: &SocketRef, state: &Arc<AppState>) -> Result<Uuid, String> {
    let connect_info = socket.req_parts();

    // Extract token from query string ?token=xxx
    let query = connect_info.uri.query().unwrap_or_default();
    let token = query
        .split('&')
        .find_map(|pair| {
            let mut split = pair.splitn(2, '=');
            let key = split.next()?;
            let value = split.next()?;
            if key == "token" {
                Some(value.to_string())
            } else {
                None
            }
        })
        .ok_or_else(|| "missing token query parameter".to_string())?;

    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = jsonwebtoken::decode::<campus_shared::types::auth::Claims>(
        &token,
        &jsonwebtoken::DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| format!("invalid token: {e}"))?;

    if token_data.claims.is_expired() {
        return Err("token has expired".into());
    }

    Ok(token_data.claims.sub)
}
