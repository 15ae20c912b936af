use std::sync::Arc;

use diesel::prelude::*;
use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;

use campus_shared::types::event::{payloads, routing_keys, Event};

use crate::models::{NewBlock, NewMatchThread};
use crate::schema::{blocks, match_threads};
use crate::AppState;

/// Listen for match lifecycle and block events from campus-user and keep the
/// local replicas current. New matches are also pushed to both participants'
/// user rooms as an advisory notification.
pub async fn listen_match_events(state: Arc<AppState>) -> anyhow::Result<()> {
    let mut consumer = state
        .rabbitmq
        .subscribe(
            "campus-messaging.match-and-block-events",
            &[
                routing_keys::MATCH_CREATED,
                routing_keys::MATCH_ENDED,
                routing_keys::USER_BLOCKED,
                routing_keys::USER_UNBLOCKED,
            ],
        )
        .await?;

    tracing::info!("listening for match and block events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                if let Err(e) = handle_delivery(&state, delivery.routing_key.as_str(), &delivery.data) {
                    tracing::error!(
                        error = %e,
                        routing_key = %delivery.routing_key,
                        "failed to handle event"
                    );
                }
                let _ = delivery.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "consumer error");
            }
        }
    }

    Ok(())
}

fn handle_delivery(state: &Arc<AppState>, routing_key: &str, data: &[u8]) -> anyhow::Result<()> {
    match routing_key {
        routing_keys::MATCH_CREATED => {
            let event: Event<payloads::MatchCreated> = serde_json::from_slice(data)?;
            on_match_created(state, &event.data)?;
        }
        routing_keys::MATCH_ENDED => {
            let event: Event<payloads::MatchEnded> = serde_json::from_slice(data)?;
            on_match_ended(state, &event.data)?;
        }
        routing_keys::USER_BLOCKED => {
            let event: Event<payloads::UserBlocked> = serde_json::from_slice(data)?;
            let mut conn = state.db.get()?;
            diesel::insert_into(blocks::table)
                .values(&NewBlock {
                    blocker_id: event.data.blocker_id,
                    blocked_id: event.data.blocked_id,
                })
                .on_conflict_do_nothing()
                .execute(&mut conn)?;
        }
        routing_keys::USER_UNBLOCKED => {
            let event: Event<payloads::UserUnblocked> = serde_json::from_slice(data)?;
            let mut conn = state.db.get()?;
            diesel::delete(
                blocks::table
                    .filter(blocks::blocker_id.eq(event.data.blocker_id))
                    .filter(blocks::blocked_id.eq(event.data.blocked_id)),
            )
            .execute(&mut conn)?;
        }
        other => {
            tracing::warn!(routing_key = %other, "unexpected routing key");
        }
    }
    Ok(())
}

fn on_match_created(state: &Arc<AppState>, data: &payloads::MatchCreated) -> anyhow::Result<()> {
    let mut conn = state.db.get()?;

    // Redelivered events are no-ops thanks to the unique match_id
    let inserted = diesel::insert_into(match_threads::table)
        .values(&NewMatchThread {
            match_id: data.match_id,
            user_a_id: data.user_a_id,
            user_b_id: data.user_b_id,
            is_open: true,
        })
        .on_conflict_do_nothing()
        .execute(&mut conn)?;

    if inserted > 0 {
        tracing::info!(
            match_id = %data.match_id,
            user_a = %data.user_a_id,
            user_b = %data.user_b_id,
            "match thread created"
        );

        // Advisory notification; the match list endpoint is the source of truth
        let payload = serde_json::json!({ "match_id": data.match_id });
        for user_id in [data.user_a_id, data.user_b_id] {
            let _ = state.io.to(format!("user:{user_id}")).emit("new_match", &payload);
        }
    }

    Ok(())
}

fn on_match_ended(state: &Arc<AppState>, data: &payloads::MatchEnded) -> anyhow::Result<()> {
    let mut conn = state.db.get()?;

    // Messages are append-only and kept; the thread just stops accepting
    diesel::update(match_threads::table.filter(match_threads::match_id.eq(data.match_id)))
        .set(match_threads::is_open.eq(false))
        .execute(&mut conn)?;

    tracing::info!(match_id = %data.match_id, ended_by = %data.ended_by, "match thread closed");

    Ok(())
}
