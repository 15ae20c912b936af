use std::sync::Arc;

use diesel::prelude::*;
use futures_lite::StreamExt;
use lapin::options::BasicAckOptions;
use uuid::Uuid;

use campus_shared::clients::db::DbPool;
use campus_shared::types::event::{payloads, routing_keys, Event};

use crate::models::NewProfile;
use crate::schema::profiles;
use crate::AppState;

/// Listen for auth.user.registered events and create the empty profile row.
/// The profile is completed later by its owner through PATCH /me.
pub async fn listen_user_registered(state: Arc<AppState>) -> anyhow::Result<()> {
    let mut consumer = state
        .rabbitmq
        .subscribe(
            "campus-user.auth.user.registered",
            &[routing_keys::AUTH_USER_REGISTERED],
        )
        .await?;

    tracing::info!("listening for auth.user.registered events");

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                match serde_json::from_slice::<Event<payloads::UserRegistered>>(&delivery.data) {
                    Ok(event) => {
                        if let Err(e) = create_profile_if_missing(&state.db, event.data.user_id) {
                            tracing::error!(
                                error = %e,
                                user_id = %event.data.user_id,
                                "failed to create profile for new user"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to deserialize user.registered event");
                    }
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

fn create_profile_if_missing(db: &DbPool, user_id: Uuid) -> anyhow::Result<()> {
    let mut conn = db.get()?;

    // One profile per user id; a redelivered event is a no-op.
    let inserted = diesel::insert_into(profiles::table)
        .values(&NewProfile { user_id })
        .on_conflict_do_nothing()
        .execute(&mut conn)?;

    if inserted > 0 {
        tracing::info!(user_id = %user_id, "profile created for new user");
    }

    Ok(())
}
