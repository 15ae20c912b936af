use uuid::Uuid;

use campus_shared::clients::rabbitmq::RabbitMQClient;
use campus_shared::types::event::{payloads, routing_keys, Event};

pub async fn publish_profile_updated(rabbitmq: &RabbitMQClient, profile_id: Uuid, user_id: Uuid) {
    let event = Event::new(
        "campus-user",
        routing_keys::USER_PROFILE_UPDATED,
        payloads::ProfileUpdated { profile_id, user_id },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_PROFILE_UPDATED, &event).await {
        tracing::error!(error = %e, "failed to publish profile.updated event");
    }
}

pub async fn publish_like_recorded(rabbitmq: &RabbitMQClient, from_user_id: Uuid, to_user_id: Uuid) {
    let event = Event::new(
        "campus-user",
        routing_keys::USER_LIKE_RECORDED,
        payloads::LikeRecorded { from_user_id, to_user_id },
    )
    .with_user(from_user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_LIKE_RECORDED, &event).await {
        tracing::error!(error = %e, "failed to publish like.recorded event");
    }
}

/// Loss of this event is tolerable: the match row is the source of truth and
/// both parties see it through GET /matches.
pub async fn publish_match_created(
    rabbitmq: &RabbitMQClient,
    match_id: Uuid,
    user_a_id: Uuid,
    user_b_id: Uuid,
) {
    let event = Event::new(
        "campus-user",
        routing_keys::MATCH_CREATED,
        payloads::MatchCreated { match_id, user_a_id, user_b_id },
    );

    if let Err(e) = rabbitmq.publish(routing_keys::MATCH_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish match.created event");
    }
}

pub async fn publish_match_ended(
    rabbitmq: &RabbitMQClient,
    match_id: Uuid,
    user_a_id: Uuid,
    user_b_id: Uuid,
    ended_by: Uuid,
) {
    let event = Event::new(
        "campus-user",
        routing_keys::MATCH_ENDED,
        payloads::MatchEnded { match_id, user_a_id, user_b_id, ended_by },
    )
    .with_user(ended_by);

    if let Err(e) = rabbitmq.publish(routing_keys::MATCH_ENDED, &event).await {
        tracing::error!(error = %e, "failed to publish match.ended event");
    }
}

pub async fn publish_user_blocked(rabbitmq: &RabbitMQClient, blocker_id: Uuid, blocked_id: Uuid) {
    let event = Event::new(
        "campus-user",
        routing_keys::USER_BLOCKED,
        payloads::UserBlocked { blocker_id, blocked_id },
    )
    .with_user(blocker_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_BLOCKED, &event).await {
        tracing::error!(error = %e, "failed to publish user.blocked event");
    }
}

pub async fn publish_user_unblocked(rabbitmq: &RabbitMQClient, blocker_id: Uuid, blocked_id: Uuid) {
    let event = Event::new(
        "campus-user",
        routing_keys::USER_UNBLOCKED,
        payloads::UserUnblocked { blocker_id, blocked_id },
    )
    .with_user(blocker_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_UNBLOCKED, &event).await {
        tracing::error!(error = %e, "failed to publish user.unblocked event");
    }
}
