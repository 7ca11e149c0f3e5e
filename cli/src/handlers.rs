//! Application handlers registered on the dispatcher.

use zoom_ws::Envelope;

/// `payload.object.id` of a `user.created` event, when present.
fn created_user_id(envelope: &Envelope) -> Option<&str> {
    envelope
        .content
        .get("payload")?
        .get("object")?
        .get("id")?
        .as_str()
}

/// Runs for every `user.created` event. Custom processing for new users goes here.
pub fn user_created(envelope: &Envelope) {
    tracing::info!(
        user_id = created_user_id(envelope).unwrap_or("unknown"),
        "a new user was created"
    );
}
