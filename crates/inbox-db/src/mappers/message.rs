//! Message entity <-> model mapper

use sqlx::types::Json;

use inbox_core::entities::{DeliveryState, Message, MessageBody, MessageKind, ReactionMap};
use inbox_core::error::DomainError;
use inbox_core::value_objects::Snowflake;

use crate::models::{MessageModel, ReactionModel};

/// Rebuild a message from its row and its reaction rows
pub fn message_from_rows(
    model: MessageModel,
    reactions: Vec<ReactionModel>,
) -> Result<Message, DomainError> {
    let body: MessageBody = serde_json::from_value(model.body.0).map_err(|e| {
        DomainError::DatabaseError(format!("undecodable body for message {}: {e}", model.id))
    })?;
    if MessageKind::parse(&model.kind) != Some(body.kind()) {
        return Err(DomainError::DatabaseError(format!(
            "message {} is stored as '{}' but its body is '{}'",
            model.id,
            model.kind,
            body.kind().as_str()
        )));
    }
    let delivery = DeliveryState::parse(&model.delivery_state).ok_or_else(|| {
        DomainError::DatabaseError(format!("unknown delivery state '{}'", model.delivery_state))
    })?;

    Ok(Message {
        id: Snowflake::new(model.id),
        conversation_id: Snowflake::new(model.conversation_id),
        sender_id: model.sender_id.map(Snowflake::new),
        body,
        delivery,
        reactions: ReactionMap::from_entries(
            reactions
                .into_iter()
                .map(|r| (r.emoji, Snowflake::new(r.user_id))),
        ),
        reply_to: model.reply_to.map(Snowflake::new),
        created_at: model.created_at,
    })
}

/// Column values of a message row
pub struct MessageInsert {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: Option<i64>,
    pub kind: &'static str,
    pub body: Json<serde_json::Value>,
    pub delivery_state: &'static str,
    pub reply_to: Option<i64>,
}

impl MessageInsert {
    pub fn new(message: &Message) -> Result<Self, DomainError> {
        Ok(Self {
            id: message.id.into_inner(),
            conversation_id: message.conversation_id.into_inner(),
            sender_id: message.sender_id.map(Snowflake::into_inner),
            kind: message.kind().as_str(),
            body: Json(body_json(&message.body)?),
            delivery_state: message.delivery.as_str(),
            reply_to: message.reply_to.map(Snowflake::into_inner),
        })
    }
}

pub fn body_json(body: &MessageBody) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(body).map_err(|e| DomainError::InternalError(e.to_string()))
}
