//! Conversation entity <-> model mapper

use inbox_core::entities::{Avatar, Conversation, ConversationKind};
use inbox_core::error::DomainError;
use inbox_core::value_objects::Snowflake;

use crate::models::{ConversationModel, ParticipantModel};

/// Rebuild a conversation from its row and its participant rows
///
/// Participant rows may arrive in any order; `position` decides the roster
/// order.
pub fn conversation_from_rows(
    model: ConversationModel,
    mut participants: Vec<ParticipantModel>,
) -> Result<Conversation, DomainError> {
    let kind = ConversationKind::parse(&model.kind).ok_or_else(|| {
        DomainError::DatabaseError(format!("unknown conversation kind '{}'", model.kind))
    })?;

    participants.sort_by_key(|p| p.position);
    let roster = participants
        .into_iter()
        .map(|p| (Snowflake::new(p.user_id), p.unread_count.max(0) as u32))
        .collect();

    let avatar = match (model.avatar_url, model.avatar_handle) {
        (Some(url), Some(handle)) => Some(Avatar { url, handle }),
        _ => None,
    };

    Ok(Conversation::from_parts(
        Snowflake::new(model.id),
        kind,
        model.name,
        avatar,
        roster,
        model.last_message_id.map(Snowflake::new),
        Snowflake::new(model.created_by),
        model.created_at,
        model.updated_at,
    ))
}

/// Column values of a conversation row
pub struct ConversationInsert<'a> {
    pub id: i64,
    pub kind: &'static str,
    pub name: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
    pub avatar_handle: Option<&'a str>,
    pub pair_low: Option<i64>,
    pub pair_high: Option<i64>,
    pub last_message_id: Option<i64>,
    pub created_by: i64,
}

impl<'a> ConversationInsert<'a> {
    pub fn new(conversation: &'a Conversation) -> Self {
        let pair = conversation.private_pair();
        Self {
            id: conversation.id.into_inner(),
            kind: conversation.kind.as_str(),
            name: conversation.name.as_deref(),
            avatar_url: conversation.avatar.as_ref().map(|a| a.url.as_str()),
            avatar_handle: conversation.avatar.as_ref().map(|a| a.handle.as_str()),
            pair_low: pair.map(|(low, _)| low.into_inner()),
            pair_high: pair.map(|(_, high)| high.into_inner()),
            last_message_id: conversation.last_message_id.map(Snowflake::into_inner),
            created_by: conversation.created_by.into_inner(),
        }
    }
}

/// Participant rows as parallel arrays, for `UNNEST` upserts
pub struct RosterColumns {
    pub user_ids: Vec<i64>,
    pub positions: Vec<i32>,
    pub unread_counts: Vec<i32>,
}

impl RosterColumns {
    pub fn new(conversation: &Conversation) -> Self {
        let participants = conversation.participants();
        let unread = conversation.unread();
        Self {
            user_ids: participants.iter().map(|p| p.into_inner()).collect(),
            positions: (0..participants.len()).map(|i| i as i32).collect(),
            unread_counts: participants
                .iter()
                .map(|p| unread.get(*p).min(i32::MAX as u32) as i32)
                .collect(),
        }
    }
}
