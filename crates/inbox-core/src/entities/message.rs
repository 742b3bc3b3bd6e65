//! Message entity - one typed entry in a conversation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reaction::ReactionMap;
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Maximum text length for text and info messages (characters)
pub const MAX_TEXT_LEN: usize = 4000;

/// Declared message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    Text,
    Image,
    ProductReference,
    PostReference,
    ProfileReference,
    Info,
    #[serde(rename = "deleted-tombstone")]
    Tombstone,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::ProductReference => "product-reference",
            Self::PostReference => "post-reference",
            Self::ProfileReference => "profile-reference",
            Self::Info => "info",
            Self::Tombstone => "deleted-tombstone",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "text" => Self::Text,
            "image" => Self::Image,
            "product-reference" => Self::ProductReference,
            "post-reference" => Self::PostReference,
            "profile-reference" => Self::ProfileReference,
            "info" => Self::Info,
            "deleted-tombstone" => Self::Tombstone,
            _ => return None,
        })
    }

    /// Types a client may send; the rest are produced by the server
    pub fn is_client_sendable(&self) -> bool {
        !matches!(self, Self::Info | Self::Tombstone)
    }
}

/// Kind of entity owned by another service that a message can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForeignKind {
    Product,
    Post,
    Profile,
}

impl ForeignKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Post => "post",
            Self::Profile => "profile",
        }
    }
}

/// Type-specific payload
///
/// The variant is the declared type, so payload fields can never disagree
/// with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessageBody {
    Text { text: String },
    Image { url: String },
    ProductReference { product_id: Snowflake },
    PostReference { post_id: Snowflake },
    ProfileReference { profile_id: Snowflake },
    Info { text: String },
    #[serde(rename = "deleted-tombstone")]
    Tombstone,
}

impl MessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text { .. } => MessageKind::Text,
            Self::Image { .. } => MessageKind::Image,
            Self::ProductReference { .. } => MessageKind::ProductReference,
            Self::PostReference { .. } => MessageKind::PostReference,
            Self::ProfileReference { .. } => MessageKind::ProfileReference,
            Self::Info { .. } => MessageKind::Info,
            Self::Tombstone => MessageKind::Tombstone,
        }
    }

    /// Foreign entity this payload points at, if any
    pub fn reference(&self) -> Option<(ForeignKind, Snowflake)> {
        match self {
            Self::ProductReference { product_id } => Some((ForeignKind::Product, *product_id)),
            Self::PostReference { post_id } => Some((ForeignKind::Post, *post_id)),
            Self::ProfileReference { profile_id } => Some((ForeignKind::Profile, *profile_id)),
            _ => None,
        }
    }
}

/// Delivery progress of a message
///
/// Only `Sent -> Read` happens today. `Delivered` is reserved for a
/// transport acknowledgement that does not exist yet and is never produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Sent,
    Delivered,
    Read,
}

impl DeliveryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Snowflake,
    pub conversation_id: Snowflake,
    /// `None` for server-generated info messages
    pub sender_id: Option<Snowflake>,
    pub body: MessageBody,
    pub delivery: DeliveryState,
    pub reactions: ReactionMap,
    pub reply_to: Option<Snowflake>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message; the timestamp is taken from the id
    pub fn new(
        id: Snowflake,
        conversation_id: Snowflake,
        sender_id: Option<Snowflake>,
        body: MessageBody,
    ) -> Self {
        Self {
            id,
            conversation_id,
            sender_id,
            body,
            delivery: DeliveryState::Sent,
            reactions: ReactionMap::default(),
            reply_to: None,
            created_at: id.created_at(),
        }
    }

    /// Server-generated announcement with no sender
    pub fn info(id: Snowflake, conversation_id: Snowflake, text: impl Into<String>) -> Self {
        Self::new(id, conversation_id, None, MessageBody::Info { text: text.into() })
    }

    pub fn with_reply_to(mut self, reply_to: Option<Snowflake>) -> Self {
        self.reply_to = reply_to;
        self
    }

    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    #[inline]
    pub fn is_info(&self) -> bool {
        matches!(self.body, MessageBody::Info { .. })
    }

    #[inline]
    pub fn is_tombstone(&self) -> bool {
        matches!(self.body, MessageBody::Tombstone)
    }

    /// Fail with `NotMessageSender` unless `user_id` sent this message
    pub fn ensure_sender(&self, user_id: Snowflake) -> Result<(), DomainError> {
        if self.sender_id == Some(user_id) {
            Ok(())
        } else {
            Err(DomainError::NotMessageSender)
        }
    }

    /// Toggle a reaction; tombstones reject every change
    pub fn toggle_reaction(&mut self, emoji: &str, user_id: Snowflake) -> Result<bool, DomainError> {
        if self.is_tombstone() {
            return Err(DomainError::MessageAlreadyDeleted);
        }
        Ok(self.reactions.toggle(emoji, user_id))
    }

    /// Clear content and reactions; terminal
    pub fn tombstone(&mut self) -> Result<(), DomainError> {
        if self.is_tombstone() {
            return Err(DomainError::MessageAlreadyDeleted);
        }
        self.body = MessageBody::Tombstone;
        self.reactions.clear();
        Ok(())
    }

    /// Advance to `Read` on behalf of `reader`
    ///
    /// A reader never marks their own messages, and state never regresses.
    /// Returns whether the state changed.
    pub fn mark_read_by(&mut self, reader: Snowflake) -> bool {
        if self.sender_id == Some(reader) || self.delivery == DeliveryState::Read {
            return false;
        }
        self.delivery = DeliveryState::Read;
        true
    }

    /// Total ordering key within a conversation
    #[inline]
    pub fn order_key(&self) -> (DateTime<Utc>, Snowflake) {
        (self.created_at, self.id)
    }
}
