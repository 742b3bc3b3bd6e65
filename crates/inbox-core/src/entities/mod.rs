//! Domain entities - core business objects

mod conversation;
mod message;
mod reaction;

pub use conversation::{
    pair_key, Avatar, Conversation, ConversationKind, UnreadCounters, MAX_CONVERSATION_NAME_LEN,
    MAX_GROUP_PARTICIPANTS, MIN_GROUP_PARTICIPANTS,
};
pub use message::{
    DeliveryState, ForeignKind, Message, MessageBody, MessageKind, MAX_TEXT_LEN,
};
pub use reaction::{ReactionMap, MAX_EMOJI_LEN};
