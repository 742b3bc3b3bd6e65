//! Conversation entity - a private pair or a small group thread
//!
//! The participant list and the unread counters are kept private so that the
//! two can only change together: every current participant has exactly one
//! counter, and a participant's counter leaves with them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Message;
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Hard cap on group membership
pub const MAX_GROUP_PARTICIPANTS: usize = 10;

/// Minimum group size at creation, creator included
pub const MIN_GROUP_PARTICIPANTS: usize = 2;

/// Maximum length of a group name (characters)
pub const MAX_CONVERSATION_NAME_LEN: usize = 100;

/// Conversation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Private,
    Group,
}

impl ConversationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "private" => Some(Self::Private),
            "group" => Some(Self::Group),
            _ => None,
        }
    }
}

/// Avatar image held by media storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    /// Public locator clients load the image from
    pub url: String,
    /// Opaque handle media storage needs to delete the object
    pub handle: String,
}

/// Per-participant unread counters
///
/// A missing key reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UnreadCounters(BTreeMap<Snowflake, u32>);

impl UnreadCounters {
    pub fn get(&self, user_id: Snowflake) -> u32 {
        self.0.get(&user_id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, user_id: Snowflake) -> bool {
        self.0.contains_key(&user_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Snowflake, u32)> + '_ {
        self.0.iter().map(|(id, count)| (*id, *count))
    }

    fn track(&mut self, user_id: Snowflake, count: u32) {
        self.0.insert(user_id, count);
    }

    fn forget(&mut self, user_id: Snowflake) {
        self.0.remove(&user_id);
    }

    fn reset(&mut self, user_id: Snowflake) {
        if let Some(count) = self.0.get_mut(&user_id) {
            *count = 0;
        }
    }

    fn increment_except(&mut self, sender: Option<Snowflake>) {
        for (user_id, count) in &mut self.0 {
            if Some(*user_id) != sender {
                *count = count.saturating_add(1);
            }
        }
    }
}

/// Conversation entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: Snowflake,
    pub kind: ConversationKind,
    pub name: Option<String>,
    pub avatar: Option<Avatar>,
    participants: Vec<Snowflake>,
    unread: UnreadCounters,
    pub last_message_id: Option<Snowflake>,
    pub created_by: Snowflake,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a private conversation opened by `initiator`
    pub fn new_private(
        id: Snowflake,
        initiator: Snowflake,
        peer: Snowflake,
    ) -> Result<Self, DomainError> {
        if initiator == peer {
            return Err(DomainError::SelfConversation);
        }
        Ok(Self::with_participants(
            id,
            ConversationKind::Private,
            None,
            initiator,
            vec![initiator, peer],
        ))
    }

    /// Create a group from the creator plus the requested members
    ///
    /// Duplicates (including the creator listed again) are dropped before
    /// the size check.
    pub fn new_group(
        id: Snowflake,
        creator: Snowflake,
        name: &str,
        member_ids: &[Snowflake],
    ) -> Result<Self, DomainError> {
        let name = normalize_name(name)?;

        let mut participants = vec![creator];
        for member in member_ids {
            if !participants.contains(member) {
                participants.push(*member);
            }
        }

        if !(MIN_GROUP_PARTICIPANTS..=MAX_GROUP_PARTICIPANTS).contains(&participants.len()) {
            return Err(DomainError::InvalidGroupSize {
                min: MIN_GROUP_PARTICIPANTS,
                max: MAX_GROUP_PARTICIPANTS,
                actual: participants.len(),
            });
        }

        Ok(Self::with_participants(
            id,
            ConversationKind::Group,
            Some(name),
            creator,
            participants,
        ))
    }

    /// Rebuild a conversation from storage
    ///
    /// `roster` is the ordered participant list with each participant's
    /// unread count.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Snowflake,
        kind: ConversationKind,
        name: Option<String>,
        avatar: Option<Avatar>,
        roster: Vec<(Snowflake, u32)>,
        last_message_id: Option<Snowflake>,
        created_by: Snowflake,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let mut participants = Vec::with_capacity(roster.len());
        let mut unread = UnreadCounters::default();
        for (user_id, count) in roster {
            if !participants.contains(&user_id) {
                participants.push(user_id);
                unread.track(user_id, count);
            }
        }

        Self {
            id,
            kind,
            name,
            avatar,
            participants,
            unread,
            last_message_id,
            created_by,
            created_at,
            updated_at,
        }
    }

    fn with_participants(
        id: Snowflake,
        kind: ConversationKind,
        name: Option<String>,
        created_by: Snowflake,
        participants: Vec<Snowflake>,
    ) -> Self {
        let now = id.created_at();
        let roster = participants.into_iter().map(|p| (p, 0)).collect();
        Self::from_parts(id, kind, name, None, roster, None, created_by, now, now)
    }

    /// Ordered participant list
    pub fn participants(&self) -> &[Snowflake] {
        &self.participants
    }

    pub fn unread(&self) -> &UnreadCounters {
        &self.unread
    }

    #[inline]
    pub fn is_group(&self) -> bool {
        self.kind == ConversationKind::Group
    }

    #[inline]
    pub fn is_participant(&self, user_id: Snowflake) -> bool {
        self.participants.contains(&user_id)
    }

    /// Fail with `NotParticipant` unless `user_id` is a member
    pub fn ensure_participant(&self, user_id: Snowflake) -> Result<(), DomainError> {
        if self.is_participant(user_id) {
            Ok(())
        } else {
            Err(DomainError::NotParticipant)
        }
    }

    /// Normalized `(low, high)` pair of a private conversation
    pub fn private_pair(&self) -> Option<(Snowflake, Snowflake)> {
        match (self.kind, self.participants.as_slice()) {
            (ConversationKind::Private, [a, b]) => Some(pair_key(*a, *b)),
            _ => None,
        }
    }

    /// Other participant of a private conversation
    pub fn peer_of(&self, user_id: Snowflake) -> Option<Snowflake> {
        if self.kind != ConversationKind::Private || !self.is_participant(user_id) {
            return None;
        }
        self.participants.iter().copied().find(|p| *p != user_id)
    }

    /// Add members to a group, ignoring ids already present
    ///
    /// Returns the ids that were actually added. Nothing changes when the
    /// result would exceed [`MAX_GROUP_PARTICIPANTS`].
    pub fn add_participants(
        &mut self,
        user_ids: &[Snowflake],
    ) -> Result<Vec<Snowflake>, DomainError> {
        if !self.is_group() {
            return Err(DomainError::NotAGroup);
        }

        let mut added: Vec<Snowflake> = Vec::new();
        for user_id in user_ids {
            if !self.is_participant(*user_id) && !added.contains(user_id) {
                added.push(*user_id);
            }
        }

        if self.participants.len() + added.len() > MAX_GROUP_PARTICIPANTS {
            return Err(DomainError::GroupFull {
                max: MAX_GROUP_PARTICIPANTS,
            });
        }

        for user_id in &added {
            self.participants.push(*user_id);
            self.unread.track(*user_id, 0);
        }
        if !added.is_empty() {
            self.touch();
        }
        Ok(added)
    }

    /// Remove a member from a group
    pub fn remove_participant(&mut self, user_id: Snowflake) -> Result<(), DomainError> {
        if !self.is_group() {
            return Err(DomainError::NotAGroup);
        }
        self.ensure_participant(user_id)?;

        self.participants.retain(|p| *p != user_id);
        self.unread.forget(user_id);
        self.touch();
        Ok(())
    }

    /// Replace the group name
    pub fn rename(&mut self, name: &str) -> Result<(), DomainError> {
        if !self.is_group() {
            return Err(DomainError::NotAGroup);
        }
        self.name = Some(normalize_name(name)?);
        self.touch();
        Ok(())
    }

    /// Replace the avatar, returning the one it displaces
    pub fn replace_avatar(&mut self, avatar: Avatar) -> Option<Avatar> {
        self.touch();
        self.avatar.replace(avatar)
    }

    /// Account for a newly appended message
    ///
    /// Info messages move `last_message_id` but are not counted as unread.
    pub fn record_message(&mut self, message: &Message) {
        self.last_message_id = Some(message.id);
        if !message.is_info() {
            self.unread.increment_except(message.sender_id);
        }
        self.updated_at = self.updated_at.max(message.created_at);
    }

    /// Reset one participant's unread counter
    pub fn mark_read(&mut self, user_id: Snowflake) -> Result<(), DomainError> {
        self.ensure_participant(user_id)?;
        self.unread.reset(user_id);
        Ok(())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// Order-independent key for a pair of users
#[inline]
pub fn pair_key(a: Snowflake, b: Snowflake) -> (Snowflake, Snowflake) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn normalize_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::EmptyName);
    }
    if name.chars().count() > MAX_CONVERSATION_NAME_LEN {
        return Err(DomainError::ContentTooLong {
            max: MAX_CONVERSATION_NAME_LEN,
        });
    }
    Ok(name.to_string())
}
