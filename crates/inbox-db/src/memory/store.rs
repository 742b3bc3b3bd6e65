//! Process-local conversation and message store
//!
//! Each conversation lives in its own record behind a `parking_lot::Mutex`.
//! A change locks only that record, so work on different conversations runs
//! in parallel while changes to one conversation are serialized. Records are
//! cloned out of the `DashMap` before locking; a shard guard is never held
//! while waiting on a record.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use inbox_core::entities::{pair_key, Conversation, Message};
use inbox_core::error::DomainError;
use inbox_core::traits::{
    ChangeOutcome, ConversationChange, ConversationQuery, ConversationRepository, MessageQuery,
    MessageRepository, ReadReceipt, RepoResult,
};
use inbox_core::value_objects::Snowflake;

#[derive(Debug)]
struct Record {
    /// `None` once the conversation has been deleted
    conversation: Option<Conversation>,
    messages: HashMap<Snowflake, Message>,
}

impl Record {
    fn new(conversation: Conversation) -> Self {
        Self {
            conversation: Some(conversation),
            messages: HashMap::new(),
        }
    }
}

type SharedRecord = Arc<Mutex<Record>>;

/// In-memory implementation of both repository traits
#[derive(Debug, Default)]
pub struct MemoryStore {
    conversations: DashMap<Snowflake, SharedRecord>,
    /// Normalized user pair -> private conversation id
    private_pairs: DashMap<(Snowflake, Snowflake), Snowflake>,
    /// Message id -> conversation id
    message_index: DashMap<Snowflake, Snowflake>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live conversations
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Number of stored messages across all conversations
    pub fn message_count(&self) -> usize {
        self.message_index.len()
    }

    fn record(&self, id: Snowflake) -> Option<SharedRecord> {
        self.conversations.get(&id).map(|r| Arc::clone(r.value()))
    }

    fn message_record(&self, message_id: Snowflake) -> Option<SharedRecord> {
        let conversation_id = *self.message_index.get(&message_id)?;
        self.record(conversation_id)
    }

    fn snapshot(&self, id: Snowflake) -> Option<Conversation> {
        self.record(id)?.lock().conversation.clone()
    }

    fn store_message(&self, record: &mut Record, message: &Message) {
        record.messages.insert(message.id, message.clone());
        self.message_index.insert(message.id, message.conversation_id);
    }
}

#[async_trait]
impl ConversationRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Conversation>> {
        Ok(self.snapshot(id))
    }

    async fn find_private(&self, a: Snowflake, b: Snowflake) -> RepoResult<Option<Conversation>> {
        let id = match self.private_pairs.get(&pair_key(a, b)) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.snapshot(id))
    }

    async fn find_by_participant(
        &self,
        user_id: Snowflake,
        query: ConversationQuery,
    ) -> RepoResult<Vec<Conversation>> {
        let limit = query.limit.max(1) as usize;

        let cursor = match query.before {
            Some(before) => match self.snapshot(before) {
                Some(c) => Some((c.updated_at, c.id)),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let records: Vec<SharedRecord> = self
            .conversations
            .iter()
            .map(|r| Arc::clone(r.value()))
            .collect();

        let mut found: Vec<Conversation> = records
            .iter()
            .filter_map(|record| {
                record
                    .lock()
                    .conversation
                    .as_ref()
                    .filter(|c| c.is_participant(user_id))
                    .cloned()
            })
            .filter(|c| cursor.map_or(true, |key| (c.updated_at, c.id) < key))
            .collect();

        found.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)));
        found.truncate(limit);
        Ok(found)
    }

    #[instrument(skip(self, conversation), fields(conversation_id = %conversation.id))]
    async fn create_private(&self, conversation: &Conversation) -> RepoResult<(Conversation, bool)> {
        let Some(pair) = conversation.private_pair() else {
            return Err(DomainError::ValidationError(
                "not a private conversation".to_string(),
            ));
        };

        let existing_id = match self.private_pairs.entry(pair) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                self.conversations.insert(
                    conversation.id,
                    Arc::new(Mutex::new(Record::new(conversation.clone()))),
                );
                entry.insert(conversation.id);
                return Ok((conversation.clone(), true));
            }
        };

        debug!("Private conversation already exists, returning it");
        let existing = self.snapshot(existing_id).ok_or_else(|| {
            DomainError::InternalError("private conversation vanished".to_string())
        })?;
        Ok((existing, false))
    }

    #[instrument(skip(self, conversation, messages), fields(conversation_id = %conversation.id))]
    async fn create_group(
        &self,
        conversation: &Conversation,
        messages: &[Message],
    ) -> RepoResult<Conversation> {
        let mut stored = conversation.clone();
        for message in messages {
            stored.record_message(message);
        }

        match self.conversations.entry(stored.id) {
            Entry::Occupied(_) => Err(DomainError::InternalError(format!(
                "duplicate conversation id {}",
                stored.id
            ))),
            Entry::Vacant(entry) => {
                let mut record = Record::new(stored.clone());
                for message in messages {
                    self.store_message(&mut record, message);
                }
                entry.insert(Arc::new(Mutex::new(record)));
                Ok(stored)
            }
        }
    }

    #[instrument(skip(self, change))]
    async fn update(&self, id: Snowflake, change: ConversationChange) -> RepoResult<ChangeOutcome> {
        let record = self
            .record(id)
            .ok_or(DomainError::ConversationNotFound(id))?;
        let mut guard = record.lock();

        // Work on a copy so a failed change leaves nothing behind
        let mut conversation = guard
            .conversation
            .clone()
            .ok_or(DomainError::ConversationNotFound(id))?;
        let messages = change(&mut conversation)?;

        if conversation.is_group() && conversation.is_empty() {
            let purged_messages = guard.messages.len() as u64;
            for message_id in guard.messages.keys() {
                self.message_index.remove(message_id);
            }
            guard.messages.clear();
            guard.conversation = None;
            drop(guard);
            self.conversations.remove(&id);

            debug!(purged_messages, "Empty group deleted");
            return Ok(ChangeOutcome::Deleted {
                conversation,
                purged_messages,
            });
        }

        for message in &messages {
            conversation.record_message(message);
            self.store_message(&mut guard, message);
        }
        guard.conversation = Some(conversation.clone());

        Ok(ChangeOutcome::Updated {
            conversation,
            messages,
        })
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, id: Snowflake, user_id: Snowflake) -> RepoResult<ReadReceipt> {
        let record = self
            .record(id)
            .ok_or(DomainError::ConversationNotFound(id))?;
        let mut guard = record.lock();

        let mut conversation = guard
            .conversation
            .clone()
            .ok_or(DomainError::ConversationNotFound(id))?;
        conversation.mark_read(user_id)?;

        let mut messages_read = 0;
        for message in guard.messages.values_mut() {
            if message.mark_read_by(user_id) {
                messages_read += 1;
            }
        }
        guard.conversation = Some(conversation.clone());

        Ok(ReadReceipt {
            conversation,
            messages_read,
            read_at: Utc::now(),
        })
    }

    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>> {
        Ok(self
            .message_record(id)
            .and_then(|record| record.lock().messages.get(&id).cloned()))
    }

    async fn find_by_conversation(
        &self,
        conversation_id: Snowflake,
        query: MessageQuery,
    ) -> RepoResult<Vec<Message>> {
        let limit = query.limit.max(1) as usize;
        let Some(record) = self.record(conversation_id) else {
            return Ok(Vec::new());
        };
        let guard = record.lock();

        let cursor = |id: Option<Snowflake>| match id {
            Some(id) => guard.messages.get(&id).map(|m| Some(m.order_key())).ok_or(()),
            None => Ok(None),
        };
        let (Ok(before), Ok(after)) = (cursor(query.before), cursor(query.after)) else {
            return Ok(Vec::new());
        };

        let mut page: Vec<&Message> = guard
            .messages
            .values()
            .filter(|m| before.map_or(true, |key| m.order_key() < key))
            .filter(|m| after.map_or(true, |key| m.order_key() > key))
            .collect();

        // Forward scrolling keeps the messages nearest the cursor
        let oldest_first = before.is_none() && after.is_some();
        if oldest_first {
            page.sort_by_key(|m| m.order_key());
            page.truncate(limit);
            page.reverse();
        } else {
            page.sort_by_key(|m| std::cmp::Reverse(m.order_key()));
            page.truncate(limit);
        }

        Ok(page.into_iter().cloned().collect())
    }

    #[instrument(skip(self))]
    async fn toggle_reaction(
        &self,
        id: Snowflake,
        user_id: Snowflake,
        emoji: &str,
    ) -> RepoResult<Message> {
        let record = self
            .message_record(id)
            .ok_or(DomainError::MessageNotFound(id))?;
        let mut guard = record.lock();
        let message = guard
            .messages
            .get_mut(&id)
            .ok_or(DomainError::MessageNotFound(id))?;

        message.toggle_reaction(emoji, user_id)?;
        Ok(message.clone())
    }

    #[instrument(skip(self))]
    async fn tombstone(&self, id: Snowflake) -> RepoResult<Message> {
        let record = self
            .message_record(id)
            .ok_or(DomainError::MessageNotFound(id))?;
        let mut guard = record.lock();
        let message = guard
            .messages
            .get_mut(&id)
            .ok_or(DomainError::MessageNotFound(id))?;

        message.tombstone()?;
        Ok(message.clone())
    }
}
