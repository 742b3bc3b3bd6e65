//! PostgreSQL implementation of ConversationRepository
//!
//! Every change runs in one transaction holding a `FOR UPDATE` lock on the
//! conversation row, so changes to one conversation are serialized while
//! other conversations proceed independently.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, instrument};

use inbox_core::entities::Conversation;
use inbox_core::error::DomainError;
use inbox_core::traits::{
    ChangeOutcome, ConversationChange, ConversationQuery, ConversationRepository, ReadReceipt,
    RepoResult,
};
use inbox_core::value_objects::Snowflake;
use inbox_core::Message;

use crate::mappers::{conversation_from_rows, ConversationInsert, RosterColumns};
use crate::models::{ConversationModel, ParticipantModel};

use super::error::{conversation_not_found, map_db_error, map_unique_violation};
use super::message::insert_message;

const SELECT_CONVERSATION: &str = r"
    SELECT id, kind, name, avatar_url, avatar_handle, last_message_id, created_by, created_at, updated_at
    FROM conversations
    WHERE id = $1
";

const SELECT_CONVERSATION_FOR_UPDATE: &str = r"
    SELECT id, kind, name, avatar_url, avatar_handle, last_message_id, created_by, created_at, updated_at
    FROM conversations
    WHERE id = $1
    FOR UPDATE
";

const INSERT_CONVERSATION: &str = r"
    INSERT INTO conversations
        (id, kind, name, avatar_url, avatar_handle, pair_low, pair_high, last_message_id,
         created_by, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
";

const INSERT_PRIVATE_CONVERSATION: &str = r"
    INSERT INTO conversations
        (id, kind, name, avatar_url, avatar_handle, pair_low, pair_high, last_message_id,
         created_by, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    ON CONFLICT (pair_low, pair_high) WHERE kind = 'private' DO NOTHING
";

/// PostgreSQL implementation of ConversationRepository
#[derive(Clone)]
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    /// Create a new PgConversationRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn fetch_conversation(
    conn: &mut PgConnection,
    id: Snowflake,
    lock: bool,
) -> RepoResult<Option<Conversation>> {
    let sql = if lock {
        SELECT_CONVERSATION_FOR_UPDATE
    } else {
        SELECT_CONVERSATION
    };

    let Some(model) = sqlx::query_as::<_, ConversationModel>(sql)
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?
    else {
        return Ok(None);
    };

    let participants = sqlx::query_as::<_, ParticipantModel>(
        r"
        SELECT conversation_id, user_id, position, unread_count
        FROM conversation_participants
        WHERE conversation_id = $1
        ",
    )
    .bind(model.id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_db_error)?;

    conversation_from_rows(model, participants).map(Some)
}

/// Attach participant rows to a batch of conversation rows, keeping order
async fn assemble(
    conn: &mut PgConnection,
    models: Vec<ConversationModel>,
) -> RepoResult<Vec<Conversation>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
    let rows = sqlx::query_as::<_, ParticipantModel>(
        r"
        SELECT conversation_id, user_id, position, unread_count
        FROM conversation_participants
        WHERE conversation_id = ANY($1)
        ",
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await
    .map_err(map_db_error)?;

    let mut by_conversation: HashMap<i64, Vec<ParticipantModel>> = HashMap::new();
    for row in rows {
        by_conversation.entry(row.conversation_id).or_default().push(row);
    }

    models
        .into_iter()
        .map(|model| {
            let participants = by_conversation.remove(&model.id).unwrap_or_default();
            conversation_from_rows(model, participants)
        })
        .collect()
}

async fn insert_conversation(
    conn: &mut PgConnection,
    conversation: &Conversation,
    sql: &'static str,
) -> Result<u64, sqlx::Error> {
    let insert = ConversationInsert::new(conversation);
    sqlx::query(sql)
        .bind(insert.id)
        .bind(insert.kind)
        .bind(insert.name)
        .bind(insert.avatar_url)
        .bind(insert.avatar_handle)
        .bind(insert.pair_low)
        .bind(insert.pair_high)
        .bind(insert.last_message_id)
        .bind(insert.created_by)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&mut *conn)
        .await
        .map(|done| done.rows_affected())
}

/// Write the mutable columns of the conversation row
async fn update_header(conn: &mut PgConnection, conversation: &Conversation) -> RepoResult<()> {
    let insert = ConversationInsert::new(conversation);
    sqlx::query(
        r"
        UPDATE conversations
        SET name = $2, avatar_url = $3, avatar_handle = $4, last_message_id = $5, updated_at = $6
        WHERE id = $1
        ",
    )
    .bind(insert.id)
    .bind(insert.name)
    .bind(insert.avatar_url)
    .bind(insert.avatar_handle)
    .bind(insert.last_message_id)
    .bind(conversation.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;
    Ok(())
}

/// Make the participant rows match the conversation's roster
async fn save_roster(conn: &mut PgConnection, conversation: &Conversation) -> RepoResult<()> {
    let id = conversation.id.into_inner();
    let roster = RosterColumns::new(conversation);

    sqlx::query(
        r"DELETE FROM conversation_participants WHERE conversation_id = $1 AND NOT (user_id = ANY($2))",
    )
    .bind(id)
    .bind(&roster.user_ids[..])
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;

    sqlx::query(
        r"
        INSERT INTO conversation_participants (conversation_id, user_id, position, unread_count)
        SELECT $1, r.user_id, r.position, r.unread_count
        FROM UNNEST($2::BIGINT[], $3::INT[], $4::INT[]) AS r(user_id, position, unread_count)
        ON CONFLICT (conversation_id, user_id)
        DO UPDATE SET position = EXCLUDED.position, unread_count = EXCLUDED.unread_count
        ",
    )
    .bind(id)
    .bind(&roster.user_ids[..])
    .bind(&roster.positions[..])
    .bind(&roster.unread_counts[..])
    .execute(&mut *conn)
    .await
    .map_err(map_db_error)?;

    Ok(())
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Conversation>> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        fetch_conversation(&mut conn, id, false).await
    }

    #[instrument(skip(self))]
    async fn find_private(&self, a: Snowflake, b: Snowflake) -> RepoResult<Option<Conversation>> {
        let (low, high) = inbox_core::pair_key(a, b);
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;

        let model = sqlx::query_as::<_, ConversationModel>(
            r"
            SELECT id, kind, name, avatar_url, avatar_handle, last_message_id, created_by, created_at, updated_at
            FROM conversations
            WHERE kind = 'private' AND pair_low = $1 AND pair_high = $2
            ",
        )
        .bind(low.into_inner())
        .bind(high.into_inner())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?;

        match model {
            Some(model) => Ok(assemble(&mut conn, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn find_by_participant(
        &self,
        user_id: Snowflake,
        query: ConversationQuery,
    ) -> RepoResult<Vec<Conversation>> {
        let limit = query.limit.max(1);
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;

        let models = sqlx::query_as::<_, ConversationModel>(
            r"
            SELECT c.id, c.kind, c.name, c.avatar_url, c.avatar_handle, c.last_message_id,
                   c.created_by, c.created_at, c.updated_at
            FROM conversations c
            JOIN conversation_participants p ON p.conversation_id = c.id AND p.user_id = $1
            WHERE $2::BIGINT IS NULL
               OR (c.updated_at, c.id) < (SELECT updated_at, id FROM conversations WHERE id = $2)
            ORDER BY c.updated_at DESC, c.id DESC
            LIMIT $3
            ",
        )
        .bind(user_id.into_inner())
        .bind(query.before.map(Snowflake::into_inner))
        .bind(limit)
        .fetch_all(&mut *conn)
        .await
        .map_err(map_db_error)?;

        assemble(&mut conn, models).await
    }

    #[instrument(skip(self, conversation), fields(conversation_id = %conversation.id))]
    async fn create_private(&self, conversation: &Conversation) -> RepoResult<(Conversation, bool)> {
        let Some((low, high)) = conversation.private_pair() else {
            return Err(DomainError::ValidationError(
                "not a private conversation".to_string(),
            ));
        };

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        let inserted = insert_conversation(&mut tx, conversation, INSERT_PRIVATE_CONVERSATION)
            .await
            .map_err(map_db_error)?;

        if inserted == 0 {
            // The pair already has a conversation, possibly committed a
            // moment ago by a concurrent request.
            tx.rollback().await.map_err(map_db_error)?;
            debug!("Private conversation already exists, returning it");
            let existing = self.find_private(low, high).await?.ok_or_else(|| {
                DomainError::InternalError("private conversation vanished".to_string())
            })?;
            return Ok((existing, false));
        }

        save_roster(&mut tx, conversation).await?;
        tx.commit().await.map_err(map_db_error)?;
        Ok((conversation.clone(), true))
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

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        insert_conversation(&mut tx, &stored, INSERT_CONVERSATION)
            .await
            .map_err(|e| {
                map_unique_violation(e, || {
                    DomainError::InternalError(format!("duplicate conversation id {}", stored.id))
                })
            })?;
        save_roster(&mut tx, &stored).await?;
        for message in messages {
            insert_message(&mut tx, message).await?;
        }
        tx.commit().await.map_err(map_db_error)?;

        Ok(stored)
    }

    #[instrument(skip(self, change))]
    async fn update(&self, id: Snowflake, change: ConversationChange) -> RepoResult<ChangeOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut conversation = fetch_conversation(&mut tx, id, true)
            .await?
            .ok_or_else(|| conversation_not_found(id))?;

        // An error drops the transaction, which rolls it back
        let messages = change(&mut conversation)?;

        if conversation.is_group() && conversation.is_empty() {
            let purged_messages = sqlx::query(r"DELETE FROM messages WHERE conversation_id = $1")
                .bind(id.into_inner())
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?
                .rows_affected();
            sqlx::query(r"DELETE FROM conversations WHERE id = $1")
                .bind(id.into_inner())
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
            tx.commit().await.map_err(map_db_error)?;

            debug!(purged_messages, "Empty group deleted");
            return Ok(ChangeOutcome::Deleted {
                conversation,
                purged_messages,
            });
        }

        for message in &messages {
            conversation.record_message(message);
            insert_message(&mut tx, message).await?;
        }
        save_roster(&mut tx, &conversation).await?;
        update_header(&mut tx, &conversation).await?;
        tx.commit().await.map_err(map_db_error)?;

        Ok(ChangeOutcome::Updated {
            conversation,
            messages,
        })
    }

    #[instrument(skip(self))]
    async fn mark_read(&self, id: Snowflake, user_id: Snowflake) -> RepoResult<ReadReceipt> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut conversation = fetch_conversation(&mut tx, id, true)
            .await?
            .ok_or_else(|| conversation_not_found(id))?;
        conversation.mark_read(user_id)?;

        sqlx::query(
            r"UPDATE conversation_participants SET unread_count = 0 WHERE conversation_id = $1 AND user_id = $2",
        )
        .bind(id.into_inner())
        .bind(user_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let messages_read = sqlx::query(
            r"
            UPDATE messages
            SET delivery_state = 'read'
            WHERE conversation_id = $1
              AND delivery_state <> 'read'
              AND sender_id IS DISTINCT FROM $2
            ",
        )
        .bind(id.into_inner())
        .bind(user_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        tx.commit().await.map_err(map_db_error)?;

        Ok(ReadReceipt {
            conversation,
            messages_read,
            read_at: Utc::now(),
        })
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> RepoResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }
}
