//! PostgreSQL implementation of MessageRepository

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use inbox_core::entities::Message;
use inbox_core::error::DomainError;
use inbox_core::traits::{MessageQuery, MessageRepository, RepoResult};
use inbox_core::value_objects::Snowflake;

use crate::mappers::{body_json, message_from_rows, MessageInsert};
use crate::models::{MessageModel, ReactionModel};

use super::error::{map_db_error, map_unique_violation, message_not_found};

const SELECT_MESSAGE: &str = r"
    SELECT id, conversation_id, sender_id, kind, body, delivery_state, reply_to, created_at
    FROM messages
    WHERE id = $1
";

const SELECT_MESSAGE_FOR_UPDATE: &str = r"
    SELECT id, conversation_id, sender_id, kind, body, delivery_state, reply_to, created_at
    FROM messages
    WHERE id = $1
    FOR UPDATE
";

// Cursors are compared on (created_at, id); a cursor outside the
// conversation makes the row comparison NULL and the page empty.
const SELECT_PAGE_NEWEST_FIRST: &str = r"
    SELECT m.id, m.conversation_id, m.sender_id, m.kind, m.body, m.delivery_state,
           m.reply_to, m.created_at
    FROM messages m
    WHERE m.conversation_id = $1
      AND ($2::BIGINT IS NULL OR (m.created_at, m.id) <
          (SELECT created_at, id FROM messages WHERE id = $2 AND conversation_id = $1))
      AND ($3::BIGINT IS NULL OR (m.created_at, m.id) >
          (SELECT created_at, id FROM messages WHERE id = $3 AND conversation_id = $1))
    ORDER BY m.created_at DESC, m.id DESC
    LIMIT $4
";

const SELECT_PAGE_OLDEST_FIRST: &str = r"
    SELECT m.id, m.conversation_id, m.sender_id, m.kind, m.body, m.delivery_state,
           m.reply_to, m.created_at
    FROM messages m
    WHERE m.conversation_id = $1
      AND ($2::BIGINT IS NULL OR (m.created_at, m.id) <
          (SELECT created_at, id FROM messages WHERE id = $2 AND conversation_id = $1))
      AND ($3::BIGINT IS NULL OR (m.created_at, m.id) >
          (SELECT created_at, id FROM messages WHERE id = $3 AND conversation_id = $1))
    ORDER BY m.created_at ASC, m.id ASC
    LIMIT $4
";

/// PostgreSQL implementation of MessageRepository
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new PgMessageRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Insert a freshly created message; new messages carry no reactions
pub(crate) async fn insert_message(conn: &mut PgConnection, message: &Message) -> RepoResult<()> {
    let insert = MessageInsert::new(message)?;
    sqlx::query(
        r"
        INSERT INTO messages (id, conversation_id, sender_id, kind, body, delivery_state, reply_to, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(insert.id)
    .bind(insert.conversation_id)
    .bind(insert.sender_id)
    .bind(insert.kind)
    .bind(insert.body)
    .bind(insert.delivery_state)
    .bind(insert.reply_to)
    .bind(message.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        map_unique_violation(e, || {
            DomainError::InternalError(format!("duplicate message id {}", message.id))
        })
    })?;
    Ok(())
}

/// Reaction rows for a set of messages, grouped by message id
async fn load_reactions(
    conn: &mut PgConnection,
    message_ids: &[i64],
) -> RepoResult<HashMap<i64, Vec<ReactionModel>>> {
    if message_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, ReactionModel>(
        r"
        SELECT message_id, emoji, user_id
        FROM message_reactions
        WHERE message_id = ANY($1)
        ORDER BY created_at, emoji, user_id
        ",
    )
    .bind(message_ids)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_db_error)?;

    let mut grouped: HashMap<i64, Vec<ReactionModel>> = HashMap::new();
    for row in rows {
        grouped.entry(row.message_id).or_default().push(row);
    }
    Ok(grouped)
}

async fn fetch_locked(conn: &mut PgConnection, id: Snowflake) -> RepoResult<MessageModel> {
    sqlx::query_as::<_, MessageModel>(SELECT_MESSAGE_FOR_UPDATE)
        .bind(id.into_inner())
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| message_not_found(id))
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;

        let Some(model) = sqlx::query_as::<_, MessageModel>(SELECT_MESSAGE)
            .bind(id.into_inner())
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_db_error)?
        else {
            return Ok(None);
        };

        let mut reactions = load_reactions(&mut conn, &[model.id]).await?;
        let reactions = reactions.remove(&model.id).unwrap_or_default();
        message_from_rows(model, reactions).map(Some)
    }

    #[instrument(skip(self))]
    async fn find_by_conversation(
        &self,
        conversation_id: Snowflake,
        query: MessageQuery,
    ) -> RepoResult<Vec<Message>> {
        let limit = query.limit.max(1);
        // Scrolling forward from `after` takes the oldest rows past the
        // cursor, then flips them back to newest first.
        let oldest_first = query.before.is_none() && query.after.is_some();
        let sql = if oldest_first {
            SELECT_PAGE_OLDEST_FIRST
        } else {
            SELECT_PAGE_NEWEST_FIRST
        };

        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        let mut models = sqlx::query_as::<_, MessageModel>(sql)
            .bind(conversation_id.into_inner())
            .bind(query.before.map(Snowflake::into_inner))
            .bind(query.after.map(Snowflake::into_inner))
            .bind(limit)
            .fetch_all(&mut *conn)
            .await
            .map_err(map_db_error)?;
        if oldest_first {
            models.reverse();
        }

        let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        let mut reactions = load_reactions(&mut conn, &ids).await?;

        models
            .into_iter()
            .map(|model| {
                let rows = reactions.remove(&model.id).unwrap_or_default();
                message_from_rows(model, rows)
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn toggle_reaction(
        &self,
        id: Snowflake,
        user_id: Snowflake,
        emoji: &str,
    ) -> RepoResult<Message> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let model = fetch_locked(&mut tx, id).await?;
        if model.is_tombstone() {
            return Err(DomainError::MessageAlreadyDeleted);
        }

        let removed = sqlx::query(
            r"DELETE FROM message_reactions WHERE message_id = $1 AND emoji = $2 AND user_id = $3",
        )
        .bind(id.into_inner())
        .bind(emoji)
        .bind(user_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        if removed == 0 {
            sqlx::query(
                r"INSERT INTO message_reactions (message_id, emoji, user_id) VALUES ($1, $2, $3)",
            )
            .bind(id.into_inner())
            .bind(emoji)
            .bind(user_id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        let mut reactions = load_reactions(&mut tx, &[model.id]).await?;
        tx.commit().await.map_err(map_db_error)?;

        let rows = reactions.remove(&model.id).unwrap_or_default();
        message_from_rows(model, rows)
    }

    #[instrument(skip(self))]
    async fn tombstone(&self, id: Snowflake) -> RepoResult<Message> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let mut message = message_from_rows(fetch_locked(&mut tx, id).await?, Vec::new())?;
        message.tombstone()?;

        sqlx::query(r"UPDATE messages SET kind = $2, body = $3 WHERE id = $1")
            .bind(id.into_inner())
            .bind(message.kind().as_str())
            .bind(sqlx::types::Json(body_json(&message.body)?))
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        sqlx::query(r"DELETE FROM message_reactions WHERE message_id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(message)
    }
}
