//! Payload rules shared by the services

use inbox_core::entities::{MAX_EMOJI_LEN, MAX_TEXT_LEN};
use inbox_core::{DomainError, MessageBody, MessageKind};

use crate::dto::SendMessageRequest;

/// Turn a send request into a typed body
///
/// The declared type's field must be present and every other payload field
/// absent. Reference ids are only checked for presence here; whether they
/// resolve is the directory's call.
pub fn message_body(request: &SendMessageRequest) -> Result<MessageBody, DomainError> {
    let expected = match request.kind {
        MessageKind::Text => "text",
        MessageKind::Image => "url",
        MessageKind::ProductReference => "product_id",
        MessageKind::PostReference => "post_id",
        MessageKind::ProfileReference => "profile_id",
        MessageKind::Info | MessageKind::Tombstone => {
            return Err(DomainError::ValidationError(format!(
                "message type '{}' cannot be sent by clients",
                request.kind.as_str()
            )));
        }
    };

    let present: Vec<&'static str> = [
        ("text", request.text.is_some()),
        ("url", request.url.is_some()),
        ("product_id", request.product_id.is_some()),
        ("post_id", request.post_id.is_some()),
        ("profile_id", request.profile_id.is_some()),
    ]
    .into_iter()
    .filter_map(|(field, set)| set.then_some(field))
    .collect();

    if let Some(extra) = present.iter().find(|field| **field != expected) {
        return Err(DomainError::ValidationError(format!(
            "field '{extra}' is not allowed for '{}' messages",
            request.kind.as_str()
        )));
    }

    let missing = || {
        DomainError::ValidationError(format!(
            "'{}' messages require '{expected}'",
            request.kind.as_str()
        ))
    };

    Ok(match request.kind {
        MessageKind::Text => {
            let text = request.text.as_deref().ok_or_else(missing)?;
            MessageBody::Text {
                text: validate_text(text)?,
            }
        }
        MessageKind::Image => {
            let url = request.url.as_deref().map(str::trim).unwrap_or_default();
            if url.is_empty() {
                return Err(missing());
            }
            MessageBody::Image {
                url: url.to_string(),
            }
        }
        MessageKind::ProductReference => MessageBody::ProductReference {
            product_id: request.product_id.ok_or_else(missing)?,
        },
        MessageKind::PostReference => MessageBody::PostReference {
            post_id: request.post_id.ok_or_else(missing)?,
        },
        MessageKind::ProfileReference => MessageBody::ProfileReference {
            profile_id: request.profile_id.ok_or_else(missing)?,
        },
        MessageKind::Info | MessageKind::Tombstone => return Err(missing()),
    })
}

/// Non-blank text of at most [`MAX_TEXT_LEN`] characters
///
/// Text is stored as sent; only the blank check ignores whitespace.
pub fn validate_text(text: &str) -> Result<String, DomainError> {
    if text.trim().is_empty() {
        return Err(DomainError::ValidationError(
            "text must not be empty".to_string(),
        ));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(DomainError::ContentTooLong { max: MAX_TEXT_LEN });
    }
    Ok(text.to_string())
}

/// Non-blank emoji key of at most [`MAX_EMOJI_LEN`] bytes
pub fn validate_emoji(emoji: &str) -> Result<&str, DomainError> {
    let emoji = emoji.trim();
    if emoji.is_empty() {
        return Err(DomainError::ValidationError(
            "emoji must not be empty".to_string(),
        ));
    }
    if emoji.len() > MAX_EMOJI_LEN {
        return Err(DomainError::ValidationError(format!(
            "emoji must be at most {MAX_EMOJI_LEN} bytes"
        )));
    }
    Ok(emoji)
}
