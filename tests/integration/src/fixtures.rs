//! Test fixtures
//!
//! Known users and foreign entities seeded into the directory, plus typed
//! views of the JSON the server returns.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};

pub const ALICE: i64 = 1001;
pub const BOB: i64 = 1002;
pub const CAROL: i64 = 1003;
pub const DAVE: i64 = 1004;

/// Never registered in the directory
pub const GHOST: i64 = 9999;

/// Seeded users and their display names
pub const USERS: &[(i64, &str)] = &[
    (ALICE, "Alice"),
    (BOB, "Bob"),
    (CAROL, "Carol"),
    (DAVE, "Dave"),
];

pub const LAMP_PRODUCT: i64 = 5001;
pub const LAMP_TITLE: &str = "Desk lamp";

#[derive(Debug, Deserialize)]
pub struct ConversationBody {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub participants: Vec<String>,
    pub unread_counts: BTreeMap<String, u32>,
    pub last_message_id: Option<String>,
}

impl ConversationBody {
    pub fn unread_for(&self, user: i64) -> u32 {
        self.unread_counts
            .get(&user.to_string())
            .copied()
            .unwrap_or(0)
    }

    pub fn has_participant(&self, user: i64) -> bool {
        self.participants.contains(&user.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageBody {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
    pub delivery_state: String,
    #[serde(default)]
    pub reactions: BTreeMap<String, Vec<String>>,
    pub reply_to: Option<String>,
    pub preview: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct MessagePageBody {
    pub messages: Vec<MessageBody>,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct LeaveBody {
    pub conversation_id: String,
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReactionBody {
    pub message_id: String,
    pub reactions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

pub fn text_message(text: &str) -> Value {
    json!({ "type": "text", "text": text })
}

pub fn reply_message(text: &str, reply_to: &str) -> Value {
    json!({ "type": "text", "text": text, "reply_to": reply_to })
}

pub fn product_message(product_id: i64) -> Value {
    json!({ "type": "product-reference", "product_id": product_id.to_string() })
}

pub fn private_request(peer: i64) -> Value {
    json!({ "user_id": peer.to_string() })
}

pub fn group_request(name: &str, members: &[i64]) -> Value {
    let member_ids: Vec<String> = members.iter().map(ToString::to_string).collect();
    json!({ "name": name, "member_ids": member_ids })
}
