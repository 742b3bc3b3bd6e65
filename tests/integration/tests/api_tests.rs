//! API Integration Tests
//!
//! Each test spawns its own server over in-memory storage with a seeded
//! user directory, so no external services are needed.
//!
//! Run with: cargo test -p integration-tests --test api_tests

use integration_tests::{
    assert_json, assert_status, fixtures::*, TestServer,
};
use reqwest::StatusCode;

async fn open_private(server: &TestServer, from: i64, to: i64) -> ConversationBody {
    let response = server
        .post_as(from, "/conversations/private", &private_request(to))
        .await
        .unwrap();
    assert_json(response, StatusCode::CREATED).await.unwrap()
}

async fn send_text(server: &TestServer, user: i64, conversation_id: &str, text: &str) -> MessageBody {
    let response = server
        .post_as(
            user,
            &format!("/conversations/{conversation_id}/messages"),
            &text_message(text),
        )
        .await
        .unwrap();
    assert_json(response, StatusCode::CREATED).await.unwrap()
}

async fn get_conversation(server: &TestServer, user: i64, id: &str) -> ConversationBody {
    let response = server
        .get_as(user, &format!("/conversations/{id}"))
        .await
        .unwrap();
    assert_json(response, StatusCode::OK).await.unwrap()
}

async fn history(server: &TestServer, user: i64, id: &str) -> MessagePageBody {
    let response = server
        .get_as(user, &format!("/conversations/{id}/messages"))
        .await
        .unwrap();
    assert_json(response, StatusCode::OK).await.unwrap()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_health_ready() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health/ready").await.expect("Request failed");
    let body: serde_json::Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "ready");
}

// ============================================================================
// Auth Tests
// ============================================================================

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let server = TestServer::start().await.unwrap();

    let response = server.get_anonymous("/conversations").await.unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body.error.code, "MISSING_AUTHORIZATION");
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .get_with_header("/conversations", "Bearer not.a.jwt")
        .await
        .unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body.error.code, "INVALID_TOKEN");
}

// ============================================================================
// Private Conversation Tests
// ============================================================================

#[tokio::test]
async fn test_private_conversation_is_unique_per_pair() {
    let server = TestServer::start().await.unwrap();

    let created = open_private(&server, ALICE, BOB).await;
    assert_eq!(created.kind, "private");
    assert!(created.name.is_none());
    assert!(created.has_participant(ALICE) && created.has_participant(BOB));

    // Either side opening again finds the same conversation
    let response = server
        .post_as(BOB, "/conversations/private", &private_request(ALICE))
        .await
        .unwrap();
    let found: ConversationBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(found.id, created.id);
}

#[tokio::test]
async fn test_private_conversation_rejects_self_and_unknown_users() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post_as(ALICE, "/conversations/private", &private_request(ALICE))
        .await
        .unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body.error.code, "SELF_CONVERSATION");

    let response = server
        .post_as(ALICE, "/conversations/private", &private_request(GHOST))
        .await
        .unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(body.error.code, "UNKNOWN_USER");
}

#[tokio::test]
async fn test_private_exchange_counts_and_clears_unread() {
    let server = TestServer::start().await.unwrap();
    let conversation = open_private(&server, ALICE, BOB).await;

    let first = send_text(&server, ALICE, &conversation.id, "hi bob").await;
    send_text(&server, ALICE, &conversation.id, "are you there?").await;
    assert_eq!(first.kind, "text");
    assert_eq!(first.delivery_state, "sent");
    assert_eq!(first.sender_id.as_deref(), Some(ALICE.to_string().as_str()));

    let seen_by_bob = get_conversation(&server, BOB, &conversation.id).await;
    assert_eq!(seen_by_bob.unread_for(BOB), 2);
    assert_eq!(seen_by_bob.unread_for(ALICE), 0);

    let response = server
        .post_empty_as(BOB, &format!("/conversations/{}/read", conversation.id))
        .await
        .unwrap();
    let receipt: serde_json::Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(receipt["messages_read"], 2);

    let after = get_conversation(&server, BOB, &conversation.id).await;
    assert_eq!(after.unread_for(BOB), 0);

    let page = history(&server, ALICE, &conversation.id).await;
    assert_eq!(page.messages.len(), 2);
    assert!(page.messages.iter().all(|m| m.delivery_state == "read"));
    assert_eq!(page.messages[0].text.as_deref(), Some("hi bob"));
}

#[tokio::test]
async fn test_inbox_lists_most_recent_first() {
    let server = TestServer::start().await.unwrap();
    let with_bob = open_private(&server, ALICE, BOB).await;
    let with_carol = open_private(&server, ALICE, CAROL).await;

    send_text(&server, ALICE, &with_bob.id, "latest").await;

    let response = server.get_as(ALICE, "/conversations").await.unwrap();
    let inbox: Vec<ConversationBody> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].id, with_bob.id);
    assert_eq!(inbox[1].id, with_carol.id);

    let response = server.get_as(ALICE, "/conversations?limit=1").await.unwrap();
    let first_page: Vec<ConversationBody> = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(first_page.len(), 1);
}

#[tokio::test]
async fn test_outsiders_cannot_read_a_conversation() {
    let server = TestServer::start().await.unwrap();
    let conversation = open_private(&server, ALICE, BOB).await;

    let response = server
        .get_as(CAROL, &format!("/conversations/{}/messages", conversation.id))
        .await
        .unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(body.error.code, "NOT_PARTICIPANT");

    let response = server.get_as(ALICE, "/conversations/123456").await.unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(body.error.code, "UNKNOWN_CONVERSATION");
}

#[tokio::test]
async fn test_group_operations_on_private_conversation_are_rejected() {
    let server = TestServer::start().await.unwrap();
    let conversation = open_private(&server, ALICE, BOB).await;

    let response = server
        .delete_as(ALICE, &format!("/conversations/{}/members/@me", conversation.id))
        .await
        .unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body.error.code, "NOT_A_GROUP");
}

// ============================================================================
// Message Tests
// ============================================================================

#[tokio::test]
async fn test_history_pages_oldest_first() {
    let server = TestServer::start().await.unwrap();
    let conversation = open_private(&server, ALICE, BOB).await;

    let mut sent = Vec::new();
    for i in 0..5 {
        sent.push(send_text(&server, ALICE, &conversation.id, &format!("m{i}")).await);
    }

    let response = server
        .get_as(BOB, &format!("/conversations/{}/messages?limit=2", conversation.id))
        .await
        .unwrap();
    let newest: MessagePageBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(newest.has_more);
    let texts: Vec<_> = newest.messages.iter().filter_map(|m| m.text.as_deref()).collect();
    assert_eq!(texts, ["m3", "m4"]);

    let response = server
        .get_as(
            BOB,
            &format!(
                "/conversations/{}/messages?limit=2&before={}",
                conversation.id, newest.messages[0].id
            ),
        )
        .await
        .unwrap();
    let older: MessagePageBody = assert_json(response, StatusCode::OK).await.unwrap();
    let texts: Vec<_> = older.messages.iter().filter_map(|m| m.text.as_deref()).collect();
    assert_eq!(texts, ["m1", "m2"]);

    let response = server
        .get_as(
            BOB,
            &format!(
                "/conversations/{}/messages?after={}",
                conversation.id, sent[2].id
            ),
        )
        .await
        .unwrap();
    let newer: MessagePageBody = assert_json(response, StatusCode::OK).await.unwrap();
    let texts: Vec<_> = newer.messages.iter().filter_map(|m| m.text.as_deref()).collect();
    assert_eq!(texts, ["m3", "m4"]);
}

#[tokio::test]
async fn test_invalid_cursor_is_bad_request() {
    let server = TestServer::start().await.unwrap();
    let conversation = open_private(&server, ALICE, BOB).await;

    let response = server
        .get_as(
            ALICE,
            &format!("/conversations/{}/messages?before=yesterday", conversation.id),
        )
        .await
        .unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body.error.code, "INVALID_QUERY_PARAMETER");
}

#[tokio::test]
async fn test_replies_must_stay_in_conversation() {
    let server = TestServer::start().await.unwrap();
    let with_bob = open_private(&server, ALICE, BOB).await;
    let with_carol = open_private(&server, ALICE, CAROL).await;

    let original = send_text(&server, BOB, &with_bob.id, "question").await;

    let response = server
        .post_as(
            ALICE,
            &format!("/conversations/{}/messages", with_bob.id),
            &reply_message("answer", &original.id),
        )
        .await
        .unwrap();
    let reply: MessageBody = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(reply.reply_to.as_deref(), Some(original.id.as_str()));

    let response = server
        .post_as(
            ALICE,
            &format!("/conversations/{}/messages", with_carol.id),
            &reply_message("wrong place", &original.id),
        )
        .await
        .unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body.error.code, "INVALID_REPLY");
}

#[tokio::test]
async fn test_product_reference_carries_preview() {
    let server = TestServer::start().await.unwrap();
    let conversation = open_private(&server, ALICE, BOB).await;

    let response = server
        .post_as(
            ALICE,
            &format!("/conversations/{}/messages", conversation.id),
            &product_message(LAMP_PRODUCT),
        )
        .await
        .unwrap();
    let message: MessageBody = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(message.kind, "product-reference");
    let preview = message.preview.expect("preview");
    assert_eq!(preview["title"], LAMP_TITLE);

    let response = server
        .post_as(
            ALICE,
            &format!("/conversations/{}/messages", conversation.id),
            &product_message(LAMP_PRODUCT + 1),
        )
        .await
        .unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(body.error.code, "UNKNOWN_REFERENCE");
}

#[tokio::test]
async fn test_message_without_required_field_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let conversation = open_private(&server, ALICE, BOB).await;

    let response = server
        .post_as(
            ALICE,
            &format!("/conversations/{}/messages", conversation.id),
            &serde_json::json!({ "type": "image" }),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();
}

#[tokio::test]
async fn test_reaction_toggles() {
    let server = TestServer::start().await.unwrap();
    let conversation = open_private(&server, ALICE, BOB).await;
    let message = send_text(&server, ALICE, &conversation.id, "lunch?").await;
    let path = format!("/messages/{}/reactions/👍", message.id);

    let response = server.put_empty_as(BOB, &path).await.unwrap();
    let on: ReactionBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(on.message_id, message.id);
    assert_eq!(on.reactions["👍"], vec![BOB.to_string()]);

    let response = server.put_empty_as(BOB, &path).await.unwrap();
    let off: ReactionBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(off.reactions.is_empty());

    let response = server.put_empty_as(CAROL, &path).await.unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();
}

#[tokio::test]
async fn test_delete_leaves_tombstone() {
    let server = TestServer::start().await.unwrap();
    let conversation = open_private(&server, ALICE, BOB).await;
    let message = send_text(&server, ALICE, &conversation.id, "oops").await;
    let path = format!("/messages/{}", message.id);

    let response = server.delete_as(BOB, &path).await.unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::FORBIDDEN).await.unwrap();
    assert_eq!(body.error.code, "NOT_MESSAGE_SENDER");

    let response = server.delete_as(ALICE, &path).await.unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    let page = history(&server, BOB, &conversation.id).await;
    assert_eq!(page.messages.len(), 1);
    assert_eq!(page.messages[0].kind, "deleted-tombstone");
    assert!(page.messages[0].text.is_none());

    let response = server.delete_as(ALICE, &path).await.unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::CONFLICT).await.unwrap();
    assert_eq!(body.error.code, "MESSAGE_ALREADY_DELETED");

    let response = server
        .put_empty_as(BOB, &format!("/messages/{}/reactions/👍", message.id))
        .await
        .unwrap();
    assert_status(response, StatusCode::CONFLICT).await.unwrap();
}

// ============================================================================
// Group Tests
// ============================================================================

#[tokio::test]
async fn test_group_creation_posts_info_message() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post_as(ALICE, "/conversations/groups", &group_request("Trip", &[BOB, CAROL]))
        .await
        .unwrap();
    let group: ConversationBody = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(group.kind, "group");
    assert_eq!(group.name.as_deref(), Some("Trip"));
    assert_eq!(group.participants.len(), 3);
    // Info messages do not count as unread
    assert_eq!(group.unread_for(BOB), 0);

    let page = history(&server, CAROL, &group.id).await;
    assert_eq!(page.messages.len(), 1);
    assert_eq!(page.messages[0].kind, "info");
    assert!(page.messages[0].sender_id.is_none());
    assert!(page.messages[0]
        .text
        .as_deref()
        .is_some_and(|text| text.contains("Alice")));
}

#[tokio::test]
async fn test_group_size_is_enforced() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post_as(ALICE, "/conversations/groups", &group_request("Solo", &[ALICE]))
        .await
        .unwrap();
    let body: ErrorBody = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body.error.code, "INVALID_GROUP_SIZE");

    let response = server
        .post_as(ALICE, "/conversations/groups", &group_request("Pair", &[BOB, ALICE]))
        .await
        .unwrap();
    let pair: ConversationBody = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(pair.kind, "group");
    assert_eq!(pair.participants, vec![ALICE.to_string(), BOB.to_string()]);

    let response = server
        .post_as(ALICE, "/conversations/groups", &group_request("Ghosts", &[BOB, GHOST]))
        .await
        .unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();
}

#[tokio::test]
async fn test_group_rename_add_and_avatar() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_as(ALICE, "/conversations/groups", &group_request("Trip", &[BOB, CAROL]))
        .await
        .unwrap();
    let group: ConversationBody = assert_json(response, StatusCode::CREATED).await.unwrap();
    let base = format!("/conversations/{}", group.id);

    let response = server
        .patch_as(BOB, &base, &serde_json::json!({ "name": "Road trip" }))
        .await
        .unwrap();
    let renamed: ConversationBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(renamed.name.as_deref(), Some("Road trip"));

    let response = server
        .post_as(
            CAROL,
            &format!("{base}/members"),
            &serde_json::json!({ "user_ids": [DAVE.to_string(), BOB.to_string()] }),
        )
        .await
        .unwrap();
    let grown: ConversationBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(grown.participants.len(), 4);
    assert!(grown.has_participant(DAVE));

    let response = server
        .put_bytes_as(ALICE, &format!("{base}/avatar"), "image/png", vec![0x89, b'P', b'N', b'G'])
        .await
        .unwrap();
    let with_avatar: ConversationBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(with_avatar.avatar_url.is_some());
    assert_eq!(server.media.len(), 1);

    let response = server
        .put_bytes_as(ALICE, &format!("{base}/avatar"), "text/plain", b"hello".to_vec())
        .await
        .unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();

    // Creation, rename, add and avatar each leave an info message
    let page = history(&server, DAVE, &group.id).await;
    assert_eq!(page.messages.len(), 4);
    assert!(page.messages.iter().all(|m| m.kind == "info"));
}

#[tokio::test]
async fn test_last_member_leaving_deletes_group() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .post_as(ALICE, "/conversations/groups", &group_request("Trip", &[BOB, CAROL]))
        .await
        .unwrap();
    let group: ConversationBody = assert_json(response, StatusCode::CREATED).await.unwrap();
    send_text(&server, BOB, &group.id, "see you there").await;
    let leave = format!("/conversations/{}/members/@me", group.id);

    for user in [ALICE, BOB] {
        let response = server.delete_as(user, &leave).await.unwrap();
        let outcome: LeaveBody = assert_json(response, StatusCode::OK).await.unwrap();
        assert_eq!(outcome.conversation_id, group.id);
        assert!(!outcome.deleted);
    }

    let remaining = get_conversation(&server, CAROL, &group.id).await;
    assert_eq!(remaining.participants, vec![CAROL.to_string()]);

    let response = server.get_as(ALICE, &format!("/conversations/{}", group.id)).await.unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    let response = server.delete_as(CAROL, &leave).await.unwrap();
    let outcome: LeaveBody = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(outcome.deleted);

    let response = server.get_as(CAROL, &format!("/conversations/{}", group.id)).await.unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();

    let response = server.get_as(CAROL, "/conversations").await.unwrap();
    let inbox: Vec<ConversationBody> = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(inbox.is_empty());
}
