//! Gateway Integration Tests
//!
//! Drive real WebSocket connections against a spawned server and check the
//! handshake, pushed events and close codes.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::{
    assert_json, fixtures::*, test_config, GatewayClient, TestServer,
};
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_hello_then_ready() {
    let server = TestServer::start().await.unwrap();

    let mut client = GatewayClient::connect(&server.gateway_url()).await.unwrap();
    assert_eq!(client.hello["heartbeat_interval"], 45_000);

    client.identify(&server.token(ALICE)).await.unwrap();
    let ready = client.next_dispatch().await.unwrap();
    assert_eq!(ready["t"], "READY");
    assert_eq!(ready["s"], 1);
    assert_eq!(ready["d"]["user_id"], ALICE.to_string());
    assert!(ready["d"]["session_id"].is_string());
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged() {
    let server = TestServer::start().await.unwrap();
    let (mut client, _) = GatewayClient::connect_identified(&server.gateway_url(), &server.token(ALICE))
        .await
        .unwrap();

    client.heartbeat(Some(1)).await.unwrap();
    let ack = client.next_frame().await.unwrap();
    assert_eq!(ack, json!({ "op": 11 }));
}

#[tokio::test]
async fn test_online_count_tracks_connections() {
    let server = TestServer::start().await.unwrap();
    let (client, _) = GatewayClient::connect_identified(&server.gateway_url(), &server.token(ALICE))
        .await
        .unwrap();

    let response = server.get("/health/ready").await.unwrap();
    let body: serde_json::Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["checks"]["online_connections"], 1);

    drop(client);
    let presence = server.state.service_context().presence().clone();
    for _ in 0..50 {
        if presence.online_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(presence.online_count(), 0);
}

// ============================================================================
// Close Code Tests
// ============================================================================

#[tokio::test]
async fn test_invalid_token_closes_with_4004() {
    let server = TestServer::start().await.unwrap();
    let mut client = GatewayClient::connect(&server.gateway_url()).await.unwrap();

    client.identify("not-a-token").await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), 4004);
}

#[tokio::test]
async fn test_heartbeat_before_identify_closes_with_4003() {
    let server = TestServer::start().await.unwrap();
    let mut client = GatewayClient::connect(&server.gateway_url()).await.unwrap();

    client.heartbeat(None).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), 4003);
}

#[tokio::test]
async fn test_unknown_opcode_closes_with_4001() {
    let server = TestServer::start().await.unwrap();
    let mut client = GatewayClient::connect(&server.gateway_url()).await.unwrap();

    client.send_json(&json!({ "op": 42 })).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), 4001);
}

#[tokio::test]
async fn test_second_identify_closes_with_4005() {
    let server = TestServer::start().await.unwrap();
    let (mut client, _) = GatewayClient::connect_identified(&server.gateway_url(), &server.token(ALICE))
        .await
        .unwrap();

    client.identify(&server.token(ALICE)).await.unwrap();
    assert_eq!(client.expect_close().await.unwrap(), 4005);
}

#[tokio::test]
async fn test_missed_heartbeats_close_with_4009() {
    let mut config = test_config();
    config.gateway.heartbeat_interval_ms = 200;
    let server = TestServer::start_with_config(config).await.unwrap();

    let (mut client, _) = GatewayClient::connect_identified(&server.gateway_url(), &server.token(ALICE))
        .await
        .unwrap();
    assert_eq!(client.expect_close().await.unwrap(), 4009);
}

#[tokio::test]
async fn test_newer_connection_replaces_older() {
    let server = TestServer::start().await.unwrap();
    let url = server.gateway_url();

    let (mut first, _) = GatewayClient::connect_identified(&url, &server.token(BOB))
        .await
        .unwrap();
    let (mut second, _) = GatewayClient::connect_identified(&url, &server.token(BOB))
        .await
        .unwrap();

    assert_eq!(first.expect_close().await.unwrap(), 4010);

    // The replaced connection's cleanup must not unregister the new one
    let response = server
        .post_as(ALICE, "/conversations/private", &private_request(BOB))
        .await
        .unwrap();
    let conversation: ConversationBody = assert_json(response, StatusCode::CREATED).await.unwrap();

    let event = second.next_event("CONVERSATION_CREATE").await.unwrap();
    assert_eq!(event["d"]["id"], conversation.id);
}

// ============================================================================
// Event Delivery Tests
// ============================================================================

#[tokio::test]
async fn test_message_create_reaches_both_participants() {
    let server = TestServer::start().await.unwrap();
    let url = server.gateway_url();
    let (mut alice, _) = GatewayClient::connect_identified(&url, &server.token(ALICE))
        .await
        .unwrap();
    let (mut bob, _) = GatewayClient::connect_identified(&url, &server.token(BOB))
        .await
        .unwrap();

    let response = server
        .post_as(ALICE, "/conversations/private", &private_request(BOB))
        .await
        .unwrap();
    let conversation: ConversationBody = assert_json(response, StatusCode::CREATED).await.unwrap();

    // Only the peer hears about the new conversation
    let created = bob.next_dispatch().await.unwrap();
    assert_eq!(created["t"], "CONVERSATION_CREATE");
    assert_eq!(created["s"], 2);

    let response = server
        .post_as(
            ALICE,
            &format!("/conversations/{}/messages", conversation.id),
            &text_message("ping"),
        )
        .await
        .unwrap();
    let message: MessageBody = assert_json(response, StatusCode::CREATED).await.unwrap();

    for client in [&mut alice, &mut bob] {
        let event = client.next_event("MESSAGE_CREATE").await.unwrap();
        assert_eq!(event["d"]["id"], message.id);
        assert_eq!(event["d"]["text"], "ping");
        assert_eq!(event["d"]["conversation_id"], conversation.id);
    }
}

#[tokio::test]
async fn test_read_reaction_and_delete_events() {
    let server = TestServer::start().await.unwrap();
    let url = server.gateway_url();
    let (mut alice, _) = GatewayClient::connect_identified(&url, &server.token(ALICE))
        .await
        .unwrap();

    let response = server
        .post_as(BOB, "/conversations/private", &private_request(ALICE))
        .await
        .unwrap();
    let conversation: ConversationBody = assert_json(response, StatusCode::CREATED).await.unwrap();

    let response = server
        .post_as(
            ALICE,
            &format!("/conversations/{}/messages", conversation.id),
            &text_message("hello"),
        )
        .await
        .unwrap();
    let message: MessageBody = assert_json(response, StatusCode::CREATED).await.unwrap();

    server
        .post_empty_as(BOB, &format!("/conversations/{}/read", conversation.id))
        .await
        .unwrap();
    let read = alice.next_event("CONVERSATION_READ").await.unwrap();
    assert_eq!(read["d"]["user_id"], BOB.to_string());

    server
        .put_empty_as(BOB, &format!("/messages/{}/reactions/🎉", message.id))
        .await
        .unwrap();
    let reaction = alice.next_event("MESSAGE_REACTION_UPDATE").await.unwrap();
    assert_eq!(reaction["d"]["reactions"]["🎉"], json!([BOB.to_string()]));

    server
        .delete_as(ALICE, &format!("/messages/{}", message.id))
        .await
        .unwrap();
    let deleted = alice.next_event("MESSAGE_DELETE").await.unwrap();
    assert_eq!(deleted["d"]["message_id"], message.id);
    assert!(deleted["d"].get("text").is_none());
}

#[tokio::test]
async fn test_outsiders_receive_nothing() {
    let server = TestServer::start().await.unwrap();
    let url = server.gateway_url();
    let (mut carol, _) = GatewayClient::connect_identified(&url, &server.token(CAROL))
        .await
        .unwrap();

    let response = server
        .post_as(ALICE, "/conversations/private", &private_request(BOB))
        .await
        .unwrap();
    let conversation: ConversationBody = assert_json(response, StatusCode::CREATED).await.unwrap();
    server
        .post_as(
            ALICE,
            &format!("/conversations/{}/messages", conversation.id),
            &text_message("secret"),
        )
        .await
        .unwrap();

    carol.expect_silence(Duration::from_millis(300)).await.unwrap();
}

#[tokio::test]
async fn test_leaving_member_is_announced() {
    let server = TestServer::start().await.unwrap();
    let url = server.gateway_url();
    let (mut carol, _) = GatewayClient::connect_identified(&url, &server.token(CAROL))
        .await
        .unwrap();

    let response = server
        .post_as(ALICE, "/conversations/groups", &group_request("Trip", &[BOB, CAROL]))
        .await
        .unwrap();
    let group: ConversationBody = assert_json(response, StatusCode::CREATED).await.unwrap();
    carol.next_event("CONVERSATION_CREATE").await.unwrap();

    server
        .delete_as(BOB, &format!("/conversations/{}/members/@me", group.id))
        .await
        .unwrap();
    let removed = carol.next_event("CONVERSATION_MEMBER_REMOVE").await.unwrap();
    assert_eq!(removed["d"]["user_id"], BOB.to_string());
    assert_eq!(removed["d"]["conversation_id"], group.id);
}
