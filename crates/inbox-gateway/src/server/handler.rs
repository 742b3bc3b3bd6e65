//! WebSocket handler
//!
//! One task per connection drives the socket: client frames, queued events,
//! the heartbeat deadline and the supersede signal are all selected in a
//! single loop, so connection state needs no locking.

use std::future::pending;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use inbox_service::{ClientHandle, InboxEvent};
use tokio::sync::mpsc;
use tokio::time::sleep_until;

use crate::connection::Connection;
use crate::handlers::{HandlerOutcome, MessageDispatcher};
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::GatewayState;

type WsSink = SplitSink<WebSocket, Message>;

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let settings = *state.settings();
    let mut connection = Connection::new(settings.heartbeat_timeout());
    let (mut ws_sink, mut ws_stream) = socket.split();

    tracing::debug!("WebSocket connection established");

    let hello = GatewayMessage::hello(&HelloPayload::with_interval(settings.heartbeat_interval_ms));
    if send_frame(&mut ws_sink, &hello).await.is_err() {
        tracing::warn!("Failed to send Hello message");
        return;
    }

    let mut events: Option<mpsc::Receiver<InboxEvent>> = None;

    let close_code = loop {
        let deadline = connection.heartbeat_deadline();

        tokio::select! {
            incoming = ws_stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match handle_text_message(&state, &mut connection, &text) {
                        Ok(HandlerOutcome::Reply(reply)) => {
                            if send_frame(&mut ws_sink, &reply).await.is_err() {
                                break None;
                            }
                        }
                        Ok(HandlerOutcome::Identified(receiver)) => events = Some(receiver),
                        Err(code) => break Some(code),
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::debug!("Binary frames are not supported");
                    break Some(CloseCode::DecodeError);
                }
                // Pong is handled automatically by axum
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(user_id = ?connection.user_id(), "Client closed connection");
                    break None;
                }
                Some(Err(e)) => {
                    tracing::warn!(user_id = ?connection.user_id(), error = %e, "WebSocket error");
                    break None;
                }
            },
            Some(event) = next_event(&mut events) => {
                let frame = connection.dispatch(&event);
                if send_frame(&mut ws_sink, &frame).await.is_err() {
                    tracing::debug!(user_id = ?connection.user_id(), "Failed to write dispatch");
                    break None;
                }
            }
            () = sleep_until(deadline) => {
                tracing::info!(user_id = ?connection.user_id(), "Connection timed out (no heartbeat)");
                break Some(CloseCode::SessionTimeout);
            }
            () = superseded(connection.handle()) => {
                break Some(CloseCode::SessionReplaced);
            }
        }
    };

    if let Some(code) = close_code {
        tracing::debug!(user_id = ?connection.user_id(), close_code = %code, "Closing connection");
        let frame = CloseFrame {
            code: code.as_u16(),
            reason: code.description().into(),
        };
        let _ = ws_sink.send(Message::Close(Some(frame))).await;
    }
    let _ = ws_sink.close().await;

    cleanup_connection(&state, &mut connection);
}

/// Parse and dispatch one text frame, mapping failures to close codes
fn handle_text_message(
    state: &GatewayState,
    connection: &mut Connection,
    text: &str,
) -> Result<HandlerOutcome, CloseCode> {
    let result = GatewayMessage::parse(text)
        .map_err(Into::into)
        .and_then(|message| {
            tracing::trace!(op = %message.op, "Received message");
            MessageDispatcher::dispatch(state, connection, &message)
        });

    result.map_err(|e| {
        tracing::debug!(user_id = ?connection.user_id(), error = %e, "Rejected client frame");
        e.to_close_code()
    })
}

async fn send_frame(sink: &mut WsSink, message: &GatewayMessage) -> Result<(), axum::Error> {
    match message.to_json() {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode gateway frame");
            Ok(())
        }
    }
}

/// Next queued event, or never before Identify
async fn next_event(events: &mut Option<mpsc::Receiver<InboxEvent>>) -> Option<InboxEvent> {
    match events {
        Some(receiver) => receiver.recv().await,
        None => pending().await,
    }
}

/// Resolves when a newer connection replaced this one
async fn superseded(handle: Option<&ClientHandle>) {
    match handle {
        Some(handle) => handle.superseded().await,
        None => pending().await,
    }
}

/// Drop this connection's presence entry, leaving any newer one alone
fn cleanup_connection(state: &GatewayState, connection: &mut Connection) {
    if let Some(handle) = connection.take_handle() {
        let removed = state.presence().unregister(&handle);
        tracing::info!(
            user_id = %handle.user_id(),
            session_id = %handle.session_id(),
            removed,
            "Connection closed"
        );
    }
}
