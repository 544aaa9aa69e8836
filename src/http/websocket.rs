//! WebSocket endpoints.
//!
//! # Endpoints
//! - `GET /ws`: echo every text frame back
//! - `GET /ws/{client_id}`: chat room backed by the connection registry
//! - `GET /items/{item_id}/ws`: echo gated on a session cookie or `token` query
//!
//! # Data Flow
//! ```text
//! Client ──frames──▶ reader loop ──▶ ConnectionRegistry::send / broadcast
//!                                          │
//! Client ◀──frames── writer task ◀── per-connection queue
//! ```
//!
//! # Design Decisions
//! - Text frames only; binary and ping/pong are ignored
//! - The reader holds the Registration, so every exit path disconnects

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{header, HeaderMap},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{Instrument, Span};

use crate::http::server::AppState;
use crate::registry::{BroadcastReport, ClientId, Connection};

pub async fn echo_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(echo_session)
}

async fn echo_session(mut socket: WebSocket) {
    while let Some(frame) = socket.recv().await {
        match frame {
            Ok(Message::Text(text)) => {
                let reply = format!("Message text was: {}", text.as_str());
                if socket.send(Message::Text(reply.into())).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "Echo socket error");
                break;
            }
        }
    }
}

pub async fn chat_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let client = client_id
        .parse::<ClientId>()
        .unwrap_or_else(|never| match never {});
    let span = tracing::debug_span!(
        "chat",
        client_id = %client,
        connection_id = tracing::field::Empty,
        pruned = tracing::field::Empty
    );
    ws.on_upgrade(move |socket| chat_session(socket, client, state).instrument(span))
}

async fn chat_session(socket: WebSocket, client: ClientId, state: AppState) {
    let settings = state.config.load().websocket.clone();
    let (conn, mut outbox) = Connection::channel(client.clone(), settings.send_queue, settings.send_timeout());
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(text) = outbox.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });
    let writer_abort = writer.abort_handle();

    let registration = state.registry.register(conn.clone());
    let span = Span::current();
    span.record("connection_id", tracing::field::display(conn.id()));
    tracing::info!(connection_id = %conn.id(), client_id = %client, "Chat client connected");
    let mut pruned = 0;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let personal = format!("You wrote: {}", text.as_str());
                if let Err(e) = state.registry.send(&conn, &personal).await {
                    tracing::debug!(error = %e, "Chat client stopped reading");
                    break;
                }
                let message = format!("Client #{} says: {}", client, text.as_str());
                let report = state.registry.broadcast(&message).await;
                note_pruned(&span, &mut pruned, report);
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(connection_id = %conn.id(), error = %e, "Chat socket error");
                break;
            }
        }
    }

    drop(registration);
    let report = state
        .registry
        .broadcast(&format!("Client #{} left the chat", client))
        .await;
    note_pruned(&span, &mut pruned, report);

    // The writer drains once the last sender clone is gone.
    drop(conn);
    if tokio::time::timeout(settings.send_timeout(), writer).await.is_err() {
        writer_abort.abort();
    }
    tracing::info!(client_id = %client, "Chat client disconnected");
}

/// Count connections a broadcast from this session pruned.
fn note_pruned(span: &Span, pruned: &mut usize, report: BroadcastReport) {
    if report.failures.is_empty() {
        return;
    }
    *pruned += report.failures.len();
    span.record("pruned", *pruned);
    for failure in &report.failures {
        tracing::debug!(
            attempted = report.attempted(),
            delivered = report.delivered,
            error = %failure,
            "Broadcast pruned a connection"
        );
    }
}

#[derive(Debug, Deserialize)]
pub struct ItemSocketQuery {
    pub token: Option<String>,
    pub q: Option<i64>,
}

pub async fn item_socket_handler(
    ws: WebSocketUpgrade,
    Path(item_id): Path<String>,
    Query(query): Query<ItemSocketQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let credential = session_cookie(&headers).or(query.token);
    ws.on_upgrade(move |socket| item_session(socket, item_id, query.q, credential))
}

async fn item_session(mut socket: WebSocket, item_id: String, q: Option<i64>, credential: Option<String>) {
    let Some(credential) = credential else {
        tracing::debug!(item_id = %item_id, "Item socket without session or token");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: Utf8Bytes::from_static("session cookie or token required"),
            })))
            .await;
        return;
    };

    while let Some(frame) = socket.recv().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let mut replies = vec![format!("Session cookie or query token value is: {}", credential)];
        if let Some(q) = q {
            replies.push(format!("Query parameter q is: {}", q));
        }
        replies.push(format!("Message text was: {}, for item ID: {}", text.as_str(), item_id));

        for reply in replies {
            if socket.send(Message::Text(reply.into())).await.is_err() {
                return;
            }
        }
    }
}

/// Value of the `session` cookie, if any.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == "session").then(|| value.to_string())
        })
}
