//! WebSocket transport for the push endpoint
//!
//! Queued pushes are written as text frames. Text frames from the client
//! are handled exactly like POSTed messages.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::AppState;
use crate::connection::Subscription;
use crate::types::{ConnectionId, DisconnectCause, Transport};

/// Run one WebSocket channel until either side goes away
pub async fn serve(mut socket: WebSocket, state: Arc<AppState>, requested: Option<ConnectionId>) {
    let Subscription {
        connection,
        generation,
        mut receiver,
    } = match state.handler.open(requested, Transport::WebSocket) {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(error = %e, "Rejected WebSocket channel");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    let id = connection.id().clone();
    let write_timeout = state.config.write_timeout;

    // None means the session was closed or re-attached elsewhere
    let cause = loop {
        tokio::select! {
            queued = receiver.recv() => {
                let Some(message) = queued else {
                    break None;
                };
                match timeout(write_timeout, socket.send(Message::Text(message.body))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(connection = %id, error = %e, "WebSocket write failed");
                        break Some(DisconnectCause::Cancelled);
                    }
                    Err(_) => {
                        warn!(connection = %id, "WebSocket write timed out");
                        break Some(DisconnectCause::Cancelled);
                    }
                }
            }

            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = state.handler.message(Some(&id), text, Transport::WebSocket) {
                            warn!(connection = %id, error = %e, "Dropped WebSocket message");
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = socket.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Binary(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => break Some(DisconnectCause::ClosedByClient),
                    Some(Err(e)) => {
                        debug!(connection = %id, error = %e, "WebSocket error");
                        break Some(DisconnectCause::Cancelled);
                    }
                    None => break Some(DisconnectCause::Cancelled),
                }
            }
        }
    };

    match cause {
        Some(cause) => state.handler.disconnect(&connection, generation, cause),
        None => {
            let _ = socket.send(Message::Close(None)).await;
        }
    }
}
