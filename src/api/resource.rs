//! The managed echo resource: GET, POST and DELETE on the endpoint path

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::StringRejection, Query, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use serde::Deserialize;

use super::{websocket, ApiError, AppState, UUID_HEADER};
use crate::connection::{Connection, Subscription};
use crate::handler::ConnectionHandler;
use crate::types::{ConnectionId, DisconnectCause, Transport};

/// Query parameters accepted on the endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ResourceParams {
    /// Id of an existing session
    pub uuid: Option<String>,
}

/// Session id from the `X-Push-Uuid` header, falling back to `?uuid=`.
/// Malformed ids are ignored.
fn requested_id(headers: &HeaderMap, params: &ResourceParams) -> Option<ConnectionId> {
    if let Some(header) = headers.get(UUID_HEADER) {
        if let Ok(raw) = header.to_str() {
            return ConnectionId::parse(raw);
        }
    }
    params.uuid.as_deref().and_then(ConnectionId::parse)
}

/// GET - open a push channel
pub async fn open_channel(
    ws: Option<WebSocketUpgrade>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ResourceParams>,
) -> Response {
    let requested = requested_id(&headers, &params);

    if let Some(ws) = ws {
        return ws.on_upgrade(move |socket| websocket::serve(socket, state, requested));
    }

    match state.handler.open(requested, Transport::Sse) {
        Ok(subscription) => sse_response(&state, subscription),
        Err(e) => e.into_response(),
    }
}

/// Disconnects the session when its SSE stream is dropped
struct DisconnectGuard {
    handler: Arc<ConnectionHandler>,
    connection: Arc<Connection>,
    generation: u64,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        // No-op if the session was already closed or has re-attached
        self.handler
            .disconnect(&self.connection, self.generation, DisconnectCause::Cancelled);
    }
}

fn sse_response(state: &AppState, subscription: Subscription) -> Response {
    let Subscription {
        connection,
        generation,
        mut receiver,
    } = subscription;
    let id = connection.id().to_string();
    let session = Arc::clone(&connection);
    let guard = DisconnectGuard {
        handler: Arc::clone(&state.handler),
        connection,
        generation,
    };

    let open_id = id.clone();
    let stream = async_stream::stream! {
        let _guard = guard;

        // Tells the client which id to send with its POSTs
        yield Ok::<_, Infallible>(Event::default().event("open").data(open_id));

        while let Some(message) = receiver.recv().await {
            yield Ok(Event::default()
                .id(session.next_event_id().to_string())
                .event("message")
                .data(sse_data(&message.body)));
        }
    };

    let sse = Sse::new(stream).keep_alive(KeepAlive::default().interval(state.config.keep_alive));
    ([(UUID_HEADER, id)], sse).into_response()
}

/// SSE cannot carry bare carriage returns
fn sse_data(body: &str) -> String {
    body.replace("\r\n", "\n").replace('\r', "\n")
}

/// POST - relay a message
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ResourceParams>,
    body: Result<String, StringRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return ApiError::from_rejection(rejection),
    };
    let sender = requested_id(&headers, &params);

    match state.handler.message(sender.as_ref(), body, Transport::Http) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE - client-initiated close
pub async fn close_channel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ResourceParams>,
) -> Response {
    let Some(id) = requested_id(&headers, &params) else {
        let error = ApiError::bad_request("missing or malformed connection id");
        return (StatusCode::BAD_REQUEST, Json(error)).into_response();
    };

    match state.handler.close(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
