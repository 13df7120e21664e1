use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use axum::{
    extract::{ws::Message as WsMessage, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use lib::api::connection::{ClientRequestId, Message, MessageWire};
use tracing::{instrument, span, Instrument, Level};

use crate::{connection_handler::handle_connection_socket, services::ledger::LedgerService};

pub static ACTIVE_WS_CONNECTIONS_COUNTER: AtomicU64 = AtomicU64::new(0);

/// HTTP request that we will upgrade into a `WebSocket` connection
#[instrument(skip_all, name = "websocket")]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<Arc<LedgerService>>,
) -> impl IntoResponse {
    // Internally this spawns a tokio task, so we're not
    // doing it ourselves
    ws.on_upgrade(move |socket| async move {
        ACTIVE_WS_CONNECTIONS_COUNTER.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            "Opened WS connection (Active: {})",
            ACTIVE_WS_CONNECTIONS_COUNTER.load(Ordering::Acquire)
        );

        // Convert Sink<WsMessage> into a Sink<MessageWire>.
        let socket = socket.with::<MessageWire, _, _, _>(|message_wire: MessageWire| async move {
            let bytes = message_wire.to_bytes().map_err(axum::Error::new)?;
            Ok::<_, axum::Error>(WsMessage::Binary(bytes.into()))
        });

        // Convert Stream<Item = Result<WsMessage, _>> into Stream<Item = Result<MessageWire, ()>>
        let socket = socket.map(|ws_m: Result<WsMessage, _>| match ws_m {
            Ok(WsMessage::Binary(bytes)) => MessageWire::from_bytes(&bytes).map_err(|_| ()),
            Ok(WsMessage::Ping(bytes)) => Ok(MessageWire(
                ClientRequestId::nil(),
                Message::Ping(bytes.to_vec()),
            )),
            Ok(WsMessage::Close(_)) => Ok(MessageWire(ClientRequestId::nil(), Message::Bye)),
            _ => Err(()),
        });

        let ws_span = span!(Level::INFO, "WS");

        handle_connection_socket(socket, service)
            .instrument(ws_span)
            .await;

        // WS connection ended
        ACTIVE_WS_CONNECTIONS_COUNTER.fetch_sub(1, Ordering::Relaxed);
        tracing::info!(
            "Closed WS connection (Active: {})",
            ACTIVE_WS_CONNECTIONS_COUNTER.load(Ordering::Acquire)
        );
    })
}
