//! This where connections and requests are handled.
//!
//! [`handle_connection_socket`] is the loop where the socket waits for incoming requests
//! and processes them when it receives them. It includes a timeout/heartbeat mechanism so
//! if the user stops responding at all then their connection will close.
//!
//! It takes in a stream+sink of [`MessageWire`] though we'll probably split those in
//! the future.

use std::sync::Arc;

use futures_util::{SinkExt, Stream, StreamExt};
use lib::api::connection::{
    ClientRequestId, Message, MessageWire, ServiceError, MAX_CONNECTION_TIMEOUT,
};
use tokio::sync::mpsc;
use tracing::{event, Level};

use crate::{connection::Request, services::ledger::LedgerService};

/// Handle a socket until the client leaves or stays silent for
/// [`MAX_CONNECTION_TIMEOUT`]. Each request is answered by its own task
/// through [`Request::handle`].
pub async fn handle_connection_socket<
    Socket: Stream<Item = Result<MessageWire, ()>> + SinkExt<MessageWire> + Send + 'static,
>(
    socket: Socket,
    service: Arc<LedgerService>,
) where
    <Socket as futures_util::Sink<MessageWire>>::Error: std::marker::Send,
{
    let (mut sender, mut receiver) = socket.split();

    let span = tracing::Span::current();

    // create an mpsc receiver. the senders will be cloned and sent to each request the user is making.
    // the receiver will just loop and send back whatever to the socket
    let (req_sender, mut req_receiver) = mpsc::unbounded_channel::<MessageWire>();
    loop {
        tokio::select! {
            // client requested something, we handle it
            msg = receiver.next() => match msg {
                Some(Ok(MessageWire(_, Message::Bye))) | None => {
                    event!(Level::DEBUG, "Connection closed by user");
                    break;
                }
                Some(Ok(MessageWire(req_id, message))) => {
                    Request::make(req_sender.clone(), req_id, &span).handle(service.clone(), message);
                }
                Some(Err(())) => {
                    event!(Level::DEBUG, "Received a frame that isn't a MessageWire");
                    let _ = req_sender.send(MessageWire(
                        ClientRequestId::nil(),
                        Message::Error(ServiceError::DecodeError),
                    ));
                }
            },
            // we finished handling a request. we try to
            // send it back to the client
            Some(stuff) = req_receiver.recv() => {
                if sender.send(stuff).await.is_err() {
                    event!(Level::DEBUG, "Connection closed by user");
                    break;
                };
            },
            // if nothing happened in the connection
            // for X seconds then we shut it down
            () = tokio::time::sleep(MAX_CONNECTION_TIMEOUT) => {
                event!(Level::DEBUG, "Connection timed out");
                break;
            },
        };
    }
}
