//! A generic connection handler using a stream.
use std::{sync::Arc, time::Duration};

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use lib::api::connection::{ClientRequestId, Message, MessageWire};
use tokio::{
    sync::{mpsc, oneshot},
    time::sleep,
};

use tokio_util::sync::CancellationToken;

use super::RequestError;

type RequestHashmap = Arc<scc::HashMap<ClientRequestId, oneshot::Sender<Message>>>;

const HEARTBEAT_PAYLOAD: [u8; 2] = [72, 66];
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug)]
/// A low-level "raw" connection, that just handles bytes in, bytes out.
/// This struct is not aware of what method is used to connect or
/// to what server it is connected.
pub struct RawConnection {
    pub request_sender: mpsc::Sender<Vec<u8>>,
    pub requests: RequestHashmap,
    pub cancellation_token: CancellationToken,
}

impl RawConnection {
    pub fn start<S: Stream<Item = Vec<u8>> + Sink<Vec<u8>> + Send + 'static + Unpin>(
        stream: S,
    ) -> Self {
        let (mut sender, mut receiver) = stream.split();
        let (tx, mut rx) = mpsc::channel(16);
        let cancellation_token = CancellationToken::new();

        let cancellation_token_clone = cancellation_token.clone();

        let requests: RequestHashmap = scc::HashMap::new().into();
        let requests_clone: RequestHashmap = requests.clone();
        tokio::task::spawn(async move {
            loop {
                tokio::select! {
                    // Received a request from the ledger client,
                    // send it to the stream
                    Some(req) = rx.recv() => {
                        if sender.send(req).await.is_err() {
                            log::error!("Connection unexpectedly closed when trying to send request message");
                            rx.close();
                            return;
                        }
                    },
                    // Received a response from the connection
                    bytes = receiver.next() => {
                        let Some(bytes) = bytes else {
                            log::info!("The ledger closed the connection");
                            cancellation_token_clone.cancel();
                            // Wake up every pending requester.
                            requests_clone.clear_async().await;
                            return;
                        };
                        let Ok(MessageWire(request_id, message)) = MessageWire::from_bytes(&bytes) else {
                            log::error!("Received a message but couldn't process it");
                            continue;
                        };

                        if request_id.is_nil() {
                            // Not a heartbeat?
                            if message != Message::Pong(HEARTBEAT_PAYLOAD.to_vec()) {
                                log::warn!("A message with no RequestId came around, but wasn't a heartbeat: {message:?}");
                            }
                        } else if let Some((_, tx)) = requests_clone.remove_async(&request_id).await {
                            log::debug!("Received response for request {request_id:?}. Sending back to requester");
                            // if request got dropped, ignore result
                            let _ = tx.send(message);
                        }
                    },
                    // If nothing happens for a while (meaning the other futures in the
                    // tokio::select didn't get chosen), we send a heartbeat ping to let
                    // the server know we're still alive and kicking
                    () = sleep(HEARTBEAT_INTERVAL) => {
                        log::debug!("Nothing happened on connection for {HEARTBEAT_INTERVAL:?}, sending heartbeat");
                        let Ok(ping) = MessageWire(ClientRequestId::nil(), Message::Ping(HEARTBEAT_PAYLOAD.to_vec())).to_bytes() else {
                            return;
                        };
                        if sender.send(ping).await.is_err() {
                            log::warn!("Connection channel sender errored out, so we're closing it.");
                            return;
                        }
                    }
                    () = cancellation_token_clone.cancelled() => {
                        return;
                    },
                    else => {
                        return;
                    }
                }
            }
        });

        Self {
            request_sender: tx,
            requests,
            cancellation_token,
        }
    }

    pub fn is_open(&self) -> bool {
        !(self.cancellation_token.is_cancelled() || self.request_sender.is_closed())
    }

    pub fn close(&self) {
        self.cancellation_token.cancel();
    }

    /// Tries to send a message to the mpsc channel and waits for the answer
    /// carrying the same request id.
    /// Returns Err if the connection/stream went down
    pub async fn request(&self, wire: MessageWire) -> Result<Message, RequestError> {
        let (tx, rx) = oneshot::channel::<Message>();
        let request_id = wire.0;
        let bytes = wire.to_bytes().map_err(|_| RequestError::UnexpectedAnswer)?;
        let _ = self.requests.insert_async(request_id, tx).await;

        self.request_sender.send(bytes).await.map_err(|_| {
            log::info!("Connection: Tried sending request {request_id:?} but connection was down");

            RequestError::SendConnectionClosed
        })?;

        let Ok(resp) = rx.await else {
            return Err(RequestError::ReceiveConnectionClosed);
        };

        Ok(resp)
    }

    /// Forgets a request whose answer will not be awaited anymore.
    pub async fn abandon(&self, request_id: &ClientRequestId) {
        self.requests.remove_async(request_id).await;
    }
}

impl Drop for RawConnection {
    fn drop(&mut self) {
        self.close();
    }
}
