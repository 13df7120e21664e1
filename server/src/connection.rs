//! Useful traits and types for handling connections and the API

use std::{future::Future, sync::Arc};

use lib::api::connection::{
    ClientRequestId, Message, MessageWire, ServiceError as SocketError, ServiceResult,
};
use tokio::sync::mpsc;
use tracing::{debug_span, instrument, Span};

use crate::{error::Error, services::ledger::LedgerService};

/// Each socket waits for requests (in the form of `MessageWire`)
/// For each `MessageWire` received through the socket:
///  - Spawn a task handling it with a clone of the connection's sender
///  - The task answers through the sender with the same request id,
///    either a regular message or a `Message::Error`
#[derive(Debug, Clone)]
pub struct Request {
    pub sender: mpsc::UnboundedSender<MessageWire>,
    pub req_id: ClientRequestId,
    pub span: tracing::Span,
}

impl Request {
    pub fn make(
        sender: mpsc::UnboundedSender<MessageWire>,
        req_id: ClientRequestId,
        parent_span: &Span,
    ) -> Self {
        Self {
            sender,
            req_id,
            span: debug_span!(parent: parent_span, "Req", id = %req_id),
        }
    }

    #[instrument(skip_all)]
    pub fn handle(mut self, service: Arc<LedgerService>, message: Message) {
        tokio::task::spawn(async move {
            if let Err(e) = service.handle_request(&mut self, message).await {
                // The client closed the connection before we answered.
                tracing::debug!(parent: &self.span, "Request dropped: {e}");
            }
        });
    }
}

pub type RequestReceiver = mpsc::UnboundedReceiver<MessageWire>;

/// A trait to handle socket connections.
#[allow(async_fn_in_trait)]
pub trait RequestHandler: Clone + Send + 'static {
    /// Keep track of the tracing span to log things related to the request we're handling
    fn span(&self) -> &Span;

    /// Send back an error to the user.
    #[instrument(skip_all, parent = self.span())]
    #[inline]
    async fn error(&mut self, err: SocketError) -> Result<(), Error> {
        self.message(Message::Error(err)).await
    }

    /// Send a socket message to the user.
    fn message(&mut self, msg: Message) -> impl Future<Output = Result<(), Error>> + Send;

    /// Takes a function `f` returning a `ServiceResult` as the argument.
    /// Uses the connection to send the message back to the connection,
    /// depending on the `Result`, it will return a regular message or an error message.
    #[instrument(skip_all, name = "service", parent = self.span())]
    #[inline]
    async fn map_service_result<F, Req: Send>(
        &mut self,
        service: F,
        request: Req,
    ) -> Result<(), Error>
    where
        F: FnOnce(Req) -> ServiceResult + Send,
    {
        match service(request) {
            Ok(ok_msg) => self.message(ok_msg).await,
            Err(err_msg) => self.error(err_msg).await,
        }
    }
}

impl RequestHandler for Request {
    fn span(&self) -> &Span {
        &self.span
    }

    #[inline]
    async fn message(&mut self, msg: Message) -> Result<(), Error> {
        self.sender
            .send(MessageWire(self.req_id, msg))
            .map_err(|_| Error::RequestError)
    }
}
