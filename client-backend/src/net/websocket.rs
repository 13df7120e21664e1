use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use lib::api::{
    connection::Message,
    input::{Receipt, SignedInput},
    query::{Query, Report},
    server::Server,
};
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message as TungsteniteMessage};

use super::{
    connection::Connection, raw_connection::RawConnection, ConnectionError, Ledger, RequestError,
};

#[derive(Debug, Default, Clone, Copy)]
/// [`Connection`] holds all the relevant information,
/// so we keep this struct empty
pub struct WebsocketConnector;

impl WebsocketConnector {
    pub async fn connect(&self, url: &str) -> Result<Connection, ConnectionError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|_| ConnectionError::CouldNotConnect)?;

        let stream = ws_stream.with(|bytes: Vec<u8>| async move {
            Ok::<_, tokio_tungstenite::tungstenite::Error>(TungsteniteMessage::Binary(bytes.into()))
        });

        let stream = stream.filter_map(|msg| async move {
            if let Ok(TungsteniteMessage::Binary(bytes)) = msg {
                Some(bytes.to_vec())
            } else {
                None
            }
        });

        Ok(RawConnection::start(Box::pin(stream)).into())
    }
}

/// A ledger node reached over a WebSocket. The connection is opened on
/// first use and reopened whenever it was lost.
pub struct WebsocketLedger {
    server: Server,
    connector: WebsocketConnector,
    connection: Mutex<Option<Arc<Connection>>>,
}

impl WebsocketLedger {
    pub fn new(server: Server) -> Self {
        Self {
            server,
            connector: WebsocketConnector,
            connection: Mutex::new(None),
        }
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    async fn connection(&self) -> Result<Arc<Connection>, RequestError> {
        let mut guard = self.connection.lock().await;

        if let Some(connection) = guard.as_ref().filter(|conn| conn.is_open()) {
            return Ok(connection.clone());
        }

        log::debug!("Opening a connection to {}", self.server.ws_url());
        let connection = Arc::new(self.connector.connect(&self.server.ws_url()).await?);
        *guard = Some(connection.clone());

        Ok(connection)
    }

    async fn request(&self, message: Message) -> Result<Message, RequestError> {
        match self.connection().await?.request(message).await? {
            Message::Error(e) => Err(RequestError::Service(e)),
            answer => Ok(answer),
        }
    }
}

#[async_trait]
impl Ledger for WebsocketLedger {
    async fn submit(&self, input: SignedInput) -> Result<Receipt, RequestError> {
        match self.request(Message::Submit(input)).await? {
            Message::Accepted(receipt) => Ok(receipt),
            _ => Err(RequestError::UnexpectedAnswer),
        }
    }

    async fn inspect(&self, query: &Query) -> Result<Report, RequestError> {
        match self.request(Message::Inspect(query.to_json())).await? {
            Message::Report(report) => Ok(report),
            _ => Err(RequestError::UnexpectedAnswer),
        }
    }

    async fn height(&self) -> Result<u64, RequestError> {
        match self.request(Message::GetHeight).await? {
            Message::Height(height) => Ok(height),
            _ => Err(RequestError::UnexpectedAnswer),
        }
    }
}

#[cfg(all(test, feature = "integration-testing"))]
mod tests {
    use lib::api::group::GroupRecords;

    use super::*;

    #[tokio::test]
    async fn connector_works() {
        let conn = WebsocketConnector
            .connect(&Server::localhost().ws_url())
            .await
            .expect("Connection works");

        assert!(conn.is_open(), "A fresh connection should be open");
    }

    #[tokio::test]
    async fn ledger_answers_queries() {
        let ledger = WebsocketLedger::new(Server::localhost());

        let report = ledger
            .inspect(&Query::Groups)
            .await
            .expect("the ledger node is running");

        assert!(
            report.decode::<GroupRecords>().is_ok(),
            "A groups report should decode into group records"
        );
    }
}
