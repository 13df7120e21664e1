use std::ops::Deref;

use lib::api::connection::{Message, MessageWire, MIN_REQUEST_TIMEOUT};
use tokio::time::timeout;

use super::{raw_connection::RawConnection, RequestError};

const CONNECTION_RETRY_COUNT: usize = 1;

/// A struct encapsulating [`RawConnection`] (and derefs as one) that adds
/// a per-request timeout, and retries requests that are safe to repeat.
pub struct Connection {
    inner: RawConnection,
}

/// Reads can be repeated freely. A submission is never repeated here: the
/// caller decides whether to resubmit after re-reading the log.
fn is_retriable(message: &Message) -> bool {
    matches!(message, Message::Inspect(_) | Message::GetHeight | Message::Ping(_))
}

impl Connection {
    pub async fn request(&self, message: Message) -> Result<Message, RequestError> {
        let attempts = if is_retriable(&message) {
            1 + CONNECTION_RETRY_COUNT
        } else {
            1
        };

        for attempt in 1..=attempts {
            let wire = MessageWire::from(message.clone());
            let request_id = wire.0;

            match timeout(MIN_REQUEST_TIMEOUT, self.inner.request(wire)).await {
                Ok(response) => return response,
                Err(_) => {
                    log::debug!("Request {request_id} timed out (attempt {attempt}/{attempts})");
                    self.inner.abandon(&request_id).await;
                }
            }
        }

        Err(RequestError::Timeout)
    }
}

impl From<RawConnection> for Connection {
    fn from(value: RawConnection) -> Self {
        Self { inner: value }
    }
}

impl Deref for Connection {
    type Target = RawConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
