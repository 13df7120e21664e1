use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_LEDGER_PORT, LOCALHOST_DOMAIN},
    error::ProtoError,
};

/// Where a ledger node can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Server {
    pub fn localhost() -> Self {
        Self {
            host: LOCALHOST_DOMAIN.to_string(),
            port: DEFAULT_LEDGER_PORT,
        }
    }

    pub fn url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.url())
    }

    /// Parses `host` or `host:port`. The default port is used when none
    /// is given.
    pub fn parse(s: &str) -> Result<Self, ProtoError> {
        let s = s.trim();
        let (host, port) = match s.rsplit_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().map_err(|_| ProtoError)?),
            None => (s, DEFAULT_LEDGER_PORT),
        };

        if host.is_empty() {
            return Err(ProtoError);
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::localhost()
    }
}
