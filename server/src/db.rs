use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use sled::Db;

use crate::error::Error;

/// Name of the tree holding every accepted input, keyed by big-endian index.
pub const INPUTS_TREE: &str = "inputs";

pub static DB: LazyLock<Db> = LazyLock::new(|| {
    if cfg!(test) {
        let db_config = sled::Config::new().temporary(true);

        db_config
            .open()
            .expect("We have filesystem permissions to write to the given db path")
    } else {
        let db_config = sled::Config::new()
            .path("./data/ledger")
            .mode(sled::Mode::HighThroughput)
            // 1 GB CACHE = 1 073 741 824 BYTES
            .cache_capacity(1024 * 1024 * 1024);

        db_config
            .open()
            .expect("We have filesystem permissions to write to the given db path")
    }
});

pub fn serialize_bytes<T: Serialize>(stuff: T) -> Result<Vec<u8>, Error> {
    Ok(bincode::serialize(&stuff)?)
}

pub fn deserialize_bytes<T: for<'de> Deserialize<'de>, B: AsRef<[u8]>>(
    bytes: B,
) -> Result<T, Error> {
    Ok(bincode::deserialize(bytes.as_ref())?)
}
