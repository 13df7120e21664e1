use std::fmt::Display;

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};

/// Printable encoding used for every token that ends up on the ledger
/// (addresses, shares, ciphertexts).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Base64String(String);

impl Display for Base64String {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Base64String {
    pub fn inner_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Returns `None` if `s` isn't unpadded URL-safe base64.
    pub fn from_base64_str(s: &str) -> Option<Self> {
        decode(s).map(Base64String::from_bytes)
    }

    pub fn from_bytes<Bytes: AsRef<[u8]>>(bytes: Bytes) -> Self {
        Base64String(Base64UrlUnpadded::encode_string(bytes.as_ref()))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        decode(&self.0).expect("Base64String type is guaranteed to be well formed")
    }
}

/// Decodes an unpadded URL-safe base64 string.
pub fn decode(s: &str) -> Option<Vec<u8>> {
    Base64UrlUnpadded::decode_vec(s).ok()
}

/// Decodes an unpadded URL-safe base64 string into exactly `N` bytes.
pub fn decode_array<const N: usize>(s: &str) -> Option<[u8; N]> {
    decode(s)?.try_into().ok()
}
