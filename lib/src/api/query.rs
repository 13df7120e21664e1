use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{error::ProtoError, identifiers::GroupIdentifier};

/// A read-only question for the ledger application.
/// Serialized as `{"method":"groups"}` or `{"method":"transitions","id":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Query {
    Groups,
    Transitions { id: GroupIdentifier },
}

impl Query {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("Queries only contain strings")
    }

    pub fn from_json(json: &str) -> Result<Self, ProtoError> {
        serde_json::from_str(json).map_err(|_| ProtoError)
    }
}

/// The answer to a [`Query`]. The payload is the `0x` prefixed hex
/// encoding of a UTF-8 JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub payload: String,
}

impl Report {
    pub fn from_value<T: Serialize>(value: &T) -> Self {
        let json = serde_json::to_vec(value).expect("Report values serialize to JSON");

        Self {
            payload: format!("0x{}", hex::encode(json)),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ProtoError> {
        let hex = self.payload.strip_prefix("0x").unwrap_or(&self.payload);
        let bytes = hex::decode(hex).map_err(|_| ProtoError)?;

        serde_json::from_slice(&bytes).map_err(|_| ProtoError)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn queries_use_lowercase_methods() {
        let id = GroupIdentifier::from_str("0192e7a4-5b6c-7d8e-9f00-112233445566").expect("valid");

        assert_eq!(Query::Groups.to_json(), r#"{"method":"groups"}"#);
        assert_eq!(
            Query::from_json(r#"{"method":"transitions","id":"0192e7a4-5b6c-7d8e-9f00-112233445566"}"#),
            Ok(Query::Transitions { id })
        );
    }

    #[test]
    fn report_payload_is_hex_json() {
        let report = Report::from_value(&vec!["a", "b"]);

        assert!(report.payload.starts_with("0x"), "Payloads are 0x prefixed");
        assert_eq!(
            report.decode::<Vec<String>>(),
            Ok(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            Report {
                payload: "0xzz".to_string()
            }
            .decode::<Vec<String>>(),
            Err(ProtoError),
            "Invalid hex is malformed"
        );
    }
}
