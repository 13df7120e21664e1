use ed25519_dalek::SigningKey;
use signature::Signer;

use crate::{api::input::SignedInput, identifiers::Address};

use super::random_bytes;

/// A member's long-lived signing identity. Its verifying key is the
/// member's [`Address`], and every input it appends to the log is signed
/// with it so the log knows who the sender is.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    pub fn generate() -> Self {
        Self::from_bytes(random_bytes::<32>())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&bytes),
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn address(&self) -> Address {
        Address::from_verifying_key(&self.signing_key.verifying_key())
    }

    pub fn sign_input(&self, payload: Vec<u8>) -> SignedInput {
        let signature = self.signing_key.sign(&payload).to_vec();

        SignedInput {
            sender: self.address(),
            payload,
            signature,
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_survives_persistence() {
        let identity = Identity::generate();
        let restored = Identity::from_bytes(identity.to_bytes());

        assert_eq!(identity.address(), restored.address());
    }

    #[test]
    fn signed_inputs_verify() {
        let identity = Identity::generate();
        let input = identity.sign_input(b"{\"method\":\"CreateGroup\"}".to_vec());

        let (sender, _) = input.verify().expect("signature is valid");
        assert_eq!(sender, &identity.address());

        let mut forged = input.clone();
        forged.sender = Identity::generate().address();
        assert!(
            forged.verify().is_err(),
            "An input claiming another sender should not verify"
        );
    }
}
