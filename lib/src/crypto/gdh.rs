//! The group key primitive.
//!
//! Members treat the primitive as three capabilities: generate a key pair
//! whose public half is the round-one share, combine the complete round-one
//! list into a round-two share, and derive the group secret from both lists.
//! Everything that leaves the primitive is an opaque printable token.
//!
//! [`BurmesterDesmedt`] implements the Burmester-Desmedt conference key
//! agreement over the Ristretto group. With `a_i` the private scalar of
//! member `i` out of `n`, and all indices taken modulo `n`:
//!
//! - round one: `z_i = a_i·G`
//! - round two: `X_i = a_i·(z_{i+1} - z_{i-1})`
//! - key: `K = n·a_i·z_{i-1} + (n-1)·X_i + (n-2)·X_{i+1} + ... + X_{i+n-2}`
//!
//! which evaluates to `(a_0·a_1 + a_1·a_2 + ... + a_{n-1}·a_0)·G` for every
//! member. The secret handed out is an HKDF expansion of the encoded `K`.
use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::util::base64::{decode, decode_array, Base64String};

/// Size of the seed [`KeyPrimitive::generate`] expects.
pub const SEED_LENGTH: usize = 64;

pub const GROUP_SECRET_LENGTH: usize = 32;

const GROUP_SECRET_INFO: &[u8] = b"gdh_ledger_group_secret_v1";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    #[error("A group needs at least two members, got {0}")]
    GroupTooSmall(usize),
    #[error("Index {index} is out of range for a group of {size}")]
    IndexOutOfRange { index: usize, size: usize },
    #[error("The round one and round two lists have different lengths")]
    LengthMismatch,
    #[error("The key material could not be decoded")]
    InvalidKeyMaterial,
    #[error("Share {0} is not a valid group element")]
    InvalidShare(usize),
}

/// A public value published on the ledger, either a round-one or a
/// round-two share.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Share(String);

impl Share {
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Share {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Private key material of one member for one group. It only ever lives in
/// the member's session store; the ledger sees the derived shares.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(String);

impl KeyMaterial {
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_token(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(..)")
    }
}

/// The symmetric secret shared by every member of a completed group.
#[derive(Clone, PartialEq, Eq)]
pub struct GroupSecret([u8; GROUP_SECRET_LENGTH]);

impl GroupSecret {
    pub fn as_bytes(&self) -> &[u8; GROUP_SECRET_LENGTH] {
        &self.0
    }

    /// A short digest that can be logged or compared between members
    /// without revealing the secret.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);

        hex::encode(&digest[..8])
    }
}

impl std::fmt::Debug for GroupSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GroupSecret({})", self.fingerprint())
    }
}

/// The capability interface of a group Diffie-Hellman scheme.
pub trait KeyPrimitive: Send + Sync {
    /// Generates fresh key material from `seed` and returns it together
    /// with the round-one share to publish.
    fn generate(&self, seed: &[u8; SEED_LENGTH]) -> (KeyMaterial, Share);

    /// Computes the round-two share of the member at `own_index` from the
    /// complete round-one list.
    fn combine(
        &self,
        key: &KeyMaterial,
        own_index: usize,
        round_one: &[Share],
    ) -> Result<Share, PrimitiveError>;

    /// Derives the group secret from the complete round-one and round-two lists.
    fn derive_secret(
        &self,
        key: &KeyMaterial,
        own_index: usize,
        round_one: &[Share],
        round_two: &[Share],
    ) -> Result<GroupSecret, PrimitiveError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BurmesterDesmedt;

impl BurmesterDesmedt {
    fn decode_scalar(key: &KeyMaterial) -> Result<Scalar, PrimitiveError> {
        let bytes = decode_array::<32>(key.as_token()).ok_or(PrimitiveError::InvalidKeyMaterial)?;

        Option::<Scalar>::from(Scalar::from_canonical_bytes(bytes))
            .ok_or(PrimitiveError::InvalidKeyMaterial)
    }

    fn decode_point(shares: &[Share], index: usize) -> Result<RistrettoPoint, PrimitiveError> {
        let bytes = decode(shares[index].as_str()).ok_or(PrimitiveError::InvalidShare(index))?;

        CompressedRistretto::from_slice(&bytes)
            .ok()
            .and_then(|compressed| compressed.decompress())
            .ok_or(PrimitiveError::InvalidShare(index))
    }

    fn encode_point(point: &RistrettoPoint) -> Share {
        Share(Base64String::from_bytes(point.compress().as_bytes()).into_string())
    }

    fn check_position(own_index: usize, size: usize) -> Result<(), PrimitiveError> {
        if size < 2 {
            return Err(PrimitiveError::GroupTooSmall(size));
        }
        if own_index >= size {
            return Err(PrimitiveError::IndexOutOfRange {
                index: own_index,
                size,
            });
        }

        Ok(())
    }
}

impl KeyPrimitive for BurmesterDesmedt {
    fn generate(&self, seed: &[u8; SEED_LENGTH]) -> (KeyMaterial, Share) {
        let secret = Scalar::from_bytes_mod_order_wide(seed);
        let public = RistrettoPoint::mul_base(&secret);

        (
            KeyMaterial(Base64String::from_bytes(secret.to_bytes()).into_string()),
            Self::encode_point(&public),
        )
    }

    fn combine(
        &self,
        key: &KeyMaterial,
        own_index: usize,
        round_one: &[Share],
    ) -> Result<Share, PrimitiveError> {
        let size = round_one.len();
        Self::check_position(own_index, size)?;
        let secret = Self::decode_scalar(key)?;

        let next = Self::decode_point(round_one, (own_index + 1) % size)?;
        let previous = Self::decode_point(round_one, (own_index + size - 1) % size)?;

        Ok(Self::encode_point(&((next - previous) * secret)))
    }

    fn derive_secret(
        &self,
        key: &KeyMaterial,
        own_index: usize,
        round_one: &[Share],
        round_two: &[Share],
    ) -> Result<GroupSecret, PrimitiveError> {
        let size = round_one.len();
        Self::check_position(own_index, size)?;
        if round_two.len() != size {
            return Err(PrimitiveError::LengthMismatch);
        }
        let secret = Self::decode_scalar(key)?;

        let previous = Self::decode_point(round_one, (own_index + size - 1) % size)?;
        let mut shared = previous * (secret * Scalar::from(size as u64));

        for offset in 0..size - 1 {
            let weight = Scalar::from((size - 1 - offset) as u64);
            shared += Self::decode_point(round_two, (own_index + offset) % size)? * weight;
        }

        let hk = Hkdf::<Sha256>::new(None, shared.compress().as_bytes());
        let mut okm = [0u8; GROUP_SECRET_LENGTH];
        hk.expand(GROUP_SECRET_INFO, &mut okm)
            .expect("32 is a valid length for Sha256 to output");

        Ok(GroupSecret(okm))
    }
}
