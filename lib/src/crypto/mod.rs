//! Cryptographic building blocks: member signing identities, the group key
//! primitive, and the cipher used for transitions once a group secret exists.
use rand_core::{OsRng, RngCore};

pub mod cipher;
pub mod gdh;
pub mod identity;

#[inline]
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut array = [0u8; N];
    OsRng.fill_bytes(&mut array);

    array
}
