//! Authenticated encryption of group transitions under the group secret.
use aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::{
    identifiers::{Address, GroupIdentifier},
    util::base64::{decode, Base64String},
};

use super::{gdh::GroupSecret, random_bytes};

const NONCE_LENGTH: usize = 12;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    #[error("The ciphertext is not a valid token")]
    MalformedToken,
    #[error("The transition could not be authenticated")]
    AuthenticationFailed,
    #[error("The plaintext is not valid UTF-8")]
    InvalidPlaintext,
}

fn associated_data(group: &GroupIdentifier, author: &Address) -> Vec<u8> {
    let mut aad = group.to_bytes().to_vec();
    aad.extend_from_slice(author.as_str().as_bytes());

    aad
}

/// Encrypts `text` for `group`, bound to `author`. Returns the printable
/// token that goes into a `SubmitTransition` action.
pub fn encrypt_transition(
    secret: &GroupSecret,
    group: &GroupIdentifier,
    author: &Address,
    text: &str,
) -> Result<String, CipherError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(secret.as_bytes()));
    let nonce = random_bytes::<NONCE_LENGTH>();
    let aad = associated_data(group, author);

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: text.as_bytes(),
                aad: &aad,
            },
        )
        .map_err(|_| CipherError::AuthenticationFailed)?;

    let mut token = nonce.to_vec();
    token.extend(ciphertext);

    Ok(Base64String::from_bytes(token).into_string())
}

pub fn decrypt_transition(
    secret: &GroupSecret,
    group: &GroupIdentifier,
    author: &Address,
    token: &str,
) -> Result<String, CipherError> {
    let bytes = decode(token).ok_or(CipherError::MalformedToken)?;
    if bytes.len() <= NONCE_LENGTH {
        return Err(CipherError::MalformedToken);
    }
    let (nonce, ciphertext) = bytes.split_at(NONCE_LENGTH);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(secret.as_bytes()));
    let aad = associated_data(group, author);
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| CipherError::AuthenticationFailed)?;

    String::from_utf8(plaintext).map_err(|_| CipherError::InvalidPlaintext)
}

#[cfg(test)]
mod tests {
    use crate::{
        api::group::DeliveryStamp,
        crypto::{
            gdh::{BurmesterDesmedt, KeyPrimitive, Share, SEED_LENGTH},
            identity::Identity,
        },
    };

    use super::*;

    fn two_party_secret() -> GroupSecret {
        let primitive = BurmesterDesmedt;
        let (keys, round_one): (Vec<_>, Vec<_>) = (0..2)
            .map(|_| primitive.generate(&random_bytes::<SEED_LENGTH>()))
            .unzip();
        let round_two: Vec<Share> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| primitive.combine(key, i, &round_one).expect("valid"))
            .collect();

        primitive
            .derive_secret(&keys[0], 0, &round_one, &round_two)
            .expect("valid")
    }

    #[test]
    fn transitions_decrypt_for_the_group() {
        let secret = two_party_secret();
        let group = GroupIdentifier::from(DeliveryStamp::generate());
        let author = Identity::generate().address();

        let token =
            encrypt_transition(&secret, &group, &author, "hello group").expect("encryption works");
        let text = decrypt_transition(&secret, &group, &author, &token).expect("same context");

        assert_eq!(text, "hello group", "Plaintext should be recovered");
    }

    #[test]
    fn transitions_are_bound_to_their_context() {
        let secret = two_party_secret();
        let group = GroupIdentifier::from(DeliveryStamp::generate());
        let author = Identity::generate().address();
        let token = encrypt_transition(&secret, &group, &author, "hi").expect("encryption works");

        assert_eq!(
            decrypt_transition(&secret, &group, &Identity::generate().address(), &token),
            Err(CipherError::AuthenticationFailed),
            "A transition re-attributed to another author must not decrypt"
        );
        assert_eq!(
            decrypt_transition(&two_party_secret(), &group, &author, &token),
            Err(CipherError::AuthenticationFailed),
            "Another group secret must not decrypt the transition"
        );
        assert_eq!(
            decrypt_transition(&secret, &group, &author, "short"),
            Err(CipherError::MalformedToken),
            "Truncated tokens are malformed"
        );
    }
}
