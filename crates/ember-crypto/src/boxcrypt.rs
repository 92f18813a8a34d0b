//! X25519 + XSalsa20-Poly1305 authenticated encryption for direct messages:
//! `spec.md` §4.8 step 2 "Encrypt using X25519 + XSalsa20-Poly1305 box with
//! a random 24-byte nonce".

use crate::error::CryptoError;
use crypto_box::{
    aead::{Aead, AeadCore, OsRng},
    PublicKey, SalsaBox, SecretKey,
};

#[derive(Clone)]
pub struct EncKeyPair {
    secret: SecretKey,
}

impl EncKeyPair {
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::generate(&mut OsRng),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; 32] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: 32,
                    got: bytes.len(),
                })?;
        Ok(Self {
            secret: SecretKey::from(arr),
        })
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.secret.public_key().as_bytes().to_vec()
    }

    pub fn secret_key_bytes(&self) -> Vec<u8> {
        self.secret.to_bytes().to_vec()
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

pub struct EncBox {
    inner: SalsaBox,
}

impl EncBox {
    pub fn new(their_pk: &[u8], our_secret: &EncKeyPair) -> Result<Self, CryptoError> {
        let arr: [u8; 32] =
            their_pk
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: 32,
                    got: their_pk.len(),
                })?;
        let public = PublicKey::from(arr);
        Ok(Self {
            inner: SalsaBox::new(&public, our_secret.secret()),
        })
    }
}

/// Encrypts `plaintext`, returning `(ciphertext, nonce)` with a fresh random
/// 24-byte nonce per call.
pub fn encrypt(their_pk: &[u8], our_secret: &EncKeyPair, plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    let b = EncBox::new(their_pk, our_secret)?;
    let nonce = SalsaBox::generate_nonce(&mut OsRng);
    let ciphertext = b
        .inner
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::EncryptFailed)?;
    Ok((ciphertext, nonce.to_vec()))
}

pub fn decrypt(
    their_pk: &[u8],
    our_secret: &EncKeyPair,
    ciphertext: &[u8],
    nonce: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let b = EncBox::new(their_pk, our_secret)?;
    let nonce_arr: [u8; 24] = nonce
        .try_into()
        .map_err(|_| CryptoError::DecryptFailed)?;
    b.inner
        .decrypt(&nonce_arr.into(), ciphertext)
        .map_err(|_| CryptoError::DecryptFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_between_two_parties() {
        let alice = EncKeyPair::generate();
        let bob = EncKeyPair::generate();
        let (ct, nonce) = encrypt(&bob.public_key_bytes(), &alice, b"hello bob").unwrap();
        let pt = decrypt(&alice.public_key_bytes(), &bob, &ct, &nonce).unwrap();
        assert_eq!(pt, b"hello bob");
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let alice = EncKeyPair::generate();
        let bob = EncKeyPair::generate();
        let mallory = EncKeyPair::generate();
        let (ct, nonce) = encrypt(&bob.public_key_bytes(), &alice, b"secret").unwrap();
        assert!(decrypt(&alice.public_key_bytes(), &mallory, &ct, &nonce).is_err());
    }
}
