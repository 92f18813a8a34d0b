//! Ed25519 sign/verify over canonical byte encodings: `spec.md` §4.2.

use crate::error::CryptoError;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;

/// An Ed25519 key pair used to sign canonical JSON bytes.
#[derive(Clone)]
pub struct SignKeyPair {
    signing_key: SigningKey,
}

impl SignKeyPair {
    pub fn generate() -> Self {
        let mut rng = OsRng;
        Self {
            signing_key: SigningKey::generate(&mut rng),
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
            signing_key: SigningKey::from_bytes(&arr),
        })
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.signing_key.verifying_key().to_bytes().to_vec()
    }

    pub fn secret_key_bytes(&self) -> Vec<u8> {
        self.signing_key.to_bytes().to_vec()
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

pub trait Signer {
    fn sign_bytes(&self, message: &[u8]) -> Vec<u8>;
}

impl Signer for SignKeyPair {
    fn sign_bytes(&self, message: &[u8]) -> Vec<u8> {
        self.sign(message)
    }
}

pub struct Verifier;

impl Verifier {
    /// Verifies `signature` over `message` under `pk_sign`. Always
    /// recomputes the comparison rather than trusting any cached digest
    /// (`spec.md` §4.2 "Verification always recomputes canonical bytes").
    pub fn verify(pk_sign: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let key_arr: [u8; 32] = pk_sign
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                got: pk_sign.len(),
            })?;
        let verifying_key =
            VerifyingKey::from_bytes(&key_arr).map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                got: pk_sign.len(),
            })?;
        let sig_arr: [u8; 64] = signature
            .try_into()
            .map_err(|_| CryptoError::MalformedSignature)?;
        let sig = Signature::from_bytes(&sig_arr);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let kp = SignKeyPair::generate();
        let msg = b"canonical bytes go here";
        let sig = kp.sign(msg);
        Verifier::verify(&kp.public_key_bytes(), msg, &sig).unwrap();
    }

    #[test]
    fn tampered_message_fails_verification() {
        let kp = SignKeyPair::generate();
        let sig = kp.sign(b"original");
        assert!(Verifier::verify(&kp.public_key_bytes(), b"tampered", &sig).is_err());
    }
}
