//! Signing/encryption key persistence: generated once on first run and
//! reloaded from `data_dir` afterward, mirroring the teacher's
//! `keys.rs` CLI command's file-based key material handling.

use ember_crypto::{EncKeyPair, SignKeyPair};
use std::path::Path;

const SIGN_KEY_FILE: &str = "sign.key";
const ENC_KEY_FILE: &str = "enc.key";

pub struct NodeKeys {
    pub sign: SignKeyPair,
    pub enc: EncKeyPair,
}

impl NodeKeys {
    /// Loads existing keys from `data_dir`, generating and persisting a
    /// fresh pair if none exist yet.
    pub fn load_or_generate(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let sign_path = data_dir.join(SIGN_KEY_FILE);
        let enc_path = data_dir.join(ENC_KEY_FILE);

        let sign = if sign_path.exists() {
            SignKeyPair::from_bytes(&std::fs::read(&sign_path)?)
                .map_err(|e| anyhow::anyhow!("corrupt signing key: {e}"))?
        } else {
            let fresh = SignKeyPair::generate();
            std::fs::write(&sign_path, fresh.secret_key_bytes())?;
            fresh
        };

        let enc = if enc_path.exists() {
            EncKeyPair::from_bytes(&std::fs::read(&enc_path)?)
                .map_err(|e| anyhow::anyhow!("corrupt encryption key: {e}"))?
        } else {
            let fresh = EncKeyPair::generate();
            std::fs::write(&enc_path, fresh.secret_key_bytes())?;
            fresh
        };

        Ok(Self { sign, enc })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_then_reloads_the_same_keys() {
        let dir = std::env::temp_dir().join(format!("ember-keys-test-{}", uuid::Uuid::new_v4()));
        let first = NodeKeys::load_or_generate(&dir).unwrap();
        let second = NodeKeys::load_or_generate(&dir).unwrap();
        assert_eq!(first.sign.public_key_bytes(), second.sign.public_key_bytes());
        assert_eq!(first.enc.public_key_bytes(), second.enc.public_key_bytes());
        std::fs::remove_dir_all(&dir).ok();
    }
}
