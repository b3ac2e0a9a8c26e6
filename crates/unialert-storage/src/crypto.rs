use base64::{engine::general_purpose, Engine as _};
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::{Result, StorageError};

const KEY_LEN: usize = 32;

/// Opaque secret encryption used for channel secure settings.
///
/// The migration decrypts legacy secure settings on load and re-encrypts
/// every secure field of the generated routing tree before it is persisted.
pub trait SecretService: Send + Sync {
    /// Encrypts `plaintext`, returning a printable ciphertext.
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    /// Reverses [`SecretService::encrypt`].
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// 密钥加密服务，使用 AES-256-GCM。密文为 base64 编码的 nonce + ciphertext。
pub struct AesGcmSecrets {
    key_bytes: Vec<u8>,
}

impl AesGcmSecrets {
    /// 从密钥文件加载或自动生成
    pub fn load_or_create(key_path: &Path) -> Result<Self> {
        let key_bytes = if key_path.exists() {
            std::fs::read(key_path)?
        } else {
            let rng = SystemRandom::new();
            let mut key = vec![0u8; KEY_LEN];
            rng.fill(&mut key)
                .map_err(|_| StorageError::Crypto("failed to generate secret key".into()))?;
            if let Some(parent) = key_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(key_path, &key)?;
            // Owner-only (0600) on Unix
            #[cfg(unix)]
            {
                let perms = std::fs::Permissions::from_mode(0o600);
                std::fs::set_permissions(key_path, perms)?;
            }
            tracing::info!(path = %key_path.display(), "Generated new secret key");
            key
        };

        Self::from_key(key_bytes)
    }

    pub fn from_key(key_bytes: Vec<u8>) -> Result<Self> {
        if key_bytes.len() != KEY_LEN {
            return Err(StorageError::Crypto(format!(
                "invalid secret key length: expected {KEY_LEN} bytes, got {}",
                key_bytes.len()
            )));
        }
        Ok(Self { key_bytes })
    }

    fn key(&self) -> Result<LessSafeKey> {
        let unbound_key = UnboundKey::new(&AES_256_GCM, &self.key_bytes)
            .map_err(|_| StorageError::Crypto("invalid secret key".into()))?;
        Ok(LessSafeKey::new(unbound_key))
    }
}

impl SecretService for AesGcmSecrets {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let key = self.key()?;

        let rng = SystemRandom::new();
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill(&mut nonce_bytes)
            .map_err(|_| StorageError::Crypto("failed to generate nonce".into()))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.as_bytes().to_vec();
        key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| StorageError::Crypto("encryption failed".into()))?;

        // nonce (12 bytes) + ciphertext + tag
        let mut result = nonce_bytes.to_vec();
        result.extend_from_slice(&in_out);
        Ok(general_purpose::STANDARD.encode(&result))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let data = general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|e| StorageError::Crypto(format!("ciphertext is not base64: {e}")))?;
        if data.len() < NONCE_LEN + aead::AES_256_GCM.tag_len() {
            return Err(StorageError::Crypto("ciphertext too short".into()));
        }

        let key = self.key()?;
        let (nonce_bytes, sealed) = data.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| StorageError::Crypto("invalid nonce".into()))?;

        let mut in_out = sealed.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| StorageError::Crypto("decryption failed".into()))?;

        String::from_utf8(plaintext.to_vec()).map_err(|source| StorageError::InvalidUtf8 {
            column: "secure_settings",
            source,
        })
    }
}
