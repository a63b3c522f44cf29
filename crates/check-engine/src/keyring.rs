//! 위원회 키링 — 서명 검증용 공개키와 계정 바인딩
//!
//! 서명 체커는 이 키링의 키로만 서명을 검증합니다. 키는 ed25519
//! 공개키(hex 32바이트)와 이메일, 선택적 계정 uid 바인딩을 가지며,
//! TOML 파일(`[[keys]]` 테이블 배열)에서 로드됩니다.

use std::path::Path;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::Deserialize;
use tracing::info;

use relgate_core::error::CheckError;

/// 키링의 단일 공개키와 바인딩 정보
#[derive(Debug, Clone)]
pub struct KeyBinding {
    /// 공개키 hex 지문
    pub fingerprint: String,
    /// 검증용 공개키
    pub verifying_key: VerifyingKey,
    /// 키에 연결된 이메일
    pub email: String,
    /// 계정 uid 바인딩 (없으면 위원회 주소 규칙만 적용 가능)
    pub asf_uid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyringFile {
    #[serde(default)]
    keys: Vec<KeyEntry>,
}

#[derive(Debug, Deserialize)]
struct KeyEntry {
    public_key: String,
    email: String,
    #[serde(default)]
    asf_uid: Option<String>,
}

/// 위원회 키링
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    keys: Vec<KeyBinding>,
}

impl Keyring {
    /// 빈 키링을 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// hex 공개키를 키링에 추가합니다.
    pub fn add_key(
        &mut self,
        public_key_hex: &str,
        email: impl Into<String>,
        asf_uid: Option<String>,
    ) -> Result<(), CheckError> {
        let bytes = hex::decode(public_key_hex)
            .map_err(|e| CheckError::Keyring(format!("invalid public key hex: {e}")))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CheckError::Keyring("public key must be 32 bytes".to_owned()))?;
        let verifying_key = VerifyingKey::from_bytes(&array)
            .map_err(|e| CheckError::Keyring(format!("invalid public key: {e}")))?;
        self.keys.push(KeyBinding {
            fingerprint: public_key_hex.to_lowercase(),
            verifying_key,
            email: email.into(),
            asf_uid,
        });
        Ok(())
    }

    /// TOML 키링 파일을 로드합니다 (동기 I/O).
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CheckError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CheckError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let file: KeyringFile = toml::from_str(&content)
            .map_err(|e| CheckError::Keyring(format!("invalid keyring file: {e}")))?;
        let mut keyring = Self::new();
        for entry in file.keys {
            keyring.add_key(&entry.public_key, entry.email, entry.asf_uid)?;
        }
        info!(keys = keyring.len(), path = %path.display(), "keyring loaded");
        Ok(keyring)
    }

    /// 키 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// 키링이 비어 있는지 반환합니다.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// 메시지에 대한 hex 서명을 검증하고, 성공한 키 바인딩을 반환합니다.
    ///
    /// 어떤 키로도 검증되지 않으면 `None`입니다.
    pub fn verify(&self, message: &[u8], signature_hex: &str) -> Option<&KeyBinding> {
        let bytes = hex::decode(signature_hex.trim()).ok()?;
        let signature = Signature::from_slice(&bytes).ok()?;
        self.keys
            .iter()
            .find(|binding| binding.verifying_key.verify(message, &signature).is_ok())
    }
}
