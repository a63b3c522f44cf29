//! `signature.verify` — 분리 서명 검증
//!
//! `.asc` 파일의 hex 서명을 참조 아티팩트 바이트에 대해 위원회
//! 키링으로 검증합니다. 암호학적으로 유효해도 키가 계정 uid에
//! 바인딩되어 있거나 키 이메일이 위원회 주소
//! (`private@<committee>.apache.org`)가 아니면 실패입니다.

use serde_json::json;

use relgate_core::error::CheckError;

use crate::registry::{CheckContext, Checker, Finding};

use super::keys;

/// 서명 체커
pub struct SignatureChecker;

impl Checker for SignatureChecker {
    fn key(&self) -> &'static str {
        keys::SIGNATURE_VERIFY
    }

    fn cache_policy_fields(&self) -> &'static [&'static str] {
        &["committee"]
    }

    fn run(&self, ctx: &CheckContext) -> Result<Vec<Finding>, CheckError> {
        let rel_path = ctx.rel_path().to_owned();
        let Some(referent_rel) = rel_path.strip_suffix(".asc") else {
            return Err(CheckError::Invocation {
                checker: keys::SIGNATURE_VERIFY.to_owned(),
                reason: format!("'{rel_path}' has no .asc suffix"),
            });
        };

        if ctx.keyring.is_empty() {
            return Ok(vec![Finding::exception(
                "committee keyring is empty, cannot verify signatures",
            )]);
        }

        let signature_path = ctx.artifact_path()?;
        let signature_hex =
            std::fs::read_to_string(&signature_path).map_err(|e| CheckError::Io {
                path: rel_path.clone(),
                reason: e.to_string(),
            })?;

        let referent_path = ctx.revision_dir.join(referent_rel);
        if !referent_path.is_file() {
            return Ok(vec![Finding::failure(format!(
                "referenced artifact '{referent_rel}' not found"
            ))]);
        }
        let message = std::fs::read(&referent_path).map_err(|e| CheckError::Io {
            path: referent_rel.to_owned(),
            reason: e.to_string(),
        })?;

        let Some(binding) = ctx.keyring.verify(&message, &signature_hex) else {
            return Ok(vec![Finding::failure(
                "signature does not verify against any committee key",
            )]);
        };

        let committee_address = format!("private@{}.apache.org", ctx.policy.committee);
        let trusted = binding.asf_uid.is_some() || binding.email == committee_address;
        let data = json!({
            "fingerprint": binding.fingerprint,
            "email": binding.email,
            "asf_uid": binding.asf_uid,
        });

        if trusted {
            Ok(vec![
                Finding::success("signature verified by committee key").with_data(data),
            ])
        } else {
            Ok(vec![
                Finding::failure(format!(
                    "signature is cryptographically valid but key '{}' is bound to no account and is not {committee_address}",
                    binding.fingerprint
                ))
                .with_data(data),
            ])
        }
    }
}
