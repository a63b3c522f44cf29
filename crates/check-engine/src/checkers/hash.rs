//! `hash.verify` — 체크섬 파일 검증
//!
//! `.sha256`/`.sha512` 파일이 가리키는 아티팩트의 다이제스트를
//! 다시 계산하여 비교합니다. `hash` 단독 또는 `hash  filename`
//! 형식을 허용하고, 비교는 대소문자를 구분하지 않습니다.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::json;
use sha2::{Digest, Sha256, Sha512};

use relgate_core::error::CheckError;

use crate::registry::{CheckContext, Checker, Finding};

use super::keys;

/// 체크섬 체커
pub struct HashChecker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Sha256,
    Sha512,
}

impl Algorithm {
    fn from_rel_path(rel_path: &str) -> Option<(Self, &str)> {
        if let Some(referent) = rel_path.strip_suffix(".sha256") {
            Some((Self::Sha256, referent))
        } else {
            rel_path
                .strip_suffix(".sha512")
                .map(|referent| (Self::Sha512, referent))
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    fn hex_len(self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }

    fn digest_file(self, path: &Path, chunk_size: usize) -> std::io::Result<String> {
        let mut file = File::open(path)?;
        let mut buf = vec![0u8; chunk_size.max(1)];
        match self {
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                loop {
                    let n = file.read(&mut buf)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                Ok(hex::encode(hasher.finalize()))
            }
            Self::Sha512 => {
                let mut hasher = Sha512::new();
                loop {
                    let n = file.read(&mut buf)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buf[..n]);
                }
                Ok(hex::encode(hasher.finalize()))
            }
        }
    }
}

impl Checker for HashChecker {
    fn key(&self) -> &'static str {
        keys::HASH_VERIFY
    }

    fn run(&self, ctx: &CheckContext) -> Result<Vec<Finding>, CheckError> {
        let rel_path = ctx.rel_path().to_owned();
        let Some((algorithm, referent_rel)) = Algorithm::from_rel_path(&rel_path) else {
            return Err(CheckError::Invocation {
                checker: keys::HASH_VERIFY.to_owned(),
                reason: format!("'{rel_path}' has no recognized checksum suffix"),
            });
        };

        let checksum_path = ctx.artifact_path()?;
        let content = std::fs::read_to_string(&checksum_path).map_err(|e| CheckError::Io {
            path: rel_path.clone(),
            reason: e.to_string(),
        })?;

        let mut tokens = content.split_whitespace();
        let Some(expected) = tokens.next() else {
            return Ok(vec![Finding::failure("checksum file is empty")]);
        };
        let named_file = tokens.next();

        if expected.len() != algorithm.hex_len()
            || !expected.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Ok(vec![Finding::failure(format!(
                "malformed {} digest: expected {} hex characters",
                algorithm.name(),
                algorithm.hex_len(),
            ))]);
        }

        let referent_path = ctx.revision_dir.join(referent_rel);
        if !referent_path.is_file() {
            return Ok(vec![Finding::failure(format!(
                "referenced artifact '{referent_rel}' not found"
            ))]);
        }

        let actual = algorithm
            .digest_file(&referent_path, ctx.limits.chunk_size)
            .map_err(|e| CheckError::Io {
                path: referent_rel.to_owned(),
                reason: e.to_string(),
            })?;

        let data = json!({
            "algorithm": algorithm.name(),
            "expected": expected.to_lowercase(),
            "actual": actual,
        });

        if !actual.eq_ignore_ascii_case(expected) {
            return Ok(vec![
                Finding::failure(format!("{} digest mismatch", algorithm.name())).with_data(data),
            ]);
        }

        // 다이제스트는 맞지만 파일명 주석이 다른 파일을 가리키는 경우
        let referent_base = referent_rel.rsplit('/').next().unwrap_or(referent_rel);
        if let Some(named) = named_file {
            let named_base = named.trim_start_matches('*');
            if named_base != referent_base {
                return Ok(vec![
                    Finding::warning(format!(
                        "digest matches but checksum file names '{named_base}' instead of '{referent_base}'"
                    ))
                    .with_data(data),
                ]);
            }
        }

        Ok(vec![
            Finding::success(format!("{} digest verified", algorithm.name())).with_data(data),
        ])
    }
}
