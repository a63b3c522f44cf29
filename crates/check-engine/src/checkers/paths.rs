//! `paths.check` — 리비전 전역 파일 경로 규칙
//!
//! 아티팩트별 서명·체크섬 동반 파일, 금지 접미사, 닷파일, KEYS 파일,
//! 포들링 파일명 규칙을 검사합니다. 발견은 문제가 된 경로를
//! 대상 경로로 갖습니다.

use std::collections::HashSet;

use serde_json::json;

use relgate_core::error::CheckError;

use crate::classify::is_reserved_path;
use crate::registry::{CheckContext, Checker, Finding};

use super::keys;

/// 동반 메타데이터 접미사 (이 접미사의 파일은 자체 동반 파일이 필요 없음)
const COMPANION_SUFFIXES: &[&str] = &[".asc", ".sha256", ".sha512", ".sha1", ".sha", ".md5", ".sig"];

/// 금지 접미사: 약한 해시와 불명확한 서명 형식
const BANNED_SUFFIXES: &[&str] = &[".md5", ".sig"];

/// 권장하지 않는 약한 체크섬 접미사
const WEAK_SUFFIXES: &[&str] = &[".sha1", ".sha"];

/// 리비전 전역 경로 체커
pub struct PathsChecker;

impl Checker for PathsChecker {
    fn key(&self) -> &'static str {
        keys::PATHS_CHECK
    }

    // 리비전 전역 검사는 단일 파일 바이트에 결부되지 않으므로 전달하지 않음
    fn cacheable(&self) -> bool {
        false
    }

    fn run(&self, ctx: &CheckContext) -> Result<Vec<Finding>, CheckError> {
        let mut findings = Vec::new();
        let path_set: HashSet<&str> = ctx.all_paths.iter().map(String::as_str).collect();

        for rel_path in &ctx.all_paths {
            if is_reserved_path(rel_path) {
                continue;
            }
            let basename = rel_path.rsplit('/').next().unwrap_or(rel_path);

            if basename == "KEYS" {
                findings.push(
                    Finding::failure("KEYS file must not be part of a release revision")
                        .for_path(rel_path.clone()),
                );
                continue;
            }
            if basename.starts_with('.') {
                findings.push(
                    Finding::failure(format!(
                        "dotfile '{basename}' is not allowed outside the reserved metadata directory"
                    ))
                    .for_path(rel_path.clone()),
                );
                continue;
            }
            if let Some(suffix) = BANNED_SUFFIXES.iter().find(|s| rel_path.ends_with(**s)) {
                findings.push(
                    Finding::failure(format!("'{suffix}' files are not accepted"))
                        .for_path(rel_path.clone()),
                );
                continue;
            }
            if let Some(suffix) = WEAK_SUFFIXES.iter().find(|s| rel_path.ends_with(**s)) {
                findings.push(
                    Finding::warning(format!(
                        "'{suffix}' is a weak checksum, prefer .sha512 or .sha256"
                    ))
                    .for_path(rel_path.clone()),
                );
                continue;
            }

            // 여기부터는 동반 파일이 필요한 아티팩트
            if COMPANION_SUFFIXES.iter().any(|s| rel_path.ends_with(*s)) {
                continue;
            }

            if ctx.policy.is_podling && !basename.contains("incubating") {
                findings.push(
                    Finding::failure(format!(
                        "podling artifact '{basename}' must contain 'incubating' in its filename"
                    ))
                    .for_path(rel_path.clone()),
                );
            }
            if !path_set.contains(format!("{rel_path}.asc").as_str()) {
                findings.push(
                    Finding::failure("artifact has no detached signature (.asc)")
                        .for_path(rel_path.clone()),
                );
            }
            let has_checksum = path_set.contains(format!("{rel_path}.sha256").as_str())
                || path_set.contains(format!("{rel_path}.sha512").as_str());
            if !has_checksum {
                findings.push(
                    Finding::failure("artifact has no checksum file (.sha256 or .sha512)")
                        .for_path(rel_path.clone()),
                );
            }
        }

        if findings.is_empty() {
            findings.push(
                Finding::success("all revision paths conform")
                    .with_data(json!({ "paths": ctx.all_paths.len() })),
            );
        }
        Ok(findings)
    }
}
