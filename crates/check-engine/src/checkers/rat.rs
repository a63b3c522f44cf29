//! `rat.scan` — 릴리스 감사 스캔
//!
//! 소스 아카이브를 임시 작업 공간에 추출하고, 스캔 루트 아래의
//! 소스 멤버에서 승인된 라이선스를 찾습니다. 아카이브에 단일
//! `.rat-excludes` 파일이 있으면 그 파일의 디렉토리가 스캔 루트가
//! 되고 내용이 제외 패턴이 됩니다. `.rat-excludes`가 여럿이거나
//! 선언된 루트 밖에 파일이 있으면 스캔은 exception입니다.

use std::path::{Path, PathBuf};

use serde_json::json;
use walkdir::WalkDir;

use relgate_core::error::CheckError;

use crate::archive;
use crate::registry::{CheckContext, Checker, Finding};

use super::{
    compile_globs, has_apache_header, is_excluded, is_generated, keys, read_head,
    wants_header_check,
};

/// `.rat-excludes`가 없을 때 항상 적용되는 표준 제외 집합
const STANDARD_EXCLUDES: &[&str] = &[
    "LICENSE",
    "NOTICE",
    "DISCLAIMER",
    "DISCLAIMER-WIP",
    ".rat-excludes",
    ".gitignore",
    "*.md",
    "*.txt",
    "*.json",
    "*.lock",
    "*.svg",
    "*.png",
    "*.jpg",
    "*.gif",
    "*.ico",
];

/// RAT 스캔 체커
pub struct RatChecker;

impl Checker for RatChecker {
    fn key(&self) -> &'static str {
        keys::RAT_SCAN
    }

    fn cache_policy_fields(&self) -> &'static [&'static str] {
        &["rat_excludes"]
    }

    fn run(&self, ctx: &CheckContext) -> Result<Vec<Finding>, CheckError> {
        let rel_path = ctx.rel_path().to_owned();
        let archive_path = ctx.artifact_path()?;

        let workspace = tempfile::tempdir().map_err(|e| CheckError::Io {
            path: rel_path.clone(),
            reason: e.to_string(),
        })?;
        if let Err(e) = archive::extract(&archive_path, &rel_path, workspace.path(), &ctx.limits) {
            return Ok(vec![Finding::exception(format!(
                "cannot extract archive for rat scan: {e}"
            ))]);
        }

        let Some(root) = extracted_root(workspace.path()) else {
            return Ok(vec![Finding::exception(
                "cannot determine a single extracted root directory",
            )]);
        };

        // .rat-excludes 검색: 하나면 스캔 루트와 제외 목록을 재정의
        let marker_paths: Vec<PathBuf> = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && e.file_name() == ".rat-excludes")
            .map(|e| e.into_path())
            .collect();

        let (scan_root, exclude_patterns) = match marker_paths.as_slice() {
            [] => {
                let mut patterns: Vec<String> =
                    STANDARD_EXCLUDES.iter().map(|s| (*s).to_owned()).collect();
                patterns.extend(ctx.policy.rat_excludes.iter().cloned());
                (root.clone(), patterns)
            }
            [marker] => {
                let scan_root = marker
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.clone());
                if let Some(outside) = file_outside(&root, &scan_root) {
                    return Ok(vec![Finding::exception(format!(
                        "'{}' lies outside the scan root declared by .rat-excludes",
                        member_path(workspace.path(), &outside),
                    ))]);
                }
                let content = std::fs::read_to_string(marker).map_err(|e| CheckError::Io {
                    path: member_path(workspace.path(), marker),
                    reason: e.to_string(),
                })?;
                let mut patterns: Vec<String> = content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .map(str::to_owned)
                    .collect();
                patterns.push(".rat-excludes".to_owned());
                (scan_root, patterns)
            }
            many => {
                let listed: Vec<String> = many
                    .iter()
                    .map(|p| member_path(workspace.path(), p))
                    .collect();
                return Ok(vec![
                    Finding::exception(format!(
                        "archive contains {} .rat-excludes files",
                        listed.len()
                    ))
                    .with_data(json!({ "markers": listed })),
                ]);
            }
        };

        let excludes = compile_globs(&exclude_patterns, keys::RAT_SCAN)?;
        let mut findings = Vec::new();
        let mut scanned = 0usize;

        for entry in WalkDir::new(&scan_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let scan_rel = match entry.path().strip_prefix(&scan_root) {
                Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
                Err(_) => continue,
            };
            let basename = entry.file_name().to_string_lossy().into_owned();
            if is_excluded(&excludes, &scan_rel) || excludes.is_match(basename.as_str()) {
                continue;
            }
            if !wants_header_check(&scan_rel) {
                continue;
            }
            let head = match read_head(entry.path()) {
                Ok(head) => head,
                Err(e) => {
                    findings.push(
                        Finding::exception(format!("cannot read member: {e}"))
                            .for_member(member_path(workspace.path(), entry.path())),
                    );
                    continue;
                }
            };
            if is_generated(&head) {
                continue;
            }
            scanned += 1;
            if !has_apache_header(&head) {
                findings.push(
                    Finding::failure("member carries no approved license")
                        .for_member(member_path(workspace.path(), entry.path())),
                );
            }
        }

        if findings.is_empty() {
            findings.push(
                Finding::success("all scanned members carry approved licenses").with_data(json!({
                    "scanned": scanned,
                    "excludes": exclude_patterns.len(),
                })),
            );
        }
        Ok(findings)
    }
}

/// 추출 결과에서 단일 루트 디렉토리를 찾습니다 (`._*` 무시).
fn extracted_root(workspace: &Path) -> Option<PathBuf> {
    let mut root = None;
    for entry in std::fs::read_dir(workspace).ok()?.filter_map(Result::ok) {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("._") {
            continue;
        }
        if !entry.path().is_dir() {
            return None;
        }
        if root.is_some() {
            return None;
        }
        root = Some(entry.path());
    }
    root
}

/// 스캔 루트 밖에 있는 첫 파일을 반환합니다.
fn file_outside(root: &Path, scan_root: &Path) -> Option<PathBuf> {
    if scan_root == root {
        return None;
    }
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .find(|p| !p.starts_with(scan_root))
}

/// 작업 공간 기준 멤버 경로를 아카이브 표기로 돌려줍니다.
fn member_path(workspace: &Path, path: &Path) -> String {
    path.strip_prefix(workspace)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
