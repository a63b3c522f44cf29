//! `archive.structure` — 루트 디렉토리 규칙
//!
//! 소스 아카이브의 단일 루트 디렉토리는 접미사를 제거한 파일명과
//! 일치해야 합니다 (`-source`/`-src` 꼬리는 선택적). 루트가
//! `package`이면 유효한 `package.json`의 name/version으로 대신
//! 판정합니다. 구조 문제는 차단하지 않는 warning입니다.

use serde_json::json;

use relgate_core::error::{ArchiveError, CheckError};

use crate::archive;
use crate::registry::{CheckContext, Checker, Finding};

use super::keys;

const PACKAGE_JSON_MAX_BYTES: u64 = 1024 * 1024;

/// 선택적으로 제거되는 파일명 꼬리
const OPTIONAL_TAILS: &[&str] = &["-source", "-src", "_source", "_src"];

/// 아카이브 구조 체커
pub struct StructureChecker;

impl Checker for StructureChecker {
    fn key(&self) -> &'static str {
        keys::ARCHIVE_STRUCTURE
    }

    fn run(&self, ctx: &CheckContext) -> Result<Vec<Finding>, CheckError> {
        let rel_path = ctx.rel_path().to_owned();
        let archive_path = ctx.artifact_path()?;

        let members = match archive::list_members(&archive_path, &rel_path, &ctx.limits) {
            Ok(members) => members,
            // 읽기 실패의 판정은 archive.integrity의 몫
            Err(e) => return Ok(vec![Finding::exception(e.to_string())]),
        };

        let root = match archive::root_directory(&members) {
            Ok(root) => root,
            Err(e @ ArchiveError::NoRootDirectory)
            | Err(e @ ArchiveError::MultipleRootDirectories { .. }) => {
                return Ok(vec![Finding::warning(e.to_string())]);
            }
            Err(e) => return Ok(vec![Finding::exception(e.to_string())]),
        };

        let base = expected_base(&rel_path);
        let data = json!({ "root": root, "expected": base });

        if accepted_roots(&base).contains(&root) {
            return Ok(vec![
                Finding::success(format!("root directory '{root}' matches filename")).with_data(data),
            ]);
        }

        if root == "package" {
            return Ok(vec![check_package_root(
                &archive_path,
                &rel_path,
                &base,
                &root,
            )]);
        }

        Ok(vec![
            Finding::warning(format!(
                "root directory '{root}' does not match expected '{base}'"
            ))
            .with_data(data),
        ])
    }
}

/// 아카이브 파일명에서 기대 루트 이름을 얻습니다 (접미사 제거).
fn expected_base(rel_path: &str) -> String {
    let filename = rel_path.rsplit('/').next().unwrap_or(rel_path);
    for suffix in [".tar.gz", ".tgz", ".zip"] {
        if let Some(base) = filename.strip_suffix(suffix) {
            return base.to_owned();
        }
    }
    filename.to_owned()
}

/// 허용되는 루트 이름 집합: 기대 이름 자체와 꼬리 제거 변형
fn accepted_roots(base: &str) -> Vec<String> {
    let mut roots = vec![base.to_owned()];
    for tail in OPTIONAL_TAILS {
        if let Some(stripped) = base.strip_suffix(tail) {
            roots.push(stripped.to_owned());
        }
    }
    roots
}

/// `package` 루트를 `package.json`의 name/version으로 판정합니다.
fn check_package_root(
    archive_path: &std::path::Path,
    rel_path: &str,
    base: &str,
    root: &str,
) -> Finding {
    let member_path = format!("{root}/package.json");
    let bytes = match archive::read_member(archive_path, rel_path, &member_path, PACKAGE_JSON_MAX_BYTES)
    {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            return Finding::warning("'package' root has no package.json");
        }
        Err(e) => return Finding::exception(e.to_string()),
    };

    let Ok(doc) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return Finding::warning("'package' root has an unparseable package.json");
    };
    let (Some(name), Some(version)) = (doc["name"].as_str(), doc["version"].as_str()) else {
        return Finding::warning("package.json lacks name or version");
    };

    let derived = format!("{name}-{version}");
    let data = json!({ "root": root, "expected": base, "package": derived });
    if accepted_roots(base).contains(&derived) {
        Finding::success(format!(
            "'package' root accepted via package.json ({derived})"
        ))
        .with_data(data)
    } else {
        Finding::warning(format!(
            "package.json identifies '{derived}' but filename expects '{base}'"
        ))
        .with_data(data)
    }
}
