//! `license.headers` — 소스 멤버 라이선스 헤더 검사
//!
//! 아카이브를 임시 작업 공간에 추출하고, 인식된 소스 접미사의
//! 멤버 선두 4KiB에서 Apache 헤더를 찾습니다. 생성 파일 마커가
//! 있는 멤버와 정책의 경량 제외 패턴에 맞는 멤버는 건너뜁니다.
//! 위반은 멤버 범위 failure로 기록됩니다.

use serde_json::json;
use walkdir::WalkDir;

use relgate_core::error::CheckError;

use crate::archive;
use crate::registry::{CheckContext, Checker, Finding};

use super::{
    compile_globs, has_apache_header, is_excluded, is_generated, keys, read_head,
    wants_header_check,
};

/// 라이선스 헤더 체커
pub struct LicenseHeadersChecker;

impl Checker for LicenseHeadersChecker {
    fn key(&self) -> &'static str {
        keys::LICENSE_HEADERS
    }

    fn cache_policy_fields(&self) -> &'static [&'static str] {
        &["lightweight_excludes"]
    }

    fn run(&self, ctx: &CheckContext) -> Result<Vec<Finding>, CheckError> {
        let rel_path = ctx.rel_path().to_owned();
        let archive_path = ctx.artifact_path()?;
        let excludes = compile_globs(&ctx.policy.lightweight_excludes, keys::LICENSE_HEADERS)?;

        // TempDir은 모든 종료 경로에서 drop으로 해제됨
        let workspace = tempfile::tempdir().map_err(|e| CheckError::Io {
            path: rel_path.clone(),
            reason: e.to_string(),
        })?;
        if let Err(e) = archive::extract(&archive_path, &rel_path, workspace.path(), &ctx.limits) {
            return Ok(vec![Finding::exception(format!(
                "cannot extract archive for header scan: {e}"
            ))]);
        }

        let mut findings = Vec::new();
        let mut checked = 0usize;
        for entry in WalkDir::new(workspace.path())
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let member = match entry.path().strip_prefix(workspace.path()) {
                Ok(member) => member.to_string_lossy().replace('\\', "/"),
                Err(_) => continue,
            };
            if !wants_header_check(&member) {
                continue;
            }
            if is_excluded(&excludes, &member) {
                continue;
            }
            let head = match read_head(entry.path()) {
                Ok(head) => head,
                Err(e) => {
                    findings.push(
                        Finding::exception(format!("cannot read member: {e}")).for_member(member),
                    );
                    continue;
                }
            };
            if is_generated(&head) {
                continue;
            }
            checked += 1;
            if !has_apache_header(&head) {
                findings.push(
                    Finding::failure("source member lacks an Apache license header")
                        .for_member(member),
                );
            }
        }

        if findings.is_empty() {
            findings.push(
                Finding::success("all checked source members carry license headers")
                    .with_data(json!({ "checked": checked })),
            );
        }
        Ok(findings)
    }
}
