//! `license.files` — 루트 LICENSE/NOTICE 검사
//!
//! 아카이브 루트에 정규 Apache-2.0 본문과 일치하는 LICENSE 하나,
//! 필수 3요소(제품 행, ASF 저작권, 귀속 행)를 갖춘 NOTICE 하나가
//! 있어야 합니다. 포들링 릴리스는 DISCLAIMER 또는 DISCLAIMER-WIP도
//! 필요합니다. 비교는 공백 정규화 후 수행됩니다.

use serde_json::json;

use relgate_core::error::CheckError;

use crate::archive::{self, MemberInfo};
use crate::registry::{CheckContext, Checker, Finding};

use super::keys;

/// 정규 Apache License 2.0 본문
const CANONICAL_APACHE_LICENSE: &str = include_str!("data/apache-2.0.txt");

const LICENSE_MAX_BYTES: u64 = 4 * 1024 * 1024;

/// 라이선스 파일 체커
pub struct LicenseFilesChecker;

impl Checker for LicenseFilesChecker {
    fn key(&self) -> &'static str {
        keys::LICENSE_FILES
    }

    fn cache_policy_fields(&self) -> &'static [&'static str] {
        &["is_podling"]
    }

    fn run(&self, ctx: &CheckContext) -> Result<Vec<Finding>, CheckError> {
        let rel_path = ctx.rel_path().to_owned();
        let archive_path = ctx.artifact_path()?;

        let members = match archive::list_members(&archive_path, &rel_path, &ctx.limits) {
            Ok(members) => members,
            Err(e) => return Ok(vec![Finding::exception(e.to_string())]),
        };
        let root = match archive::root_directory(&members) {
            Ok(root) => root,
            Err(e) => {
                return Ok(vec![Finding::warning(format!(
                    "cannot locate archive root for license files: {e}"
                ))]);
            }
        };

        let mut findings = Vec::new();

        match count_at_root(&members, &root, "LICENSE") {
            0 => findings.push(Finding::failure("LICENSE missing at archive root")),
            1 => {
                let member = format!("{root}/LICENSE");
                match archive::read_member(&archive_path, &rel_path, &member, LICENSE_MAX_BYTES) {
                    Ok(Some(bytes)) => {
                        let content = String::from_utf8_lossy(&bytes);
                        if normalize(&content) != normalize(CANONICAL_APACHE_LICENSE) {
                            findings.push(
                                Finding::failure(
                                    "LICENSE does not match the canonical Apache License 2.0 text",
                                )
                                .for_member(member),
                            );
                        }
                    }
                    Ok(None) => findings.push(Finding::failure("LICENSE missing at archive root")),
                    Err(e) => findings.push(Finding::exception(e.to_string())),
                }
            }
            n => findings.push(
                Finding::failure(format!("archive contains {n} LICENSE entries at root"))
                    .for_member(format!("{root}/LICENSE")),
            ),
        }

        match count_at_root(&members, &root, "NOTICE") {
            0 => findings.push(Finding::failure("NOTICE missing at archive root")),
            1 => {
                let member = format!("{root}/NOTICE");
                match archive::read_member(&archive_path, &rel_path, &member, LICENSE_MAX_BYTES) {
                    Ok(Some(bytes)) => {
                        let content = String::from_utf8_lossy(&bytes);
                        for problem in notice_problems(&content) {
                            findings.push(Finding::failure(problem).for_member(member.clone()));
                        }
                    }
                    Ok(None) => findings.push(Finding::failure("NOTICE missing at archive root")),
                    Err(e) => findings.push(Finding::exception(e.to_string())),
                }
            }
            n => findings.push(
                Finding::failure(format!("archive contains {n} NOTICE entries at root"))
                    .for_member(format!("{root}/NOTICE")),
            ),
        }

        if ctx.policy.is_podling {
            let disclaimers = count_at_root(&members, &root, "DISCLAIMER")
                + count_at_root(&members, &root, "DISCLAIMER-WIP");
            match disclaimers {
                0 => findings.push(Finding::failure(
                    "podling release requires DISCLAIMER or DISCLAIMER-WIP at archive root",
                )),
                1 => {}
                n => findings.push(Finding::failure(format!(
                    "archive contains {n} DISCLAIMER entries at root"
                ))),
            }
        }

        if findings.is_empty() {
            findings.push(
                Finding::success("required license files present and well formed")
                    .with_data(json!({ "root": root })),
            );
        }
        Ok(findings)
    }
}

fn count_at_root(members: &[MemberInfo], root: &str, name: &str) -> usize {
    let target = format!("{root}/{name}");
    members.iter().filter(|m| m.path == target).count()
}

/// 공백 무시 비교를 위한 정규화
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// NOTICE 내용의 필수 요소 누락 목록을 반환합니다.
fn notice_problems(content: &str) -> Vec<String> {
    let mut problems = Vec::new();
    let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if !first_line.trim_start().starts_with("Apache") {
        problems.push("NOTICE first line must name the Apache product".to_owned());
    }
    if !(content.contains("Copyright") && content.contains("The Apache Software Foundation")) {
        problems.push("NOTICE lacks the ASF copyright line".to_owned());
    }
    if !content.contains("This product includes software developed at") {
        problems.push("NOTICE lacks the attribution line".to_owned());
    }
    problems
}
