//! `archive.integrity` — 아카이브 전체 읽기
//!
//! 모든 멤버 바이트를 끝까지 읽어 손상·잘림·멤버 수 한도 초과를
//! 드러냅니다. 읽기에 성공하면 멤버 수와 총 크기를 기록합니다.

use serde_json::json;

use relgate_core::error::CheckError;

use crate::archive;
use crate::registry::{CheckContext, Checker, Finding};

use super::keys;

/// 아카이브 무결성 체커
pub struct IntegrityChecker;

impl Checker for IntegrityChecker {
    fn key(&self) -> &'static str {
        keys::ARCHIVE_INTEGRITY
    }

    fn run(&self, ctx: &CheckContext) -> Result<Vec<Finding>, CheckError> {
        let rel_path = ctx.rel_path().to_owned();
        let archive_path = ctx.artifact_path()?;

        match archive::list_members(&archive_path, &rel_path, &ctx.limits) {
            Ok(members) => {
                let total_size: u64 = members.iter().map(|m| m.size).sum();
                Ok(vec![
                    Finding::success("every archive member read successfully").with_data(json!({
                        "members": members.len(),
                        "total_size": total_size,
                    })),
                ])
            }
            Err(e) => Ok(vec![Finding::failure(e.to_string())]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use relgate_core::policy::ReleasePolicy;
    use relgate_core::types::{Artifact, CheckStatus, Classification, Revision};

    use crate::archive::ArchiveLimits;
    use crate::keyring::Keyring;

    fn ctx(dir: &Path, rel_path: &str, limits: ArchiveLimits) -> CheckContext {
        CheckContext {
            revision: Revision::new("widget", "1.0.0", "00001"),
            revision_dir: PathBuf::from(dir),
            artifact: Some(Artifact {
                rel_path: rel_path.to_owned(),
                classification: Classification::Source,
            }),
            all_paths: Vec::new(),
            policy: ReleasePolicy::default(),
            keyring: Arc::new(Keyring::new()),
            limits,
            prior_data: None,
        }
    }

    fn write_tar_gz(dir: &Path, name: &str, files: &[(&str, &[u8])]) {
        let file = std::fs::File::create(dir.join(name)).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *content).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn intact_archive_succeeds_with_member_count() {
        let dir = tempfile::tempdir().unwrap();
        write_tar_gz(
            dir.path(),
            "a.tar.gz",
            &[
                ("widget/LICENSE", b"l".as_slice()),
                ("widget/src/lib.rs", b"code".as_slice()),
            ],
        );
        let findings = IntegrityChecker
            .run(&ctx(dir.path(), "a.tar.gz", ArchiveLimits::default()))
            .unwrap();
        assert_eq!(findings[0].status, CheckStatus::Success);
        assert_eq!(findings[0].data["members"], 2);
        assert_eq!(findings[0].data["total_size"], 5);
    }

    #[test]
    fn corrupted_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("bad.tar.gz")).unwrap();
        file.write_all(b"\x1f\x8b garbage that is not gzip").unwrap();

        let findings = IntegrityChecker
            .run(&ctx(dir.path(), "bad.tar.gz", ArchiveLimits::default()))
            .unwrap();
        assert_eq!(findings[0].status, CheckStatus::Failure);
    }

    #[test]
    fn member_limit_overflow_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_tar_gz(
            dir.path(),
            "a.tar.gz",
            &[
                ("widget/a", b"1".as_slice()),
                ("widget/b", b"2".as_slice()),
            ],
        );
        let limits = ArchiveLimits {
            max_members: 1,
            ..Default::default()
        };
        let findings = IntegrityChecker
            .run(&ctx(dir.path(), "a.tar.gz", limits))
            .unwrap();
        assert_eq!(findings[0].status, CheckStatus::Failure);
        assert!(findings[0].message.contains("too many members"));
    }
}
