//! 표준 체커 구현
//!
//! 각 체커는 고정된 점 구분 키를 가지며, [`crate::registry::Checker`]
//! trait을 구현합니다. 키는 저장된 결과와 무시 규칙에서 참조되므로
//! 바뀌지 않습니다.

pub mod hash;
pub mod integrity;
pub mod license_files;
pub mod license_headers;
pub mod paths;
pub mod rat;
pub mod sbom;
pub mod signature;
pub mod structure;

/// 고정 체커 키
pub mod keys {
    /// 리비전 전역 파일 경로 규칙 검사
    pub const PATHS_CHECK: &str = "paths.check";
    /// 체크섬 파일 검증
    pub const HASH_VERIFY: &str = "hash.verify";
    /// 분리 서명 검증
    pub const SIGNATURE_VERIFY: &str = "signature.verify";
    /// 아카이브 무결성 (전체 멤버 읽기)
    pub const ARCHIVE_INTEGRITY: &str = "archive.integrity";
    /// 아카이브 루트 디렉토리 구조
    pub const ARCHIVE_STRUCTURE: &str = "archive.structure";
    /// LICENSE/NOTICE 파일 검사
    pub const LICENSE_FILES: &str = "license.files";
    /// 소스 멤버 라이선스 헤더 검사
    pub const LICENSE_HEADERS: &str = "license.headers";
    /// RAT 스캔
    pub const RAT_SCAN: &str = "rat.scan";
    /// SBOM 문서 채점
    pub const SBOM_SCORE: &str = "sbom.score";
}

/// 라이선스 헤더를 찾는 파일 선두 바이트 수
pub(crate) const HEADER_PROBE_BYTES: usize = 4096;

/// 헤더 검사 대상 소스 접미사
pub(crate) const SOURCE_HEADER_SUFFIXES: &[&str] = &[
    ".rs", ".py", ".java", ".scala", ".kt", ".go", ".c", ".h", ".cc", ".cpp", ".hpp", ".js",
    ".ts", ".rb", ".sh", ".xml",
];

/// 경로가 헤더 검사 대상 소스 접미사를 갖는지 반환합니다.
pub(crate) fn wants_header_check(member_path: &str) -> bool {
    SOURCE_HEADER_SUFFIXES
        .iter()
        .any(|suffix| member_path.ends_with(suffix))
}

/// 파일 선두 내용에 Apache 라이선스 참조가 있는지 반환합니다.
pub(crate) fn has_apache_header(head: &str) -> bool {
    head.contains("Licensed to the Apache Software Foundation")
        || head.contains("Licensed under the Apache License")
        || head.contains("http://www.apache.org/licenses/LICENSE-2.0")
        || head.contains("https://www.apache.org/licenses/LICENSE-2.0")
}

/// 생성 파일 마커가 있는지 반환합니다. 생성 파일은 헤더 검사에서 제외됩니다.
pub(crate) fn is_generated(head: &str) -> bool {
    head.contains("@generated") || head.contains("DO NOT EDIT") || head.contains("Code generated")
}

/// 정책 제외 패턴 목록을 컴파일합니다. 잘못된 패턴은 실행 오류입니다.
pub(crate) fn compile_globs(
    patterns: &[String],
    checker: &'static str,
) -> Result<globset::GlobSet, relgate_core::error::CheckError> {
    use relgate_core::error::CheckError;
    let mut builder = globset::GlobSetBuilder::new();
    for pattern in patterns {
        let glob = globset::Glob::new(pattern).map_err(|e| CheckError::Invocation {
            checker: checker.to_owned(),
            reason: format!("invalid exclude pattern '{pattern}': {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| CheckError::Invocation {
        checker: checker.to_owned(),
        reason: e.to_string(),
    })
}

/// 멤버가 제외 패턴에 맞는지 반환합니다.
///
/// 패턴은 루트 디렉토리를 포함한 멤버 경로와 루트를 제거한 경로
/// 양쪽에 적용됩니다.
pub(crate) fn is_excluded(excludes: &globset::GlobSet, member: &str) -> bool {
    if excludes.is_match(member) {
        return true;
    }
    member
        .split_once('/')
        .is_some_and(|(_, rest)| excludes.is_match(rest))
}

/// 파일의 선두 4KiB를 UTF-8 손실 변환으로 읽습니다 (동기 I/O).
pub(crate) fn read_head(path: &std::path::Path) -> std::io::Result<String> {
    use std::io::Read;
    let mut file = std::fs::File::open(path)?;
    let mut buf = vec![0u8; HEADER_PROBE_BYTES];
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn header_suffix_gating() {
        assert!(wants_header_check("src/lib.rs"));
        assert!(wants_header_check("Main.java"));
        assert!(!wants_header_check("logo.png"));
        assert!(!wants_header_check("README"));
    }

    #[test]
    fn apache_header_detection() {
        assert!(has_apache_header(
            "// Licensed to the Apache Software Foundation (ASF) under one"
        ));
        assert!(has_apache_header(
            "# Licensed under the Apache License, Version 2.0"
        ));
        assert!(has_apache_header(
            " * http://www.apache.org/licenses/LICENSE-2.0"
        ));
        assert!(!has_apache_header("// Copyright (c) 2026 Example Corp"));
    }

    #[test]
    fn generated_marker_detection() {
        assert!(is_generated("// @generated by protoc"));
        assert!(is_generated("# Code generated by tool. DO NOT EDIT."));
        assert!(!is_generated("// hand written"));
    }

    #[test]
    fn read_head_caps_at_probe_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![b'x'; HEADER_PROBE_BYTES * 2]).unwrap();
        let head = read_head(file.path()).unwrap();
        assert_eq!(head.len(), HEADER_PROBE_BYTES);
    }
}
