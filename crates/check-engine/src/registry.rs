//! 체커 레지스트리 — Checker trait과 고정 키 테이블
//!
//! 모든 체커는 동기 [`Checker`] trait을 구현하고, 실행기는 이를
//! `tokio::task::spawn_blocking`으로 오프로드합니다. 체커는 읽기 전용
//! 컨텍스트를 받아 발견 목록을 반환할 뿐, 결과 기록과 캐시는
//! 실행기의 몫입니다.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use relgate_core::error::CheckError;
use relgate_core::policy::ReleasePolicy;
use relgate_core::types::{Artifact, CheckStatus, Revision};

use crate::archive::ArchiveLimits;
use crate::checkers;
use crate::keyring::Keyring;

/// 체커에 전달되는 읽기 전용 실행 컨텍스트
///
/// `spawn_blocking` 클로저로 이동되므로 모든 필드를 소유합니다.
#[derive(Debug, Clone)]
pub struct CheckContext {
    /// 검사 중인 리비전
    pub revision: Revision,
    /// 리비전 파일 집합의 루트 디렉토리
    pub revision_dir: PathBuf,
    /// 검사 대상 아티팩트 (리비전 전역 검사는 None)
    pub artifact: Option<Artifact>,
    /// 리비전의 전체 상대 경로 목록 (정렬됨)
    pub all_paths: Vec<String>,
    /// 릴리스 정책
    pub policy: ReleasePolicy,
    /// 위원회 키링
    pub keyring: Arc<Keyring>,
    /// 아카이브 접근 한도
    pub limits: ArchiveLimits,
    /// 같은 (체커, 아티팩트)의 가장 최근 이전 리비전 결과 데이터
    pub prior_data: Option<serde_json::Value>,
}

impl CheckContext {
    /// 아티팩트의 절대 경로를 반환합니다.
    ///
    /// 아티팩트 없는 리비전 전역 컨텍스트에서 호출하면 안 됩니다.
    pub fn artifact_path(&self) -> Result<PathBuf, CheckError> {
        let artifact = self.artifact.as_ref().ok_or_else(|| CheckError::Invocation {
            checker: "<context>".to_owned(),
            reason: "artifact-scoped checker invoked without artifact".to_owned(),
        })?;
        Ok(self.revision_dir.join(&artifact.rel_path))
    }

    /// 아티팩트 상대 경로를 반환합니다 (전역 컨텍스트는 빈 문자열).
    pub fn rel_path(&self) -> &str {
        self.artifact.as_ref().map_or("", |a| a.rel_path.as_str())
    }
}

/// 체커가 산출하는 단일 발견
///
/// 실행기가 이를 [`relgate_core::types::CheckResult`]로 변환합니다.
#[derive(Debug, Clone)]
pub struct Finding {
    /// 대상 경로 재정의 (리비전 전역 체커가 경로별 결과를 낼 때 사용,
    /// None이면 실행기가 아티팩트 경로를 사용)
    pub primary_rel_path: Option<String>,
    /// 아카이브 멤버 범위 발견이면 멤버 경로
    pub member_rel_path: Option<String>,
    /// 상태
    pub status: CheckStatus,
    /// 메시지
    pub message: String,
    /// 체커별 추가 데이터
    pub data: serde_json::Value,
}

impl Finding {
    fn new(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            primary_rel_path: None,
            member_rel_path: None,
            status,
            message: message.into(),
            data: serde_json::Value::Null,
        }
    }

    /// success 발견을 만듭니다.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Success, message)
    }

    /// warning 발견을 만듭니다.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Warning, message)
    }

    /// failure 발견을 만듭니다.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Failure, message)
    }

    /// exception 발견을 만듭니다.
    pub fn exception(message: impl Into<String>) -> Self {
        Self::new(CheckStatus::Exception, message)
    }

    /// 멤버 경로를 설정합니다.
    pub fn for_member(mut self, member_rel_path: impl Into<String>) -> Self {
        self.member_rel_path = Some(member_rel_path.into());
        self
    }

    /// 대상 경로를 재정의합니다 (리비전 전역 체커 전용).
    pub fn for_path(mut self, primary_rel_path: impl Into<String>) -> Self {
        self.primary_rel_path = Some(primary_rel_path.into());
        self
    }

    /// 추가 데이터를 설정합니다.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// 단일 검사 단위
///
/// 구현은 순수해야 합니다: 리비전 파일과 컨텍스트만 읽고,
/// 전역 상태를 바꾸지 않습니다.
pub trait Checker: Send + Sync {
    /// 고정 체커 키 (점 구분 네임스페이스)
    fn key(&self) -> &'static str;

    /// 결과를 리비전 간에 전달할 수 있는지 여부
    fn cacheable(&self) -> bool {
        true
    }

    /// 캐시 키에 접어 넣을 정책 필드 이름
    fn cache_policy_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// 검사를 수행하고 발견 목록을 반환합니다.
    ///
    /// `Err`은 실행기에 의해 단일 exception 결과로 변환됩니다.
    fn run(&self, ctx: &CheckContext) -> Result<Vec<Finding>, CheckError>;
}

/// 키로 체커를 찾는 레지스트리
#[derive(Default)]
pub struct CheckerRegistry {
    checkers: HashMap<&'static str, Arc<dyn Checker>>,
}

impl CheckerRegistry {
    /// 빈 레지스트리를 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 표준 체커 9종이 등록된 레지스트리를 만듭니다.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(checkers::paths::PathsChecker));
        registry.register(Arc::new(checkers::hash::HashChecker));
        registry.register(Arc::new(checkers::signature::SignatureChecker));
        registry.register(Arc::new(checkers::integrity::IntegrityChecker));
        registry.register(Arc::new(checkers::structure::StructureChecker));
        registry.register(Arc::new(checkers::license_files::LicenseFilesChecker));
        registry.register(Arc::new(checkers::license_headers::LicenseHeadersChecker));
        registry.register(Arc::new(checkers::rat::RatChecker));
        registry.register(Arc::new(checkers::sbom::SbomChecker));
        registry
    }

    /// 체커를 등록합니다. 같은 키의 기존 체커는 대체됩니다.
    pub fn register(&mut self, checker: Arc<dyn Checker>) {
        self.checkers.insert(checker.key(), checker);
    }

    /// 키로 체커를 찾습니다.
    pub fn get(&self, key: &str) -> Result<Arc<dyn Checker>, CheckError> {
        self.checkers
            .get(key)
            .cloned()
            .ok_or_else(|| CheckError::UnknownChecker {
                key: key.to_owned(),
            })
    }

    /// 등록된 체커 키를 정렬하여 반환합니다.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.checkers.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// 등록된 체커 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    /// 레지스트리가 비어 있는지 반환합니다.
    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}

impl std::fmt::Debug for CheckerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckerRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkers::keys;

    #[test]
    fn standard_registry_has_nine_checkers() {
        let registry = CheckerRegistry::standard();
        assert_eq!(registry.len(), 9);
        assert_eq!(
            registry.keys(),
            vec![
                keys::ARCHIVE_INTEGRITY,
                keys::ARCHIVE_STRUCTURE,
                keys::HASH_VERIFY,
                keys::LICENSE_FILES,
                keys::LICENSE_HEADERS,
                keys::PATHS_CHECK,
                keys::RAT_SCAN,
                keys::SBOM_SCORE,
                keys::SIGNATURE_VERIFY,
            ]
        );
    }

    #[test]
    fn unknown_key_is_an_error() {
        let registry = CheckerRegistry::standard();
        assert!(matches!(
            registry.get("nope.check"),
            Err(CheckError::UnknownChecker { .. })
        ));
    }

    #[test]
    fn registered_checker_reports_its_key() {
        let registry = CheckerRegistry::standard();
        for key in registry.keys() {
            assert_eq!(registry.get(key).unwrap().key(), key);
        }
    }

    #[test]
    fn finding_builders_set_fields() {
        let finding = Finding::failure("missing header")
            .for_member("src/Foo.java")
            .with_data(serde_json::json!({"line": 1}));
        assert_eq!(finding.status, CheckStatus::Failure);
        assert_eq!(finding.member_rel_path.as_deref(), Some("src/Foo.java"));
        assert_eq!(finding.data["line"], 1);
    }
}
