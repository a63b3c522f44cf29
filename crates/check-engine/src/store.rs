//! 결과 저장소 — 추가 전용 인메모리 기록과 실행 클레임
//!
//! 결과 레코드는 삭제되지 않습니다. 재실행은 기존 현재 결과를
//! superseded로 표시하고 새 레코드를 추가하여, 리비전 내에서
//! (체커, 대상 경로, 멤버 경로) 튜플당 현재 결과가 정확히 하나만
//! 남도록 유지합니다.
//!
//! 실행 클레임은 원자적입니다: 첫 취득자가 이기고, 이후 스케줄러는
//! 기존 결과를 관찰하고 실행을 건너뜁니다.

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::debug;

use relgate_core::error::StoreError;
use relgate_core::types::CheckResult;

#[derive(Debug)]
struct StoredResult {
    result: CheckResult,
    superseded: bool,
}

#[derive(Debug, Default)]
struct Inner {
    results: Vec<StoredResult>,
    claims: HashSet<String>,
}

/// 인메모리 결과 저장소
///
/// 여러 실행기가 공유할 수 있도록 내부 잠금을 사용합니다.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    inner: Mutex<Inner>,
}

impl MemoryResultStore {
    /// 빈 저장소를 만듭니다.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// 결과를 기록합니다.
    ///
    /// 같은 (릴리스, 리비전, 키 튜플)의 기존 현재 결과는
    /// superseded로 표시되어 현재 뷰에서 사라집니다.
    pub fn record(&self, result: CheckResult) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let key = (
            result.release_name.clone(),
            result.revision_number.clone(),
            result.checker.clone(),
            result.primary_rel_path.clone(),
            result.member_rel_path.clone(),
        );
        for stored in inner.results.iter_mut().filter(|s| !s.superseded) {
            let existing = &stored.result;
            if existing.release_name == key.0
                && existing.revision_number == key.1
                && existing.checker == key.2
                && existing.primary_rel_path == key.3
                && existing.member_rel_path == key.4
            {
                stored.superseded = true;
            }
        }
        inner.results.push(StoredResult {
            result,
            superseded: false,
        });
        Ok(())
    }

    /// 여러 결과를 순서대로 기록합니다.
    pub fn record_all(&self, results: Vec<CheckResult>) -> Result<(), StoreError> {
        for result in results {
            self.record(result)?;
        }
        Ok(())
    }

    /// (릴리스, 리비전, 체커, 대상 경로)의 모든 현재 결과를
    /// superseded로 표시합니다.
    ///
    /// 재실행 직전에 호출되어, 새 실행이 더 적은 멤버 결과를
    /// 내더라도 이전 멤버 결과가 현재 뷰에 남지 않게 합니다.
    pub fn clear_current(
        &self,
        release_name: &str,
        revision_number: &str,
        checker: &str,
        primary_rel_path: Option<&str>,
    ) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        let mut cleared = 0;
        for stored in inner.results.iter_mut().filter(|s| !s.superseded) {
            let r = &stored.result;
            if r.release_name == release_name
                && r.revision_number == revision_number
                && r.checker == checker
                && r.primary_rel_path.as_deref() == primary_rel_path
            {
                stored.superseded = true;
                cleared += 1;
            }
        }
        debug!(checker, cleared, "current results cleared for rerun");
        Ok(cleared)
    }

    /// 리비전의 현재 결과를 기록 순서대로 반환합니다.
    pub fn current_results(
        &self,
        release_name: &str,
        revision_number: &str,
    ) -> Result<Vec<CheckResult>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .results
            .iter()
            .filter(|s| {
                !s.superseded
                    && s.result.release_name == release_name
                    && s.result.revision_number == revision_number
            })
            .map(|s| s.result.clone())
            .collect())
    }

    /// (체커, 대상 경로)에 대한 현재 결과가 존재하는지 반환합니다.
    pub fn has_current(
        &self,
        release_name: &str,
        revision_number: &str,
        checker: &str,
        primary_rel_path: Option<&str>,
    ) -> Result<bool, StoreError> {
        let inner = self.lock()?;
        Ok(inner.results.iter().any(|s| {
            !s.superseded
                && s.result.release_name == release_name
                && s.result.revision_number == revision_number
                && s.result.checker == checker
                && s.result.primary_rel_path.as_deref() == primary_rel_path
        }))
    }

    /// 같은 릴리스의 이전 리비전에서 입력 해시가 일치하는
    /// 전달 가능한 현재 결과 집합을 찾습니다.
    ///
    /// 일치하는 리비전이 여럿이면 가장 최근 리비전의 결과를 반환합니다.
    pub fn find_forwardable(
        &self,
        release_name: &str,
        checker: &str,
        inputs_hash: &str,
        exclude_revision: &str,
    ) -> Result<Vec<CheckResult>, StoreError> {
        let inner = self.lock()?;
        let matching: Vec<&CheckResult> = inner
            .results
            .iter()
            .filter(|s| {
                !s.superseded
                    && s.result.release_name == release_name
                    && s.result.checker == checker
                    && s.result.revision_number != exclude_revision
                    && s.result.inputs_hash.as_deref() == Some(inputs_hash)
            })
            .map(|s| &s.result)
            .collect();

        // 리비전 번호는 0 채움 문자열이므로 사전식 최대가 최신
        let Some(latest) = matching
            .iter()
            .map(|r| r.revision_number.as_str())
            .max()
            .map(str::to_owned)
        else {
            return Ok(Vec::new());
        };
        Ok(matching
            .into_iter()
            .filter(|r| r.revision_number == latest)
            .cloned()
            .collect())
    }

    /// 같은 (체커, 대상 경로)의 가장 최근 이전 리비전 결과 데이터를
    /// 반환합니다. 멤버 범위 결과는 제외합니다.
    pub fn latest_prior_data(
        &self,
        release_name: &str,
        checker: &str,
        primary_rel_path: Option<&str>,
        exclude_revision: &str,
    ) -> Result<Option<serde_json::Value>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .results
            .iter()
            .filter(|s| {
                !s.superseded
                    && s.result.release_name == release_name
                    && s.result.checker == checker
                    && s.result.primary_rel_path.as_deref() == primary_rel_path
                    && s.result.member_rel_path.is_none()
                    && s.result.revision_number != exclude_revision
            })
            .max_by(|a, b| a.result.revision_number.cmp(&b.result.revision_number))
            .map(|s| s.result.data.clone()))
    }

    /// 리비전 이력 전체(superseded 포함)를 반환합니다.
    pub fn history(&self, release_name: &str) -> Result<Vec<CheckResult>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .results
            .iter()
            .filter(|s| s.result.release_name == release_name)
            .map(|s| s.result.clone())
            .collect())
    }

    /// 실행 클레임을 시도합니다. 첫 취득이면 `true`입니다.
    pub fn try_claim(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        Ok(inner.claims.insert(key.to_owned()))
    }

    /// 실행 클레임을 해제합니다.
    pub fn release_claim(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.claims.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    use relgate_core::types::CheckStatus;

    fn result(
        revision: &str,
        checker: &str,
        primary: Option<&str>,
        member: Option<&str>,
        status: CheckStatus,
        inputs_hash: Option<&str>,
    ) -> CheckResult {
        CheckResult {
            id: uuid::Uuid::new_v4().to_string(),
            release_name: "widget-1.0.0".to_owned(),
            revision_number: revision.to_owned(),
            checker: checker.to_owned(),
            primary_rel_path: primary.map(str::to_owned),
            member_rel_path: member.map(str::to_owned),
            status,
            message: "m".to_owned(),
            data: serde_json::Value::Null,
            created: SystemTime::now(),
            cached: false,
            inputs_hash: inputs_hash.map(str::to_owned),
            forwarded_from: None,
        }
    }

    #[test]
    fn record_keeps_one_current_per_key_tuple() {
        let store = MemoryResultStore::new();
        let primary = Some("a.tar.gz");
        store
            .record(result("00001", "hash.verify", primary, None, CheckStatus::Failure, None))
            .unwrap();
        store
            .record(result("00001", "hash.verify", primary, None, CheckStatus::Success, None))
            .unwrap();

        let current = store.current_results("widget-1.0.0", "00001").unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].status, CheckStatus::Success);
        // 이력에는 둘 다 남음
        assert_eq!(store.history("widget-1.0.0").unwrap().len(), 2);
    }

    #[test]
    fn member_results_have_distinct_keys() {
        let store = MemoryResultStore::new();
        let primary = Some("a.tar.gz");
        store
            .record(result(
                "00001",
                "license.headers",
                primary,
                Some("src/A.java"),
                CheckStatus::Failure,
                None,
            ))
            .unwrap();
        store
            .record(result(
                "00001",
                "license.headers",
                primary,
                Some("src/B.java"),
                CheckStatus::Failure,
                None,
            ))
            .unwrap();
        assert_eq!(store.current_results("widget-1.0.0", "00001").unwrap().len(), 2);
    }

    #[test]
    fn clear_current_hides_stale_member_results() {
        let store = MemoryResultStore::new();
        let primary = Some("a.tar.gz");
        store
            .record(result(
                "00001",
                "license.headers",
                primary,
                Some("src/A.java"),
                CheckStatus::Failure,
                None,
            ))
            .unwrap();
        store
            .record(result(
                "00001",
                "license.headers",
                primary,
                Some("src/B.java"),
                CheckStatus::Failure,
                None,
            ))
            .unwrap();

        let cleared = store
            .clear_current("widget-1.0.0", "00001", "license.headers", primary)
            .unwrap();
        assert_eq!(cleared, 2);

        // 재실행은 A.java만 다시 실패 처리
        store
            .record(result(
                "00001",
                "license.headers",
                primary,
                Some("src/A.java"),
                CheckStatus::Failure,
                None,
            ))
            .unwrap();
        let current = store.current_results("widget-1.0.0", "00001").unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].member_rel_path.as_deref(), Some("src/A.java"));
    }

    #[test]
    fn forwardable_matches_inputs_hash_from_earlier_revision() {
        let store = MemoryResultStore::new();
        let primary = Some("a.tar.gz");
        store
            .record(result(
                "00001",
                "archive.integrity",
                primary,
                None,
                CheckStatus::Success,
                Some("blake3:aaa"),
            ))
            .unwrap();

        let hits = store
            .find_forwardable("widget-1.0.0", "archive.integrity", "blake3:aaa", "00002")
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].revision_number, "00001");

        // 해시가 다르면 미스
        assert!(
            store
                .find_forwardable("widget-1.0.0", "archive.integrity", "blake3:bbb", "00002")
                .unwrap()
                .is_empty()
        );
        // 같은 리비전은 제외
        assert!(
            store
                .find_forwardable("widget-1.0.0", "archive.integrity", "blake3:aaa", "00001")
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn forwardable_prefers_latest_matching_revision() {
        let store = MemoryResultStore::new();
        let primary = Some("a.tar.gz");
        for revision in ["00001", "00002"] {
            store
                .record(result(
                    revision,
                    "archive.integrity",
                    primary,
                    None,
                    CheckStatus::Success,
                    Some("blake3:aaa"),
                ))
                .unwrap();
        }
        let hits = store
            .find_forwardable("widget-1.0.0", "archive.integrity", "blake3:aaa", "00003")
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].revision_number, "00002");
    }

    #[test]
    fn latest_prior_data_picks_most_recent_revision() {
        let store = MemoryResultStore::new();
        let primary = Some("a.cdx.json");
        for (revision, components) in [("00001", 3), ("00002", 5)] {
            let mut r = result("x", "sbom.score", primary, None, CheckStatus::Success, None);
            r.revision_number = revision.to_owned();
            r.data = serde_json::json!({ "components": components });
            store.record(r).unwrap();
        }
        let data = store
            .latest_prior_data("widget-1.0.0", "sbom.score", primary, "00003")
            .unwrap()
            .unwrap();
        assert_eq!(data["components"], 5);

        // 자기 리비전은 제외
        let data = store
            .latest_prior_data("widget-1.0.0", "sbom.score", primary, "00002")
            .unwrap()
            .unwrap();
        assert_eq!(data["components"], 3);
    }

    #[test]
    fn claims_are_first_writer_wins() {
        let store = MemoryResultStore::new();
        assert!(store.try_claim("00001|hash.verify|a.sha512").unwrap());
        assert!(!store.try_claim("00001|hash.verify|a.sha512").unwrap());
        store.release_claim("00001|hash.verify|a.sha512").unwrap();
        assert!(store.try_claim("00001|hash.verify|a.sha512").unwrap());
    }

    #[test]
    fn has_current_distinguishes_primary_path() {
        let store = MemoryResultStore::new();
        store
            .record(result(
                "00001",
                "hash.verify",
                Some("a.sha512"),
                None,
                CheckStatus::Success,
                None,
            ))
            .unwrap();
        assert!(
            store
                .has_current("widget-1.0.0", "00001", "hash.verify", Some("a.sha512"))
                .unwrap()
        );
        assert!(
            !store
                .has_current("widget-1.0.0", "00001", "hash.verify", Some("b.sha512"))
                .unwrap()
        );
    }
}
