//! 검사 실행기 — 스케줄, 클레임, 캐시 전달, 결과 기록
//!
//! 리비전 디렉토리의 파일 목록을 수집하고, 분류기가 산출한 계획의
//! 각 검사를 실행합니다. 체커는 동기이므로 실제 실행은
//! `tokio::task::spawn_blocking`으로 오프로드됩니다.
//!
//! 실행 규약:
//! - (체커, 대상 경로)에 현재 결과가 있으면 실행을 건너뜁니다.
//! - 실행 전 클레임을 취득하며, 취득 실패는 다른 실행자가 먼저
//!   잡은 것이므로 건너뜁니다.
//! - 캐시 가능한 검사는 콘텐츠 해시 기반 키로 이전 리비전 결과를
//!   찾아 전달하고, 미스일 때만 체커를 실행합니다.
//! - 체커 오류는 단일 exception 결과로 기록됩니다.

use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use relgate_core::config::EngineConfig;
use relgate_core::error::RelgateError;
use relgate_core::hashing::compute_file_hash;
use relgate_core::metrics::{
    CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL, CHECK_DURATION_SECONDS, CHECKS_EXECUTED_TOTAL,
    LABEL_CHECKER, LABEL_STATUS, RESULTS_RECORDED_TOTAL,
};
use relgate_core::policy::ReleasePolicy;
use relgate_core::types::{CheckResult, Revision};

use crate::archive::ArchiveLimits;
use crate::cache;
use crate::classify::{Classifier, ScheduledCheck};
use crate::keyring::Keyring;
use crate::registry::{CheckContext, Checker, CheckerRegistry, Finding};
use crate::store::MemoryResultStore;

/// 리비전 실행 요약
#[derive(Debug)]
pub struct RunSummary {
    /// 체커를 실제로 실행한 검사 수
    pub executed: usize,
    /// 캐시 전달로 끝난 검사 수
    pub cached: usize,
    /// 기존 결과 또는 클레임 경합으로 건너뛴 검사 수
    pub skipped: usize,
    /// 실행 후 리비전의 현재 결과
    pub results: Vec<CheckResult>,
}

/// [`CheckExecutor`] 빌더
pub struct CheckExecutorBuilder {
    registry: Option<Arc<CheckerRegistry>>,
    store: Option<Arc<MemoryResultStore>>,
    config: EngineConfig,
}

impl CheckExecutorBuilder {
    /// 체커 레지스트리를 지정합니다. 기본값은 표준 9종입니다.
    pub fn registry(mut self, registry: Arc<CheckerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 결과 저장소를 지정합니다. 기본값은 새 인메모리 저장소입니다.
    pub fn store(mut self, store: Arc<MemoryResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 엔진 설정을 지정합니다.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 실행기를 만듭니다.
    pub fn build(self) -> CheckExecutor {
        CheckExecutor {
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(CheckerRegistry::standard())),
            store: self.store.unwrap_or_default(),
            limits: ArchiveLimits::from(&self.config),
            cache_enabled: self.config.cache_enabled,
        }
    }
}

/// 검사 실행기
pub struct CheckExecutor {
    registry: Arc<CheckerRegistry>,
    store: Arc<MemoryResultStore>,
    limits: ArchiveLimits,
    cache_enabled: bool,
}

enum Outcome {
    Executed,
    Cached,
}

impl CheckExecutor {
    /// 빌더를 반환합니다.
    pub fn builder() -> CheckExecutorBuilder {
        CheckExecutorBuilder {
            registry: None,
            store: None,
            config: EngineConfig::default(),
        }
    }

    /// 결과 저장소를 반환합니다.
    pub fn store(&self) -> &Arc<MemoryResultStore> {
        &self.store
    }

    /// 리비전 디렉토리 전체에 대한 검사를 실행합니다.
    ///
    /// 파일 열거, 분류, 계획 산출 후 계획의 각 검사를 순서대로
    /// 처리하고 요약을 반환합니다.
    pub async fn run_revision(
        &self,
        revision: &Revision,
        revision_dir: &Path,
        policy: &ReleasePolicy,
        keyring: Arc<Keyring>,
    ) -> Result<RunSummary, RelgateError> {
        let release = revision.release_name();
        let rel_paths = {
            let dir = revision_dir.to_path_buf();
            tokio::task::spawn_blocking(move || list_revision_files(&dir))
                .await
                .map_err(|e| RelgateError::Io(std::io::Error::other(e)))??
        };

        let classifier = Classifier::new(policy)?;
        let plan = classifier.plan(&rel_paths);
        // 마커는 스케줄링 시점에 한 번만 평가
        let use_cache = self.cache_enabled && !cache::no_cache_marker_present(revision_dir);
        info!(
            revision = %revision,
            files = rel_paths.len(),
            checks = plan.len(),
            use_cache,
            "revision run starting"
        );

        let mut executed = 0usize;
        let mut cached = 0usize;
        let mut skipped = 0usize;

        for scheduled in &plan {
            let primary = scheduled.artifact.as_ref().map(|a| a.rel_path.as_str());
            if self
                .store
                .has_current(&release, &revision.number, scheduled.checker, primary)?
            {
                debug!(checker = scheduled.checker, ?primary, "current result exists, skipping");
                skipped += 1;
                continue;
            }
            let claim = format!(
                "{release}:{}|{}|{}",
                revision.number,
                scheduled.checker,
                primary.unwrap_or("")
            );
            if !self.store.try_claim(&claim)? {
                debug!(checker = scheduled.checker, ?primary, "claim held elsewhere, skipping");
                skipped += 1;
                continue;
            }
            let outcome = self
                .execute_one(revision, revision_dir, policy, &keyring, &rel_paths, scheduled, use_cache)
                .await;
            self.store.release_claim(&claim)?;
            match outcome? {
                Outcome::Executed => executed += 1,
                Outcome::Cached => cached += 1,
            }
        }

        let results = self.store.current_results(&release, &revision.number)?;
        info!(revision = %revision, executed, cached, skipped, "revision run finished");
        Ok(RunSummary {
            executed,
            cached,
            skipped,
            results,
        })
    }

    /// 계획된 검사 하나를 처리합니다. 호출자가 클레임을 쥐고 있습니다.
    async fn execute_one(
        &self,
        revision: &Revision,
        revision_dir: &Path,
        policy: &ReleasePolicy,
        keyring: &Arc<Keyring>,
        rel_paths: &[String],
        scheduled: &ScheduledCheck,
        use_cache: bool,
    ) -> Result<Outcome, RelgateError> {
        let checker = self.registry.get(scheduled.checker)?;
        let release = revision.release_name();
        let primary = scheduled.artifact.as_ref().map(|a| a.rel_path.clone());

        let mut inputs_hash = None;
        if self.cache_enabled && checker.cacheable() {
            if let Some(artifact) = &scheduled.artifact {
                let path = revision_dir.join(&artifact.rel_path);
                let chunk_size = self.limits.chunk_size;
                let hashed =
                    tokio::task::spawn_blocking(move || compute_file_hash(&path, chunk_size))
                    .await
                    .map_err(|e| RelgateError::Io(std::io::Error::other(e)))?;
                let content_hash = match hashed {
                    Ok(hash) => hash,
                    Err(e) => {
                        let finding =
                            Finding::exception(format!("cannot hash artifact for caching: {e}"));
                        let result = self.finding_to_result(
                            revision,
                            scheduled.checker,
                            primary.as_deref(),
                            None,
                            finding,
                        );
                        self.store.record(result)?;
                        return Ok(Outcome::Executed);
                    }
                };
                let key = cache::cache_key(checker.as_ref(), &content_hash, policy);
                if use_cache {
                    let prior = self.store.find_forwardable(
                        &release,
                        scheduled.checker,
                        &key,
                        &revision.number,
                    )?;
                    if !prior.is_empty() {
                        counter!(CACHE_HITS_TOTAL, LABEL_CHECKER => scheduled.checker).increment(1);
                        info!(
                            checker = scheduled.checker,
                            ?primary,
                            forwarded = prior.len(),
                            "forwarding cached results"
                        );
                        let forwarded =
                            cache::forward_results(prior, &revision.number, primary.as_deref());
                        for result in &forwarded {
                            counter!(
                                RESULTS_RECORDED_TOTAL,
                                LABEL_CHECKER => scheduled.checker,
                                LABEL_STATUS => result.status.to_string()
                            )
                            .increment(1);
                        }
                        self.store.record_all(forwarded)?;
                        return Ok(Outcome::Cached);
                    }
                    counter!(CACHE_MISSES_TOTAL, LABEL_CHECKER => scheduled.checker).increment(1);
                }
                inputs_hash = Some(key);
            }
        }

        let ctx = CheckContext {
            revision: revision.clone(),
            revision_dir: revision_dir.to_path_buf(),
            artifact: scheduled.artifact.clone(),
            all_paths: rel_paths.to_vec(),
            policy: policy.clone(),
            keyring: Arc::clone(keyring),
            limits: self.limits,
            prior_data: self.store.latest_prior_data(
                &release,
                scheduled.checker,
                primary.as_deref(),
                &revision.number,
            )?,
        };

        let task_checker: Arc<dyn Checker> = Arc::clone(&checker);
        let started = Instant::now();
        let outcome = tokio::task::spawn_blocking(move || task_checker.run(&ctx)).await;
        histogram!(CHECK_DURATION_SECONDS, LABEL_CHECKER => scheduled.checker)
            .record(started.elapsed().as_secs_f64());
        counter!(CHECKS_EXECUTED_TOTAL, LABEL_CHECKER => scheduled.checker).increment(1);

        let mut findings = match outcome {
            Ok(Ok(findings)) => findings,
            Ok(Err(e)) => {
                warn!(checker = scheduled.checker, ?primary, error = %e, "checker failed");
                vec![Finding::exception(format!("checker failed: {e}"))]
            }
            Err(e) => {
                warn!(checker = scheduled.checker, ?primary, error = %e, "checker task aborted");
                vec![Finding::exception(format!("checker task aborted: {e}"))]
            }
        };
        // 발견이 없으면 검사 완료 기록을 위해 success를 합성
        if findings.is_empty() {
            findings.push(Finding::success("no findings"));
        }

        let results: Vec<CheckResult> = findings
            .into_iter()
            .map(|finding| {
                self.finding_to_result(
                    revision,
                    scheduled.checker,
                    primary.as_deref(),
                    inputs_hash.as_deref(),
                    finding,
                )
            })
            .collect();
        // 새 실행이 더 적은 멤버 결과를 내더라도 이전 멤버 결과가
        // 현재 뷰에 남지 않도록 기록 직전에 기존 현재 결과를 정리
        self.store.clear_current(
            &release,
            &revision.number,
            scheduled.checker,
            primary.as_deref(),
        )?;
        self.store.record_all(results)?;
        Ok(Outcome::Executed)
    }

    fn finding_to_result(
        &self,
        revision: &Revision,
        checker: &'static str,
        artifact_rel_path: Option<&str>,
        inputs_hash: Option<&str>,
        finding: Finding,
    ) -> CheckResult {
        counter!(
            RESULTS_RECORDED_TOTAL,
            LABEL_CHECKER => checker,
            LABEL_STATUS => finding.status.to_string()
        )
        .increment(1);
        CheckResult {
            id: uuid::Uuid::new_v4().to_string(),
            release_name: revision.release_name(),
            revision_number: revision.number.clone(),
            checker: checker.to_owned(),
            primary_rel_path: finding
                .primary_rel_path
                .or_else(|| artifact_rel_path.map(str::to_owned)),
            member_rel_path: finding.member_rel_path,
            status: finding.status,
            message: finding.message,
            data: finding.data,
            created: SystemTime::now(),
            cached: false,
            inputs_hash: inputs_hash.map(str::to_owned),
            forwarded_from: None,
        }
    }
}

/// 리비전 디렉토리의 파일을 정렬된 상대 경로 목록으로 열거합니다.
fn list_revision_files(revision_dir: &Path) -> Result<Vec<String>, RelgateError> {
    let mut rel_paths = Vec::new();
    for entry in walkdir::WalkDir::new(revision_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| RelgateError::Io(std::io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(revision_dir) {
            rel_paths.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    rel_paths.sort_unstable();
    Ok(rel_paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    use relgate_core::error::CheckError;
    use relgate_core::policy::LicenseCheckMode;
    use relgate_core::types::CheckStatus;

    use crate::cache::NO_CACHE_MARKER;
    use crate::checkers::keys;

    const CANONICAL_LICENSE: &str = include_str!("checkers/data/apache-2.0.txt");
    const HEADERED_SOURCE: &[u8] =
        b"// Licensed to the Apache Software Foundation (ASF) under one\n// or more contributor license agreements.\nfn a() {}\n";
    const NOTICE: &[u8] = b"Apache Widget\nCopyright 2026 The Apache Software Foundation\n\nThis product includes software developed at\nThe Apache Software Foundation (http://www.apache.org/).\n";

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

    fn write_sha512(dir: &Path, archive_name: &str) {
        use sha2::Digest;
        let content = std::fs::read(dir.join(archive_name)).unwrap();
        let digest = hex::encode(sha2::Sha512::digest(&content));
        std::fs::write(
            dir.join(format!("{archive_name}.sha512")),
            format!("{digest}  {archive_name}\n"),
        )
        .unwrap();
    }

    /// 검사 가능한 최소 리비전 디렉토리를 채웁니다.
    fn populate_revision(dir: &Path) {
        write_tar_gz(
            dir,
            "widget-1.0.tar.gz",
            &[
                ("widget-1.0/LICENSE", CANONICAL_LICENSE.as_bytes()),
                ("widget-1.0/NOTICE", NOTICE),
                ("widget-1.0/src/lib.rs", HEADERED_SOURCE),
            ],
        );
        write_sha512(dir, "widget-1.0.tar.gz");
    }

    fn policy() -> ReleasePolicy {
        ReleasePolicy {
            committee: "widget".to_owned(),
            license_check_mode: LicenseCheckMode::Lightweight,
            ..Default::default()
        }
    }

    fn executor() -> CheckExecutor {
        CheckExecutor::builder().build()
    }

    fn status_of(summary: &RunSummary, checker: &str) -> CheckStatus {
        summary
            .results
            .iter()
            .find(|r| r.checker == checker)
            .map(|r| r.status)
            .unwrap()
    }

    #[tokio::test]
    async fn clean_revision_runs_all_planned_checks() {
        let dir = tempfile::tempdir().unwrap();
        populate_revision(dir.path());
        let revision = Revision::new("widget", "1.0", "00001");

        let executor = executor();
        let summary = executor
            .run_revision(&revision, dir.path(), &policy(), Arc::new(Keyring::new()))
            .await
            .unwrap();

        assert!(summary.executed > 0);
        assert_eq!(summary.cached, 0);
        assert_eq!(summary.skipped, 0);
        assert_eq!(status_of(&summary, keys::ARCHIVE_INTEGRITY), CheckStatus::Success);
        assert_eq!(status_of(&summary, keys::ARCHIVE_STRUCTURE), CheckStatus::Success);
        assert_eq!(status_of(&summary, keys::LICENSE_FILES), CheckStatus::Success);
        assert_eq!(status_of(&summary, keys::LICENSE_HEADERS), CheckStatus::Success);
        assert_eq!(status_of(&summary, keys::HASH_VERIFY), CheckStatus::Success);
        // 서명 파일이 없으므로 경로 검사는 failure
        assert_eq!(status_of(&summary, keys::PATHS_CHECK), CheckStatus::Failure);
    }

    #[tokio::test]
    async fn rerun_of_same_revision_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        populate_revision(dir.path());
        let revision = Revision::new("widget", "1.0", "00001");

        let executor = executor();
        let keyring = Arc::new(Keyring::new());
        let first = executor
            .run_revision(&revision, dir.path(), &policy(), Arc::clone(&keyring))
            .await
            .unwrap();
        let second = executor
            .run_revision(&revision, dir.path(), &policy(), keyring)
            .await
            .unwrap();

        assert_eq!(second.executed, 0);
        assert_eq!(second.cached, 0);
        assert_eq!(second.skipped, first.executed + first.cached);
        assert_eq!(second.results.len(), first.results.len());
    }

    #[tokio::test]
    async fn identical_bytes_forward_results_to_next_revision() {
        let dir1 = tempfile::tempdir().unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        populate_revision(dir1.path());
        // 동일한 바이트가 되도록 같은 방식으로 다시 생성
        populate_revision(dir2.path());

        let executor = executor();
        let keyring = Arc::new(Keyring::new());
        executor
            .run_revision(
                &Revision::new("widget", "1.0", "00001"),
                dir1.path(),
                &policy(),
                Arc::clone(&keyring),
            )
            .await
            .unwrap();
        let second = executor
            .run_revision(
                &Revision::new("widget", "1.0", "00002"),
                dir2.path(),
                &policy(),
                keyring,
            )
            .await
            .unwrap();

        assert!(second.cached > 0, "archive checks should forward");
        let forwarded: Vec<_> = second.results.iter().filter(|r| r.cached).collect();
        assert!(!forwarded.is_empty());
        for result in forwarded {
            assert!(result.forwarded_from.is_some());
            assert_eq!(result.revision_number, "00002");
        }
        // 리비전 전역 경로 검사는 캐시되지 않음
        let paths = second
            .results
            .iter()
            .find(|r| r.checker == keys::PATHS_CHECK)
            .unwrap();
        assert!(!paths.cached);
    }

    #[tokio::test]
    async fn no_cache_marker_disables_forwarding() {
        let dir1 = tempfile::tempdir().unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        populate_revision(dir1.path());
        populate_revision(dir2.path());
        std::fs::write(dir2.path().join(NO_CACHE_MARKER), b"").unwrap();

        let executor = executor();
        let keyring = Arc::new(Keyring::new());
        executor
            .run_revision(
                &Revision::new("widget", "1.0", "00001"),
                dir1.path(),
                &policy(),
                Arc::clone(&keyring),
            )
            .await
            .unwrap();
        let second = executor
            .run_revision(
                &Revision::new("widget", "1.0", "00002"),
                dir2.path(),
                &policy(),
                keyring,
            )
            .await
            .unwrap();

        assert_eq!(second.cached, 0);
        assert!(second.results.iter().all(|r| !r.cached));
    }

    struct SilentChecker;
    impl Checker for SilentChecker {
        fn key(&self) -> &'static str {
            keys::HASH_VERIFY
        }
        fn run(&self, _ctx: &CheckContext) -> Result<Vec<Finding>, CheckError> {
            Ok(Vec::new())
        }
    }

    struct BrokenChecker;
    impl Checker for BrokenChecker {
        fn key(&self) -> &'static str {
            keys::HASH_VERIFY
        }
        fn run(&self, _ctx: &CheckContext) -> Result<Vec<Finding>, CheckError> {
            Err(CheckError::Invocation {
                checker: keys::HASH_VERIFY.to_owned(),
                reason: "boom".to_owned(),
            })
        }
    }

    async fn run_with_hash_checker(checker: Arc<dyn Checker>) -> RunSummary {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"payload").unwrap();
        write_sha512(dir.path(), "a.txt");

        let mut registry = CheckerRegistry::new();
        registry.register(Arc::new(crate::checkers::paths::PathsChecker));
        registry.register(checker);
        let executor = CheckExecutor::builder()
            .registry(Arc::new(registry))
            .build();
        executor
            .run_revision(
                &Revision::new("widget", "1.0", "00001"),
                dir.path(),
                &policy(),
                Arc::new(Keyring::new()),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn empty_findings_synthesize_a_success_record() {
        let summary = run_with_hash_checker(Arc::new(SilentChecker)).await;
        let result = summary
            .results
            .iter()
            .find(|r| r.checker == keys::HASH_VERIFY)
            .unwrap();
        assert_eq!(result.status, CheckStatus::Success);
        assert_eq!(result.message, "no findings");
    }

    #[tokio::test]
    async fn checker_error_becomes_a_single_exception_record() {
        let summary = run_with_hash_checker(Arc::new(BrokenChecker)).await;
        let results: Vec<_> = summary
            .results
            .iter()
            .filter(|r| r.checker == keys::HASH_VERIFY)
            .collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, CheckStatus::Exception);
        assert!(results[0].message.contains("boom"));
    }

    #[tokio::test]
    async fn results_carry_inputs_hash_for_cacheable_checks() {
        let dir = tempfile::tempdir().unwrap();
        populate_revision(dir.path());
        let executor = executor();
        let summary = executor
            .run_revision(
                &Revision::new("widget", "1.0", "00001"),
                dir.path(),
                &policy(),
                Arc::new(Keyring::new()),
            )
            .await
            .unwrap();

        let integrity = summary
            .results
            .iter()
            .find(|r| r.checker == keys::ARCHIVE_INTEGRITY)
            .unwrap();
        assert!(integrity.inputs_hash.as_deref().unwrap().starts_with("blake3:"));
        let paths = summary
            .results
            .iter()
            .find(|r| r.checker == keys::PATHS_CHECK)
            .unwrap();
        assert!(paths.inputs_hash.is_none());
    }
}
