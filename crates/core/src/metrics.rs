//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `relgate_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 체커 키 레이블 (예: `archive.integrity`)
pub const LABEL_CHECKER: &str = "checker";

/// 결과 상태 레이블 (success, warning, failure, exception)
pub const LABEL_STATUS: &str = "status";

// ─── Check Engine 메트릭 ───────────────────────────────────────────

/// 실행된 체커 수 (counter, label: checker)
pub const CHECKS_EXECUTED_TOTAL: &str = "relgate_checks_executed_total";

/// 기록된 결과 수 (counter, label: checker, status)
pub const RESULTS_RECORDED_TOTAL: &str = "relgate_results_recorded_total";

/// 캐시에서 전달된 결과 수 (counter, label: checker)
pub const CACHE_HITS_TOTAL: &str = "relgate_cache_hits_total";

/// 캐시 미스로 실행된 검사 수 (counter, label: checker)
pub const CACHE_MISSES_TOTAL: &str = "relgate_cache_misses_total";

/// 체커 실행 시간 (histogram, 초, label: checker)
pub const CHECK_DURATION_SECONDS: &str = "relgate_check_duration_seconds";

/// 읽은 아카이브 멤버 수 (counter)
pub const ARCHIVE_MEMBERS_READ_TOTAL: &str = "relgate_archive_members_read_total";

// ─── Ignore Rules 메트릭 ───────────────────────────────────────────

/// 무시 규칙으로 억제된 결과 수 (counter, label: status)
pub const RESULTS_IGNORED_TOTAL: &str = "relgate_results_ignored_total";
