//! 결과 캐시 — 콘텐츠 해시 기반 리비전 간 결과 전달
//!
//! 캐시 키는 (체커 키, 검증 대상 바이트의 콘텐츠 해시, 체커 동작에
//! 영향을 주는 정책 필드)를 정렬된 쌍으로 접어 만든 해시입니다.
//! 바이트가 같아도 체커나 정책이 바뀌면 키가 달라집니다.
//!
//! 리비전 루트의 `.relgate-no-cache` 마커는 해당 리비전의 재사용을
//! 비활성화하며, 스케줄링 시점에 한 번만 평가됩니다.

use std::path::Path;
use std::time::SystemTime;

use tracing::debug;

use relgate_core::hashing::compute_pairs_hash;
use relgate_core::policy::ReleasePolicy;
use relgate_core::types::CheckResult;

use crate::registry::Checker;

/// 캐시 재사용을 비활성화하는 리비전 루트 마커 파일명
pub const NO_CACHE_MARKER: &str = ".relgate-no-cache";

/// 리비전 디렉토리에 캐시 비활성 마커가 있는지 반환합니다.
pub fn no_cache_marker_present(revision_dir: &Path) -> bool {
    let present = revision_dir.join(NO_CACHE_MARKER).exists();
    if present {
        debug!(dir = %revision_dir.display(), "no-cache marker present, cache disabled");
    }
    present
}

/// 체커 실행의 캐시 키를 계산합니다.
///
/// `content_hash`는 검증 대상 바이트의 `blake3:<hex>` 해시입니다.
/// 체커가 선언한 정책 필드가 함께 접혀, 정책 변경이 캐시를
/// 무효화합니다.
pub fn cache_key(checker: &dyn Checker, content_hash: &str, policy: &ReleasePolicy) -> String {
    let mut pairs = policy.cache_fields(checker.cache_policy_fields());
    pairs.push(("checker".to_owned(), checker.key().to_owned()));
    pairs.push(("content".to_owned(), content_hash.to_owned()));
    compute_pairs_hash(&pairs)
}

/// 이전 리비전 결과를 새 리비전으로 전달하는 사본을 만듭니다.
///
/// 새 id를 부여하고 리비전 번호와 대상 경로를 갱신하며,
/// `cached` 플래그와 원본으로의 `forwarded_from` 링크를 설정합니다.
pub fn forward_results(
    prior: Vec<CheckResult>,
    revision_number: &str,
    primary_rel_path: Option<&str>,
) -> Vec<CheckResult> {
    prior
        .into_iter()
        .map(|original| {
            let mut forwarded = original.clone();
            forwarded.id = uuid::Uuid::new_v4().to_string();
            forwarded.revision_number = revision_number.to_owned();
            forwarded.primary_rel_path = primary_rel_path.map(str::to_owned);
            forwarded.created = SystemTime::now();
            forwarded.cached = true;
            forwarded.forwarded_from = Some(original.id);
            forwarded
        })
        .collect()
}
