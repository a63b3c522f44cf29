//! 결과 분할 엔진 — 읽기 시점 visible/ignored 분할
//!
//! 저장된 결과와 위원회 규칙을 받아 표시용 두 집합으로 나눕니다.
//! 저장 데이터는 변경되지 않으며, 결과에 억제 플래그를 영속화하지
//! 않습니다. 계산된 사실과 표시 선호의 분리는 감사 가능성을 위한
//! 불변 조건입니다.

use metrics::counter;
use tracing::debug;

use relgate_core::metrics::{LABEL_STATUS, RESULTS_IGNORED_TOTAL};
use relgate_core::types::CheckResult;

use crate::rule::CompiledRule;

/// 분할 결과
#[derive(Debug, Clone, Default)]
pub struct PartitionedResults {
    /// 표시 대상 결과
    pub visible: Vec<CheckResult>,
    /// 규칙에 매칭되어 억제된 결과
    pub ignored: Vec<CheckResult>,
}

impl PartitionedResults {
    /// 표시 대상 중 주어진 상태의 결과 수를 셉니다.
    pub fn visible_count(&self, status: relgate_core::types::CheckStatus) -> usize {
        self.visible.iter().filter(|r| r.status == status).count()
    }
}

/// 결과가 규칙 집합 중 하나라도 매칭되는지 평가합니다 (OR 결합).
pub fn matches_any(result: &CheckResult, rules: &[CompiledRule]) -> bool {
    rules.iter().any(|rule| rule.matches(result))
}

/// 저장된 결과를 visible/ignored로 분할합니다.
///
/// success 결과는 항상 visible입니다. 규칙 집합의 합집합은 단조적이며,
/// 규칙을 추가해도 기존에 억제되던 결과가 다시 보이게 되지 않습니다.
pub fn partition(results: Vec<CheckResult>, rules: &[CompiledRule]) -> PartitionedResults {
    let mut partitioned = PartitionedResults::default();
    for result in results {
        if matches_any(&result, rules) {
            debug!(
                checker = %result.checker,
                status = %result.status,
                path = result.primary_rel_path.as_deref().unwrap_or(""),
                "result suppressed by ignore rule"
            );
            counter!(RESULTS_IGNORED_TOTAL, LABEL_STATUS => result.status.to_string())
                .increment(1);
            partitioned.ignored.push(result);
        } else {
            partitioned.visible.push(result);
        }
    }
    partitioned
}
