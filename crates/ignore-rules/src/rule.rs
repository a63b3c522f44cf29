//! 무시 규칙 — 필드 정의와 컴파일
//!
//! [`IgnoreRule`]은 위원회 구성원이 저장하는 원본 형태이고,
//! [`CompiledRule`]은 저장 시점에 패턴을 1회 컴파일한 평가용 형태입니다.
//! 잘못된 패턴, 길이 초과, 제약 필드가 전혀 없는 규칙은
//! 컴파일 단계에서 동기적으로 거부되어 저장되지 않습니다.

use serde::{Deserialize, Serialize};

use relgate_core::error::PatternError;
use relgate_core::types::{CheckResult, CheckStatus};

use crate::pattern::Pattern;

/// 위원회 단위 무시 규칙 (저장 형태)
///
/// 모든 필드는 선택적입니다. 비어 있는 문자열 필드는 제약을
/// 가하지 않으며, 설정된 필드는 전부 매칭되어야 규칙이 적용됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreRule {
    /// 규칙 ID (저장소 부여)
    pub id: Option<u64>,
    /// 규칙을 만든 계정 uid
    pub asf_uid: String,
    /// 릴리스 이름 패턴
    pub release_pattern: String,
    /// 리비전 번호 (패턴이 아닌 정확한 문자열 일치)
    pub revision_number: String,
    /// 체커 키 패턴
    pub checker_pattern: String,
    /// 아티팩트 경로 패턴
    pub primary_rel_path_pattern: String,
    /// 멤버 경로 패턴 (`!`는 멤버 경로가 없는 결과만)
    pub member_rel_path_pattern: String,
    /// 상태 일치 (None이면 제약 없음)
    pub status: Option<CheckStatus>,
    /// 메시지 패턴
    pub message_pattern: String,
}

impl IgnoreRule {
    /// 규칙을 평가용 형태로 컴파일합니다.
    ///
    /// 규칙 생성/수정 시점에 호출되며, 실패한 규칙은 저장되지 않습니다.
    pub fn compile(&self) -> Result<CompiledRule, PatternError> {
        let compiled = CompiledRule {
            id: self.id,
            release: compile_optional(&self.release_pattern)?,
            revision_number: non_empty(&self.revision_number),
            checker: compile_optional(&self.checker_pattern)?,
            primary_rel_path: compile_optional(&self.primary_rel_path_pattern)?,
            member_rel_path: compile_optional(&self.member_rel_path_pattern)?,
            status: self.status,
            message: compile_optional(&self.message_pattern)?,
        };
        if compiled.is_unconstrained() {
            return Err(PatternError::EmptyRule);
        }
        Ok(compiled)
    }
}

fn compile_optional(raw: &str) -> Result<Option<Pattern>, PatternError> {
    if raw.is_empty() {
        return Ok(None);
    }
    Pattern::parse(raw).map(Some)
}

fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_owned())
    }
}

/// 컴파일된 무시 규칙 (평가 형태)
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// 원본 규칙 ID
    pub id: Option<u64>,
    release: Option<Pattern>,
    revision_number: Option<String>,
    checker: Option<Pattern>,
    primary_rel_path: Option<Pattern>,
    member_rel_path: Option<Pattern>,
    status: Option<CheckStatus>,
    message: Option<Pattern>,
}

impl CompiledRule {
    /// 설정된 제약 필드가 하나도 없는지 반환합니다.
    fn is_unconstrained(&self) -> bool {
        self.release.is_none()
            && self.revision_number.is_none()
            && self.checker.is_none()
            && self.primary_rel_path.is_none()
            && self.member_rel_path.is_none()
            && self.status.is_none()
            && self.message.is_none()
    }

    /// 저장된 결과가 이 규칙에 매칭되는지 평가합니다.
    ///
    /// 설정된 모든 필드가 매칭되어야 하며(AND),
    /// success 결과는 규칙 내용과 무관하게 절대 매칭되지 않습니다.
    pub fn matches(&self, result: &CheckResult) -> bool {
        if !result.status.is_suppressible() {
            return false;
        }

        if let Some(revision) = &self.revision_number {
            // 리비전 번호는 패턴이 아닌 정확한 문자열 일치만
            if *revision != result.revision_number {
                return false;
            }
        }
        if let Some(status) = self.status {
            if status != result.status {
                return false;
            }
        }
        if let Some(pattern) = &self.release {
            if !pattern.matches(Some(&result.release_name)) {
                return false;
            }
        }
        if let Some(pattern) = &self.checker {
            if !pattern.matches(Some(&result.checker)) {
                return false;
            }
        }
        if let Some(pattern) = &self.primary_rel_path {
            if !pattern.matches(result.primary_rel_path.as_deref()) {
                return false;
            }
        }
        if let Some(pattern) = &self.member_rel_path {
            if !pattern.matches(result.member_rel_path.as_deref()) {
                return false;
            }
        }
        if let Some(pattern) = &self.message {
            if !pattern.matches(Some(&result.message)) {
                return false;
            }
        }
        true
    }
}
