//! 무시 규칙 패턴 문법 — glob/정규식 하이브리드
//!
//! # 문법
//!
//! - **glob 모드** (기본): 패턴이 `^`로 시작하지도 `$`로 끝나지도 않을 때.
//!   `*`는 임의 문자열(빈 문자열 포함), 나머지는 리터럴이며
//!   필드 값의 부분 문자열로 검색됩니다.
//! - **정규식 모드**: 패턴이 `^`로 시작하거나 `$`로 끝날 때.
//!   전체 일치가 아닌 검색으로 적용되므로 앵커가 전체 일치를 강제합니다.
//! - **부정**: 선행 `!`는 값이 존재할 때 매칭 결과를 뒤집습니다.
//! - **부재 전용**: 리터럴 `!` 단독 패턴은 필드 값이 없는 결과만 매칭합니다.
//!
//! 패턴은 규칙 저장 시 1회 컴파일되며, 길이 한도(128자)를 넘거나
//! 정규식이 잘못된 패턴은 저장 자체가 거부됩니다.

use regex::Regex;

use relgate_core::error::PatternError;

/// 패턴 최대 길이 (문자 수). 초과 시 절단 없이 거부됩니다.
pub const MAX_PATTERN_LENGTH: usize = 128;

/// 컴파일된 무시 규칙 패턴
///
/// 모든 필드가 단일 [`Pattern::matches`] 인터페이스를 공유합니다.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// glob 모드: `*` 와일드카드, 부분 문자열 검색
    Glob { raw: String, regex: Regex },
    /// 정규식 모드: 검색 의미론, 앵커로 전체 일치 강제 가능
    Regex { raw: String, regex: Regex },
    /// 부정: 값이 존재할 때만 내부 패턴의 결과를 뒤집음
    Negated(Box<Pattern>),
    /// 리터럴 `!`: 값이 없는 필드만 매칭
    MissingOnly,
}

impl Pattern {
    /// 패턴 문자열을 컴파일합니다.
    ///
    /// 규칙 저장 시점에 호출되며, 실패하면 규칙이 저장되지 않습니다.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern == "!" {
            return Ok(Self::MissingOnly);
        }
        if let Some(rest) = pattern.strip_prefix('!') {
            // 부정 해제 후 나머지는 일반 패턴으로 취급합니다.
            // "!!"는 리터럴 "!"에 대한 glob 부정이 됩니다.
            return Ok(Self::Negated(Box::new(Self::parse_raw(rest)?)));
        }
        Self::parse_raw(pattern)
    }

    fn parse_raw(pattern: &str) -> Result<Self, PatternError> {
        let length = pattern.chars().count();
        if length > MAX_PATTERN_LENGTH {
            return Err(PatternError::TooLong {
                length,
                max: MAX_PATTERN_LENGTH,
            });
        }

        if pattern.starts_with('^') || pattern.ends_with('$') {
            let regex = Regex::new(pattern).map_err(|e| PatternError::InvalidRegex {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            })?;
            return Ok(Self::Regex {
                raw: pattern.to_owned(),
                regex,
            });
        }

        // glob → 정규식 변환: 리터럴을 이스케이프하고 `*`만 `.*`로 풉니다.
        let escaped = regex::escape(pattern).replace(r"\*", ".*");
        let regex = Regex::new(&escaped).map_err(|e| PatternError::InvalidRegex {
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self::Glob {
            raw: pattern.to_owned(),
            regex,
        })
    }

    /// 필드 값에 대해 패턴을 평가합니다.
    ///
    /// `None`은 부재 필드(예: 멤버 경로 없는 결과)를 뜻하며,
    /// [`Pattern::MissingOnly`]만 이를 매칭합니다.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Self::MissingOnly => value.is_none(),
            Self::Negated(inner) => match value {
                // 부정은 존재하는 값에만 적용됩니다.
                Some(_) => !inner.matches(value),
                None => false,
            },
            Self::Glob { regex, .. } | Self::Regex { regex, .. } => {
                value.is_some_and(|v| regex.is_match(v))
            }
        }
    }

    /// 원본 패턴 문자열을 반환합니다.
    pub fn raw(&self) -> String {
        match self {
            Self::MissingOnly => "!".to_owned(),
            Self::Negated(inner) => format!("!{}", inner.raw()),
            Self::Glob { raw, .. } | Self::Regex { raw, .. } => raw.clone(),
        }
    }
}

/// 패턴 문자열이 유효한지 검증합니다.
///
/// 컴파일 결과를 버리고 에러만 전달하는 편의 함수로,
/// 규칙 편집 폼 검증에 사용됩니다.
pub fn validate_pattern(pattern: &str) -> Result<(), PatternError> {
    Pattern::parse(pattern).map(|_| ())
}
