//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 검사 파이프라인의 모든 단계(분류, 실행, 캐시, 무시 규칙)가
//! 이 타입들을 사용하여 결과를 교환합니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// 검사 결과 상태 격자
///
/// 네 가지 값으로 고정되며, 모든 체커가 동일한 의미로 사용합니다.
///
/// - `Success`: 문제 없음
/// - `Warning`: 사람의 판단이 필요한 정책 우려 (차단하지 않음)
/// - `Failure`: 하드 규칙 위반 확정
/// - `Exception`: 체커 자체가 평가를 완료하지 못함 (도구/환경 문제)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// 문제 없음
    Success,
    /// 정책 우려, 비차단
    Warning,
    /// 규칙 위반
    Failure,
    /// 체커 내부 오류
    Exception,
}

impl CheckStatus {
    /// success 여부를 반환합니다.
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// 무시 규칙의 억제 대상이 될 수 있는지 반환합니다.
    ///
    /// success 결과는 어떤 규칙으로도 억제할 수 없습니다.
    pub fn is_suppressible(self) -> bool {
        !self.is_success()
    }

    /// 문자열에서 상태를 파싱합니다. 대소문자를 구분하지 않습니다.
    ///
    /// 역직렬화가 이 함수를 사용하므로 사람이 쓰는 규칙/정책 파일에서
    /// `"Warning"` 같은 표기도 허용됩니다. 직렬화는 항상 소문자입니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" => Some(Self::Success),
            "warning" => Some(Self::Warning),
            "failure" => Some(Self::Failure),
            "exception" => Some(Self::Exception),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for CheckStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str_loose(&s).ok_or_else(|| {
            serde::de::Error::unknown_variant(
                &s,
                &["success", "warning", "failure", "exception"],
            )
        })
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Failure => write!(f, "failure"),
            Self::Exception => write!(f, "exception"),
        }
    }
}

/// 아티팩트 분류
///
/// 정책의 source/binary 경로 패턴으로 결정되며,
/// 어느 패턴에도 맞지 않으면 `Source`가 기본값입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// 소스 아티팩트 (기본값)
    #[default]
    Source,
    /// 바이너리 아티팩트
    Binary,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// 리비전 식별자
///
/// 릴리스 후보 파일 집합의 불변 스냅샷을 가리킵니다.
/// 내용 변경은 항상 새 리비전을 만듭니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision {
    /// 프로젝트명 (예: `widget`)
    pub project: String,
    /// 버전명 (예: `1.0.0`)
    pub version: String,
    /// 리비전 번호 (예: `00003`)
    pub number: String,
}

impl Revision {
    /// 새 리비전 식별자를 생성합니다.
    pub fn new(
        project: impl Into<String>,
        version: impl Into<String>,
        number: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            version: version.into(),
            number: number.into(),
        }
    }

    /// 릴리스 이름을 반환합니다 (`<project>-<version>`).
    pub fn release_name(&self) -> String {
        format!("{}-{}", self.project, self.version)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} r{}", self.project, self.version, self.number)
    }
}

/// 리비전 내의 단일 파일
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// 리비전 루트 기준 상대 경로
    pub rel_path: String,
    /// source/binary 분류
    pub classification: Classification,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.rel_path, self.classification)
    }
}

/// 하나의 (체커, 아티팩트[, 멤버 경로]) 쌍에 대한 결과 레코드
///
/// 생성 후 변경되지 않습니다. 재실행은 새 레코드를 만들어
/// 표시 목적으로 이전 레코드를 대체하며, 이력은 삭제되지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// 결과 고유 ID (uuid v4)
    pub id: String,
    /// 릴리스 이름 (`<project>-<version>`)
    pub release_name: String,
    /// 리비전 번호
    pub revision_number: String,
    /// 체커 키 (점 구분 네임스페이스, 예: `archive.integrity`)
    pub checker: String,
    /// 검사 대상 아티팩트 경로 (리비전 전역 검사는 None)
    pub primary_rel_path: Option<String>,
    /// 아카이브 내부 멤버 경로 (멤버 범위 결과에만 존재)
    pub member_rel_path: Option<String>,
    /// 결과 상태
    pub status: CheckStatus,
    /// 사람이 읽을 수 있는 메시지
    pub message: String,
    /// 체커별 추가 데이터
    #[serde(default)]
    pub data: serde_json::Value,
    /// 생성 시각
    pub created: SystemTime,
    /// 캐시에서 복사된 결과인지 여부
    pub cached: bool,
    /// 검증한 입력 바이트의 콘텐츠 해시 (캐시 키)
    pub inputs_hash: Option<String>,
    /// 캐시로 복사된 경우 원본 결과 ID
    pub forwarded_from: Option<String>,
}

impl CheckResult {
    /// 표시 목적의 현재 결과를 식별하는 키 튜플을 반환합니다.
    ///
    /// 리비전 내에서 이 튜플당 정확히 하나의 현재 결과가 존재합니다.
    pub fn current_key(&self) -> (&str, Option<&str>, Option<&str>) {
        (
            self.checker.as_str(),
            self.primary_rel_path.as_deref(),
            self.member_rel_path.as_deref(),
        )
    }

    /// 멤버 범위 결과인지 반환합니다.
    pub fn is_member_scoped(&self) -> bool {
        self.member_rel_path.is_some()
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            self.status,
            self.checker,
            self.primary_rel_path.as_deref().unwrap_or("<revision>"),
        )?;
        if let Some(member) = &self.member_rel_path {
            write!(f, "!{member}")?;
        }
        write!(f, ": {}", self.message)
    }
}
