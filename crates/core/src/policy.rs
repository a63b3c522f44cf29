//! 릴리스 정책 — 프로젝트 단위 검사 구성
//!
//! 정책 제공자(외부)가 프로젝트별로 공급하는 읽기 전용 구성입니다.
//! 분류 패턴, 라이선스 검사 모드, 제외 목록, 포들링/엄격 플래그를 담습니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 라이선스 검사 모드
///
/// 아카이브에 어떤 라이선스 체커를 적용할지 결정합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseCheckMode {
    /// 경량 헤더 검사만
    Lightweight,
    /// RAT 스캔만
    Rat,
    /// 둘 다 (기본값)
    #[default]
    Both,
}

impl LicenseCheckMode {
    /// RAT 스캔을 포함하는 모드인지 반환합니다.
    pub fn wants_rat(self) -> bool {
        matches!(self, Self::Rat | Self::Both)
    }

    /// 경량 헤더 검사를 포함하는 모드인지 반환합니다.
    pub fn wants_lightweight(self) -> bool {
        matches!(self, Self::Lightweight | Self::Both)
    }
}

impl fmt::Display for LicenseCheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lightweight => write!(f, "lightweight"),
            Self::Rat => write!(f, "rat"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// 프로젝트 단위 릴리스 정책
///
/// 모든 필드는 기본값을 가지므로 부분 정의가 가능합니다.
/// `strict_checking`은 하위 승인 단계에만 영향을 주며
/// 체커 동작 자체는 바꾸지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleasePolicy {
    /// 릴리스를 소유한 위원회명 (예: `widget`)
    pub committee: String,
    /// 소스 아티팩트 경로 glob 패턴
    pub source_artifact_paths: Vec<String>,
    /// 바이너리 아티팩트 경로 glob 패턴
    pub binary_artifact_paths: Vec<String>,
    /// 라이선스 검사 모드
    pub license_check_mode: LicenseCheckMode,
    /// RAT 스캔 제외 패턴
    pub rat_excludes: Vec<String>,
    /// 경량 헤더 검사 제외 패턴
    pub lightweight_excludes: Vec<String>,
    /// 인큐베이팅 프로젝트 여부
    pub is_podling: bool,
    /// 엄격 검사 플래그 (승인 게이트 전용)
    pub strict_checking: bool,
}

impl ReleasePolicy {
    /// 캐시 키에 접어 넣을 정책 필드를 (키, 값) 쌍으로 반환합니다.
    ///
    /// 체커 동작에 영향을 주는 필드가 바뀌면 캐시가 무효화되도록
    /// 해시 입력에 포함됩니다.
    pub fn cache_fields(&self, keys: &[&str]) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        for key in keys {
            let value = match *key {
                "committee" => Some(self.committee.clone()),
                "source_artifact_paths" => Some(self.source_artifact_paths.join(",")),
                "binary_artifact_paths" => Some(self.binary_artifact_paths.join(",")),
                "license_check_mode" => Some(self.license_check_mode.to_string()),
                "rat_excludes" => Some(self.rat_excludes.join(",")),
                "lightweight_excludes" => Some(self.lightweight_excludes.join(",")),
                "is_podling" => Some(self.is_podling.to_string()),
                _ => None,
            };
            if let Some(value) = value {
                fields.push(((*key).to_owned(), value));
            }
        }
        fields
    }
}
