//! 파일 분류기 — (경로 집합, 정책)의 순수 함수
//!
//! 리비전의 파일 목록과 릴리스 정책으로부터 실행할 (아티팩트, 체커)
//! 쌍을 산출합니다. 접미사별 체커 매핑은 고정되어 있고, source/binary
//! 분류는 정책의 glob 패턴으로 결정됩니다. 어떤 패턴에도 맞지 않는
//! 파일은 source로 분류됩니다.

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use relgate_core::error::ConfigError;
use relgate_core::policy::ReleasePolicy;
use relgate_core::types::{Artifact, Classification};

use crate::archive::is_archive_path;
use crate::cache::NO_CACHE_MARKER;
use crate::checkers::keys;

/// 리비전 메타데이터 예약 디렉토리
pub const RESERVED_METADATA_DIR: &str = ".relgate";

/// 실행이 예정된 단일 검사
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledCheck {
    /// 체커 키
    pub checker: &'static str,
    /// 검사 대상 아티팩트 (리비전 전역 검사는 None)
    pub artifact: Option<Artifact>,
}

/// 정책 패턴이 컴파일된 분류기
#[derive(Debug)]
pub struct Classifier {
    binary: GlobSet,
    policy: ReleasePolicy,
}

impl Classifier {
    /// 정책의 분류 패턴을 컴파일하여 분류기를 만듭니다.
    ///
    /// 잘못된 glob 패턴은 정책 오류로 즉시 거부됩니다.
    /// source 패턴도 컴파일 가능성을 검증하지만, 분류 결과는
    /// binary 매칭 여부로만 갈립니다 (미매칭 기본값이 source).
    pub fn new(policy: &ReleasePolicy) -> Result<Self, ConfigError> {
        build_glob_set(&policy.source_artifact_paths, "source_artifact_paths")?;
        Ok(Self {
            binary: build_glob_set(&policy.binary_artifact_paths, "binary_artifact_paths")?,
            policy: policy.clone(),
        })
    }

    /// 단일 경로의 source/binary 분류를 반환합니다.
    pub fn classify(&self, rel_path: &str) -> Classification {
        if self.binary.is_match(rel_path) {
            Classification::Binary
        } else {
            Classification::Source
        }
    }

    /// 리비전 파일 목록 전체에 대한 검사 계획을 산출합니다.
    ///
    /// 리비전 전역 경로 검사 1건과 접미사 매핑에 따른
    /// 아티팩트별 검사가 포함됩니다. 예약 메타데이터 디렉토리와
    /// 캐시 비활성 마커는 아티팩트로 취급하지 않습니다.
    pub fn plan(&self, rel_paths: &[String]) -> Vec<ScheduledCheck> {
        let mut scheduled = vec![ScheduledCheck {
            checker: keys::PATHS_CHECK,
            artifact: None,
        }];

        for rel_path in rel_paths {
            if is_reserved_path(rel_path) {
                continue;
            }
            let classification = self.classify(rel_path);
            let artifact = Artifact {
                rel_path: rel_path.clone(),
                classification,
            };
            for checker in self.checkers_for(rel_path, classification) {
                scheduled.push(ScheduledCheck {
                    checker,
                    artifact: Some(artifact.clone()),
                });
            }
        }

        debug!(checks = scheduled.len(), "check plan built");
        scheduled
    }

    /// 접미사와 분류에 따른 체커 키 목록을 반환합니다.
    fn checkers_for(&self, rel_path: &str, classification: Classification) -> Vec<&'static str> {
        if rel_path.ends_with(".asc") {
            return vec![keys::SIGNATURE_VERIFY];
        }
        if rel_path.ends_with(".sha256") || rel_path.ends_with(".sha512") {
            return vec![keys::HASH_VERIFY];
        }
        if rel_path.ends_with(".cdx.json") {
            return vec![keys::SBOM_SCORE];
        }
        if is_archive_path(rel_path) {
            let mode = self.policy.license_check_mode;
            let mut checkers = vec![keys::ARCHIVE_INTEGRITY];
            match classification {
                Classification::Source => {
                    checkers.push(keys::ARCHIVE_STRUCTURE);
                    checkers.push(keys::LICENSE_FILES);
                    if mode.wants_lightweight() {
                        checkers.push(keys::LICENSE_HEADERS);
                    }
                    if mode.wants_rat() {
                        checkers.push(keys::RAT_SCAN);
                    }
                }
                Classification::Binary => {
                    checkers.push(keys::LICENSE_FILES);
                    // 바이너리 아카이브 내부의 소스 멤버는 항상 헤더 검사 대상
                    checkers.push(keys::LICENSE_HEADERS);
                }
            }
            return checkers;
        }
        Vec::new()
    }
}

/// 검사 스케줄에서 제외되는 예약 경로인지 반환합니다.
pub fn is_reserved_path(rel_path: &str) -> bool {
    rel_path == NO_CACHE_MARKER
        || rel_path == RESERVED_METADATA_DIR
        || rel_path.starts_with(".relgate/")
}

fn build_glob_set(patterns: &[String], field: &str) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidValue {
            field: field.to_owned(),
            reason: format!("invalid glob '{pattern}': {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: e.to_string(),
    })
}
