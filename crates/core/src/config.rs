//! 설정 관리 — relgate.toml 파싱 및 런타임 설정
//!
//! [`RelgateConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`RELGATE_ENGINE_MAX_ARCHIVE_MEMBERS=50000` 형식)
//! 3. 설정 파일 (`relgate.toml`)
//! 4. 기본값 (`Default` 구현)

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, RelgateError};

/// Relgate 통합 설정
///
/// `relgate.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelgateConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 검사 엔진 설정
    #[serde(default)]
    pub engine: EngineConfig,
}

impl RelgateConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RelgateError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RelgateError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RelgateError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                RelgateError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, RelgateError> {
        toml::from_str(toml_str).map_err(|e| {
            RelgateError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 네이밍 규칙: `RELGATE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "RELGATE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "RELGATE_GENERAL_LOG_FORMAT");

        override_usize(
            &mut self.engine.max_archive_members,
            "RELGATE_ENGINE_MAX_ARCHIVE_MEMBERS",
        );
        override_u64(
            &mut self.engine.max_extract_size,
            "RELGATE_ENGINE_MAX_EXTRACT_SIZE",
        );
        override_usize(&mut self.engine.chunk_size, "RELGATE_ENGINE_CHUNK_SIZE");
        override_bool(&mut self.engine.cache_enabled, "RELGATE_ENGINE_CACHE_ENABLED");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), RelgateError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.engine.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.chunk_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.engine.max_extract_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.max_extract_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 검사 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 아카이브 멤버 수 한도 (0 이하면 한도 해제)
    pub max_archive_members: usize,
    /// 아카이브 추출 총 크기 한도 (바이트)
    pub max_extract_size: u64,
    /// 파일/아카이브 스트리밍 읽기 청크 크기 (바이트)
    pub chunk_size: usize,
    /// 결과 캐시 전역 활성화 여부
    ///
    /// 리비전 루트의 no-cache 마커는 이 값과 무관하게
    /// 해당 리비전의 캐시를 끕니다.
    pub cache_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_archive_members: 100_000,
            max_extract_size: 4 * 1024 * 1024 * 1024, // 4GiB
            chunk_size: 4 * 1024 * 1024, // 4MiB
            cache_enabled: true,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = RelgateConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.engine.max_archive_members, 100_000);
        assert!(config.engine.cache_enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        RelgateConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = RelgateConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.engine.chunk_size, 4 * 1024 * 1024);
    }

    #[test]
    fn parse_partial_toml_merges_with_defaults() {
        let toml = r#"
[general]
log_level = "debug"

[engine]
max_archive_members = 500
cache_enabled = false
"#;
        let config = RelgateConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        // log_format은 기본값 유지
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.engine.max_archive_members, 500);
        assert!(!config.engine.cache_enabled);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let result = RelgateConfig::parse("invalid = [[[toml");
        assert!(matches!(
            result.unwrap_err(),
            RelgateError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = RelgateConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_zero_chunk_size() {
        let mut config = RelgateConfig::default();
        config.engine.chunk_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn validate_rejects_zero_extract_size() {
        let mut config = RelgateConfig::default();
        config.engine.max_extract_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_extract_size"));
    }

    #[test]
    #[serial_test::serial]
    fn env_override_applies() {
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("RELGATE_ENGINE_MAX_ARCHIVE_MEMBERS", "42") };
        let mut config = RelgateConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.engine.max_archive_members, 42);
        unsafe { std::env::remove_var("RELGATE_ENGINE_MAX_ARCHIVE_MEMBERS") };
    }

    #[test]
    #[serial_test::serial]
    fn env_override_invalid_keeps_original() {
        // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
        unsafe { std::env::set_var("RELGATE_ENGINE_CACHE_ENABLED", "not-a-bool") };
        let mut config = RelgateConfig::default();
        config.apply_env_overrides();
        assert!(config.engine.cache_enabled); // 원래 값 유지
        unsafe { std::env::remove_var("RELGATE_ENGINE_CACHE_ENABLED") };
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = RelgateConfig::from_file("/nonexistent/path/relgate.toml").await;
        assert!(matches!(
            result.unwrap_err(),
            RelgateError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = RelgateConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = RelgateConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(
            config.engine.max_archive_members,
            parsed.engine.max_archive_members
        );
    }
}
