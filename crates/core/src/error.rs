//! 에러 타입 — 도메인별 에러 정의

/// Relgate 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum RelgateError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 무시 패턴 에러
    #[error("pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// 아카이브 접근 에러
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// 검사 실행 에러
    #[error("check error: {0}")]
    Check(#[from] CheckError),

    /// 결과 저장소 에러
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 무시 규칙 패턴 에러
///
/// 규칙 저장 시점에 동기적으로 거부되며, 잘못된 패턴은 저장되지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// 패턴 길이 초과 (조용한 절단 없이 거부)
    #[error("pattern exceeds {max} characters: {length}")]
    TooLong { length: usize, max: usize },

    /// 정규식 컴파일 실패
    #[error("invalid ignore pattern '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    /// 제약 필드가 하나도 없는 규칙
    #[error("ignore rule must constrain at least one field")]
    EmptyRule,
}

/// 아카이브 접근 에러
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// 지원하지 않는 아카이브 형식
    #[error("unsupported archive format: {path}")]
    UnsupportedFormat { path: String },

    /// 멤버 수 한도 초과
    #[error("archive has too many members: limit {max} exceeded")]
    MemberLimitExceeded { max: usize },

    /// 추출 크기 한도 초과
    #[error("archive extraction exceeds {max} bytes")]
    ExtractTooLarge { max: u64 },

    /// 손상되거나 잘린 아카이브
    #[error("unable to read archive {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// 루트 디렉토리를 찾을 수 없음
    #[error("no root directory found in archive")]
    NoRootDirectory,

    /// 루트 디렉토리가 여러 개
    #[error("multiple root directories found: {first}, {second}")]
    MultipleRootDirectories { first: String, second: String },
}

/// 검사 실행 에러
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// 등록되지 않은 체커 키
    #[error("unknown checker: {key}")]
    UnknownChecker { key: String },

    /// 위원회 키링 문제
    #[error("keyring error: {0}")]
    Keyring(String),

    /// 체커 내부 실행 실패 (exception 상태로 기록됨)
    #[error("checker {checker} failed: {reason}")]
    Invocation { checker: String, reason: String },

    /// 체커가 읽는 파일의 I/O 실패
    #[error("io error for {path}: {reason}")]
    Io { path: String, reason: String },
}

/// 결과 저장소 에러
///
/// 클레임 경합은 에러가 아니라 `try_claim`의 `false` 반환으로
/// 표현되므로 여기에는 내부 실패만 남습니다.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 내부 잠금 오염
    #[error("store lock poisoned")]
    LockPoisoned,
}
