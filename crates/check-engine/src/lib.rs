#![doc = include_str!("../README.md")]

pub mod archive;
pub mod cache;
pub mod checkers;
pub mod classify;
pub mod executor;
pub mod keyring;
pub mod registry;
pub mod store;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

pub use archive::{ArchiveFormat, ArchiveLimits, MemberInfo};
pub use cache::NO_CACHE_MARKER;
pub use classify::{Classifier, ScheduledCheck};
pub use executor::{CheckExecutor, CheckExecutorBuilder, RunSummary};
pub use keyring::{KeyBinding, Keyring};
pub use registry::{CheckContext, Checker, CheckerRegistry, Finding};
pub use store::MemoryResultStore;
