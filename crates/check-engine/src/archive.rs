//! 경계 아카이브 접근 — tar.gz/tgz/zip 읽기와 추출
//!
//! 모든 아카이브 접근은 멤버 수와 추출 크기 한도 안에서 이루어집니다.
//! 손상·잘림·한도 초과는 [`ArchiveError`]로 표면화되며, 체커가 이를
//! 상태 격자의 failure/exception으로 변환합니다.
//!
//! 이 모듈의 함수는 모두 동기 I/O이므로
//! `tokio::task::spawn_blocking` 내에서 호출되어야 합니다.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use metrics::counter;
use tracing::debug;

use relgate_core::config::EngineConfig;
use relgate_core::error::ArchiveError;
use relgate_core::metrics::ARCHIVE_MEMBERS_READ_TOTAL;

/// 아카이브 접근 한도
///
/// 한도 0은 해당 한도를 비활성화합니다.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveLimits {
    /// 최대 멤버 수
    pub max_members: usize,
    /// 최대 추출 바이트 수
    pub max_extract_size: u64,
    /// 스트리밍 읽기 버퍼 크기 (바이트)
    pub chunk_size: usize,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_members: 100_000,
            max_extract_size: 4 * 1024 * 1024 * 1024,
            chunk_size: 4 * 1024 * 1024,
        }
    }
}

impl From<&EngineConfig> for ArchiveLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_members: config.max_archive_members,
            max_extract_size: config.max_extract_size,
            chunk_size: config.chunk_size,
        }
    }
}

/// 지원하는 아카이브 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.tar.gz` / `.tgz`
    TarGz,
    /// `.zip`
    Zip,
}

/// 경로 접미사로 아카이브 형식을 판별합니다.
pub fn detect_format(rel_path: &str) -> Result<ArchiveFormat, ArchiveError> {
    if rel_path.ends_with(".tar.gz") || rel_path.ends_with(".tgz") {
        Ok(ArchiveFormat::TarGz)
    } else if rel_path.ends_with(".zip") {
        Ok(ArchiveFormat::Zip)
    } else {
        Err(ArchiveError::UnsupportedFormat {
            path: rel_path.to_owned(),
        })
    }
}

/// 경로가 지원 아카이브 접미사를 갖는지 반환합니다.
pub fn is_archive_path(rel_path: &str) -> bool {
    detect_format(rel_path).is_ok()
}

/// 아카이브 멤버 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    /// 아카이브 내부 경로 (선행 `./` 제거)
    pub path: String,
    /// 멤버 크기 (바이트)
    pub size: u64,
    /// 디렉토리 여부
    pub is_dir: bool,
}

fn unreadable(path: &Path, err: impl std::fmt::Display) -> ArchiveError {
    ArchiveError::Unreadable {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

fn normalize_member_path(raw: &str) -> String {
    let trimmed = raw.strip_prefix("./").unwrap_or(raw);
    trimmed.trim_end_matches('/').to_owned()
}

/// 아카이브의 모든 멤버를 끝까지 읽어 나열합니다.
///
/// 멤버 바이트를 전부 소비하므로 손상과 잘림이 여기서 드러납니다.
/// 멤버 수가 한도를 넘으면 즉시 중단합니다. 장치 노드는 건너뜁니다.
pub fn list_members(
    archive_path: &Path,
    rel_path: &str,
    limits: &ArchiveLimits,
) -> Result<Vec<MemberInfo>, ArchiveError> {
    let members = match detect_format(rel_path)? {
        ArchiveFormat::TarGz => list_tar_members(archive_path, limits)?,
        ArchiveFormat::Zip => list_zip_members(archive_path, limits)?,
    };
    counter!(ARCHIVE_MEMBERS_READ_TOTAL).increment(members.len() as u64);
    debug!(
        path = rel_path,
        members = members.len(),
        "archive members listed"
    );
    Ok(members)
}

fn list_tar_members(
    archive_path: &Path,
    limits: &ArchiveLimits,
) -> Result<Vec<MemberInfo>, ArchiveError> {
    let file = File::open(archive_path).map_err(|e| unreadable(archive_path, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut members = Vec::new();

    let entries = archive
        .entries()
        .map_err(|e| unreadable(archive_path, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| unreadable(archive_path, e))?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_block_special() || entry_type.is_character_special() {
            continue;
        }
        let raw = entry
            .path()
            .map_err(|e| unreadable(archive_path, e))?
            .to_string_lossy()
            .into_owned();
        let path = normalize_member_path(&raw);
        if path.is_empty() {
            continue;
        }
        // 멤버 바이트를 전부 소비하여 잘림을 표면화
        let size =
            std::io::copy(&mut entry, &mut std::io::sink()).map_err(|e| unreadable(archive_path, e))?;
        members.push(MemberInfo {
            path,
            size,
            is_dir: entry_type.is_dir(),
        });
        if limits.max_members > 0 && members.len() > limits.max_members {
            return Err(ArchiveError::MemberLimitExceeded {
                max: limits.max_members,
            });
        }
    }
    Ok(members)
}

fn list_zip_members(
    archive_path: &Path,
    limits: &ArchiveLimits,
) -> Result<Vec<MemberInfo>, ArchiveError> {
    let file = File::open(archive_path).map_err(|e| unreadable(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| unreadable(archive_path, e))?;
    if limits.max_members > 0 && archive.len() > limits.max_members {
        return Err(ArchiveError::MemberLimitExceeded {
            max: limits.max_members,
        });
    }
    let mut members = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|e| unreadable(archive_path, e))?;
        let path = normalize_member_path(member.name());
        if path.is_empty() {
            continue;
        }
        let is_dir = member.is_dir();
        // CRC 불일치는 끝까지 읽을 때 드러남
        let size = std::io::copy(&mut member, &mut std::io::sink())
            .map_err(|e| unreadable(archive_path, e))?;
        members.push(MemberInfo { path, size, is_dir });
    }
    Ok(members)
}

/// 멤버 목록에서 단일 루트 디렉토리를 결정합니다.
///
/// `._`로 시작하는 베이스네임은 보조 메타데이터로 간주하여 무시합니다.
/// 루트가 없으면 [`ArchiveError::NoRootDirectory`], 둘 이상이면
/// [`ArchiveError::MultipleRootDirectories`]를 반환합니다.
pub fn root_directory(members: &[MemberInfo]) -> Result<String, ArchiveError> {
    let mut root: Option<String> = None;
    for member in members {
        let base = member.path.rsplit('/').next().unwrap_or(&member.path);
        if base.starts_with("._") {
            continue;
        }
        let first = member.path.split('/').next().unwrap_or(&member.path);
        if first.starts_with("._") {
            continue;
        }
        match &root {
            None => root = Some(first.to_owned()),
            Some(existing) if existing == first => {}
            Some(existing) => {
                return Err(ArchiveError::MultipleRootDirectories {
                    first: existing.clone(),
                    second: first.to_owned(),
                });
            }
        }
    }
    let root = root.ok_or(ArchiveError::NoRootDirectory)?;

    // 루트는 디렉토리여야 함: 디렉토리 멤버이거나 하위 멤버가 존재
    let is_directory = members.iter().any(|m| {
        (m.path == root && m.is_dir) || m.path.strip_prefix(&root).is_some_and(|r| r.starts_with('/'))
    });
    if !is_directory {
        return Err(ArchiveError::NoRootDirectory);
    }
    Ok(root)
}

/// 아카이브에서 단일 멤버의 내용을 읽습니다.
///
/// 멤버가 없으면 `Ok(None)`, 멤버가 `max_bytes`를 넘으면
/// [`ArchiveError::ExtractTooLarge`]를 반환합니다.
pub fn read_member(
    archive_path: &Path,
    rel_path: &str,
    member_path: &str,
    max_bytes: u64,
) -> Result<Option<Vec<u8>>, ArchiveError> {
    match detect_format(rel_path)? {
        ArchiveFormat::TarGz => {
            let file = File::open(archive_path).map_err(|e| unreadable(archive_path, e))?;
            let mut archive = tar::Archive::new(GzDecoder::new(file));
            let entries = archive
                .entries()
                .map_err(|e| unreadable(archive_path, e))?;
            for entry in entries {
                let mut entry = entry.map_err(|e| unreadable(archive_path, e))?;
                let raw = entry
                    .path()
                    .map_err(|e| unreadable(archive_path, e))?
                    .to_string_lossy()
                    .into_owned();
                if normalize_member_path(&raw) != member_path {
                    continue;
                }
                if max_bytes > 0 && entry.size() > max_bytes {
                    return Err(ArchiveError::ExtractTooLarge { max: max_bytes });
                }
                let mut buf = Vec::new();
                entry
                    .read_to_end(&mut buf)
                    .map_err(|e| unreadable(archive_path, e))?;
                return Ok(Some(buf));
            }
            Ok(None)
        }
        ArchiveFormat::Zip => {
            let file = File::open(archive_path).map_err(|e| unreadable(archive_path, e))?;
            let mut archive =
                zip::ZipArchive::new(file).map_err(|e| unreadable(archive_path, e))?;
            let mut member = match archive.by_name(member_path) {
                Ok(member) => member,
                Err(zip::result::ZipError::FileNotFound) => return Ok(None),
                Err(e) => return Err(unreadable(archive_path, e)),
            };
            if max_bytes > 0 && member.size() > max_bytes {
                return Err(ArchiveError::ExtractTooLarge { max: max_bytes });
            }
            let mut buf = Vec::new();
            member
                .read_to_end(&mut buf)
                .map_err(|e| unreadable(archive_path, e))?;
            Ok(Some(buf))
        }
    }
}

/// 아카이브 전체를 대상 디렉토리로 추출합니다.
///
/// 추출 누적 크기가 한도를 넘으면 중단하고, 대상을 벗어나는
/// 경로(절대 경로, `..`)와 장치 노드는 건너뜁니다.
/// 추출한 총 바이트 수를 반환합니다.
pub fn extract(
    archive_path: &Path,
    rel_path: &str,
    dest: &Path,
    limits: &ArchiveLimits,
) -> Result<u64, ArchiveError> {
    match detect_format(rel_path)? {
        ArchiveFormat::TarGz => extract_tar(archive_path, dest, limits),
        ArchiveFormat::Zip => extract_zip(archive_path, dest, limits),
    }
}

fn extract_tar(archive_path: &Path, dest: &Path, limits: &ArchiveLimits) -> Result<u64, ArchiveError> {
    let file = File::open(archive_path).map_err(|e| unreadable(archive_path, e))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut total: u64 = 0;
    let mut count: usize = 0;

    let entries = archive
        .entries()
        .map_err(|e| unreadable(archive_path, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| unreadable(archive_path, e))?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_block_special() || entry_type.is_character_special() {
            continue;
        }
        count += 1;
        if limits.max_members > 0 && count > limits.max_members {
            return Err(ArchiveError::MemberLimitExceeded {
                max: limits.max_members,
            });
        }
        total = total.saturating_add(entry.size());
        if limits.max_extract_size > 0 && total > limits.max_extract_size {
            return Err(ArchiveError::ExtractTooLarge {
                max: limits.max_extract_size,
            });
        }
        // unpack_in은 대상을 벗어나는 경로를 거부함
        entry
            .unpack_in(dest)
            .map_err(|e| unreadable(archive_path, e))?;
    }
    Ok(total)
}

fn extract_zip(archive_path: &Path, dest: &Path, limits: &ArchiveLimits) -> Result<u64, ArchiveError> {
    let file = File::open(archive_path).map_err(|e| unreadable(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| unreadable(archive_path, e))?;
    if limits.max_members > 0 && archive.len() > limits.max_members {
        return Err(ArchiveError::MemberLimitExceeded {
            max: limits.max_members,
        });
    }
    let mut total: u64 = 0;
    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|e| unreadable(archive_path, e))?;
        let Some(relative) = member.enclosed_name() else {
            // 대상을 벗어나는 이름은 건너뜀
            continue;
        };
        let out_path = dest.join(relative);
        if member.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| unreadable(archive_path, e))?;
            continue;
        }
        total = total.saturating_add(member.size());
        if limits.max_extract_size > 0 && total > limits.max_extract_size {
            return Err(ArchiveError::ExtractTooLarge {
                max: limits.max_extract_size,
            });
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| unreadable(archive_path, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| unreadable(archive_path, e))?;
        std::io::copy(&mut member, &mut out).map_err(|e| unreadable(archive_path, e))?;
    }
    Ok(total)
}
