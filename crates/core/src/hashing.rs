//! 콘텐츠 해시 유틸리티 — blake3 기반
//!
//! 캐시 키와 결과 레코드의 `inputs_hash` 필드에 쓰이는 해시를 계산합니다.
//! 모든 해시는 `blake3:<hex>` 형태로 렌더링됩니다.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 파일 내용의 blake3 해시를 계산합니다 (동기 I/O).
///
/// `chunk_size`는 `engine.chunk_size` 설정에서 온 읽기 버퍼 크기입니다.
/// `tokio::task::spawn_blocking` 내에서 호출되어야 합니다.
pub fn compute_file_hash(path: impl AsRef<Path>, chunk_size: usize) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("blake3:{}", hasher.finalize().to_hex()))
}

/// (키, 값) 쌍 목록의 해시를 계산합니다.
///
/// 키 기준으로 정렬 후 키와 값을 차례로 접어 넣으므로
/// 입력 순서와 무관하게 동일한 해시가 나옵니다.
pub fn compute_pairs_hash(pairs: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = pairs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let mut hasher = blake3::Hasher::new();
    for (key, value) in sorted {
        hasher.update(key.as_bytes());
        hasher.update(value.as_bytes());
    }
    format!("blake3:{}", hasher.finalize().to_hex())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_hash_has_prefix() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"release bytes").unwrap();
        let hash = compute_file_hash(file.path(), 4096).unwrap();
        assert!(hash.starts_with("blake3:"));
        assert_eq!(hash.len(), "blake3:".len() + 64);
    }

    #[test]
    fn file_hash_is_chunk_size_invariant() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"content longer than the smallest chunk")
            .unwrap();
        let small_chunks = compute_file_hash(file.path(), 7).unwrap();
        let one_chunk = compute_file_hash(file.path(), 64 * 1024).unwrap();
        assert_eq!(small_chunks, one_chunk);
    }

    #[test]
    fn pairs_hash_is_order_independent() {
        let a = vec![
            ("checker".to_owned(), "hash.verify".to_owned()),
            ("file_hash".to_owned(), "blake3:abc".to_owned()),
        ];
        let b = vec![
            ("file_hash".to_owned(), "blake3:abc".to_owned()),
            ("checker".to_owned(), "hash.verify".to_owned()),
        ];
        assert_eq!(compute_pairs_hash(&a), compute_pairs_hash(&b));
    }

    #[test]
    fn pairs_hash_is_value_sensitive() {
        let a = vec![("checker".to_owned(), "hash.verify".to_owned())];
        let b = vec![("checker".to_owned(), "signature.verify".to_owned())];
        assert_ne!(compute_pairs_hash(&a), compute_pairs_hash(&b));
    }
}
