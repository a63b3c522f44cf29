//! `sbom.score` — CycloneDX 문서 채점
//!
//! `.cdx.json` 문서의 구조 유효성, 적합성 점수, 라이선스 신호,
//! 취약점 신호를 평가하고, 이전 리비전 결과가 있으면 구성 요소 수
//! 변화를 함께 기록합니다. 결과는 단일 레코드로 집계됩니다.

use serde_json::{Value, json};

use relgate_core::error::CheckError;
use relgate_core::types::CheckStatus;

use crate::registry::{CheckContext, Checker, Finding};

use super::keys;

/// 이 점수 미만이면 warning
const SCORE_WARNING_THRESHOLD: u32 = 60;

/// SBOM 채점 체커
pub struct SbomChecker;

impl Checker for SbomChecker {
    fn key(&self) -> &'static str {
        keys::SBOM_SCORE
    }

    // 이전 문서와의 비교가 섞이므로 리비전 간 전달하지 않음
    fn cacheable(&self) -> bool {
        false
    }

    fn run(&self, ctx: &CheckContext) -> Result<Vec<Finding>, CheckError> {
        let rel_path = ctx.rel_path().to_owned();
        let path = ctx.artifact_path()?;
        let content = std::fs::read(&path).map_err(|e| CheckError::Io {
            path: rel_path.clone(),
            reason: e.to_string(),
        })?;

        let Ok(doc) = serde_json::from_slice::<Value>(&content) else {
            return Ok(vec![Finding::failure("SBOM document is not valid JSON")]);
        };
        if doc["bomFormat"].as_str() != Some("CycloneDX") {
            return Ok(vec![Finding::failure(
                "SBOM document is not a CycloneDX BOM (bomFormat missing or wrong)",
            )]);
        }
        if doc["specVersion"].as_str().is_none() {
            return Ok(vec![Finding::failure("SBOM document lacks specVersion")]);
        }

        let components = doc["components"].as_array().cloned().unwrap_or_default();
        let with_version = components
            .iter()
            .filter(|c| c["version"].as_str().is_some())
            .count();
        let with_purl = components
            .iter()
            .filter(|c| c["purl"].as_str().is_some())
            .count();
        let with_licenses = components
            .iter()
            .filter(|c| c["licenses"].as_array().is_some_and(|l| !l.is_empty()))
            .count();
        let vulnerabilities = doc["vulnerabilities"]
            .as_array()
            .map_or(0, |v| v.len());

        let score = conformance_score(&doc, &components, with_version, with_purl, with_licenses);

        let mut concerns = Vec::new();
        if score < SCORE_WARNING_THRESHOLD {
            concerns.push(format!("conformance score {score} is low"));
        }
        if !components.is_empty() && with_licenses == 0 {
            concerns.push("no component declares license information".to_owned());
        }
        if vulnerabilities > 0 {
            concerns.push(format!(
                "document records {vulnerabilities} known vulnerabilities"
            ));
        }

        let mut data = json!({
            "score": score,
            "components": components.len(),
            "with_licenses": with_licenses,
            "with_purl": with_purl,
            "vulnerabilities": vulnerabilities,
        });
        if let Some(prior) = &ctx.prior_data {
            if let Some(previous) = prior["components"].as_u64() {
                let delta = components.len() as i64 - previous as i64;
                data["previous_components"] = json!(previous);
                data["component_delta"] = json!(delta);
            }
        }

        let (status, message) = if concerns.is_empty() {
            (
                CheckStatus::Success,
                format!("SBOM conformance score {score}"),
            )
        } else {
            (CheckStatus::Warning, concerns.join("; "))
        };
        let finding = match status {
            CheckStatus::Success => Finding::success(message),
            _ => Finding::warning(message),
        };
        Ok(vec![finding.with_data(data)])
    }
}

/// 0~100 적합성 점수를 계산합니다.
fn conformance_score(
    doc: &Value,
    components: &[Value],
    with_version: usize,
    with_purl: usize,
    with_licenses: usize,
) -> u32 {
    let mut score: i64 = 100;
    if doc["serialNumber"].as_str().is_none() {
        score -= 10;
    }
    if doc["metadata"]["timestamp"].as_str().is_none() {
        score -= 5;
    }
    if doc["metadata"]["component"].as_object().is_none() {
        score -= 10;
    }
    if components.is_empty() {
        score -= 25;
    } else {
        let total = components.len() as f64;
        score -= ((1.0 - with_version as f64 / total) * 20.0) as i64;
        score -= ((1.0 - with_purl as f64 / total) * 15.0) as i64;
        score -= ((1.0 - with_licenses as f64 / total) * 15.0) as i64;
    }
    score.clamp(0, 100) as u32
}
