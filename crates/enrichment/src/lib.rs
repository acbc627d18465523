//! `medstock-enrichment` — drug-label lookup against the OpenFDA catalog.
//!
//! Implements the catalog's [`DescriptionSource`] seam: when a medicine is
//! created, its name is searched against the drug-label endpoint and the
//! first matching label is condensed into a description. The lookup is
//! best-effort with a bounded deadline; any failure means "no description"
//! and the caller keeps the draft's own text.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use medstock_catalog::{truncate_description, DescriptionSource};

/// Deadline for one label lookup. Creation must not hang on the catalog.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Default OpenFDA endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.fda.gov";

/// JSON envelope returned by the drug-label endpoint. Only the fields the
/// description merge consumes are modeled; everything else is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct LabelEnvelope {
    #[serde(default)]
    pub results: Vec<LabelResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LabelResult {
    #[serde(default)]
    pub openfda: OpenFdaFields,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub purpose: Vec<String>,
    #[serde(default)]
    pub contraindications: Vec<String>,
    #[serde(default)]
    pub indications_and_usage: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenFdaFields {
    #[serde(default)]
    pub brand_name: Vec<String>,
}

/// Pick the label whose brand names contain `name` (case-insensitively) and
/// condense its sections into one description: the first entry of each of
/// description, purpose, contraindications and indications-and-usage,
/// non-empty ones joined with `". "`, truncated to the catalog cap.
pub fn select_description(name: &str, envelope: &LabelEnvelope) -> Option<String> {
    let result = envelope.results.iter().find(|r| {
        r.openfda
            .brand_name
            .iter()
            .any(|brand| brand.eq_ignore_ascii_case(name))
    })?;

    let sections = [
        &result.description,
        &result.purpose,
        &result.contraindications,
        &result.indications_and_usage,
    ];
    let merged = sections
        .iter()
        .filter_map(|s| s.first())
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(". ");

    if merged.is_empty() {
        None
    } else {
        Some(truncate_description(&merged))
    }
}

/// HTTP client for the drug-label endpoint.
pub struct OpenFdaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenFdaClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    async fn fetch(&self, name: &str) -> Result<Option<String>, reqwest::Error> {
        let url = format!("{}/drug/label.json", self.base_url.trim_end_matches('/'));
        let envelope: LabelEnvelope = self
            .http
            .get(url)
            .query(&[("api_key", self.api_key.as_str()), ("search", name)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(select_description(name, &envelope))
    }
}

#[async_trait]
impl DescriptionSource for OpenFdaClient {
    async fn describe(&self, name: &str) -> Option<String> {
        match self.fetch(name).await {
            Ok(description) => description,
            Err(e) => {
                tracing::warn!(medicine = name, error = %e, "drug label lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medstock_catalog::MAX_DESCRIPTION_LEN;

    fn envelope(json: &str) -> LabelEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn selects_by_brand_name_case_insensitively() {
        let env = envelope(
            r#"{"results": [
                {"openfda": {"brand_name": ["Tylenol"]}, "purpose": ["Fever reducer"]},
                {"openfda": {"brand_name": ["ASPIRIN"]}, "purpose": ["Pain reliever"]}
            ]}"#,
        );
        assert_eq!(
            select_description("aspirin", &env).as_deref(),
            Some("Pain reliever")
        );
    }

    #[test]
    fn joins_first_entry_of_each_section() {
        let env = envelope(
            r#"{"results": [{
                "openfda": {"brand_name": ["Aspirin"]},
                "description": ["Acetylsalicylic acid", "ignored second entry"],
                "purpose": [""],
                "contraindications": ["Do not use with bleeding disorders"],
                "indications_and_usage": ["Headache"]
            }]}"#,
        );
        assert_eq!(
            select_description("Aspirin", &env).as_deref(),
            Some("Acetylsalicylic acid. Do not use with bleeding disorders. Headache")
        );
    }

    #[test]
    fn no_matching_brand_yields_none() {
        let env = envelope(
            r#"{"results": [{"openfda": {"brand_name": ["Tylenol"]}, "purpose": ["x"]}]}"#,
        );
        assert_eq!(select_description("Aspirin", &env), None);
        assert_eq!(select_description("Aspirin", &envelope("{}")), None);
    }

    #[test]
    fn all_sections_empty_yields_none() {
        let env = envelope(r#"{"results": [{"openfda": {"brand_name": ["Aspirin"]}}]}"#);
        assert_eq!(select_description("Aspirin", &env), None);
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let long = "x".repeat(400);
        let env = envelope(&format!(
            r#"{{"results": [{{"openfda": {{"brand_name": ["Aspirin"]}}, "description": ["{long}"]}}]}}"#
        ));
        let description = select_description("Aspirin", &env).unwrap();
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_LEN);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let env = envelope(
            r#"{"meta": {"disclaimer": "..."}, "results": [{
                "openfda": {"brand_name": ["Aspirin"], "generic_name": ["ASPIRIN"]},
                "purpose": ["Pain reliever"],
                "warnings": ["ignored"]
            }]}"#,
        );
        assert_eq!(
            select_description("Aspirin", &env).as_deref(),
            Some("Pain reliever")
        );
    }
}
