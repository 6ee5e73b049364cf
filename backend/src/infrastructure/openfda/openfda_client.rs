/// OpenFDA drug label lookups
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::application::dto::drug_safety::NOT_AVAILABLE;
use crate::application::dto::DrugSafetyReport;
use crate::application::ports::DrugLabelSource;

pub const OPENFDA_LABEL_URL: &str = "https://api.fda.gov/drug/label.json";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);
const NO_WARNINGS: &str = "No warnings available";

/// Label fields searched in order
const SEARCH_FIELDS: [&str; 2] = ["brand_name", "generic_name"];

#[derive(Deserialize)]
struct LabelResponse {
    #[serde(default)]
    results: Vec<LabelEntry>,
}

#[derive(Deserialize)]
struct LabelEntry {
    #[serde(default)]
    openfda: OpenFdaFields,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Deserialize, Default)]
struct OpenFdaFields {
    #[serde(default)]
    brand_name: Vec<String>,
    #[serde(default)]
    generic_name: Vec<String>,
}

fn first_or(values: &[String], fallback: &str) -> String {
    values
        .first()
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

pub struct OpenFdaClient {
    client: Client,
    base_url: String,
}

impl OpenFdaClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(OPENFDA_LABEL_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// First label matching `openfda.<field>:<name>`, if the search succeeded
    async fn search(&self, field: &str, name: &str) -> Result<Option<LabelEntry>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search", format!("openfda.{}:{}", field, name)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .context("OpenFDA request failed")?;

        if !response.status().is_success() {
            debug!("OpenFDA {} search for {} returned {}", field, name, response.status());
            return Ok(None);
        }

        let body: LabelResponse = response
            .json()
            .await
            .context("Failed to parse OpenFDA response")?;
        Ok(body.results.into_iter().next())
    }

    async fn try_lookup(&self, name: &str) -> Result<Option<DrugSafetyReport>> {
        for field in SEARCH_FIELDS {
            if let Some(entry) = self.search(field, name).await? {
                return Ok(Some(DrugSafetyReport {
                    drug_name: name.to_string(),
                    brand: first_or(&entry.openfda.brand_name, NOT_AVAILABLE),
                    generic: first_or(&entry.openfda.generic_name, NOT_AVAILABLE),
                    warnings: first_or(&entry.warnings, NO_WARNINGS),
                    found: true,
                }));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl DrugLabelSource for OpenFdaClient {
    async fn lookup_drug(&self, name: &str) -> DrugSafetyReport {
        match self.try_lookup(name).await {
            Ok(Some(report)) => report,
            Ok(None) => {
                debug!("No OpenFDA label for {}", name);
                DrugSafetyReport::not_found(name)
            }
            Err(e) => {
                warn!("OpenFDA lookup for {} failed: {:#}", name, e);
                DrugSafetyReport::not_found(name)
            }
        }
    }
}
