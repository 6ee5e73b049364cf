use async_trait::async_trait;

use crate::application::dto::DrugSafetyReport;

/// Looks up label warnings for a drug name.
///
/// Lookups never fail: missing data and transport errors both come back as
/// `DrugSafetyReport::not_found`.
#[async_trait]
pub trait DrugLabelSource: Send + Sync {
    async fn lookup_drug(&self, name: &str) -> DrugSafetyReport;
}
