//! Remote custom field API: the three calls a run makes, and the URLs they target.

pub mod client;

pub use client::ApiClient;

use crate::error::Result;
use crate::model::{CustomFieldDefinition, PatchReply, PatchRequest};

/// Catalog scope of every custom field lookup.
pub const CUSTOM_FIELD_TARGET: &str = "use_case";

/// Operations the pipeline needs from the remote service.
pub trait CustomFieldApi {
    /// Trades the long-lived API token for a bearer token.
    fn exchange_token(&self, api_token: &str, tenant: &str) -> Result<String>;

    /// Lists every custom field defined for use cases of `tenant`.
    fn fetch_custom_fields(&self, bearer: &str, tenant: &str) -> Result<Vec<CustomFieldDefinition>>;

    /// Sends one update. An answered request is `Ok` whatever its status;
    /// only transport failures are errors.
    fn patch_custom_field(&self, bearer: &str, request: &PatchRequest) -> Result<PatchReply>;
}

pub fn auth_exchange_url(base_url: &str) -> String {
    format!("{base_url}/auth/exchange")
}

pub fn custom_fields_url(base_url: &str, tenant: &str) -> String {
    format!("{base_url}/api/v2/{tenant}/custom_fields")
}

pub fn use_case_custom_fields_url(base_url: &str, tenant: &str, use_case_id: &str) -> String {
    format!("{base_url}/api/v2/{tenant}/use_cases/{use_case_id}/custom_fields")
}
