use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::api::{self, CUSTOM_FIELD_TARGET, CustomFieldApi};
use crate::error::{Result, ToolError};
use crate::model::{CustomFieldDefinition, PatchReply, PatchRequest};

/// Blocking HTTP implementation of [`CustomFieldApi`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

#[derive(Serialize)]
struct TokenExchangeRequest<'a> {
    api_token: &'a str,
    tenant: &'a str,
}

#[derive(Deserialize)]
struct TokenExchangeResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct CustomFieldList {
    data: Vec<CustomFieldRecord>,
}

#[derive(Deserialize)]
struct CustomFieldRecord {
    id: Value,
    attributes: CustomFieldAttributes,
}

#[derive(Deserialize)]
struct CustomFieldAttributes {
    name: String,
}

impl From<CustomFieldRecord> for CustomFieldDefinition {
    fn from(record: CustomFieldRecord) -> Self {
        let id = match record.id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        Self {
            id,
            name: record.attributes.name,
        }
    }
}

impl ApiClient {
    /// Creates a client for the service rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self::with_client(base_url, http))
    }

    /// Creates a client reusing an already configured reqwest client.
    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl CustomFieldApi for ApiClient {
    #[instrument(level = "info", skip_all, fields(tenant = %tenant))]
    fn exchange_token(&self, api_token: &str, tenant: &str) -> Result<String> {
        let url = api::auth_exchange_url(&self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&TokenExchangeRequest { api_token, tenant })
            .send()
            .map_err(|error| ToolError::TokenExchange(error.to_string()))?;

        let status = response.status().as_u16();
        if !is_ok_status(&response) {
            return Err(ToolError::TokenExchangeRejected(status));
        }

        let body: TokenExchangeResponse = response
            .json()
            .map_err(|error| ToolError::TokenExchange(error.to_string()))?;
        let token = body
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(ToolError::MissingAccessToken)?;

        info!("successfully exchanged API token for bearer token");
        Ok(token)
    }

    #[instrument(level = "info", skip_all, fields(tenant = %tenant))]
    fn fetch_custom_fields(&self, bearer: &str, tenant: &str) -> Result<Vec<CustomFieldDefinition>> {
        let url = api::custom_fields_url(&self.base_url, tenant);
        let response = self
            .http
            .get(&url)
            .bearer_auth(bearer)
            .query(&[("filter[target]", CUSTOM_FIELD_TARGET)])
            .send()
            .map_err(|error| ToolError::CatalogFetch(error.to_string()))?;

        if !is_ok_status(&response) {
            return Err(ToolError::CatalogRejected {
                tenant: tenant.to_string(),
                status: response.status().as_u16(),
            });
        }

        let list: CustomFieldList = response
            .json()
            .map_err(|error| ToolError::CatalogFetch(error.to_string()))?;
        info!(
            field_count = list.data.len(),
            "successfully fetched {} custom fields for tenant {tenant}",
            list.data.len()
        );
        Ok(list.data.into_iter().map(CustomFieldDefinition::from).collect())
    }

    fn patch_custom_field(&self, bearer: &str, request: &PatchRequest) -> Result<PatchReply> {
        let response = self
            .http
            .patch(&request.url)
            .bearer_auth(bearer)
            .json(&request.payload)
            .send()
            .map_err(|error| ToolError::Transport(error.to_string()))?;

        let status = response.status().as_u16();
        let body = match response.text() {
            Ok(body) => body,
            Err(error) => {
                debug!(status, %error, "failed to read PATCH response body");
                format!("<unreadable response body: {error}>")
            }
        };
        debug!(status, body_len = body.len(), "PATCH answered");
        Ok(PatchReply { status, body })
    }
}

/// Anything below 400 counts as success, as in the rest of the pipeline.
fn is_ok_status(response: &Response) -> bool {
    response.status().as_u16() < 400
}
