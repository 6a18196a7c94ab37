//! Contentful Content Management API client.

use crate::config::Credentials;
use crate::content::client::ContentClient;
use crate::content::model::{ContentType, Entry};
use crate::error::{ContentError, ContentResult, ValidationIssue};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

const API_BASE: &str = "https://api.contentful.com";
const MEDIA_TYPE: &str = "application/vnd.contentful.management.v1+json";
const PAGE_SIZE: usize = 100;

#[derive(Clone)]
pub struct ManagementClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct EntryPage {
    items: Vec<Entry>,
    #[serde(default)]
    total: usize,
}

impl ManagementClient {
    pub fn new(credentials: &Credentials) -> ContentResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            token: credentials.management_token.clone(),
            base_url: format!(
                "{}/spaces/{}/environments/{}",
                API_BASE, credentials.space_id, credentials.environment
            ),
        })
    }

    /// Point the client at another host (proxies, mock servers)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json(&self, path: &str) -> ContentResult<Option<Value>> {
        debug!(path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(error_from_response(status.as_u16(), &body));
        }
        Ok(Some(serde_json::from_str(&body)?))
    }
}

/// Map a failed response to the error taxonomy
///
/// `422 ValidationFailed` becomes [`ContentError::Validation`] with every
/// `details.errors[]` entry; anything else is a plain API error.
fn error_from_response(status: u16, body: &str) -> ContentError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);

    if parsed["sys"]["id"] == "ValidationFailed" {
        let issues = parsed["details"]["errors"]
            .as_array()
            .map(|errors| {
                errors
                    .iter()
                    .map(|e| ValidationIssue {
                        path: e["path"]
                            .as_array()
                            .map(|p| {
                                p.iter()
                                    .map(|s| match s {
                                        Value::String(s) => s.clone(),
                                        other => other.to_string(),
                                    })
                                    .collect()
                            })
                            .unwrap_or_default(),
                        details: e["details"]
                            .as_str()
                            .or_else(|| e["name"].as_str())
                            .unwrap_or("invalid value")
                            .to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        return ContentError::Validation(issues);
    }

    let message = parsed["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string());
    ContentError::Api { status, message }
}

impl std::fmt::Debug for ManagementClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementClient")
            .field("token", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl ContentClient for ManagementClient {
    async fn get_entry(&self, id: &str) -> ContentResult<Option<Entry>> {
        match self.get_json(&format!("entries/{}", id)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn get_entries(&self, content_type: &str) -> ContentResult<Vec<Entry>> {
        let mut entries = Vec::new();
        loop {
            let path = format!(
                "entries?content_type={}&limit={}&skip={}",
                content_type,
                PAGE_SIZE,
                entries.len()
            );
            let page: EntryPage = match self.get_json(&path).await? {
                Some(value) => serde_json::from_value(value)?,
                None => break,
            };
            let fetched = page.items.len();
            entries.extend(page.items);
            if fetched == 0 || entries.len() >= page.total {
                break;
            }
        }
        Ok(entries)
    }

    async fn get_content_type(&self, id: &str) -> ContentResult<ContentType> {
        match self.get_json(&format!("content_types/{}", id)).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Err(ContentError::ContentTypeNotFound(id.to_string())),
        }
    }

    async fn update_entry(&self, entry: &Entry) -> ContentResult<Entry> {
        let version = entry.sys.version.unwrap_or(0);
        debug!(entry_id = entry.id(), version, "PUT");

        let body = serde_json::to_vec(&json!({ "fields": entry.fields }))?;
        let response = self
            .client
            .put(self.url(&format!("entries/{}", entry.id())))
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, MEDIA_TYPE)
            .header("X-Contentful-Version", version.to_string())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(error_from_response(status.as_u16(), &text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            space_id: "space1".into(),
            management_token: "cfpat-secret".into(),
            environment: "master".into(),
            deepl_api_key: None,
        }
    }

    #[test]
    fn builds_environment_urls() {
        let client = ManagementClient::new(&credentials()).unwrap();
        assert_eq!(
            client.url("entries/abc"),
            "https://api.contentful.com/spaces/space1/environments/master/entries/abc"
        );

        let local = client.with_base_url("http://localhost:8080/");
        assert_eq!(local.url("/content_types/page"), "http://localhost:8080/content_types/page");
    }

    #[test]
    fn debug_redacts_token() {
        let client = ManagementClient::new(&credentials()).unwrap();
        assert!(!format!("{:?}", client).contains("cfpat-secret"));
    }

    #[test]
    fn validation_errors_are_parsed() {
        let body = r#"{
            "sys": {"type": "Error", "id": "ValidationFailed"},
            "message": "Validation error",
            "details": {"errors": [
                {"name": "size", "path": ["fields", "title", "de"], "details": "Size must be at most 255"},
                {"name": "required", "path": ["fields", "body", "de"]}
            ]}
        }"#;
        match error_from_response(422, body) {
            ContentError::Validation(issues) => {
                assert_eq!(issues.len(), 2);
                assert_eq!(issues[0].field_name(), Some("title"));
                assert_eq!(issues[0].details, "Size must be at most 255");
                assert_eq!(issues[1].details, "required");
            }
            other => panic!("Expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn other_errors_keep_status_and_message() {
        match error_from_response(409, r#"{"sys":{"id":"VersionMismatch"},"message":"Version mismatch"}"#) {
            ContentError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Version mismatch");
            }
            other => panic!("Expected Api, got {:?}", other),
        }

        match error_from_response(502, "Bad Gateway") {
            ContentError::Api { message, .. } => assert_eq!(message, "Bad Gateway"),
            other => panic!("Expected Api, got {:?}", other),
        }
    }
}
