use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use crate::error::{ApiError, RemoteError};
use crate::model::{Ticket, TicketEnvelope, TicketField, TicketFieldPage};

const CONNECT_TIMEOUT_SECS: u64 = 30;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

const FIELDS_PAGE_PATH: &str = "/api/v2/ticket_fields.json?per_page=100";
// Upper bound on followed `next_page` links.
const MAX_FIELD_PAGES: usize = 50;

/// Token credentials, sent as basic auth `{email}/token:{api_token}`.
#[derive(Clone)]
pub struct Credentials {
    email: String,
    api_token: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            api_token: api_token.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

/// HTTP client bound to one account's API base URL.
#[derive(Debug, Clone)]
pub struct RecordClient {
    http: reqwest::Client,
    base: Url,
    credentials: Option<Credentials>,
}

fn http_client() -> Result<reqwest::Client, RemoteError> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert("Accept", HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .user_agent(concat!("safewrite/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
        .build()
        .map_err(RemoteError::Client)
}

impl RecordClient {
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self, RemoteError> {
        let base = Url::parse(base_url).map_err(|source| RemoteError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            http: http_client()?,
            base,
            credentials,
        })
    }

    pub async fn fetch_ticket(&self, ticket_id: u64) -> Result<Ticket, RemoteError> {
        let url = self.endpoint(&format!("/api/v2/tickets/{ticket_id}.json"))?;
        let envelope: TicketEnvelope = self.get_json(url).await?;
        Ok(envelope.ticket)
    }

    /// Set one custom field on a ticket. Other fields are left untouched.
    pub async fn update_custom_field(
        &self,
        ticket_id: u64,
        field_id: u64,
        value: Value,
    ) -> Result<(), RemoteError> {
        let url = self.endpoint(&format!("/api/v2/tickets/{ticket_id}.json"))?;
        let body = json!({
            "ticket": { "custom_fields": [{ "id": field_id, "value": value }] }
        });
        tracing::debug!(ticket_id, field_id, "Updating custom field");

        let request = self.authorize(self.http.put(url.clone())).json(&body);
        let response = request
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                url: url.to_string(),
                source,
            })?;
        check_status(response).await?;
        Ok(())
    }

    /// Every ticket field definition, following `next_page` links.
    pub async fn list_ticket_fields(&self) -> Result<Vec<TicketField>, RemoteError> {
        let mut fields = Vec::new();
        let mut next = Some(self.endpoint(FIELDS_PAGE_PATH)?);
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            pages += 1;
            let page: TicketFieldPage = self.get_json(url.clone()).await?;
            fields.extend(page.ticket_fields);

            let Some(raw_next) = page.next_page.filter(|raw| !raw.is_empty()) else {
                break;
            };
            let candidate = self.rebase(&raw_next)?;
            if candidate == url {
                break;
            }
            if pages >= MAX_FIELD_PAGES {
                tracing::warn!(pages, "Stopped following ticket field pages");
                break;
            }
            next = Some(candidate);
        }

        tracing::debug!(count = fields.len(), pages, "Listed ticket fields");
        Ok(fields)
    }

    fn endpoint(&self, path_and_query: &str) -> Result<Url, RemoteError> {
        self.base
            .join(path_and_query)
            .map_err(|source| RemoteError::InvalidUrl {
                url: path_and_query.to_string(),
                source,
            })
    }

    // Pagination links may name another host; only their path and query are kept.
    fn rebase(&self, link: &str) -> Result<Url, RemoteError> {
        let parsed = Url::parse(link).or_else(|_| self.base.join(link)).map_err(|source| {
            RemoteError::InvalidUrl {
                url: link.to_string(),
                source,
            }
        })?;
        let mut url = self.base.clone();
        url.set_path(parsed.path());
        url.set_query(parsed.query());
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some(creds) => {
                request.basic_auth(format!("{}/token", creds.email), Some(&creds.api_token))
            }
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        let response = self
            .authorize(self.http.get(url.clone()))
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                url: url.to_string(),
                source,
            })?;
        let response = check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| RemoteError::Decode {
                url: url.to_string(),
                source,
            })
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = read_capped_error_body(response).await;
    tracing::debug!(status = status.as_u16(), "Remote API returned an error");
    Err(ApiError::new(status.as_u16(), body))
}

async fn read_capped_error_body(response: reqwest::Response) -> String {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
