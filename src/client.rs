//! Authenticated HTTP client for the goblin.meme box API.
//!
//! One `reqwest::Client` carries the session cookie, a browser-like
//! identity, and the front-end referer on every request. Requests are
//! debug-logged and failures error-logged uniformly; headers are never
//! mutated after construction.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue, REFERER, USER_AGENT,
};
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::config::secrets::ExposeSecret;
use crate::error::{Error, Result};
use crate::model::{ActionResult, BoxList, BoxStatus, BoxSummary};

const FRONT_END_URL: &str = "https://www.goblin.meme/";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Claim endpoints, tried in order. The write-side API surface is
/// undocumented; the first candidate answering 200/201 wins.
const OPEN_CANDIDATES: [&str; 3] = ["open", "claim", "collect"];

/// Identity endpoints, tried in order, best effort.
const IDENTITY_CANDIDATES: [&str; 3] = ["/user", "/profile", "/me"];

pub struct GoblinClient {
    http: reqwest::Client,
    base_url: String,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl GoblinClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut cookie = HeaderValue::from_str(config.cookie.expose_secret()).map_err(|_| {
            Error::Config("cookie contains characters not valid in a header".to_string())
        })?;
        cookie.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,id;q=0.8"),
        );
        headers.insert(REFERER, HeaderValue::from_static(FRONT_END_URL));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry_attempts: config.retry_attempts.max(1),
            retry_delay: config.retry_delay,
        })
    }

    /// All boxes currently flagged active. Errors propagate; callers
    /// treat any failure as "cannot enumerate boxes this cycle".
    pub async fn list_boxes(&self) -> Result<Vec<BoxSummary>> {
        debug!("fetching all boxes");
        let response = ensure_success(self.get("/box").await?).await?;
        let list: BoxList = response.json().await?;
        Ok(list.boxes.into_iter().filter(|b| b.active).collect())
    }

    /// Detailed status of one box. Errors propagate.
    pub async fn box_status(&self, box_id: &str) -> Result<BoxStatus> {
        debug!(box_id, "fetching box status");
        let response = ensure_success(self.get(&format!("/box/{box_id}")).await?).await?;
        Ok(response.json().await?)
    }

    /// Start a box. Failures come back as a failure `ActionResult`,
    /// never as an error.
    pub async fn start_box(&self, box_id: &str) -> ActionResult {
        debug!(box_id, "starting box");
        let response = match self.post(&format!("/box/{box_id}/start")).await {
            Ok(r) => r,
            Err(e) => return ActionResult::failure(e.to_string()),
        };

        if is_created(response.status()) {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            ActionResult::started(parse_ready_at(&body))
        } else {
            ActionResult::failure(extract_message(response).await)
        }
    }

    /// Claim a matured box, trying the candidate endpoints in order and
    /// stopping at the first 200/201. When every candidate fails, the
    /// failure reported is the last candidate's.
    pub async fn open_box(&self, box_id: &str) -> ActionResult {
        debug!(box_id, "opening box");
        let mut last_failure = ActionResult::failure("no claim endpoint responded");

        for candidate in OPEN_CANDIDATES {
            let path = format!("/box/{box_id}/{candidate}");
            match self.post(&path).await {
                Ok(response) if is_created(response.status()) => {
                    let body: serde_json::Value = response.json().await.unwrap_or_default();
                    return ActionResult::opened(parse_reward(&body));
                }
                Ok(response) => {
                    last_failure = ActionResult::failure(extract_message(response).await);
                }
                Err(e) => last_failure = ActionResult::failure(e.to_string()),
            }
        }
        last_failure
    }

    /// True iff the box list is reachable with the current cookie.
    /// 401 means the cookie is dead; any other failure propagates.
    pub async fn validate_cookie(&self) -> Result<bool> {
        debug!("validating cookie");
        let response = self.get("/box").await?;
        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status == StatusCode::UNAUTHORIZED {
            error!("cookie expired or invalid");
            return Ok(false);
        }
        let message = extract_message(response).await;
        error!(%status, %message, "cookie validation hit an unexpected error");
        Err(Error::Api { status, message })
    }

    /// Probe the identity endpoints, best effort. Never errors; `None`
    /// when nothing responded usefully.
    pub async fn user_info(&self) -> Option<serde_json::Value> {
        debug!("fetching user info");
        for candidate in IDENTITY_CANDIDATES {
            match self.get(candidate).await {
                Ok(response) if response.status().is_success() => match response.json().await {
                    Ok(body) => return Some(body),
                    Err(e) => debug!(error = %e, candidate, "identity body unreadable"),
                },
                Ok(response) => {
                    debug!(status = %response.status(), candidate, "identity probe refused");
                }
                Err(e) => debug!(error = %e, candidate, "identity probe failed"),
            }
        }
        None
    }

    /// GET with bounded retry on transport errors and 5xx responses.
    /// The last response or error is returned unchanged once attempts
    /// run out, so status-code semantics survive the retry layer.
    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{path}", self.base_url);
        let mut delay = self.retry_delay;
        let mut attempt = 1;
        loop {
            debug!(%url, attempt, "GET");
            match self.http.get(&url).send().await {
                Ok(response) => {
                    debug!(status = %response.status(), %url, "response received");
                    if response.status().is_server_error() && attempt < self.retry_attempts {
                        warn!(status = %response.status(), %url, attempt, "server error, retrying");
                    } else {
                        return Ok(response);
                    }
                }
                Err(e) => {
                    if attempt < self.retry_attempts {
                        warn!(error = %e, %url, attempt, "request failed, retrying");
                    } else {
                        error!(error = %e, %url, "request failed");
                        return Err(e.into());
                    }
                }
            }
            tokio::time::sleep(delay).await;
            delay *= 2;
            attempt += 1;
        }
    }

    /// POST without retry; start and open are not idempotent.
    async fn post(&self, path: &str) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "POST");
        let result = self.http.post(&url).send().await;
        match &result {
            Ok(response) => debug!(status = %response.status(), %url, "response received"),
            Err(e) => error!(error = %e, %url, "request failed"),
        }
        result
    }
}

/// Convert a non-2xx response into `Error::Api` with an extracted
/// human-readable message.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = extract_message(response).await;
    error!(%status, %message, "API error");
    Err(Error::Api { status, message })
}

/// Best human-readable message in an error response, in priority
/// order: a string body, a `message` field, an `error` field, the raw
/// body text.
async fn extract_message(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if let Ok(body) = serde_json::from_str::<serde_json::Value>(&text) {
        match body {
            serde_json::Value::String(s) => return s,
            serde_json::Value::Object(map) => {
                for key in ["message", "error"] {
                    if let Some(s) = map.get(key).and_then(|v| v.as_str()) {
                        return s.to_string();
                    }
                }
            }
            _ => {}
        }
    }

    if text.trim().is_empty() {
        format!("unexpected response status: {status}")
    } else {
        text
    }
}

/// The service answers 200 or 201 on successful state transitions.
fn is_created(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::CREATED
}

fn parse_ready_at(body: &serde_json::Value) -> Option<DateTime<Utc>> {
    body.get("readyAt")?.as_str()?.parse::<DateTime<Utc>>().ok()
}

fn parse_reward(body: &serde_json::Value) -> String {
    for key in ["reward", "prize"] {
        if let Some(value) = body.get(key) {
            if let Some(s) = value.as_str() {
                return s.to_string();
            }
            if !value.is_null() {
                return value.to_string();
            }
        }
    }
    "Unknown reward".to_string()
}
