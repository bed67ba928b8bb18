//! HTTP client for a remote compass server.
//!
//! Implements the same [`JourneyStore`] and [`ImageHost`] contracts as local
//! storage, so the CLI and the draft controller don't care which one they hold.

use std::time::Duration;

use reqwest::{
    StatusCode,
    blocking::{RequestBuilder, Response},
    header,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::Session,
    model::{Journey, JourneySummary, User},
    server::ErrorBody,
    store::{ImageHost, JourneyStore, Result, StoreError},
    validate::ValidatedJourney,
};

const TIMEOUT: Duration = Duration::from_secs(30);

pub struct Client {
    base_url: String,
    token: Option<String>,
    http: reqwest::blocking::Client,
}

impl Client {
    /// A client for the server at `base_url`, optionally carrying a session token.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchanges credentials for a session.
    pub fn login(&self, email: &str, password: &str) -> Result<Session> {
        let req = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }));
        self.call(req, None)
    }

    /// Ends the session behind the configured token.
    pub fn logout(&self) -> Result<()> {
        self.send(self.http.post(self.url("/api/auth/logout")), None)?;
        Ok(())
    }

    /// The user the configured token belongs to.
    pub fn me(&self) -> Result<User> {
        self.call(self.http.get(self.url("/api/auth/me")), None)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn send(&self, req: RequestBuilder, id: Option<Uuid>) -> Result<Response> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let resp = req.send().map_err(transport)?;
        check(resp, id)
    }

    fn call<T: DeserializeOwned>(&self, req: RequestBuilder, id: Option<Uuid>) -> Result<T> {
        self.send(req, id)?.json().map_err(transport)
    }

    fn write<B: Serialize + ?Sized>(
        &self,
        req: RequestBuilder,
        id: Option<Uuid>,
        body: &B,
    ) -> Result<Journey> {
        self.call(req.json(body), id)
    }
}

/// Maps a non-success response onto a [`StoreError`].
fn check(resp: Response, id: Option<Uuid>) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body: Option<ErrorBody> = resp.json().ok();
    let message = body
        .as_ref()
        .map_or_else(|| status.to_string(), |b| b.message.clone());
    warn!(%status, %message, "server rejected request");
    Err(match (status, id) {
        (StatusCode::BAD_REQUEST, _) => {
            StoreError::Validation(body.map(|b| b.errors).unwrap_or_default())
        }
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => StoreError::Unauthorized(message),
        (StatusCode::NOT_FOUND, Some(id)) => StoreError::NotFound(id),
        _ => StoreError::Transport(format!("{status}: {message}")),
    })
}

fn transport(e: reqwest::Error) -> StoreError {
    StoreError::Transport(e.to_string())
}

impl JourneyStore for Client {
    fn create_journey(&self, journey: &ValidatedJourney) -> Result<Journey> {
        debug!(url = %self.base_url, "creating journey remotely");
        self.write(self.http.post(self.url("/api/reports")), None, journey)
    }

    fn update_journey(&self, id: Uuid, journey: &ValidatedJourney) -> Result<Journey> {
        debug!(%id, "updating journey remotely");
        let req = self.http.put(self.url(&format!("/api/reports/{id}")));
        self.write(req, Some(id), journey)
    }

    fn get_journey(&self, id: Uuid) -> Result<Journey> {
        self.call(self.http.get(self.url(&format!("/api/reports/{id}"))), Some(id))
    }

    fn list_journeys(&self) -> Result<Vec<JourneySummary>> {
        self.call(self.http.get(self.url("/api/reports")), None)
    }

    fn delete_journey(&self, id: Uuid) -> Result<()> {
        let req = self.http.delete(self.url(&format!("/api/reports/{id}")));
        self.send(req, Some(id))?;
        Ok(())
    }
}

#[derive(serde::Deserialize)]
struct Uploaded {
    url: String,
}

impl ImageHost for Client {
    fn upload_image(&self, bytes: &[u8], content_type: &str) -> Result<String> {
        let req = self
            .http
            .post(self.url("/api/uploads"))
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec());
        let Uploaded { url } = self.call(req, None)?;
        // Local assets come back as server-relative paths.
        Ok(if url.starts_with('/') { self.url(&url) } else { url })
    }
}
