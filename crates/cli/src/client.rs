//! A thin wrapper over `reqwest` for the admin HTTP API's one-POST-per-
//! resource, tagged-command convention (spec §6): every call posts a
//! `{"command": ..., ...}` body to a resource path and gets back an
//! [`signpost_api::Envelope`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use signpost_api::Envelope;

#[derive(Clone, Debug)]
pub struct SignpostApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl SignpostApiClient {
    pub fn new(base_url: String) -> Self {
        Self { base_url, http: reqwest::Client::new() }
    }

    /// POST `command` to `path` and unwrap the response envelope.
    pub async fn call<Cmd, T>(&self, path: &str, command: &Cmd) -> Result<T, String>
    where
        Cmd: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);
        let response = self.http.post(&url).json(command).send().await.map_err(format_http_error)?;
        let envelope: Envelope<T> = response.json().await.map_err(format_http_error)?;
        match envelope {
            Envelope::Ok { data, .. } => Ok(data),
            Envelope::Err { error_msg, .. } => Err(error_msg),
        }
    }
}

pub fn format_http_error(err: reqwest::Error) -> String {
    format!("request to Signpost failed: {err}")
}
