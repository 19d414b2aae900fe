// Cloud API HTTP client
//
// Wraps `reqwest::Client` with region-aware URL construction, the optional
// relay prefix, and JSON body parsing. Endpoint operations (login, refresh,
// discovery, control) live in `auth.rs` and `skill.rs` as inherent methods.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Raw HTTP client for one regional API root.
///
/// Every URL is `{relay}{base_url}{path}`: the relay (when set) is a plain
/// string prefix, so the full regional URL ends up inside the relay's path.
#[derive(Debug, Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    base_url: Url,
    relay: Option<Url>,
}

impl CloudClient {
    /// Create a client for `base_url` (e.g. `https://px1.tuyaeu.com/homeassistant/`).
    pub fn new(base_url: Url, relay: Option<Url>, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, relay))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, relay: Option<Url>) -> Self {
        Self {
            http,
            base_url,
            relay,
        }
    }

    /// The regional API root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The relay prefix, if requests are routed through one.
    pub fn relay(&self) -> Option<&Url> {
        self.relay.as_ref()
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{relay}{base}{path}`.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let relay = self.relay.as_ref().map_or("", Url::as_str);
        let full = format!("{relay}{}{path}", self.base_url);
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request with query parameters and parse the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::parse_json(resp).await
    }

    /// Send a form-encoded POST and parse the JSON body.
    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        url: Url,
        form: &[(&str, &str)],
    ) -> Result<T, Error> {
        debug!("POST (form) {}", url);

        let resp = self
            .http
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::parse_json(resp).await
    }

    /// Send a JSON POST and parse the JSON body.
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::parse_json(resp).await
    }

    /// Read the body and deserialize it. The cloud reports most failures
    /// inside a 200 body, so the status code is only logged.
    async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if !status.is_success() {
            debug!(%status, "cloud answered with non-success status");
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn relay_prefixes_the_full_regional_url() {
        let client = CloudClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://px1.tuyacn.com/homeassistant/").unwrap(),
            Some(Url::parse("https://relay.example.com/").unwrap()),
        );
        let url = client.endpoint("skill").unwrap();
        assert_eq!(
            url.as_str(),
            "https://relay.example.com/https://px1.tuyacn.com/homeassistant/skill"
        );
    }

    #[test]
    fn no_relay_joins_base_and_path() {
        let client = CloudClient::with_client(
            reqwest::Client::new(),
            Url::parse("https://px1.tuyaeu.com/homeassistant/").unwrap(),
            None,
        );
        assert_eq!(
            client.endpoint("auth.do").unwrap().as_str(),
            "https://px1.tuyaeu.com/homeassistant/auth.do"
        );
    }
}
