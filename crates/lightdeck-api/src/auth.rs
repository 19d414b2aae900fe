// Authentication: region/platform selection, login and token refresh.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::debug;

use crate::client::CloudClient;
use crate::error::Error;
use crate::models::{TokenGrant, TokenResponse};

/// Cloud region. Selects the API root and whether requests need a relay.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Region {
    /// Default region; every country code other than `1` and `86`.
    #[default]
    Eu,
    /// Country code `1`.
    Us,
    /// Country code `86`. All calls are routed through the relay.
    Cn,
}

impl Region {
    /// Pick the region for a phone country code, as the login form sends it.
    pub fn from_country_code(code: &str) -> Self {
        match code.trim() {
            "1" => Self::Us,
            "86" => Self::Cn,
            _ => Self::Eu,
        }
    }

    /// Default API root for this region.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Eu => "https://px1.tuyaeu.com/homeassistant/",
            Self::Us => "https://px1.tuyaus.com/homeassistant/",
            Self::Cn => "https://px1.tuyacn.com/homeassistant/",
        }
    }

    pub fn requires_relay(self) -> bool {
        matches!(self, Self::Cn)
    }
}

/// Vendor app the account was registered with (`bizType` on login).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Tuya,
    SmartLife,
    JinvooSmart,
}

/// The `from` field every login carries.
const LOGIN_ORIGIN: &str = "tuya";

impl CloudClient {
    /// Log in with account credentials.
    ///
    /// `POST {base}/auth.do` with a form body
    /// (`userName, password, countryCode, bizType, from`). The cloud answers
    /// HTTP 200 either way; a body without `access_token` is a failed login.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        country_code: &str,
        platform: Platform,
    ) -> Result<TokenGrant, Error> {
        let url = self.endpoint("auth.do")?;
        debug!(username, country_code, %platform, "logging in");

        let form = [
            ("userName", username),
            ("password", password.expose_secret()),
            ("countryCode", country_code),
            ("bizType", platform.as_ref()),
            ("from", LOGIN_ORIGIN),
        ];

        let resp: TokenResponse = self.post_form(url, &form).await?;
        into_grant(resp)
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// `GET {base}/access.do?grant_type=refresh_token&refresh_token=..&rand=..`
    /// where `rand` is a cache buster.
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<TokenGrant, Error> {
        let url = self.endpoint("access.do")?;
        let rand = uuid::Uuid::new_v4().to_string();
        debug!("refreshing access token");

        let query = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
            ("rand", rand.as_str()),
        ];

        let resp: TokenResponse = self.get_json(url, &query).await?;
        into_grant(resp)
    }
}

fn into_grant(resp: TokenResponse) -> Result<TokenGrant, Error> {
    let Some(access_token) = resp.access_token else {
        return Err(Error::Authentication {
            message: resp
                .error_msg
                .unwrap_or_else(|| "response carried no access token".into()),
        });
    };

    Ok(TokenGrant {
        access_token,
        refresh_token: resp.refresh_token,
        expires_in: resp.expires_in,
    })
}
