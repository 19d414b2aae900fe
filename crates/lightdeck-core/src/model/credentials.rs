use lightdeck_api::{Platform, Region};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Account credentials entered by the user.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    /// Phone country code as sent on login; also selects the region.
    pub country_code: String,
    pub platform: Platform,
}

impl Credentials {
    pub fn region(&self) -> Region {
        Region::from_country_code(&self.country_code)
    }
}

/// The persisted credential blob.
///
/// The password is stored in plaintext. It is only written when the user
/// explicitly asked to be remembered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub username: String,
    pub password: String,
    /// Country code, kept under its historical key.
    pub region: String,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "proxyUrl", default)]
    pub proxy_url: String,
}

impl StoredCredentials {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: SecretString::from(self.password.clone()),
            country_code: self.region.clone(),
            platform: self.platform,
        }
    }
}
