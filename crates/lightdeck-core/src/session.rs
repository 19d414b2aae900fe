// ── Auth session manager ──
//
// Holds the token pair, the regional client and the online flag. Performs
// login, token refresh (manual and on a timer) and credential persistence.
//
// Refreshes never hold the state lock across the network call: two
// concurrent refreshes are allowed and the last one to finish wins.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lightdeck_api::{CloudClient, Region, TokenGrant, TransportConfig};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ControllerConfig;
use crate::error::{AuthError, StoreError};
use crate::model::{Credentials, StoredCredentials};
use crate::store::{self, PersistentStore, keys};

/// Cheaply cloneable handle to one session.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: ControllerConfig,
    store: Arc<dyn PersistentStore>,
    state: Mutex<SessionState>,
    online: watch::Sender<bool>,
    refresh_failures: AtomicU32,
    refresh_task: Mutex<Option<RefreshTask>>,
}

#[derive(Default)]
struct SessionState {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    client: Option<CloudClient>,
    base_url: Option<String>,
    relay_url: Option<String>,
    last_refresh: Option<DateTime<Utc>>,
}

struct RefreshTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Point-in-time view of the session, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub online: bool,
    pub base_url: Option<String>,
    pub relay_url: Option<String>,
    pub has_refresh_token: bool,
    pub last_refresh: Option<DateTime<Utc>>,
    pub refresh_failures: u32,
    pub auto_refresh: bool,
}

impl AuthSession {
    pub fn new(config: ControllerConfig, store: Arc<dyn PersistentStore>) -> Self {
        let (online, _) = watch::channel(false);
        Self {
            inner: Arc::new(SessionInner {
                config,
                store,
                state: Mutex::new(SessionState::default()),
                online,
                refresh_failures: AtomicU32::new(0),
                refresh_task: Mutex::new(None),
            }),
        }
    }

    // ── Login / restore / logout ─────────────────────────────────────

    /// Log in and go online.
    ///
    /// The region is derived from the country code; regions that need a
    /// relay route this and every later call through it.
    pub async fn login(&self, creds: &Credentials) -> Result<TokenGrant, AuthError> {
        let region = creds.region();
        let base_url = normalize_base(self.inner.config.endpoints.for_region(region));
        let relay_url = self.inner.config.relay_for(region).map(str::to_owned);
        let client = self.build_client(&base_url, relay_url.as_deref())?;

        let grant = client
            .login(&creds.username, &creds.password, &creds.country_code, creds.platform)
            .await?;

        {
            let mut state = self.inner.state.lock().await;
            state.access_token = Some(grant.access_token.clone());
            state.refresh_token.clone_from(&grant.refresh_token);
            state.client = Some(client);
            state.base_url = Some(base_url);
            state.relay_url = relay_url;
            state.last_refresh = Some(Utc::now());
        }
        self.inner.refresh_failures.store(0, Ordering::Relaxed);
        self.set_online(true);
        info!(username = %creds.username, %region, "logged in");
        Ok(grant)
    }

    /// Rehydrate from a persisted credential blob. Returns `false` if the
    /// blob does not parse; the session is left untouched in that case.
    pub async fn restore_from_store(&self, blob: &Value) -> bool {
        match serde_json::from_value::<StoredCredentials>(blob.clone()) {
            Ok(saved) => self.restore(&saved).await,
            Err(e) => {
                debug!(error = %e, "saved credentials do not parse");
                false
            }
        }
    }

    /// Rehydrate from parsed credentials. The session only goes online when
    /// the blob carries an access token; an imported blob restores offline.
    pub async fn restore(&self, saved: &StoredCredentials) -> bool {
        let base_url = if saved.base_url.is_empty() {
            Region::from_country_code(&saved.region).default_base_url().to_owned()
        } else {
            normalize_base(&saved.base_url)
        };
        let relay_url = Some(saved.proxy_url.clone()).filter(|p| !p.is_empty());
        let client = match self.build_client(&base_url, relay_url.as_deref()) {
            Ok(client) => client,
            Err(e) => {
                debug!(error = %e, "saved endpoint is unusable");
                return false;
            }
        };

        let online = {
            let mut state = self.inner.state.lock().await;
            state.access_token = non_empty_secret(&saved.access_token);
            state.refresh_token = non_empty_secret(&saved.refresh_token);
            state.client = Some(client);
            state.base_url = Some(base_url);
            state.relay_url = relay_url;
            state.access_token.is_some()
        };
        self.inner.refresh_failures.store(0, Ordering::Relaxed);
        self.set_online(online);
        debug!(username = %saved.username, online, "session restored");
        true
    }

    /// Stop the timer, blank the tokens, go offline and forget the saved
    /// credentials.
    pub async fn logout(&self) {
        self.stop_auto_refresh().await;
        *self.inner.state.lock().await = SessionState::default();
        self.inner.refresh_failures.store(0, Ordering::Relaxed);
        self.set_online(false);
        if let Err(e) = self.inner.store.delete(keys::CREDENTIALS) {
            warn!(error = %e, "failed to delete saved credentials");
        }
        info!("logged out");
    }

    // ── Token refresh ────────────────────────────────────────────────

    /// Exchange the refresh token for a new pair.
    ///
    /// On success the saved credential blob, if any, is updated. After
    /// `max_refresh_failures` consecutive failures the session goes
    /// offline; the tokens are kept so a later refresh can recover.
    pub async fn refresh_access_token(&self) -> Result<(), AuthError> {
        let (client, refresh_token) = {
            let state = self.inner.state.lock().await;
            match (&state.client, &state.refresh_token) {
                (Some(client), Some(token)) => (client.clone(), token.clone()),
                _ => return Err(AuthError::NoRefreshToken),
            }
        };

        match client.refresh(&refresh_token).await {
            Ok(grant) => {
                {
                    let mut state = self.inner.state.lock().await;
                    state.access_token = Some(grant.access_token.clone());
                    if let Some(rt) = grant.refresh_token.clone() {
                        state.refresh_token = Some(rt);
                    }
                    state.last_refresh = Some(Utc::now());
                }
                self.inner.refresh_failures.store(0, Ordering::Relaxed);
                self.set_online(true);
                self.update_saved_tokens(&grant);
                info!("access token refreshed");
                Ok(())
            }
            Err(e) => {
                let err = AuthError::from(e);
                let failures = self.inner.refresh_failures.fetch_add(1, Ordering::Relaxed) + 1;
                let max = self.inner.config.max_refresh_failures;
                warn!(error = %err, failures, "token refresh failed");
                if max > 0 && failures >= max && self.is_online() {
                    warn!(failures, "too many failed refreshes, going offline");
                    self.set_online(false);
                }
                Err(err)
            }
        }
    }

    /// Start the periodic refresh. Any previous timer is cancelled first.
    pub async fn start_auto_refresh(&self) {
        let mut slot = self.inner.refresh_task.lock().await;
        if let Some(prev) = slot.take() {
            debug!("replacing running refresh timer");
            prev.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(auto_refresh_task(
            Arc::downgrade(&self.inner),
            self.inner.config.refresh_interval,
            cancel.clone(),
        ));
        *slot = Some(RefreshTask { cancel, handle });
        debug!(interval = ?self.inner.config.refresh_interval, "auto-refresh started");
    }

    pub async fn stop_auto_refresh(&self) {
        let task = self.inner.refresh_task.lock().await.take();
        if let Some(task) = task {
            task.cancel.cancel();
            let _ = task.handle.await;
            debug!("auto-refresh stopped");
        }
    }

    pub async fn is_auto_refreshing(&self) -> bool {
        self.inner
            .refresh_task
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Save the credential blob with the current tokens and endpoint.
    ///
    /// The password is written in plaintext.
    pub async fn persist_credentials(&self, creds: &Credentials) -> Result<(), AuthError> {
        let blob = {
            let state = self.inner.state.lock().await;
            StoredCredentials {
                username: creds.username.clone(),
                password: creds.password.expose_secret().to_owned(),
                region: creds.country_code.clone(),
                platform: creds.platform,
                access_token: exposed(state.access_token.as_ref()),
                refresh_token: exposed(state.refresh_token.as_ref()),
                base_url: state.base_url.clone().unwrap_or_default(),
                proxy_url: state.relay_url.clone().unwrap_or_default(),
            }
        };
        self.save_blob(&blob)
    }

    /// Save credentials without contacting the cloud. The blob carries the
    /// endpoint for the account's region and no tokens.
    pub fn save_credentials_offline(&self, creds: &Credentials) -> Result<(), AuthError> {
        let region = creds.region();
        let blob = StoredCredentials {
            username: creds.username.clone(),
            password: creds.password.expose_secret().to_owned(),
            region: creds.country_code.clone(),
            platform: creds.platform,
            access_token: String::new(),
            refresh_token: String::new(),
            base_url: normalize_base(self.inner.config.endpoints.for_region(region)),
            proxy_url: self.inner.config.relay_for(region).unwrap_or_default().to_owned(),
        };
        self.save_blob(&blob)
    }

    pub fn saved_credentials(&self) -> Result<Option<StoredCredentials>, StoreError> {
        store::load_credentials(self.inner.store.as_ref())
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Client and access token for an online call, if the session has them.
    pub async fn authorized(&self) -> Option<(CloudClient, SecretString)> {
        let state = self.inner.state.lock().await;
        match (&state.client, &state.access_token) {
            (Some(client), Some(token)) => Some((client.clone(), token.clone())),
            _ => None,
        }
    }

    pub fn is_online(&self) -> bool {
        *self.inner.online.borrow()
    }

    pub fn subscribe_online(&self) -> watch::Receiver<bool> {
        self.inner.online.subscribe()
    }

    pub async fn status(&self) -> SessionStatus {
        let auto_refresh = self.is_auto_refreshing().await;
        let state = self.inner.state.lock().await;
        SessionStatus {
            online: self.is_online(),
            base_url: state.base_url.clone(),
            relay_url: state.relay_url.clone(),
            has_refresh_token: state.refresh_token.is_some(),
            last_refresh: state.last_refresh,
            refresh_failures: self.inner.refresh_failures.load(Ordering::Relaxed),
            auto_refresh,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    // ── Internals ────────────────────────────────────────────────────

    fn set_online(&self, online: bool) {
        self.inner.online.send_if_modified(|cur| {
            let changed = *cur != online;
            *cur = online;
            changed
        });
    }

    fn build_client(&self, base_url: &str, relay_url: Option<&str>) -> Result<CloudClient, AuthError> {
        let base = Url::parse(base_url).map_err(lightdeck_api::Error::from)?;
        let relay = relay_url
            .map(Url::parse)
            .transpose()
            .map_err(lightdeck_api::Error::from)?;
        let transport = TransportConfig::default().with_timeout(self.inner.config.timeout);
        Ok(CloudClient::new(base, relay, &transport)?)
    }

    fn save_blob(&self, blob: &StoredCredentials) -> Result<(), AuthError> {
        Ok(store::save(self.inner.store.as_ref(), keys::CREDENTIALS, blob)?)
    }

    /// Rewrite the tokens of an existing blob. No blob, no write.
    fn update_saved_tokens(&self, grant: &TokenGrant) {
        let saved = match store::load_credentials(self.inner.store.as_ref()) {
            Ok(Some(saved)) => saved,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "saved credentials unreadable, not updating tokens");
                return;
            }
        };
        let updated = StoredCredentials {
            access_token: grant.access_token.expose_secret().to_owned(),
            refresh_token: grant
                .refresh_token
                .as_ref()
                .map_or(saved.refresh_token.clone(), |t| t.expose_secret().to_owned()),
            ..saved
        };
        if let Err(e) = store::save(self.inner.store.as_ref(), keys::CREDENTIALS, &updated) {
            warn!(error = %e, "failed to persist refreshed tokens");
        }
    }
}

/// Refresh the token every `period` while the session is online and holds
/// a refresh token. Exits when cancelled or when the session is dropped.
async fn auto_refresh_task(session: Weak<SessionInner>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(inner) = session.upgrade() else { break };
                let live = AuthSession { inner };
                if !live.is_online() {
                    continue;
                }
                match live.refresh_access_token().await {
                    Ok(()) | Err(AuthError::NoRefreshToken) => {}
                    Err(e) => warn!(error = %e, "scheduled token refresh failed"),
                }
            }
        }
    }
}

fn normalize_base(url: &str) -> String {
    if url.ends_with('/') {
        url.to_owned()
    } else {
        format!("{url}/")
    }
}

fn non_empty_secret(value: &str) -> Option<SecretString> {
    (!value.is_empty()).then(|| SecretString::from(value))
}

fn exposed(secret: Option<&SecretString>) -> String {
    secret.map(|s| s.expose_secret().to_owned()).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn session() -> (AuthSession, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let config = ControllerConfig {
            auto_refresh: false,
            ..ControllerConfig::default()
        };
        (AuthSession::new(config, store.clone()), store)
    }

    #[test]
    fn base_gets_trailing_slash() {
        assert_eq!(normalize_base("http://x/api"), "http://x/api/");
        assert_eq!(normalize_base("http://x/api/"), "http://x/api/");
    }

    #[tokio::test]
    async fn refresh_without_token_fails_fast() {
        let (session, _) = session();
        assert!(matches!(
            session.refresh_access_token().await,
            Err(AuthError::NoRefreshToken)
        ));
        assert!(!session.is_online());
    }

    #[tokio::test]
    async fn restore_rejects_garbage() {
        let (session, _) = session();
        assert!(!session.restore_from_store(&json!({"username": 3})).await);
        assert!(!session.is_online());
    }

    #[tokio::test]
    async fn restore_goes_online() {
        let (session, _) = session();
        let restored = session
            .restore_from_store(&json!({
                "username": "ada",
                "password": "pw",
                "region": "86",
                "platform": "tuya",
                "access_token": "AT",
                "refresh_token": "RT",
                "baseUrl": "https://px1.tuyacn.com/homeassistant/",
                "proxyUrl": "https://relay.example/",
            }))
            .await;
        assert!(restored);
        assert!(session.is_online());
        let status = session.status().await;
        assert!(status.has_refresh_token);
        assert_eq!(status.relay_url.as_deref(), Some("https://relay.example/"));
        assert!(session.authorized().await.is_some());
    }

    #[tokio::test]
    async fn imported_blob_restores_offline() {
        let (session, _) = session();
        let restored = session
            .restore_from_store(&json!({
                "username": "ada",
                "password": "pw",
                "region": "44",
                "baseUrl": "",
            }))
            .await;
        assert!(restored);
        assert!(!session.is_online());
        assert_eq!(
            session.status().await.base_url.as_deref(),
            Some("https://px1.tuyaeu.com/homeassistant/")
        );
    }

    #[tokio::test]
    async fn offline_save_uses_region_endpoint() {
        let (session, store) = session();
        let creds = Credentials {
            username: "ada".into(),
            password: SecretString::from("pw"),
            country_code: "1".into(),
            platform: lightdeck_api::Platform::Tuya,
        };
        session.save_credentials_offline(&creds).unwrap();

        let saved = store::load_credentials(store.as_ref()).unwrap().unwrap();
        assert_eq!(saved.base_url, "https://px1.tuyaus.com/homeassistant/");
        assert!(saved.access_token.is_empty());
        assert!(saved.proxy_url.is_empty());
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let (session, store) = session();
        store.set(keys::CREDENTIALS, json!({"username": "ada"})).unwrap();
        session.start_auto_refresh().await;
        session.logout().await;

        assert!(!session.is_online());
        assert!(!session.is_auto_refreshing().await);
        assert!(session.authorized().await.is_none());
        assert!(store.get(keys::CREDENTIALS).unwrap().is_none());
    }
}
