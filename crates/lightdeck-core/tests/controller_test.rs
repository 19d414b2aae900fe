#![allow(clippy::unwrap_used)]
// Integration tests for `LightController` against a wiremock cloud.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lightdeck_core::store::{self, keys};
use lightdeck_core::{
    AuthError, ControlError, ControllerConfig, CoreError, Credentials, Device, LightController,
    MemoryStore, NoticeLevel, Platform, PersistentStore, RegionEndpoints, StoreMirror, WidgetEvent,
};

// ── Helpers ─────────────────────────────────────────────────────────

struct Harness {
    server: MockServer,
    store: Arc<MemoryStore>,
    controller: LightController,
}

async fn setup() -> Harness {
    setup_with_timeout(Duration::from_secs(5)).await
}

async fn setup_with_timeout(timeout: Duration) -> Harness {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let mirror = Arc::new(StoreMirror::new(store.clone()));
    let config = ControllerConfig {
        endpoints: RegionEndpoints::uniform(format!("{}/homeassistant/", server.uri())),
        relay_url: None,
        timeout,
        auto_refresh: false,
        ..ControllerConfig::default()
    };
    let controller = LightController::new(config, store.clone(), mirror);
    Harness {
        server,
        store,
        controller,
    }
}

fn creds() -> Credentials {
    Credentials {
        username: "alice".into(),
        password: SecretString::from("hunter2"),
        country_code: "49".into(),
        platform: Platform::Tuya,
    }
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/homeassistant/auth.do"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "AT-1",
            "refresh_token": "RT-1",
            "expires_in": 864_000
        })))
        .mount(server)
        .await;
}

async fn mount_discovery(server: &MockServer, devices: Value) {
    Mock::given(method("POST"))
        .and(path("/homeassistant/skill"))
        .and(body_partial_json(json!({"header": {"name": "Discovery"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "header": {"code": "SUCCESS"},
            "payload": {"devices": devices}
        })))
        .mount(server)
        .await;
}

async fn mount_control(server: &MockServer, name: &str, code: &str) {
    Mock::given(method("POST"))
        .and(path("/homeassistant/skill"))
        .and(body_partial_json(json!({"header": {"name": name, "namespace": "control"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "header": {"code": code, "msg": "from mock"}
        })))
        .mount(server)
        .await;
}

fn mixed_devices() -> Value {
    json!([
        {"id": "lamp-1", "name": "Desk", "dev_type": "light", "data": {"state": "false", "brightness": "20"}},
        {"id": "plug-1", "name": "Kettle", "dev_type": "switch", "data": {"state": true}},
        {"id": "lamp-2", "name": "Hall", "dev_type": "light", "data": {}}
    ])
}

/// Header names of every control request the server saw, in order.
async fn control_names(server: &MockServer) -> Vec<(String, Value)> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with("/skill"))
        .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap())
        .filter(|b| b["header"]["namespace"] == "control")
        .map(|b| {
            (
                b["header"]["name"].as_str().unwrap().to_owned(),
                b["payload"]["value"].clone(),
            )
        })
        .collect()
}

/// Target `devId` of every control request the server saw, in order.
async fn control_targets(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap())
        .filter(|b| b["header"]["namespace"] == "control")
        .map(|b| b["payload"]["devId"].as_str().unwrap().to_owned())
        .collect()
}

async fn logged_in_with_lamp(h: &Harness) {
    mount_login(&h.server).await;
    mount_discovery(&h.server, mixed_devices()).await;
    h.controller.login(&creds(), false).await.unwrap();
    h.controller.select_device(Some("lamp-1")).await.unwrap();
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_keeps_lights_and_saves_when_remembered() {
    let h = setup().await;
    mount_login(&h.server).await;
    mount_discovery(&h.server, mixed_devices()).await;

    let count = h.controller.login(&creds(), true).await.unwrap();

    assert_eq!(count, 2);
    let ids: Vec<_> = h.controller.devices().await.into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["lamp-1", "lamp-2"]);
    assert!(h.controller.current_device().await.is_none());
    assert!(h.controller.session().is_online());

    let saved = h.store.get(keys::CREDENTIALS).unwrap().unwrap();
    assert_eq!(saved["username"], "alice");
    assert_eq!(saved["password"], "hunter2");
    assert_eq!(saved["region"], "49");
    assert_eq!(saved["access_token"], "AT-1");
    assert_eq!(saved["refresh_token"], "RT-1");
    assert_eq!(saved["proxyUrl"], "");
    assert_eq!(store::load_devices(h.store.as_ref()).unwrap().len(), 2);
}

#[tokio::test]
async fn test_login_without_remember_saves_nothing() {
    let h = setup().await;
    mount_login(&h.server).await;
    mount_discovery(&h.server, mixed_devices()).await;

    h.controller.login(&creds(), false).await.unwrap();

    assert!(h.store.get(keys::CREDENTIALS).unwrap().is_none());
}

#[tokio::test]
async fn test_rejected_login_stays_offline() {
    let h = setup().await;
    Mock::given(method("POST"))
        .and(path("/homeassistant/auth.do"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errorMsg": "Username or password error"
        })))
        .mount(&h.server)
        .await;
    let mut events = h.controller.subscribe();

    let err = h.controller.login(&creds(), true).await.unwrap_err();

    assert!(matches!(err, CoreError::Auth(AuthError::InvalidCredentials { .. })));
    assert!(!h.controller.session().is_online());
    let WidgetEvent::Notice(notice) = events.recv().await.unwrap() else {
        panic!("expected a notice");
    };
    assert_eq!(notice.level, NoticeLevel::Error);
}

#[tokio::test]
async fn test_failed_discovery_leaves_directory_untouched() {
    let h = setup().await;
    store::save(
        h.store.as_ref(),
        keys::DEVICES,
        &vec![Device::new("old-lamp", None, "light")],
    )
    .unwrap();
    h.controller.restore().await.unwrap();
    mount_login(&h.server).await;
    Mock::given(method("POST"))
        .and(path("/homeassistant/skill"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "header": {"code": "FrequentlyInvoke", "msg": "slow down"},
            "payload": {}
        })))
        .mount(&h.server)
        .await;

    let err = h.controller.login(&creds(), false).await.unwrap_err();

    assert!(matches!(err, CoreError::Control(ControlError::Remote { .. })));
    let ids: Vec<_> = h.controller.devices().await.into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["old-lamp"]);
    assert!(h.controller.session().is_online());
}

// ── Online control ──────────────────────────────────────────────────

#[tokio::test]
async fn test_slider_sends_power_then_brightness() {
    let h = setup().await;
    logged_in_with_lamp(&h).await;
    mount_control(&h.server, "turnOnOff", "SUCCESS").await;
    mount_control(&h.server, "brightnessSet", "SUCCESS").await;

    let level = h.controller.set_brightness(30).await.unwrap();

    assert_eq!(level.display, 40);
    assert_eq!(
        control_names(&h.server).await,
        vec![
            ("turnOnOff".to_owned(), json!(1)),
            ("brightnessSet".to_owned(), json!(30)),
        ]
    );
    let lamp = h.controller.current_device().await.unwrap();
    assert!(lamp.is_on());
    assert_eq!(lamp.brightness(), Some(30));

    let mirrored = store::load_devices(h.store.as_ref()).unwrap();
    assert!(mirrored.iter().find(|d| d.id == "lamp-1").unwrap().is_on());
}

#[tokio::test]
async fn test_slider_zero_only_powers_off() {
    let h = setup().await;
    logged_in_with_lamp(&h).await;
    mount_control(&h.server, "turnOnOff", "SUCCESS").await;

    h.controller.set_brightness(0).await.unwrap();

    assert_eq!(
        control_names(&h.server).await,
        vec![("turnOnOff".to_owned(), json!(0))]
    );
    let lamp = h.controller.current_device().await.unwrap();
    assert!(!lamp.is_on());
    assert_eq!(lamp.brightness(), Some(20));
}

#[tokio::test]
async fn test_failed_power_on_aborts_brightness() {
    let h = setup().await;
    logged_in_with_lamp(&h).await;
    mount_control(&h.server, "turnOnOff", "TargetOffline").await;
    mount_control(&h.server, "brightnessSet", "SUCCESS").await;

    let err = h.controller.set_brightness(60).await.unwrap_err();

    assert!(matches!(
        err,
        CoreError::Control(ControlError::Remote { ref code, .. }) if code == "TargetOffline"
    ));
    assert_eq!(
        control_names(&h.server).await,
        vec![("turnOnOff".to_owned(), json!(1))]
    );
    // Slider keeps the position seeded from the lamp.
    assert_eq!(h.controller.slider(), 20);
}

#[tokio::test]
async fn test_rejected_command_does_not_mutate_state() {
    let h = setup().await;
    logged_in_with_lamp(&h).await;
    mount_control(&h.server, "turnOnOff", "TargetOffline").await;

    assert!(h.controller.turn_on().await.is_err());

    let lamp = h.controller.current_device().await.unwrap();
    assert!(!lamp.is_on());
}

#[tokio::test]
async fn test_color_envelope() {
    let h = setup().await;
    logged_in_with_lamp(&h).await;
    Mock::given(method("POST"))
        .and(path("/homeassistant/skill"))
        .and(body_partial_json(json!({
            "header": {"name": "colorSet", "namespace": "control", "payloadVersion": 1},
            "payload": {
                "accessToken": "AT-1",
                "devId": "lamp-1",
                "color": {"hue": 240, "saturation": 1.0, "brightness": 20}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"header": {"code": "SUCCESS"}})))
        .expect(1)
        .mount(&h.server)
        .await;

    let preview = h.controller.set_hue(240).await.unwrap();

    assert_eq!(preview, "#0000ff");
}

#[tokio::test]
async fn test_stale_response_does_not_touch_new_selection() {
    let h = setup().await;
    logged_in_with_lamp(&h).await;
    Mock::given(method("POST"))
        .and(path("/homeassistant/skill"))
        .and(body_partial_json(json!({"header": {"name": "turnOnOff"}})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"header": {"code": "SUCCESS"}}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&h.server)
        .await;

    let ctrl = h.controller.clone();
    let pending = tokio::spawn(async move { ctrl.turn_on().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.controller.select_device(Some("lamp-2")).await.unwrap();
    let mut events = h.controller.subscribe();

    let device = pending.await.unwrap().unwrap();

    assert_eq!(device.id, "lamp-1");
    assert!(device.is_on());
    let current = h.controller.current_device().await.unwrap();
    assert_eq!(current.id, "lamp-2");
    assert!(!current.is_on());
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, WidgetEvent::DeviceInfoChanged(ref d) if d.id == "lamp-1"));
    }
}

#[tokio::test]
async fn test_slider_commands_stay_on_original_target() {
    let h = setup().await;
    logged_in_with_lamp(&h).await;
    Mock::given(method("POST"))
        .and(path("/homeassistant/skill"))
        .and(body_partial_json(json!({"header": {"name": "turnOnOff"}})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"header": {"code": "SUCCESS"}}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&h.server)
        .await;
    mount_control(&h.server, "brightnessSet", "SUCCESS").await;

    let ctrl = h.controller.clone();
    let pending = tokio::spawn(async move { ctrl.set_brightness(50).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.controller.select_device(Some("lamp-2")).await.unwrap();

    pending.await.unwrap().unwrap();

    assert_eq!(control_targets(&h.server).await, vec!["lamp-1", "lamp-1"]);
    let devices = h.controller.devices().await;
    let lamp1 = devices.iter().find(|d| d.id == "lamp-1").unwrap();
    assert!(lamp1.is_on());
    assert_eq!(lamp1.brightness(), Some(50));
    let lamp2 = devices.iter().find(|d| d.id == "lamp-2").unwrap();
    assert!(!lamp2.is_on());
    assert_eq!(lamp2.brightness(), None);
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    let h = setup_with_timeout(Duration::from_millis(500)).await;
    logged_in_with_lamp(&h).await;
    let before = store::load_devices(h.store.as_ref()).unwrap();
    Mock::given(method("POST"))
        .and(path("/homeassistant/skill"))
        .and(body_partial_json(json!({"header": {"name": "turnOnOff"}})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"header": {"code": "SUCCESS"}}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&h.server)
        .await;

    let err = h.controller.turn_on().await.unwrap_err();

    assert!(matches!(err, CoreError::Control(ControlError::Network { .. })));
    let lamp = h.controller.current_device().await.unwrap();
    assert!(!lamp.is_on());
    assert_eq!(store::load_devices(h.store.as_ref()).unwrap(), before);
}

// ── Refresh / import ────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_devices_uses_saved_refresh_token() {
    let h = setup().await;
    h.store
        .set(
            keys::CREDENTIALS,
            json!({
                "username": "alice",
                "password": "hunter2",
                "region": "49",
                "platform": "tuya",
                "access_token": "AT-old",
                "refresh_token": "RT-old",
                "baseUrl": format!("{}/homeassistant/", h.server.uri()),
                "proxyUrl": ""
            }),
        )
        .unwrap();
    Mock::given(method("GET"))
        .and(path("/homeassistant/access.do"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "AT-new",
            "refresh_token": "RT-new"
        })))
        .expect(1)
        .mount(&h.server)
        .await;
    mount_discovery(&h.server, mixed_devices()).await;

    let count = h.controller.refresh_devices().await.unwrap();

    assert_eq!(count, 2);
    let saved = h.store.get(keys::CREDENTIALS).unwrap().unwrap();
    assert_eq!(saved["access_token"], "AT-new");
    assert_eq!(saved["refresh_token"], "RT-new");
}

#[tokio::test]
async fn test_refresh_devices_after_import_logs_in() {
    let h = setup().await;
    h.controller.import_credentials(&creds()).await.unwrap();
    mount_login(&h.server).await;
    mount_discovery(&h.server, mixed_devices()).await;

    let count = h.controller.refresh_devices().await.unwrap();

    assert_eq!(count, 2);
    assert!(h.controller.session().is_online());
    let saved = h.store.get(keys::CREDENTIALS).unwrap().unwrap();
    assert_eq!(saved["refresh_token"], "RT-1");
}

#[tokio::test]
async fn test_refresh_devices_without_saved_credentials() {
    let h = setup().await;

    let err = h.controller.refresh_devices().await.unwrap_err();

    assert!(matches!(err, CoreError::Auth(AuthError::NoSavedCredentials)));
}

#[tokio::test]
async fn test_logout_keeps_devices_for_offline_control() {
    let h = setup().await;
    logged_in_with_lamp(&h).await;

    h.controller.logout().await;
    h.controller.turn_on().await.unwrap();

    assert!(!h.controller.session().is_online());
    assert!(h.controller.current_device().await.unwrap().is_on());
    assert!(control_names(&h.server).await.is_empty());
}
