// Skill endpoint: device discovery and control
//
// Both operations POST a `{ header, payload }` envelope to `{base}/skill`.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::client::CloudClient;
use crate::error::Error;
use crate::models::{ApiDevice, ControlRequest, DiscoveryPayload, SkillHeader, SkillResponse};

const SUCCESS: &str = "SUCCESS";

impl CloudClient {
    /// List every device on the account.
    ///
    /// A response without `payload.devices` is a failure, even when the
    /// header looks fine.
    pub async fn discover_devices(&self, access_token: &SecretString) -> Result<Vec<ApiDevice>, Error> {
        let url = self.endpoint("skill")?;
        debug!("discovering devices");

        let body = json!({
            "header": {
                "name": "Discovery",
                "namespace": "discovery",
                "payloadVersion": 1,
            },
            "payload": {
                "accessToken": access_token.expose_secret(),
            },
        });

        let resp: SkillResponse<DiscoveryPayload> = self.post_json(url, &body).await?;

        match resp.payload.and_then(|p| p.devices) {
            Some(devices) => {
                debug!(count = devices.len(), "discovery complete");
                Ok(devices)
            }
            None => Err(remote_error(resp.header, "discovery returned no device list")),
        }
    }

    /// Send one control command to one device.
    ///
    /// Succeeds only when the response header code is `SUCCESS`.
    pub async fn control(
        &self,
        access_token: &SecretString,
        request: &ControlRequest,
    ) -> Result<(), Error> {
        let url = self.endpoint("skill")?;
        let command = &request.command;
        debug!(device = %request.device_id, action = command.name(), "sending control command");

        let mut payload = Map::new();
        payload.insert("accessToken".into(), Value::from(access_token.expose_secret()));
        payload.insert("devId".into(), Value::from(request.device_id.as_str()));
        payload.insert(command.value_name().into(), command.value());

        let body = json!({
            "header": {
                "name": command.name(),
                "namespace": "control",
                "payloadVersion": 1,
            },
            "payload": payload,
        });

        let resp: SkillResponse<Value> = self.post_json(url, &body).await?;

        match resp.header {
            Some(SkillHeader {
                code: Some(ref code),
                ..
            }) if code == SUCCESS => Ok(()),
            header => Err(remote_error(header, "command was not acknowledged")),
        }
    }
}

fn remote_error(header: Option<SkillHeader>, fallback: &str) -> Error {
    let header = header.unwrap_or_default();
    Error::Remote {
        code: header.code.unwrap_or_else(|| "UNKNOWN".into()),
        message: header.msg.unwrap_or_else(|| fallback.into()),
    }
}
