//! Omada controller health probe.
//!
//! One probe is two requests on a fresh cookie session: log in, then read the
//! gateway's port statistics with the CSRF token from the login.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};
use crate::probe::HealthProbe;
use crate::ProbeConfig;

/// Port `type` value the controller uses for WAN ports.
const WAN_PORT_TYPE: i64 = 0;

/// `internetState` value meaning the port has internet reachability.
const INTERNET_ONLINE: i64 = 1;

/// Request payload for controller login.
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Common response wrapper of the controller API.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "errorCode")]
    error_code: i64,
    #[serde(default)]
    msg: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResult {
    omadac_id: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayResult {
    #[serde(default)]
    port_stats: Vec<PortStat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortStat {
    #[serde(rename = "type")]
    port_type: Option<i64>,
    port: Option<i64>,
    internet_state: Option<i64>,
}

/// Health probe backed by an Omada controller.
#[derive(Debug, Clone)]
pub struct OmadaProbe {
    config: ProbeConfig,
}

impl OmadaProbe {
    /// Create a new probe with the given configuration.
    #[must_use]
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Run the probe and report why it failed, if it did.
    ///
    /// `Ok(false)` means the controller answered and reported the port offline.
    ///
    /// # Errors
    ///
    /// Returns an error for any transport, protocol or lookup failure.
    pub async fn check(&self) -> Result<bool> {
        // A fresh cookie jar per probe; the controller ties the CSRF token to
        // the session cookie set by the login response.
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(!self.config.verify_tls)
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        let (controller_id, token) = self.login(&client).await?;

        let response = client
            .get(self.config.gateway_url(&controller_id))
            .header("Csrf-Token", token)
            .send()
            .await
            .map_err(|e| transport_error("gateway", &e))?;

        let gateway: GatewayResult = unwrap_envelope("gateway", response).await?;

        let port = gateway
            .port_stats
            .iter()
            .find(|p| {
                p.port_type == Some(WAN_PORT_TYPE)
                    && p.port == Some(i64::from(self.config.wan_port))
            })
            .ok_or(ProbeError::PortNotFound(self.config.wan_port))?;

        let state = port
            .internet_state
            .ok_or(ProbeError::MissingField("internetState"))?;

        Ok(state == INTERNET_ONLINE)
    }

    async fn login(&self, client: &reqwest::Client) -> Result<(String, String)> {
        let request = LoginRequest {
            username: &self.config.username,
            password: &self.config.password,
        };

        let response = client
            .post(self.config.login_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("login", &e))?;

        let login: LoginResult = unwrap_envelope("login", response).await?;

        let controller_id = login
            .omadac_id
            .filter(|s| !s.is_empty())
            .ok_or(ProbeError::MissingField("omadacId"))?;
        let token = login
            .token
            .filter(|s| !s.is_empty())
            .ok_or(ProbeError::MissingField("token"))?;

        Ok((controller_id, token))
    }
}

#[async_trait]
impl HealthProbe for OmadaProbe {
    async fn link_up(&self) -> bool {
        match self.check().await {
            Ok(up) => up,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    controller_reachable = e.controller_reachable(),
                    "WAN probe failed, treating link as down"
                );
                false
            }
        }
    }
}

fn transport_error(stage: &'static str, err: &reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout { stage }
    } else {
        ProbeError::Transport {
            stage,
            message: err.to_string(),
        }
    }
}

/// Check the HTTP status and `errorCode`, and extract `result`.
async fn unwrap_envelope<T: DeserializeOwned>(
    stage: &'static str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProbeError::HttpStatus {
            stage,
            status: status.as_u16(),
        });
    }

    let envelope: Envelope<T> = response.json().await.map_err(|e| {
        if e.is_timeout() {
            ProbeError::Timeout { stage }
        } else {
            ProbeError::Decode {
                stage,
                message: e.to_string(),
            }
        }
    })?;

    if envelope.error_code != 0 {
        return Err(ProbeError::Rejected {
            stage,
            code: envelope.error_code,
            message: envelope.msg.unwrap_or_default(),
        });
    }

    envelope.result.ok_or(ProbeError::MissingField("result"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const GATEWAY_PATH: &str = "/ctrl-1/api/v2/sites/site-1/gateways/AA-BB-CC-DD-EE-FF";

    fn probe_for(server: &MockServer) -> OmadaProbe {
        let mut config = ProbeConfig::new(
            server.uri(),
            "monitor",
            "secret",
            "site-1",
            "AA-BB-CC-DD-EE-FF",
        );
        config.timeout = Duration::from_millis(500);
        OmadaProbe::new(config)
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v2/login"))
            .and(body_json(json!({"username": "monitor", "password": "secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errorCode": 0,
                "msg": "Log in successfully.",
                "result": {"omadacId": "ctrl-1", "token": "csrf-abc"}
            })))
            .mount(server)
            .await;
    }

    async fn mount_gateway(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(GATEWAY_PATH))
            .and(header("Csrf-Token", "csrf-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn port_stats(entries: serde_json::Value) -> serde_json::Value {
        json!({"errorCode": 0, "msg": "Success.", "result": {"portStats": entries}})
    }

    #[tokio::test]
    async fn link_up_when_wan_port_online() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_gateway(
            &server,
            port_stats(json!([
                {"type": 1, "port": 1, "internetState": 0},
                {"type": 0, "port": 2, "internetState": 0},
                {"type": 0, "port": 1, "internetState": 1}
            ])),
        )
        .await;

        let probe = probe_for(&server);
        assert!(probe.check().await.unwrap());
        assert!(probe.link_up().await);
    }

    #[tokio::test]
    async fn link_down_when_wan_port_offline() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_gateway(
            &server,
            port_stats(json!([{"type": 0, "port": 1, "internetState": 0}])),
        )
        .await;

        let probe = probe_for(&server);
        assert!(!probe.check().await.unwrap());
        assert!(!probe.link_up().await);
    }

    #[tokio::test]
    async fn configured_port_is_used() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_gateway(
            &server,
            port_stats(json!([
                {"type": 0, "port": 1, "internetState": 0},
                {"type": 0, "port": 2, "internetState": 1}
            ])),
        )
        .await;

        let mut probe = probe_for(&server);
        probe.config.wan_port = 2;
        assert!(probe.check().await.unwrap());
    }

    #[tokio::test]
    async fn missing_port_is_an_error() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_gateway(
            &server,
            port_stats(json!([{"type": 1, "port": 1, "internetState": 1}])),
        )
        .await;

        let probe = probe_for(&server);
        assert!(matches!(
            probe.check().await,
            Err(ProbeError::PortNotFound(1))
        ));
        assert!(!probe.link_up().await);
    }

    #[tokio::test]
    async fn missing_internet_state_is_an_error() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_gateway(&server, port_stats(json!([{"type": 0, "port": 1}]))).await;

        let probe = probe_for(&server);
        assert!(matches!(
            probe.check().await,
            Err(ProbeError::MissingField("internetState"))
        ));
    }

    #[tokio::test]
    async fn rejected_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errorCode": -30109,
                "msg": "Invalid username or password."
            })))
            .mount(&server)
            .await;

        let probe = probe_for(&server);
        match probe.check().await {
            Err(ProbeError::Rejected { stage, code, .. }) => {
                assert_eq!(stage, "login");
                assert_eq!(code, -30109);
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert!(!probe.link_up().await);
    }

    #[tokio::test]
    async fn login_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errorCode": 0,
                "result": {"omadacId": "ctrl-1"}
            })))
            .mount(&server)
            .await;

        let probe = probe_for(&server);
        assert!(matches!(
            probe.check().await,
            Err(ProbeError::MissingField("token"))
        ));
    }

    #[tokio::test]
    async fn gateway_http_error() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        Mock::given(method("GET"))
            .and(path(GATEWAY_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let probe = probe_for(&server);
        assert!(matches!(
            probe.check().await,
            Err(ProbeError::HttpStatus {
                stage: "gateway",
                status: 500
            })
        ));
    }

    #[tokio::test]
    async fn gateway_error_code() {
        let server = MockServer::start().await;
        mount_login(&server).await;
        mount_gateway(&server, json!({"errorCode": -1001, "msg": "Gateway not found"})).await;

        let probe = probe_for(&server);
        assert!(matches!(
            probe.check().await,
            Err(ProbeError::Rejected {
                stage: "gateway",
                code: -1001,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let probe = probe_for(&server);
        assert!(matches!(
            probe.check().await,
            Err(ProbeError::Decode { stage: "login", .. })
        ));
    }

    #[tokio::test]
    async fn slow_controller_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(3))
                    .set_body_json(json!({"errorCode": 0})),
            )
            .mount(&server)
            .await;

        let probe = probe_for(&server);
        let err = probe.check().await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { stage: "login" }));
        assert!(!err.controller_reachable());
    }

    #[tokio::test]
    async fn unreachable_controller() {
        let mut config = ProbeConfig::new("http://127.0.0.1:1", "u", "p", "s", "g");
        config.timeout = Duration::from_millis(500);
        let probe = OmadaProbe::new(config);

        assert!(!probe.link_up().await);
    }
}
