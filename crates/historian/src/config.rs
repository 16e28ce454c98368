use std::collections::BTreeMap;
use std::time::Duration;

/// Connection settings for the remote Loki store.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct LokiConfig {
    /// Base URL of the Loki API.
    pub url: url::Url,
    /// Optional HTTP basic-auth user and password.
    #[serde(default)]
    pub basic_auth_user: Option<String>,
    #[serde(default)]
    pub basic_auth_password: Option<String>,
    /// Tenant passed to Loki in the X-Scope-OrgID header.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Timeout applied to each individual ping and push request.
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// Labels applied to every stream written by this process, identifying
    /// the deployment. They override same-named labels supplied by rules.
    #[serde(default)]
    pub external_labels: BTreeMap<String, String>,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minimal_config() {
        let cfg: LokiConfig = serde_json::from_value(serde_json::json!({
            "url": "http://localhost:3100",
        }))
        .unwrap();

        assert_eq!(cfg.url.as_str(), "http://localhost:3100/");
        assert_eq!(cfg.basic_auth_user, None);
        assert_eq!(cfg.tenant_id, None);
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert!(cfg.external_labels.is_empty());
    }

    #[test]
    fn full_config() {
        let cfg: LokiConfig = serde_json::from_value(serde_json::json!({
            "url": "https://loki.internal:3100",
            "basic_auth_user": "writer",
            "basic_auth_password": "hunter2",
            "tenant_id": "alerts",
            "request_timeout": "30s",
            "external_labels": {"cluster": "prod-eu-1"},
        }))
        .unwrap();

        assert_eq!(cfg.basic_auth_user.as_deref(), Some("writer"));
        assert_eq!(cfg.tenant_id.as_deref(), Some("alerts"));
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(
            cfg.external_labels.get("cluster").map(String::as_str),
            Some("prod-eu-1")
        );
    }
}
