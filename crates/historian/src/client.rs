use crate::{Error, LokiConfig, Result};
use chrono::{DateTime, Utc};
use labels::LabelSet;

const PUSH_PATH: &str = "loki/api/v1/push";
const LABELS_PATH: &str = "loki/api/v1/labels";
const TENANT_HEADER: &str = "X-Scope-OrgID";

// Cap on how much of an error response body is carried into the error value.
const MAX_ERROR_BODY: usize = 512;

/// One timestamped log line within a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub at: DateTime<Utc>,
    pub line: String,
}

/// A label set and its timestamped lines, in arrival order.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Stream {
    pub stream: LabelSet,
    pub values: Vec<StreamEntry>,
}

// Loki expects each entry as a ["<unix nanoseconds>", "<line>"] pair.
impl serde::Serialize for StreamEntry {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;

        // i64 nanoseconds cover timestamps between 1677 and 2262; anything
        // outside that range is clamped to the epoch.
        let nanos = self.at.timestamp_nanos_opt().unwrap_or_default();

        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&nanos.to_string())?;
        tuple.serialize_element(&self.line)?;
        tuple.end()
    }
}

#[derive(serde::Serialize)]
struct PushRequest<'a> {
    streams: &'a [Stream],
}

/// The capability the backend requires of the remote store. The trait seam
/// exists mostly to make testing easier.
pub trait LokiClient {
    /// Probe liveness and auth against the store.
    fn ping<'s>(&'s self) -> impl std::future::Future<Output = Result<()>> + Send + 's;
    /// Append the given streams' entries to the store. All-or-nothing from
    /// the caller's point of view; a batch is never split across pushes.
    fn push<'s>(
        &'s self,
        streams: Vec<Stream>,
    ) -> impl std::future::Future<Output = Result<()>> + Send + 's;
}

/// LokiClient over Loki's v1 HTTP API.
#[derive(Clone)]
pub struct HttpLokiClient {
    base_url: url::Url,
    basic_auth: Option<(String, String)>,
    tenant_id: Option<String>,
    http: reqwest::Client,
}

impl HttpLokiClient {
    pub fn new(cfg: &LokiConfig) -> Result<Self> {
        if cfg.url.cannot_be_a_base() {
            return Err(Error::InvalidEndpoint(cfg.url.to_string()));
        }
        // Url::join drops the last path segment unless it ends in '/', so
        // normalize the base once here.
        let mut base_url = cfg.url.clone();
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()?;

        let basic_auth = match (&cfg.basic_auth_user, &cfg.basic_auth_password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };

        Ok(Self {
            base_url,
            basic_auth,
            tenant_id: cfg.tenant_id.clone(),
            http,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(|_| Error::InvalidEndpoint(self.base_url.to_string()))?;

        let mut builder = self.http.request(method, url);
        if let Some((user, password)) = &self.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(tenant) = &self.tenant_id {
            builder = builder.header(TENANT_HEADER, tenant);
        }
        Ok(builder)
    }
}

impl LokiClient for HttpLokiClient {
    async fn ping<'s>(&'s self) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, LABELS_PATH)?
            .send()
            .await?;

        check_ok(response).await?;
        tracing::debug!("established connection to Loki");
        Ok(())
    }

    async fn push<'s>(&'s self, streams: Vec<Stream>) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, PUSH_PATH)?
            .json(&PushRequest { streams: &streams })
            .send()
            .await?;

        check_ok(response).await
    }
}

async fn check_ok(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let mut body = response.text().await.unwrap_or_default();
    body.truncate(MAX_ERROR_BODY);
    Err(Error::BadResponse { status, body })
}

#[cfg(test)]
mod test {
    use super::*;
    use labels::build_set;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn config(url: &str) -> LokiConfig {
        LokiConfig {
            url: url.parse().unwrap(),
            basic_auth_user: Some("writer".to_string()),
            basic_auth_password: Some("hunter2".to_string()),
            tenant_id: Some("alerts".to_string()),
            request_timeout: Duration::from_secs(10),
            external_labels: BTreeMap::new(),
        }
    }

    #[test]
    fn push_request_wire_shape() {
        let streams = vec![Stream {
            stream: build_set([("alertname", "HighLatency"), ("severity", "warn")]),
            values: vec![
                StreamEntry {
                    at: DateTime::from_timestamp(10, 500).unwrap(),
                    line: "first".to_string(),
                },
                StreamEntry {
                    at: DateTime::from_timestamp(11, 0).unwrap(),
                    line: "second".to_string(),
                },
            ],
        }];

        insta::assert_json_snapshot!(PushRequest { streams: &streams }, @r###"
        {
          "streams": [
            {
              "stream": {
                "alertname": "HighLatency",
                "severity": "warn"
              },
              "values": [
                [
                  "10000000500",
                  "first"
                ],
                [
                  "11000000000",
                  "second"
                ]
              ]
            }
          ]
        }
        "###);
    }

    #[test]
    fn request_construction() {
        let client = HttpLokiClient::new(&config("https://loki.internal:3100")).unwrap();
        let request = client
            .request(reqwest::Method::POST, PUSH_PATH)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://loki.internal:3100/loki/api/v1/push"
        );
        assert_eq!(
            request
                .headers()
                .get(TENANT_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some("alerts")
        );
        assert!(request.headers().contains_key(reqwest::header::AUTHORIZATION));
    }

    #[test]
    fn base_url_with_path_prefix_is_preserved() {
        let client = HttpLokiClient::new(&config("https://gateway.internal/loki-tenant")).unwrap();
        let request = client
            .request(reqwest::Method::GET, LABELS_PATH)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://gateway.internal/loki-tenant/loki/api/v1/labels"
        );
    }

    #[test]
    fn rejects_endpoint_that_cannot_be_a_base() {
        match HttpLokiClient::new(&config("data:text/plain,nope")) {
            Err(Error::InvalidEndpoint(_)) => (),
            Err(err) => panic!("expected InvalidEndpoint, got {err}"),
            Ok(_) => panic!("expected InvalidEndpoint, got a client"),
        }
    }
}
