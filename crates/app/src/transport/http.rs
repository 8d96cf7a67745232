use async_trait::async_trait;
use reqwest::{header::HeaderMap, header::HeaderValue, Client};
use url::Url;

use common::api::{ApiRequest, Transport, TransportError};

/// JSON-over-HTTP transport to the envcrypt backend
#[derive(Debug, Clone)]
pub struct HttpTransport {
    pub remote: Url,
    client: Client,
}

impl HttpTransport {
    pub fn new(remote: &Url) -> Result<Self, reqwest::Error> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(default_headers)
            .user_agent(concat!("envcrypt/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    /// Endpoint url for `path`, keeping any path prefix on the base url
    fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let mut base = self.remote.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send<R: ApiRequest>(&self, request: &R) -> Result<R::Response, TransportError> {
        let url = self.endpoint(R::PATH).map_err(anyhow::Error::from)?;
        tracing::debug!(%url, "POST");

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(anyhow::Error::from)?;

        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await.map_err(anyhow::Error::from)?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), "request failed");
            Err(TransportError::from_status(status.as_u16(), message))
        }
    }
}
