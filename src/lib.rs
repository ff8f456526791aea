//!
//! Utilization report for MongoDB Atlas and Ops Manager fleets.
//!
//! Walks every project the API key can see, collects the measurements of each host and of its
//! disk partitions, reduces every allow-listed series to min/max/median and writes one CSV row
//! per host.
//!
//! ## Client
//! ```no_run
//! #[tokio::main]
//! async fn main() -> Result<(), utilization_report::Error> {
//!     use utilization_report::ClientBuilder;
//!
//!     let client = ClientBuilder::new()
//!         .accept("application/json")
//!         .with_api_key("https://cloud.mongodb.com/api/atlas/v1.0", "public", "private")?;
//!
//!     let projects = utilization_report::topology::list_projects(&client).await?;
//!     for project in projects {
//!         println!("{} {}", project.id, project.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Report
//! ```no_run
//! #[tokio::main]
//! async fn main() -> Result<(), utilization_report::Error> {
//!     use utilization_report::{config::Config, report::ReportAssembler};
//!
//!     let config = Config {
//!         public_key: "public".into(),
//!         private_key: "private".into(),
//!         ..Default::default()
//!     };
//!     config.validate()?;
//!
//!     let client = config.build_client().await?;
//!     if let Some(path) = ReportAssembler::new(client, config).run().await? {
//!         println!("wrote {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod collector;
pub mod config;
pub mod report;
pub mod stats;
pub mod topology;
pub mod types;

/// Error returned by client functions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed returned by the HTTP server, status and response body
    #[error("HTTP failed {0}, {1}")]
    WebServer(u16, String),

    /// The response body is not the expected JSON
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL: {0}")]
    URL(#[from] url::ParseError),

    /// HTTP client error, timeouts and connection failures end up here
    #[error("Reqwest: {0}")]
    HTTPClient(#[from] reqwest::Error),

    /// The digest challenge could not be parsed or answered
    #[error("Digest authentication: {0}")]
    Digest(String),

    /// Required configuration still holds a placeholder value
    #[error("Configuration incomplete, please set {0}")]
    ConfigIncomplete(String),

    /// CSV serialization error
    #[error("CSV error {0}")]
    Csv(#[from] csv::Error),

    /// IO Errors
    #[error("IO error {0}")]
    IO(#[from] std::io::Error),

}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

const DEFAULT_ACCEPT: &str = "application/json";
const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Public/private API key pair used for digest authentication
struct ApiKey {
    public_key: String,
    private_key: String,
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl ApiKey {
    /// Answer a `WWW-Authenticate: Digest` challenge for `method` on `url`.
    fn answer(
        &self,
        method: &reqwest::Method,
        url: &url::Url,
        challenge: &reqwest::header::HeaderValue,
    ) -> Result<String> {
        let challenge = challenge
            .to_str()
            .map_err(|e| Error::Digest(e.to_string()))?;
        let mut prompt =
            digest_auth::parse(challenge).map_err(|e| Error::Digest(e.to_string()))?;

        // The digest uri is the request target, path and query.
        let uri = &url[url::Position::BeforePath..];
        let mut context = digest_auth::AuthContext::new(
            self.public_key.as_str(),
            self.private_key.as_str(),
            uri,
        );
        context.method = digest_auth::HttpMethod::from(method.as_str());

        let answer = prompt
            .respond(&context)
            .map_err(|e| Error::Digest(e.to_string()))?;
        Ok(answer.to_header_string())
    }
}

/// Builder for an API [`Client`]
#[derive(Clone)]
pub struct ClientBuilder {
    reqwest_ca: Vec<reqwest::Certificate>,
    disable_cert_verification: bool,
    accept: String,
    timeout: std::time::Duration,
}

impl ClientBuilder {
    /// Create a new builder instance
    #[must_use]
    pub fn new() -> Self {
        Self {
            reqwest_ca: Vec::new(),
            disable_cert_verification: false,
            accept: DEFAULT_ACCEPT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Add a root certificate for API certificate verification
    pub fn add_root_certificate(mut self, cert: &[u8]) -> Result<Self> {
        let r_ca = reqwest::Certificate::from_pem(cert)?;
        self.reqwest_ca.push(r_ca);
        Ok(self)
    }

    /// Disable certificate verification
    #[must_use]
    pub fn danger_accept_invalid_certs(self) -> Self {
        Self {
            disable_cert_verification: true,
            ..self
        }
    }

    /// Value of the `Accept` header, some API versions require a vendor media type
    #[must_use]
    pub fn accept(self, accept: &str) -> Self {
        Self {
            accept: accept.to_string(),
            ..self
        }
    }

    /// Per request timeout
    #[must_use]
    pub fn timeout(self, timeout: std::time::Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Create a client that authenticates every request with the API key pair.
    /// No request is made until the client is used.
    pub fn with_api_key(
        &self,
        base_url: &str,
        public_key: &str,
        private_key: &str,
    ) -> Result<Client> {
        let base_url = url::Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::URL(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }

        let client = reqwest::Client::builder();

        // Add CA certificates
        let client = self
            .reqwest_ca
            .iter()
            .fold(client, |client, ca| client.add_root_certificate(ca.clone()));

        let client = client
            .danger_accept_invalid_certs(self.disable_cert_verification)
            .timeout(self.timeout)
            .build()?;

        Ok(Client {
            base_url,
            api_key: std::sync::Arc::new(ApiKey {
                public_key: public_key.to_string(),
                private_key: private_key.to_string(),
            }),
            accept: self.accept.clone(),
            client,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The `Client` is used for all interaction with the monitoring API.
/// Use [`ClientBuilder::with_api_key`] to create an instance.
#[derive(Clone)]
pub struct Client {
    base_url: url::Url,
    api_key: std::sync::Arc<ApiKey>,
    accept: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("accept", &self.accept)
            .field("client", &self.client)
            .finish()
    }
}

impl Client {
    /// Create a Client builder
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Base URL all paths are appended to
    #[must_use]
    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    /// Build the full URL for `segments` below the base URL. Segments are percent encoded.
    pub fn endpoint(
        &self,
        segments: &[&str],
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<url::Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::URL(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        if let Some(qp) = query_params {
            url.query_pairs_mut().extend_pairs(qp);
        }
        Ok(url)
    }

    /// GET a json payload from the REST API.
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        segments: &[&str],
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<T> {
        self.request(reqwest::Method::GET, segments, query_params)
            .await
    }

    /// Issue a request and decode the JSON body.
    ///
    /// Failures are logged here, callers decide whether an error means "no data".
    pub async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: reqwest::Method,
        segments: &[&str],
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<T> {
        let url = self.endpoint(segments, query_params)?;
        tracing::debug!("{} {}", method, url);

        let result = self.send_authenticated(&method, &url).await;
        match &result {
            Err(Error::WebServer(status, body)) => {
                tracing::error!("HTTP error occurred: {} - {} - {}", url, status, body);
            }
            Err(e) => tracing::error!("Request error: {} - {}", url, e),
            Ok(_) => {}
        }
        result
    }

    async fn send_authenticated<T: serde::de::DeserializeOwned>(
        &self,
        method: &reqwest::Method,
        url: &url::Url,
    ) -> Result<T> {
        let mut response = self.send(method, url, None).await?;

        let authorization = match response.headers().get(reqwest::header::WWW_AUTHENTICATE) {
            Some(challenge) if response.status() == reqwest::StatusCode::UNAUTHORIZED => {
                Some(self.api_key.answer(method, url, challenge)?)
            }
            _ => None,
        };
        if let Some(authorization) = authorization {
            tracing::trace!("answering digest challenge for {}", url);
            response = self.send(method, url, Some(&authorization)).await?;
        }

        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::WebServer(status.as_u16(), body))
        }
    }

    async fn send(
        &self,
        method: &reqwest::Method,
        url: &url::Url,
        authorization: Option<&str>,
    ) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .request(method.clone(), url.clone())
            .header(reqwest::header::ACCEPT, self.accept.as_str())
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(authorization) = authorization {
            builder = builder.header(reqwest::header::AUTHORIZATION, authorization);
        }
        Ok(builder.send().await?)
    }
}
