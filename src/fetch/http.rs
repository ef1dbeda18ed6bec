//! reqwest-backed fetcher

use crate::config::HttpConfig;
use crate::fetch::traits::{FetchError, FetchRequest, FetchResponse, FetchResult, Fetcher};
use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::{redirect::Policy, Client, RequestBuilder};
use std::collections::HashMap;
use std::time::Duration;

/// Maximum hops reqwest follows on its own when a request allows redirects
const AUTO_REDIRECT_LIMIT: usize = 10;

/// Fetcher built on two reqwest clients
///
/// Redirect policy is fixed per client in reqwest, so one client follows
/// redirects and the other hands 3xx responses back untouched.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    following: Client,
    manual: Client,
}

impl HttpFetcher {
    /// Builds both clients from the HTTP configuration
    pub fn new(config: &HttpConfig) -> FetchResult<Self> {
        Ok(Self {
            following: build_http_client(config, Policy::limited(AUTO_REDIRECT_LIMIT))
                .map_err(|e| FetchError::Client(e.to_string()))?,
            manual: build_http_client(config, Policy::none())
                .map_err(|e| FetchError::Client(e.to_string()))?,
        })
    }

    fn client(&self, request: &FetchRequest) -> &Client {
        if request.follow_redirects {
            &self.following
        } else {
            &self.manual
        }
    }

    fn prepare(&self, builder: RequestBuilder, request: &FetchRequest) -> RequestBuilder {
        let mut builder = builder.timeout(request.timeout);

        if let Some(referer) = &request.referer {
            builder = builder.header(REFERER, referer);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder
    }

    async fn execute(
        &self,
        builder: RequestBuilder,
        request: &FetchRequest,
    ) -> FetchResult<FetchResponse> {
        let url = request.url.as_str();
        let response = builder.send().await.map_err(|e| classify(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        // Dropping the response unread closes the connection
        let body = if request.read_body {
            response.text().await.map_err(|e| FetchError::Body {
                url: url.to_string(),
                message: e.to_string(),
            })?
        } else {
            String::new()
        };

        tracing::trace!(url, status, bytes = body.len(), "fetched");

        Ok(FetchResponse {
            status,
            headers,
            body,
            final_url,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, request: &FetchRequest) -> FetchResult<FetchResponse> {
        let builder = self.prepare(self.client(request).get(&request.url), request);
        self.execute(builder, request).await
    }

    async fn post(
        &self,
        request: &FetchRequest,
        form: &[(String, String)],
    ) -> FetchResult<FetchResponse> {
        let builder = self
            .prepare(self.client(request).post(&request.url), request)
            .form(form);
        self.execute(builder, request).await
    }
}

/// Builds an HTTP client with the configured identity and timeouts
///
/// # Example
///
/// ```no_run
/// use link_resolver::config::HttpConfig;
/// use link_resolver::fetch::build_http_client;
/// use reqwest::redirect::Policy;
///
/// let client = build_http_client(&HttpConfig::default(), Policy::none()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig, redirects: Policy) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .redirect(redirects)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
