//! In-memory fetcher for unit tests

use crate::fetch::traits::{FetchError, FetchRequest, FetchResponse, FetchResult, Fetcher};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Stub {
    Respond {
        status: u16,
        headers: Vec<(String, String)>,
        body: String,
    },
    Fail(FetchError),
    Delay(Duration, Box<Stub>),
    /// A 200 whose body takes `Duration` to read
    SlowBody(Duration),
}

/// Serves canned responses keyed by exact URL; anything else is a 404
#[derive(Debug, Default)]
pub(crate) struct StubFetcher {
    routes: HashMap<String, Stub>,
    hits: Mutex<HashMap<String, usize>>,
    forms: Mutex<Vec<Vec<(String, String)>>>,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, body: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Stub::Respond {
                status: 200,
                headers: Vec::new(),
                body: body.to_string(),
            },
        );
        self
    }

    pub(crate) fn redirect(mut self, url: &str, location: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Stub::Respond {
                status: 302,
                headers: vec![("Location".to_string(), location.to_string())],
                body: String::new(),
            },
        );
        self
    }

    pub(crate) fn status(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Stub::Respond {
                status,
                headers: Vec::new(),
                body: body.to_string(),
            },
        );
        self
    }

    pub(crate) fn fail(mut self, url: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Stub::Fail(FetchError::Connect {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        );
        self
    }

    pub(crate) fn delayed(mut self, url: &str, delay: Duration, body: &str) -> Self {
        let inner = Stub::Respond {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        };
        self.routes
            .insert(url.to_string(), Stub::Delay(delay, Box::new(inner)));
        self
    }

    /// A large file: headers arrive at once, the body takes `read_time`
    pub(crate) fn large_file(mut self, url: &str, read_time: Duration) -> Self {
        self.routes
            .insert(url.to_string(), Stub::SlowBody(read_time));
        self
    }

    pub(crate) fn hits(&self, url: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn forms(&self) -> Vec<Vec<(String, String)>> {
        self.forms.lock().unwrap().clone()
    }

    async fn serve(&self, request: &FetchRequest) -> FetchResult<FetchResponse> {
        *self
            .hits
            .lock()
            .unwrap()
            .entry(request.url.clone())
            .or_default() += 1;

        let mut stub = self.routes.get(&request.url).cloned();
        loop {
            match stub {
                Some(Stub::Delay(delay, inner)) => {
                    tokio::time::sleep(delay).await;
                    stub = Some(*inner);
                }
                Some(Stub::Fail(error)) => return Err(error),
                Some(Stub::SlowBody(read_time)) => {
                    if request.read_body {
                        tokio::time::sleep(read_time).await;
                    }
                    stub = Some(Stub::Respond {
                        status: 200,
                        headers: vec![(
                            "Content-Type".to_string(),
                            "application/octet-stream".to_string(),
                        )],
                        body: String::new(),
                    });
                }
                Some(Stub::Respond {
                    status,
                    headers,
                    body,
                }) => {
                    let body = if request.read_body { body } else { String::new() };
                    return Ok(FetchResponse {
                        status,
                        headers: headers
                            .into_iter()
                            .map(|(k, v)| (k.to_ascii_lowercase(), v))
                            .collect(),
                        body,
                        final_url: request.url.clone(),
                    })
                }
                None => {
                    return Ok(FetchResponse {
                        status: 404,
                        final_url: request.url.clone(),
                        ..FetchResponse::default()
                    })
                }
            }
        }
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn get(&self, request: &FetchRequest) -> FetchResult<FetchResponse> {
        self.serve(request).await
    }

    async fn post(
        &self,
        request: &FetchRequest,
        form: &[(String, String)],
    ) -> FetchResult<FetchResponse> {
        self.forms.lock().unwrap().push(form.to_vec());
        self.serve(request).await
    }
}
