//! Timed HTTP requests
use crate::LabError;
use loadlab_core::{
    RequestMethod, SampleFailure, SampleResult, CONNECTIVITY_TIMEOUT, DEFAULT_SAMPLE_TIMEOUT,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::{Duration, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Issues single timed requests against the service under test.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct HttpSampler {
    client: Client,
    timeout: Duration,
}

impl HttpSampler {
    pub fn new(timeout: Duration) -> Result<Self, LabError> {
        let client = Client::builder().build()?;
        Ok(Self { client, timeout })
    }

    /// Same connection pool with a different per-request timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            client: self.client.clone(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time one request.
    ///
    /// Failures (timeouts, refused connections, non-2xx answers) are folded into the returned
    /// [`SampleResult`]; this never errors.
    pub async fn sample(&self, url: &str, method: RequestMethod) -> SampleResult {
        let request = match method {
            RequestMethod::Get => self.client.get(url),
            RequestMethod::Post => self.client.post(url),
        };
        self.timed(request, url, method).await
    }

    /// Time one POST carrying a urlencoded form body.
    pub async fn sample_form<T: Serialize + ?Sized>(&self, url: &str, form: &T) -> SampleResult {
        let request = self.client.post(url).form(form);
        self.timed(request, url, RequestMethod::Post).await
    }

    async fn timed(&self, request: RequestBuilder, url: &str, method: RequestMethod) -> SampleResult {
        let request = request.timeout(self.timeout);

        let start = Instant::now();
        let res = async {
            let response = request.send().await?;
            let status = response.status();
            // NOTE: The body is part of the measured time.
            response.bytes().await?;
            Ok::<StatusCode, reqwest::Error>(status)
        }
        .await;
        let elapsed = start.elapsed();

        let sample = match res {
            Ok(status) if status.is_success() => {
                SampleResult::success(url, method, elapsed, status.as_u16())
            }
            Ok(status) => {
                SampleResult::failure(url, method, SampleFailure::Status(status.as_u16()))
            }
            Err(err) => SampleResult::failure(url, method, classify(&err)),
        };

        if let Some(failure) = sample.error() {
            trace!("{method} {url} failed: {failure}");
        }

        #[cfg(feature = "metrics")]
        record_metrics(&sample);

        sample
    }

    /// Checks that the service answers before any load is sent.
    pub async fn check_connectivity(&self, url: &str) -> Result<(), LabError> {
        debug!("Checking connectivity to {url}");
        let res = self
            .client
            .get(url)
            .timeout(CONNECTIVITY_TIMEOUT)
            .send()
            .await;

        match res {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(LabError::Connectivity {
                url: url.to_string(),
                reason: format!("HTTP status {}", response.status()),
            }),
            Err(err) => Err(LabError::Connectivity {
                url: url.to_string(),
                reason: classify(&err).to_string(),
            }),
        }
    }
}

impl Default for HttpSampler {
    fn default() -> Self {
        Self {
            client: Client::new(),
            timeout: DEFAULT_SAMPLE_TIMEOUT,
        }
    }
}

fn classify(err: &reqwest::Error) -> SampleFailure {
    if err.is_timeout() {
        SampleFailure::Timeout
    } else if err.is_connect() {
        SampleFailure::Connect(err.to_string())
    } else {
        SampleFailure::Request(err.to_string())
    }
}

#[cfg(feature = "metrics")]
fn record_metrics(sample: &SampleResult) {
    let endpoint = sample.endpoint.clone();
    if sample.is_success() {
        metrics::histogram!("loadlab_sample_latency_ms", "endpoint" => endpoint.clone())
            .record(sample.elapsed_ms);
        metrics::counter!("loadlab_sample_success", "endpoint" => endpoint).increment(1);
    } else {
        metrics::counter!("loadlab_sample_error", "endpoint" => endpoint).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn unused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn refused_connection_is_a_failed_sample() {
        let url = format!("http://127.0.0.1:{}/", unused_port());
        let sampler = HttpSampler::new(Duration::from_secs(2)).unwrap();

        let sample = sampler.sample(&url, RequestMethod::Get).await;

        assert!(!sample.is_success());
        assert_eq!(sample.elapsed_ms, 0.);
        assert_eq!(sample.status_code, 0);
        assert_eq!(sample.endpoint, url);
        assert!(matches!(sample.error(), Some(SampleFailure::Connect(_))));
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn refused_connection_is_unavailable() {
        let url = format!("http://127.0.0.1:{}/", unused_port());
        let sampler = HttpSampler::default();

        let res = sampler.check_connectivity(&url).await;
        assert!(matches!(res, Err(LabError::Connectivity { .. })));
    }

    #[test]
    fn with_timeout_keeps_client() {
        let sampler = HttpSampler::default().with_timeout(Duration::from_millis(250));
        assert_eq!(sampler.timeout(), Duration::from_millis(250));
    }
}
