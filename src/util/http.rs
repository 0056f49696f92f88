//! HTTP transport. The resolver only needs `GET` and `HEAD` against full
//! URLs; the hyper-backed implementation keeps its connection pool alive for
//! the lifetime of the process, follows redirects, and bounds every request
//! with a timeout.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bytes::Bytes;
use hyper::client::HttpConnector;
use hyper::header::{HeaderValue, LOCATION, USER_AGENT};
use hyper::{Body, Client, Method, Request, Uri};
use hyper_tls::HttpsConnector;
use tracing::trace;

const MAX_REDIRECTS: usize = 10;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404 || self.status == 410
    }
}

#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, url: &str) -> anyhow::Result<HttpResponse>;
    async fn head(&self, url: &str) -> anyhow::Result<u16>;
}

pub struct HyperHttpFetcher {
    client: Client<HttpsConnector<HttpConnector>>,
    timeout: Duration,
}

impl HyperHttpFetcher {
    pub fn new() -> HyperHttpFetcher {
        HyperHttpFetcher {
            client: Client::builder().build::<_, Body>(HttpsConnector::new()),
            timeout: REQUEST_TIMEOUT,
        }
    }

    async fn request(&self, method: Method, url: &str) -> anyhow::Result<hyper::Response<Body>> {
        let mut uri = Uri::try_from(url).with_context(|| format!("invalid URL {:?}", url))?;
        for _ in 0..MAX_REDIRECTS {
            let request = Request::builder()
                .method(method.clone())
                .uri(uri.clone())
                // Maven Central returns a 403 without a user agent
                .header(USER_AGENT, HeaderValue::from_static("curl/7.68.0"))
                .body(Body::empty())?;

            trace!("requesting {:?}", request);
            let response = tokio::time::timeout(self.timeout, self.client.request(request))
                .await
                .map_err(|_| anyhow!("request to {} timed out", uri))??;

            if !response.status().is_redirection() {
                return Ok(response);
            }
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|l| l.to_str().ok())
                .ok_or_else(|| anyhow!("redirect from {} without a location", uri))?;
            uri = resolve_location(&uri, location)?;
            trace!("following redirect to {}", uri);
        }
        Err(anyhow!("too many redirects for {:?}", url))
    }
}

impl Default for HyperHttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpFetcher for HyperHttpFetcher {
    async fn get(&self, url: &str) -> anyhow::Result<HttpResponse> {
        let response = self.request(Method::GET, url).await?;
        let status = response.status().as_u16();
        let body = tokio::time::timeout(self.timeout, hyper::body::to_bytes(response.into_body()))
            .await
            .map_err(|_| anyhow!("reading body of {} timed out", url))??;
        Ok(HttpResponse { status, body })
    }

    async fn head(&self, url: &str) -> anyhow::Result<u16> {
        let response = self.request(Method::HEAD, url).await?;
        Ok(response.status().as_u16())
    }
}

fn resolve_location(current: &Uri, location: &str) -> anyhow::Result<Uri> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return Uri::try_from(location).context("invalid redirect location");
    }
    let scheme = current.scheme_str().unwrap_or("https");
    let authority = current
        .authority()
        .ok_or_else(|| anyhow!("redirect from URI without authority"))?;
    let path = if location.starts_with('/') {
        location.to_string()
    } else {
        let current_path = current.path();
        let parent = &current_path[..current_path.rfind('/').map(|i| i + 1).unwrap_or(0)];
        format!("{}{}", parent, location)
    };
    Uri::try_from(format!("{}://{}{}", scheme, authority, path)).context("invalid redirect location")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve_absolute_location() {
        let current = Uri::try_from("https://repo1.maven.org/maven2/a/").unwrap();
        let resolved = resolve_location(&current, "https://mirror.example/m2/a/").unwrap();
        assert_eq!(resolved.to_string(), "https://mirror.example/m2/a/");
    }

    #[test]
    fn test_resolve_root_relative_location() {
        let current = Uri::try_from("https://repo1.maven.org/maven2/a/b.jar").unwrap();
        let resolved = resolve_location(&current, "/elsewhere/b.jar").unwrap();
        assert_eq!(
            resolved.to_string(),
            "https://repo1.maven.org/elsewhere/b.jar"
        );
    }

    #[test]
    fn test_resolve_relative_location() {
        let current = Uri::try_from("https://repo1.maven.org/maven2/a/b.jar").unwrap();
        let resolved = resolve_location(&current, "c.jar").unwrap();
        assert_eq!(resolved.to_string(), "https://repo1.maven.org/maven2/a/c.jar");
    }
}
