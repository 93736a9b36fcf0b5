use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::Host;
use crate::error::{Result, StoreError};

/// Reads and writes files on a single host over plain HTTP.
///
/// Expects every host to implement GET, HEAD, PUT and DELETE per RFC 9110.
/// Status interpretation is a closed set per operation: anything outside it
/// is an error, never a guess, so protocol drift between hosts surfaces
/// instead of being silently tolerated.
pub struct HttpTransport {
    base: Url,
    client: Client,
}

impl HttpTransport {
    /// `base_url` carries the scheme and path prefix; its authority is
    /// replaced per host when building request URLs. A query string or
    /// fragment in the base URL is a configuration error.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| StoreError::Config(format!("invalid base URL {base_url:?}: {e}")))?;
        if base.query().is_some() || base.fragment().is_some() {
            return Err(StoreError::Config(
                "base URL may not contain a query or fragment".to_string(),
            ));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { base, client })
    }

    /// Full URL for a file on a given host.
    pub fn url_for(&self, host: &Host, name: &str) -> Result<Url> {
        let mut url = self
            .base
            .join(name)
            .map_err(|e| StoreError::Config(format!("invalid file name {name:?}: {e}")))?;

        let (hostname, port) = split_authority(host)?;
        url.set_host(Some(&hostname))
            .map_err(|e| StoreError::Config(format!("invalid host {:?}: {e}", host.as_str())))?;
        url.set_port(port)
            .map_err(|_| StoreError::Config(format!("invalid host {:?}", host.as_str())))?;

        Ok(url)
    }

    /// Fetch the file's content.
    pub async fn read(&self, host: &Host, name: &str) -> Result<Vec<u8>> {
        let url = self.url_for(host, name)?;
        let resp = self.client.get(url.clone()).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(resp.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(StoreError::NotFound(name.to_string()))
            }
            s => Err(unexpected("GET", &url, s)),
        }
    }

    /// Probe for the file with a HEAD request.
    ///
    /// Returns false only when the host positively reports absence (404 or
    /// 410). A network failure or any other status is an error: an
    /// existence check that could not run must not read as "does not exist".
    pub async fn exists(&self, host: &Host, name: &str) -> Result<bool> {
        let url = self.url_for(host, name)?;
        let resp = self.client.head(url.clone()).send().await?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(false),
            s => Err(unexpected("HEAD", &url, s)),
        }
    }

    /// File size in bytes, from the Content-Length of a HEAD response.
    pub async fn size(&self, host: &Host, name: &str) -> Result<u64> {
        let url = self.url_for(host, name)?;
        let resp = self.client.head(url.clone()).send().await?;
        match resp.status() {
            s if s.is_success() => content_length(&resp).ok_or_else(|| {
                StoreError::Unsupported(format!("host did not provide a content length for {url}"))
            }),
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(StoreError::NotFound(name.to_string()))
            }
            s => Err(unexpected("HEAD", &url, s)),
        }
    }

    /// Create or overwrite the file with a PUT request.
    ///
    /// Returns whether the file existed before: 201 means it did not, 204
    /// means it did. Every other status is an error, including nominally
    /// successful ones like 202 — the contract requires the write to be
    /// synchronous and durable by the time the host answers.
    pub async fn create(&self, host: &Host, name: &str, content: Vec<u8>) -> Result<bool> {
        let url = self.url_for(host, name)?;
        let resp = self.client.put(url.clone()).body(content).send().await?;
        match resp.status() {
            StatusCode::CREATED => Ok(false),
            StatusCode::NO_CONTENT => Ok(true),
            s => Err(unexpected("PUT", &url, s)),
        }
    }

    /// Delete the file. Returns whether it existed before: 404 and 410 mean
    /// the host already agrees the file is gone, which is not an error.
    pub async fn delete(&self, host: &Host, name: &str) -> Result<bool> {
        let url = self.url_for(host, name)?;
        let resp = self.client.delete(url.clone()).send().await?;
        match resp.status() {
            StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(false),
            s => Err(unexpected("DELETE", &url, s)),
        }
    }
}

// Split an authority into hostname and optional port. IPv6 literals are
// accepted both bracketed ("[::1]:8080", "[::1]") and bare ("::1", which
// cannot carry a port); the brackets URL syntax requires are kept or added.
fn split_authority(host: &Host) -> Result<(String, Option<u16>)> {
    let s = host.as_str();

    if let Some(end) = s.rfind(']') {
        if !s.starts_with('[') {
            return Err(StoreError::Config(format!("invalid host {s:?}")));
        }
        let (name, rest) = s.split_at(end + 1);
        let port = match rest.strip_prefix(':') {
            Some(p) => Some(parse_port(p, s)?),
            None if rest.is_empty() => None,
            None => return Err(StoreError::Config(format!("invalid host {s:?}"))),
        };
        return Ok((name.to_string(), port));
    }

    if s.matches(':').count() > 1 {
        // Bare IPv6 literal
        return Ok((format!("[{s}]"), None));
    }

    match s.rsplit_once(':') {
        Some((name, p)) => Ok((name.to_string(), Some(parse_port(p, s)?))),
        None => Ok((s.to_string(), None)),
    }
}

fn parse_port(p: &str, host: &str) -> Result<u16> {
    p.parse::<u16>()
        .map_err(|_| StoreError::Config(format!("invalid port in host {host:?}")))
}

// Read the Content-Length header directly: for HEAD responses the body size
// hint is always zero, which is not what the header says.
fn content_length(resp: &reqwest::Response) -> Option<u64> {
    resp.headers()
        .get(reqwest::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn unexpected(method: &'static str, url: &Url, status: StatusCode) -> StoreError {
    StoreError::UnexpectedStatus {
        method,
        url: url.to_string(),
        status: status.as_u16(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base_url: &str) -> HttpTransport {
        HttpTransport::new(base_url, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_url_for_replaces_authority() {
        let t = transport("http://media.example.com/media/");
        let url = t
            .url_for(&Host::from("media1:8080"), "photos/a.txt")
            .unwrap();
        assert_eq!(url.as_str(), "http://media1:8080/media/photos/a.txt");
    }

    #[test]
    fn test_url_for_host_without_port() {
        let t = transport("http://unused/media/");
        let url = t.url_for(&Host::from("media1"), "a.txt").unwrap();
        assert_eq!(url.as_str(), "http://media1/media/a.txt");
    }

    #[test]
    fn test_url_for_adds_trailing_slash_to_prefix() {
        let t = transport("http://unused/media");
        let url = t.url_for(&Host::from("media1"), "a.txt").unwrap();
        assert_eq!(url.as_str(), "http://media1/media/a.txt");
    }

    #[test]
    fn test_base_url_with_query_rejected() {
        let err = HttpTransport::new("http://unused/media/?x=1", Duration::from_secs(2));
        assert!(matches!(err, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_base_url_with_fragment_rejected() {
        let err = HttpTransport::new("http://unused/media/#frag", Duration::from_secs(2));
        assert!(matches!(err, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let t = transport("http://unused/media/");
        let err = t.url_for(&Host::from("media1:notaport"), "a.txt");
        assert!(matches!(err, Err(StoreError::Config(_))));
    }

    #[test]
    fn test_url_for_bracketed_ipv6_with_port() {
        let t = transport("http://unused/media/");
        let url = t.url_for(&Host::from("[::1]:8080"), "a.txt").unwrap();
        assert_eq!(url.as_str(), "http://[::1]:8080/media/a.txt");
    }

    #[test]
    fn test_url_for_bare_ipv6_literal() {
        let t = transport("http://unused/media/");
        let url = t.url_for(&Host::from("::1"), "a.txt").unwrap();
        assert_eq!(url.as_str(), "http://[::1]/media/a.txt");
    }

    #[test]
    fn test_malformed_ipv6_authority_rejected() {
        let t = transport("http://unused/media/");
        assert!(matches!(
            t.url_for(&Host::from("[::1]8080"), "a.txt"),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            t.url_for(&Host::from("::1]"), "a.txt"),
            Err(StoreError::Config(_))
        ));
    }
}
