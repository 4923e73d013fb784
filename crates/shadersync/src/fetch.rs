use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;
use tracing::trace;

/// Where the live fragment shader is served during development.
pub const DEFAULT_SOURCE: &str = "http://localhost:5000/hello.frag";

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid shader source location '{input}': {reason}")]
    InvalidLocation { input: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: Url, status: u16 },
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can produce the current shader source text.
pub trait SourceFetcher: Send {
    fn fetch(&self) -> Result<String, FetchError>;
}

/// Parsed shader source location: an HTTP(S) URL or a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Http(Url),
    File(PathBuf),
}

impl SourceLocation {
    /// Accepts `http://`/`https://` URLs, `file://` URLs, and plain paths.
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "location must not be empty"));
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            let url = Url::parse(trimmed).map_err(|err| invalid(input, err))?;
            return Ok(Self::Http(url));
        }

        if trimmed.starts_with("file://") {
            let url = Url::parse(trimmed).map_err(|err| invalid(input, err))?;
            let path = url
                .to_file_path()
                .map_err(|_| invalid(input, "file URL does not name a local path"))?;
            return Ok(Self::File(path));
        }

        if let Some((scheme, _)) = trimmed.split_once("://") {
            return Err(invalid(input, format!("unsupported scheme '{scheme}'")));
        }

        Ok(Self::File(PathBuf::from(trimmed)))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::parse(DEFAULT_SOURCE).expect("default source location is a valid URL")
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn invalid(input: &str, reason: impl fmt::Display) -> FetchError {
    FetchError::InvalidLocation {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

/// Blocking HTTP GET of a shader source.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
    url: Url,
}

impl HttpFetcher {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, FetchError> {
        let mut builder = Client::builder().timeout(timeout);
        if is_loopback(&url) {
            builder = builder.no_proxy();
        }
        let http = builder.build().map_err(FetchError::Client)?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn is_loopback(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("localhost") | Some("127.0.0.1") | Some("[::1]")
    )
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self) -> Result<String, FetchError> {
        trace!(url = %self.url, "fetching shader source");
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .map_err(|source| FetchError::Request {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(|source| FetchError::Body {
            url: self.url.clone(),
            source,
        })
    }
}

/// Reads the shader source from a local file on every fetch.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceFetcher for FileFetcher {
    fn fetch(&self) -> Result<String, FetchError> {
        let bytes = fs::read(&self.path).map_err(|source| FetchError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Fetcher for any [`SourceLocation`].
#[derive(Debug, Clone)]
pub enum SourceClient {
    Http(HttpFetcher),
    File(FileFetcher),
}

impl SourceClient {
    pub fn new(location: &SourceLocation, timeout: Duration) -> Result<Self, FetchError> {
        match location {
            SourceLocation::Http(url) => Ok(Self::Http(HttpFetcher::new(url.clone(), timeout)?)),
            SourceLocation::File(path) => Ok(Self::File(FileFetcher::new(path.clone()))),
        }
    }
}

impl SourceFetcher for SourceClient {
    fn fetch(&self) -> Result<String, FetchError> {
        match self {
            Self::Http(fetcher) => fetcher.fetch(),
            Self::File(fetcher) => fetcher.fetch(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_location_is_local_server() {
        let location = SourceLocation::default();
        assert!(location.is_remote());
        assert_eq!(location.to_string(), DEFAULT_SOURCE);
    }

    #[test]
    fn parses_plain_path_as_file() {
        assert_eq!(
            SourceLocation::parse("shaders/hello.frag").unwrap(),
            SourceLocation::File(PathBuf::from("shaders/hello.frag"))
        );
    }

    #[test]
    fn parses_file_url() {
        assert_eq!(
            SourceLocation::parse("file:///tmp/hello.frag").unwrap(),
            SourceLocation::File(PathBuf::from("/tmp/hello.frag"))
        );
    }

    #[test]
    fn rejects_empty_and_unknown_schemes() {
        assert!(matches!(
            SourceLocation::parse("   "),
            Err(FetchError::InvalidLocation { .. })
        ));
        assert!(matches!(
            SourceLocation::parse("ftp://example.com/a.frag"),
            Err(FetchError::InvalidLocation { .. })
        ));
    }

    #[test]
    fn file_fetcher_reports_missing_file() {
        let fetcher = FileFetcher::new("/definitely/not/here.frag");
        let err = fetcher.fetch().unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.frag"));
    }

    #[test]
    fn file_fetcher_decodes_invalid_utf8_lossily() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("latin1.frag");
        fs::write(&path, b"// caf\xe9\nvoid main(){}\n").unwrap();

        let text = FileFetcher::new(&path).fetch().unwrap();
        assert_eq!(text, "// caf\u{fffd}\nvoid main(){}\n");
    }
}
