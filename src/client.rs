use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::debug;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, LOCATION, RETRY_AFTER, USER_AGENT};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result as EResult};
use crate::request::RetrievalRequest;

pub const DEFAULT_API_URL: &str = "https://api.ecmwf.int/v1";
pub const DEFAULT_DATASET: &str = "tigge";
pub const RC_FILE_NAME: &str = ".ecmwfapirc";

const KEY_HEADER: &str = "x-ecmwf-key";
const FROM_HEADER: &str = "from";

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    pub key: Option<String>,
    pub email: Option<String>,
    pub dataset: String,
    /// Wait between status polls when the server sends no `Retry-After`.
    pub poll_interval: Duration,
    /// Create missing parent directories of each target before writing.
    pub create_dirs: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            key: None,
            email: None,
            dataset: DEFAULT_DATASET.to_string(),
            poll_interval: Duration::from_secs(5),
            create_dirs: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RcFile {
    url: Option<String>,
    key: Option<String>,
    email: Option<String>,
}

impl ClientOptions {
    /// Overlay `url`/`key`/`email` from a JSON rc file.
    pub fn with_rc_file(mut self, path: &Path) -> EResult<Self> {
        let text = fs::read_to_string(path)?;
        let rc: RcFile = serde_json::from_str(&text)?;
        if let Some(url) = rc.url {
            self.url = url;
        }
        self.key = rc.key.or(self.key);
        self.email = rc.email.or(self.email);
        Ok(self)
    }

    /// Overlay `ECMWF_API_URL`, `ECMWF_API_KEY` and `ECMWF_API_EMAIL`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("ECMWF_API_URL") {
            self.url = url;
        }
        self.key = lookup("ECMWF_API_KEY").or(self.key);
        self.email = lookup("ECMWF_API_EMAIL").or(self.email);
        self
    }

    /// Defaults, then the rc file (explicit path or `~/.ecmwfapirc` if present),
    /// then the environment.
    pub fn load(rc_path: Option<&Path>) -> EResult<Self> {
        Self::load_from(rc_path, default_rc_path(), |k| std::env::var(k).ok())
    }

    fn load_from(
        rc_path: Option<&Path>,
        default_rc: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> EResult<Self> {
        let mut opts = Self::default();
        match rc_path {
            Some(path) => opts = opts.with_rc_file(path)?,
            None => {
                if let Some(path) = default_rc.filter(|p| p.is_file()) {
                    opts = opts.with_rc_file(&path)?;
                }
            }
        }
        Ok(opts.with_env(lookup))
    }
}

pub fn default_rc_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(RC_FILE_NAME))
}

/// Outcome of a completed retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved {
    pub target: PathBuf,
    pub size_bytes: u64,
}

/// Something that can turn a [`RetrievalRequest`] into a file on disk.
///
/// Each call blocks until the file is written or the retrieval fails.
pub trait Retrieve {
    fn retrieve(&self, request: &RetrievalRequest) -> EResult<Retrieved>;
}

/// Blocking client for the archive's dataset request API.
#[derive(Debug, Clone)]
pub struct WebApiClient {
    opts: ClientOptions,
    base_url: Url,
    http: HttpClient,
}

#[derive(Debug, Default, Deserialize)]
struct JobStatus {
    status: Option<String>,
    href: Option<String>,
    size: Option<u64>,
    reason: Option<String>,
    error: Option<String>,
}

#[derive(Debug)]
struct Reply {
    job: JobStatus,
    location: Option<String>,
    retry_after: Option<Duration>,
}

impl WebApiClient {
    pub fn new(opts: ClientOptions) -> EResult<Self> {
        let mut base = opts.url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("tigge-retrieve-rs/0.1"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &opts.key {
            headers.insert(HeaderName::from_static(KEY_HEADER), header_value(key)?);
        }
        if let Some(email) = &opts.email {
            headers.insert(HeaderName::from_static(FROM_HEADER), header_value(email)?);
        }

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            opts,
            base_url,
            http,
        })
    }

    fn requests_url(&self) -> EResult<Url> {
        Ok(self
            .base_url
            .join(&format!("datasets/{}/requests", self.opts.dataset))?)
    }

    /// Relative hrefs are resolved against the API base.
    fn resolve(&self, href: &str) -> EResult<Url> {
        Ok(self.base_url.join(href)?)
    }

    fn send(&self, builder: RequestBuilder) -> EResult<Reply> {
        let resp = builder.send()?;
        let status = resp.status();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = resp.text()?;

        if !status.is_success() {
            let message = serde_json::from_str::<JobStatus>(&text)
                .ok()
                .and_then(|j| j.error.or(j.reason))
                .unwrap_or_else(|| text.trim().to_string());
            return Err(Error::Retrieval(format!("HTTP {status}: {message}")));
        }

        let job: JobStatus = if text.trim().is_empty() {
            JobStatus::default()
        } else {
            serde_json::from_str(&text)?
        };
        if let Some(err) = &job.error {
            return Err(Error::Retrieval(err.clone()));
        }

        Ok(Reply {
            job,
            location,
            retry_after,
        })
    }

    /// Submit and poll until the job is complete; returns the final reply and the job URL.
    fn wait_for_job(&self, body: &serde_json::Value) -> EResult<(Reply, Url)> {
        let mut reply = self.send(self.http.post(self.requests_url()?).json(body))?;

        let job_href = reply
            .location
            .clone()
            .or_else(|| reply.job.href.clone())
            .ok_or_else(|| Error::Retrieval("server did not return a job location".into()))?;
        let job_url = self.resolve(&job_href)?;

        loop {
            let status = reply.job.status.take();
            match status.as_deref() {
                Some("complete") => return Ok((reply, job_url)),
                Some("queued") | Some("active") | Some("submitted") => {
                    let wait = reply.retry_after.unwrap_or(self.opts.poll_interval);
                    debug!(
                        "job {job_url} is {}, polling again in {wait:?}",
                        status.as_deref().unwrap_or_default()
                    );
                    thread::sleep(wait);
                    reply = self.send(self.http.get(job_url.clone()))?;
                }
                Some("aborted") => {
                    let reason = reply.job.reason.unwrap_or_else(|| "no reason given".into());
                    return Err(Error::Retrieval(format!("request aborted: {reason}")));
                }
                other => {
                    return Err(Error::Retrieval(format!(
                        "unexpected job status: {}",
                        other.unwrap_or("<missing>")
                    )));
                }
            }
        }
    }

    fn download(&self, href: &str, target: &Path, expected: Option<u64>) -> EResult<u64> {
        let url = self.resolve(href)?;
        let mut resp = self.http.get(url).send()?.error_for_status()?;

        if self.opts.create_dirs {
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(target)?;
        let copied = resp.copy_to(&mut file).map_err(Error::from);
        drop(file);

        // Never leave a truncated file behind.
        let result = copied.and_then(|written| match expected {
            Some(size) if size != written => Err(Error::Retrieval(format!(
                "size mismatch for {}: expected {size} bytes, got {written}",
                target.display()
            ))),
            _ => Ok(written),
        });
        if result.is_err() {
            let _ = fs::remove_file(target);
        }
        result
    }
}

impl Retrieve for WebApiClient {
    fn retrieve(&self, request: &RetrievalRequest) -> EResult<Retrieved> {
        let body = request.to_request().to_json();
        let (reply, job_url) = self.wait_for_job(&body)?;

        let href = reply
            .job
            .href
            .as_deref()
            .ok_or_else(|| Error::Retrieval("completed job has no result href".into()))?;
        let target = request.target_path();
        let size_bytes = self.download(href, target, reply.job.size)?;

        // Release the job on the server; the data is already on disk.
        if let Err(e) = self.http.delete(job_url.clone()).send() {
            debug!("could not delete job {job_url}: {e}");
        }

        Ok(Retrieved {
            target: target.to_path_buf(),
            size_bytes,
        })
    }
}

fn header_value(s: &str) -> EResult<HeaderValue> {
    HeaderValue::from_str(s.trim())
        .map_err(|_| Error::InvalidRequest(format!("invalid header value: {s}")))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn rc_file_overrides_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"url": "https://example.org/v1", "key": "abc", "email": "me@example.org"}}"#
        )
        .unwrap();

        let opts = ClientOptions::default().with_rc_file(f.path()).unwrap();
        assert_eq!(opts.url, "https://example.org/v1");
        assert_eq!(opts.key.as_deref(), Some("abc"));
        assert_eq!(opts.email.as_deref(), Some("me@example.org"));
        assert_eq!(opts.dataset, "tigge");
    }

    #[test]
    fn env_overrides_rc_values() {
        let opts = ClientOptions {
            key: Some("from-rc".into()),
            ..ClientOptions::default()
        }
        .with_env(|k| match k {
            "ECMWF_API_KEY" => Some("from-env".into()),
            _ => None,
        });
        assert_eq!(opts.key.as_deref(), Some("from-env"));
        assert_eq!(opts.url, DEFAULT_API_URL);
        assert_eq!(opts.email, None);
    }

    #[test]
    fn load_reads_home_rc_then_env() {
        let home = tempfile::tempdir().unwrap();
        let rc = home.path().join(RC_FILE_NAME);
        std::fs::write(
            &rc,
            r#"{"url": "https://rc.example.org/v1", "key": "rc-key", "email": "rc@example.org"}"#,
        )
        .unwrap();

        let opts = ClientOptions::load_from(None, Some(rc.clone()), |k| match k {
            "ECMWF_API_EMAIL" => Some("env@example.org".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(opts.url, "https://rc.example.org/v1");
        assert_eq!(opts.key.as_deref(), Some("rc-key"));
        assert_eq!(opts.email.as_deref(), Some("env@example.org"));

        // An explicit rc path wins over the home one.
        let mut other = tempfile::NamedTempFile::new().unwrap();
        write!(other, r#"{{"key": "explicit"}}"#).unwrap();
        let opts = ClientOptions::load_from(Some(other.path()), Some(rc), |_| None).unwrap();
        assert_eq!(opts.key.as_deref(), Some("explicit"));
        assert_eq!(opts.url, DEFAULT_API_URL);
    }

    #[test]
    fn load_without_home_rc_uses_defaults() {
        let home = tempfile::tempdir().unwrap();
        let missing = home.path().join(RC_FILE_NAME);
        let opts = ClientOptions::load_from(None, Some(missing), |_| None).unwrap();
        assert_eq!(opts.url, DEFAULT_API_URL);
        assert_eq!(opts.key, None);
    }

    #[test]
    fn malformed_rc_file_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        assert!(matches!(
            ClientOptions::default().with_rc_file(f.path()),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn requests_url_joins_dataset() {
        let client = WebApiClient::new(ClientOptions::default()).unwrap();
        assert_eq!(
            client.requests_url().unwrap().as_str(),
            "https://api.ecmwf.int/v1/datasets/tigge/requests"
        );
        assert_eq!(
            client.resolve("/v1/datasets/tigge/requests/xyz").unwrap().as_str(),
            "https://api.ecmwf.int/v1/datasets/tigge/requests/xyz"
        );
    }
}
