// crates/genepattern-client/src/connection.rs
// ============================================================================
// Module: GenePattern Connection
// Description: Server handle that authenticates and issues REST requests.
// Purpose: Own credentials, the cached bearer token, and the HTTP client.
// Dependencies: base64, genepattern-config, percent-encoding, reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! A [`Connection`] is a cheap, clonable handle shared by every resource
//! built from it. Requests carry `Authorization: Bearer <token>` once a token
//! has been obtained and the Basic value before that, plus the configured
//! `User-Agent`.
//! Invariants:
//! - A cached token is reused until [`Connection::invalidate_token`].
//! - Redirects are never followed implicitly.
//! - Upload and submission failures are logged and reported as `None`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::thread;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use genepattern_config::DEFAULT_CLIENT_ID_PREFIX;
use genepattern_config::DEFAULT_JOB_TAG;
use genepattern_config::DEFAULT_USER_AGENT;
use genepattern_config::GenePatternConfig;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::LOCATION;
use reqwest::header::USER_AGENT;
use reqwest::redirect::Policy;
use serde_json::Value;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backoff::PollPolicy;
use crate::backoff::next_wait_units;
use crate::error::ClientError;
use crate::resource::Job;
use crate::resource::RemoteFile;
use crate::resource::TaskDescriptor;
use crate::resource::job::parse_job_id;
use crate::spec::JobSpec;
use crate::wire::WireEncode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters left unescaped in path and query components.
const QUOTE_SET: &AsciiSet =
    &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-').remove(b'~').remove(b'/');

/// Diagnostic logged when the server refuses a submission with 403.
const FORBIDDEN_SUBMIT_MESSAGE: &str =
    "job POST failed, your account is either over the data limit or you have too many jobs running";

// ============================================================================
// SECTION: Client Identity
// ============================================================================

/// Identity values sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Tag attached to submitted jobs.
    pub job_tag: String,
    /// Prefix combined with the username to form the OAuth client id.
    pub client_id_prefix: String,
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            job_tag: DEFAULT_JOB_TAG.to_string(),
            client_id_prefix: DEFAULT_CLIENT_ID_PREFIX.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    /// Server base URL.
    url: String,
    /// Account name.
    username: String,
    /// Account password.
    password: String,
    /// Identity headers and tags.
    identity: ClientIdentity,
    /// Poll cadence.
    poll: PollPolicy,
    /// Optional request timeout.
    timeout: Option<Duration>,
}

impl ConnectionBuilder {
    /// Overrides the client identity.
    #[must_use]
    pub fn identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Overrides the poll cadence.
    #[must_use]
    pub const fn poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Sets a per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] when the HTTP client cannot be built.
    pub fn build(self) -> Result<Connection, ClientError> {
        let mut builder = Client::builder().redirect(Policy::none());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Connection {
            inner: Arc::new(ConnectionInner {
                base_url: self.url.trim_end_matches('/').to_string(),
                username: self.username,
                password: self.password,
                identity: self.identity,
                poll: self.poll,
                http,
                token: Mutex::new(None),
                last_job: Mutex::new(None),
            }),
        })
    }
}

// ============================================================================
// SECTION: Connection
// ============================================================================

/// Shared state behind a [`Connection`].
struct ConnectionInner {
    /// Base URL without a trailing slash.
    base_url: String,
    /// Account name.
    username: String,
    /// Account password.
    password: String,
    /// Identity headers and tags.
    identity: ClientIdentity,
    /// Poll cadence.
    poll: PollPolicy,
    /// Blocking HTTP client with redirects disabled.
    http: Client,
    /// Cached bearer token.
    token: Mutex<Option<String>>,
    /// Id of the most recently submitted job.
    last_job: Mutex<Option<u64>>,
}

/// Handle to a GenePattern server.
#[derive(Clone)]
pub struct Connection {
    /// Shared connection state.
    inner: Arc<ConnectionInner>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.inner.base_url)
            .field("username", &self.inner.username)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.inner.base_url, self.inner.username)
    }
}

impl Connection {
    /// Starts a builder with default identity and poll cadence.
    #[must_use]
    pub fn builder(url: &str, username: &str, password: &str) -> ConnectionBuilder {
        ConnectionBuilder {
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            identity: ClientIdentity::default(),
            poll: PollPolicy::default(),
            timeout: None,
        }
    }

    /// Creates a connection with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] when the HTTP client cannot be built.
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self, ClientError> {
        Self::builder(url, username, password).build()
    }

    /// Creates a connection from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] when the HTTP client cannot be built.
    pub fn from_config(config: &GenePatternConfig) -> Result<Self, ClientError> {
        Self::builder(config.server.base_url(), &config.server.username, &config.server.password)
            .identity(ClientIdentity {
                user_agent: config.client.user_agent.clone(),
                job_tag: config.client.job_tag.clone(),
                client_id_prefix: config.client.client_id_prefix.clone(),
            })
            .poll_policy(PollPolicy::from_config(&config.polling))
            .timeout(config.client.request_timeout())
            .build()
    }

    /// Server base URL without a trailing slash.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.base_url
    }

    /// Account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.inner.username
    }

    /// Poll cadence used by job waits.
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        self.inner.poll
    }

    /// Identity headers and tags.
    #[must_use]
    pub fn identity(&self) -> &ClientIdentity {
        &self.inner.identity
    }

    // ------------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------------

    /// Returns the Basic authorization value for the stored credentials.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        let credentials = format!("{}:{}", self.inner.username, self.inner.password);
        format!("Basic {}", STANDARD.encode(credentials.as_bytes()))
    }

    /// Exchanges the credentials for a bearer token and caches it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Authentication`] when the server rejects the
    /// credentials and [`ClientError::Transport`] on network failure.
    pub fn login(&self) -> Result<String, ClientError> {
        let username = quote(&self.inner.username);
        let url = format!(
            "{}/rest/v1/oauth2/token?grant_type=password&username={username}&password={}&client_id={}{username}",
            self.inner.base_url,
            quote(&self.inner.password),
            quote(&self.inner.identity.client_id_prefix),
        );
        debug!(url = %self.endpoint("/rest/v1/oauth2/token"), "requesting bearer token");
        let response = self.plain_request(Method::POST, &url).body(Vec::new()).send()?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(ClientError::Authentication(format!(
                "invalid username or password (http status {status})"
            )));
        }
        let payload = read_json(response)?;
        let token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Authentication("token response lacks access_token".to_string()))?
            .to_string();
        *lock(&self.inner.token, "token")? = Some(token.clone());
        info!(username = %self.inner.username, "obtained bearer token");
        Ok(token)
    }

    /// Returns the cached token, logging in first if none is cached.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when login fails.
    pub fn get_token(&self) -> Result<String, ClientError> {
        if let Some(token) = lock(&self.inner.token, "token")?.clone() {
            return Ok(token);
        }
        self.login()
    }

    /// Drops the cached token; requests fall back to Basic auth.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::State`] when the token lock is poisoned.
    pub fn invalidate_token(&self) -> Result<(), ClientError> {
        *lock(&self.inner.token, "token")? = None;
        Ok(())
    }

    /// Returns true when a bearer token is cached.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::State`] when the token lock is poisoned.
    pub fn has_token(&self) -> Result<bool, ClientError> {
        Ok(lock(&self.inner.token, "token")?.is_some())
    }

    // ------------------------------------------------------------------------
    // Server Operations
    // ------------------------------------------------------------------------

    /// Fetches the server's system message without authentication.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or a non-success status.
    pub fn system_message(&self) -> Result<String, ClientError> {
        let url = self.endpoint("/rest/v1/config/system-message");
        debug!(url = %url, "fetching system message");
        let response = expect_success(self.plain_request(Method::GET, &url).send()?)?;
        Ok(response.text()?)
    }

    /// Uploads a local file; returns `None` after logging on any failure.
    #[must_use]
    pub fn upload_file(&self, file_name: &str, file_path: &Path) -> Option<RemoteFile> {
        match self.try_upload_file(file_name, file_path) {
            Ok(file) => {
                info!(file = %file.url(), "uploaded job input");
                Some(file)
            }
            Err(err) => {
                warn!(file_name, path = %file_path.display(), error = %err, "file upload failed");
                None
            }
        }
    }

    /// Uploads a local file, surfacing the failure cause.
    fn try_upload_file(&self, file_name: &str, file_path: &Path) -> Result<RemoteFile, ClientError> {
        let data = fs::read(file_path).map_err(|err| ClientError::Io(err.to_string()))?;
        let url = format!(
            "{}/rest/v1/data/upload/job_input?name={}",
            self.inner.base_url,
            quote(file_name)
        );
        let response = self.request(Method::POST, &url)?.body(data).send()?;
        let status = response.status().as_u16();
        if status != 201 {
            return Err(ClientError::Status {
                status,
                url,
            });
        }
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ClientError::missing("Location header"))?;
        Ok(RemoteFile::new(self.clone(), location))
    }

    /// Submits a job and optionally blocks until it finishes.
    ///
    /// A submission the server does not accept with 201 is logged and
    /// returned as `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or when the created job
    /// cannot be fetched.
    pub fn run_job(&self, spec: &JobSpec, wait_until_done: bool) -> Result<Option<Job>, ClientError> {
        let mut request = spec.clone();
        request.add_tag(&self.inner.identity.job_tag);
        let body = serde_json::to_vec(&request.to_wire())
            .map_err(|err| ClientError::Decode(err.to_string()))?;
        let url = self.endpoint("/rest/v1/jobs");
        let response = self
            .request(Method::POST, &url)?
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;
        let status = response.status().as_u16();
        if status == 403 {
            warn!(status, lsid = spec.lsid(), "{FORBIDDEN_SUBMIT_MESSAGE}");
            return Ok(None);
        }
        if status != 201 {
            warn!(status, lsid = spec.lsid(), "job POST failed");
            return Ok(None);
        }
        let payload = read_json(response)?;
        let job_id = parse_job_id(&payload).ok_or_else(|| ClientError::missing("jobId"))?;
        info!(job_id, lsid = spec.lsid(), "job submitted");
        let mut job = Job::new(self.clone(), job_id);
        job.get_info()?;
        *lock(&self.inner.last_job, "last job")? = Some(job_id);
        if wait_until_done {
            job.wait_until_done()?;
        }
        Ok(Some(job))
    }

    /// Returns an unloaded handle for an existing job.
    #[must_use]
    pub fn get_job(&self, job_id: u64) -> Job {
        Job::new(self.clone(), job_id)
    }

    /// Returns an unloaded handle for the most recently submitted job.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::State`] when the job lock is poisoned.
    pub fn last_job(&self) -> Result<Option<Job>, ClientError> {
        Ok(lock(&self.inner.last_job, "last job")?.map(|job_id| self.get_job(job_id)))
    }

    /// Returns an unloaded descriptor for a task name or LSID.
    #[must_use]
    pub fn get_task(&self, name_or_lsid: &str) -> TaskDescriptor {
        TaskDescriptor::new(self.clone(), name_or_lsid)
    }

    /// Lists the tasks installed on the server.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or an unexpected payload.
    pub fn get_task_list(&self) -> Result<Vec<TaskDescriptor>, ClientError> {
        let payload = self.get_json(&self.endpoint("/rest/v1/tasks/all.json"))?;
        let modules = payload
            .get("all_modules")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::missing("all_modules"))?;
        modules.iter().map(|entry| TaskDescriptor::from_catalog_entry(self.clone(), entry)).collect()
    }

    /// Returns the user's most recently submitted jobs, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or an unexpected payload.
    pub fn get_recent_jobs(&self, count: usize) -> Result<Vec<Job>, ClientError> {
        let url = format!(
            "{}/rest/v1/jobs/?pageSize={count}&userId={}&orderBy=-dateSubmitted",
            self.inner.base_url,
            quote(&self.inner.username)
        );
        let payload = self.get_json(&url)?;
        let items =
            payload.get("items").and_then(Value::as_array).ok_or_else(|| ClientError::missing("items"))?;
        items.iter().map(|item| Job::from_info(self.clone(), item.clone())).collect()
    }

    /// Blocks until every job reports finished.
    ///
    /// Each round sleeps, then refreshes jobs in order, stopping at the
    /// first one still running. The wait doubles per round up to the batch
    /// cap.
    ///
    /// # Errors
    ///
    /// Returns the first [`ClientError`] raised by a status fetch.
    pub fn wait_until_complete(&self, jobs: &mut [Job]) -> Result<(), ClientError> {
        let poll = self.inner.poll;
        let mut complete = vec![false; jobs.len()];
        let mut wait = 1;
        while !complete.iter().all(|done| *done) {
            thread::sleep(poll.delay(wait));
            for (done, job) in complete.iter_mut().zip(jobs.iter_mut()) {
                if *done {
                    continue;
                }
                job.get_info()?;
                *done = job.is_finished()?;
                if !*done {
                    break;
                }
            }
            wait = next_wait_units(wait, poll.batch_cap());
        }
        info!(jobs = jobs.len(), "all jobs finished");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Request Helpers
    // ------------------------------------------------------------------------

    /// Joins a server-relative path onto the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Returns the authorization value for the next request.
    fn auth_value(&self) -> Result<String, ClientError> {
        Ok(lock(&self.inner.token, "token")?
            .as_ref()
            .map_or_else(|| self.authorization_header(), |token| format!("Bearer {token}")))
    }

    /// Starts an authenticated request.
    pub(crate) fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ClientError> {
        let auth = self.auth_value()?;
        debug!(method = %method, url, "sending request");
        Ok(self.plain_request(method, url).header(AUTHORIZATION, auth))
    }

    /// Starts a request that carries only the `User-Agent` header.
    pub(crate) fn plain_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.inner.http.request(method, url).header(USER_AGENT, &self.inner.identity.user_agent)
    }

    /// Starts a request with no client headers at all.
    pub(crate) fn bare_request(&self, method: Method, url: &str) -> RequestBuilder {
        self.inner.http.request(method, url)
    }

    /// Issues an authenticated GET and decodes the JSON body.
    pub(crate) fn get_json(&self, url: &str) -> Result<Value, ClientError> {
        let response = expect_success(self.request(Method::GET, url)?.send()?)?;
        read_json(response)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Percent-encodes a path or query component.
pub(crate) fn quote(value: &str) -> String {
    utf8_percent_encode(value, QUOTE_SET).to_string()
}

/// Fails with [`ClientError::Status`] unless the response is 2xx.
pub(crate) fn expect_success(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ClientError::Status {
            status: response.status().as_u16(),
            url: response.url().to_string(),
        })
    }
}

/// Decodes a JSON response body.
pub(crate) fn read_json(response: Response) -> Result<Value, ClientError> {
    let text = response.text()?;
    serde_json::from_str(&text).map_err(|err| ClientError::Decode(err.to_string()))
}

/// Locks a mutex, mapping poisoning to [`ClientError::State`].
fn lock<'a, T>(mutex: &'a Mutex<T>, label: &str) -> Result<MutexGuard<'a, T>, ClientError> {
    mutex.lock().map_err(|_| ClientError::State(format!("{label} lock poisoned")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
