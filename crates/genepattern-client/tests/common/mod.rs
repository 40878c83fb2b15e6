// crates/genepattern-client/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Scripted local HTTP server for client integration tests.
// Purpose: Answer requests in order and record what the client sent.
// Dependencies: genepattern-client, tiny_http
// ============================================================================

//! ## Overview
//! [`ScriptedServer`] binds `127.0.0.1:0`, answers each request with the next
//! scripted [`Reply`], and hands back every request it saw when joined.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use genepattern_client::Connection;
use genepattern_client::PollPolicy;
use serde_json::Value;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;
use tiny_http::StatusCode;

// ============================================================================
// SECTION: Replies and Records
// ============================================================================

/// Scripted answer for one request.
pub struct Reply {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Extra response headers.
    pub headers: Vec<(String, String)>,
}

impl Reply {
    /// A 200 reply carrying JSON.
    pub fn json(value: &Value) -> Self {
        Self::status(200, &value.to_string())
    }

    /// A reply with the given status and body.
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            headers: Vec::new(),
        }
    }

    /// Adds a response header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Request observed by the server.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// HTTP method.
    pub method: String,
    /// Path and query.
    pub url: String,
    /// `Authorization` header, if sent.
    pub authorization: Option<String>,
    /// `User-Agent` header, if sent.
    pub user_agent: Option<String>,
    /// Request body.
    pub body: String,
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Local server that plays back replies in order.
pub struct ScriptedServer {
    /// Base URL of the fake GenePattern deployment, ending in `/gp`.
    pub base: String,
    /// `http://host:port` root of the server.
    pub root: String,
    /// Bound server, consumed by [`ScriptedServer::play`].
    server: Server,
}

impl ScriptedServer {
    /// Binds a fresh server on an ephemeral port.
    pub fn bind() -> Self {
        let server = Server::http("127.0.0.1:0").expect("http server");
        let root = format!("http://{}", server.server_addr());
        Self {
            base: format!("{root}/gp"),
            root,
            server,
        }
    }

    /// Answers exactly `replies.len()` requests on a background thread.
    pub fn play(self, replies: Vec<Reply>) -> JoinHandle<Vec<Recorded>> {
        let server = self.server;
        thread::spawn(move || {
            let mut seen = Vec::new();
            for reply in replies {
                let mut request = server.recv().expect("request");
                let header = |name: &'static str| {
                    request
                        .headers()
                        .iter()
                        .find(|header| header.field.equiv(name))
                        .map(|header| header.value.as_str().to_string())
                };
                let authorization = header("Authorization");
                let user_agent = header("User-Agent");
                let mut body = String::new();
                request.as_reader().read_to_string(&mut body).expect("request body");
                seen.push(Recorded {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    authorization,
                    user_agent,
                    body,
                });
                let mut response = Response::from_string(reply.body).with_status_code(StatusCode(reply.status));
                for (name, value) in reply.headers {
                    response = response.with_header(Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap());
                }
                request.respond(response).expect("respond");
            }
            seen
        })
    }
}

// ============================================================================
// SECTION: Connection Helpers
// ============================================================================

/// Connection to `base` with a one-millisecond poll unit.
pub fn fast_connection(base: &str) -> Connection {
    Connection::builder(base, "test", "p@ss")
        .poll_policy(PollPolicy::new(Duration::from_millis(1), 60, 10))
        .build()
        .expect("connection")
}

/// Minimal job status object.
pub fn job_status(job_id: u64, finished: bool, has_error: bool) -> Value {
    serde_json::json!({
        "jobId": job_id,
        "taskName": "ConvertLineEndings",
        "status": {"isFinished": finished, "hasError": has_error, "statusMessage": "status"}
    })
}
