// crates/genepattern-client/src/resource/file.rs
// ============================================================================
// Module: Remote File
// Description: Handle to a file stored on the GenePattern server.
// Purpose: Open, read, and name job inputs and outputs by URL.
// Dependencies: genepattern-formats, percent-encoding, reqwest, tracing
// ============================================================================

//! ## Overview
//! A [`RemoteFile`] is stateless beyond its URL; every read re-opens it.
//! Storage services answer some downloads with a redirect whose target must
//! be fetched without the server's credentials, so [`RemoteFile::open`]
//! follows exactly one redirect hop with no authorization header.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Read;

use genepattern_formats::TableSource;
use percent_encoding::percent_decode_str;
use reqwest::Method;
use reqwest::blocking::Response;
use reqwest::header::LOCATION;
use serde_json::Value;
use tracing::debug;

use crate::connection::Connection;
use crate::connection::expect_success;
use crate::error::ClientError;
use crate::resource::Resource;
use crate::wire::WireEncode;

// ============================================================================
// SECTION: Remote File
// ============================================================================

/// Handle to a server-side file.
#[derive(Debug, Clone)]
pub struct RemoteFile {
    /// Owning connection.
    connection: Connection,
    /// Absolute file URL.
    url: String,
}

impl RemoteFile {
    /// Binds a file URL to a connection.
    #[must_use]
    pub fn new(connection: Connection, url: &str) -> Self {
        Self {
            connection,
            url: url.to_string(),
        }
    }

    /// Absolute file URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Opens the file for streaming.
    ///
    /// One storage redirect is followed without credentials. A relative
    /// `Location` resolves against the URL that answered.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failure or a non-success status
    /// from either the server or the redirect target.
    pub fn open(&self) -> Result<Response, ClientError> {
        let response = self.connection.request(Method::GET, &self.url)?.send()?;
        if !response.status().is_redirection() {
            return expect_success(response);
        }
        let location = response.headers().get(LOCATION).and_then(|value| value.to_str().ok());
        let Some(location) = location else {
            return expect_success(response);
        };
        let target = response.url().join(location).map_err(|err| {
            ClientError::Transport(format!("invalid redirect location '{location}': {err}"))
        })?;
        debug!(from = %self.url, to = %target, "following storage redirect");
        expect_success(self.connection.bare_request(Method::GET, target.as_str()).send()?)
    }

    /// Reads the whole file as UTF-8 text; an empty file yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the file cannot be opened or is not UTF-8.
    pub fn read(&self) -> Result<Option<String>, ClientError> {
        let mut response = self.open()?;
        let mut text = String::new();
        response.read_to_string(&mut text).map_err(|err| ClientError::Io(err.to_string()))?;
        Ok(if text.is_empty() { None } else { Some(text) })
    }

    /// Reads the whole file as bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the file cannot be opened.
    pub fn read_bytes(&self) -> Result<Vec<u8>, ClientError> {
        Ok(self.open()?.bytes()?.to_vec())
    }

    /// URL-decoded last path segment.
    #[must_use]
    pub fn get_name(&self) -> String {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        let segment = path.rsplit('/').next().unwrap_or_default();
        percent_decode_str(segment).decode_utf8_lossy().into_owned()
    }

    /// Opens the file as an input for the table codecs.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the file cannot be opened.
    pub fn to_table_source(&self) -> Result<TableSource, ClientError> {
        Ok(TableSource::from_reader(self.open()?))
    }
}

impl Resource for RemoteFile {
    fn uri(&self) -> String {
        self.url.clone()
    }

    fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl WireEncode for RemoteFile {
    fn to_wire(&self) -> Value {
        Value::String(self.url.clone())
    }
}

impl fmt::Display for RemoteFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
