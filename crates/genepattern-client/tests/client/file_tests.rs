// crates/genepattern-client/tests/client/file_tests.rs
// ============================================================================
// Module: Remote File Tests
// Description: Download behaviour of remote file handles.
// Purpose: Pin the single unauthenticated redirect hop and text decoding.
// Dependencies: genepattern-client, genepattern-formats
// ============================================================================

//! ## Overview
//! Covers reads, storage redirects, and codec input from remote files.

use genepattern_client::ClientError;
use genepattern_client::RemoteFile;
use genepattern_formats::Odf;

use crate::common::Reply;
use crate::common::ScriptedServer;
use crate::common::fast_connection;

/// Tests a storage redirect is followed once without credentials.
#[test]
fn open_follows_redirect_without_authorization() {
    let server = ScriptedServer::bind();
    let target = format!("{}/storage/bucket/result.txt?sig=abc", server.root);
    let url = format!("{}/jobResults/3/result.txt", server.base);
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![
        Reply::status(302, "").header("Location", &target),
        Reply::status(200, "hello"),
    ]);
    let file = RemoteFile::new(connection.clone(), &url);
    assert_eq!(file.read().expect("read").as_deref(), Some("hello"));

    let seen = handle.join().expect("server thread");
    assert_eq!(seen[0].url, "/gp/jobResults/3/result.txt");
    assert_eq!(seen[0].authorization.as_deref(), Some(connection.authorization_header().as_str()));
    assert_eq!(seen[1].url, "/storage/bucket/result.txt?sig=abc");
    assert!(seen[1].authorization.is_none());
}

/// Tests a relative `Location` resolves against the URL that answered.
#[test]
fn open_resolves_relative_redirect() {
    let server = ScriptedServer::bind();
    let url = format!("{}/jobResults/3/out.odf", server.base);
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![
        Reply::status(302, "").header("Location", "/data/x.odf"),
        Reply::status(200, "payload"),
    ]);
    let file = RemoteFile::new(connection, &url);
    assert_eq!(file.read().expect("read").as_deref(), Some("payload"));

    let seen = handle.join().expect("server thread");
    assert_eq!(seen[1].url, "/data/x.odf");
    assert!(seen[1].authorization.is_none());
}

/// Tests an empty file reads as no content.
#[test]
fn empty_file_reads_as_none() {
    let server = ScriptedServer::bind();
    let url = format!("{}/jobResults/3/empty.txt", server.base);
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::status(200, "")]);
    assert!(RemoteFile::new(connection, &url).read().expect("read").is_none());
    handle.join().expect("server thread");
}

/// Tests a missing file propagates the status error.
#[test]
fn missing_file_propagates_status() {
    let server = ScriptedServer::bind();
    let url = format!("{}/jobResults/3/gone.txt", server.base);
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::status(404, "not found")]);
    let err = RemoteFile::new(connection, &url).read().expect_err("404");
    assert!(matches!(err, ClientError::Status { status: 404, .. }));
    handle.join().expect("server thread");
}

/// Tests a remote file feeds the annotated-format codec.
#[test]
fn remote_file_feeds_odf_codec() {
    let server = ScriptedServer::bind();
    let url = format!("{}/jobResults/4/out.odf", server.base);
    let connection = fast_connection(&server.base);
    let handle = server.play(vec![Reply::status(
        200,
        "ODF 1.0\nHeaderLines=2\nCOLUMN_NAMES:x\ty\nDataLines=1\n5\t6\n",
    )]);
    let source = RemoteFile::new(connection, &url).to_table_source().expect("source");
    let odf = Odf::read(source).expect("parse");
    assert_eq!(odf.column_names(), ["x", "y"]);
    assert_eq!(odf.row_count(), 1);
    handle.join().expect("server thread");
}
