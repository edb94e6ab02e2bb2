// build-sleuth-catalog/tests/common/mod.rs
// ============================================================================
// Module: Catalog Test Support
// Description: Local HTTP server scaffolding for catalog client tests.
// ============================================================================

//! ## Overview
//! Spawns a `tiny_http` server answering a fixed number of requests from a
//! path-to-body table, recording each request path so tests can assert the
//! operations and batching a client performed.

#![allow(dead_code, reason = "Each integration test uses a subset of the helpers.")]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use tiny_http::Response;
use tiny_http::Server;

/// Requests captured by the test server.
pub type SeenRequests = Arc<Mutex<Vec<String>>>;

/// Spawns a server answering `count` requests from the path table.
///
/// Unknown paths receive a 404. Returns the base URL, the captured request
/// paths, and the join handle.
pub fn spawn_server(
    responses: BTreeMap<String, String>,
    count: usize,
) -> (String, SeenRequests, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let url = format!("http://{addr}/");

    let seen: SeenRequests = Arc::new(Mutex::new(Vec::new()));
    let seen_writer = Arc::clone(&seen);

    let handle = thread::spawn(move || {
        for _ in 0..count {
            let Ok(request) = server.recv() else {
                return;
            };

            let path = request.url().trim_start_matches('/').to_string();
            seen_writer.lock().unwrap().push(path.clone());

            let response = match responses.get(&path) {
                Some(body) => Response::from_string(body.clone()).with_status_code(200),
                None => Response::from_string("not found").with_status_code(404),
            };
            let _ = request.respond(response);
        }
    });

    (url, seen, handle)
}

/// Builds a single-entry response table.
pub fn one_response(path: &str, body: &str) -> BTreeMap<String, String> {
    let mut responses = BTreeMap::new();
    responses.insert(path.to_string(), body.to_string());
    responses
}
