#![allow(dead_code)]
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// A request as seen by the stub.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

/// Canned-response HTTP server on a loopback port.
///
/// Routes are matched by path prefix (the part before `?`); the first
/// matching route wins. Unmatched paths answer 404.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    pub fn start(routes: Vec<(&str, u16, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let port = listener.local_addr().unwrap().port();
        let routes: Vec<(String, u16, String)> = routes
            .into_iter()
            .map(|(p, s, b)| (p.to_string(), s, b.to_string()))
            .collect();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                handle(stream, &routes, &seen);
            }
        });

        StubServer {
            base_url: format!("http://127.0.0.1:{port}/api/v8"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose path starts with `prefix`.
    pub fn hits(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.target.starts_with(prefix))
            .count()
    }

    pub fn hits_by_path(&self) -> HashMap<String, usize> {
        let mut out = HashMap::new();
        for r in self.requests() {
            let path = r.target.split('?').next().unwrap_or_default().to_string();
            *out.entry(path).or_insert(0) += 1;
        }
        out
    }
}

fn handle(stream: TcpStream, routes: &[(String, u16, String)], seen: &Arc<Mutex<Vec<Recorded>>>) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut authorization = None;
    let mut content_type = None;
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            match name.to_ascii_lowercase().as_str() {
                "authorization" => authorization = Some(value.trim().to_string()),
                "content-type" => content_type = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    let path = target.split('?').next().unwrap_or_default().to_string();
    seen.lock().unwrap().push(Recorded {
        method,
        target: target.clone(),
        authorization,
        content_type,
    });

    let (status, body) = routes
        .iter()
        .find(|(prefix, _, _)| path.starts_with(prefix.as_str()))
        .map(|(_, s, b)| (*s, b.clone()))
        .unwrap_or((404, r#"{"error": "not found"}"#.to_string()));
    let reason = if status < 300 { "OK" } else { "Error" };

    let mut stream = stream;
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// Time entries JSON used by several tests.
///
/// Project 1 appears twice, project 2 once, one entry has no project and
/// one is still running.
pub const ENTRIES: &str = r#"[
  {"id": 1, "pid": 1, "description": "design", "duration": 7200, "billable": true, "start": "2024-03-01T09:00:00+02:00"},
  {"id": 2, "pid": 2, "description": "review", "duration": 1800, "billable": false, "start": "2024-03-01T14:00:00+02:00"},
  {"id": 3, "description": "email", "duration": 900, "billable": false, "start": "2024-03-04T08:00:00+02:00"},
  {"id": 4, "pid": 1, "description": "build", "duration": 5400, "billable": true, "start": "2024-03-12T10:00:00+02:00"},
  {"id": 5, "pid": 1, "description": "running", "duration": -1710000000, "billable": true, "start": "2024-03-15T10:00:00+02:00"}
]"#;
