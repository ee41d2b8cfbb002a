//! Scripted executor and log capture for operation tests

use async_trait::async_trait;
use chnode_core::{ClickHouseResponse, Credentials, HeaderMap, Protocol, Redactor, Result};
use chnode_transport::{ClickHouseClient, HttpExecutor, HttpRequest};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::format::FmtSpan;

/// Answers requests from a queue and records what it was sent
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<ClickHouseResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedExecutor {
    pub fn new(responses: impl IntoIterator<Item = ClickHouseResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Bodies of every recorded request as text
    pub fn bodies(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| String::from_utf8_lossy(&request.body).into_owned())
            .collect()
    }
}

#[async_trait]
impl HttpExecutor for ScriptedExecutor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn execute(
        &self,
        request: &HttpRequest,
        _redactor: &Redactor,
    ) -> Result<ClickHouseResponse> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        Ok(self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or_else(|| ok(String::new())))
    }
}

pub fn ok(body: impl Into<String>) -> ClickHouseResponse {
    ClickHouseResponse::new(200, HeaderMap::new(), body)
}

pub fn ok_with_headers(body: impl Into<String>, headers: &[(&str, &str)]) -> ClickHouseResponse {
    let headers = headers
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    ClickHouseResponse::new(200, headers, body)
}

/// A `FORMAT JSON` body holding `rows`
pub fn json_page(rows: serde_json::Value) -> ClickHouseResponse {
    ok(serde_json::json!({
        "meta": [{"name": "id", "type": "UInt64"}],
        "data": rows,
        "statistics": {"elapsed": 0.001},
    })
    .to_string())
}

pub fn credentials() -> Credentials {
    Credentials::new(Protocol::Http, "localhost", "alice", "hunter2")
        .with_default_database("default")
}

pub fn client(executor: &Arc<ScriptedExecutor>) -> ClickHouseClient {
    ClickHouseClient::with_executor(credentials(), executor.clone())
}

/// Formatted tracing output collected in memory
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture every event and span close on this thread until the guard drops
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}
