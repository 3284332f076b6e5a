//! Shared utilities for integration testing.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::Request;
use request_observability::config::{LogMode, LoggerConfig};
use request_observability::Logger;
use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;

/// In-memory sink that can be read back after the fact.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    /// Every line parsed as a JSON record.
    #[allow(dead_code)]
    pub fn records(&self) -> Vec<Value> {
        self.contents()
            .lines()
            .map(|line| serde_json::from_str(line).expect("file sink writes JSON lines"))
            .collect()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Logger writing to in-memory file and console sinks.
pub struct CapturedLogger {
    pub logger: Arc<Logger>,
    pub file: LogBuffer,
    #[allow(dead_code)]
    pub console: LogBuffer,
}

pub fn capture_logger(mode: LogMode) -> CapturedLogger {
    let file = LogBuffer::default();
    let console = LogBuffer::default();
    let config = LoggerConfig {
        mode,
        console_ansi: false,
        ..LoggerConfig::default()
    };

    let logger = Logger::from_writers(&config, file.clone(), Some(console.clone()))
        .expect("default level parses");

    CapturedLogger {
        logger: Arc::new(logger),
        file,
        console,
    }
}

/// GET request arriving from `peer`.
#[allow(dead_code)]
pub fn get_from(uri: &str, peer: [u8; 4]) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .extension(ConnectInfo(SocketAddr::from((peer, 51000))))
        .body(Body::empty())
        .unwrap()
}
