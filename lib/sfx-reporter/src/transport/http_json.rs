/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::uri::PathAndQuery;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use log::debug;
use serde_json::{Map, Number, Value};

use super::{DataPointReceiver, DataPointReceiverFactory};
use crate::{DataPoint, MetricType, SendError, SfxEndpoint};

const TOKEN_HEADER: HeaderName = HeaderName::from_static("x-sf-token");
const STATUS_LINE_MAX_SIZE: usize = 1024;

struct HttpTarget {
    host: String,
    port: u16,
    addrs: Vec<SocketAddr>,
    api_path: PathAndQuery,
    static_headers: HeaderMap,
    timeout: Duration,
}

/// Post data points as json documents to the ingest api.
///
/// Every batch uses a new plain text connection. The endpoint host is
/// resolved once when the factory is built, so a send is bounded by the
/// timeout. If that lookup fails, every send resolves the host again and
/// the time spent in that lookup is not covered by the timeout.
pub struct HttpDataPointReceiverFactory {
    target: Arc<HttpTarget>,
}

impl HttpDataPointReceiverFactory {
    pub fn new(endpoint: &SfxEndpoint, timeout: Duration) -> Self {
        let host_header = if endpoint.port() == 80 {
            endpoint.host_header_name()
        } else {
            format!("{}:{}", endpoint.host_header_name(), endpoint.port())
        };

        let mut static_headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&host_header) {
            static_headers.insert(header::HOST, v);
        }
        static_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        static_headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
        static_headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(concat!("sfx-reporter/", env!("CARGO_PKG_VERSION"))),
        );

        let addrs = match (endpoint.host(), endpoint.port()).to_socket_addrs() {
            Ok(iter) => iter.collect(),
            Err(e) => {
                debug!(
                    "failed to resolve metrics endpoint {}, will retry on send: {e}",
                    endpoint.host()
                );
                Vec::new()
            }
        };

        HttpDataPointReceiverFactory {
            target: Arc::new(HttpTarget {
                host: endpoint.host().to_string(),
                port: endpoint.port(),
                addrs,
                api_path: endpoint.path().clone(),
                static_headers,
                timeout,
            }),
        }
    }
}

impl DataPointReceiverFactory for HttpDataPointReceiverFactory {
    fn create_receiver(&self) -> Result<Box<dyn DataPointReceiver>, SendError> {
        Ok(Box::new(HttpDataPointReceiver {
            target: self.target.clone(),
        }))
    }
}

struct HttpDataPointReceiver {
    target: Arc<HttpTarget>,
}

impl HttpDataPointReceiver {
    fn remaining(&self, deadline: Instant) -> Result<Duration, SendError> {
        let now = Instant::now();
        if now >= deadline {
            Err(SendError::Timeout(self.target.timeout))
        } else {
            Ok(deadline - now)
        }
    }

    fn map_io_error(&self, e: io::Error) -> SendError {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                SendError::Timeout(self.target.timeout)
            }
            _ => SendError::Io(e),
        }
    }

    fn connect(&self, deadline: Instant) -> Result<TcpStream, SendError> {
        let resolved: Vec<SocketAddr>;
        let addrs = if self.target.addrs.is_empty() {
            resolved = (self.target.host.as_str(), self.target.port)
                .to_socket_addrs()?
                .collect();
            &resolved
        } else {
            &self.target.addrs
        };
        let mut last_error = io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no address resolved for {}", self.target.host),
        );
        for addr in addrs {
            let timeout = self.remaining(deadline)?;
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_error = e,
            }
        }
        Err(self.map_io_error(last_error))
    }

    fn build_request_header(&self, token: &str, body_len: usize) -> Result<Vec<u8>, SendError> {
        let token = HeaderValue::from_str(token)
            .map_err(|_| SendError::AuthToken("invalid char in token".to_string()))?;

        let mut buf = Vec::with_capacity(256);
        let _ = write!(buf, "POST {} HTTP/1.1\r\n", self.target.api_path);
        let mut write_header = |name: &HeaderName, value: &HeaderValue| {
            buf.extend_from_slice(name.as_str().as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        };
        for (name, value) in &self.target.static_headers {
            write_header(name, value);
        }
        write_header(&header::CONTENT_LENGTH, &HeaderValue::from(body_len));
        write_header(&TOKEN_HEADER, &token);
        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }

    fn read_status(
        &self,
        stream: &mut TcpStream,
        deadline: Instant,
    ) -> Result<StatusCode, SendError> {
        let mut buf = vec![0u8; STATUS_LINE_MAX_SIZE];
        let mut len = 0;
        let line_end = loop {
            stream.set_read_timeout(Some(self.remaining(deadline)?))?;
            let nr = stream
                .read(&mut buf[len..])
                .map_err(|e| self.map_io_error(e))?;
            if nr == 0 {
                return Err(SendError::InvalidResponse(
                    "connection closed before status line".to_string(),
                ));
            }
            let offset = len;
            len += nr;
            if let Some(p) = memchr::memchr(b'\n', &buf[offset..len]) {
                break offset + p;
            }
            if len >= buf.len() {
                return Err(SendError::InvalidResponse("status line too long".to_string()));
            }
        };

        parse_status_line(&buf[..line_end])
    }
}

impl DataPointReceiver for HttpDataPointReceiver {
    fn add_data_points(
        &mut self,
        auth_token: &str,
        points: &[DataPoint],
    ) -> Result<(), SendError> {
        let body = encode_body(points)?;
        let header = self.build_request_header(auth_token, body.len())?;

        let deadline = Instant::now() + self.target.timeout;
        let mut stream = self.connect(deadline)?;
        stream.set_write_timeout(Some(self.remaining(deadline)?))?;
        stream
            .write_all(&header)
            .map_err(|e| self.map_io_error(e))?;
        stream.set_write_timeout(Some(self.remaining(deadline)?))?;
        stream.write_all(&body).map_err(|e| self.map_io_error(e))?;

        let status = self.read_status(&mut stream, deadline)?;
        if status.is_success() {
            Ok(())
        } else {
            Err(SendError::Status(status))
        }
    }
}

fn parse_status_line(line: &[u8]) -> Result<StatusCode, SendError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let mut parts = line.split(|c| *c == b' ').filter(|s| !s.is_empty());
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with(b"HTTP/1.") => {
            StatusCode::from_bytes(code)
                .map_err(|e| SendError::InvalidResponse(format!("invalid status code: {e}")))
        }
        _ => Err(SendError::InvalidResponse(format!(
            "invalid status line: {}",
            String::from_utf8_lossy(line)
        ))),
    }
}

fn build_data_point(point: &DataPoint) -> Option<Value> {
    let value = point.value.as_json_number()?;
    let mut map = Map::with_capacity(4);
    map.insert("metric".to_string(), Value::String(point.metric.clone()));
    map.insert("value".to_string(), Value::Number(value));
    let mut dimensions = Map::with_capacity(point.dimensions.len());
    for (name, value) in point.dimensions.iter() {
        dimensions.insert(name.to_string(), Value::String(value.to_string()));
    }
    map.insert("dimensions".to_string(), Value::Object(dimensions));
    map.insert(
        "timestamp".to_string(),
        Value::Number(Number::from(point.timestamp_ms)),
    );
    Some(Value::Object(map))
}

/// Group points by type, dropping the ones without a finite value.
pub(crate) fn encode_body(points: &[DataPoint]) -> Result<Vec<u8>, SendError> {
    let mut gauges = Vec::new();
    let mut counters = Vec::new();
    let mut cumulative_counters = Vec::new();
    for point in points {
        let Some(v) = build_data_point(point) else {
            continue;
        };
        match point.metric_type {
            MetricType::Gauge => gauges.push(v),
            MetricType::Counter => counters.push(v),
            MetricType::CumulativeCounter => cumulative_counters.push(v),
        }
    }

    let mut doc = Map::with_capacity(3);
    for (metric_type, values) in [
        (MetricType::Gauge, gauges),
        (MetricType::Counter, counters),
        (MetricType::CumulativeCounter, cumulative_counters),
    ] {
        if !values.is_empty() {
            doc.insert(metric_type.as_str().to_string(), Value::Array(values));
        }
    }
    Ok(serde_json::to_vec(&Value::Object(doc))?)
}
