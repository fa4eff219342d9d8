/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use http::uri::PathAndQuery;

use sfx_registry::{AllMetrics, MetricFilter, MetricId, MetricRegistry, PrefixFilter};

use crate::transport::{
    AggregateMetricSender, AuthToken, DEFAULT_MAX_BATCH_SIZE, DataPointReceiverFactory,
    HttpDataPointReceiverFactory, OnSendErrorHandler, StaticAuthToken,
};
use crate::{DetailSet, MetricMetadata, Reporter, ReporterHandle, ReportingSession};

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_REPORTER_NAME: &str = "sfx-reporter";
const DEFAULT_INGEST_HOST: &str = "ingest.signalfuse.com";
const DEFAULT_INGEST_PORT: u16 = 80;
const DEFAULT_INGEST_PATH: &str = "/v2/datapoint";

/// Address of the ingest api.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SfxEndpoint {
    host: String,
    port: u16,
    path: PathAndQuery,
}

impl Default for SfxEndpoint {
    fn default() -> Self {
        SfxEndpoint {
            host: DEFAULT_INGEST_HOST.to_string(),
            port: DEFAULT_INGEST_PORT,
            path: PathAndQuery::from_static(DEFAULT_INGEST_PATH),
        }
    }
}

impl SfxEndpoint {
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn path(&self) -> &PathAndQuery {
        &self.path
    }

    /// The host as written in a Host header, with brackets for ipv6.
    pub fn host_header_name(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }

    pub fn set_host(&mut self, host: &str) {
        self.host = host.to_string();
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn set_path(&mut self, path: &str) -> anyhow::Result<()> {
        let path = PathAndQuery::from_str(path).map_err(|e| anyhow!("invalid api path: {e}"))?;
        self.path = path;
        Ok(())
    }
}

impl FromStr for SfxEndpoint {
    type Err = anyhow::Error;

    /// Parse `host[:port]`, ipv6 addresses need brackets when a port is given.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut endpoint = SfxEndpoint::default();
        if s.is_empty() {
            return Err(anyhow!("empty endpoint"));
        }

        if let Some(rest) = s.strip_prefix('[') {
            let Some((host, tail)) = rest.split_once(']') else {
                return Err(anyhow!("unclosed bracket in endpoint {s}"));
            };
            endpoint.set_host(host);
            if let Some(port) = tail.strip_prefix(':') {
                let port = u16::from_str(port).map_err(|e| anyhow!("invalid port {port}: {e}"))?;
                endpoint.set_port(port);
            } else if !tail.is_empty() {
                return Err(anyhow!("invalid endpoint {s}"));
            }
            return Ok(endpoint);
        }

        match s.split_once(':') {
            Some((host, port)) if !port.contains(':') => {
                if host.is_empty() {
                    return Err(anyhow!("empty host in endpoint {s}"));
                }
                let port = u16::from_str(port).map_err(|e| anyhow!("invalid port {port}: {e}"))?;
                endpoint.set_host(host);
                endpoint.set_port(port);
            }
            // bare ipv6 address
            _ => endpoint.set_host(s),
        }
        Ok(endpoint)
    }
}

fn default_source_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Everything needed to assemble a [`Reporter`].
#[derive(Clone)]
pub struct ReporterConfig {
    name: String,
    auth_token: Option<Arc<dyn AuthToken>>,
    default_source_name: String,
    endpoint: SfxEndpoint,
    timeout: Duration,
    emit_interval: Duration,
    max_batch_size: usize,
    rate_unit: Duration,
    duration_unit: Duration,
    details: DetailSet,
    include_prefix: Vec<String>,
    filter: Option<Arc<dyn MetricFilter>>,
    metadata: Arc<MetricMetadata>,
    error_handlers: Vec<Arc<dyn OnSendErrorHandler>>,
    receiver_factory: Option<Arc<dyn DataPointReceiverFactory>>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        ReporterConfig {
            name: DEFAULT_REPORTER_NAME.to_string(),
            auth_token: None,
            default_source_name: default_source_name(),
            endpoint: SfxEndpoint::default(),
            timeout: Duration::from_secs(2),
            emit_interval: Duration::from_secs(10),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            rate_unit: Duration::from_secs(1),
            duration_unit: Duration::from_millis(1),
            details: DetailSet::all(),
            include_prefix: Vec::new(),
            filter: None,
            metadata: Arc::new(MetricMetadata::new()),
            error_handlers: Vec::new(),
            receiver_factory: None,
        }
    }
}

impl ReporterConfig {
    pub fn new(auth_token: &str) -> Self {
        let mut config = ReporterConfig::default();
        config.set_auth_token(auth_token);
        config
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn set_auth_token(&mut self, token: &str) {
        self.auth_token = Some(Arc::new(StaticAuthToken::new(token)));
    }

    pub fn set_auth_token_provider(&mut self, token: Arc<dyn AuthToken>) {
        self.auth_token = Some(token);
    }

    pub fn set_default_source_name(&mut self, name: &str) {
        self.default_source_name = name.to_string();
    }

    pub fn set_endpoint(&mut self, endpoint: SfxEndpoint) {
        self.endpoint = endpoint;
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_emit_interval(&mut self, interval: Duration) {
        self.emit_interval = interval;
    }

    pub fn set_max_batch_size(&mut self, size: usize) {
        self.max_batch_size = size;
    }

    pub fn set_rate_unit(&mut self, unit: Duration) {
        self.rate_unit = unit;
    }

    pub fn set_duration_unit(&mut self, unit: Duration) {
        self.duration_unit = unit;
    }

    pub fn set_details(&mut self, details: DetailSet) {
        self.details = details;
    }

    pub fn add_include_prefix(&mut self, prefix: &str) {
        self.include_prefix.push(prefix.to_string());
    }

    pub fn set_filter(&mut self, filter: Arc<dyn MetricFilter>) {
        self.filter = Some(filter);
    }

    pub fn set_metadata(&mut self, metadata: Arc<MetricMetadata>) {
        self.metadata = metadata;
    }

    pub fn add_error_handler(&mut self, handler: Arc<dyn OnSendErrorHandler>) {
        self.error_handlers.push(handler);
    }

    /// Deliver data points somewhere other than the http ingest api.
    pub fn set_receiver_factory(&mut self, factory: Arc<dyn DataPointReceiverFactory>) {
        self.receiver_factory = Some(factory);
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn default_source_name(&self) -> &str {
        &self.default_source_name
    }

    #[inline]
    pub fn endpoint(&self) -> &SfxEndpoint {
        &self.endpoint
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[inline]
    pub fn emit_interval(&self) -> Duration {
        self.emit_interval
    }

    #[inline]
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    #[inline]
    pub fn rate_unit(&self) -> Duration {
        self.rate_unit
    }

    #[inline]
    pub fn duration_unit(&self) -> Duration {
        self.duration_unit
    }

    #[inline]
    pub fn details(&self) -> DetailSet {
        self.details
    }

    #[inline]
    pub fn include_prefix(&self) -> &[String] {
        &self.include_prefix
    }

    #[inline]
    pub fn metadata(&self) -> &Arc<MetricMetadata> {
        &self.metadata
    }

    pub fn check(&self) -> anyhow::Result<()> {
        let Some(auth_token) = &self.auth_token else {
            return Err(anyhow!("no auth token set"));
        };
        auth_token.token().context("invalid auth token")?;
        if self.default_source_name.is_empty() {
            return Err(anyhow!("empty default source name"));
        }
        sfx_types::MetricTagValue::from_str(&self.default_source_name)
            .map_err(|e| anyhow!("invalid default source name: {e}"))?;
        if self.endpoint.host.is_empty() {
            return Err(anyhow!("empty endpoint host"));
        }
        if self.timeout.is_zero() {
            return Err(anyhow!("timeout should not be zero"));
        }
        if self.emit_interval.is_zero() {
            return Err(anyhow!("emit interval should not be zero"));
        }
        if self.rate_unit.is_zero() {
            return Err(anyhow!("rate unit should not be zero"));
        }
        if self.duration_unit.is_zero() {
            return Err(anyhow!("duration unit should not be zero"));
        }
        if self.max_batch_size == 0 {
            return Err(anyhow!("max batch size should be at least 1"));
        }
        Ok(())
    }

    fn build_filter(&self) -> Arc<dyn MetricFilter> {
        let prefix_filter = if self.include_prefix.is_empty() {
            None
        } else {
            Some(PrefixFilter::new(self.include_prefix.iter().cloned()))
        };
        match (self.filter.clone(), prefix_filter) {
            (Some(filter), Some(prefix)) => {
                Arc::new(move |id: &MetricId| prefix.matches(id) && filter.matches(id))
            }
            (Some(filter), None) => filter,
            (None, Some(prefix)) => Arc::new(prefix),
            (None, None) => Arc::new(AllMetrics),
        }
    }

    pub fn build(&self, registry: Arc<MetricRegistry>) -> anyhow::Result<Reporter> {
        self.check()?;
        let auth_token = self
            .auth_token
            .clone()
            .ok_or_else(|| anyhow!("no auth token set"))?;

        let receiver_factory = match &self.receiver_factory {
            Some(factory) => factory.clone(),
            None => Arc::new(HttpDataPointReceiverFactory::new(
                &self.endpoint,
                self.timeout,
            )),
        };
        let mut sender =
            AggregateMetricSender::new(&self.default_source_name, auth_token, receiver_factory)
                .with_max_batch_size(self.max_batch_size);
        for handler in &self.error_handlers {
            sender = sender.with_error_handler(handler.clone());
        }

        let session = ReportingSession::new(Arc::new(sender))
            .with_details(self.details)
            .with_metadata(self.metadata.clone())
            .with_rate_unit(self.rate_unit)
            .with_duration_unit(self.duration_unit);
        Ok(Reporter::new(
            &self.name,
            registry,
            self.build_filter(),
            session,
        ))
    }

    /// Build the reporter and start reporting every emit interval.
    pub fn spawn(&self, registry: Arc<MetricRegistry>) -> anyhow::Result<ReporterHandle> {
        let reporter = self.build(registry)?;
        Arc::new(reporter)
            .spawn(self.emit_interval)
            .context("failed to spawn reporter thread")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetricDetails;
    use sfx_registry::MetricKind;

    #[test]
    fn endpoint_from_str() {
        let e = SfxEndpoint::from_str("ingest.example.net").unwrap();
        assert_eq!(e.host(), "ingest.example.net");
        assert_eq!(e.port(), 80);
        assert_eq!(e.path().as_str(), "/v2/datapoint");

        let e = SfxEndpoint::from_str("127.0.0.1:8080").unwrap();
        assert_eq!(e.host(), "127.0.0.1");
        assert_eq!(e.port(), 8080);

        let e = SfxEndpoint::from_str("[::1]:8080").unwrap();
        assert_eq!(e.host(), "::1");
        assert_eq!(e.port(), 8080);
        assert_eq!(e.host_header_name(), "[::1]");

        let e = SfxEndpoint::from_str("::1").unwrap();
        assert_eq!(e.host(), "::1");
        assert_eq!(e.port(), 80);

        assert!(SfxEndpoint::from_str("").is_err());
        assert!(SfxEndpoint::from_str(":80").is_err());
        assert!(SfxEndpoint::from_str("host:http").is_err());
        assert!(SfxEndpoint::from_str("[::1").is_err());
        assert!(SfxEndpoint::from_str("[::1]x").is_err());
    }

    #[test]
    fn endpoint_path() {
        let mut e = SfxEndpoint::default();
        e.set_path("/v2/datapoint?orgid=1").unwrap();
        assert_eq!(e.path().as_str(), "/v2/datapoint?orgid=1");
        assert!(e.set_path("/bad path").is_err());
    }

    #[test]
    fn defaults() {
        let config = ReporterConfig::new("token");
        assert_eq!(config.name(), "sfx-reporter");
        assert_eq!(config.endpoint(), &SfxEndpoint::default());
        assert_eq!(config.timeout(), Duration::from_secs(2));
        assert_eq!(config.emit_interval(), Duration::from_secs(10));
        assert_eq!(config.max_batch_size(), 2000);
        assert_eq!(config.rate_unit(), Duration::from_secs(1));
        assert_eq!(config.duration_unit(), Duration::from_millis(1));
        assert_eq!(config.details(), DetailSet::all());
        assert!(!config.default_source_name().is_empty());
        config.check().unwrap();
    }

    #[test]
    fn check_errors() {
        assert!(ReporterConfig::default().check().is_err());
        assert!(ReporterConfig::new("").check().is_err());

        let mut config = ReporterConfig::new("token");
        config.set_default_source_name("");
        assert!(config.check().is_err());
        config.set_default_source_name("host a");
        assert!(config.check().is_err());

        let mut config = ReporterConfig::new("token");
        config.set_timeout(Duration::ZERO);
        assert!(config.check().is_err());

        let mut config = ReporterConfig::new("token");
        config.set_emit_interval(Duration::ZERO);
        assert!(config.check().is_err());

        let mut config = ReporterConfig::new("token");
        config.set_rate_unit(Duration::ZERO);
        assert!(config.check().is_err());

        let mut config = ReporterConfig::new("token");
        config.set_duration_unit(Duration::ZERO);
        assert!(config.check().is_err());

        let mut config = ReporterConfig::new("token");
        config.set_max_batch_size(0);
        assert!(config.check().is_err());
    }

    #[test]
    fn filter() {
        let mut config = ReporterConfig::new("token");
        assert!(config.build_filter().matches(&MetricId::new(MetricKind::Meter, "any")));

        config.add_include_prefix("http.");
        let f = config.build_filter();
        assert!(f.matches(&MetricId::new(MetricKind::Meter, "http.requests")));
        assert!(!f.matches(&MetricId::new(MetricKind::Meter, "db.requests")));

        config.set_filter(Arc::new(|id: &MetricId| id.kind() == MetricKind::Timer));
        let f = config.build_filter();
        assert!(f.matches(&MetricId::new(MetricKind::Timer, "http.latency")));
        assert!(!f.matches(&MetricId::new(MetricKind::Meter, "http.requests")));
        assert!(!f.matches(&MetricId::new(MetricKind::Timer, "db.latency")));
    }

    #[test]
    fn details() {
        let mut config = ReporterConfig::new("token");
        config.set_details([MetricDetails::Mean].into_iter().collect());
        assert_eq!(config.details().len(), 1);
    }
}
