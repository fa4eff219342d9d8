/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use sfx_registry::{MetricId, MetricKind};

use super::{ReporterConfig, SfxEndpoint};
use crate::{DetailSet, MetricDetails};

impl SfxEndpoint {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        match v {
            Yaml::Hash(map) => {
                let mut endpoint = SfxEndpoint::default();
                sfx_yaml::foreach_kv(map, |k, v| match sfx_yaml::key::normalize(k).as_str() {
                    "host" => {
                        let host = sfx_yaml::value::as_nonempty_string(v)
                            .context(format!("invalid host value for key {k}"))?;
                        endpoint.set_host(&host);
                        Ok(())
                    }
                    "port" => {
                        let port = sfx_yaml::value::as_u16(v)
                            .context(format!("invalid u16 value for key {k}"))?;
                        endpoint.set_port(port);
                        Ok(())
                    }
                    "path" => {
                        let path = sfx_yaml::value::as_string(v)
                            .context(format!("invalid string value for key {k}"))?;
                        endpoint.set_path(&path)
                    }
                    _ => Err(anyhow!("invalid key {k}")),
                })?;
                Ok(endpoint)
            }
            Yaml::String(s) => SfxEndpoint::from_str(s),
            _ => Err(anyhow!(
                "yaml value type for 'sfx endpoint' should be 'map' or 'string'"
            )),
        }
    }
}

fn as_metric_details(v: &Yaml) -> anyhow::Result<MetricDetails> {
    let s = sfx_yaml::value::as_string(v)?;
    MetricDetails::from_str(&s)
}

fn as_metric_kind(v: &Yaml) -> anyhow::Result<MetricKind> {
    let s = sfx_yaml::value::as_string(v)?;
    match sfx_yaml::key::normalize(&s).as_str() {
        "gauge" => Ok(MetricKind::Gauge),
        "counter" => Ok(MetricKind::Counter),
        "histogram" => Ok(MetricKind::Histogram),
        "meter" => Ok(MetricKind::Meter),
        "timer" => Ok(MetricKind::Timer),
        _ => Err(anyhow!("unknown metric kind {s}")),
    }
}

impl ReporterConfig {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = v {
            let mut config = ReporterConfig::default();
            sfx_yaml::foreach_kv(map, |k, v| config.set_by_yaml_kv(k, v))?;
            config.check()?;
            Ok(config)
        } else {
            Err(anyhow!(
                "yaml value type for 'sfx reporter config' should be 'map'"
            ))
        }
    }

    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match sfx_yaml::key::normalize(k).as_str() {
            "name" => {
                let name = sfx_yaml::value::as_string(v)
                    .context(format!("invalid string value for key {k}"))?;
                self.set_name(&name);
            }
            "auth_token" | "token" => {
                let token = sfx_yaml::value::as_string(v)
                    .context(format!("invalid string value for key {k}"))?;
                self.set_auth_token(&token);
            }
            "source" | "default_source_name" => {
                let source = sfx_yaml::value::as_string(v)
                    .context(format!("invalid string value for key {k}"))?;
                self.set_default_source_name(&source);
            }
            "endpoint" => {
                let endpoint = SfxEndpoint::parse_yaml(v)
                    .context(format!("invalid sfx endpoint value for key {k}"))?;
                self.set_endpoint(endpoint);
            }
            "timeout" => {
                self.timeout = sfx_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
            }
            "emit_interval" => {
                self.emit_interval = sfx_yaml::humanize::as_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
            }
            "max_batch_size" => {
                self.max_batch_size = sfx_yaml::value::as_usize(v)
                    .context(format!("invalid usize value for key {k}"))?;
            }
            "rate_unit" => {
                self.rate_unit = sfx_yaml::humanize::as_nonzero_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
            }
            "duration_unit" => {
                self.duration_unit = sfx_yaml::humanize::as_nonzero_duration(v)
                    .context(format!("invalid humanize duration value for key {k}"))?;
            }
            "details" => {
                let details = sfx_yaml::value::as_list(v, as_metric_details)
                    .context(format!("invalid metric details list value for key {k}"))?;
                self.details = details.into_iter().collect::<DetailSet>();
            }
            "include_prefix" => {
                let prefixes = sfx_yaml::value::as_list(v, sfx_yaml::value::as_string)
                    .context(format!("invalid string list value for key {k}"))?;
                self.include_prefix = prefixes;
            }
            "metadata" => {
                if let Yaml::Array(seq) = v {
                    for (i, v) in seq.iter().enumerate() {
                        self.add_yaml_metadata(v)
                            .context(format!("invalid metadata value for element #{i}"))?;
                    }
                } else {
                    return Err(anyhow!("yaml value type for key {k} should be 'array'"));
                }
            }
            _ => return Err(anyhow!("invalid key {k}")),
        }
        Ok(())
    }

    fn add_yaml_metadata(&mut self, v: &Yaml) -> anyhow::Result<()> {
        let Yaml::Hash(map) = v else {
            return Err(anyhow!("yaml value type for 'metric metadata' should be 'map'"));
        };

        let metric = sfx_yaml::hash_get_required(map, "metric")?;
        let metric = sfx_yaml::value::as_nonempty_string(metric).context("invalid metric name")?;
        let kind = match sfx_yaml::hash_get_optional(map, "kind") {
            Some(v) => as_metric_kind(v)?,
            None => MetricKind::Counter,
        };
        let id = MetricId::new(kind, &metric);

        sfx_yaml::foreach_kv(map, |k, v| match sfx_yaml::key::normalize(k).as_str() {
            "metric" | "kind" => Ok(()),
            "name" => {
                let name = sfx_yaml::value::as_string(v)
                    .context(format!("invalid string value for key {k}"))?;
                self.metadata.set_name(&id, &name);
                Ok(())
            }
            "source" => {
                let source = sfx_yaml::value::as_string(v)
                    .context(format!("invalid string value for key {k}"))?;
                self.metadata.set_source(&id, &source);
                Ok(())
            }
            "tags" | "dimensions" => {
                let tags = sfx_yaml::value::as_metric_tag_map(v)
                    .context(format!("invalid metric tags value for key {k}"))?;
                self.metadata.add_tags(&id, &tags);
                Ok(())
            }
            _ => Err(anyhow!("invalid key {k}")),
        })
    }
}
