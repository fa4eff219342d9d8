/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use sfx_types::{MetricTagMap, MetricTagName, MetricTagValue};

/// Parse dimension tags from a yaml map, or from a `k1:v1,k2:v2` string.
pub fn as_metric_tag_map(v: &Yaml) -> anyhow::Result<MetricTagMap> {
    match v {
        Yaml::Hash(map) => {
            let mut tags = MetricTagMap::default();
            crate::foreach_kv(map, |k, v| {
                let name = MetricTagName::from_str(k).context("invalid metric tag name")?;
                let value_s = crate::value::as_string(v).context("invalid metric tag yaml value")?;
                let value = MetricTagValue::from_str(&value_s).context("invalid metric tag value")?;

                if tags.insert(name, value).is_some() {
                    Err(anyhow!("found duplicate value for tag name {k}"))
                } else {
                    Ok(())
                }
            })?;
            Ok(tags)
        }
        Yaml::String(s) => {
            let mut tags = MetricTagMap::default();
            tags.parse_kv_list(s)
                .map_err(|e| anyhow!("invalid metric tag list string: {e}"))?;
            Ok(tags)
        }
        _ => Err(anyhow!(
            "the yaml value type for 'metric tags' should be 'map' or 'string'"
        )),
    }
}
