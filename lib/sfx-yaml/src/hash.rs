/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

/// Visit every entry of a map in document order.
///
/// Keys must be strings. Errors returned by `f` get the key as context.
pub fn foreach_kv<F>(table: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    table.iter().try_for_each(|(k, v)| {
        let Yaml::String(key) = k else {
            return Err(anyhow!("map key {k:?} is not a string"));
        };
        f(key, v).with_context(|| format!("invalid value for key {key}"))
    })
}

/// Find the value of a key, comparing normalized key names.
pub fn get_optional<'a>(map: &'a yaml::Hash, k: &str) -> Option<&'a Yaml> {
    map.iter().find_map(|(key, v)| match key {
        Yaml::String(s) if crate::key::normalize(s) == k => Some(v),
        _ => None,
    })
}

pub fn get_required<'a>(map: &'a yaml::Hash, k: &str) -> anyhow::Result<&'a Yaml> {
    get_optional(map, k).ok_or_else(|| anyhow!("required key {k} is missing"))
}
