/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

fn as_integer<T>(v: &Yaml, type_name: &str) -> anyhow::Result<T>
where
    T: FromStr + TryFrom<i64>,
    <T as FromStr>::Err: Display,
    <T as TryFrom<i64>>::Error: Display,
{
    match v {
        Yaml::Integer(i) => {
            T::try_from(*i).map_err(|e| anyhow!("{type_name} value {i} out of range: {e}"))
        }
        Yaml::String(s) => T::from_str(s).map_err(|e| anyhow!("invalid {type_name} string {s}: {e}")),
        _ => Err(anyhow!(
            "yaml value type for '{type_name}' should be 'string' or 'integer'"
        )),
    }
}

pub fn as_u16(v: &Yaml) -> anyhow::Result<u16> {
    as_integer(v, "u16")
}

pub fn as_usize(v: &Yaml) -> anyhow::Result<usize> {
    as_integer(v, "usize")
}

/// Scalars are all accepted as strings, numbers keep their yaml text.
pub fn as_string(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) | Yaml::Real(s) => Ok(s.clone()),
        Yaml::Integer(i) => Ok(i.to_string()),
        _ => Err(anyhow!(
            "yaml value type for string should be 'string' / 'integer' / 'real'"
        )),
    }
}

pub fn as_nonempty_string(v: &Yaml) -> anyhow::Result<String> {
    let s = as_string(v)?;
    if s.is_empty() {
        Err(anyhow!("empty string value"))
    } else {
        Ok(s)
    }
}

/// Convert a yaml array, or a single value as a one element list.
pub fn as_list<T, F>(v: &Yaml, convert: F) -> anyhow::Result<Vec<T>>
where
    F: Fn(&Yaml) -> anyhow::Result<T>,
{
    match v {
        Yaml::Array(seq) => seq
            .iter()
            .enumerate()
            .map(|(i, v)| convert(v).with_context(|| format!("invalid list element #{i}")))
            .collect(),
        _ => convert(v)
            .map(|node| vec![node])
            .context("invalid single value for the list"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(as_u16(&Yaml::Integer(8080)).unwrap(), 8080);
        assert_eq!(as_u16(&yaml_str!("443")).unwrap(), 443);
        assert!(as_u16(&Yaml::Integer(70000)).is_err());
        assert!(as_u16(&yaml_str!("http")).is_err());

        assert_eq!(as_usize(&Yaml::Integer(2000)).unwrap(), 2000);
        assert!(as_usize(&Yaml::Integer(-1)).is_err());
        assert!(as_usize(&Yaml::Real("1.5".to_string())).is_err());
    }

    #[test]
    fn strings() {
        assert_eq!(as_string(&yaml_str!("web-01")).unwrap(), "web-01");
        assert_eq!(as_string(&Yaml::Integer(42)).unwrap(), "42");
        assert_eq!(as_string(&Yaml::Real("0.5".to_string())).unwrap(), "0.5");
        assert!(as_string(&Yaml::Null).is_err());

        assert!(as_nonempty_string(&yaml_str!("")).is_err());
        assert_eq!(as_nonempty_string(&yaml_str!("a")).unwrap(), "a");
    }

    #[test]
    fn lists() {
        let v = yaml_doc!("[mean, 95th, count]");
        assert_eq!(
            as_list(&v, as_string).unwrap(),
            vec!["mean", "95th", "count"]
        );
        assert_eq!(as_list(&yaml_str!("max"), as_string).unwrap(), vec!["max"]);
        assert!(as_list(&yaml_doc!("[a, {b: c}]"), as_string).is_err());
    }
}
