/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use yaml_rust::Yaml;

fn parse_duration_str(s: &str) -> anyhow::Result<Duration> {
    if let Ok(secs) = u64::from_str(s) {
        return Ok(Duration::from_secs(secs));
    }
    humanize_rs::duration::parse(s).map_err(|e| anyhow!("invalid humanize duration {s}: {e}"))
}

/// Parse a humanized duration like `1h2m` or `500ms`.
///
/// Plain numbers are taken as seconds.
pub fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(s) => parse_duration_str(s),
        Yaml::Integer(i) => u64::try_from(*i)
            .map(Duration::from_secs)
            .map_err(|_| anyhow!("negative duration {i}")),
        Yaml::Real(s) => {
            let f = f64::from_str(s).map_err(|e| anyhow!("invalid f64 value: {e}"))?;
            Duration::try_from_secs_f64(f).map_err(anyhow::Error::new)
        }
        _ => Err(anyhow!(
            "yaml value type for humanize duration should be 'string' or 'integer' or 'real'"
        )),
    }
}

/// Parse a duration used as a unit or a period, zero is not allowed.
pub fn as_nonzero_duration(v: &Yaml) -> anyhow::Result<Duration> {
    let d = as_duration(v)?;
    if d.is_zero() {
        Err(anyhow!("duration should not be zero"))
    } else {
        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration() {
        assert_eq!(
            as_duration(&yaml_str!("1h2m")).unwrap(),
            Duration::from_secs(3720)
        );
        assert_eq!(
            as_duration(&yaml_str!("250ms")).unwrap(),
            Duration::from_millis(250)
        );
        assert_eq!(
            as_duration(&yaml_str!("30")).unwrap(),
            Duration::from_secs(30)
        );
        assert_eq!(
            as_duration(&Yaml::Integer(10)).unwrap(),
            Duration::from_secs(10)
        );
        assert_eq!(
            as_duration(&Yaml::Real("0.5".to_string())).unwrap(),
            Duration::from_millis(500)
        );

        assert!(as_duration(&yaml_str!("-5m")).is_err());
        assert!(as_duration(&yaml_str!("5x")).is_err());
        assert!(as_duration(&Yaml::Integer(-10)).is_err());
        assert!(as_duration(&Yaml::Boolean(true)).is_err());
    }

    #[test]
    fn nonzero() {
        assert_eq!(
            as_nonzero_duration(&yaml_str!("1s")).unwrap(),
            Duration::from_secs(1)
        );
        assert!(as_nonzero_duration(&Yaml::Integer(0)).is_err());
        assert!(as_nonzero_duration(&yaml_str!("0ms")).is_err());
    }
}
