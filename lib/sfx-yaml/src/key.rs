/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

/// Fold a config key, so that `Emit-Interval` and `emit_interval` match.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_lowercase() })
        .collect()
}
