/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod primary;
pub use primary::{as_list, as_nonempty_string, as_string, as_u16, as_usize};

mod metrics;
pub use metrics::as_metric_tag_map;
