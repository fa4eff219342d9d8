/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

#[macro_use]
mod macros;

mod hash;

pub mod humanize;
pub mod key;
pub mod value;

pub use hash::{foreach_kv, get_optional as hash_get_optional, get_required as hash_get_required};

#[doc(hidden)]
pub use yaml_rust;
