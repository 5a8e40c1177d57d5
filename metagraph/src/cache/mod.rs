// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Caching of materialized records
//!
//! Records reached repeatedly, within one result or across queries, resolve
//! to a single shared instance through the identity cache.

pub mod identity_cache;

pub use identity_cache::{IdentityCache, IdentityCacheMetric, IdentityCacheStats, RecordKey};
