// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Transport decorators.
//!
//! A layer owns exactly one upstream transport (which may itself be a
//! `&mut` borrow) and forwards every access it does not serve itself. No
//! layer changes the bytes a caller observes, only the access pattern seen
//! upstream.

mod cache;
mod counter;
mod latency;
mod logger;

pub use cache::{CacheLayer, CacheStats};
pub use counter::AccessCounter;
pub use latency::LatencyLayer;
pub use logger::AccessLogger;

use crate::transport::Transport;

/// A transport that wraps another transport.
pub trait Layer: Transport {
    type Upstream: Transport;

    fn upstream(&self) -> &Self::Upstream;

    /// Direct access to the wrapped transport, bypassing this layer.
    fn upstream_mut(&mut self) -> &mut Self::Upstream;
}
