// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Access logging decorator.
//!
//! Emits one `debug` event per access on the `exram::access` target. Enable
//! with a filter such as `exram::access=debug`.

use super::Layer;
use crate::address::Address;
use crate::transport::Transport;

pub struct AccessLogger<U: Transport> {
    upstream: U,
    label: &'static str,
}

impl<U: Transport> AccessLogger<U> {
    pub fn new(upstream: U) -> Self {
        Self::labeled(upstream, "transport")
    }

    /// Tag every event with `label`, to tell apart loggers at different
    /// depths of one stack.
    pub fn labeled(upstream: U, label: &'static str) -> Self {
        Self { upstream, label }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn into_inner(self) -> U {
        self.upstream
    }
}

impl<U: Transport> Transport for AccessLogger<U> {
    fn read(&mut self, dst: &mut [u8], from: Address) {
        tracing::debug!(
            target: "exram::access",
            layer = self.label,
            op = "read",
            address = %from,
            count = dst.len(),
            "transport access"
        );
        self.upstream.read(dst, from);
    }

    fn write(&mut self, to: Address, src: &[u8]) {
        tracing::debug!(
            target: "exram::access",
            layer = self.label,
            op = "write",
            address = %to,
            count = src.len(),
            "transport access"
        );
        self.upstream.write(to, src);
    }
}

impl<U: Transport> Layer for AccessLogger<U> {
    type Upstream = U;

    fn upstream(&self) -> &U {
        &self.upstream
    }

    fn upstream_mut(&mut self) -> &mut U {
        &mut self.upstream
    }
}
