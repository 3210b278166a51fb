// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fixed-latency decorator that stands in for a slow bus.

use std::time::Duration;

use super::Layer;
use crate::address::Address;
use crate::transport::Transport;

pub struct LatencyLayer<U: Transport> {
    upstream: U,
    delay: Duration,
}

impl<U: Transport> LatencyLayer<U> {
    pub fn new(upstream: U, delay: Duration) -> Self {
        Self { upstream, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn wait(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

impl<U: Transport> Transport for LatencyLayer<U> {
    fn read(&mut self, dst: &mut [u8], from: Address) {
        self.wait();
        self.upstream.read(dst, from);
    }

    fn write(&mut self, to: Address, src: &[u8]) {
        self.wait();
        self.upstream.write(to, src);
    }
}

impl<U: Transport> Layer for LatencyLayer<U> {
    type Upstream = U;

    fn upstream(&self) -> &U {
        &self.upstream
    }

    fn upstream_mut(&mut self) -> &mut U {
        &mut self.upstream
    }
}
