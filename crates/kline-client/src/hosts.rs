/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Round-robin REST host rotation.
//!
//! The host-rotation counter is the one process-wide mutable state this
//! workspace needs; it lives behind a `Mutex` local to this pool rather than
//! at module-global scope.

use kline_core::types::MarketType;
use std::sync::Mutex;

pub struct HostPool {
    hosts: Vec<&'static str>,
    cursor: Mutex<usize>,
}

impl HostPool {
    /// Builds the pool for a market: primary, then numbered backups, then
    /// the data-only mirror (SPOT only).
    pub fn for_market(market: MarketType) -> Self {
        let caps = market.capabilities();
        let mut hosts = Vec::with_capacity(caps.backup_endpoints.len() + 2);
        hosts.push(caps.primary_endpoint);
        hosts.extend_from_slice(caps.backup_endpoints);
        if let Some(data_only) = caps.data_only_endpoint {
            hosts.push(data_only);
        }
        Self { hosts, cursor: Mutex::new(0) }
    }

    /// Builds a pool from an explicit host list, bypassing the market
    /// capability table. Used by tests to point a client at a mock server.
    pub fn from_hosts(hosts: Vec<&'static str>) -> Self {
        Self { hosts, cursor: Mutex::new(0) }
    }

    /// Returns the next host in rotation order, advancing the cursor.
    /// Rotation is monotonic; no global ordering across callers is
    /// required.
    pub fn next(&self) -> &'static str {
        let mut cursor = self.cursor.lock().expect("host pool cursor mutex poisoned");
        let host = self.hosts[*cursor % self.hosts.len()];
        *cursor = (*cursor + 1) % self.hosts.len();
        host
    }

    pub fn primary(&self) -> &'static str {
        self.hosts[0]
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
