// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Collaborator interfaces injected into the peripheral.

use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::info;

use crate::bluetooth::Endpoint;

/// Delivers encoded packets to every client subscribed to an endpoint.
///
/// Delivery is fire-and-forget: implementations must not block and own any
/// retry or backpressure policy.
pub trait NotificationSink: Send + Sync {
    fn notify_all(&self, endpoint: Endpoint, value: &[u8]);
}

/// Receives human-readable simulator log lines.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

/// Default number of lines kept by a [`LogBuffer`].
pub const DEFAULT_LOG_LINES: usize = 500;

/// Log sink that keeps the most recent lines for display.
///
/// Lines are also forwarded to `tracing`.
#[derive(Debug)]
pub struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Snapshot of the retained lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_LINES)
    }
}

impl LogSink for LogBuffer {
    fn log(&self, line: &str) {
        info!("{}", line);
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.to_string());
    }
}
