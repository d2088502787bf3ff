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

//! Cancellable self-rescheduling periodic task.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A repeating task running on the tokio timer.
///
/// The first tick runs immediately; after each tick the task asks for the
/// next period, so rate changes take effect at the next reschedule. Ticks
/// run under a gate that [`cancel`](Self::cancel) also takes: once `cancel`
/// returns, no further tick runs.
pub struct PeriodicTask {
    name: &'static str,
    armed: Arc<Mutex<bool>>,
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn a periodic task on the current tokio runtime.
    ///
    /// `period` is evaluated after every tick. `tick` must not block.
    pub fn spawn<P, T>(name: &'static str, mut period: P, mut tick: T) -> Self
    where
        P: FnMut() -> Duration + Send + 'static,
        T: FnMut() + Send + 'static,
    {
        let armed = Arc::new(Mutex::new(true));
        let cancel_token = CancellationToken::new();
        let task_armed = armed.clone();
        let task_token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            debug!("Periodic task '{}' started", name);
            loop {
                {
                    let armed = task_armed.lock();
                    if !*armed {
                        break;
                    }
                    tick();
                }

                let delay = period();
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            debug!("Periodic task '{}' stopped", name);
        });

        Self {
            name,
            armed,
            cancel_token,
            handle,
        }
    }

    /// Stop the task. Waits for an in-flight tick to finish; idempotent.
    pub fn cancel(&self) {
        let mut armed = self.armed.lock();
        if *armed {
            *armed = false;
            debug!("Cancelling periodic task '{}'", self.name);
        }
        self.cancel_token.cancel();
    }

    /// Whether the task will tick again.
    pub fn is_active(&self) -> bool {
        *self.armed.lock() && !self.handle.is_finished()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
