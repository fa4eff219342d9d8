/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use log::warn;

use sfx_registry::{MetricFilter, MetricId, MetricKind, MetricRegistry};

use crate::{CounterDeltaTracker, ReportError, ReportingSession};

/// Periodic reporting of one registry.
///
/// The delta tracker lives behind a lock that is held for the whole
/// flush, so flushes never overlap. A flush that panicked leaves the
/// tracker usable for the next one.
pub struct Reporter {
    name: String,
    registry: Arc<MetricRegistry>,
    filter: Arc<dyn MetricFilter>,
    session: ReportingSession,
    tracker: Mutex<CounterDeltaTracker>,
}

impl Reporter {
    pub fn new(
        name: &str,
        registry: Arc<MetricRegistry>,
        filter: Arc<dyn MetricFilter>,
        session: ReportingSession,
    ) -> Self {
        Reporter {
            name: name.to_string(),
            registry,
            filter,
            session,
            tracker: Mutex::new(CounterDeltaTracker::new()),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    #[inline]
    pub fn session(&self) -> &ReportingSession {
        &self.session
    }

    fn lock_tracker(&self) -> MutexGuard<'_, CounterDeltaTracker> {
        self.tracker.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Report the current registry content once.
    pub fn report(&self) -> Result<(), ReportError> {
        let mut tracker = self.lock_tracker();
        let snapshot = self.registry.snapshot(self.filter.as_ref());
        self.session.flush(&snapshot, &mut *tracker)
    }

    /// Drop the last reported value of a counter, to be called when the
    /// counter is removed from the registry.
    pub fn forget_counter(&self, name: &str) -> bool {
        self.lock_tracker()
            .forget(&MetricId::new(MetricKind::Counter, name))
            .is_some()
    }

    /// Start a thread that reports every `interval`.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> anyhow::Result<ReporterHandle> {
        let quit = Arc::new(AtomicBool::new(false));
        let thread_quit = quit.clone();
        let handle = std::thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let mut quit_seen = false;
                loop {
                    let instant_start = Instant::now();

                    match std::panic::catch_unwind(AssertUnwindSafe(|| self.report())) {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            warn!("reporter {}: failed to report metrics: {e}", self.name)
                        }
                        Err(_) => warn!("reporter {}: panic while reporting metrics", self.name),
                    }

                    if quit_seen {
                        break;
                    }

                    wait_duration(&thread_quit, interval, instant_start);
                    // always report once more after quit is set
                    quit_seen = thread_quit.load(Ordering::Acquire);
                }
            })
            .map_err(|e| anyhow!("failed to spawn thread: {e:?}"))?;
        Ok(ReporterHandle { quit, handle })
    }
}

/// Sleep until `emit_interval` after `instant_start`, or until quit.
fn wait_duration(quit: &AtomicBool, emit_interval: Duration, instant_start: Instant) {
    let Some(instant_next) = instant_start.checked_add(emit_interval) else {
        std::thread::park_timeout(emit_interval);
        return;
    };
    while !quit.load(Ordering::Acquire) {
        let Some(dur) = instant_next.checked_duration_since(Instant::now()) else {
            break;
        };
        if dur.is_zero() {
            break;
        }
        std::thread::park_timeout(dur);
    }
}

pub struct ReporterHandle {
    quit: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ReporterHandle {
    /// Stop the reporting thread after one last report.
    pub fn stop(self) -> std::thread::Result<()> {
        self.quit.store(true, Ordering::Release);
        self.handle.thread().unpark();
        self.handle.join()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
