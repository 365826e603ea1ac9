//! Hull area threshold monitor
//!
//! A background thread that wakes on point-set mutations and reports when
//! the hull area crosses [`AREA_THRESHOLD`] in either direction.
//!
//! ```text
//! ┌────────────┐   snapshot per wake      ┌──────────────────┐
//! │ PointStore │─────────────────────────>│ ThresholdMonitor │──> stdout / tracing / sink
//! └────────────┘ (generation + condvar)   └──────────────────┘
//! ```
//!
//! Hulls are computed outside the store lock. Mutations made while one is
//! being computed are folded into the next snapshot.
//!
//! The latch only changes on a genuine crossing, so repeated mutations on the
//! same side of the threshold stay silent.

use std::io;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::geometry::hull_area;

use super::state::PointStore;

/// Hull area at which the monitor reports
pub const AREA_THRESHOLD: f32 = 100.0;

/// A reported transition across the threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crossing {
    /// Area rose to at least the threshold
    Entered { area: f32 },
    /// Area dropped below the threshold
    Left { area: f32 },
}

impl Crossing {
    /// Console line printed for this crossing
    pub fn message(&self) -> &'static str {
        match self {
            Self::Entered { .. } => "At Least 100 units belongs to CH",
            Self::Left { .. } => "At Least 100 units no longer belongs to CH",
        }
    }

    pub fn area(&self) -> f32 {
        match self {
            Self::Entered { area } | Self::Left { area } => *area,
        }
    }
}

/// Remembers which side of the threshold was last reported
#[derive(Debug, Clone)]
pub struct ThresholdLatch {
    threshold: f32,
    above: bool,
}

impl ThresholdLatch {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            above: false,
        }
    }

    pub fn is_above(&self) -> bool {
        self.above
    }

    /// Feed one area; returns the crossing if the side changed.
    pub fn observe(&mut self, area: f32) -> Option<Crossing> {
        let now_above = area >= self.threshold;
        if now_above == self.above {
            return None;
        }
        self.above = now_above;
        Some(if now_above {
            Crossing::Entered { area }
        } else {
            Crossing::Left { area }
        })
    }
}

/// Background watcher over a [`PointStore`]
pub struct ThresholdMonitor {
    store: Arc<PointStore>,
    latch: ThresholdLatch,
    sink: Option<Sender<Crossing>>,
}

impl ThresholdMonitor {
    pub fn new(store: Arc<PointStore>) -> Self {
        Self::with_threshold(store, AREA_THRESHOLD)
    }

    pub fn with_threshold(store: Arc<PointStore>, threshold: f32) -> Self {
        Self {
            store,
            latch: ThresholdLatch::new(threshold),
            sink: None,
        }
    }

    /// Also forward every crossing to `sink`
    pub fn with_sink(mut self, sink: Sender<Crossing>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach to the store and start the monitor thread
    pub fn spawn(self) -> io::Result<MonitorHandle> {
        let store = Arc::clone(&self.store);
        store.attach_observer();

        let spawned = thread::Builder::new()
            .name("hull-monitor".to_string())
            .spawn(move || self.run());

        match spawned {
            Ok(thread) => Ok(MonitorHandle {
                store,
                thread: Some(thread),
            }),
            Err(e) => {
                store.detach_observer();
                Err(e)
            }
        }
    }

    fn run(mut self) {
        tracing::debug!("[MONITOR] started");
        let mut last_seen = None;
        while let Some(observation) = self.store.wait_observation(last_seen) {
            last_seen = Some(observation.generation);
            let area = hull_area(&observation.points);
            if let Some(crossing) = self.latch.observe(area) {
                self.report(crossing);
            }
        }
        tracing::debug!("[MONITOR] stopped");
    }

    fn report(&mut self, crossing: Crossing) {
        tracing::info!(area = crossing.area(), "{}", crossing.message());
        println!("{}", crossing.message());

        if let Some(sink) = &self.sink {
            // Receiver gone means nobody is listening any more
            if sink.send(crossing).is_err() {
                self.sink = None;
            }
        }
    }
}

/// Owner of a running monitor thread. Stops the monitor when dropped.
pub struct MonitorHandle {
    store: Arc<PointStore>,
    thread: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Detach from the store and wait for the thread to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.store.detach_observer();
            if thread.join().is_err() {
                tracing::error!("[MONITOR] thread panicked");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
