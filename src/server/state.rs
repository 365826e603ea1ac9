//! Shared point store
//!
//! The point set, the per-connection pending counts and the mutation
//! generation live behind ONE `parking_lot::Mutex`. Every read,
//! mutation and hull computation that touches them holds that lock for its
//! full duration, so no reader ever sees a partial update.
//!
//! # Monitor hand-off
//!
//! Every successful mutation bumps a generation counter and signals
//! `changed` while still holding the lock. The monitor waits on the same
//! lock with an explicit "generation moved or detached" predicate, so a
//! mutation can never slip in between its check and its wait. It copies the
//! point set once per wake, not once per mutation; mutations that land while
//! it is busy coalesce into the next snapshot.

use std::collections::HashMap;
use std::fmt;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::Result;
use crate::geometry::{convex_hull, polygon_area, Point};

/// Identity of one client connection, unique for the lifetime of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Result of feeding one point to a connection's pending transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Points this connection still owes
    pub remaining: usize,
    /// Size of the shared point set after the append
    pub total_points: usize,
}

/// Point set as seen by the monitor on one wake
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Mutation count at the time of the snapshot
    pub generation: u64,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Observer {
    /// Set on detach; the latest state is still delivered once
    closing: bool,
}

#[derive(Default)]
struct StoreInner {
    points: Vec<Point>,
    pending: HashMap<ConnectionId, usize>,
    /// Successful mutations so far
    generation: u64,
    /// `Some` while a monitor is attached
    observer: Option<Observer>,
}

/// Shared mutable point set plus per-connection pending counts
#[derive(Default)]
pub struct PointStore {
    inner: Mutex<StoreInner>,
    changed: Condvar,
}

impl PointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful mutation. Must be called with the lock held.
    fn notify(&self, inner: &mut StoreInner) {
        inner.generation += 1;
        if inner.observer.is_some() {
            self.changed.notify_all();
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Clear the point set and expect `expected` points from `id`.
    ///
    /// Returns `false` without touching anything when `expected` is 0.
    pub fn reset(&self, id: ConnectionId, expected: usize) -> bool {
        if expected == 0 {
            return false;
        }

        let mut inner = self.inner.lock();
        inner.points.clear();
        inner.pending.insert(id, expected);
        self.notify(&mut inner);
        true
    }

    /// Append a point. Returns the new size of the point set.
    pub fn add_point(&self, point: Point) -> usize {
        let mut inner = self.inner.lock();
        inner.points.push(point);
        self.notify(&mut inner);
        inner.points.len()
    }

    /// Remove the first exact match of `point`.
    ///
    /// Returns `false` if no point compares equal; nothing is mutated and
    /// the monitor is not woken in that case.
    pub fn remove_point(&self, point: Point) -> bool {
        let mut inner = self.inner.lock();
        match inner.points.iter().position(|p| *p == point) {
            Some(index) => {
                inner.points.remove(index);
                self.notify(&mut inner);
                true
            }
            None => false,
        }
    }

    /// Append a point on behalf of `id`'s pending transfer.
    ///
    /// Returns `None`, adding nothing, when `id` has no points outstanding.
    /// The pending entry is dropped once it reaches zero.
    pub fn consume_pending(&self, id: ConnectionId, point: Point) -> Option<TransferProgress> {
        let mut inner = self.inner.lock();
        let remaining = match inner.pending.get_mut(&id) {
            Some(count) if *count > 0 => {
                *count -= 1;
                *count
            }
            _ => return None,
        };
        if remaining == 0 {
            inner.pending.remove(&id);
        }
        inner.points.push(point);
        self.notify(&mut inner);
        Some(TransferProgress {
            remaining,
            total_points: inner.points.len(),
        })
    }

    /// Drop any pending count held by `id`. Idempotent.
    pub fn forget_connection(&self, id: ConnectionId) {
        self.inner.lock().pending.remove(&id);
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Run `f` against the point set with the store lock held
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[Point]) -> R,
    {
        let guard = self.inner.lock();
        f(&guard.points)
    }

    /// Consistent copy of the point set
    pub fn snapshot(&self) -> Vec<Point> {
        self.read(|points| points.to_vec())
    }

    /// Hull area of the current point set, computed under the store lock.
    ///
    /// Fails with `InsufficientPoints` below 3 points.
    pub fn hull_area(&self) -> Result<f32> {
        self.read(|points| convex_hull(points).map(|hull| polygon_area(&hull)))
    }

    pub fn len(&self) -> usize {
        self.read(|points| points.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Points still owed by `id`; 0 means normal command mode.
    pub fn pending(&self, id: ConnectionId) -> usize {
        self.inner.lock().pending.get(&id).copied().unwrap_or(0)
    }

    /// Number of connections currently mid-transfer
    pub fn pending_connections(&self) -> usize {
        self.inner.lock().pending.len()
    }

    // ========================================================================
    // Monitor hand-off
    // ========================================================================

    /// Number of successful mutations since the store was created
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Let one monitor wait on this store.
    pub fn attach_observer(&self) {
        let mut inner = self.inner.lock();
        inner.observer = Some(Observer::default());
        self.changed.notify_all();
    }

    /// Release the waiting observer once it has seen the latest state.
    pub fn detach_observer(&self) {
        let mut inner = self.inner.lock();
        if let Some(observer) = inner.observer.as_mut() {
            observer.closing = true;
        }
        self.changed.notify_all();
    }

    /// Block until the store has changed since `last_seen` and return a
    /// snapshot of it. `None` as `last_seen` returns the current state at once.
    ///
    /// Returns `None` when no observer is attached, or once it has been
    /// detached and the latest state was already delivered. Spurious wakeups
    /// go back to waiting.
    pub fn wait_observation(&self, last_seen: Option<u64>) -> Option<Observation> {
        let mut inner: MutexGuard<'_, StoreInner> = self.inner.lock();
        loop {
            let observer = inner.observer?;
            if last_seen != Some(inner.generation) {
                return Some(Observation {
                    generation: inner.generation,
                    points: inner.points.clone(),
                });
            }
            if observer.closing {
                inner.observer = None;
                return None;
            }
            self.changed.wait(&mut inner);
        }
    }
}

impl fmt::Debug for PointStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PointStore")
            .field("points", &inner.points.len())
            .field("pending", &inner.pending.len())
            .field("generation", &inner.generation)
            .field("observed", &inner.observer.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
