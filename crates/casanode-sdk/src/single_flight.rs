//! Single-flight de-duplication of async operations.
//!
//! The first caller spawns the operation and parks a shared handle in the
//! slot; every caller arriving before it finishes awaits that same handle.
//! The operation runs on its own task, so it completes and updates shared
//! state even when every caller has gone away. The slot is emptied when the
//! task ends, whether it returned or panicked.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

type Flight<T> = Shared<BoxFuture<'static, Option<T>>>;

struct Slot<T> {
    generation: u64,
    flight: Option<Flight<T>>,
}

/// Holder of at most one in-flight operation producing `T`.
pub struct SingleFlight<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// An idle holder.
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                flight: None,
            })),
        }
    }

    /// Join the in-flight operation, or start one with `start`.
    ///
    /// `start` is only called when nothing is in flight. Returns `None` if
    /// the operation panicked.
    pub async fn run<F, Fut>(&self, start: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut slot = lock(&self.slot);
            if let Some(flight) = &slot.flight {
                flight.clone()
            } else {
                slot.generation += 1;
                let release = Release {
                    slot: Arc::clone(&self.slot),
                    generation: slot.generation,
                };
                let work = start();
                let task = tokio::spawn(async move {
                    let _release = release;
                    work.await
                });
                let flight = async move { task.await.ok() }.boxed().shared();
                slot.flight = Some(flight.clone());
                flight
            }
        };
        flight.await
    }

    /// Whether an operation is currently running.
    pub fn is_in_flight(&self) -> bool {
        lock(&self.slot).flight.is_some()
    }

    /// Detach the running operation, if any.
    ///
    /// Callers already waiting still get its result; the next [`run`](Self::run)
    /// starts a fresh operation. The detached one keeps running to completion.
    pub fn forget(&self) {
        let mut slot = lock(&self.slot);
        slot.generation += 1;
        slot.flight = None;
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Empties the slot when the spawned task finishes or unwinds.
struct Release<T> {
    slot: Arc<Mutex<Slot<T>>>,
    generation: u64,
}

impl<T> Drop for Release<T> {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        if slot.generation == self.generation {
            slot.flight = None;
        }
    }
}
