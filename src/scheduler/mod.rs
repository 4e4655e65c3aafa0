//! Shared frame ticker.
//!
//! One `FrameScheduler` is constructed at application start and injected
//! into everything that animates (the viewport controller, tween
//! instances). The embedder drives it from the platform's frame callback:
//! call `tick(timestamp_ms)` once per frame while `is_running()` - when
//! nothing is registered the loop can go idle and cost nothing.
//!
//! The scheduler is single-threaded by design; the whole crate runs
//! cooperatively on the UI thread (suspension means deferral to a future
//! frame, never blocking).

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashSet;

use crate::core::Result;

/// Timing information handed to every frame callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Platform timestamp for this frame, in milliseconds.
    pub timestamp_ms: f64,
    /// Time since the previous tick, in milliseconds.
    ///
    /// The first tick after a cold start or a `resume()` reports 0.0 so a
    /// long pause never shows up as one giant delta.
    pub delta_ms: f64,
}

/// What a callback wants the scheduler to do with it after this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Keep the callback registered for the next frame.
    Continue,
    /// Unregister the callback. The idiomatic self-removal path: a settled
    /// trailing loop or a completed tween detaches instead of calling
    /// `remove` on itself mid-tick.
    Detach,
}

/// Handle to a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

type FrameCallback = Box<dyn FnMut(FrameTick) -> Result<FramePhase>>;

struct Inner {
    callbacks: Vec<(CallbackId, FrameCallback)>,
    pending_add: Vec<(CallbackId, FrameCallback)>,
    pending_remove: Vec<CallbackId>,
    /// Ids currently considered registered. Maintained eagerly so
    /// `contains` stays accurate while `callbacks` is checked out mid-tick.
    registered: AHashSet<CallbackId>,
    next_id: u64,
    last_timestamp: Option<f64>,
    paused: bool,
    in_tick: bool,
}

/// Shared, explicitly-injected frame driver.
///
/// Cloning the handle is cheap; all clones refer to the same scheduler.
#[derive(Clone)]
pub struct FrameScheduler {
    inner: Rc<RefCell<Inner>>,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                callbacks: Vec::new(),
                pending_add: Vec::new(),
                pending_remove: Vec::new(),
                registered: AHashSet::new(),
                next_id: 0,
                last_timestamp: None,
                paused: false,
                in_tick: false,
            })),
        }
    }

    /// Register a per-frame callback. Safe to call from inside a tick; the
    /// new callback starts running on the next frame.
    pub fn add<F>(&self, callback: F) -> CallbackId
    where
        F: FnMut(FrameTick) -> Result<FramePhase> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = CallbackId(inner.next_id);
        inner.next_id += 1;
        inner.registered.insert(id);
        if inner.in_tick {
            inner.pending_add.push((id, Box::new(callback)));
        } else {
            inner.callbacks.push((id, Box::new(callback)));
        }
        id
    }

    /// Unregister a callback. Idempotent; safe to call mid-tick (the
    /// removal applies before the callback would run again).
    pub fn remove(&self, id: CallbackId) {
        let mut inner = self.inner.borrow_mut();
        if !inner.registered.remove(&id) {
            return;
        }
        if inner.in_tick {
            inner.pending_remove.push(id);
        } else {
            inner.callbacks.retain(|(cid, _)| *cid != id);
            inner.pending_add.retain(|(cid, _)| *cid != id);
        }
    }

    /// Whether the given callback is currently registered. Callers that
    /// conditionally re-register a persistent loop check this first, so a
    /// repeated "restart" has set semantics.
    pub fn contains(&self, id: CallbackId) -> bool {
        self.inner.borrow().registered.contains(&id)
    }

    /// Number of registered callbacks.
    pub fn callback_count(&self) -> usize {
        self.inner.borrow().registered.len()
    }

    /// True while at least one callback is registered and the scheduler is
    /// not paused. The embedder only needs to request frames while this
    /// holds.
    pub fn is_running(&self) -> bool {
        let inner = self.inner.borrow();
        !inner.paused && !inner.registered.is_empty()
    }

    /// Stop ticking without clearing registrations. Used when the
    /// document/tab is hidden.
    pub fn pause(&self) {
        self.inner.borrow_mut().paused = true;
    }

    /// Resume after a pause. The next tick reports `delta_ms = 0`.
    pub fn resume(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.paused = false;
        inner.last_timestamp = None;
    }

    /// Drive one frame. Callbacks run in registration order; a failing
    /// callback is logged and kept, and never prevents the others from
    /// running this frame or the next.
    pub fn tick(&self, timestamp_ms: f64) {
        let (mut callbacks, tick) = {
            let mut inner = self.inner.borrow_mut();
            if inner.paused || inner.in_tick {
                return;
            }
            let delta_ms = inner
                .last_timestamp
                .map(|last| timestamp_ms - last)
                .unwrap_or(0.0);
            inner.last_timestamp = Some(timestamp_ms);
            inner.in_tick = true;
            (
                std::mem::take(&mut inner.callbacks),
                FrameTick {
                    timestamp_ms,
                    delta_ms,
                },
            )
        };

        let mut retained: Vec<(CallbackId, FrameCallback)> = Vec::with_capacity(callbacks.len());
        for (id, mut callback) in callbacks.drain(..) {
            // Removed from inside an earlier callback this frame.
            if !self.inner.borrow().registered.contains(&id) {
                continue;
            }
            match callback(tick) {
                Ok(FramePhase::Continue) => retained.push((id, callback)),
                Ok(FramePhase::Detach) => {
                    self.inner.borrow_mut().registered.remove(&id);
                }
                Err(e) => {
                    tracing::warn!(callback = id.0, error = %e, "frame callback failed");
                    retained.push((id, callback));
                }
            }
        }

        let mut inner = self.inner.borrow_mut();
        inner.in_tick = false;
        let pending_add = std::mem::take(&mut inner.pending_add);
        let pending_remove = std::mem::take(&mut inner.pending_remove);
        retained.retain(|(id, _)| !pending_remove.contains(id));
        inner.callbacks = retained;
        inner
            .callbacks
            .extend(pending_add.into_iter().filter(|(id, _)| !pending_remove.contains(id)));
    }
}
