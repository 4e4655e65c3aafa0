//! The observable camera state cell.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec2, Vec3};

use super::state::{CameraPatch, CameraState};

/// Handle to a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Subscriber = Box<dyn FnMut(&CameraState)>;

struct Inner {
    state: CameraState,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    pending_add: Vec<(SubscriberId, Subscriber)>,
    pending_remove: Vec<SubscriberId>,
    next_id: u64,
    notifying: bool,
    /// Set when a subscriber mutated the state mid-notification; the outer
    /// notification pass re-notifies once with the final state.
    dirty: bool,
}

/// Single source of truth for where the viewport is looking.
///
/// Cloneable handle; the viewport controller is the only writer, everything
/// else subscribes (single-writer/multiple-reader by convention, per the
/// overall concurrency model).
#[derive(Clone)]
pub struct CameraModel {
    inner: Rc<RefCell<Inner>>,
}

impl Default for CameraModel {
    fn default() -> Self {
        Self::new(CameraState::default())
    }
}

impl CameraModel {
    pub fn new(state: CameraState) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state,
                subscribers: Vec::new(),
                pending_add: Vec::new(),
                pending_remove: Vec::new(),
                next_id: 0,
                notifying: false,
                dirty: false,
            })),
        }
    }

    /// Read-only snapshot of the current state.
    pub fn state(&self) -> CameraState {
        self.inner.borrow().state
    }

    /// Shallow-merge the patch, then notify all subscribers exactly once.
    ///
    /// Notification is synchronous: by the time this returns, every
    /// subscriber has observed the merged state.
    pub fn set_state(&self, patch: CameraPatch) {
        if patch.is_empty() {
            return;
        }
        {
            let mut inner = self.inner.borrow_mut();
            inner.state = patch.merge_into(&inner.state);
            if inner.notifying {
                // A subscriber wrote back mid-notification; the outer pass
                // picks this up and re-notifies once.
                inner.dirty = true;
                return;
            }
            inner.notifying = true;
        }
        self.notify_loop();
    }

    pub fn set_position(&self, position: Vec3) {
        self.set_state(CameraPatch::default().position(position));
    }

    pub fn set_true_position(&self, true_position: Vec3) {
        self.set_state(CameraPatch::default().true_position(true_position));
    }

    pub fn set_zoom(&self, zoom: f32) {
        self.set_state(CameraPatch::default().zoom(zoom));
    }

    pub fn set_fov(&self, fov: f32) {
        self.set_state(CameraPatch::default().fov(fov));
    }

    pub fn set_viewport(&self, viewport: Vec2) {
        self.set_state(CameraPatch::default().viewport(viewport));
    }

    /// Register a subscriber, invoked on every state change. No throttling
    /// happens at this layer; subscribers that need rate-limiting do it
    /// themselves.
    pub fn subscribe(&self, subscriber: impl FnMut(&CameraState) + 'static) -> SubscriberId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriberId(inner.next_id);
        inner.next_id += 1;
        if inner.notifying {
            inner.pending_add.push((id, Box::new(subscriber)));
        } else {
            inner.subscribers.push((id, Box::new(subscriber)));
        }
        id
    }

    /// Remove a subscriber. Idempotent; safe from within a notification.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.borrow_mut();
        if inner.notifying {
            inner.pending_remove.push(id);
        } else {
            inner.subscribers.retain(|(sid, _)| *sid != id);
            inner.pending_add.retain(|(sid, _)| *sid != id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let inner = self.inner.borrow();
        inner.subscribers.len() + inner.pending_add.len()
    }

    fn notify_loop(&self) {
        loop {
            let (mut subscribers, snapshot) = {
                let mut inner = self.inner.borrow_mut();
                inner.dirty = false;
                (std::mem::take(&mut inner.subscribers), inner.state)
            };

            for (id, subscriber) in subscribers.iter_mut() {
                if self.inner.borrow().pending_remove.contains(id) {
                    continue;
                }
                subscriber(&snapshot);
            }

            let mut inner = self.inner.borrow_mut();
            let pending_add = std::mem::take(&mut inner.pending_add);
            let pending_remove = std::mem::take(&mut inner.pending_remove);
            subscribers.retain(|(id, _)| !pending_remove.contains(id));
            inner.subscribers = subscribers;
            inner
                .subscribers
                .extend(pending_add.into_iter().filter(|(id, _)| !pending_remove.contains(id)));

            if !inner.dirty {
                inner.notifying = false;
                return;
            }
            // State changed under us; go around once more with the final
            // value so no subscriber is left holding a stale snapshot.
        }
    }
}
