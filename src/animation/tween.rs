//! Tween engine: eased interpolation of a value over a fixed duration.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec2, Vec3};

use super::easing::Easing;
use crate::scheduler::{CallbackId, FramePhase, FrameScheduler, FrameTick};

/// Values a tween can interpolate. Multi-channel values implement this
/// field-wise.
pub trait Lerp: Clone {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        from + (to - from) * t
    }
}

impl Lerp for Vec2 {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        Vec2::lerp(*from, *to, t)
    }
}

impl Lerp for Vec3 {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        Vec3::lerp(*from, *to, t)
    }
}

/// Lifecycle of a tween instance.
///
/// Modeled as an explicit state machine so that re-entrant cancellation
/// (stopping from inside `on_complete`, superseding mid-flight) is a
/// structural property instead of ad-hoc flag checks.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TweenState {
    Idle,
    Running { started_at: Option<f64> },
    Completing,
}

struct TweenInner<V> {
    from: V,
    to: V,
    duration_ms: f32,
    easing: Easing,
    on_update: Option<Box<dyn FnMut(&V)>>,
    on_complete: Option<Box<dyn FnMut()>>,
    state: TweenState,
    callback: Option<CallbackId>,
    scheduler: Option<FrameScheduler>,
}

/// A time-boxed animation of one [`Lerp`] value.
///
/// Each instance owns its own scheduler registration and state; any number
/// of tweens run concurrently without shared mutable state.
pub struct Tween<V: Lerp + 'static> {
    inner: Rc<RefCell<TweenInner<V>>>,
}

impl<V: Lerp + 'static> Clone for Tween<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Lerp + 'static> Tween<V> {
    pub fn new(
        from: V,
        to: V,
        duration_ms: f32,
        easing: Easing,
        on_update: impl FnMut(&V) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TweenInner {
                from,
                to,
                duration_ms,
                easing,
                on_update: Some(Box::new(on_update)),
                on_complete: None,
                state: TweenState::Idle,
                callback: None,
                scheduler: None,
            })),
        }
    }

    /// Attach a completion callback. Invoked exactly once per completed
    /// run, after the final `on_update` with the exact `to` value.
    pub fn on_complete(self, callback: impl FnMut() + 'static) -> Self {
        self.inner.borrow_mut().on_complete = Some(Box::new(callback));
        self
    }

    /// Register with the scheduler and begin interpolating on the next
    /// tick. Starting an already-running tween restarts it.
    pub fn start(&self, scheduler: &FrameScheduler) {
        if self.is_running() {
            self.stop();
        }
        let id = {
            let inner = Rc::clone(&self.inner);
            scheduler.add(move |tick| Ok(Self::step(&inner, tick)))
        };
        let mut inner = self.inner.borrow_mut();
        inner.state = TweenState::Running { started_at: None };
        inner.callback = Some(id);
        inner.scheduler = Some(scheduler.clone());
    }

    /// Unregister without completing. Idempotent, and safe to call from
    /// within this tween's own `on_complete`.
    pub fn stop(&self) {
        let removal = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == TweenState::Idle {
                return;
            }
            inner.state = TweenState::Idle;
            inner
                .callback
                .take()
                .and_then(|id| inner.scheduler.clone().map(|s| (s, id)))
        };
        if let Some((scheduler, id)) = removal {
            scheduler.remove(id);
        }
    }

    /// Stop, then start again from `from` with a fresh start time.
    pub fn restart(&self, scheduler: &FrameScheduler) {
        self.stop();
        self.start(scheduler);
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.inner.borrow().state, TweenState::Idle)
    }

    fn step(inner: &Rc<RefCell<TweenInner<V>>>, tick: FrameTick) -> FramePhase {
        let (value, finished) = {
            let mut b = inner.borrow_mut();
            let started_at = match &mut b.state {
                TweenState::Running { started_at } => *started_at.get_or_insert(tick.timestamp_ms),
                // Stopped since this frame was scheduled.
                _ => return FramePhase::Detach,
            };
            let progress = if b.duration_ms <= 0.0 {
                1.0
            } else {
                (((tick.timestamp_ms - started_at) as f32) / b.duration_ms).clamp(0.0, 1.0)
            };
            let finished = progress >= 1.0;
            let value = if finished {
                // Exact target on the final frame: no residual float drift.
                b.to.clone()
            } else {
                V::lerp(&b.from, &b.to, b.easing.apply(progress))
            };
            if finished {
                b.state = TweenState::Completing;
            }
            (value, finished)
        };

        // Callbacks run outside the borrow so they may call stop()/start()
        // on this same tween. The take() result must be bound before the
        // `if let`, or the RefMut lives for the whole body.
        let taken = inner.borrow_mut().on_update.take();
        if let Some(mut on_update) = taken {
            on_update(&value);
            inner.borrow_mut().on_update = Some(on_update);
        }

        if finished {
            let taken = {
                let mut b = inner.borrow_mut();
                // A stop() from inside the final on_update already returned
                // to Idle; that run was cancelled, not completed.
                if b.state == TweenState::Completing {
                    b.on_complete.take()
                } else {
                    None
                }
            };
            if let Some(mut on_complete) = taken {
                on_complete();
                inner.borrow_mut().on_complete = Some(on_complete);
            }
            let mut b = inner.borrow_mut();
            // A re-entrant start() from on_complete leaves the new run
            // untouched; only a plain completion returns to Idle.
            if b.state == TweenState::Completing {
                b.state = TweenState::Idle;
                b.callback = None;
            }
            return FramePhase::Detach;
        }
        FramePhase::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn drive(scheduler: &FrameScheduler, from_ms: f64, to_ms: f64, step_ms: f64) {
        let mut t = from_ms;
        while t <= to_ms {
            scheduler.tick(t);
            t += step_ms;
        }
    }

    #[test]
    fn test_scalar_tween_reaches_exact_target() {
        let scheduler = FrameScheduler::new();
        let value = Rc::new(Cell::new(0.0f32));
        let completed = Rc::new(Cell::new(false));

        let v = Rc::clone(&value);
        let c = Rc::clone(&completed);
        let tween = Tween::new(0.0f32, 123.456, 100.0, Easing::CubicInOut, move |x| {
            v.set(*x)
        })
        .on_complete(move || c.set(true));
        tween.start(&scheduler);

        drive(&scheduler, 0.0, 200.0, 16.0);

        assert!(completed.get());
        // Bit-exact, not approximately equal.
        assert_eq!(value.get(), 123.456);
        assert!(!tween.is_running());
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_vector_tween_interpolates() {
        let scheduler = FrameScheduler::new();
        let value = Rc::new(Cell::new(Vec2::ZERO));

        let v = Rc::clone(&value);
        let tween = Tween::new(
            Vec2::ZERO,
            Vec2::new(100.0, -50.0),
            100.0,
            Easing::Linear,
            move |x| v.set(*x),
        );
        tween.start(&scheduler);

        scheduler.tick(0.0); // records start time
        scheduler.tick(50.0); // halfway
        let mid = value.get();
        assert!((mid.x - 50.0).abs() < 1.0);
        assert!((mid.y + 25.0).abs() < 1.0);
    }

    #[test]
    fn test_on_complete_fires_exactly_once() {
        let scheduler = FrameScheduler::new();
        let count = Rc::new(Cell::new(0u32));

        let c = Rc::clone(&count);
        let tween =
            Tween::new(0.0f32, 1.0, 50.0, Easing::Linear, |_| {}).on_complete(move || {
                c.set(c.get() + 1)
            });
        tween.start(&scheduler);

        drive(&scheduler, 0.0, 300.0, 16.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let scheduler = FrameScheduler::new();
        let tween = Tween::new(0.0f32, 1.0, 100.0, Easing::Linear, |_| {});
        tween.start(&scheduler);
        scheduler.tick(0.0);

        tween.stop();
        tween.stop();
        assert!(!tween.is_running());
        assert_eq!(scheduler.callback_count(), 0);
    }

    #[test]
    fn test_stop_from_within_on_complete() {
        let scheduler = FrameScheduler::new();
        let completions = Rc::new(Cell::new(0u32));

        let tween = Tween::new(0.0f32, 1.0, 50.0, Easing::Linear, |_| {});
        let handle = tween.clone();
        let c = Rc::clone(&completions);
        let tween = tween.on_complete(move || {
            c.set(c.get() + 1);
            handle.stop(); // must not panic or double-complete
        });
        tween.start(&scheduler);

        drive(&scheduler, 0.0, 300.0, 16.0);
        assert_eq!(completions.get(), 1);
        assert!(!tween.is_running());
    }

    #[test]
    fn test_on_update_may_reenter_tween() {
        let scheduler = FrameScheduler::new();
        let running_seen = Rc::new(Cell::new(false));

        // Querying the tween from inside its own on_update must not
        // conflict with the borrow held while stepping.
        let slot: Rc<RefCell<Option<Tween<f32>>>> = Rc::new(RefCell::new(None));
        let s = Rc::clone(&slot);
        let r = Rc::clone(&running_seen);
        let tween = Tween::new(0.0f32, 1.0, 100.0, Easing::Linear, move |_| {
            if let Some(t) = &*s.borrow() {
                r.set(t.is_running());
            }
        });
        *slot.borrow_mut() = Some(tween.clone());
        tween.start(&scheduler);

        scheduler.tick(0.0);
        assert!(running_seen.get());
    }

    #[test]
    fn test_stop_from_final_on_update_suppresses_on_complete() {
        let scheduler = FrameScheduler::new();
        let completed = Rc::new(Cell::new(false));

        let slot: Rc<RefCell<Option<Tween<f32>>>> = Rc::new(RefCell::new(None));
        let s = Rc::clone(&slot);
        let tween = Tween::new(0.0f32, 1.0, 50.0, Easing::Linear, move |value| {
            // Cancel on the very frame that would complete.
            if *value >= 1.0 {
                if let Some(t) = &*s.borrow() {
                    t.stop();
                }
            }
        });
        let c = Rc::clone(&completed);
        let tween = tween.on_complete(move || c.set(true));
        *slot.borrow_mut() = Some(tween.clone());
        tween.start(&scheduler);

        drive(&scheduler, 0.0, 300.0, 16.0);
        assert!(!completed.get());
        assert!(!tween.is_running());
        assert_eq!(scheduler.callback_count(), 0);
    }

    #[test]
    fn test_stop_prevents_completion() {
        let scheduler = FrameScheduler::new();
        let completed = Rc::new(Cell::new(false));

        let c = Rc::clone(&completed);
        let tween = Tween::new(0.0f32, 1.0, 100.0, Easing::Linear, |_| {})
            .on_complete(move || c.set(true));
        tween.start(&scheduler);
        scheduler.tick(0.0);
        tween.stop();
        drive(&scheduler, 16.0, 300.0, 16.0);

        assert!(!completed.get());
    }

    #[test]
    fn test_restart_resets_progress() {
        let scheduler = FrameScheduler::new();
        let value = Rc::new(Cell::new(0.0f32));

        let v = Rc::clone(&value);
        let tween = Tween::new(0.0f32, 100.0, 100.0, Easing::Linear, move |x| v.set(*x));
        tween.start(&scheduler);
        scheduler.tick(0.0);
        scheduler.tick(80.0); // near the end

        tween.restart(&scheduler);
        scheduler.tick(100.0); // new start time recorded here
        scheduler.tick(110.0); // 10% through the restarted run
        assert!(value.get() < 20.0, "got {}", value.get());
    }

    #[test]
    fn test_concurrent_tweens_are_independent() {
        let scheduler = FrameScheduler::new();
        let a = Rc::new(Cell::new(0.0f32));
        let b = Rc::new(Cell::new(0.0f32));

        let av = Rc::clone(&a);
        let bv = Rc::clone(&b);
        let ta = Tween::new(0.0f32, 10.0, 50.0, Easing::Linear, move |x| av.set(*x));
        let tb = Tween::new(0.0f32, 10.0, 500.0, Easing::Linear, move |x| bv.set(*x));
        ta.start(&scheduler);
        tb.start(&scheduler);

        drive(&scheduler, 0.0, 100.0, 16.0);
        assert_eq!(a.get(), 10.0); // short tween done
        assert!(b.get() < 5.0); // long tween still going
        assert!(tb.is_running());
    }

    #[test]
    fn test_zero_duration_completes_first_tick() {
        let scheduler = FrameScheduler::new();
        let value = Rc::new(Cell::new(0.0f32));

        let v = Rc::clone(&value);
        let tween = Tween::new(0.0f32, 42.0, 0.0, Easing::Linear, move |x| v.set(*x));
        tween.start(&scheduler);
        scheduler.tick(0.0);

        assert_eq!(value.get(), 42.0);
        assert!(!tween.is_running());
    }
}
