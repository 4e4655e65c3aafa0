//! Viewport controller: the single writer of camera state.
//!
//! All camera movement funnels through here - pointer input, zoom buttons,
//! programmatic navigation, resize. The controller keeps a `current` and a
//! `target` set of camera channels; a trailing loop eases `current` toward
//! `target` each frame, and a custom tween can take over both for
//! fixed-duration navigation. Every frame that changes `current` publishes
//! one batched camera update and (when it changed) one transform write to
//! the content layer.
//!
//! Host integration happens through two small traits: [`ContentLayer`]
//! receives css transform strings, [`SurfaceProbe`] reports where the
//! pannable surface sits on the page so pointer coordinates can be made
//! surface-local.

pub mod transform;

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec2, Vec3};

use crate::animation::{Easing, Lerp, Tween};
use crate::camera::{CameraModel, CameraPatch, DualSpacePosition};
use crate::core::{ArchError, Result, ViewportConfig};
use crate::scheduler::{CallbackId, FramePhase, FrameScheduler};
use transform::WorldRect;

/// Sink for the content layer's css transform. Implemented by the embedder;
/// the controller only writes when the string actually changed.
pub trait ContentLayer {
    fn set_transform(&mut self, css: &str);
}

/// Where the pannable surface's top-left corner sits in page coordinates.
///
/// Querying layout is assumed expensive, so the controller caches the
/// result and re-queries only after a resize.
pub trait SurfaceProbe {
    fn origin(&mut self) -> Vec2;
}

/// The channels the trailing loop and navigation tweens interpolate.
/// `position` is the content layer's css translation, `true_position` the
/// render layer's world-unit translation; both always describe the same
/// world point (see [`DualSpacePosition`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraChannels {
    pub position: Vec3,
    pub true_position: Vec3,
    pub zoom: f32,
}

impl Lerp for CameraChannels {
    fn lerp(from: &Self, to: &Self, t: f32) -> Self {
        Self {
            position: Vec3::lerp(from.position, to.position, t),
            true_position: Vec3::lerp(from.true_position, to.true_position, t),
            zoom: f32::lerp(&from.zoom, &to.zoom, t),
        }
    }
}

/// Options for [`ViewportController::move_to`].
#[derive(Debug, Clone, Copy)]
pub struct MoveOptions {
    /// Animate toward the target (`false` jumps instantly).
    pub animated: bool,
    /// Fixed duration in ms; `None` derives one from travel distance.
    pub duration_ms: Option<f32>,
    pub easing: Easing,
    /// Target zoom; `None` keeps the current target zoom.
    pub zoom: Option<f32>,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            animated: true,
            duration_ms: None,
            easing: Easing::default(),
            zoom: None,
        }
    }
}

struct Inner {
    config: ViewportConfig,
    camera: CameraModel,
    scheduler: FrameScheduler,
    content: Rc<RefCell<dyn ContentLayer>>,
    probe: Rc<RefCell<dyn SurfaceProbe>>,
    current: CameraChannels,
    target: CameraChannels,
    viewport: Vec2,
    trailing: Option<CallbackId>,
    custom: Option<Tween<CameraChannels>>,
    /// While set, the trailing loop idles so the tween is the sole driver.
    /// Cleared one frame after completion so the trailing loop never sees a
    /// partially-applied final state.
    is_custom_animating: bool,
    /// Bumped per navigation; a completed navigation's deferred cleanup
    /// only applies while its own generation is still current.
    custom_generation: u64,
    last_transform: String,
    surface_origin: Option<Vec2>,
}

/// Cloneable handle; all clones drive the same viewport.
#[derive(Clone)]
pub struct ViewportController {
    inner: Rc<RefCell<Inner>>,
}

impl ViewportController {
    pub fn new(
        camera: CameraModel,
        scheduler: FrameScheduler,
        content: Rc<RefCell<dyn ContentLayer>>,
        probe: Rc<RefCell<dyn SurfaceProbe>>,
        config: ViewportConfig,
    ) -> Result<Self> {
        config.validate().map_err(ArchError::InvalidConfig)?;
        let state = camera.state();
        let channels = CameraChannels {
            position: state.position,
            true_position: state.true_position,
            zoom: state.zoom.clamp(config.min_zoom, config.max_zoom),
        };
        let viewport = state.viewport;
        let fov = fov_for_height(&config, viewport.y);
        let controller = Self {
            inner: Rc::new(RefCell::new(Inner {
                config,
                camera,
                scheduler,
                content,
                probe,
                current: channels,
                target: channels,
                viewport,
                trailing: None,
                custom: None,
                is_custom_animating: false,
                custom_generation: 0,
                last_transform: String::new(),
                surface_origin: None,
            })),
        };
        // Seed the camera and content layer so every consumer starts from
        // the same published state.
        publish(
            &controller.inner,
            CameraPatch::default().viewport(viewport).fov(fov),
        );
        Ok(controller)
    }

    /// The eased, currently-published channels.
    pub fn current(&self) -> CameraChannels {
        self.inner.borrow().current
    }

    /// Where the camera is heading.
    pub fn target(&self) -> CameraChannels {
        self.inner.borrow().target
    }

    pub fn is_custom_animating(&self) -> bool {
        self.inner.borrow().is_custom_animating
    }

    /// World rectangle the viewport shows for the published channels.
    pub fn visible_world_rect(&self) -> WorldRect {
        let inner = self.inner.borrow();
        transform::visible_world_rect(
            inner.current.position.truncate(),
            inner.current.zoom,
            inner.viewport,
        )
    }

    /// Set the target channels directly. `smooth` eases there through the
    /// trailing loop; otherwise current snaps and publishes immediately.
    pub fn move_to_raw(&self, position: Vec3, true_position: Vec3, zoom: f32, smooth: bool) {
        self.cancel_custom();
        let channels = {
            let inner = self.inner.borrow();
            CameraChannels {
                position,
                true_position,
                zoom: zoom.clamp(inner.config.min_zoom, inner.config.max_zoom),
            }
        };
        if smooth {
            self.inner.borrow_mut().target = channels;
            self.restart_trailing();
        } else {
            {
                let mut inner = self.inner.borrow_mut();
                inner.current = channels;
                inner.target = channels;
            }
            publish(&self.inner, CameraPatch::default());
        }
    }

    /// Drive the camera to the target over a fixed duration with an easing
    /// curve, superseding the trailing loop and any running navigation.
    pub fn move_to_custom(
        &self,
        position: Vec3,
        true_position: Vec3,
        zoom: f32,
        duration_ms: f32,
        easing: Easing,
    ) {
        self.cancel_custom();
        let (scheduler, from, to, generation) = {
            let mut inner = self.inner.borrow_mut();
            inner.custom_generation += 1;
            let generation = inner.custom_generation;
            let zoom = zoom.clamp(inner.config.min_zoom, inner.config.max_zoom);
            // Any trailing chase still in flight is abandoned at its target,
            // so the tween's start point is deterministic.
            inner.current = inner.target;
            let from = inner.current;
            let to = CameraChannels {
                position,
                true_position,
                zoom,
            };
            inner.target = to;
            inner.is_custom_animating = true;
            (inner.scheduler.clone(), from, to, generation)
        };

        let update_rc = Rc::clone(&self.inner);
        let complete_rc = Rc::clone(&self.inner);
        let tween = Tween::new(from, to, duration_ms, easing, move |value| {
            update_rc.borrow_mut().current = *value;
            publish(&update_rc, CameraPatch::default());
        })
        .on_complete(move || {
            let scheduler = {
                let mut inner = complete_rc.borrow_mut();
                inner.current = inner.target;
                inner.scheduler.clone()
            };
            publish(&complete_rc, CameraPatch::default());
            // One-frame grace before the trailing loop may take over again,
            // so input landing this same frame does not fight the snap. A
            // navigation started inside the grace window bumps the
            // generation and this cleanup becomes a no-op.
            let rc = Rc::clone(&complete_rc);
            scheduler.add(move |_| {
                let mut inner = rc.borrow_mut();
                if inner.custom_generation == generation {
                    inner.is_custom_animating = false;
                    inner.custom = None;
                }
                Ok(FramePhase::Detach)
            });
        });
        tween.start(&scheduler);
        self.inner.borrow_mut().custom = Some(tween);
    }

    /// Center a world point in the viewport.
    ///
    /// When no duration is given, one is derived from the travel distance:
    /// `clamp(base + distance_px * per_px, base, max)`. A move already
    /// within the snap distance (and at the target zoom) is a no-op.
    pub fn move_to(&self, world: Vec3, options: MoveOptions) {
        let (channels, duration) = {
            let inner = self.inner.borrow();
            let zoom = options
                .zoom
                .unwrap_or(inner.target.zoom)
                .clamp(inner.config.min_zoom, inner.config.max_zoom);
            let dual = DualSpacePosition::from_world(world, zoom, inner.viewport);
            let channels = CameraChannels {
                position: dual.css,
                true_position: dual.true_space,
                zoom,
            };
            let distance = (channels.position - inner.target.position)
                .truncate()
                .length();
            if distance < inner.config.snap_distance_px
                && (zoom - inner.target.zoom).abs() < inner.config.settle_threshold
            {
                return;
            }
            let duration = options.duration_ms.unwrap_or_else(|| {
                (inner.config.auto_duration_base_ms + distance * inner.config.auto_duration_per_px)
                    .clamp(
                        inner.config.auto_duration_base_ms,
                        inner.config.auto_duration_max_ms,
                    )
            });
            (channels, duration)
        };
        if options.animated {
            self.move_to_custom(
                channels.position,
                channels.true_position,
                channels.zoom,
                duration,
                options.easing,
            );
        } else {
            self.move_to_raw(channels.position, channels.true_position, channels.zoom, false);
        }
    }

    /// Navigate to an island's anchor point. Same mechanics as [`move_to`];
    /// kept separate so call sites read as navigation, not camera math.
    ///
    /// [`move_to`]: Self::move_to
    pub fn move_to_island(&self, anchor: Vec3, options: MoveOptions) {
        self.move_to(anchor, options);
    }

    /// Step the target zoom in by the configured button factor, keeping the
    /// centered world point fixed.
    pub fn zoom_in(&self) {
        let factor = self.inner.borrow().config.button_zoom_factor;
        self.zoom_by_factor(factor);
    }

    /// Inverse of [`zoom_in`], so a press of each returns exactly to the
    /// starting zoom (modulo clamping).
    ///
    /// [`zoom_in`]: Self::zoom_in
    pub fn zoom_out(&self) {
        let factor = self.inner.borrow().config.button_zoom_factor;
        self.zoom_by_factor(1.0 / factor);
    }

    fn zoom_by_factor(&self, factor: f32) {
        self.cancel_custom();
        {
            let mut inner = self.inner.borrow_mut();
            let old_zoom = inner.target.zoom;
            let new_zoom =
                (old_zoom * factor).clamp(inner.config.min_zoom, inner.config.max_zoom);
            if new_zoom == old_zoom {
                return;
            }
            let world = transform::screen_to_world(
                inner.target.position.truncate(),
                old_zoom,
                inner.viewport,
            );
            let dual = DualSpacePosition::from_world(
                world.extend(inner.target.true_position.z),
                new_zoom,
                inner.viewport,
            );
            inner.target = CameraChannels {
                position: dual.css.truncate().extend(inner.target.position.z),
                true_position: dual.true_space,
                zoom: new_zoom,
            };
        }
        self.restart_trailing();
    }

    /// Wheel input: exponential zoom about the cursor, so the world point
    /// under the pointer stays put. `delta` is the wheel's deltaY.
    ///
    /// Ignored while ctrl/cmd is held; that chord belongs to the host's own
    /// page zoom.
    pub fn on_wheel(&self, cursor: Vec2, delta: f32, ctrl_or_cmd: bool) {
        if ctrl_or_cmd {
            return;
        }
        self.cancel_custom();
        let origin = self.surface_origin();
        {
            let mut inner = self.inner.borrow_mut();
            let local = cursor - origin;
            let old_zoom = inner.target.zoom;
            let new_zoom = (old_zoom * (-delta * inner.config.wheel_zoom_step).exp())
                .clamp(inner.config.min_zoom, inner.config.max_zoom);
            if new_zoom == old_zoom {
                return;
            }
            let world = transform::world_under_cursor(
                local,
                inner.target.position.truncate(),
                old_zoom,
                inner.viewport,
            );
            let position =
                transform::position_fixing_cursor(local, world, new_zoom, inner.viewport);
            let dual = DualSpacePosition::from_css(position, new_zoom, inner.viewport);
            inner.target = CameraChannels {
                position: dual.css.truncate().extend(inner.target.position.z),
                true_position: dual
                    .true_space
                    .truncate()
                    .extend(inner.target.true_position.z),
                zoom: new_zoom,
            };
        }
        self.restart_trailing();
    }

    /// Pointer drag: shift the target translation by a screen-space delta.
    pub fn on_drag(&self, delta: Vec2) {
        self.cancel_custom();
        {
            let mut inner = self.inner.borrow_mut();
            let position = inner.target.position.truncate() + delta;
            let dual = DualSpacePosition::from_css(position, inner.target.zoom, inner.viewport);
            inner.target.position = dual.css.truncate().extend(inner.target.position.z);
            inner.target.true_position = dual
                .true_space
                .truncate()
                .extend(inner.target.true_position.z);
        }
        self.restart_trailing();
    }

    /// Viewport resize. The world point centered before the resize stays
    /// centered after it, for both the current and target channels, and the
    /// render layer's fov is rescaled so 3D content keeps its visual size.
    pub fn on_resize(&self, new_viewport: Vec2) {
        let fov = {
            let mut inner = self.inner.borrow_mut();
            let old_viewport = inner.viewport;
            inner.current = recenter(inner.current, old_viewport, new_viewport);
            inner.target = recenter(inner.target, old_viewport, new_viewport);
            inner.viewport = new_viewport;
            // Layout moved; the cached surface origin is stale.
            inner.surface_origin = None;
            fov_for_height(&inner.config, new_viewport.y)
        };
        publish(
            &self.inner,
            CameraPatch::default().viewport(new_viewport).fov(fov),
        );
        if !self.inner.borrow().is_custom_animating {
            self.restart_trailing();
        }
    }

    fn cancel_custom(&self) {
        let tween = {
            let mut inner = self.inner.borrow_mut();
            inner.is_custom_animating = false;
            inner.custom.take()
        };
        if let Some(tween) = tween {
            if tween.is_running() {
                tween.stop();
                // The superseded destination is no longer wanted; hold the
                // camera where the tween left it.
                let mut inner = self.inner.borrow_mut();
                inner.target = inner.current;
            }
        }
    }

    /// Register the trailing loop if it is not already running. Set
    /// semantics: calling this every input event never stacks loops.
    fn restart_trailing(&self) {
        let scheduler = {
            let inner = self.inner.borrow();
            if let Some(id) = inner.trailing {
                if inner.scheduler.contains(id) {
                    return;
                }
            }
            inner.scheduler.clone()
        };
        let rc = Rc::clone(&self.inner);
        let id = scheduler.add(move |_| Ok(trailing_tick(&rc)));
        self.inner.borrow_mut().trailing = Some(id);
    }

    fn surface_origin(&self) -> Vec2 {
        if let Some(origin) = self.inner.borrow().surface_origin {
            return origin;
        }
        let probe = Rc::clone(&self.inner.borrow().probe);
        let origin = probe.borrow_mut().origin();
        self.inner.borrow_mut().surface_origin = Some(origin);
        origin
    }
}

/// Re-derive channels so the same world point stays centered after a
/// viewport size change. The true-space translation depends only on the
/// world point, so it carries over unchanged.
fn recenter(channels: CameraChannels, old_viewport: Vec2, new_viewport: Vec2) -> CameraChannels {
    let world = transform::screen_to_world(
        channels.position.truncate(),
        channels.zoom,
        old_viewport,
    );
    let position = transform::world_to_screen(world, channels.zoom, new_viewport);
    CameraChannels {
        position: position.extend(channels.position.z),
        ..channels
    }
}

fn fov_for_height(config: &ViewportConfig, height: f32) -> f32 {
    2.0 * ((config.base_fov / 2.0).tan() * height / config.initial_viewport.y).atan()
}

fn l1(v: Vec3) -> f32 {
    v.x.abs() + v.y.abs() + v.z.abs()
}

fn transform_string(channels: &CameraChannels) -> String {
    format!(
        "translate3d({:.2}px, {:.2}px, {:.2}px) scale({:.4})",
        channels.position.x, channels.position.y, channels.position.z, channels.zoom
    )
}

/// One frame of the exponential chase toward the target. Snaps and
/// detaches once every channel is within the settle threshold, so a
/// settled camera schedules nothing.
fn trailing_tick(rc: &Rc<RefCell<Inner>>) -> FramePhase {
    let settled = {
        let mut inner = rc.borrow_mut();
        if inner.is_custom_animating {
            return FramePhase::Continue;
        }
        let current = inner.current;
        let target = inner.target;
        let threshold = inner.config.settle_threshold;
        if l1(target.position - current.position) < threshold
            && l1(target.true_position - current.true_position) < threshold
            && (target.zoom - current.zoom).abs() < threshold
        {
            inner.current = target;
            inner.trailing = None;
            true
        } else {
            let factor = inner.config.trailing_factor;
            inner.current = CameraChannels {
                position: current.position + (target.position - current.position) * factor,
                true_position: current.true_position
                    + (target.true_position - current.true_position) * factor,
                zoom: current.zoom + (target.zoom - current.zoom) * factor,
            };
            false
        }
    };
    publish(rc, CameraPatch::default());
    if settled {
        FramePhase::Detach
    } else {
        FramePhase::Continue
    }
}

/// Publish the current channels: one batched camera update, plus a content
/// layer write when the transform string actually changed. Runs with the
/// inner borrow released, since camera subscribers may re-enter the
/// controller.
fn publish(rc: &Rc<RefCell<Inner>>, extra: CameraPatch) {
    let (camera, patch, write, content) = {
        let mut inner = rc.borrow_mut();
        let current = inner.current;
        let patch = extra
            .position(current.position)
            .true_position(current.true_position)
            .zoom(current.zoom);
        let css = transform_string(&current);
        let write = if css != inner.last_transform {
            inner.last_transform = css.clone();
            Some(css)
        } else {
            None
        };
        (
            inner.camera.clone(),
            patch,
            write,
            Rc::clone(&inner.content),
        )
    };
    camera.set_state(patch);
    if let Some(css) = write {
        content.borrow_mut().set_transform(&css);
    }
}
