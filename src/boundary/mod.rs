//! Region lifecycle engine.
//!
//! Regions are circles in world space with two radii: a load radius (mount
//! the region's content) and an active radius (the region is "where the
//! user is", drives routing). The engine subscribes to the camera model,
//! computes the visible world rectangle once per notification, and
//! evaluates every region against it - rectangle versus circle, not center
//! versus circle, so a region entering at a viewport corner loads exactly
//! when it becomes visible.
//!
//! Preload zones sit at `preload_factor x load_radius` and fire one-shot
//! callbacks, giving asset fetches a head start before content mounts.
//!
//! The engine never throttles; it reacts to whatever notification rate the
//! camera produces. Rate-limiting, if wanted, belongs to the embedder.

pub mod intersect;

use std::cell::RefCell;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use glam::Vec3;

use crate::camera::{CameraModel, CameraState, SubscriberId};
use crate::core::{ArchError, RegionId, Result, ViewportConfig};
use crate::viewport::transform;

/// Static description of a region, supplied at registration.
#[derive(Debug, Clone)]
pub struct RegionDescriptor {
    pub id: RegionId,
    /// World-space center of the region's zones.
    pub position: Vec3,
    /// Enclosing region, for hierarchical route labels.
    pub parent: Option<RegionId>,
}

/// The two zone radii of a region, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionBounds {
    pub load_radius: f32,
    pub active_radius: f32,
}

/// Evaluated lifecycle state of one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionState {
    pub is_loaded: bool,
    pub is_active: bool,
    /// Distance from the region center to the viewport's world center.
    /// Used for routing tie-breaks, not for zone tests.
    pub distance_to_camera: f32,
}

impl Default for RegionState {
    fn default() -> Self {
        Self {
            is_loaded: false,
            is_active: false,
            distance_to_camera: f32::INFINITY,
        }
    }
}

/// Handle to a route-change subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteSubscription(u64);

type PreloadCallback = Box<dyn FnOnce()>;
type RouteCallback = Box<dyn FnMut(Option<&RegionDescriptor>)>;

struct RegionEntry {
    descriptor: RegionDescriptor,
    bounds: RegionBounds,
    state: RegionState,
}

struct Inner {
    config: ViewportConfig,
    regions: AHashMap<RegionId, RegionEntry>,
    /// Registration order; evaluation and routing tie-breaks follow it so
    /// results never depend on hash iteration order.
    order: Vec<RegionId>,
    preloaded: AHashSet<RegionId>,
    preload_pending: AHashMap<RegionId, PreloadCallback>,
    route: Option<RegionId>,
    route_subscribers: Vec<(RouteSubscription, RouteCallback)>,
    route_pending_remove: Vec<RouteSubscription>,
    route_notifying: bool,
    next_route_id: u64,
    camera: Option<(CameraModel, SubscriberId)>,
    last_camera: Option<CameraState>,
    evaluating: bool,
    dirty: bool,
}

/// Cloneable handle; all clones share one region table and route.
#[derive(Clone)]
pub struct BoundaryEngine {
    inner: Rc<RefCell<Inner>>,
}

impl BoundaryEngine {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                config,
                regions: AHashMap::new(),
                order: Vec::new(),
                preloaded: AHashSet::new(),
                preload_pending: AHashMap::new(),
                route: None,
                route_subscribers: Vec::new(),
                route_pending_remove: Vec::new(),
                route_notifying: false,
                next_route_id: 0,
                camera: None,
                last_camera: None,
                evaluating: false,
                dirty: false,
            })),
        }
    }

    /// Subscribe to the camera and evaluate immediately against its current
    /// state. Attaching to a second camera replaces the first subscription.
    pub fn attach(&self, camera: &CameraModel) {
        if let Some((old_camera, id)) = self.inner.borrow_mut().camera.take() {
            old_camera.unsubscribe(id);
        }
        let rc = Rc::clone(&self.inner);
        let id = camera.subscribe(move |state| {
            rc.borrow_mut().last_camera = Some(*state);
            evaluate(&rc);
        });
        {
            let mut inner = self.inner.borrow_mut();
            inner.camera = Some((camera.clone(), id));
            inner.last_camera = Some(camera.state());
        }
        evaluate(&self.inner);
    }

    /// Drop the camera subscription. Region states freeze at their last
    /// evaluated values.
    pub fn detach(&self) {
        if let Some((camera, id)) = self.inner.borrow_mut().camera.take() {
            camera.unsubscribe(id);
        }
    }

    /// Register a region and evaluate it against the current camera state
    /// right away, so a region added while already visible loads this call.
    pub fn register_region(&self, descriptor: RegionDescriptor, bounds: RegionBounds) -> Result<()> {
        if bounds.active_radius > bounds.load_radius {
            return Err(ArchError::RegionBounds {
                id: descriptor.id.clone(),
                active: bounds.active_radius,
                load: bounds.load_radius,
            });
        }
        {
            let mut inner = self.inner.borrow_mut();
            let id = descriptor.id.clone();
            let entry = RegionEntry {
                descriptor,
                bounds,
                state: RegionState::default(),
            };
            if inner.regions.insert(id.clone(), entry).is_none() {
                inner.order.push(id);
            }
        }
        evaluate(&self.inner);
        Ok(())
    }

    /// Remove a region and all its preload bookkeeping. If it was the
    /// routed region, routing re-evaluates (possibly to `None`).
    pub fn unregister_region(&self, id: &RegionId) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.regions.remove(id);
            inner.order.retain(|r| r != id);
            inner.preload_pending.remove(id);
            inner.preloaded.remove(id);
        }
        evaluate(&self.inner);
    }

    pub fn get_region_state(&self, id: &RegionId) -> Option<RegionState> {
        self.inner.borrow().regions.get(id).map(|e| e.state)
    }

    pub fn region_count(&self) -> usize {
        self.inner.borrow().regions.len()
    }

    /// Register a one-shot preload callback for a region. Fires as soon as
    /// the camera rect touches the preload zone - immediately, if it
    /// already does.
    pub fn register_preload(&self, id: &RegionId, callback: impl FnOnce() + 'static) -> Result<()> {
        let fire: Option<PreloadCallback> = {
            let mut inner = self.inner.borrow_mut();
            if !inner.regions.contains_key(id) {
                return Err(ArchError::RegionNotFound(id.clone()));
            }
            if inner.preloaded.contains(id) {
                Some(Box::new(callback))
            } else {
                inner.preload_pending.insert(id.clone(), Box::new(callback));
                None
            }
        };
        if let Some(callback) = fire {
            callback();
        }
        Ok(())
    }

    /// Whether the region's preload zone has ever been reached.
    pub fn is_preloaded(&self, id: &RegionId) -> bool {
        self.inner.borrow().preloaded.contains(id)
    }

    /// The closest active region, if any.
    pub fn current_route(&self) -> Option<RegionId> {
        self.inner.borrow().route.clone()
    }

    /// Hierarchical label for the current route: `parent/child` when the
    /// routed region has a parent, the bare id otherwise.
    pub fn route_label(&self) -> Option<String> {
        let inner = self.inner.borrow();
        let id = inner.route.as_ref()?;
        let entry = inner.regions.get(id)?;
        Some(match &entry.descriptor.parent {
            Some(parent) => format!("{parent}/{id}"),
            None => id.to_string(),
        })
    }

    /// Observe route changes. The callback receives the newly routed
    /// region's descriptor, or `None` when no region is active.
    pub fn on_route_change(
        &self,
        callback: impl FnMut(Option<&RegionDescriptor>) + 'static,
    ) -> RouteSubscription {
        let mut inner = self.inner.borrow_mut();
        let id = RouteSubscription(inner.next_route_id);
        inner.next_route_id += 1;
        inner.route_subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a route subscription. Idempotent; safe from within a route
    /// callback.
    pub fn unsubscribe_route(&self, id: RouteSubscription) {
        let mut inner = self.inner.borrow_mut();
        if inner.route_notifying {
            inner.route_pending_remove.push(id);
        } else {
            inner.route_subscribers.retain(|(sid, _)| *sid != id);
        }
    }
}

/// Re-evaluate every region against the last camera snapshot. Re-entrant
/// calls (a route callback registering a region, for instance) set a dirty
/// flag and the outer pass goes around again.
fn evaluate(rc: &Rc<RefCell<Inner>>) {
    {
        let mut inner = rc.borrow_mut();
        if inner.evaluating {
            inner.dirty = true;
            return;
        }
        inner.evaluating = true;
    }
    loop {
        let state = rc.borrow().last_camera;
        if let Some(state) = state {
            let rect = transform::visible_world_rect(
                state.position.truncate(),
                state.zoom,
                state.viewport,
            );
            let center = rect.center();

            let (fires, route_change) = {
                let mut inner = rc.borrow_mut();
                let inner = &mut *inner;
                let preload_factor = inner.config.preload_factor;
                let mut fires: Vec<PreloadCallback> = Vec::new();

                for id in &inner.order {
                    let Some(entry) = inner.regions.get_mut(id) else {
                        continue;
                    };
                    let pos = entry.descriptor.position.truncate();
                    let was = entry.state;
                    let is_loaded =
                        intersect::circle_intersects_rect(pos, entry.bounds.load_radius, &rect);
                    let is_active =
                        intersect::circle_intersects_rect(pos, entry.bounds.active_radius, &rect);
                    entry.state = RegionState {
                        is_loaded,
                        is_active,
                        distance_to_camera: pos.distance(center),
                    };
                    if is_loaded != was.is_loaded {
                        tracing::debug!(region = %id, loaded = is_loaded, "region load state changed");
                    }
                    if is_active != was.is_active {
                        tracing::debug!(region = %id, active = is_active, "region active state changed");
                    }
                    if !inner.preloaded.contains(id)
                        && intersect::circle_intersects_rect(
                            pos,
                            entry.bounds.load_radius * preload_factor,
                            &rect,
                        )
                    {
                        inner.preloaded.insert(id.clone());
                        tracing::debug!(region = %id, "preload zone entered");
                        if let Some(callback) = inner.preload_pending.remove(id) {
                            fires.push(callback);
                        }
                    }
                }

                let mut best: Option<(f32, RegionId)> = None;
                for id in &inner.order {
                    let Some(entry) = inner.regions.get(id) else {
                        continue;
                    };
                    if !entry.state.is_active {
                        continue;
                    }
                    let beats = match &best {
                        Some((d, _)) => entry.state.distance_to_camera < *d,
                        None => true,
                    };
                    if beats {
                        best = Some((entry.state.distance_to_camera, id.clone()));
                    }
                }
                let new_route = best.map(|(_, id)| id);
                let route_change = if new_route != inner.route {
                    tracing::debug!(from = ?inner.route, to = ?new_route, "route changed");
                    inner.route = new_route.clone();
                    let descriptor = new_route
                        .as_ref()
                        .and_then(|id| inner.regions.get(id))
                        .map(|entry| entry.descriptor.clone());
                    Some(descriptor)
                } else {
                    None
                };
                (fires, route_change)
            };

            // Callbacks run with the borrow released; they may re-enter.
            for callback in fires {
                callback();
            }
            if let Some(route) = route_change {
                notify_route(rc, route);
            }
        }

        let mut inner = rc.borrow_mut();
        if inner.dirty {
            inner.dirty = false;
        } else {
            inner.evaluating = false;
            return;
        }
    }
}

fn notify_route(rc: &Rc<RefCell<Inner>>, route: Option<RegionDescriptor>) {
    let mut subscribers = {
        let mut inner = rc.borrow_mut();
        inner.route_notifying = true;
        std::mem::take(&mut inner.route_subscribers)
    };
    for (id, callback) in subscribers.iter_mut() {
        if rc.borrow().route_pending_remove.contains(id) {
            continue;
        }
        callback(route.as_ref());
    }
    let mut inner = rc.borrow_mut();
    inner.route_notifying = false;
    let added = std::mem::take(&mut inner.route_subscribers);
    let removed = std::mem::take(&mut inner.route_pending_remove);
    subscribers.retain(|(id, _)| !removed.contains(id));
    subscribers.extend(added.into_iter().filter(|(id, _)| !removed.contains(id)));
    inner.route_subscribers = subscribers;
}
