//! End-to-end tests of the boundary engine reacting to camera movement
//! driven by the viewport controller.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::{Vec2, Vec3};

use archipelago::animation::Easing;
use archipelago::boundary::{BoundaryEngine, RegionBounds, RegionDescriptor};
use archipelago::camera::{CameraModel, CameraState};
use archipelago::core::{RegionId, ViewportConfig};
use archipelago::scheduler::FrameScheduler;
use archipelago::viewport::{
    transform, ContentLayer, MoveOptions, SurfaceProbe, ViewportController,
};

struct NullLayer;

impl ContentLayer for NullLayer {
    fn set_transform(&mut self, _css: &str) {}
}

struct StaticProbe;

impl SurfaceProbe for StaticProbe {
    fn origin(&mut self) -> Vec2 {
        Vec2::ZERO
    }
}

struct World {
    controller: ViewportController,
    scheduler: FrameScheduler,
    engine: BoundaryEngine,
}

/// Full stack with a 1000x800 viewport centered on the world origin.
fn setup() -> World {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let viewport = Vec2::new(1000.0, 800.0);
    let camera = CameraModel::new(CameraState {
        position: transform::world_to_screen(Vec2::ZERO, 1.0, viewport).extend(0.0),
        true_position: Vec3::ZERO,
        zoom: 1.0,
        viewport,
        ..CameraState::default()
    });
    let scheduler = FrameScheduler::new();
    let controller = ViewportController::new(
        camera.clone(),
        scheduler.clone(),
        Rc::new(RefCell::new(NullLayer)),
        Rc::new(RefCell::new(StaticProbe)),
        ViewportConfig::default(),
    )
    .unwrap();
    let engine = BoundaryEngine::new(ViewportConfig::default());
    engine.attach(&camera);
    World {
        controller,
        scheduler,
        engine,
    }
}

fn drive(scheduler: &FrameScheduler, from_ms: f64, to_ms: f64, step_ms: f64) {
    let mut t = from_ms;
    while t <= to_ms {
        scheduler.tick(t);
        t += step_ms;
    }
}

fn region(id: &str, x: f32) -> RegionDescriptor {
    RegionDescriptor {
        id: RegionId::from(id),
        position: Vec3::new(x, 0.0, 0.0),
        parent: None,
    }
}

#[test]
fn test_instant_jump_flips_region_lifecycle() {
    let w = setup();
    w.engine
        .register_region(
            region("home", 0.0),
            RegionBounds {
                load_radius: 1200.0,
                active_radius: 900.0,
            },
        )
        .unwrap();
    w.engine
        .register_region(
            region("projects", 5000.0),
            RegionBounds {
                load_radius: 1500.0,
                active_radius: 1200.0,
            },
        )
        .unwrap();

    let home = RegionId::from("home");
    let projects = RegionId::from("projects");
    assert!(w.engine.get_region_state(&home).unwrap().is_active);
    assert!(!w.engine.get_region_state(&projects).unwrap().is_loaded);
    assert_eq!(w.engine.current_route(), Some(home.clone()));

    w.controller.move_to(
        Vec3::new(5000.0, 0.0, 0.0),
        MoveOptions {
            animated: false,
            zoom: Some(1.0),
            ..Default::default()
        },
    );

    // No frames needed: the instant publish already reached the engine.
    assert!(!w.engine.get_region_state(&home).unwrap().is_loaded);
    let state = w.engine.get_region_state(&projects).unwrap();
    assert!(state.is_loaded && state.is_active);
    assert_eq!(w.engine.current_route(), Some(projects));
}

#[test]
fn test_animated_crossing_changes_route_exactly_once() {
    let w = setup();
    // Active zones overlap across the middle, so there is never a
    // no-man's-land and the route flips in a single step.
    let bounds = RegionBounds {
        load_radius: 2700.0,
        active_radius: 2600.0,
    };
    w.engine.register_region(region("a", 0.0), bounds).unwrap();
    w.engine.register_region(region("b", 5000.0), bounds).unwrap();
    assert_eq!(w.engine.current_route(), Some(RegionId::from("a")));

    let changes = Rc::new(RefCell::new(Vec::new()));
    let c = Rc::clone(&changes);
    w.engine
        .on_route_change(move |route| c.borrow_mut().push(route.map(|r| r.id.clone())));

    w.controller.move_to(
        Vec3::new(5000.0, 0.0, 0.0),
        MoveOptions {
            duration_ms: Some(800.0),
            easing: Easing::Linear,
            zoom: Some(1.0),
            ..Default::default()
        },
    );
    drive(&w.scheduler, 0.0, 1600.0, 16.0);

    assert_eq!(*changes.borrow(), vec![Some(RegionId::from("b"))]);
    assert_eq!(w.engine.current_route(), Some(RegionId::from("b")));
}

#[test]
fn test_preload_fires_once_during_travel() {
    let w = setup();
    // Load 1000 gives a preload zone of 2000 around x = 5000, reached well
    // before the region itself loads.
    w.engine
        .register_region(
            region("projects", 5000.0),
            RegionBounds {
                load_radius: 1000.0,
                active_radius: 800.0,
            },
        )
        .unwrap();

    let projects = RegionId::from("projects");
    let fired = Rc::new(Cell::new(0u32));
    let f = Rc::clone(&fired);
    w.engine
        .register_preload(&projects, move || f.set(f.get() + 1))
        .unwrap();
    assert_eq!(fired.get(), 0);

    w.controller.move_to(
        Vec3::new(5000.0, 0.0, 0.0),
        MoveOptions {
            duration_ms: Some(800.0),
            easing: Easing::CubicInOut,
            zoom: Some(1.0),
            ..Default::default()
        },
    );
    drive(&w.scheduler, 0.0, 1600.0, 16.0);

    assert_eq!(fired.get(), 1);
    assert!(w.engine.is_preloaded(&projects));
    assert!(w.engine.get_region_state(&projects).unwrap().is_loaded);

    // Leaving and returning does not re-fire a one-shot preload.
    w.controller.move_to(
        Vec3::ZERO,
        MoveOptions {
            animated: false,
            ..Default::default()
        },
    );
    w.controller.move_to(
        Vec3::new(5000.0, 0.0, 0.0),
        MoveOptions {
            animated: false,
            ..Default::default()
        },
    );
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_route_label_reflects_section_hierarchy() {
    let w = setup();
    w.engine
        .register_region(
            RegionDescriptor {
                id: RegionId::from("gallery"),
                position: Vec3::new(5000.0, 0.0, 0.0),
                parent: Some(RegionId::from("projects-island")),
            },
            RegionBounds {
                load_radius: 1500.0,
                active_radius: 1200.0,
            },
        )
        .unwrap();
    assert_eq!(w.engine.route_label(), None);

    w.controller.move_to(
        Vec3::new(5000.0, 0.0, 0.0),
        MoveOptions {
            animated: false,
            ..Default::default()
        },
    );
    assert_eq!(
        w.engine.route_label().as_deref(),
        Some("projects-island/gallery")
    );
}

#[test]
fn test_zoom_out_widens_rect_and_loads_more_regions() {
    let w = setup();
    // Out of reach at zoom 1 (rect half-width 500, gap 2500 - 500 > 1500),
    // in reach once zoomed out far enough.
    w.engine
        .register_region(
            region("distant", 2500.0),
            RegionBounds {
                load_radius: 1500.0,
                active_radius: 1000.0,
            },
        )
        .unwrap();
    let distant = RegionId::from("distant");
    assert!(!w.engine.get_region_state(&distant).unwrap().is_loaded);

    // At zoom 0.3 the half-width grows to 500/0.3 ~ 1667; the load circle
    // reaches x = 1000, inside the rect.
    w.controller
        .move_to_raw(
            transform::world_to_screen(Vec2::ZERO, 0.3, Vec2::new(1000.0, 800.0)).extend(0.0),
            Vec3::ZERO,
            0.3,
            false,
        );
    assert!(w.engine.get_region_state(&distant).unwrap().is_loaded);
}
