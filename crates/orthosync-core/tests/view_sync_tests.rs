//! Multi-view synchronization integration tests

mod common;

use std::sync::Arc;

use common::fixtures::{ramp_volume, recording_view, shared, SurfaceHandle};
use orthosync_core::input::{MouseButton, MouseEvent};
use orthosync_core::{
    EventOutcome, InteractionMachine, InteractionStyle, Orientation, OrthoError, PropId, PropKind,
    RenderLoop, RenderLoopConfig, ViewService, VizMode, Volume, VolumeSource,
};

fn plane_prop(view: &ViewService, handle: &SurfaceHandle, axis: usize) -> PropId {
    let log = handle.log();
    log.props
        .keys()
        .copied()
        .find(|id| view.plane_axis(*id) == Some(axis))
        .expect("plane prop for axis")
}

fn plane_origin(handle: &SurfaceHandle, id: PropId) -> [f64; 3] {
    match handle.log().props[&id].kind {
        PropKind::Plane { origin, .. } => origin,
        _ => panic!("expected plane prop"),
    }
}

struct BrokenSource;

impl VolumeSource for BrokenSource {
    fn read_volume(&self) -> orthosync_core::Result<Volume> {
        Err(OrthoError::Load("truncated file".to_string()))
    }

    fn describe(&self) -> String {
        "broken".to_string()
    }
}

// === Slice stepping ===

#[test]
fn test_axial_wheel_steps_and_saturates() {
    let (holder, state) = shared();
    let (mut view, _handle) = recording_view(&holder, &state, "axial");
    let mut machine = InteractionMachine::default();

    view.publish_volume(ramp_volume([100, 100, 80]));
    assert!(view.show_slice(Orientation::Axial).unwrap());
    assert_eq!(state.cursor(), [50, 50, 40]);

    let outcome = machine.handle_mouse(&mut view, &MouseEvent::wheel(1));
    assert_eq!(outcome, EventOutcome::Consumed);
    assert_eq!(state.cursor(), [50, 50, 41]);

    for _ in 0..100 {
        machine.handle_mouse(&mut view, &MouseEvent::wheel(1));
    }
    assert_eq!(state.cursor(), [50, 50, 79]);
}

#[test]
fn test_wheel_ignored_in_3d_modes() {
    let (holder, state) = shared();
    let (mut view, _handle) = recording_view(&holder, &state, "3d");
    let mut machine = InteractionMachine::default();

    view.publish_volume(ramp_volume([10, 10, 10]));
    view.show_volume().unwrap();
    let outcome = machine.handle_mouse(&mut view, &MouseEvent::wheel(1));
    assert_eq!(outcome, EventOutcome::Ignored);
    assert_eq!(state.cursor(), [5, 5, 5]);
}

// === Cross-view propagation ===

#[test]
fn test_plane_drag_reaches_other_composite_views() {
    let (holder, state) = shared();
    let (mut first, first_surface) = recording_view(&holder, &state, "first");
    let (mut second, second_surface) = recording_view(&holder, &state, "second");
    let (mut third, third_surface) = recording_view(&holder, &state, "third");

    first.publish_volume(ramp_volume([100, 100, 80]));
    for view in [&mut first, &mut second, &mut third] {
        assert!(view.show_composite(false).unwrap());
    }

    let config = RenderLoopConfig::default();
    let mut loops = [
        RenderLoop::new(&config),
        RenderLoop::new(&config),
        RenderLoop::new(&config),
    ];
    loops[0].tick(&mut first);
    loops[1].tick(&mut second);
    loops[2].tick(&mut third);

    // Grab the red plane in the first view and drag it to x = 12
    let red = plane_prop(&first, &first_surface, 0);
    {
        let mut log = first_surface.log();
        log.pick_result = Some(red);
        log.world_result = Some([12.2, 80.0, 3.0]);
    }
    let mut machine = InteractionMachine::default();
    let press = MouseEvent::press(MouseButton::Left, 10.0, 10.0);
    assert_eq!(machine.handle_mouse(&mut first, &press), EventOutcome::Consumed);
    assert!(state.is_interacting());
    machine.handle_mouse(&mut first, &MouseEvent::moved(20.0, 10.0));
    machine.handle_mouse(&mut first, &MouseEvent::release(MouseButton::Left, 20.0, 10.0));
    assert!(!state.is_interacting());

    // Only the dragged axis moved
    assert_eq!(state.cursor(), [12, 50, 40]);

    // The other views catch up on their next tick, with no input of their own
    let second_red = plane_prop(&second, &second_surface, 0);
    let third_red = plane_prop(&third, &third_surface, 0);
    assert_eq!(plane_origin(&second_surface, second_red)[0], 50.0);

    loops[1].tick(&mut second);
    loops[2].tick(&mut third);
    assert_eq!(plane_origin(&second_surface, second_red)[0], 12.0);
    assert_eq!(plane_origin(&third_surface, third_red)[0], 12.0);
    assert!(second_surface.log().renders >= 2);
}

#[test]
fn test_pick_miss_is_not_consumed() {
    let (holder, state) = shared();
    let (mut view, _handle) = recording_view(&holder, &state, "miss");
    view.publish_volume(ramp_volume([10, 10, 10]));
    view.show_composite(false).unwrap();

    let mut machine = InteractionMachine::default();
    let press = MouseEvent::press(MouseButton::Left, 1.0, 1.0);
    assert_eq!(machine.handle_mouse(&mut view, &press), EventOutcome::Ignored);
    assert!(!machine.is_dragging());
    assert!(!state.is_interacting());
}

// === Mode switching ===

#[test]
fn test_switch_detaches_before_attaching_and_sets_up_camera() {
    let (holder, state) = shared();
    let (mut view, handle) = recording_view(&holder, &state, "switch");
    view.publish_volume(ramp_volume([8, 8, 8]));
    view.show_volume().unwrap();
    handle.log().clear_calls();

    view.show_slice(Orientation::Sagittal).unwrap();
    let log = handle.log();
    let removed = log.call_index("remove_prop").unwrap();
    let added = log.call_index("add_prop").unwrap();
    let camera = log.call_index("set_parallel_projection").unwrap();
    let reset = log.call_index("reset_camera").unwrap();
    let pushed = log.call_index("update_prop").unwrap();
    assert!(removed < added);
    assert!(added < camera);
    assert!(camera < reset);
    assert!(reset < pushed);

    assert_eq!(log.parallel, Some(true));
    assert_eq!(log.style, Some(InteractionStyle::Image2D));
    // Slice plus two crosshair lines; the volume and its axes are gone
    assert_eq!(log.props.len(), 3);
    assert!(!log
        .props
        .values()
        .any(|p| matches!(p.kind, PropKind::Axes { .. })));
    assert!(view.is_dirty());
}

#[test]
fn test_switching_back_reuses_cached_handler() {
    let (holder, state) = shared();
    let (mut view, _handle) = recording_view(&holder, &state, "cache");
    view.publish_volume(ramp_volume([8, 8, 8]));

    view.show_volume().unwrap();
    let first = view.main_prop();
    view.show_slice(Orientation::Axial).unwrap();
    view.show_volume().unwrap();

    assert_eq!(view.main_prop(), first);
    assert_eq!(view.registry().len(), 2);
}

#[test]
fn test_iso_mode_extracts_at_fraction_of_range() {
    let (holder, state) = shared();
    let (mut view, handle) = recording_view(&holder, &state, "iso");
    view.publish_volume(ramp_volume([10, 10, 10]));
    state.set_iso_value(-1.0);

    view.show_composite(true).unwrap();
    assert!((state.iso_value() - 399.6).abs() < 1e-9);

    // Mesh, bounding axes and three planes
    let log = handle.log();
    assert_eq!(log.props.len(), 5);
    let axes = log
        .props
        .values()
        .find(|p| matches!(p.kind, PropKind::Axes { .. }))
        .unwrap();
    assert!(!axes.pickable);
    assert!(matches!(
        axes.kind,
        PropKind::Axes { bounds } if bounds == [0.0, 9.0, 0.0, 9.0, 0.0, 9.0]
    ));
    assert!(log
        .props
        .values()
        .any(|p| matches!(p.kind, PropKind::Mesh { .. })));
    assert_eq!(log.background, Some([0.1, 0.15, 0.2]));
}

// === Data reload ===

#[test]
fn test_reload_invalidates_cache_on_next_tick() {
    let (holder, state) = shared();
    let (mut loader, _) = recording_view(&holder, &state, "loader");
    let (mut watcher, handle) = recording_view(&holder, &state, "watcher");
    let mut render_loop = RenderLoop::new(&RenderLoopConfig::default());

    loader.publish_volume(ramp_volume([10, 10, 10]));
    watcher.show_volume().unwrap();
    watcher.show_slice(Orientation::Axial).unwrap();
    assert_eq!(watcher.registry().len(), 2);

    loader.publish_volume(ramp_volume([20, 20, 30]));
    handle.log().clear_calls();
    render_loop.tick(&mut watcher);

    assert_eq!(watcher.active_mode(), Some(VizMode::Slice(Orientation::Axial)));
    assert_eq!(watcher.registry().len(), 1);
    let log = handle.log();
    assert!(log.call_index("remove_all_props").is_some());
    let slice = log
        .props
        .values()
        .find_map(|p| match &p.kind {
            PropKind::Slice { volume, index, .. } => Some((volume.dims(), *index)),
            _ => None,
        })
        .unwrap();
    assert_eq!(slice, ([20, 20, 30], 15));
    assert_eq!(state.cursor(), [10, 10, 15]);
}

#[test]
fn test_failed_load_keeps_previous_state() {
    let (holder, state) = shared();
    let (mut view, handle) = recording_view(&holder, &state, "fail");
    let original = view.publish_volume(ramp_volume([6, 6, 6]));
    view.show_volume().unwrap();
    let props_before = handle.log().props.len();

    let err = view.load_from(&BrokenSource).unwrap_err();
    assert!(matches!(err, OrthoError::Load(_)));
    assert!(Arc::ptr_eq(&holder.current().unwrap(), &original));
    assert_eq!(view.active_mode(), Some(VizMode::Volume));
    assert_eq!(handle.log().props.len(), props_before);
}

#[test]
fn test_view_without_data_reports_sentinel() {
    let (holder, state) = shared();
    let (mut view, _handle) = recording_view(&holder, &state, "empty");
    assert!(!view.show_composite(true).unwrap());
    assert!(!view.update_interaction(1));
    assert_eq!(view.main_prop(), None);
}
