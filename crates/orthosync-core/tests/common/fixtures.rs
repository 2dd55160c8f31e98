//! Shared test collaborators: a scriptable recording surface and a stub extractor

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use orthosync_core::{
    CameraPlacement, InteractionStyle, Matrix4, MeasureTool, Mesh, Prop, PropId, Rgb,
    SharedInteractionState, SurfaceExtractor, ViewService, ViewSurface, Volume, VolumeHolder,
};

/// Everything a [`RecordingSurface`] saw, plus scripted answers for picks
#[derive(Debug)]
pub struct SurfaceLog {
    pub props: BTreeMap<PropId, Prop>,
    /// Surface method names in call order
    pub calls: Vec<&'static str>,
    pub renders: usize,
    pub parallel: Option<bool>,
    pub camera: Option<CameraPlacement>,
    pub background: Option<Rgb>,
    pub style: Option<InteractionStyle>,
    pub tools: HashMap<MeasureTool, bool>,
    pub update_rates: Vec<f64>,
    pub mapped: bool,

    /// Answer for the next `pick`
    pub pick_result: Option<PropId>,
    /// Answer for the next `unproject`
    pub world_result: Option<[f64; 3]>,
    /// Matrices the surface reports, as if moved by actor manipulation
    pub manipulated: HashMap<PropId, Matrix4>,
}

impl Default for SurfaceLog {
    fn default() -> Self {
        Self {
            props: BTreeMap::new(),
            calls: Vec::new(),
            renders: 0,
            parallel: None,
            camera: None,
            background: None,
            style: None,
            tools: HashMap::new(),
            update_rates: Vec::new(),
            mapped: true,
            pick_result: None,
            world_result: None,
            manipulated: HashMap::new(),
        }
    }
}

impl SurfaceLog {
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Position of the first call named `name`
    pub fn call_index(&self, name: &str) -> Option<usize> {
        self.calls.iter().position(|c| *c == name)
    }
}

/// Surface that records calls into a log the test keeps a handle to
#[derive(Clone, Default)]
pub struct RecordingSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn new() -> (Self, SurfaceHandle) {
        let surface = Self::default();
        let handle = SurfaceHandle(Arc::clone(&surface.log));
        (surface, handle)
    }

    fn log(&self) -> MutexGuard<'_, SurfaceLog> {
        self.log.lock().unwrap()
    }

    fn record(&self, name: &'static str) -> MutexGuard<'_, SurfaceLog> {
        let mut log = self.log();
        log.calls.push(name);
        log
    }
}

/// Test-side handle to a [`RecordingSurface`] log
#[derive(Clone)]
pub struct SurfaceHandle(Arc<Mutex<SurfaceLog>>);

impl SurfaceHandle {
    pub fn log(&self) -> MutexGuard<'_, SurfaceLog> {
        self.0.lock().unwrap()
    }
}

impl ViewSurface for RecordingSurface {
    fn add_prop(&mut self, prop: &Prop) {
        self.record("add_prop").props.insert(prop.id, prop.clone());
    }

    fn update_prop(&mut self, prop: &Prop) {
        self.record("update_prop").props.insert(prop.id, prop.clone());
    }

    fn remove_prop(&mut self, id: PropId) {
        self.record("remove_prop").props.remove(&id);
    }

    fn remove_all_props(&mut self) {
        self.record("remove_all_props").props.clear();
    }

    fn set_parallel_projection(&mut self, parallel: bool) {
        self.record("set_parallel_projection").parallel = Some(parallel);
    }

    fn place_camera(&mut self, placement: CameraPlacement) {
        self.record("place_camera").camera = Some(placement);
    }

    fn reset_camera(&mut self) {
        self.record("reset_camera");
    }

    fn set_background(&mut self, color: Rgb) {
        self.record("set_background").background = Some(color);
    }

    fn set_interaction_style(&mut self, style: InteractionStyle) {
        self.record("set_interaction_style").style = Some(style);
    }

    fn set_tool_enabled(&mut self, tool: MeasureTool, enabled: bool) {
        self.record("set_tool_enabled").tools.insert(tool, enabled);
    }

    fn set_pickable(&mut self, id: PropId, pickable: bool) {
        if let Some(prop) = self.record("set_pickable").props.get_mut(&id) {
            prop.pickable = pickable;
        }
    }

    fn pick(&mut self, _x: f64, _y: f64) -> Option<PropId> {
        self.record("pick").pick_result
    }

    fn unproject(&mut self, _x: f64, _y: f64) -> Option<[f64; 3]> {
        self.record("unproject").world_result
    }

    fn prop_matrix(&self, id: PropId) -> Option<Matrix4> {
        let log = self.log();
        log.manipulated
            .get(&id)
            .copied()
            .or_else(|| log.props.get(&id).map(|p| p.user_matrix))
    }

    fn set_desired_update_rate(&mut self, rate: f64) {
        self.record("set_desired_update_rate").update_rates.push(rate);
    }

    fn is_mapped(&self) -> bool {
        self.log().mapped
    }

    fn render(&mut self) {
        self.record("render").renders += 1;
    }
}

/// Extractor returning a single triangle and counting calls
#[derive(Default)]
pub struct StubExtractor {
    pub calls: Mutex<Vec<f64>>,
}

impl SurfaceExtractor for StubExtractor {
    fn extract(&self, _volume: &Volume, iso_value: f64) -> orthosync_core::Result<Mesh> {
        self.calls.lock().unwrap().push(iso_value);
        Ok(Mesh::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2]],
        ))
    }
}

/// Volume of the given size whose scalar is the linear voxel index
pub fn ramp_volume(dims: [usize; 3]) -> Volume {
    let n = dims.iter().product::<usize>();
    let data = (0..n).map(|i| i as f32).collect();
    Volume::new(dims, [1.0; 3], [0.0; 3], data).unwrap()
}

/// Store and Data Holder shared by a group of views
pub fn shared() -> (Arc<VolumeHolder>, Arc<SharedInteractionState>) {
    (
        Arc::new(VolumeHolder::new()),
        Arc::new(SharedInteractionState::new()),
    )
}

/// View wired to a fresh recording surface
pub fn recording_view(
    holder: &Arc<VolumeHolder>,
    state: &Arc<SharedInteractionState>,
    name: &str,
) -> (ViewService, SurfaceHandle) {
    let (surface, handle) = RecordingSurface::new();
    let view = ViewService::builder(Arc::clone(holder), Arc::clone(state))
        .surface(surface)
        .extractor(StubExtractor::default())
        .name(name)
        .build()
        .unwrap();
    (view, handle)
}
