//! View Service
//!
//! One [`ViewService`] per window. It holds the shared Data Holder and state
//! store, owns the drawing surface and the handler cache, and mediates every
//! mutation a window makes.
//!
//! Store notifications never touch the surface directly. The observer only
//! records the changed flags and marks the view dirty; the render loop calls
//! [`ViewService::process_pending_updates`] on the view's own thread to push
//! the accumulated flags into the active handler.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SyncConfig;
use crate::error::{OrthoError, Result};
use crate::handler::{HandlerRegistry, Orientation, VizMode};
use crate::state::{ChangeFlags, Material, ObserverId, SharedInteractionState, TfNode};
use crate::surface::{InteractionStyle, PropId, SurfaceExtractor, ViewSurface};
use crate::transform::{invert, transform_point, ModelTransform};
use crate::volume::{Volume, VolumeHolder, VolumeSource};

/// Unique identifier of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewId(Uuid);

impl ViewId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ViewId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cursor components a world-position sync may change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisLock {
    /// Update all three components
    All,
    /// Update only this component (reference plane drags)
    Only(usize),
    /// Keep this component (crosshair drags keep the slice's own axis)
    Except(usize),
}

impl AxisLock {
    pub fn allows(self, axis: usize) -> bool {
        match self {
            AxisLock::All => true,
            AxisLock::Only(only) => axis == only,
            AxisLock::Except(kept) => axis != kept,
        }
    }
}

/// Cross-thread signals written by the store observer
#[derive(Debug, Default)]
struct ViewSignals {
    dirty: AtomicBool,
    pending: AtomicU32,
}

impl ViewSignals {
    fn record(&self, flags: ChangeFlags) {
        self.pending.fetch_or(flags.bits(), Ordering::AcqRel);
        self.dirty.store(true, Ordering::Release);
    }

    fn take_pending(&self) -> ChangeFlags {
        ChangeFlags::from_bits_truncate(self.pending.swap(0, Ordering::AcqRel))
    }
}

/// Builder for [`ViewService`]
pub struct ViewServiceBuilder {
    holder: Arc<VolumeHolder>,
    state: Arc<SharedInteractionState>,
    surface: Option<Box<dyn ViewSurface>>,
    extractor: Option<Arc<dyn SurfaceExtractor>>,
    config: SyncConfig,
    name: Option<String>,
}

impl ViewServiceBuilder {
    pub fn new(holder: Arc<VolumeHolder>, state: Arc<SharedInteractionState>) -> Self {
        Self {
            holder,
            state,
            surface: None,
            extractor: None,
            config: SyncConfig::default(),
            name: None,
        }
    }

    pub fn surface<S: ViewSurface + 'static>(mut self, surface: S) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    pub fn boxed_surface(mut self, surface: Box<dyn ViewSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn extractor<E: SurfaceExtractor + 'static>(mut self, extractor: E) -> Self {
        self.extractor = Some(Arc::new(extractor));
        self
    }

    /// Use an extractor shared with other views
    pub fn shared_extractor(mut self, extractor: Arc<dyn SurfaceExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<ViewService> {
        let surface = self
            .surface
            .ok_or(OrthoError::MissingCollaborator("surface"))?;
        let extractor = self
            .extractor
            .ok_or(OrthoError::MissingCollaborator("extractor"))?;
        self.config.validate()?;

        let id = ViewId::new();
        let name = self.name.unwrap_or_else(|| format!("view-{}", id));
        let signals = Arc::new(ViewSignals::default());
        let observer = self
            .state
            .add_observer(&signals, |signals, flags| signals.record(flags));
        let seen_generation = self.holder.generation();
        tracing::debug!("built view {}", name);

        Ok(ViewService {
            id,
            name,
            holder: self.holder,
            state: self.state,
            surface,
            extractor,
            registry: HandlerRegistry::new(self.config.handlers.clone()),
            config: self.config,
            active: None,
            manipulation: false,
            signals,
            observer,
            seen_generation,
        })
    }
}

/// Per-window coordinator between input, shared state and the surface
pub struct ViewService {
    id: ViewId,
    name: String,
    holder: Arc<VolumeHolder>,
    state: Arc<SharedInteractionState>,
    surface: Box<dyn ViewSurface>,
    extractor: Arc<dyn SurfaceExtractor>,
    config: SyncConfig,
    registry: HandlerRegistry,
    active: Option<VizMode>,
    /// Main prop of the active mode is held pickable for manipulation
    manipulation: bool,
    signals: Arc<ViewSignals>,
    observer: ObserverId,
    seen_generation: u64,
}

impl std::fmt::Debug for ViewService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewService")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("active", &self.active)
            .field("registry", &self.registry)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl Drop for ViewService {
    fn drop(&mut self) {
        self.state.remove_observer(self.observer);
    }
}

impl ViewService {
    pub fn builder(
        holder: Arc<VolumeHolder>,
        state: Arc<SharedInteractionState>,
    ) -> ViewServiceBuilder {
        ViewServiceBuilder::new(holder, state)
    }

    // ===== Accessors =====

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &Arc<SharedInteractionState> {
        &self.state
    }

    pub fn holder(&self) -> &Arc<VolumeHolder> {
        &self.holder
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn active_mode(&self) -> Option<VizMode> {
        self.active
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Currently published volume
    pub fn volume(&self) -> Option<Arc<Volume>> {
        self.holder.current()
    }

    pub fn surface(&self) -> &dyn ViewSurface {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> &mut dyn ViewSurface {
        self.surface.as_mut()
    }

    // ===== Modes =====

    /// Show `mode`. Returns `Ok(false)` when no volume is loaded yet.
    pub fn show(&mut self, mode: VizMode) -> Result<bool> {
        let Some(volume) = self.sync_generation() else {
            tracing::debug!("view {}: no data, cannot show {}", self.name, mode);
            return Ok(false);
        };
        if self.active == Some(mode) {
            return Ok(true);
        }
        self.switch_handler(mode, &volume)?;
        Ok(true)
    }

    pub fn show_volume(&mut self) -> Result<bool> {
        self.show(VizMode::Volume)
    }

    pub fn show_iso_surface(&mut self) -> Result<bool> {
        self.show(VizMode::IsoSurface)
    }

    pub fn show_slice(&mut self, orientation: Orientation) -> Result<bool> {
        self.show(VizMode::Slice(orientation))
    }

    pub fn show_multi_slice(&mut self) -> Result<bool> {
        self.show(VizMode::MultiSlice)
    }

    pub fn show_planes(&mut self) -> Result<bool> {
        self.show(VizMode::ColoredPlanes)
    }

    /// Volume or iso-surface rendering with reference planes
    pub fn show_composite(&mut self, iso_surface: bool) -> Result<bool> {
        if iso_surface {
            self.show(VizMode::CompositeIsoSurface)
        } else {
            self.show(VizMode::CompositeVolume)
        }
    }

    fn switch_handler(&mut self, mode: VizMode, volume: &Arc<Volume>) -> Result<()> {
        if mode.needs_mesh() {
            let params = self.state.snapshot();
            let iso = self
                .registry
                .initial_iso(params.scalar_range, params.iso_value);
            self.state.set_iso_value(iso);
        }
        let params = self.state.snapshot();

        // Build before detaching so a failed extraction keeps the old mode
        self.registry
            .get_or_create(mode, volume, params.iso_value, &*self.extractor)?;

        let surface = self.surface.as_mut();
        if let Some(previous) = self.active.take() {
            if let Some(handler) = self.registry.get_mut(previous) {
                if self.manipulation {
                    handler.set_manipulable(false, surface);
                }
                handler.detach(surface);
            }
        }

        let handler = self
            .registry
            .get_or_create(mode, volume, params.iso_value, &*self.extractor)?;
        handler.attach(surface);
        if self.manipulation {
            handler.set_manipulable(true, surface);
        }
        handler.setup_camera(surface);
        surface.reset_camera();
        surface.set_interaction_style(navigation_style(mode));
        handler.apply_change(&params, ChangeFlags::all(), surface);

        self.active = Some(mode);
        self.mark_dirty();
        tracing::info!("view {} switched to {}", self.name, mode);
        Ok(())
    }

    /// Camera style used while no tool mode is active
    pub fn navigation_style(&self) -> InteractionStyle {
        self.active
            .map(navigation_style)
            .unwrap_or(InteractionStyle::Trackball)
    }

    // ===== Data =====

    /// Load through `source` and publish on success.
    ///
    /// On failure the previous volume stays published and every view keeps
    /// showing it.
    pub fn load_from<S>(&mut self, source: &S) -> Result<Arc<Volume>>
    where
        S: VolumeSource + ?Sized,
    {
        match self.holder.load_with(source) {
            Ok(volume) => {
                self.on_published(&volume);
                Ok(volume)
            }
            Err(e) => {
                tracing::warn!(
                    "view {}: failed to load {}: {}",
                    self.name,
                    source.describe(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Publish an already built volume
    pub fn publish_volume(&mut self, volume: Volume) -> Arc<Volume> {
        let volume = self.holder.publish(volume);
        self.on_published(&volume);
        volume
    }

    /// Reset shared state for fresh data and rebuild this view
    fn on_published(&mut self, volume: &Arc<Volume>) {
        let (min, max) = volume.scalar_range();
        self.state.set_scalar_range(min, max);
        self.state
            .set_iso_value(min + (max - min) * self.config.handlers.iso_fraction);
        self.state.set_cursor(volume.center_index());
        self.process_pending_updates();
    }

    /// Rebuild after a publish this view has not seen yet
    fn sync_generation(&mut self) -> Option<Arc<Volume>> {
        let (volume, generation) = self.holder.snapshot();
        if generation != self.seen_generation {
            self.seen_generation = generation;
            self.reload(volume.clone());
        }
        volume
    }

    fn reload(&mut self, volume: Option<Arc<Volume>>) {
        let mode = self.active.take();
        self.registry.clear();
        self.surface.remove_all_props();
        self.mark_dirty();
        tracing::debug!("view {}: data reloaded, handler cache invalidated", self.name);

        if let (Some(mode), Some(volume)) = (mode, volume) {
            if let Err(e) = self.switch_handler(mode, &volume) {
                tracing::warn!("view {}: failed to rebuild {}: {}", self.name, mode, e);
            }
        }
    }

    /// Apply everything that changed since the last call.
    ///
    /// Rebuilds the active mode after a data reload, otherwise pushes the
    /// accumulated flags into the active handler. Returns the drained flags.
    pub fn process_pending_updates(&mut self) -> ChangeFlags {
        let flags = self.signals.take_pending();
        let generation = self.seen_generation;
        self.sync_generation();
        if generation != self.seen_generation || flags.is_empty() {
            // A rebuild already pushed the full state
            return flags;
        }

        if let Some(mode) = self.active {
            let params = self.state.snapshot();
            if let Some(handler) = self.registry.get_mut(mode) {
                handler.apply_change(&params, flags, self.surface.as_mut());
            }
        }
        self.mark_dirty();
        flags
    }

    // ===== Interaction =====

    /// Slice orientation of the active mode
    pub fn orientation(&self) -> Option<Orientation> {
        self.active
            .and_then(|mode| self.registry.get(mode))
            .and_then(|handler| handler.orientation())
    }

    /// Cursor axis of a reference plane prop in the active mode
    pub fn plane_axis(&self, prop: PropId) -> Option<usize> {
        self.active
            .and_then(|mode| self.registry.get(mode))
            .and_then(|handler| handler.plane_axis(prop))
    }

    /// Manipulable prop of the active mode
    pub fn main_prop(&self) -> Option<PropId> {
        self.active
            .and_then(|mode| self.registry.get(mode))
            .and_then(|handler| handler.main_prop())
    }

    /// Hold the active mode's main prop pickable, or give it back its own
    /// pickability. Kept across mode switches and data reloads.
    pub fn set_manipulation(&mut self, enabled: bool) -> bool {
        if self.manipulation == enabled {
            return false;
        }
        self.manipulation = enabled;
        if let Some(mode) = self.active {
            if let Some(handler) = self.registry.get_mut(mode) {
                handler.set_manipulable(enabled, self.surface.as_mut());
            }
        }
        self.mark_dirty();
        true
    }

    pub fn is_manipulating(&self) -> bool {
        self.manipulation
    }

    pub fn pick(&mut self, x: f64, y: f64) -> Option<PropId> {
        self.surface.pick(x, y)
    }

    pub fn unproject(&mut self, x: f64, y: f64) -> Option<[f64; 3]> {
        self.surface.unproject(x, y)
    }

    /// Step the active slice by `delta`. False without data or outside slice modes.
    pub fn update_interaction(&mut self, delta: i32) -> bool {
        let (Some(orientation), Some(volume)) = (self.orientation(), self.holder.current()) else {
            return false;
        };
        let axis = orientation.axis();
        self.state.update_axis(axis, delta, volume.dims()[axis])
    }

    /// Move the cursor to the voxel nearest `world`, touching only the
    /// components `lock` allows.
    ///
    /// In 3D modes `world` is first mapped back through the model matrix.
    pub fn sync_cursor_to_world(&mut self, world: [f64; 3], lock: AxisLock) -> bool {
        let Some(volume) = self.holder.current() else {
            return false;
        };
        let local = if self.orientation().is_none() {
            self.world_to_model(world).unwrap_or(world)
        } else {
            world
        };
        let target = volume.world_to_index(local);
        let dims = volume.dims();

        match lock {
            AxisLock::Only(axis) if axis < 3 => {
                self.state.set_cursor_axis(axis, target[axis], dims[axis])
            }
            AxisLock::Only(_) => false,
            AxisLock::All | AxisLock::Except(_) => {
                let mask = [lock.allows(0), lock.allows(1), lock.allows(2)];
                self.state.set_cursor_axes(target, mask, dims)
            }
        }
    }

    pub fn set_interacting(&self, interacting: bool) -> bool {
        self.state.set_interacting(interacting)
    }

    // ===== Appearance =====

    pub fn set_lighting(
        &self,
        ambient: f64,
        diffuse: f64,
        specular: f64,
        specular_power: f64,
        shade_on: bool,
    ) -> bool {
        self.state
            .set_lighting(ambient, diffuse, specular, specular_power, shade_on)
    }

    pub fn set_material(&self, material: Material) -> bool {
        self.state.set_material(material)
    }

    pub fn set_opacity(&self, opacity: f64) -> bool {
        self.state.set_opacity(opacity)
    }

    pub fn set_iso_value(&self, value: f64) -> bool {
        self.state.set_iso_value(value)
    }

    pub fn set_transfer_function(&self, nodes: Vec<TfNode>) -> bool {
        self.state.set_transfer_function(nodes)
    }

    // ===== Model transform =====

    pub fn transform_model(&self, transform: &ModelTransform) -> bool {
        self.state.set_model_matrix(transform.to_matrix())
    }

    pub fn reset_model_transform(&self) -> bool {
        self.state.reset_model_matrix()
    }

    /// Read the main prop's matrix back from the surface into the store
    pub fn sync_model_matrix(&mut self) -> bool {
        let Some(prop) = self.main_prop() else {
            return false;
        };
        let Some(matrix) = self.surface.prop_matrix(prop) else {
            return false;
        };
        self.mark_dirty();
        self.state.set_model_matrix(matrix)
    }

    /// World point in model coordinates, `None` for a singular model matrix
    pub fn world_to_model(&self, world: [f64; 3]) -> Option<[f64; 3]> {
        invert(&self.state.model_matrix()).map(|inverse| transform_point(&inverse, world))
    }

    pub fn model_to_world(&self, model: [f64; 3]) -> [f64; 3] {
        transform_point(&self.state.model_matrix(), model)
    }

    // ===== Rendering =====

    pub fn mark_dirty(&self) {
        self.signals.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.signals.dirty.load(Ordering::Acquire)
    }

    /// Redraw now and clear the dirty flag
    pub fn render(&mut self) {
        self.signals.dirty.store(false, Ordering::Release);
        self.surface.render();
        tracing::trace!("view {} rendered", self.name);
    }

    pub fn reset_camera(&mut self) {
        self.surface.reset_camera();
        self.mark_dirty();
    }

    pub fn set_desired_update_rate(&mut self, rate: f64) {
        self.surface.set_desired_update_rate(rate);
    }

    pub fn is_mapped(&self) -> bool {
        self.surface.is_mapped()
    }
}

fn navigation_style(mode: VizMode) -> InteractionStyle {
    match mode {
        VizMode::Slice(_) => InteractionStyle::Image2D,
        _ => InteractionStyle::Trackball,
    }
}
