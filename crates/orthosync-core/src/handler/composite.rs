use std::sync::Arc;

use super::{ColoredPlanesHandler, HandlerInput, ModeHandler, VizMode};
use crate::state::{ChangeFlags, RenderParams};
use crate::surface::{PropId, ViewSurface};

/// A main 3D handler with reference planes drawn on top
///
/// Changes go to both parts. Plane hit-testing comes from the planes, the
/// manipulable prop from the main handler.
pub struct CompositeHandler {
    mode: VizMode,
    main: Box<dyn ModeHandler>,
    planes: ColoredPlanesHandler,
}

impl std::fmt::Debug for CompositeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeHandler")
            .field("mode", &self.mode)
            .field("main", &self.main.mode())
            .field("planes", &self.planes)
            .finish()
    }
}

impl CompositeHandler {
    pub fn new(mode: VizMode, main: Box<dyn ModeHandler>, planes: ColoredPlanesHandler) -> Self {
        Self { mode, main, planes }
    }

    pub fn planes(&self) -> &ColoredPlanesHandler {
        &self.planes
    }
}

impl ModeHandler for CompositeHandler {
    fn mode(&self) -> VizMode {
        self.mode
    }

    fn inject(&mut self, input: HandlerInput) {
        let source = Arc::clone(input.source());
        self.main.inject(input);
        self.planes.inject(HandlerInput::Raw(source));
    }

    fn attach(&mut self, surface: &mut dyn ViewSurface) {
        self.main.attach(surface);
        self.planes.attach(surface);
    }

    fn detach(&mut self, surface: &mut dyn ViewSurface) {
        self.main.detach(surface);
        self.planes.detach(surface);
    }

    fn setup_camera(&self, surface: &mut dyn ViewSurface) {
        self.main.setup_camera(surface);
    }

    fn apply_change(
        &mut self,
        params: &RenderParams,
        flags: ChangeFlags,
        surface: &mut dyn ViewSurface,
    ) {
        self.main.apply_change(params, flags, surface);
        self.planes.apply_change(params, flags, surface);
    }

    fn plane_axis(&self, prop: PropId) -> Option<usize> {
        self.planes.plane_axis(prop)
    }

    fn main_prop(&self) -> Option<PropId> {
        self.main.main_prop()
    }

    fn set_manipulable(&mut self, enabled: bool, surface: &mut dyn ViewSurface) {
        self.main.set_manipulable(enabled, surface);
    }
}
