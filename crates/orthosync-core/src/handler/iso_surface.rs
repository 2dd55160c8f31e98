use super::{axes_prop, HandlerInput, ModeHandler, PropSet, VizMode};
use crate::state::{ChangeFlags, RenderParams};
use crate::surface::{Prop, PropId, PropKind, Rgb, ViewSurface};

const BACKGROUND: Rgb = [0.1, 0.15, 0.2];
const SURFACE_COLOR: Rgb = [1.0, 1.0, 1.0];

/// Extracted iso-surface mesh
#[derive(Debug, Default)]
pub struct IsoSurfaceHandler {
    props: PropSet,
    mesh_prop: Option<PropId>,
}

impl IsoSurfaceHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Threshold currently attached to the mesh prop
    pub fn iso_value(&self) -> Option<f64> {
        let prop = self.props.get(self.mesh_prop?)?;
        match prop.kind {
            PropKind::Mesh { iso_value, .. } => Some(iso_value),
            _ => None,
        }
    }
}

impl ModeHandler for IsoSurfaceHandler {
    fn mode(&self) -> VizMode {
        VizMode::IsoSurface
    }

    fn inject(&mut self, input: HandlerInput) {
        let HandlerInput::Derived { mesh, source } = input else {
            tracing::debug!("iso-surface handler ignores raw input");
            return;
        };
        self.props.push(axes_prop(&source));
        let prop = Prop::new(PropKind::Mesh {
            mesh,
            iso_value: 0.0,
            color: SURFACE_COLOR,
        });
        self.mesh_prop = Some(self.props.push(prop));
    }

    fn attach(&mut self, surface: &mut dyn ViewSurface) {
        self.props.attach(surface);
    }

    fn detach(&mut self, surface: &mut dyn ViewSurface) {
        self.props.detach(surface);
    }

    fn setup_camera(&self, surface: &mut dyn ViewSurface) {
        surface.set_parallel_projection(false);
        surface.set_background(BACKGROUND);
    }

    fn apply_change(
        &mut self,
        params: &RenderParams,
        flags: ChangeFlags,
        surface: &mut dyn ViewSurface,
    ) {
        let Some(id) = self.mesh_prop else {
            return;
        };
        if !flags.intersects(ChangeFlags::MATERIAL | ChangeFlags::ISO_VALUE | ChangeFlags::TRANSFORM) {
            return;
        }

        self.props.update(id, surface, |prop| {
            if flags.contains(ChangeFlags::MATERIAL) {
                prop.material = params.material;
            }
            if flags.contains(ChangeFlags::ISO_VALUE) {
                if let PropKind::Mesh { iso_value, .. } = &mut prop.kind {
                    *iso_value = params.iso_value;
                }
            }
            if flags.contains(ChangeFlags::TRANSFORM) {
                prop.user_matrix = params.model_matrix;
            }
        });
    }

    fn main_prop(&self) -> Option<PropId> {
        self.mesh_prop
    }

    fn set_manipulable(&mut self, enabled: bool, surface: &mut dyn ViewSurface) {
        if let Some(id) = self.mesh_prop {
            self.props.set_manipulable(id, enabled, surface);
        }
    }
}
