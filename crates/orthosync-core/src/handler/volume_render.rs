use super::{axes_prop, color_points, opacity_points, HandlerInput, ModeHandler, PropSet, VizMode};
use crate::state::{ChangeFlags, RenderParams};
use crate::surface::{Prop, PropId, PropKind, ViewSurface};

const BACKGROUND: [f64; 3] = [0.05, 0.05, 0.05];

/// Direct volume rendering of the raw scalars
#[derive(Debug, Default)]
pub struct VolumeRenderHandler {
    props: PropSet,
    volume_prop: Option<PropId>,
}

impl VolumeRenderHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModeHandler for VolumeRenderHandler {
    fn mode(&self) -> VizMode {
        VizMode::Volume
    }

    fn inject(&mut self, input: HandlerInput) {
        let HandlerInput::Raw(volume) = input else {
            tracing::debug!("volume handler ignores derived input");
            return;
        };
        self.props.push(axes_prop(&volume));
        let prop = Prop::new(PropKind::Volume {
            volume,
            color_points: Vec::new(),
            opacity_points: Vec::new(),
        });
        self.volume_prop = Some(self.props.push(prop));
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
        let Some(id) = self.volume_prop else {
            return;
        };
        let relevant = ChangeFlags::TF
            | ChangeFlags::MATERIAL
            | ChangeFlags::SCALAR_RANGE
            | ChangeFlags::TRANSFORM;
        if !flags.intersects(relevant) {
            return;
        }

        self.props.update(id, surface, |prop| {
            if flags.intersects(ChangeFlags::TF | ChangeFlags::MATERIAL | ChangeFlags::SCALAR_RANGE) {
                if let PropKind::Volume {
                    color_points: colors,
                    opacity_points: opacities,
                    ..
                } = &mut prop.kind
                {
                    *colors = color_points(params);
                    *opacities = opacity_points(params);
                }
            }
            if flags.contains(ChangeFlags::MATERIAL) {
                prop.material = params.material;
            }
            if flags.contains(ChangeFlags::TRANSFORM) {
                prop.user_matrix = params.model_matrix;
            }
        });
    }

    fn main_prop(&self) -> Option<PropId> {
        self.volume_prop
    }

    fn set_manipulable(&mut self, enabled: bool, surface: &mut dyn ViewSurface) {
        if let Some(id) = self.volume_prop {
            self.props.set_manipulable(id, enabled, surface);
        }
    }
}
