use std::sync::Arc;

use super::{color_points, HandlerInput, ModeHandler, PropSet, VizMode};
use crate::state::{clamp_index, ChangeFlags, RenderParams};
use crate::surface::{Prop, PropId, PropKind, Rgb, ViewSurface};
use crate::volume::Volume;

const BACKGROUND: Rgb = [0.1, 0.1, 0.1];

/// Three orthogonal slices shown together in 3D
#[derive(Debug, Default)]
pub struct MultiSliceHandler {
    volume: Option<Arc<Volume>>,
    props: PropSet,
    slices: Option<[PropId; 3]>,
}

impl MultiSliceHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slice index currently shown on each axis
    pub fn indices(&self) -> Option<[i32; 3]> {
        let ids = self.slices?;
        let mut out = [0; 3];
        for (axis, id) in ids.into_iter().enumerate() {
            match self.props.get(id)?.kind {
                PropKind::Slice { index, .. } => out[axis] = index,
                _ => return None,
            }
        }
        Some(out)
    }
}

impl ModeHandler for MultiSliceHandler {
    fn mode(&self) -> VizMode {
        VizMode::MultiSlice
    }

    fn inject(&mut self, input: HandlerInput) {
        let HandlerInput::Raw(volume) = input else {
            tracing::debug!("multi-slice handler ignores derived input");
            return;
        };
        let center = volume.center_index();
        let ids = [0, 1, 2].map(|axis| {
            self.props.push(Prop::new(PropKind::Slice {
                volume: Arc::clone(&volume),
                axis,
                index: center[axis],
                lookup: Vec::new(),
            }))
        });
        self.slices = Some(ids);
        self.volume = Some(volume);
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
        let (Some(ids), Some(volume)) = (self.slices, self.volume.as_ref()) else {
            return;
        };
        let relevant =
            ChangeFlags::CURSOR | ChangeFlags::TF | ChangeFlags::MATERIAL | ChangeFlags::TRANSFORM;
        if !flags.intersects(relevant) {
            return;
        }

        let dims = volume.dims();
        let lookup = flags.contains(ChangeFlags::TF).then(|| color_points(params));
        for (axis, id) in ids.into_iter().enumerate() {
            self.props.update(id, surface, |prop| {
                if let PropKind::Slice {
                    index,
                    lookup: current,
                    ..
                } = &mut prop.kind
                {
                    if flags.contains(ChangeFlags::CURSOR) {
                        *index = clamp_index(params.cursor[axis] as i64, dims[axis]);
                    }
                    if let Some(lookup) = &lookup {
                        *current = lookup.clone();
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
    }
}
