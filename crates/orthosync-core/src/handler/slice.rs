use std::sync::Arc;

use super::{
    color_points, HandlerInput, ModeHandler, Orientation, PropSet, VizMode, AXIS_COLORS,
};
use crate::state::{clamp_index, ChangeFlags, RenderParams};
use crate::surface::{CameraPlacement, Prop, PropId, PropKind, Rgb, ViewSurface};
use crate::volume::Volume;

const BACKGROUND: Rgb = [0.0, 0.0, 0.0];
const CAMERA_DISTANCE: f64 = 0.1;
const CROSSHAIR_WIDTH: f64 = 1.0;

/// One axis-aligned slice with a crosshair marking the cursor
#[derive(Debug)]
pub struct SliceHandler {
    orientation: Orientation,
    layer_offset: f64,
    volume: Option<Arc<Volume>>,
    props: PropSet,
    slice_prop: Option<PropId>,
    /// Lines along the first and second in-plane axis
    crosshair: Option<[PropId; 2]>,
    max_index: i32,
    index: i32,
}

impl SliceHandler {
    pub fn new(orientation: Orientation, layer_offset: f64) -> Self {
        Self {
            orientation,
            layer_offset,
            volume: None,
            props: PropSet::default(),
            slice_prop: None,
            crosshair: None,
            max_index: 0,
            index: 0,
        }
    }

    pub fn slice_index(&self) -> i32 {
        self.index
    }

    pub fn max_index(&self) -> i32 {
        self.max_index
    }

    pub fn slice_prop(&self) -> Option<PropId> {
        self.slice_prop
    }

    pub fn crosshair_props(&self) -> Option<[PropId; 2]> {
        self.crosshair
    }

    /// Endpoints of the two crosshair lines through `cursor`
    fn crosshair_lines(&self, volume: &Volume, cursor: [i32; 3]) -> [([f64; 3], [f64; 3]); 2] {
        let axis = self.orientation.axis();
        let dims = volume.dims();
        let bounds = volume.bounds();
        let depth = volume.axis_to_world(axis, self.index) + self.layer_offset;
        let [u, v] = self.orientation.in_plane_axes();

        let line_along = |along: usize, across: usize| {
            let mut from = [0.0; 3];
            from[axis] = depth;
            from[across] = volume.axis_to_world(across, clamp_index(cursor[across] as i64, dims[across]));
            from[along] = bounds[along * 2];
            let mut to = from;
            to[along] = bounds[along * 2 + 1];
            (from, to)
        };

        [line_along(u, v), line_along(v, u)]
    }

    fn push_line(&mut self, (from, to): ([f64; 3], [f64; 3]), color: Rgb) -> PropId {
        let line = Prop::new(PropKind::Line {
            from,
            to,
            color,
            width: CROSSHAIR_WIDTH,
        })
        .unlit();
        self.props.push(line)
    }

    fn update_geometry(&mut self, cursor: [i32; 3], surface: &mut dyn ViewSurface) {
        let Some(volume) = self.volume.clone() else {
            return;
        };
        let axis = self.orientation.axis();
        self.index = cursor[axis].clamp(0, self.max_index);

        if let Some(id) = self.slice_prop {
            let index = self.index;
            self.props.update(id, surface, |prop| {
                if let PropKind::Slice { index: current, .. } = &mut prop.kind {
                    *current = index;
                }
            });
        }

        if let Some(ids) = self.crosshair {
            let lines = self.crosshair_lines(&volume, cursor);
            for (id, (start, end)) in ids.into_iter().zip(lines) {
                self.props.update(id, surface, |prop| {
                    if let PropKind::Line { from, to, .. } = &mut prop.kind {
                        *from = start;
                        *to = end;
                    }
                });
            }
        }
    }
}

impl ModeHandler for SliceHandler {
    fn mode(&self) -> VizMode {
        VizMode::Slice(self.orientation)
    }

    fn inject(&mut self, input: HandlerInput) {
        let HandlerInput::Raw(volume) = input else {
            tracing::debug!("slice handler ignores derived input");
            return;
        };
        let axis = self.orientation.axis();
        self.max_index = volume.max_index(axis);
        self.index = self.max_index / 2;

        let slice = Prop::new(PropKind::Slice {
            volume: Arc::clone(&volume),
            axis,
            index: self.index,
            lookup: Vec::new(),
        })
        .pickable(true);
        self.slice_prop = Some(self.props.push(slice));

        let [along_u, along_v] = self.crosshair_lines(&volume, volume.center_index());
        let [u, v] = self.orientation.in_plane_axes();
        // A line along u marks the position of the v plane, and vice versa
        self.crosshair = Some([
            self.push_line(along_u, AXIS_COLORS[v]),
            self.push_line(along_v, AXIS_COLORS[u]),
        ]);
        self.volume = Some(volume);
    }

    fn attach(&mut self, surface: &mut dyn ViewSurface) {
        self.props.attach(surface);
    }

    fn detach(&mut self, surface: &mut dyn ViewSurface) {
        self.props.detach(surface);
    }

    fn setup_camera(&self, surface: &mut dyn ViewSurface) {
        surface.set_parallel_projection(true);
        surface.set_background(BACKGROUND);

        let Some(volume) = &self.volume else {
            return;
        };
        let axis = self.orientation.axis();
        let focal_point = volume.center();
        let mut position = focal_point;
        position[axis] += CAMERA_DISTANCE;
        let view_up = match self.orientation {
            Orientation::Axial => [0.0, 1.0, 0.0],
            Orientation::Sagittal | Orientation::Coronal => [0.0, 0.0, 1.0],
        };
        surface.place_camera(CameraPlacement {
            focal_point,
            position,
            view_up,
        });
    }

    fn apply_change(
        &mut self,
        params: &RenderParams,
        flags: ChangeFlags,
        surface: &mut dyn ViewSurface,
    ) {
        if flags.contains(ChangeFlags::CURSOR) {
            self.update_geometry(params.cursor, surface);
        }

        let Some(id) = self.slice_prop else {
            return;
        };
        if flags.contains(ChangeFlags::TF) {
            let lookup = color_points(params);
            self.props.update(id, surface, |prop| {
                if let PropKind::Slice { lookup: current, .. } = &mut prop.kind {
                    *current = lookup;
                }
            });
        }
        if flags.contains(ChangeFlags::MATERIAL) {
            self.props.update(id, surface, |prop| {
                prop.material.opacity = params.material.opacity;
                prop.material.ambient = params.material.ambient;
                prop.material.diffuse = params.material.diffuse;
            });
        }
    }

    fn orientation(&self) -> Option<Orientation> {
        Some(self.orientation)
    }
}
