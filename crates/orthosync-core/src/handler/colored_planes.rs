use super::{in_plane_axes, HandlerInput, ModeHandler, PropSet, VizMode, AXIS_COLORS};
use crate::state::{clamp_index, ChangeFlags, RenderParams};
use crate::surface::{Prop, PropId, PropKind, Rgb, ViewSurface};
use crate::volume::Volume;

const BACKGROUND: Rgb = [0.1, 0.1, 0.1];

/// Three translucent reference planes through the cursor
///
/// Plane `k` is perpendicular to axis `k`, spans the volume bounds on the
/// other two axes and sits at the cursor's physical position along `k`.
#[derive(Debug)]
pub struct ColoredPlanesHandler {
    opacity: f64,
    props: PropSet,
    planes: Option<[PropId; 3]>,
    dims: [usize; 3],
    origin: [f64; 3],
    spacing: [f64; 3],
    bounds: [f64; 6],
}

impl ColoredPlanesHandler {
    pub fn new(opacity: f64) -> Self {
        Self {
            opacity,
            props: PropSet::default(),
            planes: None,
            dims: [0; 3],
            origin: [0.0; 3],
            spacing: [1.0; 3],
            bounds: [0.0; 6],
        }
    }

    pub fn plane_props(&self) -> Option<[PropId; 3]> {
        self.planes
    }

    /// Corner points of plane `axis` at voxel `index`
    fn plane_geometry(&self, axis: usize, index: i32) -> ([f64; 3], [f64; 3], [f64; 3]) {
        let position = self.origin[axis] + index as f64 * self.spacing[axis];
        let mut origin = [self.bounds[0], self.bounds[2], self.bounds[4]];
        origin[axis] = position;

        let [lower, upper] = in_plane_axes(axis);
        let mut point1 = origin;
        point1[lower] = self.bounds[lower * 2 + 1];
        let mut point2 = origin;
        point2[upper] = self.bounds[upper * 2 + 1];
        (origin, point1, point2)
    }

    fn index_for(&self, axis: usize, cursor: [i32; 3]) -> i32 {
        clamp_index(cursor[axis] as i64, self.dims[axis])
    }
}

impl ModeHandler for ColoredPlanesHandler {
    fn mode(&self) -> VizMode {
        VizMode::ColoredPlanes
    }

    fn inject(&mut self, input: HandlerInput) {
        let HandlerInput::Raw(volume) = input else {
            tracing::debug!("colored planes handler ignores derived input");
            return;
        };
        let volume: &Volume = &volume;
        self.dims = volume.dims();
        self.origin = volume.origin();
        self.spacing = volume.spacing();
        self.bounds = volume.bounds();

        let center = volume.center_index();
        let planes = [0, 1, 2].map(|axis| {
            let (origin, point1, point2) = self.plane_geometry(axis, center[axis]);
            Prop::new(PropKind::Plane {
                origin,
                point1,
                point2,
                color: AXIS_COLORS[axis],
                opacity: self.opacity,
            })
            .pickable(true)
            .unlit()
        });
        self.planes = Some(planes.map(|plane| self.props.push(plane)));
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
        let Some(ids) = self.planes else {
            return;
        };
        if !flags.intersects(ChangeFlags::CURSOR | ChangeFlags::TRANSFORM) {
            return;
        }

        for (axis, id) in ids.into_iter().enumerate() {
            let geometry = flags
                .contains(ChangeFlags::CURSOR)
                .then(|| self.plane_geometry(axis, self.index_for(axis, params.cursor)));
            self.props.update(id, surface, |prop| {
                if let (Some((o, p1, p2)), PropKind::Plane { origin, point1, point2, .. }) =
                    (geometry, &mut prop.kind)
                {
                    *origin = o;
                    *point1 = p1;
                    *point2 = p2;
                }
                if flags.contains(ChangeFlags::TRANSFORM) {
                    prop.user_matrix = params.model_matrix;
                }
            });
        }
    }

    fn plane_axis(&self, prop: PropId) -> Option<usize> {
        self.planes?.iter().position(|id| *id == prop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::testing::MemorySurface;
    use std::sync::Arc;

    fn attached() -> (ColoredPlanesHandler, MemorySurface) {
        let volume = Volume::new([5, 4, 3], [0.5, 1.0, 2.0], [1.0, 0.0, 0.0], vec![0.0; 60]).unwrap();
        let mut handler = ColoredPlanesHandler::new(0.2);
        let mut surface = MemorySurface::default();
        handler.inject(HandlerInput::Raw(Arc::new(volume)));
        handler.attach(&mut surface);
        (handler, surface)
    }

    fn plane(surface: &MemorySurface, id: PropId) -> ([f64; 3], [f64; 3], [f64; 3], Rgb, f64) {
        match surface.props[&id].kind {
            PropKind::Plane {
                origin,
                point1,
                point2,
                color,
                opacity,
            } => (origin, point1, point2, color, opacity),
            _ => panic!("expected plane prop"),
        }
    }

    #[test]
    fn test_three_pickable_colored_planes() {
        let (handler, surface) = attached();
        let ids = handler.plane_props().unwrap();
        for (axis, id) in ids.into_iter().enumerate() {
            let (_, _, _, color, opacity) = plane(&surface, id);
            assert_eq!(color, AXIS_COLORS[axis]);
            assert_eq!(opacity, 0.2);
            assert!(surface.props[&id].pickable);
            assert!(!surface.props[&id].lit);
        }
    }

    #[test]
    fn test_plane_axis_lookup() {
        let (handler, _) = attached();
        let ids = handler.plane_props().unwrap();
        assert_eq!(handler.plane_axis(ids[0]), Some(0));
        assert_eq!(handler.plane_axis(ids[2]), Some(2));
        assert_eq!(handler.plane_axis(PropId::new()), None);
    }

    #[test]
    fn test_cursor_positions_planes() {
        let (mut handler, mut surface) = attached();
        let params = RenderParams {
            cursor: [2, 3, 1],
            ..Default::default()
        };
        handler.apply_change(&params, ChangeFlags::CURSOR, &mut surface);

        let ids = handler.plane_props().unwrap();
        // Bounds: x [1, 3], y [0, 3], z [0, 4]
        let (origin, point1, point2, _, _) = plane(&surface, ids[0]);
        assert_eq!(origin, [2.0, 0.0, 0.0]);
        assert_eq!(point1, [2.0, 3.0, 0.0]);
        assert_eq!(point2, [2.0, 0.0, 4.0]);

        let (origin, point1, point2, _, _) = plane(&surface, ids[2]);
        assert_eq!(origin, [1.0, 0.0, 2.0]);
        assert_eq!(point1, [3.0, 0.0, 2.0]);
        assert_eq!(point2, [1.0, 3.0, 2.0]);
    }

    #[test]
    fn test_transform_shared_by_all_planes() {
        let (mut handler, mut surface) = attached();
        let mut params = RenderParams::default();
        params.model_matrix[7] = 2.5;
        handler.apply_change(&params, ChangeFlags::TRANSFORM, &mut surface);

        for id in handler.plane_props().unwrap() {
            assert_eq!(surface.props[&id].user_matrix[7], 2.5);
        }
    }
}
