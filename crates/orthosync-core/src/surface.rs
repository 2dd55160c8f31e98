//! Drawing surface and data-conversion collaborators
//!
//! The engine never draws. Mode handlers describe what they want shown as
//! [`Prop`] descriptors and hand them to a [`ViewSurface`], which owns the
//! real rendering pipeline (scene graph, camera, pickers, measuring widgets).

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::state::{Material, Matrix4, IDENTITY};
use crate::volume::Volume;

/// RGB color with components in `[0, 1]`
pub type Rgb = [f64; 3];

static NEXT_PROP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a drawable prop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropId(u64);

impl PropId {
    pub fn new() -> Self {
        Self(NEXT_PROP_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for PropId {
    fn default() -> Self {
        Self::new()
    }
}

/// Triangle mesh produced by a [`SurfaceExtractor`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<[f32; 3]>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

/// Scalar-to-color control point in absolute scalar units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorPoint {
    pub scalar: f64,
    pub rgb: Rgb,
}

/// Scalar-to-opacity control point in absolute scalar units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpacityPoint {
    pub scalar: f64,
    pub opacity: f64,
}

/// What a prop draws
#[derive(Debug, Clone)]
pub enum PropKind {
    /// Composited volume
    Volume {
        volume: Arc<Volume>,
        color_points: Vec<ColorPoint>,
        opacity_points: Vec<OpacityPoint>,
    },
    /// Extracted surface
    Mesh {
        mesh: Arc<Mesh>,
        iso_value: f64,
        color: Rgb,
    },
    /// Axis-aligned resliced image
    Slice {
        volume: Arc<Volume>,
        axis: usize,
        index: i32,
        lookup: Vec<ColorPoint>,
    },
    /// Line segment in world space
    Line {
        from: [f64; 3],
        to: [f64; 3],
        color: Rgb,
        width: f64,
    },
    /// Parallelogram spanned by `origin -> point1` and `origin -> point2`
    Plane {
        origin: [f64; 3],
        point1: [f64; 3],
        point2: [f64; 3],
        color: Rgb,
        opacity: f64,
    },
    /// Labelled bounding-box axes, `[xmin, xmax, ymin, ymax, zmin, zmax]`
    Axes { bounds: [f64; 6] },
}

/// Drawable resource descriptor owned by a mode handler
#[derive(Debug, Clone)]
pub struct Prop {
    pub id: PropId,
    pub kind: PropKind,
    pub material: Material,
    /// Row-major model matrix applied on top of the prop's own placement
    pub user_matrix: Matrix4,
    pub pickable: bool,
    /// Unlit props ignore ambient/diffuse/specular
    pub lit: bool,
}

impl Prop {
    pub fn new(kind: PropKind) -> Self {
        Self {
            id: PropId::new(),
            kind,
            material: Material::default(),
            user_matrix: IDENTITY,
            pickable: false,
            lit: true,
        }
    }

    pub fn pickable(mut self, pickable: bool) -> Self {
        self.pickable = pickable;
        self
    }

    pub fn unlit(mut self) -> Self {
        self.lit = false;
        self
    }
}

/// Camera navigation style installed on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionStyle {
    /// Rotate/zoom/pan a 3D scene
    Trackball,
    /// Pan/zoom a 2D image
    Image2D,
    /// Move the picked prop instead of the camera
    Actor,
}

/// Measuring widgets the surface provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureTool {
    Distance,
    Angle,
}

/// Explicit camera placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPlacement {
    pub focal_point: [f64; 3],
    pub position: [f64; 3],
    pub view_up: [f64; 3],
}

/// Drawing surface of one view window
///
/// Coordinates passed to `pick` and `unproject` are display coordinates of
/// the window.
pub trait ViewSurface: Send {
    fn add_prop(&mut self, prop: &Prop);
    fn update_prop(&mut self, prop: &Prop);
    fn remove_prop(&mut self, id: PropId);
    fn remove_all_props(&mut self);

    fn set_parallel_projection(&mut self, parallel: bool);
    fn place_camera(&mut self, placement: CameraPlacement);
    /// Frame all visible props
    fn reset_camera(&mut self);
    fn set_background(&mut self, color: Rgb);

    fn set_interaction_style(&mut self, style: InteractionStyle);
    fn set_tool_enabled(&mut self, tool: MeasureTool, enabled: bool);
    fn set_pickable(&mut self, id: PropId, pickable: bool);

    /// Prop under the pointer, if any pickable prop is hit
    fn pick(&mut self, x: f64, y: f64) -> Option<PropId>;
    /// World position under the pointer
    fn unproject(&mut self, x: f64, y: f64) -> Option<[f64; 3]>;
    /// Current user matrix of a prop, including interactive manipulation
    fn prop_matrix(&self, id: PropId) -> Option<Matrix4>;

    /// Frames per second the renderer should aim for
    fn set_desired_update_rate(&mut self, rate: f64);
    /// Whether the window is visible and able to render
    fn is_mapped(&self) -> bool;
    fn render(&mut self);
}

/// Converts a volume into a surface mesh at a scalar threshold
pub trait SurfaceExtractor: Send + Sync {
    fn extract(&self, volume: &Volume, iso_value: f64) -> Result<Mesh>;
}
