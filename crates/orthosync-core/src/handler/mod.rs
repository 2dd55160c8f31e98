//! Mode handlers
//!
//! A mode handler presents one visualization mode inside one view. It owns
//! its props, keeps only derived local geometry (slice index, plane
//! positions) and reacts to filtered [`ChangeFlags`] pushed by the view.
//!
//! Handlers are created and cached per [`VizMode`] by the
//! [`HandlerRegistry`].

mod colored_planes;
mod composite;
mod iso_surface;
mod multi_slice;
mod registry;
mod slice;
mod volume_render;

pub use colored_planes::ColoredPlanesHandler;
pub use composite::CompositeHandler;
pub use iso_surface::IsoSurfaceHandler;
pub use multi_slice::MultiSliceHandler;
pub use registry::HandlerRegistry;
pub use slice::SliceHandler;
pub use volume_render::VolumeRenderHandler;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::{ChangeFlags, RenderParams};
use crate::surface::{ColorPoint, Mesh, OpacityPoint, Prop, PropId, PropKind, Rgb, ViewSurface};
use crate::volume::Volume;

/// Per-axis colors shared by reference planes and crosshair lines
pub const AXIS_COLORS: [Rgb; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Slice orientation; the discriminant is the cursor axis the slice follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Sagittal = 0,
    Coronal = 1,
    Axial = 2,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Sagittal,
        Orientation::Coronal,
        Orientation::Axial,
    ];

    /// Cursor component this orientation slices along
    pub fn axis(self) -> usize {
        self as usize
    }

    pub fn from_axis(axis: usize) -> Option<Self> {
        Self::ALL.get(axis).copied()
    }

    /// The two in-plane axes, lower first
    pub fn in_plane_axes(self) -> [usize; 2] {
        in_plane_axes(self.axis())
    }

    pub fn name(self) -> &'static str {
        match self {
            Orientation::Sagittal => "sagittal",
            Orientation::Coronal => "coronal",
            Orientation::Axial => "axial",
        }
    }
}

/// Visualization mode of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VizMode {
    Volume,
    IsoSurface,
    Slice(Orientation),
    MultiSlice,
    ColoredPlanes,
    /// Volume rendering plus reference planes
    CompositeVolume,
    /// Extracted surface plus reference planes
    CompositeIsoSurface,
}

impl VizMode {
    /// Whether the handler for this mode needs an extracted mesh
    pub fn needs_mesh(self) -> bool {
        matches!(self, VizMode::IsoSurface | VizMode::CompositeIsoSurface)
    }

    pub fn is_composite(self) -> bool {
        matches!(self, VizMode::CompositeVolume | VizMode::CompositeIsoSurface)
    }

    pub fn orientation(self) -> Option<Orientation> {
        match self {
            VizMode::Slice(orientation) => Some(orientation),
            _ => None,
        }
    }
}

impl std::fmt::Display for VizMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VizMode::Volume => write!(f, "volume"),
            VizMode::IsoSurface => write!(f, "iso-surface"),
            VizMode::Slice(o) => write!(f, "slice ({})", o.name()),
            VizMode::MultiSlice => write!(f, "multi-slice"),
            VizMode::ColoredPlanes => write!(f, "colored planes"),
            VizMode::CompositeVolume => write!(f, "composite volume"),
            VizMode::CompositeIsoSurface => write!(f, "composite iso-surface"),
        }
    }
}

/// Data injected into a freshly created handler
#[derive(Debug, Clone)]
pub enum HandlerInput {
    Raw(Arc<Volume>),
    /// Extracted mesh together with the volume it came from
    Derived { mesh: Arc<Mesh>, source: Arc<Volume> },
}

impl HandlerInput {
    pub fn source(&self) -> &Arc<Volume> {
        match self {
            HandlerInput::Raw(volume) => volume,
            HandlerInput::Derived { source, .. } => source,
        }
    }
}

/// One visualization mode presented in one view
///
/// Call order is `inject`, then `attach`, `setup_camera`, and any number of
/// `apply_change` calls, then `detach`. Input of the wrong kind is ignored.
pub trait ModeHandler: Send {
    fn mode(&self) -> VizMode;

    /// Hand the handler its data; called once, before `attach`
    fn inject(&mut self, input: HandlerInput);

    /// Add this handler's props to the surface
    fn attach(&mut self, surface: &mut dyn ViewSurface);

    /// Remove this handler's props from the surface
    fn detach(&mut self, surface: &mut dyn ViewSurface);

    /// Projection, camera placement and background for this mode
    fn setup_camera(&self, surface: &mut dyn ViewSurface);

    /// React to the fields named in `flags`
    fn apply_change(
        &mut self,
        params: &RenderParams,
        flags: ChangeFlags,
        surface: &mut dyn ViewSurface,
    );

    /// Cursor axis of the reference plane `prop`, if it is one
    fn plane_axis(&self, _prop: PropId) -> Option<usize> {
        None
    }

    /// The prop model-transform mode manipulates
    fn main_prop(&self) -> Option<PropId> {
        None
    }

    /// Make the main prop pickable for manipulation, or restore its own
    /// pickability. The change is kept in the cached prop so later pushes
    /// carry it.
    fn set_manipulable(&mut self, _enabled: bool, _surface: &mut dyn ViewSurface) {}

    fn orientation(&self) -> Option<Orientation> {
        self.mode().orientation()
    }
}

/// Props owned by a handler, kept in sync with the surface while attached
#[derive(Debug, Default)]
pub(crate) struct PropSet {
    props: Vec<Prop>,
    attached: bool,
    /// Prop made pickable for manipulation, with its own pickability
    manipulated: Option<(PropId, bool)>,
}

impl PropSet {
    pub fn push(&mut self, prop: Prop) -> PropId {
        let id = prop.id;
        self.props.push(prop);
        id
    }

    pub fn get(&self, id: PropId) -> Option<&Prop> {
        self.props.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: PropId) -> bool {
        self.get(id).is_some()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn attach(&mut self, surface: &mut dyn ViewSurface) {
        if self.attached {
            return;
        }
        for prop in &self.props {
            surface.add_prop(prop);
        }
        self.attached = true;
    }

    pub fn detach(&mut self, surface: &mut dyn ViewSurface) {
        if !self.attached {
            return;
        }
        for prop in &self.props {
            surface.remove_prop(prop.id);
        }
        self.attached = false;
    }

    /// Edit a prop and forward it to the surface when attached
    pub fn update<F>(&mut self, id: PropId, surface: &mut dyn ViewSurface, edit: F)
    where
        F: FnOnce(&mut Prop),
    {
        let attached = self.attached;
        if let Some(prop) = self.props.iter_mut().find(|p| p.id == id) {
            edit(prop);
            if attached {
                surface.update_prop(prop);
            }
        }
    }

    /// Force `id` pickable while manipulated; restore it afterwards
    pub fn set_manipulable(&mut self, id: PropId, enabled: bool, surface: &mut dyn ViewSurface) {
        let target = if enabled {
            let Some(own) = self.get(id).map(|p| p.pickable) else {
                return;
            };
            if self.manipulated.is_none() {
                self.manipulated = Some((id, own));
            }
            Some((id, true))
        } else {
            self.manipulated.take()
        };

        let Some((id, pickable)) = target else {
            return;
        };
        let attached = self.attached;
        if let Some(prop) = self.props.iter_mut().find(|p| p.id == id) {
            prop.pickable = pickable;
            if attached {
                surface.set_pickable(id, pickable);
            }
        }
    }
}

/// Unpickable labelled axes around the volume bounds
pub(crate) fn axes_prop(volume: &Volume) -> Prop {
    Prop::new(PropKind::Axes {
        bounds: volume.bounds(),
    })
    .unlit()
}

/// Transfer-function nodes mapped onto absolute scalar values
pub fn color_points(params: &RenderParams) -> Vec<ColorPoint> {
    params
        .transfer_nodes
        .iter()
        .map(|node| ColorPoint {
            scalar: params.scalar_at(node.position),
            rgb: node.rgb(),
        })
        .collect()
}

/// Transfer-function opacities scaled by the global material opacity
pub fn opacity_points(params: &RenderParams) -> Vec<OpacityPoint> {
    params
        .transfer_nodes
        .iter()
        .map(|node| OpacityPoint {
            scalar: params.scalar_at(node.position),
            opacity: node.opacity * params.material.opacity,
        })
        .collect()
}

/// The two axes other than `axis`, lower first
pub fn in_plane_axes(axis: usize) -> [usize; 2] {
    match axis {
        0 => [1, 2],
        1 => [0, 2],
        _ => [0, 1],
    }
}
