//! orthosync-core - Multi-view volume synchronization engine
//!
//! Several windows (3D composite views, orthogonal 2D slice views) show one
//! in-memory volume in lock-step. Moving the cursor, editing the transfer
//! function, dragging a reference plane or transforming the model in any
//! window is reflected in all others.
//!
//! # Key Components
//!
//! - **VolumeHolder**: double-buffered owner of the current [`Volume`]
//! - **SharedInteractionState**: thread-safe store with [`ChangeFlags`] notification
//! - **HandlerRegistry**: per-view cache of mode handlers, one per [`VizMode`]
//! - **ViewService**: per-window mediator between input, store and surface
//! - **InteractionMachine**: tool modes, slice stepping and drags
//! - **RenderLoop**: timer-driven redraw coalescing with interactive fidelity
//!
//! # Data Flow
//!
//! input event → [`InteractionMachine`] → [`ViewService`] mutation →
//! [`SharedInteractionState`] → every live view records the flags →
//! the next [`RenderLoop`] tick pushes them into the active handler and redraws.
//!
//! Rendering, surface extraction and file formats live outside this crate,
//! behind the [`ViewSurface`], [`SurfaceExtractor`] and [`VolumeSource`] traits.

pub mod config;
pub mod error;
pub mod handler;
pub mod input;
pub mod interaction;
pub mod render_loop;
pub mod service;
pub mod state;
pub mod surface;
pub mod transform;
pub mod volume;

pub use config::{ConfigError, HandlerConfig, InteractionConfig, RenderLoopConfig, SyncConfig};
pub use error::{OrthoError, Result};
pub use handler::{HandlerInput, HandlerRegistry, ModeHandler, Orientation, VizMode};
pub use interaction::{DragKind, EventOutcome, InteractionMachine, ToolMode};
pub use render_loop::{RenderLoop, TickOutcome};
pub use service::{AxisLock, ViewId, ViewService, ViewServiceBuilder};
pub use state::{
    ChangeFlags, Material, Matrix4, ObserverId, RenderParams, SharedInteractionState, TfNode,
    IDENTITY,
};
pub use surface::{
    CameraPlacement, ColorPoint, InteractionStyle, MeasureTool, Mesh, OpacityPoint, Prop, PropId,
    PropKind, Rgb, SurfaceExtractor, ViewSurface,
};
pub use transform::ModelTransform;
pub use volume::{voxel_count, Volume, VolumeHolder, VolumeSource};
