//! Per-window interaction state machine
//!
//! Classifies keyboard and pointer input into tool-mode transitions, slice
//! stepping, crosshair drags, reference-plane drags and model manipulation,
//! and turns them into [`ViewService`] mutations.
//!
//! [`EventOutcome::Ignored`] tells the host to forward the event to the
//! surface's own camera style or measuring widget.

use serde::{Deserialize, Serialize};

use crate::config::InteractionConfig;
use crate::input::{
    default_shortcuts, find_command, Command, InputState, Key, KeyEvent, MouseButton,
    MouseEvent, Shortcut,
};
use crate::service::{AxisLock, ViewService};
use crate::surface::{InteractionStyle, MeasureTool};

/// Active tool of a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToolMode {
    #[default]
    Navigation,
    DistanceMeasure,
    AngleMeasure,
    ModelTransform,
}

impl ToolMode {
    fn measure_tool(self) -> Option<MeasureTool> {
        match self {
            ToolMode::DistanceMeasure => Some(MeasureTool::Distance),
            ToolMode::AngleMeasure => Some(MeasureTool::Angle),
            _ => None,
        }
    }
}

/// What the current drag modifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DragKind {
    /// In-plane cursor axes of a slice view
    Crosshair,
    /// One cursor axis, set by the reference plane that was grabbed
    Plane(usize),
    /// All three cursor axes; only started programmatically
    Free,
    /// The model matrix, through the surface's actor manipulation
    ModelTransform,
}

/// Whether the machine used an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Consumed,
    Ignored,
}

impl EventOutcome {
    pub fn is_consumed(self) -> bool {
        self == EventOutcome::Consumed
    }
}

/// Interaction state of one window
#[derive(Debug)]
pub struct InteractionMachine {
    tool: ToolMode,
    drag: Option<DragKind>,
    shortcuts: Vec<Shortcut>,
    input: InputState,
    wheel_step: i32,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new(&InteractionConfig::default())
    }
}

impl InteractionMachine {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            tool: ToolMode::Navigation,
            drag: None,
            shortcuts: default_shortcuts(),
            input: InputState::new(),
            wheel_step: config.wheel_step,
        }
    }

    /// Replace the shortcut table
    pub fn with_shortcuts(mut self, shortcuts: Vec<Shortcut>) -> Self {
        self.shortcuts = shortcuts;
        self
    }

    pub fn tool_mode(&self) -> ToolMode {
        self.tool
    }

    pub fn drag(&self) -> Option<DragKind> {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    // ===== Tool modes =====

    /// Switch tools. Ends any drag and swaps the surface's tool or style.
    pub fn set_tool_mode(&mut self, view: &mut ViewService, tool: ToolMode) -> bool {
        if self.tool == tool {
            return false;
        }
        self.end_drag(view);

        match self.tool {
            ToolMode::ModelTransform => {
                view.set_manipulation(false);
            }
            previous => {
                if let Some(measure) = previous.measure_tool() {
                    view.surface_mut().set_tool_enabled(measure, false);
                }
            }
        }

        match tool {
            ToolMode::Navigation => {
                let style = view.navigation_style();
                view.surface_mut().set_interaction_style(style);
            }
            ToolMode::DistanceMeasure | ToolMode::AngleMeasure => {
                if let Some(measure) = tool.measure_tool() {
                    view.surface_mut().set_tool_enabled(measure, true);
                }
            }
            ToolMode::ModelTransform => {
                if view.main_prop().is_none() {
                    tracing::debug!("view {}: nothing to transform", view.name());
                }
                view.set_manipulation(true);
                view.surface_mut()
                    .set_interaction_style(InteractionStyle::Actor);
            }
        }

        tracing::info!("view {}: tool mode {:?} -> {:?}", view.name(), self.tool, tool);
        self.tool = tool;
        view.mark_dirty();
        true
    }

    fn execute(&mut self, view: &mut ViewService, command: Command) {
        match command {
            Command::EnterDistanceMeasure => {
                self.set_tool_mode(view, ToolMode::DistanceMeasure);
            }
            Command::EnterAngleMeasure => {
                self.set_tool_mode(view, ToolMode::AngleMeasure);
            }
            Command::EnterModelTransform => {
                self.set_tool_mode(view, ToolMode::ModelTransform);
            }
            Command::ReturnToNavigation => {
                self.set_tool_mode(view, ToolMode::Navigation);
            }
            Command::ResetModelTransform => {
                view.reset_model_transform();
            }
            Command::ResetCamera => view.reset_camera(),
        }
    }

    // ===== Events =====

    pub fn handle_key(&mut self, view: &mut ViewService, event: &KeyEvent) -> EventOutcome {
        self.input.handle_key(event);
        match find_command(event, &self.shortcuts) {
            Some(command) => {
                self.execute(view, command);
                EventOutcome::Consumed
            }
            None => EventOutcome::Ignored,
        }
    }

    pub fn handle_mouse(&mut self, view: &mut ViewService, event: &MouseEvent) -> EventOutcome {
        self.input.handle_mouse(event);
        match *event {
            MouseEvent::Wheel { delta, .. } => self.on_wheel(view, delta),
            MouseEvent::Press {
                button: MouseButton::Left,
                x,
                y,
                modifiers,
            } => {
                let shift = modifiers.shift || self.input.is_key_pressed(Key::Shift);
                self.on_press(view, x, y, shift)
            }
            MouseEvent::Move { x, y, .. } => self.on_move(view, x, y),
            MouseEvent::Release {
                button: MouseButton::Left,
                ..
            } => self.on_release(view),
            _ => EventOutcome::Ignored,
        }
    }

    fn on_wheel(&mut self, view: &mut ViewService, delta: i32) -> EventOutcome {
        if view.orientation().is_none() || delta == 0 {
            return EventOutcome::Ignored;
        }
        view.update_interaction(delta.saturating_mul(self.wheel_step));
        EventOutcome::Consumed
    }

    fn on_press(&mut self, view: &mut ViewService, x: f64, y: f64, shift: bool) -> EventOutcome {
        match self.tool {
            // The measuring widget owns the primary button
            ToolMode::DistanceMeasure | ToolMode::AngleMeasure => EventOutcome::Ignored,
            ToolMode::ModelTransform => {
                if view.main_prop().is_some() {
                    self.begin_drag(view, DragKind::ModelTransform);
                }
                // The surface's actor style performs the manipulation
                EventOutcome::Ignored
            }
            ToolMode::Navigation => match view.orientation() {
                Some(_) if shift => {
                    self.begin_drag(view, DragKind::Crosshair);
                    self.drag_to(view, x, y);
                    EventOutcome::Consumed
                }
                Some(_) => EventOutcome::Ignored,
                None => {
                    let axis = view.pick(x, y).and_then(|prop| view.plane_axis(prop));
                    match axis {
                        Some(axis) => {
                            self.begin_drag(view, DragKind::Plane(axis));
                            EventOutcome::Consumed
                        }
                        None => EventOutcome::Ignored,
                    }
                }
            },
        }
    }

    fn on_move(&mut self, view: &mut ViewService, x: f64, y: f64) -> EventOutcome {
        match self.drag {
            Some(DragKind::ModelTransform) => {
                self.sync_model_transform(view);
                EventOutcome::Ignored
            }
            Some(_) => {
                self.drag_to(view, x, y);
                EventOutcome::Consumed
            }
            None => EventOutcome::Ignored,
        }
    }

    fn on_release(&mut self, view: &mut ViewService) -> EventOutcome {
        match self.drag {
            Some(DragKind::ModelTransform) => {
                self.sync_model_transform(view);
                self.end_drag(view);
                EventOutcome::Ignored
            }
            Some(_) => {
                self.end_drag(view);
                EventOutcome::Consumed
            }
            None => EventOutcome::Ignored,
        }
    }

    /// Update the cursor from the pointer according to the current drag
    fn drag_to(&mut self, view: &mut ViewService, x: f64, y: f64) {
        let lock = match self.drag {
            Some(DragKind::Crosshair) => match view.orientation() {
                Some(orientation) => AxisLock::Except(orientation.axis()),
                None => return,
            },
            Some(DragKind::Plane(axis)) => AxisLock::Only(axis),
            Some(DragKind::Free) => AxisLock::All,
            Some(DragKind::ModelTransform) | None => return,
        };
        if let Some(world) = view.unproject(x, y) {
            view.sync_cursor_to_world(world, lock);
        }
    }

    // ===== Drags =====

    fn begin_drag(&mut self, view: &mut ViewService, kind: DragKind) {
        self.drag = Some(kind);
        view.set_interacting(true);
        tracing::debug!("view {}: begin {:?} drag", view.name(), kind);
    }

    /// End the current drag, if any
    pub fn end_drag(&mut self, view: &mut ViewService) {
        if let Some(kind) = self.drag.take() {
            view.set_interacting(false);
            tracing::debug!("view {}: end {:?} drag", view.name(), kind);
        }
    }

    /// Start a drag that moves all three cursor axes; ended by release
    pub fn begin_free_drag(&mut self, view: &mut ViewService) -> bool {
        if self.drag.is_some() || self.tool != ToolMode::Navigation {
            return false;
        }
        self.begin_drag(view, DragKind::Free);
        true
    }

    /// Push the surface's current prop matrix into the store.
    ///
    /// Hosts with a post-manipulation callback call this after each
    /// manipulation step.
    pub fn sync_model_transform(&mut self, view: &mut ViewService) -> bool {
        if self.tool != ToolMode::ModelTransform {
            return false;
        }
        view.sync_model_matrix()
    }
}
