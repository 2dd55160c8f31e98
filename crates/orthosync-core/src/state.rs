//! Shared interaction state with fine-grained change notification
//!
//! One [`SharedInteractionState`] is shared by every view of a dataset. It is
//! the single source of truth for the voxel cursor, transfer function, iso
//! threshold, material, model transform, scalar range and the `interacting`
//! flag.
//!
//! Every setter follows the same protocol:
//!
//! 1. lock and compare the new value against the current one,
//! 2. return without notifying when nothing changed,
//! 3. apply the change and copy the observer list, then unlock,
//! 4. invoke each live observer with the [`ChangeFlags`] that fired.
//!
//! Observers run outside the lock, so an observer may call back into a setter.
//! Observers hold only a weak reference to their owner; entries whose owner is
//! gone are pruned the next time a notification fires.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

bitflags! {
    /// Which fields of the shared state a mutation touched.
    ///
    /// Observers use the flags to apply partial updates instead of a full
    /// refresh.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ChangeFlags: u32 {
        /// Voxel-space cursor
        const CURSOR = 1 << 0;
        /// Transfer function nodes
        const TF = 1 << 1;
        /// Absolute iso threshold
        const ISO_VALUE = 1 << 2;
        /// Lighting and opacity
        const MATERIAL = 1 << 3;
        /// Model matrix
        const TRANSFORM = 1 << 4;
        /// Continuous drag started or ended
        const INTERACTION = 1 << 5;
        /// Scalar range of the loaded data
        const SCALAR_RANGE = 1 << 6;
    }
}

/// Row-major 4x4 matrix
pub type Matrix4 = [f64; 16];

/// Row-major identity matrix
pub const IDENTITY: Matrix4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Transfer function control point
///
/// `position` is normalized against the scalar range; all fields are in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TfNode {
    pub position: f64,
    pub opacity: f64,
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl TfNode {
    pub fn new(position: f64, opacity: f64, r: f64, g: f64, b: f64) -> Self {
        Self {
            position,
            opacity,
            r,
            g,
            b,
        }
    }

    pub fn rgb(&self) -> [f64; 3] {
        [self.r, self.g, self.b]
    }
}

/// Default ramp: transparent black to opaque white
pub fn default_transfer_function() -> Vec<TfNode> {
    vec![
        TfNode::new(0.0, 0.0, 0.0, 0.0, 0.0),
        TfNode::new(1.0, 1.0, 1.0, 1.0, 1.0),
    ]
}

/// Lighting and opacity parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub ambient: f64,
    pub diffuse: f64,
    pub specular: f64,
    pub specular_power: f64,
    pub opacity: f64,
    pub shade_on: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: 0.1,
            diffuse: 0.7,
            specular: 0.2,
            specular_power: 10.0,
            opacity: 1.0,
            shade_on: true,
        }
    }
}

/// Value snapshot of the shared state, handed to mode handlers
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub cursor: [i32; 3],
    pub scalar_range: (f64, f64),
    pub transfer_nodes: Vec<TfNode>,
    pub iso_value: f64,
    pub material: Material,
    pub model_matrix: Matrix4,
    pub interacting: bool,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            cursor: [0, 0, 0],
            scalar_range: (0.0, 1.0),
            transfer_nodes: default_transfer_function(),
            iso_value: 0.0,
            material: Material::default(),
            model_matrix: IDENTITY,
            interacting: false,
        }
    }
}

impl RenderParams {
    /// Map a normalized transfer-function position onto the scalar range
    pub fn scalar_at(&self, position: f64) -> f64 {
        let (min, max) = self.scalar_range;
        min + position * (max - min)
    }
}

/// Handle returned by observer registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverFn = dyn Fn(ChangeFlags) -> bool + Send + Sync;

struct ObserverEntry {
    id: ObserverId,
    // Returns false once the owner is gone
    notify: Arc<ObserverFn>,
}

struct Inner {
    params: RenderParams,
    observers: Vec<ObserverEntry>,
    next_observer_id: u64,
}

/// Lock a mutex, recovering the data if a panicking holder poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe store shared by all views of one dataset
pub struct SharedInteractionState {
    inner: Mutex<Inner>,
}

impl Default for SharedInteractionState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedInteractionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("SharedInteractionState")
            .field("params", &inner.params)
            .field("observers", &inner.observers.len())
            .finish()
    }
}

impl SharedInteractionState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                params: RenderParams::default(),
                observers: Vec::new(),
                next_observer_id: 1,
            }),
        }
    }

    // ===== Observers =====

    /// Register `callback` for as long as `owner` is alive.
    ///
    /// Registration does not extend the owner's lifetime.
    pub fn add_observer<T, F>(&self, owner: &Arc<T>, callback: F) -> ObserverId
    where
        T: Send + Sync + 'static,
        F: Fn(&T, ChangeFlags) + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(owner);
        let mut inner = lock(&self.inner);
        Self::push_observer(&mut inner, weak, callback)
    }

    /// Register through a weak handle. A dead (or never-alive) owner is a no-op.
    pub fn add_observer_weak<T, F>(&self, owner: Weak<T>, callback: F) -> Option<ObserverId>
    where
        T: Send + Sync + 'static,
        F: Fn(&T, ChangeFlags) + Send + Sync + 'static,
    {
        if owner.strong_count() == 0 {
            return None;
        }
        let mut inner = lock(&self.inner);
        Some(Self::push_observer(&mut inner, owner, callback))
    }

    fn push_observer<T, F>(inner: &mut Inner, owner: Weak<T>, callback: F) -> ObserverId
    where
        T: Send + Sync + 'static,
        F: Fn(&T, ChangeFlags) + Send + Sync + 'static,
    {
        let id = ObserverId(inner.next_observer_id);
        inner.next_observer_id += 1;

        let notify = move |flags: ChangeFlags| match owner.upgrade() {
            Some(owner) => {
                callback(&owner, flags);
                true
            }
            None => false,
        };
        inner.observers.push(ObserverEntry {
            id,
            notify: Arc::new(notify),
        });
        id
    }

    /// Remove an observer explicitly. Returns whether it was registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut inner = lock(&self.inner);
        let before = inner.observers.len();
        inner.observers.retain(|o| o.id != id);
        inner.observers.len() != before
    }

    /// Number of registered observers, including dead ones not yet pruned
    pub fn observer_count(&self) -> usize {
        lock(&self.inner).observers.len()
    }

    // ===== Mutation protocol =====

    /// Apply `change` under the lock; notify outside it when flags are non-empty.
    fn mutate<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut RenderParams) -> ChangeFlags,
    {
        let (flags, observers) = {
            let mut inner = lock(&self.inner);
            let flags = change(&mut inner.params);
            if flags.is_empty() {
                return false;
            }
            let observers: Vec<(ObserverId, Arc<ObserverFn>)> = inner
                .observers
                .iter()
                .map(|o| (o.id, Arc::clone(&o.notify)))
                .collect();
            (flags, observers)
        };

        self.dispatch(flags, observers);
        true
    }

    fn dispatch(&self, flags: ChangeFlags, observers: Vec<(ObserverId, Arc<ObserverFn>)>) {
        let dead: Vec<ObserverId> = observers
            .into_iter()
            .filter_map(|(id, notify)| if notify(flags) { None } else { Some(id) })
            .collect();

        if !dead.is_empty() {
            tracing::trace!(count = dead.len(), "pruning dead observers");
            lock(&self.inner).observers.retain(|o| !dead.contains(&o.id));
        }
    }

    fn read<R>(&self, f: impl FnOnce(&RenderParams) -> R) -> R {
        f(&lock(&self.inner).params)
    }

    /// Copy of the whole state
    pub fn snapshot(&self) -> RenderParams {
        self.read(Clone::clone)
    }

    // ===== Cursor =====

    pub fn cursor(&self) -> [i32; 3] {
        self.read(|p| p.cursor)
    }

    /// Set the cursor. Setting the current value notifies nobody.
    pub fn set_cursor(&self, cursor: [i32; 3]) -> bool {
        self.mutate(|p| {
            if p.cursor == cursor {
                return ChangeFlags::empty();
            }
            p.cursor = cursor;
            ChangeFlags::CURSOR
        })
    }

    /// Move one cursor component by `delta`, clamped to `[0, max_dim - 1]`.
    ///
    /// An axis outside 0..3 or an empty dimension is ignored.
    pub fn update_axis(&self, axis: usize, delta: i32, max_dim: usize) -> bool {
        if axis > 2 || max_dim == 0 {
            return false;
        }
        self.mutate(|p| {
            let next = clamp_index(p.cursor[axis] as i64 + delta as i64, max_dim);
            if next == p.cursor[axis] {
                return ChangeFlags::empty();
            }
            p.cursor[axis] = next;
            ChangeFlags::CURSOR
        })
    }

    /// Set the components `mask` selects in one step, each clamped to its
    /// dimension. Unselected components keep whatever the store holds.
    pub fn set_cursor_axes(&self, values: [i32; 3], mask: [bool; 3], dims: [usize; 3]) -> bool {
        self.mutate(|p| {
            let mut next = p.cursor;
            for axis in 0..3 {
                if mask[axis] && dims[axis] > 0 {
                    next[axis] = clamp_index(values[axis] as i64, dims[axis]);
                }
            }
            if next == p.cursor {
                return ChangeFlags::empty();
            }
            p.cursor = next;
            ChangeFlags::CURSOR
        })
    }

    /// Set one cursor component, clamped to `[0, max_dim - 1]`
    pub fn set_cursor_axis(&self, axis: usize, value: i32, max_dim: usize) -> bool {
        if axis > 2 || max_dim == 0 {
            return false;
        }
        self.mutate(|p| {
            let next = clamp_index(value as i64, max_dim);
            if next == p.cursor[axis] {
                return ChangeFlags::empty();
            }
            p.cursor[axis] = next;
            ChangeFlags::CURSOR
        })
    }

    // ===== Data range =====

    pub fn scalar_range(&self) -> (f64, f64) {
        self.read(|p| p.scalar_range)
    }

    /// Set the scalar range. A reversed pair is swapped; NaN is ignored.
    ///
    /// Transfer-function positions are normalized against the range, so a
    /// range change also reports `TF`.
    pub fn set_scalar_range(&self, min: f64, max: f64) -> bool {
        if min.is_nan() || max.is_nan() {
            return false;
        }
        let range = if min <= max { (min, max) } else { (max, min) };
        self.mutate(|p| {
            if p.scalar_range == range {
                return ChangeFlags::empty();
            }
            p.scalar_range = range;
            ChangeFlags::SCALAR_RANGE | ChangeFlags::TF
        })
    }

    // ===== Transfer function =====

    pub fn transfer_nodes(&self) -> Vec<TfNode> {
        self.read(|p| p.transfer_nodes.clone())
    }

    /// Replace the transfer function. Node ordering is the caller's concern.
    pub fn set_transfer_function(&self, nodes: Vec<TfNode>) -> bool {
        self.mutate(|p| {
            if p.transfer_nodes == nodes {
                return ChangeFlags::empty();
            }
            p.transfer_nodes = nodes;
            ChangeFlags::TF
        })
    }

    // ===== Iso threshold =====

    pub fn iso_value(&self) -> f64 {
        self.read(|p| p.iso_value)
    }

    pub fn set_iso_value(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        self.mutate(|p| {
            if p.iso_value == value {
                return ChangeFlags::empty();
            }
            p.iso_value = value;
            ChangeFlags::ISO_VALUE
        })
    }

    // ===== Material =====

    pub fn material(&self) -> Material {
        self.read(|p| p.material)
    }

    pub fn set_material(&self, material: Material) -> bool {
        self.mutate(|p| {
            if p.material == material {
                return ChangeFlags::empty();
            }
            p.material = material;
            ChangeFlags::MATERIAL
        })
    }

    /// Update lighting while keeping the current opacity
    pub fn set_lighting(
        &self,
        ambient: f64,
        diffuse: f64,
        specular: f64,
        specular_power: f64,
        shade_on: bool,
    ) -> bool {
        self.mutate(|p| {
            let next = Material {
                ambient,
                diffuse,
                specular,
                specular_power,
                shade_on,
                opacity: p.material.opacity,
            };
            if p.material == next {
                return ChangeFlags::empty();
            }
            p.material = next;
            ChangeFlags::MATERIAL
        })
    }

    /// Set the global opacity, clamped to `[0, 1]`
    pub fn set_opacity(&self, opacity: f64) -> bool {
        if opacity.is_nan() {
            return false;
        }
        let opacity = opacity.clamp(0.0, 1.0);
        self.mutate(|p| {
            if p.material.opacity == opacity {
                return ChangeFlags::empty();
            }
            p.material.opacity = opacity;
            ChangeFlags::MATERIAL
        })
    }

    // ===== Model transform =====

    pub fn model_matrix(&self) -> Matrix4 {
        self.read(|p| p.model_matrix)
    }

    pub fn set_model_matrix(&self, matrix: Matrix4) -> bool {
        self.mutate(|p| {
            if p.model_matrix == matrix {
                return ChangeFlags::empty();
            }
            p.model_matrix = matrix;
            ChangeFlags::TRANSFORM
        })
    }

    pub fn reset_model_matrix(&self) -> bool {
        self.set_model_matrix(IDENTITY)
    }

    // ===== Interaction =====

    pub fn is_interacting(&self) -> bool {
        self.read(|p| p.interacting)
    }

    pub fn set_interacting(&self, interacting: bool) -> bool {
        self.mutate(|p| {
            if p.interacting == interacting {
                return ChangeFlags::empty();
            }
            p.interacting = interacting;
            ChangeFlags::INTERACTION
        })
    }
}

/// Clamp an index to `[0, dim - 1]`; `dim == 0` yields 0
pub fn clamp_index(value: i64, dim: usize) -> i32 {
    let max = dim.saturating_sub(1).min(i32::MAX as usize) as i64;
    value.clamp(0, max) as i32
}
