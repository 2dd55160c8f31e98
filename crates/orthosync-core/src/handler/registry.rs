use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use super::{
    ColoredPlanesHandler, CompositeHandler, HandlerInput, IsoSurfaceHandler, ModeHandler,
    MultiSliceHandler, SliceHandler, VizMode, VolumeRenderHandler,
};
use crate::config::HandlerConfig;
use crate::error::Result;
use crate::surface::SurfaceExtractor;
use crate::volume::Volume;

/// Lazily built, per-view cache of mode handlers
pub struct HandlerRegistry {
    config: HandlerConfig,
    cache: HashMap<VizMode, Box<dyn ModeHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("config", &self.config)
            .field("cached", &self.cache.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HandlerRegistry {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            config,
            cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Extraction threshold for a new surface handler.
    ///
    /// Keeps `current` when it lies inside the range, otherwise picks the
    /// configured fraction of the range.
    pub fn initial_iso(&self, range: (f64, f64), current: f64) -> f64 {
        let (min, max) = range;
        if current.is_finite() && current >= min && current <= max {
            current
        } else {
            min + (max - min) * self.config.iso_fraction
        }
    }

    /// Cached handler for `mode`, building and injecting it on first use.
    ///
    /// A failed extraction leaves nothing cached.
    pub fn get_or_create(
        &mut self,
        mode: VizMode,
        volume: &Arc<Volume>,
        iso_value: f64,
        extractor: &dyn SurfaceExtractor,
    ) -> Result<&mut dyn ModeHandler> {
        let handler = match self.cache.entry(mode) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let handler = Self::build(&self.config, mode, volume, iso_value, extractor)?;
                entry.insert(handler)
            }
        };
        Ok(handler.as_mut())
    }

    pub fn get(&self, mode: VizMode) -> Option<&dyn ModeHandler> {
        self.cache.get(&mode).map(|h| h.as_ref())
    }

    pub fn get_mut(&mut self, mode: VizMode) -> Option<&mut dyn ModeHandler> {
        match self.cache.get_mut(&mode) {
            Some(handler) => Some(handler.as_mut()),
            None => None,
        }
    }

    pub fn contains(&self, mode: VizMode) -> bool {
        self.cache.contains_key(&mode)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every cached handler
    pub fn clear(&mut self) {
        if !self.cache.is_empty() {
            tracing::debug!("clearing {} cached handlers", self.cache.len());
        }
        self.cache.clear();
    }

    fn build(
        config: &HandlerConfig,
        mode: VizMode,
        volume: &Arc<Volume>,
        iso_value: f64,
        extractor: &dyn SurfaceExtractor,
    ) -> Result<Box<dyn ModeHandler>> {
        let input = if mode.needs_mesh() {
            let mesh = extractor.extract(volume, iso_value)?;
            tracing::debug!(
                "extracted {} triangles at iso {}",
                mesh.triangles.len(),
                iso_value
            );
            HandlerInput::Derived {
                mesh: Arc::new(mesh),
                source: Arc::clone(volume),
            }
        } else {
            HandlerInput::Raw(Arc::clone(volume))
        };

        let mut handler = Self::instantiate(config, mode);
        handler.inject(input);
        tracing::debug!("created {} handler", mode);
        Ok(handler)
    }

    fn instantiate(config: &HandlerConfig, mode: VizMode) -> Box<dyn ModeHandler> {
        let planes = || ColoredPlanesHandler::new(config.plane_opacity);
        match mode {
            VizMode::Volume => Box::new(VolumeRenderHandler::new()),
            VizMode::IsoSurface => Box::new(IsoSurfaceHandler::new()),
            VizMode::Slice(orientation) => {
                Box::new(SliceHandler::new(orientation, config.crosshair_layer_offset))
            }
            VizMode::MultiSlice => Box::new(MultiSliceHandler::new()),
            VizMode::ColoredPlanes => Box::new(planes()),
            VizMode::CompositeVolume => Box::new(CompositeHandler::new(
                mode,
                Box::new(VolumeRenderHandler::new()),
                planes(),
            )),
            VizMode::CompositeIsoSurface => Box::new(CompositeHandler::new(
                mode,
                Box::new(IsoSurfaceHandler::new()),
                planes(),
            )),
        }
    }
}
