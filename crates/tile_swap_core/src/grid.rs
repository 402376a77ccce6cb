//! Grid storage: the host-facing trait and an in-memory implementation

use crate::error::{Result, TileSwapError};
use crate::TileId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Channel that carries region ids in [`MapData`] (shadow bits in the low byte)
pub const REGION_CHANNEL: usize = 3;
/// Region id = metadata value `>> REGION_SHIFT`
pub const REGION_SHIFT: u32 = 8;
/// Three tile layers plus the region channel
pub const DEFAULT_DEPTH: usize = 4;

/// The read/write surface the compositor uses on live map state.
///
/// Out-of-range reads return `0`; out-of-range writes are ignored.
pub trait TileGrid {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Raw tile id at `(x, y)` on `layer`
    fn tile_id(&self, x: u32, y: u32, layer: usize) -> TileId;

    fn set_tile_id(&mut self, x: u32, y: u32, layer: usize, tile: TileId);

    /// Raw value of a metadata channel (region ids, shadows, ...)
    fn metadata(&self, x: u32, y: u32, channel: usize) -> u32;

    /// Discard every runtime change and restore the authored tile data
    fn reload_raw_data(&mut self) -> Result<()>;

    fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height()
    }
}

/// A map's cell storage: `depth` channels of `width * height` values, plus the
/// pristine copy used by [`TileGrid::reload_raw_data`].
///
/// The pristine copy is taken by [`MapData::from_json`] and
/// [`MapData::commit_pristine`]. Without either, it is taken right before the
/// first [`TileGrid::set_tile_id`], so `fill_layer` and `set_region` count as
/// authoring and a reload never wipes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapData {
    width: u32,
    height: u32,
    depth: usize,
    data: Vec<TileId>,
    #[serde(skip)]
    pristine: Option<Vec<TileId>>,
}

impl MapData {
    /// Create an empty map with [`DEFAULT_DEPTH`] channels
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_depth(width, height, DEFAULT_DEPTH)
    }

    pub fn with_depth(width: u32, height: u32, depth: usize) -> Self {
        let size = width as usize * height as usize * depth;
        Self {
            width,
            height,
            depth,
            data: vec![0; size],
            pristine: None,
        }
    }

    /// Parse map data from JSON; the parsed tiles become the pristine copy
    pub fn from_json(json: &str) -> Result<Self> {
        let mut map: MapData = serde_json::from_str(json)?;
        map.check_len()?;
        map.commit_pristine();
        Ok(map)
    }

    /// Load map data from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let map = Self::from_json(&content)?;
        debug!(path = %path.display(), width = map.width, height = map.height, "map data loaded");
        Ok(map)
    }

    /// Serialize the current (not pristine) tiles
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Fill one layer from row-major tile ids. Extra values are ignored.
    pub fn fill_layer(&mut self, layer: usize, tiles: &[TileId]) {
        for (i, tile) in tiles.iter().enumerate() {
            let x = (i % self.width as usize) as u32;
            let y = (i / self.width as usize) as u32;
            self.write(x, y, layer, *tile);
        }
    }

    /// Write a region id into the region channel, keeping the low byte
    pub fn set_region(&mut self, x: u32, y: u32, region: u32) {
        if let Some(idx) = self.index(x, y, REGION_CHANNEL) {
            let low = self.data[idx] & ((1 << REGION_SHIFT) - 1);
            self.data[idx] = low | (region << REGION_SHIFT);
        }
    }

    /// Treat the current contents as the authored data
    pub fn commit_pristine(&mut self) {
        self.pristine = Some(self.data.clone());
    }

    /// Row-major snapshot of one layer
    pub fn layer(&self, layer: usize) -> Vec<TileId> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                out.push(self.tile_id(x, y, layer));
            }
        }
        out
    }

    fn index(&self, x: u32, y: u32, channel: usize) -> Option<usize> {
        if x >= self.width || y >= self.height || channel >= self.depth {
            return None;
        }
        let plane = self.width as usize * self.height as usize;
        Some(channel * plane + y as usize * self.width as usize + x as usize)
    }

    fn write(&mut self, x: u32, y: u32, layer: usize, tile: TileId) {
        if let Some(idx) = self.index(x, y, layer) {
            self.data[idx] = tile;
        }
    }

    fn check_len(&self) -> Result<()> {
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|plane| plane.checked_mul(self.depth));
        if expected != Some(self.data.len()) {
            return Err(TileSwapError::MapDataLength {
                width: self.width,
                height: self.height,
                depth: self.depth,
                found: self.data.len(),
            });
        }
        Ok(())
    }
}

impl TileGrid for MapData {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn tile_id(&self, x: u32, y: u32, layer: usize) -> TileId {
        self.index(x, y, layer).map(|i| self.data[i]).unwrap_or(0)
    }

    fn set_tile_id(&mut self, x: u32, y: u32, layer: usize, tile: TileId) {
        if self.pristine.is_none() {
            self.commit_pristine();
        }
        self.write(x, y, layer, tile);
    }

    fn metadata(&self, x: u32, y: u32, channel: usize) -> u32 {
        self.tile_id(x, y, channel)
    }

    fn reload_raw_data(&mut self) -> Result<()> {
        if let Some(pristine) = &self.pristine {
            self.data.clone_from(pristine);
        }
        Ok(())
    }
}
