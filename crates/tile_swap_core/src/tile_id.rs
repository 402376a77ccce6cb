//! Tile ids and the conversion from human tile references
//!
//! Tiles live in one flat id space:
//! - pages B-E: `page_size` ids each, starting at 0
//! - page A indices 129 and up: fixed tiles starting at `fixed_tile_base`
//! - page A indices 1-128: autotile families of [`AUTOTILE_VARIANTS`] ids each,
//!   starting at `autotile_base`

use crate::error::{Result, TileSwapError};
use crate::grid::{TileGrid, REGION_CHANNEL, REGION_SHIFT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A tile id as stored in grid cells
pub type TileId = u32;

/// Number of pre-drawn variants per autotile family
pub const AUTOTILE_VARIANTS: u32 = 48;
/// Number of autotile families on page A
pub const AUTOTILE_FAMILIES: u32 = 128;

/// A tileset page, `A` through `E`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TilePage {
    A,
    B,
    C,
    D,
    E,
}

impl TilePage {
    /// Case-insensitive page letter
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(TilePage::A),
            'B' => Some(TilePage::B),
            'C' => Some(TilePage::C),
            'D' => Some(TilePage::D),
            'E' => Some(TilePage::E),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            TilePage::A => 'A',
            TilePage::B => 'B',
            TilePage::C => 'C',
            TilePage::D => 'D',
            TilePage::E => 'E',
        }
    }
}

/// A tile as a caller names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileRef {
    /// Page letter and 1-based index, e.g. `"A1"` or `"c12"`
    Named { page: TilePage, index: u32 },
    /// Whatever tile currently sits at this cell of the live map
    Cell { x: u32, y: u32 },
}

impl TileRef {
    pub fn named(page: TilePage, index: u32) -> Self {
        TileRef::Named { page, index }
    }

    pub fn cell(x: u32, y: u32) -> Self {
        TileRef::Cell { x, y }
    }
}

impl From<(u32, u32)> for TileRef {
    fn from((x, y): (u32, u32)) -> Self {
        TileRef::Cell { x, y }
    }
}

impl FromStr for TileRef {
    type Err = TileSwapError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || TileSwapError::InvalidTileReference(s.to_string());

        let mut chars = trimmed.chars();
        let page = chars
            .next()
            .and_then(TilePage::from_letter)
            .ok_or_else(invalid)?;
        let index: u32 = chars.as_str().parse().map_err(|_| invalid())?;
        if index == 0 {
            return Err(invalid());
        }
        Ok(TileRef::Named { page, index })
    }
}

impl fmt::Display for TileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileRef::Named { page, index } => write!(f, "{}{}", page.letter(), index),
            TileRef::Cell { x, y } => write!(f, "[{x}, {y}]"),
        }
    }
}

/// Offsets of the flat tile id space and of the region channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLayout {
    /// First id of autotile family 0
    pub autotile_base: TileId,
    /// First id of the fixed page-A tiles (index 129 and up)
    pub fixed_tile_base: TileId,
    /// Ids per plain page (B-E) and fixed tiles on page A
    pub page_size: u32,
    /// Metadata channel holding region ids
    pub region_channel: usize,
    /// Right shift applied to the region channel value
    pub region_shift: u32,
}

impl Default for TileLayout {
    fn default() -> Self {
        Self {
            autotile_base: 2048,
            fixed_tile_base: 1536,
            page_size: 256,
            region_channel: REGION_CHANNEL,
            region_shift: REGION_SHIFT,
        }
    }
}

impl TileLayout {
    /// Convert a tile reference into a tile id.
    ///
    /// Cell references read the raw value at `(x, y, layer)` of `grid`.
    pub fn resolve<G: TileGrid + ?Sized>(
        &self,
        tile: &TileRef,
        layer: usize,
        grid: &G,
    ) -> Result<TileId> {
        match *tile {
            TileRef::Cell { x, y } => {
                if !grid.contains(x, y) {
                    return Err(TileSwapError::CellOutOfBounds { x, y, layer });
                }
                Ok(grid.tile_id(x, y, layer))
            }
            TileRef::Named { page, index } => self.named_id(page, index).ok_or_else(|| {
                TileSwapError::InvalidTileReference(tile.to_string())
            }),
        }
    }

    /// Id of a page/index pair, `None` when the index is outside the page
    pub fn named_id(&self, page: TilePage, index: u32) -> Option<TileId> {
        if index == 0 {
            return None;
        }
        let tid = index - 1;
        match page {
            TilePage::A if tid < AUTOTILE_FAMILIES => Some(self.autotile_id(tid, 0)),
            TilePage::A if tid < AUTOTILE_FAMILIES + self.page_size => {
                Some(self.fixed_tile_base + tid - AUTOTILE_FAMILIES)
            }
            TilePage::A => None,
            _ if tid >= self.page_size => None,
            TilePage::B => Some(tid),
            TilePage::C => Some(self.page_size + tid),
            TilePage::D => Some(2 * self.page_size + tid),
            TilePage::E => Some(3 * self.page_size + tid),
        }
    }

    pub fn is_autotile(&self, tile: TileId) -> bool {
        self.autotile_family(tile).is_some()
    }

    /// Family of an autotile id, `None` for plain tiles
    pub fn autotile_family(&self, tile: TileId) -> Option<u32> {
        let family = tile.checked_sub(self.autotile_base)? / AUTOTILE_VARIANTS;
        (family < AUTOTILE_FAMILIES).then_some(family)
    }

    /// Id of variant `index` of autotile `family`
    pub fn autotile_id(&self, family: u32, index: u8) -> TileId {
        self.autotile_base + family * AUTOTILE_VARIANTS + index as u32
    }

    /// Strip the autotile variant so ids compare by family
    pub fn normalize(&self, tile: TileId) -> TileId {
        match self.autotile_family(tile) {
            Some(family) => self.autotile_id(family, 0),
            None => tile,
        }
    }

    /// Region id of a cell
    pub fn region_id<G: TileGrid + ?Sized>(&self, grid: &G, x: u32, y: u32) -> u32 {
        grid.metadata(x, y, self.region_channel) >> self.region_shift
    }
}
