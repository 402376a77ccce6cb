//! Autotile variant selection
//!
//! Every autotile family has 48 pre-drawn variants. Which one a cell shows
//! depends on which neighbours belong to the same family. The family's shape
//! class decides which neighbours are looked at:
//!
//! - waterfalls only join left and right (4 variants)
//! - walls join on all four sides; a wall's companion top piece (family - 8)
//!   does not break the wall horizontally (16 variants)
//! - everything else is a blob autotile: four cardinal edges, and for each
//!   edge combination the diagonal corners that can still be open

use tile_swap_core::{Direction, MaskCell, TileGrid, TileId, TileLayout};

/// Edge flags of the cardinal edge bitmask
pub mod edges {
    pub const LEFT: u8 = 0b0001;
    pub const TOP: u8 = 0b0010;
    pub const RIGHT: u8 = 0b0100;
    pub const BOTTOM: u8 = 0b1000;
    pub const ALL: u8 = LEFT | TOP | RIGHT | BOTTOM;
}

/// Variant used when the edge bitmask is outside `0..=15`
pub const FALLBACK_INDEX: u8 = 47;

/// What sits next to a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbor {
    /// Beyond the map border. Never an edge.
    Outside,
    /// A cell on the map, with its autotile family if it has one
    Inside(Option<u32>),
}

impl Neighbor {
    pub fn of_tile(layout: &TileLayout, tile: TileId) -> Self {
        Neighbor::Inside(layout.autotile_family(tile))
    }
}

/// How a family joins its neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutotileShape {
    Waterfall,
    Wall,
    Generic,
}

impl AutotileShape {
    pub fn of(family: u32) -> Self {
        match family {
            5 | 7 | 9 | 11 | 13 | 15 => AutotileShape::Waterfall,
            48..=79 | 88..=95 | 104..=111 | 120..=127 => AutotileShape::Wall,
            _ => AutotileShape::Generic,
        }
    }
}

/// Pick the variant index (0-47) of `family` given its neighbours.
///
/// `sample` is only called for the directions the shape class needs.
pub fn resolve_index<F>(family: u32, sample: F) -> u8
where
    F: Fn(Direction) -> Neighbor,
{
    let is_edge = |dir: Direction| match sample(dir) {
        Neighbor::Outside => false,
        Neighbor::Inside(other) => other != Some(family),
    };

    match AutotileShape::of(family) {
        AutotileShape::Waterfall => {
            flag(is_edge(Direction::West), 1) | flag(is_edge(Direction::East), 2)
        }
        AutotileShape::Wall => {
            let wall_edge = |dir: Direction| match sample(dir) {
                Neighbor::Inside(Some(other)) if other + 8 == family => false,
                _ => is_edge(dir),
            };
            flag(wall_edge(Direction::West), edges::LEFT)
                | flag(is_edge(Direction::North), edges::TOP)
                | flag(wall_edge(Direction::East), edges::RIGHT)
                | flag(is_edge(Direction::South), edges::BOTTOM)
        }
        AutotileShape::Generic => {
            let edge = flag(is_edge(Direction::West), edges::LEFT)
                | flag(is_edge(Direction::North), edges::TOP)
                | flag(is_edge(Direction::East), edges::RIGHT)
                | flag(is_edge(Direction::South), edges::BOTTOM);
            blob_index(edge, is_edge)
        }
    }
}

/// The blob autotile table: cardinal edge bitmask plus diagonal checks.
///
/// `corner_edge` is asked about diagonal directions only, and only about the
/// corners that are still open for this edge combination.
pub fn blob_index<F>(edge: u8, corner_edge: F) -> u8
where
    F: Fn(Direction) -> bool,
{
    use Direction::{NorthEast, NorthWest, SouthEast, SouthWest};

    let corner = |dir: Direction, bit: u8| flag(corner_edge(dir), bit);
    let pick = |dir: Direction, open: u8, closed: u8| if corner_edge(dir) { open } else { closed };

    match edge {
        0 => corner(NorthWest, 1) | corner(NorthEast, 2) | corner(SouthEast, 4) | corner(SouthWest, 8),
        1 => 16 | corner(NorthEast, 1) | corner(SouthEast, 2),
        2 => 20 | corner(SouthEast, 1) | corner(SouthWest, 2),
        3 => pick(SouthEast, 35, 34),
        4 => 24 | corner(SouthWest, 1) | corner(NorthWest, 2),
        5 => 32,
        6 => pick(SouthWest, 37, 36),
        7 => 42,
        8 => 28 | corner(NorthWest, 1) | corner(NorthEast, 2),
        9 => pick(NorthEast, 41, 40),
        10 => 33,
        11 => 43,
        12 => pick(NorthWest, 39, 38),
        13 => 44,
        14 => 45,
        15 => 46,
        _ => FALLBACK_INDEX,
    }
}

/// Recompute the tile of an autotile cell from the live grid.
///
/// Returns `None` when the cell does not hold an autotile. Neighbours outside
/// the map are taken from the cell's edge flags instead of bounds checks.
pub fn resolve_cell<G>(grid: &G, layout: &TileLayout, layer: usize, cell: &MaskCell) -> Option<TileId>
where
    G: TileGrid + ?Sized,
{
    let family = layout.autotile_family(grid.tile_id(cell.x, cell.y, layer))?;
    let index = resolve_index(family, |dir| {
        if !cell.in_bounds(dir) {
            return Neighbor::Outside;
        }
        match dir.step(cell.x, cell.y) {
            Some((x, y)) => Neighbor::of_tile(layout, grid.tile_id(x, y, layer)),
            None => Neighbor::Outside,
        }
    });
    Some(layout.autotile_id(family, index))
}

fn flag(set: bool, bit: u8) -> u8 {
    if set {
        bit
    } else {
        0
    }
}
