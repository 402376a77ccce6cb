//! Bit grid masks
//!
//! A [`BitGridMask`] is a fixed-size 2-D boolean grid stored as one bit row per
//! map row. Bit `x` of a row is column `x`; rows wider than 64 cells span
//! several `u64` words. Rows that were never written are absent and read as
//! all clear.
//!
//! Masks are used two ways: as the shapes of mask swap rules, and as the dirty
//! tracker of the compositor, where [`BitGridMask::grow`] extends the set of
//! changed cells to their neighbours and [`BitGridMask::cells`] walks them.

use crate::direction::Direction;
use crate::grid::TileGrid;
use crate::tile_id::{TileId, TileLayout};
use std::fmt;

type Row = Box<[u64]>;

/// A fixed-size 2-D bit grid with a priority used to order overlapping masks
#[derive(Debug, Clone)]
pub struct BitGridMask {
    width: u32,
    height: u32,
    priority: i32,
    rows: Vec<Option<Row>>,
}

impl BitGridMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_priority(width, height, 0)
    }

    pub fn with_priority(width: u32, height: u32, priority: i32) -> Self {
        Self {
            width,
            height,
            priority,
            rows: vec![None; height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Check if a coordinate is inside the mask
    pub fn is_valid(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    pub fn is_empty(&self) -> bool {
        self.rows
            .iter()
            .flatten()
            .all(|row| row.iter().all(|w| *w == 0))
    }

    /// Number of set cells
    pub fn count(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .flat_map(|row| row.iter())
            .map(|w| w.count_ones() as usize)
            .sum()
    }

    pub fn clear(&mut self) {
        self.rows.iter_mut().for_each(|row| *row = None);
    }

    /// Mark or clear one cell. Out-of-range coordinates are ignored.
    pub fn set(&mut self, x: i32, y: i32, value: bool) {
        if !self.is_valid(x, y) {
            return;
        }
        let (word, bit) = (x as usize / 64, x as u32 % 64);
        if value {
            self.row_mut(y as u32)[word] |= 1 << bit;
        } else if let Some(row) = self.rows[y as usize].as_mut() {
            row[word] &= !(1 << bit);
        }
    }

    /// Check if a cell is set. Out-of-range coordinates read as `false`.
    pub fn get(&self, x: i32, y: i32) -> bool {
        if !self.is_valid(x, y) {
            return false;
        }
        self.rows[y as usize]
            .as_deref()
            .is_some_and(|row| row[x as usize / 64] & (1 << (x as u32 % 64)) != 0)
    }

    /// The raw words of row `y`, `None` when the row is absent or out of range
    pub fn row(&self, y: u32) -> Option<&[u64]> {
        self.rows.get(y as usize).and_then(|row| row.as_deref())
    }

    /// OR with another mask: cells set in either mask are kept
    pub fn or(&mut self, other: &BitGridMask) {
        for y in 0..self.height.min(other.height) {
            if let Some(src) = other.row(y) {
                let dst = self.row_mut(y);
                for (d, s) in dst.iter_mut().zip(src) {
                    *d |= s;
                }
                self.clamp_row(y);
            }
        }
    }

    /// XOR with another mask: only cells set in exactly one mask are kept
    pub fn xor(&mut self, other: &BitGridMask) {
        for y in 0..self.height.min(other.height) {
            if let Some(src) = other.row(y) {
                let dst = self.row_mut(y);
                for (d, s) in dst.iter_mut().zip(src) {
                    *d ^= s;
                }
                self.clamp_row(y);
            }
        }
    }

    /// AND with another mask: only cells set in both masks are kept
    pub fn and(&mut self, other: &BitGridMask) {
        for y in 0..self.height.min(other.height) {
            let src = other.row(y);
            if let Some(dst) = self.rows[y as usize].as_mut() {
                for (i, d) in dst.iter_mut().enumerate() {
                    *d &= src.and_then(|s| s.get(i)).copied().unwrap_or(0);
                }
            }
        }
    }

    /// Complement every cell
    pub fn invert(&mut self) {
        for y in 0..self.height {
            for word in self.row_mut(y).iter_mut() {
                *word = !*word;
            }
            self.clamp_row(y);
        }
    }

    /// Replace the contents with `other`'s, bounded by the smaller dimensions
    pub fn copy_from(&mut self, other: &BitGridMask) {
        self.clear();
        self.or(other);
    }

    /// Set every cell in `[left, left + width) x [top, top + height)`
    pub fn rectangle(&mut self, width: u32, height: u32, left: u32, top: u32) {
        let right = left.saturating_add(width).min(self.width);
        let bottom = top.saturating_add(height).min(self.height);
        if left >= right {
            return;
        }
        for y in top..bottom {
            fill_span(self.row_mut(y), left, right);
        }
    }

    /// Translate the contents by `(dx, dy)`. Negative values move left / up.
    /// Cells moved outside are dropped and vacated cells are cleared.
    pub fn shift(&mut self, dx: i32, dy: i32) {
        let mut rows: Vec<Option<Row>> = vec![None; self.height as usize];
        for (y, slot) in rows.iter_mut().enumerate() {
            let src_y = y as i64 - dy as i64;
            if src_y < 0 || src_y >= self.height as i64 {
                continue;
            }
            let Some(src) = self.rows[src_y as usize].as_deref() else {
                continue;
            };
            let mut moved: Row = match dx {
                0 => src.into(),
                d if d > 0 => shift_up(src, d as u32),
                d => shift_down(src, d.unsigned_abs()),
            };
            apply_tail(&mut moved, self.width);
            *slot = Some(moved);
        }
        self.rows = rows;
    }

    /// Dilate with a 3x3 kernel: every set cell also sets its 8 neighbours
    pub fn grow(&mut self) {
        let spread: Vec<Option<Row>> = (0..self.height)
            .map(|y| self.row(y).map(|row| self.spread_row(row)))
            .collect();
        self.rows = self.merge_vertical(&spread, &spread);
    }

    /// Erode with a 3x3 kernel
    pub fn shrink(&mut self) {
        self.invert();
        self.grow();
        self.invert();
    }

    /// Dilate with a cross-shaped kernel: set cells also set their 4 direct
    /// neighbours, not the diagonals
    pub fn blur(&mut self) {
        let spread: Vec<Option<Row>> = (0..self.height)
            .map(|y| self.row(y).map(|row| self.spread_row(row)))
            .collect();
        let original = std::mem::take(&mut self.rows);
        self.rows = self.merge_vertical(&spread, &original);
    }

    /// Erode with a cross-shaped kernel
    pub fn unblur(&mut self) {
        self.invert();
        self.blur();
        self.invert();
    }

    /// Set every cell whose region id is `region`
    pub fn from_region<G: TileGrid + ?Sized>(&mut self, grid: &G, layout: &TileLayout, region: u32) {
        for y in 0..self.height.min(grid.height()) {
            for x in 0..self.width.min(grid.width()) {
                if layout.region_id(grid, x, y) == region {
                    self.set(x as i32, y as i32, true);
                }
            }
        }
    }

    /// Set every cell of `layer` showing `tile`. Autotiles match by family.
    pub fn from_tile<G: TileGrid + ?Sized>(
        &mut self,
        grid: &G,
        layout: &TileLayout,
        tile: TileId,
        layer: usize,
    ) {
        let tile = layout.normalize(tile);
        for y in 0..self.height.min(grid.height()) {
            for x in 0..self.width.min(grid.width()) {
                if layout.normalize(grid.tile_id(x, y, layer)) == tile {
                    self.set(x as i32, y as i32, true);
                }
            }
        }
    }

    /// Iterate set cells in row-major order
    pub fn cells(&self) -> Cells<'_> {
        Cells {
            mask: self,
            y: 0,
            word: 0,
            next_word: 0,
            bits: 0,
        }
    }

    fn words(&self) -> usize {
        self.width.div_ceil(64) as usize
    }

    fn row_mut(&mut self, y: u32) -> &mut [u64] {
        let words = self.words();
        self.rows[y as usize].get_or_insert_with(|| vec![0; words].into_boxed_slice())
    }

    fn clamp_row(&mut self, y: u32) {
        let width = self.width;
        if let Some(row) = self.rows[y as usize].as_mut() {
            apply_tail(row, width);
        }
    }

    /// `row | row << 1 | row >> 1`, kept inside the width
    fn spread_row(&self, row: &[u64]) -> Row {
        let left = shift_down(row, 1);
        let mut out = shift_up(row, 1);
        for ((o, r), l) in out.iter_mut().zip(row).zip(left.iter()) {
            *o |= r | l;
        }
        apply_tail(&mut out, self.width);
        out
    }

    /// `center[y] | edge[y - 1] | edge[y + 1]` for every row
    fn merge_vertical(&self, center: &[Option<Row>], edge: &[Option<Row>]) -> Vec<Option<Row>> {
        let height = self.height as usize;
        (0..height)
            .map(|y| {
                let mut sources = [
                    center[y].as_deref(),
                    y.checked_sub(1).and_then(|u| edge[u].as_deref()),
                    edge.get(y + 1).and_then(|r| r.as_deref()),
                ]
                .into_iter()
                .flatten()
                .peekable();
                sources.peek()?;
                let mut out = vec![0u64; self.words()].into_boxed_slice();
                for src in sources {
                    for (o, s) in out.iter_mut().zip(src) {
                        *o |= s;
                    }
                }
                Some(out)
            })
            .collect()
    }

    fn cell_at(&self, x: u32, y: u32) -> MaskCell {
        MaskCell {
            x,
            y,
            left: x > 0,
            top: y > 0,
            right: x + 1 < self.width,
            bottom: y + 1 < self.height,
        }
    }
}

impl PartialEq for BitGridMask {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.priority == other.priority
            && (0..self.height).all(|y| {
                let a = self.row(y);
                let b = other.row(y);
                (0..self.words()).all(|i| {
                    a.map_or(0, |r| r[i]) == b.map_or(0, |r| r[i])
                })
            })
    }
}

impl Eq for BitGridMask {}

impl fmt::Display for BitGridMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                f.write_str(if self.get(x, y) { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// A set cell yielded by [`BitGridMask::cells`].
///
/// `left`, `top`, `right` and `bottom` say whether the neighbour on that side
/// is inside the mask, not whether it is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskCell {
    pub x: u32,
    pub y: u32,
    pub left: bool,
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
}

impl MaskCell {
    /// Whether the neighbour in `dir` is inside the mask
    pub fn in_bounds(&self, dir: Direction) -> bool {
        match dir {
            Direction::North => self.top,
            Direction::NorthEast => self.top && self.right,
            Direction::East => self.right,
            Direction::SouthEast => self.bottom && self.right,
            Direction::South => self.bottom,
            Direction::SouthWest => self.bottom && self.left,
            Direction::West => self.left,
            Direction::NorthWest => self.top && self.left,
        }
    }
}

/// Iterator over the set cells of a mask
#[derive(Debug, Clone)]
pub struct Cells<'a> {
    mask: &'a BitGridMask,
    y: u32,
    word: usize,
    next_word: usize,
    bits: u64,
}

impl Iterator for Cells<'_> {
    type Item = MaskCell;

    fn next(&mut self) -> Option<MaskCell> {
        loop {
            if self.bits != 0 {
                let bit = self.bits.trailing_zeros();
                self.bits &= self.bits - 1;
                let x = self.word as u32 * 64 + bit;
                return Some(self.mask.cell_at(x, self.y));
            }
            if self.y >= self.mask.height {
                return None;
            }
            match self.mask.row(self.y) {
                Some(row) if self.next_word < row.len() => {
                    self.word = self.next_word;
                    self.bits = row[self.word];
                    self.next_word += 1;
                }
                _ => {
                    self.y += 1;
                    self.next_word = 0;
                }
            }
        }
    }
}

/// Move bits towards higher columns by `n`
fn shift_up(src: &[u64], n: u32) -> Row {
    let words = src.len();
    let (skip, bits) = ((n / 64) as usize, n % 64);
    let mut out = vec![0u64; words].into_boxed_slice();
    for i in skip..words {
        let mut v = src[i - skip] << bits;
        if bits > 0 && i > skip {
            v |= src[i - skip - 1] >> (64 - bits);
        }
        out[i] = v;
    }
    out
}

/// Move bits towards lower columns by `n`
fn shift_down(src: &[u64], n: u32) -> Row {
    let words = src.len();
    let (skip, bits) = ((n / 64) as usize, n % 64);
    let mut out = vec![0u64; words].into_boxed_slice();
    for i in 0..words.saturating_sub(skip) {
        let mut v = src[i + skip] >> bits;
        if bits > 0 && i + skip + 1 < words {
            v |= src[i + skip + 1] << (64 - bits);
        }
        out[i] = v;
    }
    out
}

/// Clear the bits at and beyond `width` in the last word
fn apply_tail(row: &mut [u64], width: u32) {
    let used = width % 64;
    if used != 0 {
        if let Some(last) = row.last_mut() {
            *last &= (1u64 << used) - 1;
        }
    }
}

/// Set bits `start..end`
fn fill_span(row: &mut [u64], start: u32, end: u32) {
    for x in start..end {
        row[x as usize / 64] |= 1 << (x % 64);
    }
}
