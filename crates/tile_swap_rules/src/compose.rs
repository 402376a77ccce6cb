//! The compositor: applies a [`SwapRuleStore`] to a live map.
//!
//! A pass runs layer by layer. Substitution writes are buffered and committed
//! after the scan, then the touched cells plus one ring around them are
//! re-resolved as autotiles so borders join up with their new neighbours.

use tile_swap_autotile::resolve_cell;
use tile_swap_core::{BitGridMask, Result, TileGrid, TileId, TileLayout, TileSwapError};
use tracing::{debug, trace};

use crate::{LayerRules, MapId, SwapRuleStore};

/// Number of tile layers a pass visits unless configured otherwise
pub const DEFAULT_LAYER_COUNT: usize = 3;

/// Pending work of a compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    Clean,
    /// Rules changed; reapply them on the current data
    #[default]
    NeedsRecompute,
    /// Rules were removed; restore pristine data before reapplying
    NeedsReload,
}

/// Summary of one recompute pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeReport {
    /// Layers that had rules
    pub layers_visited: usize,
    /// Cells rewritten by a swap rule
    pub substituted: usize,
    /// Autotile cells rewritten with a new variant
    pub resolved: usize,
}

impl CompositeReport {
    /// `true` when the pass wrote nothing
    pub fn is_noop(&self) -> bool {
        self.substituted == 0 && self.resolved == 0
    }
}

type CellWrite = (u32, u32, TileId);

/// Per-map pass state: the dirty mask, the refresh flag and attached overlays
#[derive(Debug, Clone)]
pub struct Compositor {
    map_id: MapId,
    layer_count: usize,
    updated: BitGridMask,
    state: RefreshState,
    overlays: Vec<Compositor>,
}

impl Compositor {
    /// A compositor for a `width × height` map. The first [`update`](Self::update)
    /// always runs a pass.
    pub fn new(map_id: MapId, width: u32, height: u32) -> Self {
        Self {
            map_id,
            layer_count: DEFAULT_LAYER_COUNT,
            updated: BitGridMask::new(width, height),
            state: RefreshState::NeedsRecompute,
            overlays: Vec::new(),
        }
    }

    /// A compositor sized to `grid`
    pub fn for_grid<G: TileGrid + ?Sized>(map_id: MapId, grid: &G) -> Self {
        Self::new(map_id, grid.width(), grid.height())
    }

    pub fn with_layer_count(mut self, layer_count: usize) -> Self {
        self.layer_count = layer_count;
        self
    }

    pub fn map_id(&self) -> MapId {
        self.map_id
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn needs_refresh(&self) -> bool {
        self.state != RefreshState::Clean
    }

    // ─── Invalidation ────────────────────────────────────────────────────────

    /// Request a recompute on the next update. A pending reload is kept.
    pub fn mark_dirty(&mut self) {
        if self.state == RefreshState::Clean {
            self.state = RefreshState::NeedsRecompute;
        }
        for overlay in &mut self.overlays {
            overlay.mark_dirty();
        }
    }

    /// Request a pristine reload followed by a recompute on the next update
    pub fn mark_reload(&mut self) {
        self.state = RefreshState::NeedsReload;
        for overlay in &mut self.overlays {
            overlay.mark_reload();
        }
    }

    // ─── Overlays ────────────────────────────────────────────────────────────

    /// Attach an overlay compositor; it follows every invalidation of this one.
    /// Returns its index.
    pub fn attach_overlay(&mut self, overlay: Compositor) -> usize {
        debug!(map = self.map_id, overlay = overlay.map_id, "overlay attached");
        self.overlays.push(overlay);
        self.overlays.len() - 1
    }

    pub fn overlays(&self) -> &[Compositor] {
        &self.overlays
    }

    pub fn overlay_mut(&mut self, index: usize) -> Option<&mut Compositor> {
        self.overlays.get_mut(index)
    }

    // ─── Passes ──────────────────────────────────────────────────────────────

    /// Run the pending work, if any. Returns `None` when the compositor was
    /// already clean.
    pub fn update<G>(&mut self, rules: &SwapRuleStore, grid: &mut G) -> Result<Option<CompositeReport>>
    where
        G: TileGrid + ?Sized,
    {
        match self.state {
            RefreshState::Clean => Ok(None),
            RefreshState::NeedsReload => self.reload(rules, grid).map(Some),
            RefreshState::NeedsRecompute => self.recompute(rules, grid).map(Some),
        }
    }

    /// Restore the authored data of `grid`, then apply every rule again.
    /// Substitutions of removed rules and any other runtime edits are lost.
    pub fn reload<G>(&mut self, rules: &SwapRuleStore, grid: &mut G) -> Result<CompositeReport>
    where
        G: TileGrid + ?Sized,
    {
        self.check_grid(grid)?;
        debug!(map = self.map_id, "reloading pristine map data");
        grid.reload_raw_data()?;
        self.recompute(rules, grid)
    }

    /// Apply every rule of this map to `grid` and re-resolve the touched
    /// autotiles. Fails before writing anything when `grid` does not match
    /// the compositor's size.
    pub fn recompute<G>(&mut self, rules: &SwapRuleStore, grid: &mut G) -> Result<CompositeReport>
    where
        G: TileGrid + ?Sized,
    {
        self.check_grid(grid)?;
        self.state = RefreshState::Clean;

        let layout = rules.layout();
        let mut report = CompositeReport::default();
        for layer in 0..self.layer_count {
            let Some(layer_rules) = rules.layer_rules(self.map_id, layer) else {
                trace!(map = self.map_id, layer, "no rules, layer skipped");
                continue;
            };
            report.layers_visited += 1;
            self.updated.clear();

            let writes = self.substitute(layer_rules, layout, &*grid, layer);
            report.substituted += writes.len();
            commit(grid, layer, &writes);

            self.updated.grow();
            let writes = self.resolve_autotiles(layout, &*grid, layer);
            report.resolved += writes.len();
            commit(grid, layer, &writes);
        }

        debug!(
            map = self.map_id,
            layers = report.layers_visited,
            substituted = report.substituted,
            resolved = report.resolved,
            "tile swap pass complete"
        );
        Ok(report)
    }

    fn substitute<G>(&mut self, rules: &LayerRules, layout: &TileLayout, grid: &G, layer: usize) -> Vec<CellWrite>
    where
        G: TileGrid + ?Sized,
    {
        let mut writes = Vec::new();
        for y in 0..self.updated.height() {
            for x in 0..self.updated.width() {
                let current = layout.normalize(grid.tile_id(x, y, layer));
                let Some(tile) = rules.select(x, y, current, || layout.region_id(grid, x, y)) else {
                    continue;
                };
                if tile != current {
                    writes.push((x, y, tile));
                    self.updated.set(x as i32, y as i32, true);
                }
            }
        }
        writes
    }

    fn resolve_autotiles<G>(&self, layout: &TileLayout, grid: &G, layer: usize) -> Vec<CellWrite>
    where
        G: TileGrid + ?Sized,
    {
        self.updated
            .cells()
            .filter_map(|cell| {
                let tile = resolve_cell(grid, layout, layer, &cell)?;
                (tile != grid.tile_id(cell.x, cell.y, layer)).then_some((cell.x, cell.y, tile))
            })
            .collect()
    }

    fn check_grid<G: TileGrid + ?Sized>(&self, grid: &G) -> Result<()> {
        let expected = (self.updated.width(), self.updated.height());
        let found = (grid.width(), grid.height());
        if expected != found {
            return Err(TileSwapError::GridMismatch { expected, found });
        }
        Ok(())
    }
}

fn commit<G: TileGrid + ?Sized>(grid: &mut G, layer: usize, writes: &[CellWrite]) {
    for &(x, y, tile) in writes {
        grid.set_tile_id(x, y, layer, tile);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapLayerKey;
    use tile_swap_core::{MapData, TileRef};

    const GRASS: TileId = 2048;
    const WATER: TileId = 2048 + 2 * 48;

    fn tile(text: &str) -> TileRef {
        text.parse().unwrap()
    }

    fn key(layer: usize) -> MapLayerKey {
        MapLayerKey::new(1, layer)
    }

    /// A map whose layer 0 is filled with B1 (id 0)
    fn plain_map(width: u32, height: u32) -> MapData {
        let mut grid = MapData::new(width, height);
        grid.commit_pristine();
        grid
    }

    fn run(compositor: &mut Compositor, store: &SwapRuleStore, grid: &mut MapData) -> CompositeReport {
        compositor.recompute(store, grid).unwrap()
    }

    #[test]
    fn new_compositor_needs_refresh() {
        let compositor = Compositor::new(1, 4, 4);
        assert_eq!(compositor.state(), RefreshState::NeedsRecompute);
        assert_eq!(compositor.layer_count(), DEFAULT_LAYER_COUNT);
    }

    #[test]
    fn tile_rule_rewrites_matching_cells() {
        let mut grid = plain_map(3, 3);
        grid.set_tile_id(1, 1, 0, 5);
        let mut store = SwapRuleStore::default();
        store.add_tile(&grid, key(0), &tile("B6"), &tile("C1")).unwrap();

        let report = run(&mut Compositor::for_grid(1, &grid), &store, &mut grid);
        assert_eq!(report.substituted, 1);
        assert_eq!(report.layers_visited, 1);
        assert_eq!(grid.tile_id(1, 1, 0), 256);
        assert_eq!(grid.tile_id(0, 0, 0), 0);
    }

    #[test]
    fn position_beats_tile_until_reverted() {
        let mut grid = plain_map(3, 3);
        let mut store = SwapRuleStore::default();
        store.add_tile(&grid, key(0), &tile("B1"), &tile("B2")).unwrap();
        store.add_position(&grid, key(0), 1, 1, &tile("B3")).unwrap();

        let mut compositor = Compositor::for_grid(1, &grid);
        run(&mut compositor, &store, &mut grid);
        assert_eq!(grid.tile_id(1, 1, 0), 2);
        assert_eq!(grid.tile_id(0, 0, 0), 1);

        store.revert_position(key(0), 1, 1);
        compositor.mark_reload();
        compositor.update(&store, &mut grid).unwrap();
        assert_eq!(grid.tile_id(1, 1, 0), 1);
    }

    #[test]
    fn region_rule_affects_exactly_the_region() {
        let mut grid = plain_map(4, 4);
        grid.set_region(1, 1, 3);
        grid.set_region(2, 3, 3);
        grid.set_region(0, 0, 4);
        let mut store = SwapRuleStore::default();
        store.add_region(&grid, key(0), 3, &tile("D1")).unwrap();

        run(&mut Compositor::for_grid(1, &grid), &store, &mut grid);
        for y in 0..4 {
            for x in 0..4 {
                let expected = if (x, y) == (1, 1) || (x, y) == (2, 3) { 512 } else { 0 };
                assert_eq!(grid.tile_id(x, y, 0), expected, "cell ({x}, {y})");
            }
        }
    }

    #[test]
    fn mask_rule_paints_its_shape() {
        let mut grid = plain_map(4, 4);
        let mut mask = BitGridMask::new(4, 4);
        mask.rectangle(2, 2, 1, 1);
        let mut store = SwapRuleStore::default();
        store.add_mask(&grid, key(0), mask, &tile("E2")).unwrap();

        let report = run(&mut Compositor::for_grid(1, &grid), &store, &mut grid);
        assert_eq!(report.substituted, 4);
        assert_eq!(grid.tile_id(1, 1, 0), 769);
        assert_eq!(grid.tile_id(2, 2, 0), 769);
        assert_eq!(grid.tile_id(0, 0, 0), 0);
        assert_eq!(grid.tile_id(3, 3, 0), 0);
    }

    #[test]
    fn second_pass_without_changes_writes_nothing() {
        let mut grid = plain_map(5, 5);
        let mut mask = BitGridMask::new(5, 5);
        mask.rectangle(3, 3, 1, 1);
        let mut store = SwapRuleStore::default();
        store.add_mask(&grid, key(0), mask, &tile("A1")).unwrap();
        store.add_position(&grid, key(0), 0, 0, &tile("C4")).unwrap();

        let mut compositor = Compositor::for_grid(1, &grid);
        let first = run(&mut compositor, &store, &mut grid);
        assert!(!first.is_noop());
        let snapshot = grid.layer(0);

        let second = run(&mut compositor, &store, &mut grid);
        assert!(second.is_noop());
        assert_eq!(grid.layer(0), snapshot);
    }

    #[test]
    fn autotile_block_resolves_borders() {
        let mut grid = plain_map(5, 5);
        let mut mask = BitGridMask::new(5, 5);
        mask.rectangle(3, 3, 1, 1);
        let mut store = SwapRuleStore::default();
        store.add_mask(&grid, key(0), mask, &tile("A1")).unwrap();

        let report = run(&mut Compositor::for_grid(1, &grid), &store, &mut grid);
        assert_eq!(report.substituted, 9);
        // centre has no differing neighbour
        assert_eq!(grid.tile_id(2, 2, 0), GRASS);
        // top-left corner: left and top edges
        assert_eq!(grid.tile_id(1, 1, 0), GRASS + 34);
        // bottom-right corner: right and bottom edges
        assert_eq!(grid.tile_id(3, 3, 0), GRASS + 38);
        // ring around the block is untouched
        assert_eq!(grid.tile_id(0, 0, 0), 0);
    }

    #[test]
    fn isolated_autotile_resolves_to_lone_variant() {
        let mut grid = plain_map(3, 3);
        let mut store = SwapRuleStore::default();
        store.add_position(&grid, key(0), 1, 1, &tile("A3")).unwrap();

        run(&mut Compositor::for_grid(1, &grid), &store, &mut grid);
        assert_eq!(grid.tile_id(1, 1, 0), WATER + 46);
    }

    #[test]
    fn neighbour_of_swapped_cell_is_re_resolved() {
        let mut grid = plain_map(3, 1);
        grid.fill_layer(0, &[GRASS + 46, 0, 0]);
        grid.commit_pristine();
        let mut store = SwapRuleStore::default();
        store.add_position(&grid, key(0), 1, 0, &tile("A1")).unwrap();

        run(&mut Compositor::for_grid(1, &grid), &store, &mut grid);
        // left cell now joins the middle one; map borders are not edges
        assert_eq!(grid.tile_id(0, 0, 0), GRASS);
        // middle cell borders a plain tile on the right
        assert_eq!(grid.tile_id(1, 0, 0), GRASS + 24);
    }

    #[test]
    fn layers_without_rules_are_skipped() {
        let mut grid = plain_map(3, 3);
        let mut store = SwapRuleStore::default();
        store.add_tile(&grid, key(2), &tile("B1"), &tile("B9")).unwrap();

        let report = run(&mut Compositor::for_grid(1, &grid), &store, &mut grid);
        assert_eq!(report.layers_visited, 1);
        assert_eq!(grid.tile_id(0, 0, 0), 0);
        assert_eq!(grid.tile_id(0, 0, 2), 8);
    }

    #[test]
    fn mismatched_grid_is_rejected_untouched() {
        let mut grid = plain_map(3, 3);
        let mut store = SwapRuleStore::default();
        store.add_tile(&grid, key(0), &tile("B1"), &tile("B2")).unwrap();

        let mut compositor = Compositor::new(1, 4, 4);
        let err = compositor.recompute(&store, &mut grid).unwrap_err();
        assert!(matches!(
            err,
            TileSwapError::GridMismatch { expected: (4, 4), found: (3, 3) }
        ));
        assert_eq!(grid.tile_id(0, 0, 0), 0);
        assert!(compositor.needs_refresh());
    }

    #[test]
    fn tile_rule_matches_any_variant_of_a_family() {
        let mut grid = plain_map(3, 3);
        // a grass cell currently drawn with its left+top border variant
        grid.set_tile_id(1, 1, 0, GRASS + 34);
        grid.commit_pristine();
        let mut store = SwapRuleStore::default();
        store.add_tile(&grid, key(0), &tile("A1"), &tile("A3")).unwrap();

        let report = run(&mut Compositor::for_grid(1, &grid), &store, &mut grid);
        assert_eq!(report.substituted, 1);
        assert_eq!(grid.tile_id(1, 1, 0), WATER + 46);
    }

    #[test]
    fn reload_discards_runtime_edits() {
        let mut grid = plain_map(3, 3);
        let mut store = SwapRuleStore::default();
        store.add_position(&grid, key(0), 1, 1, &tile("B9")).unwrap();

        let mut compositor = Compositor::for_grid(1, &grid);
        run(&mut compositor, &store, &mut grid);
        grid.set_tile_id(0, 0, 0, 5);

        let report = compositor.reload(&store, &mut grid).unwrap();
        assert_eq!(report.substituted, 1);
        assert_eq!(grid.tile_id(0, 0, 0), 0);
        assert_eq!(grid.tile_id(1, 1, 0), 8);
        assert!(!compositor.needs_refresh());
    }

    #[test]
    fn update_follows_refresh_state() {
        let mut grid = plain_map(2, 2);
        let mut store = SwapRuleStore::default();
        store.add_tile(&grid, key(0), &tile("B1"), &tile("B2")).unwrap();

        let mut compositor = Compositor::for_grid(1, &grid);
        assert!(compositor.update(&store, &mut grid).unwrap().is_some());
        assert_eq!(compositor.state(), RefreshState::Clean);
        assert!(compositor.update(&store, &mut grid).unwrap().is_none());

        compositor.mark_reload();
        compositor.mark_dirty();
        assert_eq!(compositor.state(), RefreshState::NeedsReload);
    }

    #[test]
    fn invalidation_reaches_overlays() {
        let mut compositor = Compositor::new(1, 2, 2);
        let index = compositor.attach_overlay(Compositor::new(2, 2, 2));
        let mut store = SwapRuleStore::default();
        let mut grid = plain_map(2, 2);
        compositor.update(&store, &mut grid).unwrap();

        let overlay = compositor.overlay_mut(index).unwrap();
        overlay.update(&store, &mut grid).unwrap();
        assert!(!overlay.needs_refresh());

        compositor.mark_dirty();
        assert_eq!(compositor.overlays()[index].state(), RefreshState::NeedsRecompute);
        compositor.mark_reload();
        assert_eq!(compositor.overlays()[index].state(), RefreshState::NeedsReload);

        store
            .add_tile(&grid, MapLayerKey::new(2, 0), &tile("B1"), &tile("B2"))
            .unwrap();
        let overlay = compositor.overlay_mut(index).unwrap();
        overlay.update(&store, &mut grid).unwrap();
        assert_eq!(grid.tile_id(0, 0, 0), 1);
    }
}
