//! Example: flood a region with an autotile and print the resulting variants
//!
//! Run with: cargo run -p tile_swap --example region_swap

use tile_swap::prelude::*;

fn main() -> Result<(), TileSwapError> {
    let mut map = MapData::new(8, 6);
    for y in 1..5 {
        for x in 2..6 {
            map.set_region(x, y, 1);
        }
    }
    map.commit_pristine();

    let mut swapper = TileSwapper::default();
    swapper.on_map_load(1, &mut map)?;

    let water: TileRef = "A3".parse()?;
    swapper.swap_by_region(1, &map, 0, 1, &water)?;
    let report = swapper.on_frame_update(&mut map)?.unwrap_or_default();
    println!(
        "substituted {} cells, re-resolved {} autotiles",
        report.substituted, report.resolved
    );

    let mut mask = BitGridMask::new(8, 6);
    mask.from_tile(&map, swapper.rules().layout(), water_base(&swapper), 0);
    println!("water cells:\n{mask}");

    for y in 0..6 {
        let row: Vec<String> = (0..8)
            .map(|x| match map.tile_id(x, y, 0) {
                0 => " .".to_string(),
                tile => format!("{:2}", tile - water_base(&swapper)),
            })
            .collect();
        println!("{}", row.join(" "));
    }
    Ok(())
}

fn water_base(swapper: &TileSwapper) -> TileId {
    swapper.rules().layout().autotile_id(2, 0)
}
