// The cumulative dungeon map: a monotonic record of everything ever seen.
//
// Cells start `Unknown` and are written exactly once, with the first
// non-Unknown, non-Player observation. Nothing is ever overwritten, so the
// map keeps walls, corridors, exits, and the *original* placement of
// enemies, keys, doors, plates and boulders — even after those objects move
// or are consumed. The planner's final enemy hunt reads the original enemy
// placements from here.
//
// Snapshots are immutable and shared: `update()` returns the same `Arc`
// when the view adds nothing, or a freshly built snapshot (with a bumped
// version) when it does. The map grows on demand when a view cell falls
// outside the current bounds.
//
// See also: `player_map.rs` for the dynamic companion snapshot,
// `view.rs` for the coordinate conversion used here.

use std::sync::Arc;

use tracing::error;

use crate::grid::{Grid, Offset, ONE};
use crate::tile::Tile;
use crate::view::ViewWindow;

/// Immutable, ever-growing record of first observations.
#[derive(Clone, Debug)]
pub struct DungeonMap {
    tiles: Grid<Tile>,
    version: u32,
}

/// Consistency rule between a fresh view cell and the recorded dungeon
/// cell. Movable objects, pickups and doors legitimately differ from the
/// first observation; anything else must match.
fn are_tiles_consistent(view: Tile, map: Tile) -> bool {
    let consistent = view == Tile::Unknown
        || map == Tile::Unknown
        || view == map
        || view.can_be_dropped()
        || map.can_be_picked_up()
        || view.can_move()
        || map.can_move()
        || map.is_door()
        || view == Tile::Player;

    if !consistent {
        error!(?view, ?map, "dungeon map: tiles are not consistent");
    }
    consistent
}

/// A cell needs recording when it is still unknown and the view finally
/// shows something there. A player covering the cell reveals nothing about
/// the ground below it.
fn needs_update(map: Tile, view: Tile) -> bool {
    if view == Tile::Player {
        return false;
    }
    map == Tile::Unknown && view != Tile::Unknown
}

struct ComparisonResult {
    new_map_size: Offset,
    needs_update: bool,
}

impl DungeonMap {
    pub fn new(size: Offset) -> Arc<DungeonMap> {
        Arc::new(DungeonMap {
            tiles: Grid::new(size.x, size.y, Tile::Unknown),
            version: 0,
        })
    }

    pub fn tiles(&self) -> &Grid<Tile> {
        &self.tiles
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Positions where a given tile was first observed. The hunt planner
    /// asks this for `Tile::Enemy`.
    pub fn positions_of(&self, tile: Tile) -> impl Iterator<Item = Offset> + '_ {
        self.tiles.offsets().filter(move |&p| self.tiles[p] == tile)
    }

    /// Fold one visibility window into the record. Returns the same shared
    /// snapshot when nothing new was observed.
    pub fn update(
        map: &Arc<DungeonMap>,
        player_position: Offset,
        visibility: i32,
        view: &Grid<Tile>,
    ) -> Arc<DungeonMap> {
        let window = ViewWindow::new(player_position, visibility);
        assert_eq!(view.size(), window.view_size(), "view size mismatch");

        let comparison = map.compare(view, &window);
        if !comparison.needs_update {
            return Arc::clone(map);
        }

        let mut next = DungeonMap {
            tiles: map.tiles.grown(comparison.new_map_size),
            version: map.version + 1,
        };
        next.apply(view, &window);
        Arc::new(next)
    }

    fn compare(&self, view: &Grid<Tile>, window: &ViewWindow) -> ComparisonResult {
        let mut result = ComparisonResult {
            new_map_size: self.tiles.size(),
            needs_update: false,
        };

        for p in view.offsets() {
            let destination = window.to_map(p);
            if self.tiles.is_in_range(destination) {
                let recorded = self.tiles[destination];
                debug_assert!(are_tiles_consistent(view[p], recorded));
                result.needs_update |= needs_update(recorded, view[p]);
            } else if view[p] != Tile::Unknown {
                result.new_map_size = result.new_map_size.max(destination + ONE);
                result.needs_update = true;
            }
        }

        result
    }

    fn apply(&mut self, view: &Grid<Tile>, window: &ViewWindow) {
        for p in view.offsets() {
            let destination = window.to_map(p);
            if self.tiles.is_in_range(destination) {
                debug_assert!(are_tiles_consistent(view[p], self.tiles[destination]));
                if view[p] == Tile::Unknown
                    || view[p] == Tile::Player
                    || self.tiles[destination] != Tile::Unknown
                {
                    continue;
                }
                self.tiles[destination] = view[p];
            } else {
                debug_assert_eq!(view[p], Tile::Unknown, "non-unknown view cell out of range");
            }
        }
    }
}
