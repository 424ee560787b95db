// The player map: the bot's current best model of the dungeon.
//
// Unlike the monotonic dungeon record, this snapshot tracks the *dynamic*
// state of the level — boulders move, keys get picked up, doors open,
// enemies wander in and out of sight. Alongside the tile grid it carries:
//
// - the exit position, set once when first seen;
// - per-color door data (key, pressure plate, door cells — a color may
//   have several door cells);
// - boulder bookkeeping: `unchecked_boulders` (seen, drop quality not yet
//   resolved) and `used_boulders` (committed to pressure plates, never
//   re-picked);
// - enemy bookkeeping: tracked locations with a decay countdown, the
//   per-player in-sight sets from the latest update, and a kill counter;
// - navigation policy: per-color "avoid door" flags (cleared once the door
//   is opened or its plate activated) and a global "avoid enemies" flag.
//
// Snapshots are immutable and shared. `update()` either returns the same
// `Arc` or builds a fresh snapshot; command handlers that need to mutate
// bookkeeping clone the snapshot, edit it, and swap the shared handle.
//
// See also: `dungeon_map.rs` for the cumulative record, `weights.rs` which
// turns this snapshot plus the navigation policy into movement costs,
// `tile.rs` for `compare_tiles`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, error};

use crate::grid::{Grid, Offset, ALL_DIRECTIONS, NORTH, NORTH_WEST, ONE};
use crate::tile::{compare_tiles, DoorColor, Tile, DOOR_COLORS};
use crate::view::ViewWindow;

/// Countdown assigned to a tracked enemy each time it is seen; also the
/// movement penalty applied around enemies in the weight map.
pub const ENEMY_PENALTY: i32 = 15;

/// Everything known about one door color.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DoorData {
    pub key_position: Option<Offset>,
    pub pressure_plate_position: Option<Offset>,
    pub door_positions: BTreeSet<Offset>,
}

/// Per-color navigation policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoorParameters {
    pub avoid_door: bool,
}

impl Default for DoorParameters {
    fn default() -> Self {
        // Closed doors block until proven open.
        Self { avoid_door: true }
    }
}

/// Policy flags consumed by the weight-map builder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationParameters {
    pub door_parameters: BTreeMap<DoorColor, DoorParameters>,
    pub avoid_enemies: bool,
}

impl Default for NavigationParameters {
    fn default() -> Self {
        Self {
            door_parameters: DOOR_COLORS
                .iter()
                .map(|&color| (color, DoorParameters::default()))
                .collect(),
            avoid_enemies: true,
        }
    }
}

impl NavigationParameters {
    pub fn avoid_door(&self, color: DoorColor) -> bool {
        self.door_parameters[&color].avoid_door
    }
}

/// Enemy bookkeeping across updates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Enemies {
    /// Tracked enemy positions with a countdown: refreshed to
    /// `ENEMY_PENALTY` when seen, decremented each update, pruned at zero
    /// or when the cell is observed enemy-free.
    pub locations: BTreeMap<Offset, i32>,
    /// Enemies visible to each player in the most recent update.
    pub in_sight: [BTreeSet<Offset>; 2],
    /// Enemies confirmed dead so far this level.
    pub killed: u32,
}

/// Accumulated result of comparing a whole view against the map.
#[derive(Debug)]
struct MapComparisonResult {
    new_map_size: Offset,
    needs_update: bool,
    new_boulders: BTreeSet<Offset>,
    enemies: BTreeSet<Offset>,
    disappeared_enemies: BTreeSet<Offset>,
}

/// Consistency rule between a view cell and the mapped cell. Movable
/// actors, pickups, droppable items and doors (which open) legitimately
/// differ; anything else must match.
fn are_tiles_consistent(view: Tile, map: Tile) -> bool {
    let consistent = view == Tile::Unknown
        || map == Tile::Unknown
        || view == map
        || view == Tile::Player
        || view.can_be_dropped()
        || map.can_be_picked_up()
        || view.can_move()
        || map.can_move()
        || map.is_door()
        || view.is_door();

    if !consistent {
        error!(?view, ?map, "player map: tiles are not consistent");
    }
    consistent
}

/// Dynamic snapshot of the current level.
#[derive(Clone, Debug)]
pub struct PlayerMap {
    tiles: Grid<Tile>,
    exit: Option<Offset>,
    door_data: BTreeMap<DoorColor, DoorData>,
    navigation_parameters: NavigationParameters,
    pub unchecked_boulders: BTreeSet<Offset>,
    pub used_boulders: BTreeSet<Offset>,
    pub enemies: Enemies,
}

impl PlayerMap {
    pub fn new(size: Offset) -> Arc<PlayerMap> {
        Arc::new(PlayerMap {
            tiles: Grid::new(size.x, size.y, Tile::Unknown),
            exit: None,
            door_data: DOOR_COLORS
                .iter()
                .map(|&color| (color, DoorData::default()))
                .collect(),
            navigation_parameters: NavigationParameters::default(),
            unchecked_boulders: BTreeSet::new(),
            used_boulders: BTreeSet::new(),
            enemies: Enemies::default(),
        })
    }

    pub fn tiles(&self) -> &Grid<Tile> {
        &self.tiles
    }

    /// The exit position, once observed. Never cleared.
    pub fn exit(&self) -> Option<Offset> {
        self.exit
    }

    pub fn door_data(&self) -> &BTreeMap<DoorColor, DoorData> {
        &self.door_data
    }

    pub fn navigation_parameters(&self) -> &NavigationParameters {
        &self.navigation_parameters
    }

    /// Flip the avoid-door flag for one color. Called (on a cloned
    /// snapshot) when a door has been opened or its plate activated.
    pub fn set_avoid_door(&mut self, color: DoorColor, avoid: bool) {
        self.navigation_parameters
            .door_parameters
            .get_mut(&color)
            .expect("all door colors are present")
            .avoid_door = avoid;
    }

    /// Fold one player's visibility window into the model. Returns the
    /// same shared snapshot when nothing relevant changed; otherwise a
    /// fresh snapshot with the view applied and enemy countdowns advanced.
    pub fn update(
        map: &Arc<PlayerMap>,
        player_id: usize,
        player_position: Offset,
        visibility: i32,
        view: &Grid<Tile>,
    ) -> Arc<PlayerMap> {
        let window = ViewWindow::new(player_position, visibility);
        assert_eq!(view.size(), window.view_size(), "view size mismatch");

        let comparison = map.compare(view, &window);

        let must_rebuild = comparison.needs_update
            || map.enemies.in_sight[player_id] != comparison.enemies
            || !map.enemies.locations.is_empty();
        if !must_rebuild {
            return Arc::clone(map);
        }

        let mut next = PlayerMap {
            tiles: map.tiles.grown(comparison.new_map_size),
            ..(**map).clone()
        };
        next.apply(view, &window);

        // Advance the decay of every tracked enemy, drop the ones observed
        // gone, then refresh the ones seen right now.
        next.enemies.locations.retain(|_, countdown| {
            *countdown -= 1;
            *countdown > 0
        });
        for missing in &comparison.disappeared_enemies {
            next.enemies.locations.remove(missing);
        }
        for &enemy in &comparison.enemies {
            next.enemies.locations.insert(enemy, ENEMY_PENALTY);
        }
        next.enemies.in_sight[player_id] = comparison.enemies;
        next.unchecked_boulders.extend(comparison.new_boulders);

        Arc::new(next)
    }

    fn compare(&self, view: &Grid<Tile>, window: &ViewWindow) -> MapComparisonResult {
        let mut result = MapComparisonResult {
            new_map_size: self.tiles.size(),
            needs_update: false,
            new_boulders: BTreeSet::new(),
            enemies: BTreeSet::new(),
            disappeared_enemies: BTreeSet::new(),
        };

        for p in view.offsets() {
            let destination = window.to_map(p);
            let comparison = if self.tiles.is_in_range(destination) {
                debug_assert!(are_tiles_consistent(view[p], self.tiles[destination]));
                compare_tiles(self.tiles[destination], view[p])
            } else if view[p] != Tile::Unknown {
                result.new_map_size = result.new_map_size.max(destination + ONE);
                compare_tiles(Tile::Unknown, view[p])
            } else {
                continue;
            };

            result.needs_update |= comparison.needs_update;
            if comparison.new_boulder {
                result.new_boulders.insert(destination);
            }
            if comparison.is_enemy {
                result.enemies.insert(destination);
            }
        }

        // A tracked enemy whose cell is now observed as a known non-enemy
        // tile has moved on (or died).
        result.disappeared_enemies = self
            .enemies
            .locations
            .keys()
            .copied()
            .filter(|&position| {
                let in_view = window.to_view(position);
                view.is_in_range(in_view)
                    && view[in_view] != Tile::Unknown
                    && view[in_view] != Tile::Enemy
            })
            .collect();
        result.needs_update |= !result.disappeared_enemies.is_empty();

        debug_assert!(result.needs_update || result.new_boulders.is_empty());
        debug_assert!(result.needs_update || self.tiles.size() == result.new_map_size);
        debug_assert!(result.needs_update || result.disappeared_enemies.is_empty());

        result
    }

    fn apply(&mut self, view: &Grid<Tile>, window: &ViewWindow) {
        for p in view.offsets() {
            let destination = window.to_map(p);
            if !self.tiles.is_in_range(destination) {
                debug_assert_eq!(view[p], Tile::Unknown, "non-unknown view cell out of range");
                continue;
            }
            debug_assert!(are_tiles_consistent(view[p], self.tiles[destination]));

            if view[p] == Tile::Unknown {
                continue;
            }
            if view[p] == Tile::Exit {
                self.exit = Some(destination);
            }
            if let Some(color) = view[p].door_color() {
                let data = self.door_data.get_mut(&color).expect("color present");
                if view[p].is_door() {
                    data.door_positions.insert(destination);
                }
                if view[p].is_key() {
                    data.key_position = Some(destination);
                }
                if view[p].is_pressure_plate() {
                    data.pressure_plate_position = Some(destination);
                }
            }
            if view[p] == Tile::Player {
                // A player covering a pickup means it was just lifted.
                if self.tiles[destination].can_be_picked_up() {
                    self.tiles[destination] = Tile::Empty;
                }
            } else if view[p] != Tile::Enemy {
                self.tiles[destination] = view[p];
            }
        }
    }

    /// Whether dropping a boulder at `position` keeps every adjacent empty
    /// cell connected to the rest of the map. Walks the eight neighbors
    /// cyclically and counts empty cells that are pinched between non-empty
    /// ones on one side (`partially_isolated`) or both sides
    /// (`doubly_isolated`).
    pub fn is_good_boulder(&self, position: Offset) -> bool {
        let is_empty =
            |p: Offset| self.tiles.is_in_range(p) && self.tiles[p].is_potentially_walkable();

        let mut previous_empty = is_empty(position + NORTH_WEST);
        let mut current_empty = is_empty(position + NORTH);
        let mut partially_isolated = 0;
        let mut doubly_isolated = 0;

        for d in ALL_DIRECTIONS.iter().skip(1).chain([NORTH].iter()) {
            let next_empty = is_empty(position + *d);
            if current_empty && !previous_empty && !next_empty {
                doubly_isolated += 1;
            } else if current_empty && (!previous_empty || !next_empty) {
                partially_isolated += 1;
            }
            previous_empty = current_empty;
            current_empty = next_empty;
        }

        let result = (doubly_isolated == 0 && partially_isolated <= 2)
            || (doubly_isolated == 1 && partially_isolated == 0);
        debug!(
            %position,
            doubly_isolated, partially_isolated, result, "boulder drop quality"
        );
        result
    }

    /// A boulder whose surroundings are not fully observed cannot be
    /// judged yet. Out-of-range neighbors count as unobserved.
    pub fn is_bad_boulder(&self, position: Offset) -> bool {
        ALL_DIRECTIONS.iter().any(|&d| {
            self.tiles
                .get(position + d)
                .map_or(true, |&tile| tile == Tile::Unknown)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U: Tile = Tile::Unknown;
    const E: Tile = Tile::Empty;
    const W: Tile = Tile::Wall;
    const P: Tile = Tile::Player;

    fn view3(tiles: [Tile; 9]) -> Grid<Tile> {
        Grid::from_vec(3, 3, tiles.to_vec())
    }

    /// Build a map by applying a single centered view to an empty 5x5 map.
    fn updated_map(tiles: [Tile; 9]) -> Arc<PlayerMap> {
        let map = PlayerMap::new(Offset::new(5, 5));
        PlayerMap::update(&map, 0, Offset::new(2, 2), 1, &view3(tiles))
    }

    #[test]
    fn records_exit_and_door_data_by_color() {
        let map = updated_map([Tile::Exit, Tile::DoorRed, Tile::KeyRed, E, P, E, U, Tile::PressurePlateRed, U]);
        assert_eq!(map.exit(), Some(Offset::new(1, 1)));
        let red = &map.door_data()[&DoorColor::Red];
        assert!(red.door_positions.contains(&Offset::new(2, 1)));
        assert_eq!(red.key_position, Some(Offset::new(3, 1)));
        assert_eq!(red.pressure_plate_position, Some(Offset::new(2, 3)));
        assert!(map.door_data()[&DoorColor::Blue].door_positions.is_empty());
    }

    #[test]
    fn door_knowledge_is_never_forgotten() {
        let map = updated_map([U, Tile::KeyRed, U, E, P, E, U, U, U]);
        assert_eq!(
            map.door_data()[&DoorColor::Red].key_position,
            Some(Offset::new(2, 1))
        );

        // Key picked up: the cell reads Player now, then Empty. The
        // recorded key position must survive both.
        let covered = PlayerMap::update(&map, 0, Offset::new(2, 1), 1, &view3([U, U, U, E, P, E, E, E, E]));
        assert_eq!(
            covered.door_data()[&DoorColor::Red].key_position,
            Some(Offset::new(2, 1))
        );
        assert_eq!(covered.tiles()[Offset::new(2, 1)], E);
    }

    #[test]
    fn pickup_under_player_rewrites_to_empty() {
        let map = updated_map([U, Tile::Sword, U, E, P, E, U, U, U]);
        assert_eq!(map.tiles()[Offset::new(2, 1)], Tile::Sword);

        // The player steps onto the sword: the view shows Player over the
        // recorded pickup.
        let after = PlayerMap::update(&map, 0, Offset::new(2, 1), 1, &view3([E, E, E, E, P, E, E, E, E]));
        assert_eq!(after.tiles()[Offset::new(2, 1)], E);
    }

    #[test]
    fn unchanged_view_returns_shared_snapshot() {
        let map = updated_map([W, W, W, E, P, E, E, E, E]);
        let view = view3([W, W, W, E, P, E, E, E, E]);
        let again = PlayerMap::update(&map, 0, Offset::new(2, 2), 1, &view);
        assert!(Arc::ptr_eq(&map, &again));
    }

    #[test]
    fn new_boulders_become_unchecked() {
        let map = updated_map([U, Tile::Boulder, U, E, P, E, U, U, U]);
        assert!(map.unchecked_boulders.contains(&Offset::new(2, 1)));
        assert!(map.used_boulders.is_empty());
    }

    #[test]
    fn enemies_in_sight_are_tracked_with_countdown() {
        let map = updated_map([U, Tile::Enemy, U, E, P, E, U, U, U]);
        let enemy = Offset::new(2, 1);
        assert_eq!(map.enemies.locations[&enemy], ENEMY_PENALTY);
        assert!(map.enemies.in_sight[0].contains(&enemy));
        // The enemy cell itself is not written into the tile grid.
        assert_eq!(map.tiles()[enemy], U);
    }

    #[test]
    fn tracked_enemy_decays_when_out_of_sight() {
        let map = updated_map([U, Tile::Enemy, U, E, P, E, U, U, U]);
        let enemy = Offset::new(2, 1);

        // Look away: a view that no longer covers the enemy cell.
        let mut current = map;
        let away = view3([E, E, E, E, P, E, E, E, E]);
        for expected in (1..ENEMY_PENALTY).rev() {
            current = PlayerMap::update(&current, 0, Offset::new(2, 3), 1, &away);
            assert_eq!(current.enemies.locations.get(&enemy), Some(&expected));
        }
        // Final decrement prunes the entry.
        current = PlayerMap::update(&current, 0, Offset::new(2, 3), 1, &away);
        assert!(current.enemies.locations.is_empty());
    }

    #[test]
    fn enemy_observed_gone_is_pruned_immediately() {
        let map = updated_map([U, Tile::Enemy, U, E, P, E, U, U, U]);
        let enemy = Offset::new(2, 1);
        assert!(map.enemies.locations.contains_key(&enemy));

        // Same spot observed empty: the enemy moved off.
        let after = PlayerMap::update(&map, 0, Offset::new(2, 2), 1, &view3([E, E, E, E, P, E, E, E, E]));
        assert!(!after.enemies.locations.contains_key(&enemy));
        assert!(after.enemies.in_sight[0].is_empty());
    }

    #[test]
    fn in_sight_is_per_player() {
        let map = updated_map([U, Tile::Enemy, U, E, P, E, U, U, U]);
        assert!(!map.enemies.in_sight[0].is_empty());
        assert!(map.enemies.in_sight[1].is_empty());

        // Player 1 looks somewhere enemy-free.
        let after = PlayerMap::update(&map, 1, Offset::new(2, 3), 1, &view3([E, E, E, E, P, E, E, E, E]));
        assert!(after.enemies.in_sight[1].is_empty());
    }

    #[test]
    fn navigation_defaults_avoid_everything() {
        let map = PlayerMap::new(Offset::new(3, 3));
        for color in DOOR_COLORS {
            assert!(map.navigation_parameters().avoid_door(color));
        }
        assert!(map.navigation_parameters().avoid_enemies);
    }

    #[test]
    fn open_door_flag_flips_on_cloned_snapshot() {
        let map = updated_map([U, Tile::DoorRed, U, E, P, E, U, U, U]);
        let mut next = (*map).clone();
        next.set_avoid_door(DoorColor::Red, false);
        let next = Arc::new(next);
        assert!(!next.navigation_parameters().avoid_door(DoorColor::Red));
        assert!(next.navigation_parameters().avoid_door(DoorColor::Green));
        // Original snapshot untouched.
        assert!(map.navigation_parameters().avoid_door(DoorColor::Red));
    }

    #[test]
    fn boulder_in_open_space_is_good() {
        // 5x5 all empty around the center.
        let mut tiles = Grid::new(5, 5, E);
        tiles[Offset::new(2, 2)] = Tile::Boulder;
        let map = PlayerMap {
            tiles,
            ..(*PlayerMap::new(Offset::new(0, 0))).clone()
        };
        assert!(map.is_good_boulder(Offset::new(2, 2)));
        assert!(!map.is_bad_boulder(Offset::new(2, 2)));
    }

    #[test]
    fn boulder_pinching_a_corridor_is_not_good() {
        // A vertical wall west and east of the center leaves the north and
        // south neighbors doubly isolated.
        let mut tiles = Grid::new(5, 5, E);
        for y in 0..5 {
            tiles[Offset::new(1, y)] = W;
            tiles[Offset::new(3, y)] = W;
        }
        let map = PlayerMap {
            tiles,
            ..(*PlayerMap::new(Offset::new(0, 0))).clone()
        };
        // Dropping at (2,2) pinches the corridor into two dead halves.
        assert!(!map.is_good_boulder(Offset::new(2, 2)));
    }

    #[test]
    fn boulder_against_a_straight_wall_is_good() {
        // Wall along the north edge; everything else empty.
        let mut tiles = Grid::new(5, 5, E);
        for x in 0..5 {
            tiles[Offset::new(x, 0)] = W;
        }
        let map = PlayerMap {
            tiles,
            ..(*PlayerMap::new(Offset::new(0, 0))).clone()
        };
        // Two partially isolated cells (west and east of the contact), no
        // doubly isolated ones.
        assert!(map.is_good_boulder(Offset::new(2, 1)));
    }

    #[test]
    fn boulder_with_unknown_neighbor_is_bad() {
        let mut tiles = Grid::new(5, 5, E);
        tiles[Offset::new(3, 2)] = U;
        let map = PlayerMap {
            tiles,
            ..(*PlayerMap::new(Offset::new(0, 0))).clone()
        };
        assert!(map.is_bad_boulder(Offset::new(2, 2)));
        assert!(!map.is_bad_boulder(Offset::new(1, 1)));
    }

    #[test]
    fn map_grows_for_out_of_range_observation() {
        let map = PlayerMap::new(Offset::new(2, 2));
        let view = view3([E, E, E, E, P, E, E, E, Tile::Exit]);
        let updated = PlayerMap::update(&map, 0, Offset::new(1, 1), 1, &view);
        assert_eq!(updated.tiles().size(), Offset::new(3, 3));
        assert_eq!(updated.exit(), Some(Offset::new(2, 2)));
    }
}
