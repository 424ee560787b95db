// Weight-map builder: player map + navigation policy -> per-cell costs.
//
// Every cell costs 1 to enter unless a blocker applies, in which case it
// costs `infinity()`. Blockers: walls, boulders, enemies, keys (so a path
// never casually walks over a key it should not pick up), and doors whose
// color is still flagged avoid. A cell accepted by the destination
// predicate is never blocked — that is how paths are allowed to end on a
// key, a closed door or a pressure plate when that is the actual goal.
//
// When the policy says to avoid enemies, every enemy in sight of the
// querying player becomes infinite and its walkable 4-neighbors cost at
// least `ENEMY_PENALTY`, so paths route around engagements without being
// forbidden outright. Only enemies in sight are considered — the broader
// tracked-location map does not affect weights, which keeps the result
// reproducible from the current tick's observations alone.
//
// See also: `dijkstra.rs` which consumes the weights, `player_map.rs` for
// the policy flags.

use crate::grid::{Grid, Offset, DIRECTIONS};
use crate::player_map::{Enemies, NavigationParameters, PlayerMap, ENEMY_PENALTY};
use crate::tile::Tile;

/// The "unreachable" cost. Deliberately far below `i32::MAX` so repeated
/// additions during relaxation cannot overflow.
pub fn infinity(size: Offset) -> i32 {
    2 * size.x * size.y * 100
}

/// Build a weight grid for `player_id` with an arbitrary destination
/// predicate. Cells matching the predicate always cost 1.
pub fn weight_map_with<F>(
    player_id: usize,
    tiles: &Grid<Tile>,
    enemies: &Enemies,
    navigation: &NavigationParameters,
    is_destination: F,
) -> Grid<i32>
where
    F: Fn(Offset) -> bool,
{
    let inf = infinity(tiles.size());
    let mut weights = Grid::new(tiles.width(), tiles.height(), inf);

    for offset in tiles.offsets() {
        let tile = tiles[offset];
        let blocked = !is_destination(offset)
            && (tile == Tile::Wall
                || tile == Tile::Boulder
                || tile == Tile::Enemy
                || tile.is_key()
                || tile
                    .door_color()
                    .is_some_and(|color| tile.is_door() && navigation.avoid_door(color)));
        weights[offset] = if blocked { inf } else { 1 };
    }

    if navigation.avoid_enemies {
        avoid_enemies(&enemies.in_sight[player_id], &mut weights, is_destination);
    }

    weights
}

/// Raise costs on and around the given enemy cells. Destination cells are
/// exempt; neighbors already more expensive than the penalty keep their
/// cost.
fn avoid_enemies<F>(enemy_locations: &std::collections::BTreeSet<Offset>, weights: &mut Grid<i32>, is_destination: F)
where
    F: Fn(Offset) -> bool,
{
    let inf = infinity(weights.size());
    for &location in enemy_locations {
        if !is_destination(location) {
            weights[location] = inf;
        }
        for direction in DIRECTIONS {
            let neighbor = location + direction;
            if weights.is_in_range(neighbor)
                && !is_destination(neighbor)
                && weights[neighbor] < ENEMY_PENALTY
            {
                weights[neighbor] = ENEMY_PENALTY;
            }
        }
    }
}

/// Convenience wrapper: weights for a player map with an optional single
/// destination cell carved out.
pub fn weight_map(player_id: usize, map: &PlayerMap, destination: Option<Offset>) -> Grid<i32> {
    weight_map_with(
        player_id,
        map.tiles(),
        &map.enemies,
        map.navigation_parameters(),
        move |p| destination == Some(p),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player_map::DoorParameters;
    use crate::tile::DoorColor;

    fn open_field(width: i32, height: i32) -> Grid<Tile> {
        Grid::new(width, height, Tile::Empty)
    }

    #[test]
    fn open_cells_cost_one() {
        let tiles = open_field(4, 4);
        let weights = weight_map_with(
            0,
            &tiles,
            &Enemies::default(),
            &NavigationParameters::default(),
            |_| false,
        );
        for p in weights.offsets() {
            assert_eq!(weights[p], 1);
        }
    }

    #[test]
    fn walls_boulders_and_keys_are_blocked() {
        let mut tiles = open_field(4, 4);
        tiles[Offset::new(1, 1)] = Tile::Wall;
        tiles[Offset::new(2, 1)] = Tile::Boulder;
        tiles[Offset::new(3, 1)] = Tile::KeyGreen;
        let weights = weight_map_with(
            0,
            &tiles,
            &Enemies::default(),
            &NavigationParameters::default(),
            |_| false,
        );
        let inf = infinity(tiles.size());
        assert_eq!(weights[Offset::new(1, 1)], inf);
        assert_eq!(weights[Offset::new(2, 1)], inf);
        assert_eq!(weights[Offset::new(3, 1)], inf);
        assert_eq!(weights[Offset::new(0, 0)], 1);
    }

    #[test]
    fn doors_block_until_their_flag_clears() {
        let mut tiles = open_field(4, 4);
        tiles[Offset::new(2, 2)] = Tile::DoorRed;
        let mut navigation = NavigationParameters::default();
        let blocked = weight_map_with(0, &tiles, &Enemies::default(), &navigation, |_| false);
        assert_eq!(blocked[Offset::new(2, 2)], infinity(tiles.size()));

        navigation
            .door_parameters
            .insert(DoorColor::Red, DoorParameters { avoid_door: false });
        let open = weight_map_with(0, &tiles, &Enemies::default(), &navigation, |_| false);
        assert_eq!(open[Offset::new(2, 2)], 1);
    }

    #[test]
    fn destination_cells_are_never_blocked() {
        let mut tiles = open_field(4, 4);
        tiles[Offset::new(1, 1)] = Tile::KeyRed;
        tiles[Offset::new(2, 2)] = Tile::DoorRed;
        let destination = Offset::new(1, 1);
        let weights = weight_map_with(
            0,
            &tiles,
            &Enemies::default(),
            &NavigationParameters::default(),
            move |p| p == destination,
        );
        assert_eq!(weights[destination], 1);
        assert_eq!(weights[Offset::new(2, 2)], infinity(tiles.size()));
    }

    #[test]
    fn enemies_in_sight_poison_their_surroundings() {
        let tiles = open_field(5, 5);
        let mut enemies = Enemies::default();
        let enemy = Offset::new(2, 2);
        enemies.in_sight[0].insert(enemy);
        let weights = weight_map_with(
            0,
            &tiles,
            &enemies,
            &NavigationParameters::default(),
            |_| false,
        );
        assert_eq!(weights[enemy], infinity(tiles.size()));
        for d in DIRECTIONS {
            assert_eq!(weights[enemy + d], ENEMY_PENALTY);
        }
        assert_eq!(weights[Offset::new(0, 0)], 1);
    }

    #[test]
    fn enemy_penalty_respects_destination_and_other_players() {
        let tiles = open_field(5, 5);
        let mut enemies = Enemies::default();
        let enemy = Offset::new(2, 2);
        enemies.in_sight[1].insert(enemy);

        // Player 0 does not see this enemy, so no penalty applies to it.
        let for_player0 = weight_map_with(
            0,
            &tiles,
            &enemies,
            &NavigationParameters::default(),
            |_| false,
        );
        assert_eq!(for_player0[enemy], 1);

        // For player 1 the enemy cell is the destination: it stays cheap,
        // only its neighbors are penalized.
        let for_player1 = weight_map_with(1, &tiles, &enemies, &NavigationParameters::default(), {
            move |p| p == enemy
        });
        assert_eq!(for_player1[enemy], 1);
        for d in DIRECTIONS {
            assert_eq!(for_player1[enemy + d], ENEMY_PENALTY);
        }
    }

    #[test]
    fn avoid_enemies_flag_disables_the_penalty() {
        let tiles = open_field(5, 5);
        let mut enemies = Enemies::default();
        enemies.in_sight[0].insert(Offset::new(2, 2));
        let navigation = NavigationParameters {
            avoid_enemies: false,
            ..NavigationParameters::default()
        };
        let weights = weight_map_with(0, &tiles, &enemies, &navigation, |_| false);
        assert_eq!(weights[Offset::new(2, 2)], 1);
        assert_eq!(weights[Offset::new(2, 1)], 1);
    }

    #[test]
    fn infinity_scales_with_the_grid() {
        assert_eq!(infinity(Offset::new(3, 2)), 1200);
        assert_eq!(infinity(Offset::new(10, 10)), 20_000);
    }
}
