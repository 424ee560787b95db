// Visibility-window decoding and view <-> map coordinate conversion.
//
// Each tick the server reports a `(2 * visibility + 1)^2` tile window per
// player, centered on that player, in view coordinates. `ViewWindow` maps
// between those coordinates and dungeon coordinates: the central view cell
// `(visibility, visibility)` corresponds to the player's map position.
//
// See also: `dungeon_map.rs` / `player_map.rs`, which walk a decoded view
// with a `ViewWindow` to fold observations into the map snapshots.

use tracing::error;

use crate::grid::{Grid, Offset, ONE};
use crate::tile::Tile;

/// Converter between view coordinates and map coordinates for one player's
/// visibility window.
#[derive(Clone, Copy, Debug)]
pub struct ViewWindow {
    player_position: Offset,
    center: Offset,
}

impl ViewWindow {
    pub fn new(player_position: Offset, visibility: i32) -> Self {
        assert!(visibility >= 0, "negative visibility range");
        Self {
            player_position,
            center: Offset::new(visibility, visibility),
        }
    }

    /// The expected view grid size for this window.
    pub fn view_size(&self) -> Offset {
        2 * self.center + ONE
    }

    pub fn to_map(&self, view: Offset) -> Offset {
        self.player_position + view - self.center
    }

    pub fn to_view(&self, map: Offset) -> Offset {
        map - self.player_position + self.center
    }
}

/// Decode a raw surroundings array into a tile grid. The array length must
/// be `(2 * visibility + 1)^2`; unrecognized codes are logged and decoded as
/// `Unknown`.
pub fn view_from_surroundings(visibility: i32, surroundings: &[i32]) -> Grid<Tile> {
    let dimension = 2 * visibility + 1;
    assert_eq!(
        surroundings.len(),
        (dimension * dimension) as usize,
        "surroundings length does not match visibility range {visibility}"
    );
    let tiles = surroundings
        .iter()
        .map(|&code| {
            Tile::from_code(code).unwrap_or_else(|| {
                error!(code, "unrecognized tile code in view, treating as unknown");
                Tile::Unknown
            })
        })
        .collect();
    Grid::from_vec(dimension, dimension, tiles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_cell_maps_to_player_position() {
        let window = ViewWindow::new(Offset::new(10, 7), 2);
        assert_eq!(window.to_map(Offset::new(2, 2)), Offset::new(10, 7));
        assert_eq!(window.to_view(Offset::new(10, 7)), Offset::new(2, 2));
    }

    #[test]
    fn conversion_roundtrips() {
        let window = ViewWindow::new(Offset::new(3, 4), 3);
        for view in crate::grid::offsets_in_rectangle(window.view_size()) {
            assert_eq!(window.to_view(window.to_map(view)), view);
        }
    }

    #[test]
    fn corner_cells_map_to_window_corners() {
        let window = ViewWindow::new(Offset::new(5, 5), 1);
        assert_eq!(window.to_map(Offset::new(0, 0)), Offset::new(4, 4));
        assert_eq!(window.to_map(Offset::new(2, 2)), Offset::new(6, 6));
    }

    #[test]
    fn decodes_surroundings_row_major() {
        // visibility 1 -> 3x3 window.
        let codes = vec![0, 3, 0, 1, 2, 1, 0, 4, 0];
        let view = view_from_surroundings(1, &codes);
        assert_eq!(view.size(), Offset::new(3, 3));
        assert_eq!(view[Offset::new(1, 0)], Tile::Wall);
        assert_eq!(view[Offset::new(1, 1)], Tile::Player);
        assert_eq!(view[Offset::new(1, 2)], Tile::Exit);
        assert_eq!(view[Offset::new(0, 0)], Tile::Unknown);
    }

    #[test]
    fn unrecognized_codes_decode_as_unknown() {
        let codes = vec![99, 0, 0, 0, 2, 0, 0, 0, 0];
        let view = view_from_surroundings(1, &codes);
        assert_eq!(view[Offset::new(0, 0)], Tile::Unknown);
    }

    #[test]
    #[should_panic(expected = "surroundings length")]
    fn wrong_length_panics() {
        let codes = vec![0; 8];
        view_from_surroundings(1, &codes);
    }
}
