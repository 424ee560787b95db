// Tile taxonomy: the closed set of tiles the server can report, their
// static properties, and the door/key/plate color family.
//
// Tiles travel over the wire as integer codes (see `gridquest_protocol`);
// `Tile::from_code` decodes them with `Unknown = 0` as the sentinel for
// "no observation". Properties are static per tile — there is no per-cell
// state beyond the tile value itself.
//
// See also: `view.rs` for decoding a surroundings array into a tile grid,
// `dungeon_map.rs` / `player_map.rs` for the consistency rules applied when
// a fresh observation meets a recorded tile.

use crate::grid::{Grid, Offset};

/// Everything a map or view cell can hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum Tile {
    #[default]
    Unknown = 0,
    Empty = 1,
    Player = 2,
    Wall = 3,
    Exit = 4,
    DoorRed = 5,
    KeyRed = 6,
    DoorGreen = 7,
    KeyGreen = 8,
    DoorBlue = 9,
    KeyBlue = 10,
    Boulder = 11,
    PressurePlateRed = 12,
    PressurePlateGreen = 13,
    PressurePlateBlue = 14,
    Enemy = 15,
    Sword = 16,
    Health = 17,
}

/// The color family shared by a door, its key and its pressure plate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DoorColor {
    Red,
    Green,
    Blue,
}

/// All door colors, in the fixed priority order the planner scans them.
pub const DOOR_COLORS: [DoorColor; 3] = [DoorColor::Red, DoorColor::Green, DoorColor::Blue];

impl Tile {
    /// Decode a wire code. Unrecognized codes decode to `None`.
    pub fn from_code(code: i32) -> Option<Tile> {
        use Tile::*;
        Some(match code {
            0 => Unknown,
            1 => Empty,
            2 => Player,
            3 => Wall,
            4 => Exit,
            5 => DoorRed,
            6 => KeyRed,
            7 => DoorGreen,
            8 => KeyGreen,
            9 => DoorBlue,
            10 => KeyBlue,
            11 => Boulder,
            12 => PressurePlateRed,
            13 => PressurePlateGreen,
            14 => PressurePlateBlue,
            15 => Enemy,
            16 => Sword,
            17 => Health,
            _ => return None,
        })
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Items a player can lift with a USE action.
    pub fn can_be_picked_up(self) -> bool {
        matches!(
            self,
            Tile::KeyRed
                | Tile::KeyGreen
                | Tile::KeyBlue
                | Tile::Boulder
                | Tile::Sword
                | Tile::Health
        )
    }

    /// Items that can appear on a previously different cell after a drop.
    pub fn can_be_dropped(self) -> bool {
        self.can_be_picked_up()
    }

    /// Everything except walls can, in principle, be stood on (doors open,
    /// pickups disappear, enemies die).
    pub fn is_potentially_walkable(self) -> bool {
        self != Tile::Wall
    }

    pub fn is_door(self) -> bool {
        matches!(self, Tile::DoorRed | Tile::DoorGreen | Tile::DoorBlue)
    }

    pub fn is_key(self) -> bool {
        matches!(self, Tile::KeyRed | Tile::KeyGreen | Tile::KeyBlue)
    }

    pub fn is_pressure_plate(self) -> bool {
        matches!(
            self,
            Tile::PressurePlateRed | Tile::PressurePlateGreen | Tile::PressurePlateBlue
        )
    }

    /// Only enemies move on their own.
    pub fn can_move(self) -> bool {
        self == Tile::Enemy
    }

    /// The color family of a door, key or pressure plate; `None` for every
    /// other tile.
    pub fn door_color(self) -> Option<DoorColor> {
        Some(match self {
            Tile::DoorRed | Tile::KeyRed | Tile::PressurePlateRed => DoorColor::Red,
            Tile::DoorGreen | Tile::KeyGreen | Tile::PressurePlateGreen => DoorColor::Green,
            Tile::DoorBlue | Tile::KeyBlue | Tile::PressurePlateBlue => DoorColor::Blue,
            _ => return None,
        })
    }

    /// Single-character rendering for ASCII map dumps.
    pub fn to_char(self) -> char {
        match self {
            Tile::Unknown => ' ',
            Tile::Empty => '.',
            Tile::Player => 'O',
            Tile::Wall => '#',
            Tile::Exit => 'E',
            Tile::DoorRed => 'R',
            Tile::KeyRed => 'r',
            Tile::DoorGreen => 'G',
            Tile::KeyGreen => 'g',
            Tile::DoorBlue => 'B',
            Tile::KeyBlue => 'b',
            Tile::Boulder => 'o',
            Tile::PressurePlateRed => '1',
            Tile::PressurePlateGreen => '2',
            Tile::PressurePlateBlue => '3',
            Tile::Enemy => 'M',
            Tile::Sword => '/',
            Tile::Health => '+',
        }
    }
}

impl DoorColor {
    pub fn door_tile(self) -> Tile {
        match self {
            DoorColor::Red => Tile::DoorRed,
            DoorColor::Green => Tile::DoorGreen,
            DoorColor::Blue => Tile::DoorBlue,
        }
    }

    pub fn key_tile(self) -> Tile {
        match self {
            DoorColor::Red => Tile::KeyRed,
            DoorColor::Green => Tile::KeyGreen,
            DoorColor::Blue => Tile::KeyBlue,
        }
    }

    pub fn plate_tile(self) -> Tile {
        match self {
            DoorColor::Red => Tile::PressurePlateRed,
            DoorColor::Green => Tile::PressurePlateGreen,
            DoorColor::Blue => Tile::PressurePlateBlue,
        }
    }
}

impl std::fmt::Display for DoorColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DoorColor::Red => "Red",
            DoorColor::Green => "Green",
            DoorColor::Blue => "Blue",
        };
        write!(f, "{name}")
    }
}

/// Outcome of comparing one freshly observed view cell against the mapped
/// tile at the same position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileComparison {
    /// The map must be rebuilt to absorb this observation.
    pub needs_update: bool,
    /// A boulder appeared on a previously unknown cell.
    pub new_boulder: bool,
    /// An enemy currently stands on this cell.
    pub is_enemy: bool,
}

impl TileComparison {
    const NO_CHANGE: TileComparison = TileComparison {
        needs_update: false,
        new_boulder: false,
        is_enemy: false,
    };
    const NEEDS_UPDATE: TileComparison = TileComparison {
        needs_update: true,
        new_boulder: false,
        is_enemy: false,
    };
    const NEW_BOULDER: TileComparison = TileComparison {
        needs_update: true,
        new_boulder: true,
        is_enemy: false,
    };
    const ENEMY: TileComparison = TileComparison {
        needs_update: false,
        new_boulder: false,
        is_enemy: true,
    };
}

/// Classify a single observation against the mapped tile.
///
/// Walls and exits are permanent: the view may only ever show them again
/// (or nothing; a player may stand on an exit). An enemy observation says
/// nothing about
/// the ground it covers. A player covering a pickup means the pickup was
/// just lifted. Everything else updates the map whenever the observation
/// differs from the record.
pub fn compare_tiles(map: Tile, view: Tile) -> TileComparison {
    if view == Tile::Enemy {
        return TileComparison::ENEMY;
    }
    if map == Tile::Wall {
        debug_assert!(view == Tile::Wall || view == Tile::Unknown);
        return TileComparison::NO_CHANGE;
    }
    if map == Tile::Exit {
        debug_assert!(view == Tile::Exit || view == Tile::Unknown || view == Tile::Player);
        return TileComparison::NO_CHANGE;
    }
    if view == Tile::Player {
        if map.can_be_picked_up() {
            return TileComparison::NEEDS_UPDATE;
        }
        return TileComparison::NO_CHANGE;
    }
    if view == Tile::Boulder && map == Tile::Unknown {
        return TileComparison::NEW_BOULDER;
    }
    if view != Tile::Unknown && view != map {
        return TileComparison::NEEDS_UPDATE;
    }
    TileComparison::NO_CHANGE
}

/// Render a character grid inside a `+---+` border, one row per line.
pub fn render_chars(chars: &Grid<char>) -> String {
    let mut out = String::new();
    let horizontal: String = std::iter::repeat('-').take(chars.width() as usize).collect();
    out.push('+');
    out.push_str(&horizontal);
    out.push_str("+\n");
    for y in 0..chars.height() {
        out.push('|');
        for x in 0..chars.width() {
            out.push(chars[Offset::new(x, y)]);
        }
        out.push_str("|\n");
    }
    out.push('+');
    out.push_str(&horizontal);
    out.push('+');
    out
}

/// Render a tile grid as bordered ASCII art.
pub fn render_tiles(tiles: &Grid<Tile>) -> String {
    render_chars(&tiles.map(|t| t.to_char()))
}
