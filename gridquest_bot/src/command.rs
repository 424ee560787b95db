// The command vocabulary the planner speaks and the interpreter executes.
//
// A command is a high-level, multi-tick unit of work ("fetch that key",
// "hunt the remaining enemies"). The interpreter executes one step of the
// head command per tick; a command reports done when fully finished, at
// which point it is popped and the next one starts — possibly within the
// same tick.
//
// The move-then-use family (`OpenDoor`, `FetchBoulder`, `DropBoulder`,
// `PlaceBoulderOnPressurePlate`) carries a `done` flag: the USE action is
// emitted on the final path step, the flag is set, and the next tick's
// dispatch short-circuits to done. Mutable per-command state lives in the
// variant fields and survives between ticks because the queue hands the
// head command back after each non-final step.
//
// See also: `player.rs` for the per-command semantics, `game.rs` for the
// planner that enqueues these.

use std::collections::BTreeSet;

use gridquest_core::grid::Offset;
use gridquest_core::tile::{DoorColor, Tile};

/// Progress of a `DropDoorOnEnemy` ambush: first wait on the plate until a
/// victim stands under a door, then step off to let the door fall.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropDoorPhase {
    Waiting,
    Leaving { original: Option<Offset> },
}

/// One unit of work for a single player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Walk toward the nearest unexplored (or still wanted) tile until
    /// nothing qualifies.
    Explore,
    /// Walk to the nearest cell holding one of the given tile values.
    VisitTiles { tiles: BTreeSet<Tile> },
    /// Walk to a specific cell. Unreachable is an error unless already
    /// standing there.
    Visit { position: Offset },
    /// Walk onto a key cell to pick it up.
    FetchKey { position: Offset },
    /// Walk adjacent to the door and use the held key on it.
    OpenDoor {
        position: Offset,
        color: DoorColor,
        done: bool,
    },
    /// Walk adjacent to a boulder and pick it up.
    FetchBoulder { position: Offset, done: bool },
    /// Find a good spot and drop the held boulder there.
    DropBoulder { done: bool },
    /// Carry the held boulder onto the plate's cell edge and drop it there.
    PlaceBoulderOnPressurePlate {
        position: Offset,
        color: DoorColor,
        done: bool,
    },
    /// Re-grade the unchecked boulders against the current map.
    ReconsiderUncheckedBoulders,
    /// Do nothing this tick.
    Wait,
    /// Step off the current cell; done once the position changed.
    LeaveSquare { original: Option<Offset> },
    /// Hold a pressure plate open until an enemy stands under one of the
    /// given doors, then step off and let the door crush it.
    DropDoorOnEnemy {
        doors: BTreeSet<Offset>,
        phase: DropDoorPhase,
    },
    /// Reveal the ground currently hidden under enemies at the given
    /// positions.
    PeekUnderEnemies { targets: BTreeSet<Offset> },
    /// Close in on the enemies in sight and strike with the sword.
    Attack,
    /// Sweep the remaining original enemy locations and engage whatever is
    /// still alive.
    HuntEnemies { remaining: BTreeSet<Offset> },
    /// Request a clean shutdown of the session.
    Terminate,
}
