// Per-player mutable snapshot.
//
// One `PlayerState` per player slot (two in total), wrapped in
// `sync::Shared` so the planner can read consistent snapshots while the
// interpreter edits in place. The state lives for the whole session; level
// transitions reset the path bookkeeping and the per-tick observation
// fields are re-seeded from every server report.

use std::time::Instant;

use gridquest_core::grid::{Grid, Offset};
use gridquest_core::tile::Tile;
use gridquest_protocol::message::DirectedAction;

/// Default health assumed until the server reports a value.
pub const DEFAULT_HEALTH: i32 = 5;

#[derive(Clone, Debug)]
pub struct PlayerState {
    /// Whether this player is present in the current tick's report.
    pub active: bool,
    pub player_id: usize,
    /// Last reported position.
    pub position: Offset,
    /// The action chosen for this tick.
    pub next: DirectedAction,
    /// Current path, destination-first; `reversed_path.last()` is the next
    /// step, `reversed_path.first()` the goal.
    pub reversed_path: Vec<Offset>,
    /// `reversed_path.len()` at computation time; 0 when the destination
    /// was unreachable. A value of 1 means "adjacent to the destination".
    pub path_length: usize,
    pub has_sword: bool,
    pub health: i32,
    /// Visibility range of the current game (constant per session).
    pub visibility: i32,
    /// The last view window received for this player.
    pub view: Option<Grid<Tile>>,
    /// When this player last executed a command; the starvation deadline
    /// is measured from here.
    pub last_command_time: Instant,
    /// Set by the `Terminate` command; observed by the tick loop.
    pub terminate_requested: bool,
}

impl PlayerState {
    pub fn new(player_id: usize) -> PlayerState {
        PlayerState {
            active: false,
            player_id,
            position: Offset::new(0, 0),
            next: DirectedAction::None,
            reversed_path: Vec::new(),
            path_length: 0,
            has_sword: false,
            health: DEFAULT_HEALTH,
            visibility: 0,
            view: None,
            last_command_time: Instant::now(),
            terminate_requested: false,
        }
    }

    /// Reset path bookkeeping at a level transition. Identity and health
    /// carry over; observations are re-seeded by the next report.
    pub fn reset_for_level(&mut self) {
        self.next = DirectedAction::None;
        self.reversed_path.clear();
        self.path_length = 0;
        self.view = None;
        self.last_command_time = Instant::now();
    }
}
