// The command interpreter and the tick loop.
//
// `Player` manages both player slots of one game session. Its `run` loop
// drives the whole bot: ingest the server report, fold the views into the
// map snapshots, let the planner react, execute one step of each player's
// head command, and submit the chosen actions.
//
// Command contract: executing a command returns `Ok(true)` when it is
// fully done (the interpreter pops it and continues with the next command
// in the same tick), `Ok(false)` when it consumed this tick (the player's
// `next` action is set), and `Err` for planning dead-ends that are fatal
// for the run. When a queue runs dry the interpreter notifies the planner
// (`finished`) and then blocks on the queue's condvar until new commands
// arrive or the starvation deadline passes, in which case it emits `None`
// and the game simply idles one tick.
//
// Path mechanics: paths are destination-first, so `reversed_path.last()`
// is the next step. Move-then-use commands emit a USE action instead of a
// move on the final step (`path_length == 1` means "adjacent to the
// goal").
//
// See also: `command.rs` for the vocabulary, `game.rs` for the planner
// reacting to `finished`/`map_updated`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use gridquest_client::connection::GameSession;
use gridquest_core::dijkstra::reversed_path;
use gridquest_core::dungeon_map::DungeonMap;
use gridquest_core::grid::{Grid, Offset, DIRECTIONS, EAST, NORTH, SOUTH, WEST};
use gridquest_core::player_map::PlayerMap;
use gridquest_core::tile::{DoorColor, Tile};
use gridquest_core::view::{view_from_surroundings, ViewWindow};
use gridquest_core::weights::{weight_map, weight_map_with};
use gridquest_protocol::message::{DirectedAction, GameStatus, State};

use crate::command::{Command, DropDoorPhase};
use crate::game::GameCallbacks;
use crate::state::PlayerState;
use crate::sync::{CommandQueue, Shared};

/// How long an empty command queue may starve before the interpreter
/// emits `None` and moves on.
pub const COMMAND_WAIT: Duration = Duration::from_secs(8);

/// Peek heuristics: flee when the obscuring enemy is this close ...
const PEEK_FLEE_DISTANCE: usize = 1;
/// ... approach when it is at least this far, otherwise hold still.
const PEEK_APPROACH_DISTANCE: usize = 3;

/// Attack holds position at this path length and lets the enemy close in.
const ATTACK_HOLD_DISTANCE: usize = 2;

fn move_action(direction: Offset) -> Result<DirectedAction, String> {
    if direction == NORTH {
        Ok(DirectedAction::MoveNorth)
    } else if direction == EAST {
        Ok(DirectedAction::MoveEast)
    } else if direction == SOUTH {
        Ok(DirectedAction::MoveSouth)
    } else if direction == WEST {
        Ok(DirectedAction::MoveWest)
    } else {
        Err(format!("not a unit cardinal step: {direction}"))
    }
}

fn use_action(direction: Offset) -> Result<DirectedAction, String> {
    if direction == NORTH {
        Ok(DirectedAction::UseNorth)
    } else if direction == EAST {
        Ok(DirectedAction::UseEast)
    } else if direction == SOUTH {
        Ok(DirectedAction::UseSouth)
    } else if direction == WEST {
        Ok(DirectedAction::UseWest)
    } else {
        Err(format!("not a unit cardinal step: {direction}"))
    }
}

/// Emit a move along the current path.
fn step_along_path(state: &mut PlayerState) -> Result<(), String> {
    let Some(&next_cell) = state.reversed_path.last() else {
        return Err("no path to step along".into());
    };
    state.next = move_action(next_cell - state.position)?;
    Ok(())
}

/// Emit a move along the path, or a USE toward the goal on the final step.
/// Returns whether the USE was emitted.
fn step_along_path_or_use(state: &mut PlayerState) -> Result<bool, String> {
    let Some(&next_cell) = state.reversed_path.last() else {
        return Err("no path to step along".into());
    };
    let direction = next_cell - state.position;
    if state.path_length == 1 {
        state.next = use_action(direction)?;
        Ok(true)
    } else {
        state.next = move_action(direction)?;
        Ok(false)
    }
}

/// Interpreter for both player slots of one session.
pub struct Player {
    session: GameSession,
    visibility: i32,
    level: i32,
    dungeon_map: Arc<Shared<Arc<DungeonMap>>>,
    player_map: Arc<Shared<Arc<PlayerMap>>>,
    states: [Arc<Shared<PlayerState>>; 2],
    commands: [Arc<CommandQueue>; 2],
    command_wait: Duration,
}

impl Player {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: GameSession,
        dungeon_map: Arc<Shared<Arc<DungeonMap>>>,
        player_map: Arc<Shared<Arc<PlayerMap>>>,
        states: [Arc<Shared<PlayerState>>; 2],
        commands: [Arc<CommandQueue>; 2],
        command_wait: Duration,
    ) -> Player {
        let visibility = session.visibility_range();
        println!("Game {} started", session.game_id());
        println!("- seed: {}", session.seed());
        println!("- map size: {}x{}", session.map_width(), session.map_height());
        println!("- visibility: {visibility}");

        Player {
            session,
            visibility,
            level: -1,
            dungeon_map,
            player_map,
            states,
            commands,
            command_wait,
        }
    }

    /// The tick loop. Runs until the server reports a terminal status or a
    /// `Terminate` command asks for a clean exit.
    pub fn run(&mut self, callbacks: &mut dyn GameCallbacks) -> Result<(), String> {
        loop {
            let report = self.session.state().clone();
            match report.status {
                GameStatus::Active => {}
                GameStatus::FinishedSuccess => return Ok(()),
                other => return Err(format!("game finished without success: {other:?}")),
            }

            if report.level != self.level {
                callbacks.level_reached(report.level);
                self.initialize_level();
                self.level = report.level;
            }

            self.ingest(&report);
            if self.update_maps() {
                callbacks.map_updated();
            }

            self.update_plan(0, callbacks)?;
            self.update_plan(1, callbacks)?;

            if self.terminate_requested() {
                info!("termination requested, leaving the game loop");
                return Ok(());
            }

            let action = {
                let state = self.states[0].lock();
                if state.active {
                    state.next
                } else {
                    DirectedAction::None
                }
            };
            let action2 = {
                let state = self.states[1].lock();
                if state.active {
                    Some(state.next)
                } else {
                    None
                }
            };
            debug!(tick = report.tick, ?action, ?action2, "acting");
            self.session.act(action, action2)?;
        }
    }

    pub fn current_level(&self) -> i32 {
        self.level
    }

    fn initialize_level(&self) {
        for id in 0..2 {
            self.states[id].lock().reset_for_level();
        }
    }

    /// Seed the per-player states from the latest report.
    fn ingest(&self, report: &State) {
        let snapshots = [&report.player_state, &report.player2_state];
        for (id, snapshot) in snapshots.into_iter().enumerate() {
            let mut state = self.states[id].lock();
            match snapshot {
                Some(snapshot) => {
                    state.active = true;
                    state.position = Offset::new(snapshot.position.0, snapshot.position.1);
                    state.visibility = self.visibility;
                    state.view =
                        Some(view_from_surroundings(self.visibility, &snapshot.surroundings));
                    if let Some(has_sword) = snapshot.has_sword {
                        state.has_sword = has_sword;
                    }
                    if let Some(health) = snapshot.health {
                        state.health = health;
                    }
                }
                None => {
                    state.active = false;
                    state.next = DirectedAction::None;
                }
            }
        }
    }

    /// Fold every active player's view into both map snapshots. Returns
    /// whether the player map changed.
    fn update_maps(&self) -> bool {
        let mut changed = false;
        for id in 0..2 {
            let (active, position, view) = {
                let state = self.states[id].lock();
                (state.active, state.position, state.view.clone())
            };
            if !active {
                continue;
            }
            let Some(view) = view else { continue };

            {
                let mut handle = self.dungeon_map.lock();
                *handle = DungeonMap::update(&handle, position, self.visibility, &view);
            }
            {
                let mut handle = self.player_map.lock();
                let updated = PlayerMap::update(&handle, id, position, self.visibility, &view);
                if !Arc::ptr_eq(&updated, &*handle) {
                    changed = true;
                }
                *handle = updated;
            }
        }
        changed
    }

    fn terminate_requested(&self) -> bool {
        (0..2).any(|id| self.states[id].lock().terminate_requested)
    }

    /// Execute command steps for one player until a tick is consumed.
    fn update_plan(
        &mut self,
        id: usize,
        callbacks: &mut dyn GameCallbacks,
    ) -> Result<(), String> {
        if !self.states[id].lock().active {
            return Ok(());
        }
        loop {
            match self.commands[id].pop_front() {
                Some(mut command) => {
                    self.states[id].lock().last_command_time = Instant::now();
                    debug!(player = id, ?command, "executing");
                    match self.execute(id, &mut command) {
                        Ok(true) => continue,
                        Ok(false) => {
                            self.commands[id].restore_front(command);
                            return Ok(());
                        }
                        Err(error) => {
                            return Err(format!("player {id}: {error} (command {command:?})"))
                        }
                    }
                }
                None => {
                    callbacks.finished(id);
                    let deadline = self.states[id].lock().last_command_time + self.command_wait;
                    if self.commands[id].wait_until_non_empty(deadline) {
                        continue;
                    }
                    self.states[id].lock().next = DirectedAction::None;
                    return Ok(());
                }
            }
        }
    }

    fn execute(&mut self, id: usize, command: &mut Command) -> Result<bool, String> {
        match command {
            Command::Explore => self.explore(id),
            Command::VisitTiles { tiles } => self.visit_tiles(id, tiles),
            Command::Visit { position } => self.visit(id, *position),
            Command::FetchKey { position } => self.visit(id, *position),
            Command::OpenDoor {
                position,
                color,
                done,
            } => self.open_door(id, *position, *color, done),
            Command::FetchBoulder { position, done } => self.fetch_boulder(id, *position, done),
            Command::DropBoulder { done } => self.drop_boulder(id, done),
            Command::PlaceBoulderOnPressurePlate {
                position,
                color,
                done,
            } => self.place_boulder_on_pressure_plate(id, *position, *color, done),
            Command::ReconsiderUncheckedBoulders => self.reconsider_unchecked_boulders(),
            Command::Wait => self.wait(id),
            Command::LeaveSquare { original } => self.leave_square(id, original),
            Command::DropDoorOnEnemy { doors, phase } => {
                self.drop_door_on_enemy(id, doors, phase)
            }
            Command::PeekUnderEnemies { targets } => self.peek_under_enemies(id, targets),
            Command::Attack => self.attack(id),
            Command::HuntEnemies { remaining } => self.hunt_enemies(id, remaining),
            Command::Terminate => self.terminate(id),
        }
    }

    /// Walk toward the nearest cell whose mapped tile is in `tiles`. Done
    /// when no such cell is reachable (including already standing on one).
    fn visit_tiles(&self, id: usize, tiles: &BTreeSet<Tile>) -> Result<bool, String> {
        let map = self.player_map.get();
        let weights = weight_map(id, &map, None);
        let mut state = self.states[id].lock();
        let position = state.position;
        state.reversed_path = reversed_path(&weights, position, |p| tiles.contains(&map.tiles()[p]));
        state.path_length = state.reversed_path.len();
        if state.reversed_path.is_empty() {
            return Ok(true);
        }
        step_along_path(&mut state)?;
        Ok(false)
    }

    /// Walk to one specific cell. Unreachable is a planning dead-end.
    fn visit(&self, id: usize, destination: Offset) -> Result<bool, String> {
        let map = self.player_map.get();
        let weights = weight_map(id, &map, Some(destination));
        let mut state = self.states[id].lock();
        let position = state.position;
        state.reversed_path = reversed_path(&weights, position, |p| p == destination);
        state.path_length = state.reversed_path.len();
        if state.reversed_path.is_empty() {
            if position == destination {
                return Ok(true);
            }
            return Err(format!("destination {destination} unreachable"));
        }
        step_along_path(&mut state)?;
        Ok(false)
    }

    /// Visit the nearest unknown tile — plus health, and a sword while we
    /// lack one. Done when nothing qualifying is reachable.
    fn explore(&self, id: usize) -> Result<bool, String> {
        let has_sword = self.states[id].lock().has_sword;
        let mut tiles = BTreeSet::from([Tile::Unknown, Tile::Health]);
        if !has_sword {
            tiles.insert(Tile::Sword);
        }
        self.visit_tiles(id, &tiles)
    }

    /// Shared move-then-use mechanics: walk the path, emit USE on the
    /// final step, run `on_use` once, and report done on the next tick.
    fn move_then_use<P, F>(
        &self,
        id: usize,
        done: &mut bool,
        weights: &Grid<i32>,
        predicate: P,
        on_use: F,
    ) -> Result<bool, String>
    where
        P: FnMut(Offset) -> bool,
        F: FnOnce(&Self),
    {
        if *done {
            return Ok(true);
        }
        let used = {
            let mut state = self.states[id].lock();
            let position = state.position;
            state.reversed_path = reversed_path(weights, position, predicate);
            state.path_length = state.reversed_path.len();
            if state.reversed_path.is_empty() {
                return Err("destination unreachable".into());
            }
            debug!(player = id, goal = %state.reversed_path[0], "moving to use");
            step_along_path_or_use(&mut state)?
        };
        if used {
            *done = true;
            on_use(self);
        }
        Ok(false)
    }

    /// Walk next to the door and use the carried key on it. Clears the
    /// avoid flag for that color once used.
    fn open_door(
        &self,
        id: usize,
        position: Offset,
        color: DoorColor,
        done: &mut bool,
    ) -> Result<bool, String> {
        let map = self.player_map.get();
        let weights = weight_map(id, &map, Some(position));
        self.move_then_use(id, done, &weights, |p| p == position, |player| {
            info!(%position, %color, "door opened");
            let mut next = (*map).clone();
            next.set_avoid_door(color, false);
            player.player_map.set(Arc::new(next));
        })
    }

    /// Walk next to the boulder and lift it. The boulder leaves both
    /// bookkeeping sets: it is in hand now.
    fn fetch_boulder(&self, id: usize, position: Offset, done: &mut bool) -> Result<bool, String> {
        let map = self.player_map.get();
        let weights = weight_map(id, &map, Some(position));
        self.move_then_use(id, done, &weights, |p| p == position, |player| {
            info!(%position, "boulder picked up");
            let mut next = (*map).clone();
            next.unchecked_boulders.remove(&position);
            next.used_boulders.remove(&position);
            player.player_map.set(Arc::new(next));
        })
    }

    /// Find the nearest empty cell where dropping the carried boulder does
    /// not pinch the map, and drop it there.
    fn drop_boulder(&self, id: usize, done: &mut bool) -> Result<bool, String> {
        let map = self.player_map.get();
        let weights = weight_map(id, &map, None);
        let my_position = self.states[id].lock().position;
        let tiles = map.tiles();
        let predicate = |p: Offset| {
            tiles[p] == Tile::Empty && map.is_good_boulder(p) && p != my_position
        };
        self.move_then_use(id, done, &weights, predicate, |_player| {
            info!("boulder dropped");
        })
    }

    /// Carry the boulder to the plate and drop it on top. The plate holds
    /// the boulder forever after, and the door color stops blocking paths.
    fn place_boulder_on_pressure_plate(
        &self,
        id: usize,
        plate: Offset,
        color: DoorColor,
        done: &mut bool,
    ) -> Result<bool, String> {
        let map = self.player_map.get();
        let weights = weight_map(id, &map, Some(plate));
        self.move_then_use(id, done, &weights, |p| p == plate, |player| {
            info!(%plate, %color, "boulder placed on pressure plate");
            let mut next = (*map).clone();
            next.used_boulders.insert(plate);
            next.set_avoid_door(color, false);
            player.player_map.set(Arc::new(next));
        })
    }

    /// Keep only the unchecked boulders whose drop spot is still not good.
    fn reconsider_unchecked_boulders(&self) -> Result<bool, String> {
        let map = self.player_map.get();
        let mut next = (*map).clone();
        next.unchecked_boulders = map
            .unchecked_boulders
            .iter()
            .copied()
            .filter(|&p| !map.is_good_boulder(p))
            .collect();
        info!(
            remaining = next.unchecked_boulders.len(),
            "reconsidered unchecked boulders"
        );
        self.player_map.set(Arc::new(next));
        Ok(true)
    }

    fn wait(&self, id: usize) -> Result<bool, String> {
        self.states[id].lock().next = DirectedAction::None;
        Ok(false)
    }

    /// Step off the current cell; done once the position differs from
    /// where the command started.
    fn leave_square(&self, id: usize, original: &mut Option<Offset>) -> Result<bool, String> {
        let map = self.player_map.get();
        let mut state = self.states[id].lock();
        let origin = *original.get_or_insert(state.position);
        if state.position != origin {
            return Ok(true);
        }
        Self::step_off_current_square(id, &map, &mut state)?;
        Ok(false)
    }

    /// One-tick flavor of leave-square: move toward any reachable cell
    /// other than the current one; hold still when boxed in.
    fn step_off_current_square(
        id: usize,
        map: &PlayerMap,
        state: &mut PlayerState,
    ) -> Result<(), String> {
        let weights = weight_map(id, map, None);
        let position = state.position;
        state.reversed_path = reversed_path(&weights, position, |p| p != position);
        state.path_length = state.reversed_path.len();
        if state.reversed_path.is_empty() {
            state.next = DirectedAction::None;
            return Ok(());
        }
        step_along_path(state)
    }

    /// Hold the plate until a tracked enemy stands next to one of the
    /// doors, then step off so the falling door crushes it.
    fn drop_door_on_enemy(
        &self,
        id: usize,
        doors: &BTreeSet<Offset>,
        phase: &mut DropDoorPhase,
    ) -> Result<bool, String> {
        if *phase == DropDoorPhase::Waiting {
            let map = self.player_map.get();
            let victim = map.enemies.locations.keys().copied().find(|&enemy| {
                doors
                    .iter()
                    .any(|&door| DIRECTIONS.iter().any(|&d| door + d == enemy))
            });
            match victim {
                Some(enemy) => {
                    info!(%enemy, "enemy at the door, stepping off the plate");
                    *phase = DropDoorPhase::Leaving { original: None };
                }
                None => {
                    self.states[id].lock().next = DirectedAction::None;
                    return Ok(false);
                }
            }
        }
        let DropDoorPhase::Leaving { original } = phase else {
            return Err("drop-door phase out of sync".into());
        };
        if self.leave_square(id, original)? {
            let map = self.player_map.get();
            let mut next = (*map).clone();
            next.enemies.killed += 1;
            let killed = next.enemies.killed;
            // The watched doors are dealt with: the crushed victim jams
            // them, so they no longer block navigation.
            for color in gridquest_core::tile::DOOR_COLORS {
                if map.door_data()[&color]
                    .door_positions
                    .iter()
                    .any(|p| doors.contains(p))
                {
                    next.set_avoid_door(color, false);
                }
            }
            self.player_map.set(Arc::new(next));
            info!(killed, "door dropped on enemy");
            return Ok(true);
        }
        Ok(false)
    }

    /// Reveal the ground currently hidden under enemies. Keeps its
    /// distance: flee when the obscuring enemy is adjacent, approach when
    /// it is far, hold in between.
    fn peek_under_enemies(
        &self,
        id: usize,
        targets: &mut BTreeSet<Offset>,
    ) -> Result<bool, String> {
        let map = self.player_map.get();
        targets.retain(|&p| {
            map.tiles()
                .get(p)
                .map_or(false, |&tile| tile == Tile::Unknown)
        });
        if targets.is_empty() {
            return Ok(true);
        }

        let mut navigation = map.navigation_parameters().clone();
        navigation.avoid_enemies = false;
        let weights =
            weight_map_with(id, map.tiles(), &map.enemies, &navigation, |p| {
                targets.contains(&p)
            });

        let mut state = self.states[id].lock();
        let position = state.position;
        state.reversed_path = reversed_path(&weights, position, |p| targets.contains(&p));
        state.path_length = state.reversed_path.len();
        if state.reversed_path.is_empty() {
            state.next = DirectedAction::None;
            return Ok(false);
        }

        let destination = state.reversed_path[0];
        let distance = state.path_length;
        if map.enemies.in_sight[id].contains(&destination) {
            if distance <= PEEK_FLEE_DISTANCE {
                Self::step_off_current_square(id, &map, &mut state)?;
            } else if distance >= PEEK_APPROACH_DISTANCE {
                step_along_path(&mut state)?;
            } else {
                state.next = DirectedAction::None;
            }
        } else {
            step_along_path(&mut state)?;
        }
        Ok(false)
    }

    /// Close in on the enemies in sight; hold at distance two and let the
    /// enemy step into range, strike when adjacent. Done when no enemy is
    /// in sight anymore (one kill) or health is too low to fight.
    fn attack(&self, id: usize) -> Result<bool, String> {
        let map = self.player_map.get();
        let in_sight = map.enemies.in_sight[id].clone();
        if in_sight.is_empty() {
            let mut next = (*map).clone();
            next.enemies.killed += 1;
            info!(killed = next.enemies.killed, "enemy slain");
            self.player_map.set(Arc::new(next));
            return Ok(true);
        }

        let mut state = self.states[id].lock();
        if state.health <= 1 {
            info!(health = state.health, "too hurt to fight, abandoning attack");
            return Ok(true);
        }

        let mut navigation = map.navigation_parameters().clone();
        navigation.avoid_enemies = false;
        let weights = weight_map_with(id, map.tiles(), &map.enemies, &navigation, |p| {
            in_sight.contains(&p)
        });
        let position = state.position;
        state.reversed_path = reversed_path(&weights, position, |p| in_sight.contains(&p));
        state.path_length = state.reversed_path.len();

        if state.reversed_path.is_empty() || state.path_length == ATTACK_HOLD_DISTANCE {
            state.next = DirectedAction::None;
            return Ok(false);
        }
        step_along_path_or_use(&mut state)?;
        Ok(false)
    }

    /// Sweep the remaining original enemy locations. Any location some
    /// active player currently sees enemy-free is crossed off; the rest,
    /// together with the live tracked enemies, are the destinations.
    fn hunt_enemies(&self, id: usize, remaining: &mut BTreeSet<Offset>) -> Result<bool, String> {
        let map = self.player_map.get();

        for pid in 0..2 {
            let state = self.states[pid].lock();
            if !state.active {
                continue;
            }
            let Some(view) = &state.view else { continue };
            let window = ViewWindow::new(state.position, state.visibility);
            remaining.retain(|&p| {
                let in_view = window.to_view(p);
                !(view.is_in_range(in_view)
                    && view[in_view] != Tile::Unknown
                    && view[in_view] != Tile::Enemy)
            });
        }

        let mut destinations: BTreeSet<Offset> =
            map.enemies.locations.keys().copied().collect();
        destinations.extend(remaining.iter().copied());
        if destinations.is_empty() {
            info!("hunt complete, no enemy locations left to check");
            return Ok(true);
        }

        let weights = weight_map_with(
            id,
            map.tiles(),
            &map.enemies,
            map.navigation_parameters(),
            |p| destinations.contains(&p),
        );
        let mut state = self.states[id].lock();
        let position = state.position;
        state.reversed_path = reversed_path(&weights, position, |p| destinations.contains(&p));
        state.path_length = state.reversed_path.len();
        if state.reversed_path.is_empty() {
            state.next = DirectedAction::None;
            return Ok(false);
        }
        step_along_path(&mut state)?;
        Ok(false)
    }

    fn terminate(&self, id: usize) -> Result<bool, String> {
        let mut state = self.states[id].lock();
        state.terminate_requested = true;
        state.next = DirectedAction::None;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_mapping_covers_the_cardinals() {
        assert_eq!(move_action(NORTH).unwrap(), DirectedAction::MoveNorth);
        assert_eq!(move_action(EAST).unwrap(), DirectedAction::MoveEast);
        assert_eq!(move_action(SOUTH).unwrap(), DirectedAction::MoveSouth);
        assert_eq!(move_action(WEST).unwrap(), DirectedAction::MoveWest);
        assert_eq!(use_action(NORTH).unwrap(), DirectedAction::UseNorth);
        assert!(move_action(Offset::new(1, 1)).is_err());
        assert!(use_action(Offset::new(0, 2)).is_err());
    }

    #[test]
    fn step_emits_move_toward_the_path_tail() {
        let mut state = PlayerState::new(0);
        state.position = Offset::new(2, 2);
        state.reversed_path = vec![Offset::new(4, 2), Offset::new(3, 2)];
        state.path_length = 2;
        step_along_path(&mut state).unwrap();
        assert_eq!(state.next, DirectedAction::MoveEast);
    }

    #[test]
    fn final_step_becomes_a_use() {
        let mut state = PlayerState::new(0);
        state.position = Offset::new(2, 2);
        state.reversed_path = vec![Offset::new(2, 1)];
        state.path_length = 1;
        let used = step_along_path_or_use(&mut state).unwrap();
        assert!(used);
        assert_eq!(state.next, DirectedAction::UseNorth);
    }

    #[test]
    fn non_final_step_stays_a_move() {
        let mut state = PlayerState::new(0);
        state.position = Offset::new(2, 2);
        state.reversed_path = vec![Offset::new(2, 4), Offset::new(2, 3)];
        state.path_length = 2;
        let used = step_along_path_or_use(&mut state).unwrap();
        assert!(!used);
        assert_eq!(state.next, DirectedAction::MoveSouth);
    }

    #[test]
    fn diagonal_step_is_rejected() {
        let mut state = PlayerState::new(0);
        state.position = Offset::new(2, 2);
        state.reversed_path = vec![Offset::new(3, 3)];
        state.path_length = 1;
        assert!(step_along_path(&mut state).is_err());
    }
}
