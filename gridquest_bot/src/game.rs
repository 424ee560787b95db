// The mission planner and session orchestration.
//
// `Planner` holds one small state machine per player plus the lead/follower
// role split: the lead drives goal selection, the follower defaults to
// waiting (until a cooperative task or the exit run needs it). It reacts to
// three events from the tick loop, delivered through `GameCallbacks`:
//
// - `level_reached`: print the finished dungeon, reset maps, queues and
//   planner states for the new level;
// - `map_updated`: per-player overrides — engage enemies in sight when
//   armed and healthy enough, or peek under enemies obscuring unexplored
//   ground. States already engaging are never interrupted;
// - `finished`: the player's queue ran dry — pick the next goal. The lead
//   works through: explore, resolve unchecked boulders, open keyed doors,
//   activate pressure plates (boulder if one is reachable, otherwise hold
//   the plate and ambush), head to the exit once every active player can
//   reach it, hunt surviving enemies, and finally terminate.
//
// `check_player_presence` runs before either planner event acts and flips
// players between Inactive and Idle from the server's per-player active
// flag, handing the lead role over when the lead drops out.
//
// `Game` wires the planner and the interpreter to one `GameSession` and
// runs the campaign.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use gridquest_client::connection::GameSession;
use gridquest_core::dijkstra::{distance_map_to, reversed_path};
use gridquest_core::dungeon_map::DungeonMap;
use gridquest_core::grid::Offset;
use gridquest_core::player_map::PlayerMap;
use gridquest_core::tile::{render_tiles, DoorColor, Tile, DOOR_COLORS};
use gridquest_core::weights::{weight_map, weight_map_with};

use crate::command::{Command, DropDoorPhase};
use crate::player::{Player, COMMAND_WAIT};
use crate::state::PlayerState;
use crate::sync::{CommandQueue, Shared};

/// Events the interpreter raises toward the planner.
pub trait GameCallbacks {
    fn level_reached(&mut self, level: i32);
    fn map_updated(&mut self);
    fn finished(&mut self, player_id: usize);
    fn print_dungeon_map(&self);
}

/// Minimum health to pick a sword fight.
pub const ATTACK_MIN_HEALTH: i32 = 6;

/// What a player is currently working toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlannerState {
    Idle,
    Exploring,
    OpeningDoor,
    ReconsideringUncheckedBoulders,
    MovingBoulder,
    MovingToExit,
    Terminating,
    PeekingBelowEnemy,
    AttackingEnemy,
    HuntingEnemies,
    DroppingDoorOnEnemy,
    Inactive,
}

impl PlannerState {
    /// States that must not be interrupted by map-update overrides.
    fn is_engaging(self) -> bool {
        matches!(
            self,
            PlannerState::PeekingBelowEnemy
                | PlannerState::AttackingEnemy
                | PlannerState::DroppingDoorOnEnemy
        )
    }
}

/// Goal selection for both players of one session.
pub struct Planner {
    map_size: Offset,
    level: i32,
    lead_player: usize,
    planner_states: [PlannerState; 2],
    dungeon_map: Arc<Shared<Arc<DungeonMap>>>,
    player_map: Arc<Shared<Arc<PlayerMap>>>,
    states: [Arc<Shared<PlayerState>>; 2],
    commands: [Arc<CommandQueue>; 2],
}

impl Planner {
    pub fn new(
        map_size: Offset,
        dungeon_map: Arc<Shared<Arc<DungeonMap>>>,
        player_map: Arc<Shared<Arc<PlayerMap>>>,
        states: [Arc<Shared<PlayerState>>; 2],
        commands: [Arc<CommandQueue>; 2],
    ) -> Planner {
        Planner {
            map_size,
            level: 0,
            lead_player: 0,
            planner_states: [PlannerState::Idle, PlannerState::Idle],
            dungeon_map,
            player_map,
            states,
            commands,
        }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn lead_player(&self) -> usize {
        self.lead_player
    }

    pub fn planner_state(&self, player_id: usize) -> PlannerState {
        self.planner_states[player_id]
    }

    /// Sync planner states with the server's per-player presence and hand
    /// the lead role over when the lead went inactive.
    pub fn check_player_presence(&mut self) {
        for id in 0..2 {
            let active = self.states[id].lock().active;
            if !active && self.planner_states[id] != PlannerState::Inactive {
                info!(player = id, "player went inactive");
                self.planner_states[id] = PlannerState::Inactive;
            } else if active && self.planner_states[id] == PlannerState::Inactive {
                info!(player = id, "player became active");
                self.planner_states[id] = PlannerState::Idle;
            }
        }

        let follower = 1 - self.lead_player;
        if self.planner_states[self.lead_player] == PlannerState::Inactive
            && self.planner_states[follower] != PlannerState::Inactive
        {
            self.lead_player = follower;
            info!(lead = self.lead_player, "lead role swapped");
        }
    }

    /// First color whose key and door are both known while the door still
    /// blocks navigation. Returns `(color, key position, a door cell)`.
    fn door_to_open(&self, map: &PlayerMap) -> Option<(DoorColor, Offset, Offset)> {
        for color in DOOR_COLORS {
            let data = &map.door_data()[&color];
            if let (Some(key), Some(&door)) = (data.key_position, data.door_positions.iter().next())
            {
                if map.navigation_parameters().avoid_door(color) {
                    return Some((color, key, door));
                }
            }
        }
        None
    }

    /// First color whose pressure plate is known while the door still
    /// blocks navigation.
    fn pressure_plate_to_activate(&self, map: &PlayerMap) -> Option<(DoorColor, Offset)> {
        for color in DOOR_COLORS {
            let data = &map.door_data()[&color];
            if let Some(plate) = data.pressure_plate_position {
                if map.navigation_parameters().avoid_door(color) {
                    return Some((color, plate));
                }
            }
        }
        None
    }

    /// Nearest unchecked boulder reachable from `from`, by path cost.
    fn closest_unchecked_boulder(
        &self,
        id: usize,
        map: &PlayerMap,
        from: Offset,
    ) -> Option<Offset> {
        let unchecked = &map.unchecked_boulders;
        let weights = weight_map_with(
            id,
            map.tiles(),
            &map.enemies,
            map.navigation_parameters(),
            |p| unchecked.contains(&p),
        );
        let (_, destination) = distance_map_to(&weights, from, |p| unchecked.contains(&p));
        destination
    }

    /// Nearest boulder not committed to a plate, measured from the plate
    /// itself (it must be carriable to the plate).
    fn closest_unused_boulder(&self, id: usize, map: &PlayerMap, plate: Offset) -> Option<Offset> {
        let is_candidate =
            |p: Offset| map.tiles()[p] == Tile::Boulder && !map.used_boulders.contains(&p);
        let weights = weight_map_with(
            id,
            map.tiles(),
            &map.enemies,
            map.navigation_parameters(),
            |p| is_candidate(p),
        );
        let (_, destination) = distance_map_to(&weights, plate, |p| is_candidate(p));
        destination
    }

    /// Whether every active player has a path to the known exit.
    fn exit_reachable_by_all(&self, map: &PlayerMap) -> bool {
        let Some(exit) = map.exit() else {
            return false;
        };
        for id in 0..2 {
            let state = self.states[id].get();
            if !state.active || state.position == exit {
                continue;
            }
            let weights = weight_map(id, map, Some(exit));
            if reversed_path(&weights, state.position, |p| p == exit).is_empty() {
                return false;
            }
        }
        true
    }

    /// Enemy positions as first observed — the hunt checklist.
    fn original_enemy_locations(&self) -> BTreeSet<Offset> {
        self.dungeon_map.get().positions_of(Tile::Enemy).collect()
    }

    fn enemies_alive(&self, map: &PlayerMap) -> bool {
        let original = self.original_enemy_locations().len() as u32;
        original > map.enemies.killed
    }

    /// Goal selection for the lead player once its queue ran dry.
    fn plan_lead(&mut self, id: usize) {
        let map = self.player_map.get();
        let position = self.states[id].get().position;
        let door_to_open = self.door_to_open(&map);
        let plate_to_activate = self.pressure_plate_to_activate(&map);
        let boulders_to_move = map.unchecked_boulders.clone();

        info!(
            player = id,
            state = ?self.planner_states[id],
            exit = ?map.exit(),
            ?door_to_open,
            boulders = boulders_to_move.len(),
            "lead planning"
        );

        let mut state = self.planner_states[id];
        if state == PlannerState::MovingBoulder {
            state = PlannerState::Idle;
        } else if state == PlannerState::ReconsideringUncheckedBoulders {
            state = PlannerState::Idle;
            if !boulders_to_move.is_empty() {
                match self.closest_unchecked_boulder(id, &map, position) {
                    Some(boulder) => {
                        info!(player = id, %boulder, "planning to move boulder");
                        self.commands[id].set_commands([
                            Command::FetchBoulder {
                                position: boulder,
                                done: false,
                            },
                            Command::DropBoulder { done: false },
                        ]);
                        state = PlannerState::MovingBoulder;
                    }
                    None => warn!(player = id, "no unchecked boulder reachable"),
                }
            }
        }

        if state != PlannerState::MovingBoulder {
            if state != PlannerState::Exploring {
                info!(player = id, "resuming exploration");
                self.commands[id].set_commands([Command::Explore]);
                state = PlannerState::Exploring;
            } else if !boulders_to_move.is_empty() {
                info!(player = id, "reconsidering unchecked boulders");
                self.commands[id].set_commands([Command::ReconsiderUncheckedBoulders]);
                state = PlannerState::ReconsideringUncheckedBoulders;
            } else if let Some((color, key, door)) = door_to_open {
                info!(player = id, %color, "planning to open door");
                self.commands[id].set_commands([
                    Command::FetchKey { position: key },
                    Command::OpenDoor {
                        position: door,
                        color,
                        done: false,
                    },
                ]);
                state = PlannerState::OpeningDoor;
            } else if let Some((color, plate)) = plate_to_activate {
                match self.closest_unused_boulder(id, &map, plate) {
                    Some(boulder) => {
                        info!(player = id, %color, %boulder, "planning to weigh down plate");
                        self.commands[id].set_commands([
                            Command::FetchBoulder {
                                position: boulder,
                                done: false,
                            },
                            Command::PlaceBoulderOnPressurePlate {
                                position: plate,
                                color,
                                done: false,
                            },
                        ]);
                        state = PlannerState::MovingBoulder;
                    }
                    None => {
                        info!(player = id, %color, "no boulder for plate, setting an ambush");
                        let doors = map.door_data()[&color].door_positions.clone();
                        self.commands[id].set_commands([
                            Command::Visit { position: plate },
                            Command::DropDoorOnEnemy {
                                doors,
                                phase: DropDoorPhase::Waiting,
                            },
                        ]);
                        state = PlannerState::DroppingDoorOnEnemy;
                    }
                }
            } else if let Some(exit) = map.exit().filter(|_| self.exit_reachable_by_all(&map)) {
                info!(%exit, "heading for the exit");
                for pid in 0..2 {
                    if self.states[pid].lock().active {
                        self.commands[pid].set_commands([Command::Visit { position: exit }]);
                        self.planner_states[pid] = PlannerState::MovingToExit;
                    }
                }
                state = PlannerState::MovingToExit;
            } else if self.enemies_alive(&map) {
                info!(player = id, "hunting the remaining enemies");
                self.commands[id].set_commands([Command::HuntEnemies {
                    remaining: self.original_enemy_locations(),
                }]);
                state = PlannerState::HuntingEnemies;
            } else {
                info!(player = id, "nothing left to do, terminating");
                self.commands[id].set_commands([Command::Terminate]);
                state = PlannerState::Terminating;
            }
        }

        self.planner_states[id] = state;
    }
}

impl GameCallbacks for Planner {
    fn level_reached(&mut self, level: i32) {
        self.print_dungeon_map();
        println!("Reached level {level}!");
        self.level = level;
        self.dungeon_map.set(DungeonMap::new(self.map_size));
        self.player_map.set(PlayerMap::new(self.map_size));
        for queue in &self.commands {
            queue.clear();
        }
        self.planner_states = [PlannerState::Idle, PlannerState::Idle];
    }

    fn map_updated(&mut self) {
        self.check_player_presence();
        let map = self.player_map.get();

        for id in 0..2 {
            let state = self.states[id].get();
            if !state.active || self.planner_states[id].is_engaging() {
                continue;
            }
            let in_sight = &map.enemies.in_sight[id];
            if in_sight.is_empty() {
                continue;
            }

            if state.has_sword && state.health >= ATTACK_MIN_HEALTH {
                info!(player = id, "armed and healthy, engaging enemies in sight");
                self.commands[id].set_commands([Command::Attack]);
                self.planner_states[id] = PlannerState::AttackingEnemy;
                continue;
            }

            let obscured: BTreeSet<Offset> = in_sight
                .iter()
                .copied()
                .filter(|&p| {
                    map.tiles()
                        .get(p)
                        .map_or(true, |&tile| tile == Tile::Unknown)
                })
                .collect();
            if !obscured.is_empty() {
                info!(player = id, targets = obscured.len(), "peeking under enemies");
                self.commands[id].set_commands([Command::PeekUnderEnemies { targets: obscured }]);
                self.planner_states[id] = PlannerState::PeekingBelowEnemy;
            }
        }
    }

    fn finished(&mut self, player_id: usize) {
        self.check_player_presence();
        info!(
            player = player_id,
            state = ?self.planner_states[player_id],
            "finished task"
        );

        if player_id != self.lead_player {
            self.commands[player_id].set_commands([Command::Wait]);
            self.planner_states[player_id] = PlannerState::Idle;
            return;
        }
        self.plan_lead(player_id);
    }

    fn print_dungeon_map(&self) {
        println!("{}", render_tiles(self.dungeon_map.get().tiles()));
    }
}

/// One full campaign: session + interpreter + planner.
pub struct Game {
    player: Player,
    planner: Planner,
    expected_level: Option<i32>,
}

impl Game {
    pub fn new(session: GameSession, expected_level: Option<i32>) -> Game {
        Game::with_command_wait(session, expected_level, COMMAND_WAIT)
    }

    /// Like `new` but with a custom queue-starvation delay (tests use a
    /// short one).
    pub fn with_command_wait(
        session: GameSession,
        expected_level: Option<i32>,
        command_wait: Duration,
    ) -> Game {
        let map_size = Offset::new(session.map_width(), session.map_height());
        let dungeon_map = Arc::new(Shared::new(DungeonMap::new(map_size)));
        let player_map = Arc::new(Shared::new(PlayerMap::new(map_size)));
        let states = [
            Arc::new(Shared::new(PlayerState::new(0))),
            Arc::new(Shared::new(PlayerState::new(1))),
        ];
        let commands = [Arc::new(CommandQueue::new()), Arc::new(CommandQueue::new())];

        let planner = Planner::new(
            map_size,
            Arc::clone(&dungeon_map),
            Arc::clone(&player_map),
            [Arc::clone(&states[0]), Arc::clone(&states[1])],
            [Arc::clone(&commands[0]), Arc::clone(&commands[1])],
        );
        let player = Player::new(
            session,
            dungeon_map,
            player_map,
            states,
            commands,
            command_wait,
        );

        Game {
            player,
            planner,
            expected_level,
        }
    }

    /// Run the campaign to completion.
    pub fn run(&mut self) -> Result<(), String> {
        self.player.run(&mut self.planner)?;
        if let Some(expected) = self.expected_level {
            let reached = self.player.current_level();
            if reached != expected {
                return Err(format!("expected level {expected}, but reached {reached}"));
            }
        }
        Ok(())
    }
}
