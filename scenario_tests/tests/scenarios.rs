// End-to-end scenarios: a real bot against the scripted game server.
//
// Every test starts the server on a random port, connects through the real
// transport, and runs the full bot (maps, planner, interpreter). Scenarios
// mirror the situations the planner is built for: plain exploration, the
// key/door puzzle, the boulder/pressure-plate puzzle, peeking under
// enemies, the two-player door ambush, and clearing a blocked exit
// corridor by sword. Two more tests drive the interpreter directly to pin
// down the hunt command and the queue-starvation timing.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gridquest_bot::command::Command;
use gridquest_bot::game::{Game, GameCallbacks};
use gridquest_bot::player::Player;
use gridquest_bot::state::PlayerState;
use gridquest_bot::sync::{CommandQueue, Shared};
use gridquest_client::connection::GameConnection;
use gridquest_core::dungeon_map::DungeonMap;
use gridquest_core::grid::Offset;
use gridquest_core::player_map::PlayerMap;
use scenario_tests::{parse_level, start_server, EnemyBehavior, EnemyStep, Scenario};

/// Short starvation delay so tests never sit on an 8 s wait.
const TEST_COMMAND_WAIT: Duration = Duration::from_millis(100);

/// Run a full campaign against the scripted server.
fn run_scenario(scenario: Scenario, expected_level: Option<i32>) -> Result<(), String> {
    let (addr, server) = start_server(scenario);
    let connection = GameConnection::new(addr, "test-user", "tester", None);
    let session = connection.start(None, None)?;
    let mut game = Game::with_command_wait(session, expected_level, TEST_COMMAND_WAIT);
    let result = game.run();
    drop(game); // closes the connection so the server thread exits
    let _ = server.join();
    result
}

#[test]
fn s1_single_room_reaches_the_exit() {
    let scenario = Scenario::single_level(
        &[
            "#####", //
            "#A..#", //
            "#...#", //
            "#..E#", //
            "#####",
        ],
        1,
    );
    run_scenario(scenario, None).unwrap();
}

#[test]
fn s2_red_door_puzzle() {
    // The exit sits behind a red door; the key is in the starting room.
    let scenario = Scenario::single_level(
        &[
            "#########",
            "#A.r.#..#",
            "#....#..#",
            "#....R..#",
            "#....#..#",
            "#....#.E#",
            "#########",
        ],
        2,
    );
    run_scenario(scenario, None).unwrap();
}

#[test]
fn s3_boulder_on_pressure_plate() {
    // The blue door guards the exit column; a lone boulder must be carried
    // onto the plate.
    let scenario = Scenario::single_level(
        &[
            "###########",
            "#A......#.#",
            "#.......#.#",
            "#.....3.B.#",
            "#.......#.#",
            "#..o....#E#",
            "###########",
        ],
        2,
    );
    run_scenario(scenario, None).unwrap();
}

#[test]
fn s4_peek_under_an_adjacent_enemy() {
    // An enemy starts right next to the unarmed player, hiding the ground
    // it stands on. It steps aside on the first tick; the bot must reveal
    // the square and then finish the level around the enemy.
    let scenario = Scenario::single_level(
        &[
            "#######", //
            "#AM...#", //
            "#.....#", //
            "#....E#", //
            "#######",
        ],
        2,
    )
    .with_behaviors(
        0,
        vec![EnemyBehavior::Script {
            steps: vec![EnemyStep::Move(Offset::new(1, 0))],
        }],
    );
    run_scenario(scenario, None).unwrap();
}

#[test]
fn s5_two_player_door_ambush() {
    // No boulder anywhere, so the plate must be held by a player. The
    // enemy sneaks toward the opened door; stepping off the plate drops
    // the door on it, and the jammed doorway then leads both players to
    // the exit.
    let scenario = Scenario {
        levels: vec![parse_level(&[
            "###########",
            "#A........#",
            "#Z.....3..#",
            "#######B###",
            "#M........#",
            "#........E#",
            "###########",
        ])],
        behaviors: vec![vec![EnemyBehavior::SeekDoor {
            door: Offset::new(7, 3),
        }]],
        visibility: 2,
        max_ticks: 400,
    };
    run_scenario(scenario, None).unwrap();
}

#[test]
fn s6_exit_corridor_blocked_by_enemy() {
    // Sword and health are in the room; the only corridor to the exit is
    // held by an enemy that chases once approached. The bot arms up,
    // engages, and clears the way.
    let scenario = Scenario {
        levels: vec![parse_level(&[
            "###########",
            "#A/...#####",
            "#.+...#####",
            "#.....M..E#",
            "###########",
        ])],
        behaviors: vec![vec![EnemyBehavior::Chase { aggro: 2 }]],
        visibility: 2,
        max_ticks: 400,
    };
    run_scenario(scenario, None).unwrap();
}

#[test]
fn relocates_a_badly_placed_boulder() {
    // The boulder bridges two wall stubs, pinching the room. After
    // exploration the planner re-grades it, fetches it and drops it
    // somewhere harmless before heading for the exit.
    let scenario = Scenario::single_level(
        &[
            "#########",
            "#A......#",
            "#.#o#...#",
            "#.......#",
            "#......E#",
            "#########",
        ],
        2,
    );
    run_scenario(scenario, None).unwrap();
}

#[test]
fn campaign_advances_through_levels() {
    let scenario = Scenario {
        levels: vec![
            parse_level(&[
                "#####", //
                "#A..#", //
                "#..E#", //
                "#####",
            ]),
            parse_level(&[
                "#######", //
                "#A....#", //
                "#.....#", //
                "#....E#", //
                "#######",
            ]),
        ],
        behaviors: vec![Vec::new(), Vec::new()],
        visibility: 2,
        max_ticks: 400,
    };
    run_scenario(scenario, None).unwrap();
}

#[test]
fn terminates_cleanly_when_nothing_is_left_to_do() {
    // No exit, no enemies, nothing to solve: the planner runs out of
    // goals and asks for termination, which counts as a clean exit.
    let scenario = Scenario::single_level(
        &[
            "#####", //
            "#A..#", //
            "#...#", //
            "#####",
        ],
        2,
    );
    run_scenario(scenario, None).unwrap();
}

#[test]
fn missing_expected_level_is_an_error() {
    let scenario = Scenario::single_level(
        &[
            "#####", //
            "#A..#", //
            "#####",
        ],
        2,
    );
    let err = run_scenario(scenario, Some(3)).unwrap_err();
    assert!(err.contains("expected level 3"), "{err}");
}

// ---------------------------------------------------------------------------
// Direct interpreter drivers
// ---------------------------------------------------------------------------

/// Test scaffolding for driving `Player` without the real planner: a
/// callback script that feeds fixed commands on `finished`.
struct ScriptedCallbacks {
    queue: Arc<CommandQueue>,
    on_finished: Vec<Option<Command>>,
    calls: usize,
}

impl GameCallbacks for ScriptedCallbacks {
    fn level_reached(&mut self, _level: i32) {}
    fn map_updated(&mut self) {}
    fn finished(&mut self, player_id: usize) {
        if player_id != 0 {
            return;
        }
        if let Some(Some(command)) = self.on_finished.get(self.calls).cloned() {
            self.queue.push(command);
        }
        self.calls += 1;
    }
    fn print_dungeon_map(&self) {}
}

struct Harness {
    player: Player,
    states: [Arc<Shared<PlayerState>>; 2],
    player_map: Arc<Shared<Arc<PlayerMap>>>,
    commands: [Arc<CommandQueue>; 2],
}

/// Connect to a scripted server and build the interpreter with exposed
/// handles, bypassing the planner.
fn harness(scenario: Scenario) -> Harness {
    let (addr, _server) = start_server(scenario);
    let connection = GameConnection::new(addr, "test-user", "driver", None);
    let session = connection.start(None, None).unwrap();

    let map_size = Offset::new(session.map_width(), session.map_height());
    let dungeon_map = Arc::new(Shared::new(DungeonMap::new(map_size)));
    let player_map = Arc::new(Shared::new(PlayerMap::new(map_size)));
    let states = [
        Arc::new(Shared::new(PlayerState::new(0))),
        Arc::new(Shared::new(PlayerState::new(1))),
    ];
    let commands = [Arc::new(CommandQueue::new()), Arc::new(CommandQueue::new())];

    let player = Player::new(
        session,
        dungeon_map,
        Arc::clone(&player_map),
        [Arc::clone(&states[0]), Arc::clone(&states[1])],
        [Arc::clone(&commands[0]), Arc::clone(&commands[1])],
        TEST_COMMAND_WAIT,
    );
    Harness {
        player,
        states,
        player_map,
        commands,
    }
}

#[test]
fn hunt_prunes_locations_observed_enemy_free() {
    // One recorded location to check, far outside the start view. The
    // hunt walks there, observes it empty, prunes it and completes.
    let scenario = Scenario::single_level(
        &[
            "#########",
            "#A......#",
            "#.......#",
            "#.......#",
            "#########",
        ],
        2,
    );
    let mut h = harness(scenario);
    let target = Offset::new(7, 3);
    h.commands[0].push(Command::HuntEnemies {
        remaining: BTreeSet::from([target]),
    });
    let mut callbacks = ScriptedCallbacks {
        queue: Arc::clone(&h.commands[0]),
        on_finished: vec![Some(Command::Terminate)],
        calls: 0,
    };

    h.player.run(&mut callbacks).unwrap();

    // The hunt only completes once the location was actually observed.
    let position = h.states[0].lock().position;
    let distance = (position.x - target.x).abs() + (position.y - target.y).abs();
    assert!(distance <= 4, "hunt stopped too far away at {position}");
    assert_eq!(h.player_map.get().enemies.killed, 0);
}

#[test]
fn empty_queue_starves_for_the_configured_delay() {
    let scenario = Scenario::single_level(
        &[
            "#####", //
            "#A..#", //
            "#...#", //
            "#####",
        ],
        2,
    );
    let mut h = harness(scenario);
    // Tick 1: the queue is empty and nothing arrives — the interpreter
    // must starve for the full configured delay (measured from the level
    // start) before emitting None. Tick 2: terminate.
    let mut callbacks = ScriptedCallbacks {
        queue: Arc::clone(&h.commands[0]),
        on_finished: vec![None, Some(Command::Terminate)],
        calls: 0,
    };

    let started = Instant::now();
    h.player.run(&mut callbacks).unwrap();
    let elapsed = started.elapsed();

    assert!(
        elapsed >= TEST_COMMAND_WAIT,
        "starvation window was cut short: {elapsed:?}"
    );
    assert!(elapsed < Duration::from_secs(3), "starved too long: {elapsed:?}");
}
