// End-to-end test support: an in-process scripted game server.
//
// Each scenario test starts a real TCP server on a random port, lets the
// bot connect through the real `gridquest_client` transport, and simulates
// the quest rules against a hand-written ASCII level. The tests exercise
// the same code paths as a live run — transport framing, map ingestion,
// planning, command execution — with the server side scripted just enough
// to make each scenario deterministic.
//
// Simulated rules, close to the live game:
// - movement onto walls, closed doors, boulders, enemies or the other
//   player is rejected;
// - walking onto a key/sword/health picks it up (keys need a free hand);
// - USE opens a matching door with the carried key, lifts/drops boulders,
//   and strikes an adjacent enemy with the sword;
// - a door is open while a boulder or a player holds down a plate of its
//   color; key-opened doors and boulder-held plates are permanent;
// - a door closing onto an enemy crushes it and jams the doorway open;
// - views are line-of-sight filtered: walls and closed doors block sight;
// - stepping onto the exit advances to the next level, or finishes the
//   campaign with success after the last one.
//
// Enemies are scripted per scenario: stationary, chasing within an aggro
// range, seeking an open door cell, or following a fixed step list.

use std::collections::BTreeSet;
use std::io::{BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use gridquest_core::grid::{Grid, Offset, EAST, NORTH, SOUTH, WEST};
use gridquest_core::tile::{DoorColor, Tile, DOOR_COLORS};
use gridquest_protocol::framing::{read_frame, write_frame};
use gridquest_protocol::message::{
    ActResponse, ActResult, DirectedAction, GameStatus, PlayerSnapshot, Request, Response,
    StartResponse, StartResult, State,
};

/// One parsed ASCII level.
#[derive(Clone, Debug)]
pub struct LevelSpec {
    pub tiles: Grid<Tile>,
    pub starts: [Option<Offset>; 2],
    pub enemy_spawns: Vec<Offset>,
}

/// Parse an ASCII level. `#` wall, `.` floor, `E` exit, `r`/`g`/`b` keys,
/// `R`/`G`/`B` doors, `1`/`2`/`3` pressure plates, `o` boulder, `/` sword,
/// `+` health, `M` enemy spawn, `A`/`Z` player starts.
pub fn parse_level(rows: &[&str]) -> LevelSpec {
    let height = rows.len() as i32;
    let width = rows[0].chars().count() as i32;
    let mut tiles = Grid::new(width, height, Tile::Empty);
    let mut starts = [None, None];
    let mut enemy_spawns = Vec::new();

    for (y, row) in rows.iter().enumerate() {
        assert_eq!(row.chars().count() as i32, width, "ragged level row {y}");
        for (x, c) in row.chars().enumerate() {
            let position = Offset::new(x as i32, y as i32);
            tiles[position] = match c {
                '#' => Tile::Wall,
                '.' => Tile::Empty,
                'E' => Tile::Exit,
                'r' => Tile::KeyRed,
                'g' => Tile::KeyGreen,
                'b' => Tile::KeyBlue,
                'R' => Tile::DoorRed,
                'G' => Tile::DoorGreen,
                'B' => Tile::DoorBlue,
                '1' => Tile::PressurePlateRed,
                '2' => Tile::PressurePlateGreen,
                '3' => Tile::PressurePlateBlue,
                'o' => Tile::Boulder,
                '/' => Tile::Sword,
                '+' => Tile::Health,
                'M' => {
                    enemy_spawns.push(position);
                    Tile::Empty
                }
                'A' => {
                    starts[0] = Some(position);
                    Tile::Empty
                }
                'Z' => {
                    starts[1] = Some(position);
                    Tile::Empty
                }
                other => panic!("unknown level char {other:?}"),
            };
        }
    }

    LevelSpec {
        tiles,
        starts,
        enemy_spawns,
    }
}

/// One scripted enemy action per tick.
#[derive(Clone, Debug)]
pub enum EnemyStep {
    Move(Offset),
    Hold,
    Despawn,
}

/// How a scripted enemy behaves each tick (after the players acted).
#[derive(Clone, Debug)]
pub enum EnemyBehavior {
    Stationary,
    /// Step toward the nearest player once it is within `aggro` manhattan
    /// distance.
    Chase { aggro: i32 },
    /// Walk toward the given door cell whenever that doorway is open.
    SeekDoor { door: Offset },
    /// Follow a fixed step list, then stand still.
    Script { steps: Vec<EnemyStep> },
}

/// A full scripted campaign.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub levels: Vec<LevelSpec>,
    /// Per level, one behavior per enemy spawn (row-major spawn order).
    pub behaviors: Vec<Vec<EnemyBehavior>>,
    pub visibility: i32,
    /// Safety valve: past this tick the server reports a timeout, which
    /// the bot surfaces as an error and the test fails visibly.
    pub max_ticks: u64,
}

impl Scenario {
    pub fn single_level(rows: &[&str], visibility: i32) -> Scenario {
        Scenario {
            levels: vec![parse_level(rows)],
            behaviors: vec![Vec::new()],
            visibility,
            max_ticks: 400,
        }
    }

    pub fn with_behaviors(mut self, level: usize, behaviors: Vec<EnemyBehavior>) -> Scenario {
        self.behaviors[level] = behaviors;
        self
    }
}

/// Start the scripted server on a random port. Returns the address to
/// connect to and the server thread handle.
pub fn start_server(scenario: Scenario) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let addr = listener.local_addr().expect("local addr").to_string();
    let handle = thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            serve(stream, scenario);
        }
    });
    (addr, handle)
}

fn serve(stream: TcpStream, scenario: Scenario) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut writer = BufWriter::new(stream);
    let mut world: Option<World> = None;

    while let Ok(bytes) = read_frame(&mut reader) {
        let Ok(request) = serde_json::from_slice::<Request>(&bytes) else {
            break;
        };
        let response = match request {
            Request::Start(_) => {
                let new_world = World::new(scenario.clone());
                let response = Response::Start(StartResponse {
                    result: StartResult::Ok,
                    game_id: "scenario".into(),
                    map_width: new_world.map_width,
                    map_height: new_world.map_height,
                    visibility_range: scenario.visibility,
                    seed: 42,
                    state: new_world.report(),
                });
                world = Some(new_world);
                response
            }
            Request::Act(act) => match world.as_mut() {
                Some(world) => Response::Act(world.act(act.action, act.action2)),
                None => break,
            },
        };
        let json = serde_json::to_vec(&response).expect("serialize response");
        if write_frame(&mut writer, &json).is_err() {
            break;
        }
    }
}

#[derive(Clone, Debug)]
struct PlayerSim {
    position: Offset,
    inventory: Option<Tile>,
    has_sword: bool,
    health: i32,
}

#[derive(Clone, Debug)]
struct Enemy {
    position: Offset,
    behavior: EnemyBehavior,
    script_index: usize,
    alive: bool,
}

/// The simulated game world.
struct World {
    scenario: Scenario,
    map_width: i32,
    map_height: i32,
    level_index: usize,
    tiles: Grid<Tile>,
    players: [Option<PlayerSim>; 2],
    enemies: Vec<Enemy>,
    boulders_on_plates: BTreeSet<Offset>,
    tick: u64,
    status: GameStatus,
}

impl World {
    fn new(scenario: Scenario) -> World {
        let map_width = scenario.levels.iter().map(|l| l.tiles.width()).max().unwrap();
        let map_height = scenario
            .levels
            .iter()
            .map(|l| l.tiles.height())
            .max()
            .unwrap();
        let mut world = World {
            scenario,
            map_width,
            map_height,
            level_index: 0,
            tiles: Grid::new(0, 0, Tile::Empty),
            players: [None, None],
            enemies: Vec::new(),
            boulders_on_plates: BTreeSet::new(),
            tick: 0,
            status: GameStatus::Active,
        };
        world.load_level(0);
        world
    }

    fn load_level(&mut self, index: usize) {
        self.level_index = index;
        let spec = &self.scenario.levels[index];
        self.tiles = spec.tiles.clone();
        self.boulders_on_plates.clear();
        self.players = spec.starts.map(|start| {
            start.map(|position| PlayerSim {
                position,
                inventory: None,
                has_sword: false,
                health: 5,
            })
        });
        let behaviors = &self.scenario.behaviors[index];
        self.enemies = spec
            .enemy_spawns
            .iter()
            .enumerate()
            .map(|(i, &position)| Enemy {
                position,
                behavior: behaviors
                    .get(i)
                    .cloned()
                    .unwrap_or(EnemyBehavior::Stationary),
                script_index: 0,
                alive: true,
            })
            .collect();
    }

    fn enemy_at(&self, position: Offset) -> Option<usize> {
        self.enemies
            .iter()
            .position(|e| e.alive && e.position == position)
    }

    fn player_at(&self, position: Offset) -> bool {
        self.players
            .iter()
            .flatten()
            .any(|p| p.position == position)
    }

    /// Whether doors of this color are currently held open by a player on
    /// a plate. (Boulder-held plates open doors permanently instead.)
    fn door_held_open(&self, color: DoorColor) -> bool {
        self.players.iter().flatten().any(|p| {
            self.tiles[p.position] == color.plate_tile()
                && !self.boulders_on_plates.contains(&p.position)
        })
    }

    /// The tile an observer would see at `position`, ignoring visibility.
    fn observed_tile(&self, position: Offset) -> Tile {
        if self.player_at(position) {
            return Tile::Player;
        }
        if self.enemy_at(position).is_some() {
            return Tile::Enemy;
        }
        if self.boulders_on_plates.contains(&position) {
            return Tile::Boulder;
        }
        let tile = self.tiles[position];
        if let Some(color) = tile.door_color() {
            if tile.is_door() && self.door_held_open(color) {
                return Tile::Empty;
            }
        }
        tile
    }

    fn blocks_sight(&self, position: Offset) -> bool {
        let tile = self.tiles[position];
        if tile == Tile::Wall {
            return true;
        }
        if tile.is_door() {
            let color = tile.door_color().expect("door has a color");
            return !self.door_held_open(color);
        }
        false
    }

    /// Bresenham line of sight; walls and closed doors between the
    /// endpoints block.
    fn visible(&self, from: Offset, to: Offset) -> bool {
        let (mut x, mut y) = (from.x, from.y);
        let dx = (to.x - from.x).abs();
        let dy = (to.y - from.y).abs();
        let sx = if to.x > from.x { 1 } else { -1 };
        let sy = if to.y > from.y { 1 } else { -1 };
        let mut err = dx - dy;
        loop {
            let here = Offset::new(x, y);
            if here != from && here != to && self.blocks_sight(here) {
                return false;
            }
            if x == to.x && y == to.y {
                return true;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn snapshot(&self, id: usize) -> Option<PlayerSnapshot> {
        let player = self.players[id].as_ref()?;
        let visibility = self.scenario.visibility;
        let dimension = 2 * visibility + 1;
        let mut surroundings = Vec::with_capacity((dimension * dimension) as usize);
        for vy in 0..dimension {
            for vx in 0..dimension {
                let cell = player.position + Offset::new(vx - visibility, vy - visibility);
                let tile = if self.tiles.is_in_range(cell) && self.visible(player.position, cell) {
                    self.observed_tile(cell)
                } else {
                    Tile::Unknown
                };
                surroundings.push(tile.code());
            }
        }
        Some(PlayerSnapshot {
            position: (player.position.x, player.position.y),
            surroundings,
            has_sword: Some(player.has_sword),
            health: Some(player.health),
        })
    }

    fn report(&self) -> State {
        State {
            tick: self.tick,
            level: (self.level_index + 1) as i32,
            status: self.status,
            player_state: self.snapshot(0),
            player2_state: self.snapshot(1),
        }
    }

    fn act(&mut self, action: DirectedAction, action2: Option<DirectedAction>) -> ActResponse {
        if self.status != GameStatus::Active {
            return ActResponse {
                result: ActResult::GameFinished,
                state: self.report(),
            };
        }

        // Enemies decide against the door state of the start of the tick.
        let doors_open_before: Vec<DoorColor> = DOOR_COLORS
            .iter()
            .copied()
            .filter(|&c| self.door_held_open(c))
            .collect();

        for (id, action) in [(0, Some(action)), (1, action2)] {
            let Some(action) = action else { continue };
            if self.players[id].is_none() {
                continue;
            }
            if let Err(result) = self.apply_player_action(id, action) {
                return ActResponse {
                    result,
                    state: self.report(),
                };
            }
        }

        // Exit check before enemies move.
        let exited = self
            .players
            .iter()
            .flatten()
            .any(|p| self.tiles[p.position] == Tile::Exit);
        if exited {
            if self.level_index + 1 < self.scenario.levels.len() {
                let next = self.level_index + 1;
                self.load_level(next);
            } else {
                self.status = GameStatus::FinishedSuccess;
            }
            self.tick += 1;
            return ActResponse {
                result: ActResult::Ok,
                state: self.report(),
            };
        }

        self.move_enemies(&doors_open_before);
        self.crush_enemies_under_doors();

        self.tick += 1;
        if self.tick > self.scenario.max_ticks {
            self.status = GameStatus::FinishedTimeout;
        }
        ActResponse {
            result: ActResult::Ok,
            state: self.report(),
        }
    }

    fn apply_player_action(&mut self, id: usize, action: DirectedAction) -> Result<(), ActResult> {
        let direction = match action {
            DirectedAction::None => return Ok(()),
            DirectedAction::MoveNorth | DirectedAction::UseNorth => NORTH,
            DirectedAction::MoveEast | DirectedAction::UseEast => EAST,
            DirectedAction::MoveSouth | DirectedAction::UseSouth => SOUTH,
            DirectedAction::MoveWest | DirectedAction::UseWest => WEST,
        };
        let is_move = matches!(
            action,
            DirectedAction::MoveNorth
                | DirectedAction::MoveEast
                | DirectedAction::MoveSouth
                | DirectedAction::MoveWest
        );
        let target = self.players[id].as_ref().expect("active player").position + direction;
        if !self.tiles.is_in_range(target) {
            return Err(ActResult::MoveNotAllowed);
        }
        if is_move {
            self.apply_move(id, target)
        } else {
            self.apply_use(id, target)
        }
    }

    fn apply_move(&mut self, id: usize, target: Offset) -> Result<(), ActResult> {
        let observed = self.observed_tile(target);
        let inventory = self.players[id].as_ref().expect("active player").inventory;
        match observed {
            Tile::Empty
            | Tile::Exit
            | Tile::PressurePlateRed
            | Tile::PressurePlateGreen
            | Tile::PressurePlateBlue => {}
            Tile::KeyRed | Tile::KeyGreen | Tile::KeyBlue => {
                if inventory.is_some() {
                    return Err(ActResult::InventoryFull);
                }
                self.players[id].as_mut().expect("active player").inventory = Some(observed);
                self.tiles[target] = Tile::Empty;
            }
            Tile::Sword => {
                self.players[id].as_mut().expect("active player").has_sword = true;
                self.tiles[target] = Tile::Empty;
            }
            Tile::Health => {
                self.players[id].as_mut().expect("active player").health += 5;
                self.tiles[target] = Tile::Empty;
            }
            _ => return Err(ActResult::MoveNotAllowed),
        }
        self.players[id].as_mut().expect("active player").position = target;
        Ok(())
    }

    fn apply_use(&mut self, id: usize, target: Offset) -> Result<(), ActResult> {
        if let Some(enemy) = self.enemy_at(target) {
            if self.players[id].as_ref().expect("active player").has_sword {
                self.enemies[enemy].alive = false;
                return Ok(());
            }
            return Err(ActResult::UseNotAllowed);
        }

        let inventory = self.players[id].as_ref().expect("active player").inventory;
        let target_tile = self.tiles[target];
        match inventory {
            Some(key) if key.is_key() => {
                if target_tile.is_door() && target_tile.door_color() == key.door_color() {
                    self.tiles[target] = Tile::Empty;
                    self.players[id].as_mut().expect("active player").inventory = None;
                    return Ok(());
                }
                Err(ActResult::UseNotAllowed)
            }
            Some(Tile::Boulder) => {
                if self.player_at(target) || self.enemy_at(target).is_some() {
                    return Err(ActResult::UseNotAllowed);
                }
                if target_tile.is_pressure_plate() {
                    let color = target_tile.door_color().expect("plate has a color");
                    self.boulders_on_plates.insert(target);
                    self.open_doors_permanently(color);
                } else if self.observed_tile(target) == Tile::Empty {
                    self.tiles[target] = Tile::Boulder;
                } else {
                    return Err(ActResult::UseNotAllowed);
                }
                self.players[id].as_mut().expect("active player").inventory = None;
                Ok(())
            }
            None if target_tile == Tile::Boulder => {
                self.tiles[target] = Tile::Empty;
                self.players[id].as_mut().expect("active player").inventory =
                    Some(Tile::Boulder);
                Ok(())
            }
            _ => Err(ActResult::UseNotAllowed),
        }
    }

    fn open_doors_permanently(&mut self, color: DoorColor) {
        for p in gridquest_core::grid::offsets_in_rectangle(self.tiles.size()) {
            if self.tiles[p] == color.door_tile() {
                self.tiles[p] = Tile::Empty;
            }
        }
    }

    /// Whether an enemy may stand on `position`, given the door state at
    /// the start of the tick.
    fn enemy_walkable(&self, position: Offset, doors_open: &[DoorColor]) -> bool {
        if !self.tiles.is_in_range(position)
            || self.player_at(position)
            || self.enemy_at(position).is_some()
            || self.boulders_on_plates.contains(&position)
        {
            return false;
        }
        let tile = self.tiles[position];
        match tile {
            Tile::Empty
            | Tile::PressurePlateRed
            | Tile::PressurePlateGreen
            | Tile::PressurePlateBlue => true,
            _ if tile.is_door() => {
                doors_open.contains(&tile.door_color().expect("door has a color"))
            }
            _ => false,
        }
    }

    fn move_enemies(&mut self, doors_open: &[DoorColor]) {
        for index in 0..self.enemies.len() {
            if !self.enemies[index].alive {
                continue;
            }
            let position = self.enemies[index].position;
            let behavior = self.enemies[index].behavior.clone();
            let step = match &behavior {
                EnemyBehavior::Stationary => None,
                EnemyBehavior::Chase { aggro } => {
                    let nearest = self
                        .players
                        .iter()
                        .flatten()
                        .map(|p| p.position)
                        .min_by_key(|p| (p.x - position.x).abs() + (p.y - position.y).abs());
                    nearest.and_then(|target| {
                        let distance =
                            (target.x - position.x).abs() + (target.y - position.y).abs();
                        if distance <= *aggro {
                            self.step_toward(position, target, doors_open)
                        } else {
                            None
                        }
                    })
                }
                EnemyBehavior::SeekDoor { door } => {
                    let tile = self.tiles[*door];
                    let open = tile == Tile::Empty
                        || tile
                            .door_color()
                            .is_some_and(|color| doors_open.contains(&color));
                    if open {
                        self.step_toward(position, *door, doors_open)
                    } else {
                        None
                    }
                }
                EnemyBehavior::Script { steps } => {
                    let step = steps.get(self.enemies[index].script_index).cloned();
                    self.enemies[index].script_index += 1;
                    match step {
                        Some(EnemyStep::Move(delta)) => Some(position + delta),
                        Some(EnemyStep::Despawn) => {
                            self.enemies[index].alive = false;
                            None
                        }
                        Some(EnemyStep::Hold) | None => None,
                    }
                }
            };
            if let Some(target) = step {
                if self.enemy_walkable(target, doors_open) {
                    self.enemies[index].position = target;
                }
            }
        }
    }

    /// One step from `from` toward `to`, x axis first.
    fn step_toward(
        &self,
        from: Offset,
        to: Offset,
        doors_open: &[DoorColor],
    ) -> Option<Offset> {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let mut candidates = Vec::new();
        if dx != 0 {
            candidates.push(from + Offset::new(dx.signum(), 0));
        }
        if dy != 0 {
            candidates.push(from + Offset::new(0, dy.signum()));
        }
        candidates
            .into_iter()
            .find(|&c| self.enemy_walkable(c, doors_open))
    }

    /// An enemy standing in a doorway when the door closes is crushed, and
    /// the corpse jams the doorway open for good.
    fn crush_enemies_under_doors(&mut self) {
        let mut jammed = Vec::new();
        for enemy in self.enemies.iter_mut().filter(|e| e.alive) {
            let tile = self.tiles[enemy.position];
            if tile.is_door() {
                let color = tile.door_color().expect("door has a color");
                let held_open = self.players.iter().flatten().any(|p| {
                    self.tiles[p.position] == color.plate_tile()
                        && !self.boulders_on_plates.contains(&p.position)
                });
                if !held_open {
                    enemy.alive = false;
                    jammed.push(enemy.position);
                }
            }
        }
        for position in jammed {
            self.tiles[position] = Tile::Empty;
        }
    }
}
