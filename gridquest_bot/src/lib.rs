// gridquest_bot — the autonomous agent that plays the quest.
//
// Layering, bottom up:
// - `sync` — the mutex/condvar wrappers shared state travels in;
// - `state` — the per-player mutable snapshot (position, pending action,
//   current path, health, cached view);
// - `command` — the high-level command vocabulary and per-player queues;
// - `player` — the command interpreter: executes one step of the head
//   command per tick and emits one directed action per active player;
// - `game` — the mission planner (lead/follower state machines reacting to
//   map updates and finished tasks) and the session orchestration;
// - `config` — environment-variable settings and the `.env` loader.
//
// The tick loop lives in `player::Player::run` and drives everything:
// ingest server report, update maps, let the planner react, execute one
// interpreter step per player, send the actions.

pub mod command;
pub mod config;
pub mod game;
pub mod player;
pub mod state;
pub mod sync;
