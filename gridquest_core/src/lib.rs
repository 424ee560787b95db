// gridquest_core — map model and pathfinding for the quest bot.
//
// This crate contains the bot's world model: grid primitives, the tile
// taxonomy, the two layered map snapshots (cumulative dungeon map and
// dynamic player map), the weight-map builder, and the Dijkstra engine.
// It has zero network dependencies and can be tested headless.
//
// The companion crates `gridquest_client` (transport) and `gridquest_bot`
// (interpreter, planner, tick loop) build on top of this one.
//
// **Critical constraint: determinism.** Every decision is a pure function
// of the observed map state. All offset collections are `BTreeSet`/`BTreeMap`
// ordered by `(y, x)`; no `HashMap`, no randomness, no system time.

pub mod dijkstra;
pub mod dungeon_map;
pub mod grid;
pub mod player_map;
pub mod tile;
pub mod view;
pub mod weights;
