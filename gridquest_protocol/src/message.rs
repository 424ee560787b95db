// Protocol messages for the client-server exchange.
//
// Two enums define the full vocabulary:
// - `Request`: sent by the bot to the game server (`Start` once per
//   campaign, then one `Act` per tick).
// - `Response`: sent by the server back to the bot.
//
// Supporting structs (`State`, `PlayerSnapshot`) describe the per-tick game
// report. All types derive `Serialize`/`Deserialize` for JSON framing (see
// `framing.rs`).
//
// Tile surroundings are opaque integer codes (`Vec<i32>`) — the protocol
// never interprets them. The bot decodes the codes into its own tile model.
// `0` is the "unknown" sentinel shared by both sides.

use serde::{Deserialize, Serialize};

/// Messages sent by the bot to the game server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Request {
    Start(StartRequest),
    Act(ActRequest),
}

/// Messages sent by the game server to the bot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Start(StartResponse),
    Act(ActResponse),
}

/// Opens a new quest for the given user. `level` and `seed` pin a specific
/// level / generation seed for reproduction; omitted means "campaign from
/// the start with a fresh seed".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartRequest {
    pub user_id: String,
    pub user_name: String,
    pub level: Option<i32>,
    pub seed: Option<i32>,
}

/// Result of a `Start` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartResult {
    Ok,
    InternalError,
    UnknownUser,
    InvalidLevel,
    QuestQueued,
    NotAllowed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StartResponse {
    pub result: StartResult,
    pub game_id: String,
    pub map_width: i32,
    pub map_height: i32,
    pub visibility_range: i32,
    pub seed: i32,
    pub state: State,
}

/// One directed action per active player. `action2` is absent while the
/// quest has a single player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActRequest {
    pub game_id: String,
    pub action: DirectedAction,
    pub action2: Option<DirectedAction>,
}

/// Result of an `Act` request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActResult {
    Ok,
    InternalError,
    UnknownGameId,
    MoveNotAllowed,
    UseNotAllowed,
    UnknownAction,
    GameFinished,
    InventoryEmpty,
    InventoryFull,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActResponse {
    pub result: ActResult,
    pub state: State,
}

/// The action a player takes this tick: move or use a held item toward a
/// cardinal direction, or nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectedAction {
    None,
    MoveNorth,
    MoveEast,
    MoveSouth,
    MoveWest,
    UseNorth,
    UseEast,
    UseSouth,
    UseWest,
}

/// Overall quest status. Any `Finished*` value ends the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Active,
    FinishedSuccess,
    FinishedTimeout,
    FinishedNoProgress,
    FinishedPlayerDied,
    FinishedCanceled,
}

/// The per-tick game report. `player2_state` appears once the second player
/// enters the quest; either snapshot may be absent when that player is not
/// present this tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub tick: u64,
    pub level: i32,
    pub status: GameStatus,
    pub player_state: Option<PlayerSnapshot>,
    pub player2_state: Option<PlayerSnapshot>,
}

/// One player's slice of a state report.
///
/// `surroundings` is a flat row-major array of `(2 * visibility + 1)^2` tile
/// codes in view coordinates; the center cell `(visibility, visibility)` is
/// the player itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub position: (i32, i32),
    pub surroundings: Vec<i32>,
    pub has_sword: Option<bool>,
    pub health: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn act_request_serialization_roundtrip() {
        let request = Request::Act(ActRequest {
            game_id: "game-7".into(),
            action: DirectedAction::MoveEast,
            action2: Some(DirectedAction::UseNorth),
        });

        let json = serde_json::to_vec(&request).unwrap();
        let restored: Request = serde_json::from_slice(&json).unwrap();
        assert_eq!(request, restored);
    }

    #[test]
    fn state_report_roundtrip_with_single_player() {
        let response = Response::Act(ActResponse {
            result: ActResult::Ok,
            state: State {
                tick: 12,
                level: 3,
                status: GameStatus::Active,
                player_state: Some(PlayerSnapshot {
                    position: (4, 2),
                    surroundings: vec![0; 25],
                    has_sword: Some(false),
                    health: None,
                }),
                player2_state: None,
            },
        });

        let json = serde_json::to_string(&response).unwrap();
        let restored: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(response, restored);
    }

    #[test]
    fn start_response_reports_map_geometry() {
        let response = StartResponse {
            result: StartResult::Ok,
            game_id: "game-1".into(),
            map_width: 64,
            map_height: 48,
            visibility_range: 2,
            seed: 42,
            state: State {
                tick: 0,
                level: 0,
                status: GameStatus::Active,
                player_state: None,
                player2_state: None,
            },
        };

        let json = serde_json::to_string(&response).unwrap();
        let restored: StartResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.map_width, 64);
        assert_eq!(restored.visibility_range, 2);
        assert_eq!(restored.result, StartResult::Ok);
    }
}
