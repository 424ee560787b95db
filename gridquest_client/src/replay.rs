// Replay recording: every request/response pair, framed to disk.
//
// A replay file is simply the framed message stream of one game session:
// the start pair first, then one act pair per tick. Because it reuses the
// protocol framing, a replay can be read back with `read_frame` in a
// loop — no separate format.
//
// Files are named `<user> - <unix time> - <game id>.replay` inside the
// configured replays folder; the folder is created on demand.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use gridquest_protocol::framing::write_frame;
use gridquest_protocol::message::{Request, Response};

/// Append-only recorder for one game session.
pub struct ReplayFile {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl ReplayFile {
    /// Create the replay file for a freshly started game and record the
    /// start pair.
    pub fn create(
        folder: &Path,
        user_name: &str,
        game_id: &str,
        request: &Request,
        response: &Response,
    ) -> Result<ReplayFile, String> {
        fs::create_dir_all(folder)
            .map_err(|e| format!("failed to create replays folder: {e}"))?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = folder.join(format!("{user_name} - {timestamp} - {game_id}.replay"));

        let file =
            File::create(&path).map_err(|e| format!("failed to create replay file: {e}"))?;
        let mut replay = ReplayFile {
            writer: BufWriter::new(file),
            path,
        };
        replay.write(request)?;
        replay.write(response)?;
        Ok(replay)
    }

    /// Record one act exchange.
    pub fn append(&mut self, request: &Request, response: &Response) -> Result<(), String> {
        self.write(request)?;
        self.write(response)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write<T: Serialize>(&mut self, message: &T) -> Result<(), String> {
        let json = serde_json::to_vec(message).map_err(|e| e.to_string())?;
        write_frame(&mut self.writer, &json).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridquest_protocol::framing::read_frame;
    use gridquest_protocol::message::{
        ActRequest, ActResponse, ActResult, DirectedAction, GameStatus, StartRequest,
        StartResponse, StartResult, State,
    };
    use std::io::BufReader;

    fn empty_state() -> State {
        State {
            tick: 0,
            level: 0,
            status: GameStatus::Active,
            player_state: None,
            player2_state: None,
        }
    }

    #[test]
    fn replay_is_a_readable_message_stream() {
        let folder = std::env::temp_dir().join("gridquest_replay_test");
        let start_request = Request::Start(StartRequest {
            user_id: "u".into(),
            user_name: "tester".into(),
            level: None,
            seed: None,
        });
        let start_response = Response::Start(StartResponse {
            result: StartResult::Ok,
            game_id: "game-1".into(),
            map_width: 5,
            map_height: 5,
            visibility_range: 2,
            seed: 1,
            state: empty_state(),
        });

        let mut replay =
            ReplayFile::create(&folder, "tester", "game-1", &start_request, &start_response)
                .unwrap();

        let act_request = Request::Act(ActRequest {
            game_id: "game-1".into(),
            action: DirectedAction::MoveEast,
            action2: None,
        });
        let act_response = Response::Act(ActResponse {
            result: ActResult::Ok,
            state: empty_state(),
        });
        replay.append(&act_request, &act_response).unwrap();
        let path = replay.path().to_path_buf();
        drop(replay);

        let mut reader = BufReader::new(File::open(&path).unwrap());
        let first: Request = serde_json::from_slice(&read_frame(&mut reader).unwrap()).unwrap();
        assert_eq!(first, start_request);
        let second: Response =
            serde_json::from_slice(&read_frame(&mut reader).unwrap()).unwrap();
        assert_eq!(second, start_response);
        let third: Request = serde_json::from_slice(&read_frame(&mut reader).unwrap()).unwrap();
        assert_eq!(third, act_request);
        let fourth: Response =
            serde_json::from_slice(&read_frame(&mut reader).unwrap()).unwrap();
        assert_eq!(fourth, act_response);

        fs::remove_file(&path).ok();
    }
}
