// Game server connection and per-game session.
//
// `GameConnection` holds the user identity and server address and opens
// games; `GameSession` owns one running game: the transport, the latest
// state report and the optional replay recorder.
//
// The exchange is strictly request/response over a single stream, so the
// transport is a small blocking trait: serialize one `Request`, read back
// one `Response`. `TcpTransport` is the real implementation (length-framed
// JSON over `TcpStream`); the scenario tests drive the same session code
// against an in-process scripted server over real sockets.
//
// A `Start` answered with `QuestQueued` is retried until the server admits
// the quest — queue waits are normal on a busy server.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::path::PathBuf;

use tracing::{info, warn};

use gridquest_protocol::framing::{read_frame, write_frame};
use gridquest_protocol::message::{
    ActRequest, ActResponse, ActResult, DirectedAction, Request, Response, StartRequest,
    StartResponse, StartResult, State,
};

use crate::replay::ReplayFile;

/// One blocking request/response exchange with the game server.
pub trait Transport: Send {
    fn exchange(&mut self, request: &Request) -> Result<Response, String>;
}

/// Length-framed JSON over TCP.
pub struct TcpTransport {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl TcpTransport {
    pub fn connect(host: &str) -> Result<TcpTransport, String> {
        let stream = TcpStream::connect(host).map_err(|e| format!("connect failed: {e}"))?;
        let reader_stream = stream.try_clone().map_err(|e| format!("clone failed: {e}"))?;
        Ok(TcpTransport {
            reader: BufReader::new(reader_stream),
            writer: BufWriter::new(stream),
        })
    }
}

impl Transport for TcpTransport {
    fn exchange(&mut self, request: &Request) -> Result<Response, String> {
        let json = serde_json::to_vec(request).map_err(|e| e.to_string())?;
        write_frame(&mut self.writer, &json).map_err(|e| format!("send failed: {e}"))?;
        let bytes = read_frame(&mut self.reader).map_err(|e| format!("read failed: {e}"))?;
        serde_json::from_slice(&bytes).map_err(|e| format!("parse failed: {e}"))
    }
}

/// Factory for game sessions against one server, for one user.
pub struct GameConnection {
    host: String,
    user_id: String,
    user_name: String,
    replays_folder: Option<PathBuf>,
}

impl GameConnection {
    pub fn new(
        host: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        replays_folder: Option<PathBuf>,
    ) -> GameConnection {
        GameConnection {
            host: host.into(),
            user_id: user_id.into(),
            user_name: user_name.into(),
            replays_folder,
        }
    }

    /// Connect over TCP and start a new game.
    pub fn start(
        &self,
        level: Option<i32>,
        seed: Option<i32>,
    ) -> Result<GameSession, String> {
        let transport = TcpTransport::connect(&self.host)?;
        self.start_with_transport(Box::new(transport), level, seed)
    }

    /// Start a new game over an already-connected transport. Used directly
    /// by the scenario tests.
    pub fn start_with_transport(
        &self,
        mut transport: Box<dyn Transport>,
        level: Option<i32>,
        seed: Option<i32>,
    ) -> Result<GameSession, String> {
        let request = Request::Start(StartRequest {
            user_id: self.user_id.clone(),
            user_name: self.user_name.clone(),
            level,
            seed,
        });

        let start = loop {
            let response = transport.exchange(&request)?;
            let start = match response {
                Response::Start(start) => start,
                other => return Err(format!("unexpected start response: {other:?}")),
            };
            match start.result {
                StartResult::Ok => break start,
                StartResult::QuestQueued => {
                    warn!("quest queued, retrying ...");
                    continue;
                }
                other => return Err(format!("start failed (result {other:?})")),
            }
        };

        let replay = match &self.replays_folder {
            Some(folder) => Some(ReplayFile::create(
                folder,
                &self.user_name,
                &start.game_id,
                &request,
                &Response::Start(start.clone()),
            )?),
            None => None,
        };
        if let Some(replay) = &replay {
            info!(path = %replay.path().display(), "recording replay");
        }

        Ok(GameSession {
            transport,
            replay,
            state: start.state.clone(),
            start,
        })
    }
}

/// One running game: the transport, the latest state report and the
/// replay recorder.
pub struct GameSession {
    transport: Box<dyn Transport>,
    replay: Option<ReplayFile>,
    start: StartResponse,
    state: State,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("replay", &self.replay.is_some())
            .field("start", &self.start)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    pub fn game_id(&self) -> &str {
        &self.start.game_id
    }

    pub fn map_width(&self) -> i32 {
        self.start.map_width
    }

    pub fn map_height(&self) -> i32 {
        self.start.map_height
    }

    pub fn visibility_range(&self) -> i32 {
        self.start.visibility_range
    }

    pub fn seed(&self) -> i32 {
        self.start.seed
    }

    /// The latest state report (from the start response or the last act).
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Submit one tick's actions and ingest the resulting state report.
    pub fn act(
        &mut self,
        action: DirectedAction,
        action2: Option<DirectedAction>,
    ) -> Result<(), String> {
        let request = Request::Act(ActRequest {
            game_id: self.start.game_id.clone(),
            action,
            action2,
        });
        let response = self.transport.exchange(&request)?;

        let act: ActResponse = match response {
            Response::Act(act) => act,
            other => return Err(format!("unexpected act response: {other:?}")),
        };
        if let Some(replay) = &mut self.replay {
            replay.append(&request, &Response::Act(act.clone()))?;
        }
        if act.result != ActResult::Ok {
            return Err(format!("act failed (result {:?})", act.result));
        }
        self.state = act.state;
        Ok(())
    }
}
