// CLI entry point: configure from the environment, start a game, run the
// campaign.
//
// Exit code 0 when the campaign finishes successfully, 1 on any
// unrecovered error (connection failure, rejected start, planning
// dead-end, non-success finish).

use tracing::info;
use tracing_subscriber::EnvFilter;

use gridquest_bot::config::{load_dotenv, Settings};
use gridquest_bot::game::Game;
use gridquest_client::connection::GameConnection;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(error) => {
            eprintln!("Configuration error: {error}");
            std::process::exit(1);
        }
    };

    let connection = GameConnection::new(
        settings.host.clone(),
        settings.user_id.clone(),
        settings.user_name.clone(),
        settings.replays_folder.clone(),
    );

    let session = match connection.start(settings.level, settings.seed) {
        Ok(session) => session,
        Err(error) => {
            eprintln!("Failed to start game: {error}");
            std::process::exit(1);
        }
    };

    let mut game = Game::new(session, settings.level);
    match game.run() {
        Ok(()) => {
            info!("campaign finished successfully");
        }
        Err(error) => {
            eprintln!("Game failed: {error}");
            std::process::exit(1);
        }
    }
}
