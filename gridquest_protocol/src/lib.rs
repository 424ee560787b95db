// gridquest_protocol — wire vocabulary for the quest server.
//
// This crate defines the request/response messages exchanged with the game
// server and the length-delimited framing they travel in. It is deliberately
// independent of the bot: tile surroundings are carried as raw integer codes
// (`Unknown = 0` is the canonical "no observation" sentinel), and the bot
// decodes them into its own tile model. This keeps the protocol crate free
// of game-model dependencies.

pub mod framing;
pub mod message;
