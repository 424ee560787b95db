// gridquest_client — blocking transport to the quest game server.
//
// Owns the TCP connection, the start handshake, the per-tick act exchange
// and the optional replay recording. The tick loop in `gridquest_bot` is
// the only consumer; it drives one `exchange` at a time, so everything here
// is simple blocking I/O — no reader threads, no channels.

pub mod connection;
pub mod replay;
