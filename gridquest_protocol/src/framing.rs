// Frame layout for the quest wire protocol and for replay files.
//
// Every message travels as a frame: a four-byte big-endian payload length
// followed by the JSON-encoded payload. The transport writes one request
// frame and reads back one response frame per tick; a replay file is
// nothing but those same frames appended in order, so replaying a session
// is a matter of calling `read_frame` until the file runs out.
//
// Payload encoding is the caller's business (the session serializes the
// `message` types with serde_json before framing) — this module only moves
// length-checked byte blocks.
//
// `MAX_FRAME_BYTES` caps a single frame at 1 MB. A state report — the
// largest message in the protocol — stays in the low kilobytes even with
// two players' surroundings attached, so the cap exists purely to reject a
// corrupt or hostile length prefix before allocating for it.

use std::io::{self, Read, Write};

/// Upper bound on a single frame's payload. Real quest messages are a few
/// kilobytes; anything approaching this limit is a corrupt prefix.
pub const MAX_FRAME_BYTES: u32 = 1024 * 1024;

/// Frame one payload onto the writer and flush it. Nothing is written when
/// the payload exceeds `MAX_FRAME_BYTES`.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let length = u32::try_from(payload.len())
        .ok()
        .filter(|&length| length <= MAX_FRAME_BYTES)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "refusing to frame {} bytes (limit {MAX_FRAME_BYTES})",
                    payload.len()
                ),
            )
        })?;
    writer.write_all(&length.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Read the next frame's payload from the reader.
///
/// A stream that ends before or inside a frame surfaces as
/// `UnexpectedEof`; a length prefix beyond `MAX_FRAME_BYTES` as
/// `InvalidData`.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut prefix = [0u8; 4];
    reader.read_exact(&mut prefix)?;
    let length = u32::from_be_bytes(prefix);
    if length > MAX_FRAME_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {length} bytes exceeds the limit ({MAX_FRAME_BYTES})"),
        ));
    }
    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}
