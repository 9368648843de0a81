//! Binary position protocol spoken on the UDP endpoints.
//!
//! All integers are big-endian. Position updates carry length-prefixed
//! strings; player-list records use a fixed 36 byte id column so clients can
//! index them without a separate length.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::ID_FIELD_WIDTH;

/// Errors produced while decoding a binary datagram
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated {field}: need {needed} bytes, {available} available")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("unknown color code {0}")]
    UnknownColorCode(u8),
}

/// A client's push of its own position and motion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionUpdate {
    pub player_id: String,
    /// Client clock, milliseconds since the Unix epoch
    pub timestamp: u64,
    pub x: i32,
    pub y: i32,
    pub vel_x: i32,
    pub vel_y: i32,
    pub color: String,
}

/// Color category carried in player-list records.
///
/// Only red survives the trip; every other color collapses into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorCode {
    Red = 1,
    Other = 2,
}

impl ColorCode {
    pub fn from_color(color: &str) -> Self {
        if color.eq_ignore_ascii_case("red") {
            ColorCode::Red
        } else {
            ColorCode::Other
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(ColorCode::Red),
            2 => Some(ColorCode::Other),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// One player entry inside a player-list response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub id: String,
    pub group_tag: String,
    pub x: i32,
    pub y: i32,
    pub vel_x: i32,
    pub vel_y: i32,
    pub color: ColorCode,
    pub last_seen: u64,
}

/// Decoded player-list response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerList {
    pub server_timestamp: u64,
    pub players: Vec<PlayerRecord>,
}

fn ensure(buf: &[u8], field: &'static str, needed: usize) -> Result<(), DecodeError> {
    if buf.remaining() < needed {
        return Err(DecodeError::Truncated {
            field,
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

fn take_string(buf: &mut &[u8], field: &'static str, len: usize) -> Result<String, DecodeError> {
    ensure(buf, field, len)?;
    let value = String::from_utf8_lossy(&buf[..len]).into_owned();
    buf.advance(len);
    Ok(value)
}

fn take_u8(buf: &mut &[u8], field: &'static str) -> Result<u8, DecodeError> {
    ensure(buf, field, 1)?;
    Ok(buf.get_u8())
}

fn take_u16(buf: &mut &[u8], field: &'static str) -> Result<u16, DecodeError> {
    ensure(buf, field, 2)?;
    Ok(buf.get_u16())
}

fn take_u32(buf: &mut &[u8], field: &'static str) -> Result<u32, DecodeError> {
    ensure(buf, field, 4)?;
    Ok(buf.get_u32())
}

fn take_i32(buf: &mut &[u8], field: &'static str) -> Result<i32, DecodeError> {
    ensure(buf, field, 4)?;
    Ok(buf.get_i32())
}

fn take_u64(buf: &mut &[u8], field: &'static str) -> Result<u64, DecodeError> {
    ensure(buf, field, 8)?;
    Ok(buf.get_u64())
}

/// Decodes a position-update datagram.
///
/// Bytes after the color field are ignored.
pub fn decode_position_update(data: &[u8]) -> Result<PositionUpdate, DecodeError> {
    let mut buf = data;

    let id_len = take_u16(&mut buf, "id length")? as usize;
    let player_id = take_string(&mut buf, "player id", id_len)?;
    let timestamp = take_u64(&mut buf, "timestamp")?;
    let x = take_i32(&mut buf, "x")?;
    let y = take_i32(&mut buf, "y")?;
    let vel_x = take_i32(&mut buf, "velocity x")?;
    let vel_y = take_i32(&mut buf, "velocity y")?;
    let color_len = take_u16(&mut buf, "color length")? as usize;
    let color = take_string(&mut buf, "color", color_len)?;

    Ok(PositionUpdate {
        player_id,
        timestamp,
        x,
        y,
        vel_x,
        vel_y,
        color,
    })
}

fn put_short_string(buf: &mut BytesMut, value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(u16::MAX as usize);
    buf.put_u16(len as u16);
    buf.put_slice(&bytes[..len]);
}

/// Encodes a position-update datagram (client side)
pub fn encode_position_update(update: &PositionUpdate) -> Bytes {
    let mut buf =
        BytesMut::with_capacity(28 + update.player_id.len() + update.color.len());
    put_short_string(&mut buf, &update.player_id);
    buf.put_u64(update.timestamp);
    buf.put_i32(update.x);
    buf.put_i32(update.y);
    buf.put_i32(update.vel_x);
    buf.put_i32(update.vel_y);
    put_short_string(&mut buf, &update.color);
    buf.freeze()
}

fn put_padded_id(buf: &mut BytesMut, id: &str) {
    let bytes = id.as_bytes();
    let len = bytes.len().min(ID_FIELD_WIDTH);
    buf.put_slice(&bytes[..len]);
    buf.put_bytes(b' ', ID_FIELD_WIDTH - len);
}

/// Encodes a player-list response.
///
/// Ids are cut or space-padded to exactly [`ID_FIELD_WIDTH`] bytes and group
/// tags longer than 255 bytes are cut to fit their one-byte length prefix.
pub fn encode_player_list(players: &[PlayerRecord], server_timestamp: u64) -> Bytes {
    let mut buf = BytesMut::with_capacity(12 + players.len() * (ID_FIELD_WIDTH + 32));
    buf.put_u32(players.len() as u32);
    buf.put_u64(server_timestamp);

    for player in players {
        put_padded_id(&mut buf, &player.id);

        let tag = &player.group_tag;
        let mut tag_len = tag.len().min(u8::MAX as usize);
        while !tag.is_char_boundary(tag_len) {
            tag_len -= 1;
        }
        buf.put_u8(tag_len as u8);
        buf.put_slice(&tag.as_bytes()[..tag_len]);

        buf.put_i32(player.x);
        buf.put_i32(player.y);
        buf.put_i32(player.vel_x);
        buf.put_i32(player.vel_y);
        buf.put_u8(player.color.as_byte());
        buf.put_u64(player.last_seen);
    }

    buf.freeze()
}

/// Decodes a player-list response (client side).
///
/// Trailing pad spaces are stripped from ids.
pub fn decode_player_list(data: &[u8]) -> Result<PlayerList, DecodeError> {
    let mut buf = data;

    let count = take_u32(&mut buf, "player count")?;
    let server_timestamp = take_u64(&mut buf, "server timestamp")?;

    // Cap the reservation; a lying count fails below on truncation anyway.
    let mut players = Vec::with_capacity((count as usize).min(1024));
    for _ in 0..count {
        let padded = take_string(&mut buf, "player id", ID_FIELD_WIDTH)?;
        let tag_len = take_u8(&mut buf, "tag length")? as usize;
        let group_tag = take_string(&mut buf, "group tag", tag_len)?;
        let x = take_i32(&mut buf, "x")?;
        let y = take_i32(&mut buf, "y")?;
        let vel_x = take_i32(&mut buf, "velocity x")?;
        let vel_y = take_i32(&mut buf, "velocity y")?;
        let code = take_u8(&mut buf, "color code")?;
        let color = ColorCode::from_byte(code).ok_or(DecodeError::UnknownColorCode(code))?;
        let last_seen = take_u64(&mut buf, "last seen")?;

        players.push(PlayerRecord {
            id: padded.trim_end_matches(' ').to_string(),
            group_tag,
            x,
            y,
            vel_x,
            vel_y,
            color,
            last_seen,
        });
    }

    Ok(PlayerList {
        server_timestamp,
        players,
    })
}

/// Encodes a player-list request: the requester's id as plain text
pub fn encode_list_request(player_id: &str) -> Bytes {
    Bytes::copy_from_slice(player_id.as_bytes())
}

/// Decodes a player-list request, trimming surrounding whitespace
pub fn decode_list_request(data: &[u8]) -> String {
    String::from_utf8_lossy(data).trim().to_string()
}
