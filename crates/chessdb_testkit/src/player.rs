//! A player entity with a fixed 58-byte record.

use bytes::{Buf, BufMut};
use chessdb_core::{CoreError, CoreResult, Entity, EntityId};
use std::cmp::Ordering;

/// Bytes reserved for the last name.
pub const LAST_NAME_LEN: usize = 30;
/// Bytes reserved for the first name.
pub const FIRST_NAME_LEN: usize = 20;

/// A player record, ordered by last name and then first name.
///
/// Record layout: last name (30, zero padded) | first name (20, zero
/// padded) | game count (u32) | first game (i32, `-1` for none). Names
/// longer than their field are truncated on the way out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Assigned identity.
    pub id: Option<EntityId>,
    /// Last name; the primary sort key.
    pub last_name: String,
    /// First name; the secondary sort key.
    pub first_name: String,
    /// Number of games referring to this player.
    pub count: u32,
    /// First game referring to this player.
    pub first_game: Option<EntityId>,
}

impl Player {
    /// Creates an unsaved player.
    pub fn new(last_name: &str, first_name: &str) -> Self {
        Self {
            id: None,
            last_name: last_name.to_string(),
            first_name: first_name.to_string(),
            count: 0,
            first_game: None,
        }
    }

    /// Creates a lookup key matching any player with this last name and an
    /// empty first name.
    pub fn key(last_name: &str) -> Self {
        Self::new(last_name, "")
    }

    /// Returns `"Last, First"`, or just the last name.
    pub fn full_name(&self) -> String {
        if self.first_name.is_empty() {
            self.last_name.clone()
        } else {
            format!("{}, {}", self.last_name, self.first_name)
        }
    }
}

impl Entity for Player {
    const SERIALIZED_LENGTH: usize = LAST_NAME_LEN + FIRST_NAME_LEN + 8;

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn count(&self) -> u32 {
        self.count
    }

    fn first_ref_id(&self) -> Option<EntityId> {
        self.first_game
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.last_name
            .cmp(&other.last_name)
            .then_with(|| self.first_name.cmp(&other.first_name))
    }

    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SERIALIZED_LENGTH);
        put_padded(&mut buf, &self.last_name, LAST_NAME_LEN);
        put_padded(&mut buf, &self.first_name, FIRST_NAME_LEN);
        buf.put_u32_le(self.count);
        buf.put_i32_le(EntityId::to_link(self.first_game));
        buf
    }

    fn deserialize(id: EntityId, bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != Self::SERIALIZED_LENGTH {
            return Err(CoreError::invalid_format(format!(
                "player record is {} bytes, expected {}",
                bytes.len(),
                Self::SERIALIZED_LENGTH
            )));
        }
        let mut buf = bytes;
        let last_name = take_padded(&mut buf, LAST_NAME_LEN);
        let first_name = take_padded(&mut buf, FIRST_NAME_LEN);
        let count = buf.get_u32_le();
        let first_game = EntityId::from_link(buf.get_i32_le());
        Ok(Self {
            id: Some(id),
            last_name,
            first_name,
            count,
            first_game,
        })
    }

    fn with_new_id(&self, id: EntityId) -> Self {
        Self {
            id: Some(id),
            ..self.clone()
        }
    }

    fn with_new_stats(&self, count: u32, first_ref_id: Option<EntityId>) -> Self {
        Self {
            count,
            first_game: first_ref_id,
            ..self.clone()
        }
    }
}

fn put_padded(buf: &mut Vec<u8>, text: &str, width: usize) {
    let mut end = text.len().min(width);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    buf.put_slice(&text.as_bytes()[..end]);
    buf.put_bytes(0, width - end);
}

fn take_padded(buf: &mut &[u8], width: usize) -> String {
    let field = &buf[..width];
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    let text = String::from_utf8_lossy(&field[..end]).into_owned();
    buf.advance(width);
    text
}
