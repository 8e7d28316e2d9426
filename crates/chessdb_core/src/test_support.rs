//! Small entity used by unit tests.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::types::EntityId;
use std::cmp::Ordering;

const NAME_LEN: usize = 16;

/// Name-keyed entity: 16 name bytes, count (4), first reference (4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub id: Option<EntityId>,
    pub name: String,
    pub count: u32,
    pub first_ref: Option<EntityId>,
}

impl Name {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            count: 0,
            first_ref: None,
        }
    }
}

impl Entity for Name {
    const SERIALIZED_LENGTH: usize = NAME_LEN + 8;

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn count(&self) -> u32 {
        self.count
    }

    fn first_ref_id(&self) -> Option<EntityId> {
        self.first_ref
    }

    fn compare(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }

    fn serialize(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::SERIALIZED_LENGTH];
        let name = self.name.as_bytes();
        let n = name.len().min(NAME_LEN);
        buf[..n].copy_from_slice(&name[..n]);
        buf[NAME_LEN..NAME_LEN + 4].copy_from_slice(&self.count.to_le_bytes());
        buf[NAME_LEN + 4..].copy_from_slice(&EntityId::to_link(self.first_ref).to_le_bytes());
        buf
    }

    fn deserialize(id: EntityId, bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != Self::SERIALIZED_LENGTH {
            return Err(CoreError::invalid_format("bad name record length"));
        }
        let end = bytes[..NAME_LEN]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_LEN);
        let name = String::from_utf8(bytes[..end].to_vec())
            .map_err(|_| CoreError::invalid_format("name is not UTF-8"))?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&bytes[NAME_LEN..NAME_LEN + 4]);
        let count = u32::from_le_bytes(word);
        word.copy_from_slice(&bytes[NAME_LEN + 4..]);
        let first_ref = EntityId::from_link(i32::from_le_bytes(word));
        Ok(Self {
            id: Some(id),
            name,
            count,
            first_ref,
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
            first_ref: first_ref_id,
            ..self.clone()
        }
    }
}

pub fn names(store: &[Name]) -> Vec<&str> {
    store.iter().map(|n| n.name.as_str()).collect()
}
