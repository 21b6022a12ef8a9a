use crate::error::{LowerError, LowerResult};
use crate::project::IdAllocator;
use std::collections::HashMap;

const MESSAGE_PREFIX: &str = "function__";

#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastEntry {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct BroadcastRegistry {
    entries: HashMap<String, BroadcastEntry>,
    order: Vec<String>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logical_name(sprite: &str, function: &str) -> String {
        format!("{}.{}", sprite, function)
    }

    pub fn qualify(caller_sprite: &str, name: &str) -> String {
        match name.split_once('.') {
            Some((left, right)) if !left.is_empty() && !right.is_empty() => name.to_string(),
            _ => Self::logical_name(caller_sprite, name),
        }
    }

    pub fn register(&mut self, logical: &str, ids: &mut IdAllocator) -> BroadcastEntry {
        if let Some(entry) = self.entries.get(logical) {
            return entry.clone();
        }
        let entry = BroadcastEntry {
            id: ids.next("broadcast"),
            message: format!("{}{}", MESSAGE_PREFIX, logical),
        };
        self.entries.insert(logical.to_string(), entry.clone());
        self.order.push(logical.to_string());
        entry
    }

    pub fn resolve(&self, logical: &str) -> LowerResult<&BroadcastEntry> {
        self.entries
            .get(logical)
            .ok_or_else(|| LowerError::UnknownFunction {
                name: logical.to_string(),
            })
    }

    pub fn entries(&self) -> impl Iterator<Item = &BroadcastEntry> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
