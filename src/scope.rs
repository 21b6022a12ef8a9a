use crate::ast::Literal;
use crate::block::{Block, Field, Input};
use crate::error::{LowerError, LowerResult};
use std::collections::HashMap;
use tracing::debug;

pub const STACK_LIST_NAME: &str = "stack";

#[derive(Debug, Clone, PartialEq)]
pub struct StackList {
    pub id: String,
    pub name: String,
}

impl StackList {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn list_field(&self) -> Field {
        Field::new("LIST", &self.name, Some(&self.id))
    }

    fn push_block(&self, id: String, value: Input) -> Block {
        Block::new(id, "data_insertatlist")
            .with_input("ITEM", value)
            .with_input("INDEX", Input::Literal(Literal::Number(1.0)))
            .with_field(self.list_field())
    }

    fn read_block(&self, id: String, offset: usize) -> Block {
        Block::new(id, "data_itemoflist")
            .with_input("INDEX", Input::Literal(Literal::Number(offset as f64 + 1.0)))
            .with_field(self.list_field())
    }

    fn pop_block(&self, id: String) -> Block {
        Block::new(id, "data_deleteoflist")
            .with_input("INDEX", Input::Literal(Literal::Number(1.0)))
            .with_field(self.list_field())
    }
}

#[derive(Debug)]
pub struct ScopeTracker {
    function: String,
    stack: StackList,
    shift: usize,
    slots: HashMap<String, usize>,
    live: Vec<(String, usize)>,
}

impl ScopeTracker {
    pub fn new(function: &str, stack: StackList) -> Self {
        Self {
            function: function.to_string(),
            stack,
            shift: 0,
            slots: HashMap::new(),
            live: Vec::new(),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn shift(&self) -> usize {
        self.shift
    }

    /// Records `name` at the current shift and accounts for one pushed slot.
    /// A repeated name gets a fresh slot that shadows the old one.
    pub fn declare(&mut self, name: &str) -> usize {
        let offset = self.shift;
        self.slots.insert(name.to_string(), offset);
        self.live.push((name.to_string(), offset));
        self.shift += 1;
        offset
    }

    /// Distance of `name` from the top of the list: the number of
    /// declarations made after it.
    pub fn resolve(&self, name: &str) -> LowerResult<usize> {
        let stored = self
            .slots
            .get(name)
            .ok_or_else(|| LowerError::UndefinedVariable {
                name: name.to_string(),
                function: self.function.clone(),
            })?;
        Ok(self.shift - stored - 1)
    }

    pub fn push(&mut self, name: &str, id: String, value: Input) -> Block {
        let offset = self.declare(name);
        debug!(function = %self.function, variable = name, offset, "push stack slot");
        self.stack.push_block(id, value)
    }

    pub fn read(&self, name: &str, id: String) -> LowerResult<Block> {
        let offset = self.resolve(name)?;
        Ok(self.stack.read_block(id, offset))
    }

    pub fn pop(&mut self, id: String) -> LowerResult<Block> {
        let (name, offset) = self.live.pop().ok_or_else(|| {
            LowerError::InternalInvariantViolation(format!(
                "Stack underflow while leaving function '{}'.",
                self.function
            ))
        })?;
        if self.slots.get(&name) == Some(&offset) {
            self.slots.remove(&name);
        }
        self.shift -= 1;
        debug!(function = %self.function, variable = %name, "pop stack slot");
        Ok(self.stack.pop_block(id))
    }

    pub fn live_slots(&self) -> usize {
        self.live.len()
    }
}
