use crate::ast::{Statement, Value};
use crate::block::{Block, Field, Input};
use crate::broadcast::BroadcastRegistry;
use crate::error::{LowerError, LowerResult};
use crate::intrinsics;
use crate::project::{IdAllocator, Target};
use crate::scope::{ScopeTracker, StackList};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct LoweredChain {
    pub head: String,
    pub length: usize,
}

pub struct ChainBuilder<'a> {
    sprite: &'a str,
    target: &'a mut Target,
    ids: &'a mut IdAllocator,
    broadcasts: &'a BroadcastRegistry,
    scope: ScopeTracker,
    head: String,
    last: String,
    length: usize,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(
        sprite: &'a str,
        function: &str,
        head: Block,
        stack: StackList,
        target: &'a mut Target,
        ids: &'a mut IdAllocator,
        broadcasts: &'a BroadcastRegistry,
    ) -> LowerResult<Self> {
        if !head.is_top_level() {
            return Err(LowerError::InternalInvariantViolation(format!(
                "Failed to create head block for function '{}'.",
                function
            )));
        }
        let head_id = head.id.clone();
        target.add_block(head)?;
        Ok(Self {
            sprite,
            target,
            ids,
            broadcasts,
            scope: ScopeTracker::new(function, stack),
            head: head_id.clone(),
            last: head_id,
            length: 1,
        })
    }

    pub fn lower_body(mut self, body: &[Statement]) -> LowerResult<LoweredChain> {
        for stmt in body {
            self.lower_statement(stmt)?;
        }
        while self.scope.live_slots() > 0 {
            let id = self.ids.block();
            let pop = self.scope.pop(id)?;
            self.append(pop, Vec::new())?;
        }
        if self.scope.shift() != 0 {
            return Err(LowerError::InternalInvariantViolation(format!(
                "Stack shift is {} after lowering '{}.{}'.",
                self.scope.shift(),
                self.sprite,
                self.scope.function()
            )));
        }
        Ok(LoweredChain {
            head: self.head,
            length: self.length,
        })
    }

    fn lower_statement(&mut self, stmt: &Statement) -> LowerResult<()> {
        match stmt {
            Statement::VariableDeclaration { name, value } => {
                let id = self.ids.block();
                let mut owned = Vec::new();
                let input = self.lower_value(value, &id, &mut owned)?;
                let push = self.scope.push(name, id, input);
                self.append(push, owned)
            }
            Statement::FunctionCall {
                name,
                args,
                is_async,
            } => {
                if let Some(intrinsic) = intrinsics::lookup(name) {
                    let id = self.ids.block();
                    let mut owned = Vec::new();
                    let mut inputs = Vec::with_capacity(args.len());
                    for arg in args {
                        inputs.push(self.lower_value(arg, &id, &mut owned)?);
                    }
                    let emission = intrinsic.emit(id, inputs, self.ids)?;
                    owned.extend(emission.helpers);
                    self.append(emission.block, owned)
                } else {
                    self.lower_user_call(name, args, *is_async)
                }
            }
        }
    }

    fn lower_value(
        &mut self,
        value: &Value,
        parent_id: &str,
        owned: &mut Vec<Block>,
    ) -> LowerResult<Input> {
        match value {
            Value::Literal { value } => Ok(Input::Literal(value.clone())),
            Value::Reference { name } => {
                let id = self.ids.block();
                let reporter = self.scope.read(name, id.clone())?.with_parent(parent_id);
                owned.push(reporter);
                Ok(Input::Block(id))
            }
        }
    }

    fn lower_user_call(&mut self, name: &str, args: &[Value], is_async: bool) -> LowerResult<()> {
        let logical = BroadcastRegistry::qualify(self.sprite, name);
        let entry = self.broadcasts.resolve(&logical)?.clone();
        // Arguments are not passed, but references must still be in scope.
        for arg in args {
            if let Value::Reference { name } = arg {
                self.scope.resolve(name)?;
            }
        }
        let opcode = if is_async {
            "event_broadcast"
        } else {
            "event_broadcastandwait"
        };
        let id = self.ids.block();
        let menu_id = self.ids.block();
        let menu = Block::new(menu_id.clone(), "event_broadcast_menu")
            .with_parent(&id)
            .with_field(Field::new("BROADCAST_OPTION", &entry.message, Some(&entry.id)))
            .as_shadow();
        let send = Block::new(id, opcode).with_input("BROADCAST_INPUT", Input::Shadow(menu_id));
        debug!(caller = self.sprite, callee = %logical, is_async, "send message");
        self.append(send, vec![menu])
    }

    fn append(&mut self, mut block: Block, owned: Vec<Block>) -> LowerResult<()> {
        block.parent = Some(self.last.clone());
        let id = block.id.clone();
        let tail = self.target.block_mut(&self.last).ok_or_else(|| {
            LowerError::InternalInvariantViolation(format!("Missing chain tail '{}'.", self.last))
        })?;
        tail.set_next(&id)?;
        self.target.add_block(block)?;
        for helper in owned {
            self.target.add_block(helper)?;
        }
        self.last = id;
        self.length += 1;
        Ok(())
    }
}
