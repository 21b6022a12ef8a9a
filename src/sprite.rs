use crate::ast::{FunctionDefinition, SpriteDefinition};
use crate::block::{Block, Field};
use crate::broadcast::BroadcastRegistry;
use crate::chain::{ChainBuilder, LoweredChain};
use crate::error::LowerResult;
use crate::project::{IdAllocator, Target};
use crate::scope::StackList;
use tracing::debug;

pub const ENTRY_FUNCTION: &str = "main";

const LAYOUT_ORIGIN: i32 = 43;
const LAYOUT_STRIDE: i32 = 400;

pub fn layout_position(index: usize) -> (i32, i32) {
    (LAYOUT_ORIGIN + LAYOUT_STRIDE * index as i32, LAYOUT_ORIGIN)
}

pub struct SpriteLowering<'a> {
    sprite: &'a SpriteDefinition,
    stack: &'a StackList,
}

impl<'a> SpriteLowering<'a> {
    pub fn new(sprite: &'a SpriteDefinition, stack: &'a StackList) -> Self {
        Self { sprite, stack }
    }

    pub fn register_functions(
        sprite: &SpriteDefinition,
        broadcasts: &mut BroadcastRegistry,
        ids: &mut IdAllocator,
    ) {
        for function in sprite.functions() {
            if function.name != ENTRY_FUNCTION {
                broadcasts.register(
                    &BroadcastRegistry::logical_name(&sprite.name, &function.name),
                    ids,
                );
            }
        }
    }

    pub fn lower(
        &self,
        target: &mut Target,
        broadcasts: &mut BroadcastRegistry,
        ids: &mut IdAllocator,
    ) -> LowerResult<Vec<LoweredChain>> {
        let mut chains = Vec::new();
        for (index, function) in self.sprite.functions().enumerate() {
            let head = self.head_block(function, index, broadcasts, ids);
            let chain = ChainBuilder::new(
                &self.sprite.name,
                &function.name,
                head,
                self.stack.clone(),
                target,
                ids,
                broadcasts,
            )?
            .lower_body(&function.body)?;
            debug!(
                sprite = %self.sprite.name,
                function = %function.name,
                blocks = chain.length,
                "lowered function"
            );
            chains.push(chain);
        }
        Ok(chains)
    }

    fn head_block(
        &self,
        function: &FunctionDefinition,
        index: usize,
        broadcasts: &mut BroadcastRegistry,
        ids: &mut IdAllocator,
    ) -> Block {
        let (x, y) = layout_position(index);
        if function.name == ENTRY_FUNCTION {
            debug!(sprite = %self.sprite.name, "main function found, creating green flag event");
            return Block::top_level(ids.block(), "event_whenflagclicked", x, y);
        }
        let entry = broadcasts.register(
            &BroadcastRegistry::logical_name(&self.sprite.name, &function.name),
            ids,
        );
        Block::top_level(ids.block(), "event_whenbroadcastreceived", x, y).with_field(Field::new(
            "BROADCAST_OPTION",
            &entry.message,
            Some(&entry.id),
        ))
    }
}
