use crate::block::Block;
use crate::error::{LowerError, LowerResult};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

pub const STAGE_NAME: &str = "Stage";

#[derive(Debug, Default)]
pub struct IdAllocator {
    counter: usize,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("{}_{}", prefix, self.counter)
    }

    pub fn block(&mut self) -> String {
        self.next("block")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListDecl {
    pub id: String,
    pub name: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Costume {
    pub name: String,
    pub asset_id: String,
    pub data_format: String,
    pub rotation_center: (f64, f64),
}

impl Costume {
    pub fn md5ext(&self) -> String {
        format!("{}.{}", self.asset_id, self.data_format)
    }

    fn to_json(&self) -> Value {
        let mut entry = json!({
            "name": self.name,
            "assetId": self.asset_id,
            "md5ext": self.md5ext(),
            "dataFormat": self.data_format,
            "rotationCenterX": self.rotation_center.0,
            "rotationCenterY": self.rotation_center.1
        });
        if self.data_format == "png" {
            if let Some(obj) = entry.as_object_mut() {
                obj.insert("bitmapResolution".to_string(), json!(1));
            }
        }
        entry
    }
}

#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub is_stage: bool,
    blocks: Vec<Block>,
    block_index: HashMap<String, usize>,
    pub lists: Vec<ListDecl>,
    pub broadcasts: Vec<(String, String)>,
    pub costumes: Vec<Costume>,
}

impl Target {
    pub fn new(name: &str, is_stage: bool) -> Self {
        Self {
            name: name.to_string(),
            is_stage,
            blocks: Vec::new(),
            block_index: HashMap::new(),
            lists: Vec::new(),
            broadcasts: Vec::new(),
            costumes: Vec::new(),
        }
    }

    pub fn add_block(&mut self, block: Block) -> LowerResult<()> {
        if self.block_index.contains_key(&block.id) {
            return Err(LowerError::InternalInvariantViolation(format!(
                "Block id '{}' emitted twice in target '{}'.",
                block.id, self.name
            )));
        }
        self.block_index.insert(block.id.clone(), self.blocks.len());
        self.blocks.push(block);
        Ok(())
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.block_index.get(id).map(|&i| &self.blocks[i])
    }

    pub fn block_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.block_index.get(id).map(|&i| &mut self.blocks[i])
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn add_list(&mut self, id: String, name: &str) -> ListDecl {
        let list = ListDecl {
            id,
            name: name.to_string(),
            values: Vec::new(),
        };
        self.lists.push(list.clone());
        list
    }

    pub fn add_broadcast(&mut self, id: &str, name: &str) {
        if !self.broadcasts.iter().any(|(existing, _)| existing == id) {
            self.broadcasts.push((id.to_string(), name.to_string()));
        }
    }

    fn to_json(&self, layer_order: usize) -> Value {
        let mut blocks = Map::new();
        for block in &self.blocks {
            blocks.insert(block.id.clone(), block.to_json());
        }
        let mut lists = Map::new();
        for list in &self.lists {
            lists.insert(list.id.clone(), json!([list.name, list.values]));
        }
        let mut broadcasts = Map::new();
        for (id, name) in &self.broadcasts {
            broadcasts.insert(id.clone(), Value::String(name.clone()));
        }
        let mut target = json!({
            "isStage": self.is_stage,
            "name": self.name,
            "variables": {},
            "lists": lists,
            "broadcasts": broadcasts,
            "blocks": blocks,
            "comments": {},
            "currentCostume": 0,
            "costumes": self.costumes.iter().map(Costume::to_json).collect::<Vec<_>>(),
            "sounds": [],
            "volume": 100,
            "layerOrder": layer_order
        });
        let extra = if self.is_stage {
            json!({
                "tempo": 60,
                "videoTransparency": 50,
                "videoState": "on",
                "textToSpeechLanguage": Value::Null
            })
        } else {
            json!({
                "visible": true,
                "x": 0,
                "y": 0,
                "size": 100,
                "direction": 90,
                "draggable": false,
                "rotationStyle": "all around"
            })
        };
        if let (Some(dst), Some(add)) = (target.as_object_mut(), extra.as_object()) {
            for (k, v) in add {
                dst.insert(k.clone(), v.clone());
            }
        }
        target
    }
}

/// The root container. The Stage is created up front and always sits first.
#[derive(Debug, Clone)]
pub struct Project {
    pub targets: Vec<Target>,
}

impl Default for Project {
    fn default() -> Self {
        Self::empty()
    }
}

impl Project {
    pub fn empty() -> Self {
        Self {
            targets: vec![Target::new(STAGE_NAME, true)],
        }
    }

    pub fn stage(&self) -> &Target {
        &self.targets[0]
    }

    pub fn stage_mut(&mut self) -> &mut Target {
        &mut self.targets[0]
    }

    pub fn add_sprite(&mut self, name: &str) -> usize {
        self.targets.push(Target::new(name, false));
        self.targets.len() - 1
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn to_json(&self) -> Value {
        let targets = self
            .targets
            .iter()
            .enumerate()
            .map(|(layer, target)| target.to_json(layer))
            .collect::<Vec<_>>();
        json!({
            "targets": targets,
            "monitors": [],
            "extensions": [],
            "meta": {
                "semver": "3.0.0",
                "vm": "0.2.0",
                "agent": "sbchain"
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_deterministic() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.block(), "block_1");
        assert_eq!(ids.next("list"), "list_2");
        let mut again = IdAllocator::new();
        assert_eq!(again.block(), "block_1");
    }

    #[test]
    fn rejects_duplicate_block_ids() {
        let mut target = Target::new("Player", false);
        target
            .add_block(Block::new("block_1".to_string(), "looks_say"))
            .unwrap();
        let err = target
            .add_block(Block::new("block_1".to_string(), "looks_think"))
            .unwrap_err();
        assert!(matches!(err, LowerError::InternalInvariantViolation(_)));
    }

    #[test]
    fn empty_project_has_stage_first() {
        let mut project = Project::empty();
        project.add_sprite("Player");
        let value = project.to_json();
        assert_eq!(value["targets"][0]["isStage"], true);
        assert_eq!(value["targets"][0]["name"], "Stage");
        assert_eq!(value["targets"][1]["name"], "Player");
        assert_eq!(value["targets"][1]["layerOrder"], 1);
        assert_eq!(value["targets"][1]["rotationStyle"], "all around");
    }
}
