use crate::ast::Literal;
use crate::error::{LowerError, LowerResult};
use serde_json::{json, Map, Value};

const MATH_NUMBER: u8 = 4;
const TEXT: u8 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub id: Option<String>,
}

impl Field {
    pub fn new(name: &str, value: &str, id: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            id: id.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Literal(Literal),
    Block(String),
    Shadow(String),
}

impl Input {
    fn to_json(&self) -> Value {
        match self {
            Input::Literal(Literal::Number(v)) => {
                json!([1, [MATH_NUMBER, crate::ast::format_num(*v)]])
            }
            Input::Literal(Literal::Text(s)) => json!([1, [TEXT, s]]),
            Input::Block(id) => json!([2, id]),
            Input::Shadow(id) => json!([1, id]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: String,
    pub opcode: String,
    pub fields: Vec<Field>,
    pub inputs: Vec<(String, Input)>,
    pub next: Option<String>,
    pub parent: Option<String>,
    pub shadow: bool,
    pub position: Option<(i32, i32)>,
}

impl Block {
    pub fn new(id: String, opcode: &str) -> Self {
        Self {
            id,
            opcode: opcode.to_string(),
            fields: Vec::new(),
            inputs: Vec::new(),
            next: None,
            parent: None,
            shadow: false,
            position: None,
        }
    }

    pub fn top_level(id: String, opcode: &str, x: i32, y: i32) -> Self {
        let mut block = Self::new(id, opcode);
        block.position = Some((x, y));
        block
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_input(mut self, name: &str, input: Input) -> Self {
        self.inputs.push((name.to_string(), input));
        self
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn as_shadow(mut self) -> Self {
        self.shadow = true;
        self
    }

    pub fn is_top_level(&self) -> bool {
        self.position.is_some()
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.iter().find(|(n, _)| n == name).map(|(_, i)| i)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Links `next` after this block. A block has exactly one successor, so a
    /// second link is an internal error.
    pub fn set_next(&mut self, next: &str) -> LowerResult<()> {
        if let Some(existing) = &self.next {
            return Err(LowerError::InternalInvariantViolation(format!(
                "Block '{}' is already followed by '{}'.",
                self.id, existing
            )));
        }
        self.next = Some(next.to_string());
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        let mut inputs = Map::new();
        for (name, input) in &self.inputs {
            inputs.insert(name.clone(), input.to_json());
        }
        let mut fields = Map::new();
        for field in &self.fields {
            fields.insert(field.name.clone(), json!([field.value, field.id]));
        }
        let mut out = json!({
            "opcode": self.opcode,
            "next": self.next,
            "parent": self.parent,
            "inputs": inputs,
            "fields": fields,
            "shadow": self.shadow,
            "topLevel": self.is_top_level()
        });
        if let (Some((x, y)), Some(obj)) = (self.position, out.as_object_mut()) {
            obj.insert("x".to_string(), json!(x));
            obj.insert("y".to_string(), json!(y));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_top_level_block_with_position() {
        let block = Block::top_level("block_1".to_string(), "event_whenflagclicked", 43, 43);
        let value = block.to_json();
        assert_eq!(value["opcode"], "event_whenflagclicked");
        assert_eq!(value["topLevel"], true);
        assert_eq!(value["x"], 43);
        assert_eq!(value["next"], Value::Null);
    }

    #[test]
    fn encodes_inputs_and_fields() {
        let block = Block::new("block_2".to_string(), "looks_say")
            .with_parent("block_1")
            .with_input("MESSAGE", Input::Literal(Literal::from("hi")))
            .with_input("SECS", Input::Literal(Literal::Number(2.0)))
            .with_field(Field::new("LIST", "stack", Some("list_1")));
        let value = block.to_json();
        assert_eq!(value["inputs"]["MESSAGE"], json!([1, [10, "hi"]]));
        assert_eq!(value["inputs"]["SECS"], json!([1, [4, "2"]]));
        assert_eq!(value["fields"]["LIST"], json!(["stack", "list_1"]));
        assert_eq!(value["parent"], "block_1");
        assert!(value.get("x").is_none());
    }

    #[test]
    fn fractional_and_large_numbers_encode_exactly() {
        let block = Block::new("block_3".to_string(), "motion_movesteps")
            .with_input("STEPS", Input::Literal(Literal::Number(3.14159265)))
            .with_input("BIG", Input::Literal(Literal::Number(1e20)));
        let value = block.to_json();
        assert_eq!(value["inputs"]["STEPS"], json!([1, [4, "3.14159265"]]));
        assert_eq!(value["inputs"]["BIG"], json!([1, [4, "100000000000000000000"]]));
    }

    #[test]
    fn next_link_is_set_once() {
        let mut block = Block::new("block_1".to_string(), "looks_say");
        block.set_next("block_2").unwrap();
        assert!(matches!(
            block.set_next("block_3"),
            Err(LowerError::InternalInvariantViolation(_))
        ));
        assert_eq!(block.next.as_deref(), Some("block_2"));
    }
}
