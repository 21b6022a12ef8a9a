use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(v) => write!(f, "{}", format_num(*v)),
            Literal::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Value {
    #[serde(rename = "objectLiteral")]
    Literal { value: Literal },
    #[serde(rename = "variableReference")]
    Reference { name: String },
}

impl Value {
    pub fn literal(value: impl Into<Literal>) -> Self {
        Value::Literal {
            value: value.into(),
        }
    }

    pub fn reference(name: &str) -> Self {
        Value::Reference {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    #[serde(rename = "functionCall")]
    FunctionCall {
        name: String,
        #[serde(default)]
        args: Vec<Value>,
        #[serde(default, rename = "async")]
        is_async: bool,
    },
    #[serde(rename = "variableDef")]
    VariableDeclaration { name: String, value: Value },
}

impl Statement {
    pub fn call(name: &str, args: Vec<Value>) -> Self {
        Statement::FunctionCall {
            name: name.to_string(),
            args,
            is_async: false,
        }
    }

    pub fn call_async(name: &str, args: Vec<Value>) -> Self {
        Statement::FunctionCall {
            name: name.to_string(),
            args,
            is_async: true,
        }
    }

    pub fn declare(name: &str, value: Value) -> Self {
        Statement::VariableDeclaration {
            name: name.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, rename = "codeLines")]
    pub body: Vec<Statement>,
}

impl FunctionDefinition {
    pub fn new(name: &str, body: Vec<Statement>) -> Self {
        Self {
            name: name.to_string(),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Member {
    #[serde(rename = "functionDef")]
    Function(FunctionDefinition),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpriteDefinition {
    pub name: String,
    #[serde(default, rename = "functions")]
    pub members: Vec<Member>,
}

impl SpriteDefinition {
    pub fn new(name: &str, functions: Vec<FunctionDefinition>) -> Self {
        Self {
            name: name.to_string(),
            members: functions.into_iter().map(Member::Function).collect(),
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.members.iter().filter_map(|m| match m {
            Member::Function(f) => Some(f),
            Member::Other => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Sprite(SpriteDefinition),
    Function(FunctionDefinition),
    Statement(Statement),
}

impl Definition {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| anyhow!("Definition is missing its 'type' tag."))?
            .to_string();
        match kind.as_str() {
            "spriteDef" => Ok(Definition::Sprite(serde_json::from_value(value)?)),
            "functionDef" => Ok(Definition::Function(serde_json::from_value(value)?)),
            "functionCall" | "variableDef" => {
                Ok(Definition::Statement(serde_json::from_value(value)?))
            }
            other => bail!("Unknown definition type '{}'.", other),
        }
    }
}

pub fn parse_definitions(json: &str) -> Result<Vec<Definition>> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(json).context("Definitions must be a JSON array.")?;
    raw.into_iter().map(Definition::from_json).collect()
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

pub(crate) fn format_num(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < MAX_SAFE_INTEGER {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parser_output_shape() {
        let defs = parse_definitions(
            r#"[{"type":"spriteDef","name":"Stage","functions":[
                {"type":"functionDef","name":"main","codeLines":[
                  {"type":"variableDef","name":"x","value":{"type":"objectLiteral","value":5}},
                  {"type":"functionCall","name":"say","args":[{"type":"variableReference","name":"x"}]},
                  {"type":"functionCall","name":"greet","async":true}
                ]},
                {"type":"costume","path":"cat.svg"}
            ]}]"#,
        )
        .unwrap();
        let Definition::Sprite(sprite) = &defs[0] else {
            panic!("expected sprite");
        };
        assert_eq!(sprite.name, "Stage");
        assert_eq!(sprite.members.len(), 2);
        let functions = sprite.functions().collect::<Vec<_>>();
        assert_eq!(functions.len(), 1);
        assert_eq!(
            functions[0].body,
            vec![
                Statement::declare("x", Value::literal(5.0)),
                Statement::call("say", vec![Value::reference("x")]),
                Statement::call_async("greet", vec![]),
            ]
        );
    }

    #[test]
    fn formats_numbers_like_the_runtime() {
        assert_eq!(Literal::Number(5.0).to_string(), "5");
        assert_eq!(Literal::Number(2.5).to_string(), "2.5");
        assert_eq!(Literal::from("hi").to_string(), "hi");
    }

    #[test]
    fn numbers_keep_their_exact_value() {
        assert_eq!(format_num(1e20), "100000000000000000000");
        assert_eq!(format_num(1e-7), "0.0000001");
        assert_eq!(format_num(3.14159265), "3.14159265");
        assert_eq!(format_num(-2.5), "-2.5");
        assert_eq!(format_num(-3.0), "-3");
        assert_eq!(format_num(9_007_199_254_740_991.0), "9007199254740991");
    }

    #[test]
    fn rejects_unknown_top_level_types() {
        let err = parse_definitions(r#"[{"type":"costume"}]"#).unwrap_err();
        assert!(err.to_string().contains("Unknown definition type 'costume'"));
        let defs = parse_definitions(
            r#"[{"type":"functionCall","name":"say","args":[]},{"type":"functionDef","name":"f"}]"#,
        )
        .unwrap();
        assert!(matches!(defs[0], Definition::Statement(_)));
        assert!(matches!(defs[1], Definition::Function(_)));
    }
}
