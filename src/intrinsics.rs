use crate::block::{Block, Field, Input};
use crate::error::{LowerError, LowerResult};
use crate::project::IdAllocator;

#[derive(Debug)]
pub struct Emission {
    pub block: Block,
    pub helpers: Vec<Block>,
}

impl Emission {
    fn single(block: Block) -> Self {
        Self {
            block,
            helpers: Vec::new(),
        }
    }
}

pub type EmitFn = fn(&str, String, Vec<Input>, &mut IdAllocator) -> LowerResult<Emission>;

pub struct Intrinsic {
    pub name: &'static str,
    emit: EmitFn,
}

impl Intrinsic {
    pub fn emit(
        &self,
        id: String,
        args: Vec<Input>,
        ids: &mut IdAllocator,
    ) -> LowerResult<Emission> {
        (self.emit)(self.name, id, args, ids)
    }
}

static INTRINSICS: &[Intrinsic] = &[
    Intrinsic { name: "say", emit: emit_say },
    Intrinsic { name: "think", emit: emit_think },
    Intrinsic { name: "wait", emit: emit_wait },
    Intrinsic { name: "move", emit: emit_move },
    Intrinsic { name: "turn_right", emit: emit_turn_right },
    Intrinsic { name: "turn_left", emit: emit_turn_left },
    Intrinsic { name: "go_to", emit: emit_go_to },
    Intrinsic { name: "change_x", emit: emit_change_x },
    Intrinsic { name: "set_x", emit: emit_set_x },
    Intrinsic { name: "change_y", emit: emit_change_y },
    Intrinsic { name: "set_y", emit: emit_set_y },
    Intrinsic { name: "point_in_direction", emit: emit_point_in_direction },
    Intrinsic { name: "change_size", emit: emit_change_size },
    Intrinsic { name: "set_size", emit: emit_set_size },
    Intrinsic { name: "show", emit: emit_show },
    Intrinsic { name: "hide", emit: emit_hide },
    Intrinsic { name: "next_costume", emit: emit_next_costume },
    Intrinsic { name: "switch_costume", emit: emit_switch_costume },
];

pub fn lookup(name: &str) -> Option<&'static Intrinsic> {
    INTRINSICS.iter().find(|i| i.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    INTRINSICS.iter().map(|i| i.name)
}

fn shaped(
    name: &str,
    id: String,
    opcode: &str,
    input_names: &[&str],
    args: Vec<Input>,
) -> LowerResult<Emission> {
    if args.len() != input_names.len() {
        return Err(LowerError::ArgumentCount {
            name: name.to_string(),
            got: args.len(),
        });
    }
    let mut block = Block::new(id, opcode);
    for (input_name, arg) in input_names.iter().zip(args) {
        block = block.with_input(input_name, arg);
    }
    Ok(Emission::single(block))
}

fn emit_say(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    if args.len() == 2 {
        shaped(name, id, "looks_sayforsecs", &["MESSAGE", "SECS"], args)
    } else {
        shaped(name, id, "looks_say", &["MESSAGE"], args)
    }
}

fn emit_think(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    if args.len() == 2 {
        shaped(name, id, "looks_thinkforsecs", &["MESSAGE", "SECS"], args)
    } else {
        shaped(name, id, "looks_think", &["MESSAGE"], args)
    }
}

fn emit_wait(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "control_wait", &["DURATION"], args)
}

fn emit_move(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "motion_movesteps", &["STEPS"], args)
}

fn emit_turn_right(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "motion_turnright", &["DEGREES"], args)
}

fn emit_turn_left(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "motion_turnleft", &["DEGREES"], args)
}

fn emit_go_to(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "motion_gotoxy", &["X", "Y"], args)
}

fn emit_change_x(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "motion_changexby", &["DX"], args)
}

fn emit_set_x(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "motion_setx", &["X"], args)
}

fn emit_change_y(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "motion_changeyby", &["DY"], args)
}

fn emit_set_y(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "motion_sety", &["Y"], args)
}

fn emit_point_in_direction(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "motion_pointindirection", &["DIRECTION"], args)
}

fn emit_change_size(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "looks_changesizeby", &["CHANGE"], args)
}

fn emit_set_size(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "looks_setsizeto", &["SIZE"], args)
}

fn emit_show(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "looks_show", &[], args)
}

fn emit_hide(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "looks_hide", &[], args)
}

fn emit_next_costume(name: &str, id: String, args: Vec<Input>, _: &mut IdAllocator) -> LowerResult<Emission> {
    shaped(name, id, "looks_nextcostume", &[], args)
}

fn emit_switch_costume(
    name: &str,
    id: String,
    mut args: Vec<Input>,
    ids: &mut IdAllocator,
) -> LowerResult<Emission> {
    if args.len() != 1 {
        return Err(LowerError::ArgumentCount {
            name: name.to_string(),
            got: args.len(),
        });
    }
    match args.remove(0) {
        Input::Literal(literal) => {
            let menu_id = ids.block();
            let menu = Block::new(menu_id.clone(), "looks_costume")
                .with_parent(&id)
                .with_field(Field::new("COSTUME", &literal.to_string(), None))
                .as_shadow();
            let block = Block::new(id, "looks_switchcostumeto")
                .with_input("COSTUME", Input::Shadow(menu_id));
            Ok(Emission {
                block,
                helpers: vec![menu],
            })
        }
        other => Ok(Emission::single(
            Block::new(id, "looks_switchcostumeto").with_input("COSTUME", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;

    fn text(s: &str) -> Input {
        Input::Literal(Literal::from(s))
    }

    #[test]
    fn say_variant_follows_argument_count() {
        let mut ids = IdAllocator::new();
        let say = lookup("say").unwrap();
        let one = say.emit("block_a".to_string(), vec![text("hi")], &mut ids).unwrap();
        assert_eq!(one.block.opcode, "looks_say");
        assert!(one.helpers.is_empty());
        let two = say
            .emit(
                "block_b".to_string(),
                vec![text("hi"), Input::Literal(Literal::Number(2.0))],
                &mut ids,
            )
            .unwrap();
        assert_eq!(two.block.opcode, "looks_sayforsecs");
        assert_eq!(two.block.input("SECS"), Some(&Input::Literal(Literal::Number(2.0))));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let mut ids = IdAllocator::new();
        let err = lookup("say")
            .unwrap()
            .emit("block_a".to_string(), vec![], &mut ids)
            .unwrap_err();
        assert_eq!(
            err,
            LowerError::ArgumentCount {
                name: "say".to_string(),
                got: 0
            }
        );
        assert!(lookup("hide")
            .unwrap()
            .emit("block_b".to_string(), vec![text("x")], &mut ids)
            .is_err());
    }

    #[test]
    fn unknown_names_are_not_builtins() {
        assert!(lookup("greet").is_none());
        assert!(lookup("Say").is_none());
        assert!(names().any(|n| n == "switch_costume"));
    }

    #[test]
    fn switch_costume_literal_gets_menu_helper() {
        let mut ids = IdAllocator::new();
        let emission = lookup("switch_costume")
            .unwrap()
            .emit("block_a".to_string(), vec![text("costume2")], &mut ids)
            .unwrap();
        assert_eq!(emission.helpers.len(), 1);
        let menu = &emission.helpers[0];
        assert!(menu.shadow);
        assert_eq!(menu.parent.as_deref(), Some("block_a"));
        assert_eq!(
            emission.block.input("COSTUME"),
            Some(&Input::Shadow(menu.id.clone()))
        );

        let by_ref = lookup("switch_costume")
            .unwrap()
            .emit(
                "block_b".to_string(),
                vec![Input::Block("block_r".to_string())],
                &mut ids,
            )
            .unwrap();
        assert!(by_ref.helpers.is_empty());
    }
}
