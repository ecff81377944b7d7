//! Turns a [`Project`] into a [`Stage`]. Terms are read by the shape of the
//! slot they fill, so the same TOML array can be a script, a variadic list
//! of inputs or a nested block.

use crate::{
    conf::thread_safety,
    err::ProjectError,
    project::*,
};
use blox_dynamics::prelude::*;
use blox_syntax::prelude::*;
use std::rc::Rc;

pub type Result<T> = std::result::Result<T, ProjectError>;

/// Builds the stage a project describes. The project's thread-safety flag
/// overrides the one in `settings`.
pub fn build_stage(
    project: &Project, mut settings: Settings, effects: Box<dyn Effects>,
) -> Result<Stage> {
    if let Some(thread_safe) = project.thread_safe {
        settings.thread_safety = thread_safety(thread_safe);
    }
    let mut stage = Stage::new(settings, effects);

    // headers first, so bodies and scripts may call any block
    let empty = Vec::new();
    let globals = headers(&project.blocks)?;
    let scope = Scope { local: &empty, global: &globals };
    stage.blocks = bodies(&project.blocks, globals.clone(), &scope)?;

    for (name, value) in &project.variables {
        stage.globals.add_var(name.as_str(), value_of(value)?);
    }
    let stage_id = stage.id();
    let frame = stage.frame_of(stage_id);
    for (name, value) in &project.stage.variables {
        frame.add_var(name.as_str(), value_of(value)?);
    }
    for term in &project.stage.scripts {
        stage.add_script(stage_id, top_level(scope.script(term)?)?);
    }

    for sprite in &project.sprites {
        if stage.find(&sprite.name).is_some() {
            Err(ProjectError::DuplicateSprite(sprite.name.clone()))?
        }
        let id = stage.add_sprite(&sprite.name);
        let local = headers(&sprite.blocks)?;
        let scope = Scope { local: &local, global: &globals };
        let local = bodies(&sprite.blocks, local.clone(), &scope)?;
        let frame = stage.frame_of(id);
        for (name, value) in &sprite.variables {
            frame.add_var(name.as_str(), value_of(value)?);
        }
        let scope = Scope { local: &local, global: &globals };
        for term in &sprite.scripts {
            stage.add_script(id, top_level(scope.script(term)?)?);
        }
        if let Some(receiver) = stage.receiver_mut(id) {
            receiver.blocks = local;
            receiver.thread_safety = sprite.thread_safe.map(thread_safety);
        }
    }
    log::debug!("loaded project `{}` with {} sprite(s)", project.name, project.sprites.len());
    Ok(stage)
}

/* ------------------------------ Custom blocks ----------------------------- */

fn headers(decls: &[BlockDecl]) -> Result<Vec<CustomBlockDefinition>> {
    let mut defs = Vec::with_capacity(decls.len());
    for decl in decls {
        let kind = match decl.kind.as_str() {
            | "command" => BlockKind::Command,
            | "reporter" => BlockKind::Reporter,
            | "predicate" => BlockKind::Predicate,
            | other => Err(ProjectError::BadBlockType(other.to_owned()))?,
        };
        let def = CustomBlockDefinition::new(&decl.spec, kind, decl.params.clone())?;
        defs.push(def.atomic(decl.atomic));
    }
    Ok(defs)
}

fn bodies(
    decls: &[BlockDecl], defs: Vec<CustomBlockDefinition>, scope: &Scope,
) -> Result<Vec<CustomBlockDefinition>> {
    let mut done = Vec::with_capacity(defs.len());
    for (decl, def) in decls.iter().zip(defs) {
        match &decl.body {
            | Some(body) => done.push(def.with_body(scope.script(body)?)?),
            | None => done.push(def),
        }
    }
    Ok(done)
}

/* ---------------------------------- Terms --------------------------------- */

/// The custom blocks a script can call.
struct Scope<'a> {
    local: &'a [CustomBlockDefinition],
    global: &'a [CustomBlockDefinition],
}

impl Scope<'_> {
    fn find(&self, spec: &str) -> Option<&CustomBlockDefinition> {
        let local = self.local.iter().find(|def| &*def.spec == spec);
        local.or_else(|| self.global.iter().find(|def| &*def.spec == spec))
    }

    fn script(&self, term: &toml::Value) -> Result<Script> {
        let toml::Value::Array(terms) = term else {
            return Err(ProjectError::NotAScript(term.to_string()));
        };
        let mut blocks = Vec::with_capacity(terms.len());
        for term in terms {
            blocks.push(Rc::new(self.block(term)?));
        }
        Ok(Script::new(blocks))
    }

    fn block(&self, term: &toml::Value) -> Result<Block> {
        let not_a_block = || ProjectError::NotABlock(term.to_string());
        let toml::Value::Array(items) = term else { return Err(not_a_block()) };
        let Some((toml::Value::String(head), terms)) = items.split_first() else {
            return Err(not_a_block());
        };
        if head == "reportGetVar" {
            return match terms {
                | [toml::Value::String(name)] => Ok(Block::getter(name)),
                | _ => Err(not_a_block()),
            };
        }
        match head.parse::<Selector>() {
            | Ok(selector) if selector.is_ring() => {
                let BlockKind::Ring(kind) = selector.kind() else { unreachable!("a ring selector") };
                let body = match terms.first() {
                    | Some(term) => self.ring_body(kind, term)?,
                    | None => Arg::Empty,
                };
                Ok(Block::ring(kind, body, params(terms.get(1))?)?)
            }
            | Ok(selector) => Ok(Block::build(selector, self.args(&selector.shapes(), terms)?)?),
            | Err(err) => match self.find(head) {
                | Some(def) => Ok(Block::custom(def, self.args(&def.shapes(), terms)?)?),
                | None => Err(err.into()),
            },
        }
    }

    fn args(&self, shapes: &[SlotShape], terms: &[toml::Value]) -> Result<Vec<Arg>> {
        let any = SlotShape::Input { numeric: false, unevaluated: false };
        (terms.iter().enumerate())
            .map(|(i, term)| self.arg(shapes.get(i).copied().unwrap_or(any), term))
            .collect()
    }

    fn arg(&self, shape: SlotShape, term: &toml::Value) -> Result<Arg> {
        let arg = match term {
            | toml::Value::String(text) => Arg::Text(text.clone()),
            | toml::Value::Integer(n) => Arg::Number(*n as f64),
            | toml::Value::Float(n) => Arg::Number(*n),
            | toml::Value::Boolean(b) => Arg::Bool(*b),
            | toml::Value::Table(table) => return self.table(shape, table),
            | toml::Value::Array(items) => match shape {
                | SlotShape::Command(_) => Arg::Script(self.script(term)?),
                | SlotShape::Ring(RingKind::Command) if is_script(items) => {
                    Arg::Script(self.script(term)?)
                }
                | SlotShape::Variadic { item, .. } => {
                    let item = match item {
                        | ItemShape::Input => SlotShape::Input { numeric: false, unevaluated: false },
                        | ItemShape::Template => SlotShape::Template { upvar: false },
                    };
                    Arg::Items(items.iter().map(|term| self.arg(item, term)).collect::<Result<_>>()?)
                }
                | _ => Arg::block(self.block(term)?),
            },
            | toml::Value::Datetime(_) => Err(ProjectError::BadTerm(term.to_string()))?,
        };
        Ok(arg)
    }

    /// `{}`, `{ var = .. }`, `{ option = .. }` or `{ ring = .., params = .. }`
    fn table(&self, shape: SlotShape, table: &toml::Table) -> Result<Arg> {
        let bad = || ProjectError::BadTerm(toml::Value::Table(table.clone()).to_string());
        if table.is_empty() {
            return Ok(Arg::Empty);
        }
        if let Some(ring) = table.get("ring") {
            let kind = match shape {
                | SlotShape::Ring(kind) => kind,
                | _ => match ring {
                    | toml::Value::Array(items) if is_script(items) => RingKind::Command,
                    | _ => RingKind::Reporter,
                },
            };
            let body = Box::new(self.ring_body(kind, ring)?);
            let params = params(table.get("params"))?;
            return match shape {
                | SlotShape::Ring(_) => Ok(Arg::Ring { body, params }),
                | _ => Ok(Arg::block(Block::ring(kind, *body, params)?)),
            };
        }
        match (table.len(), table.get("var"), table.get("option")) {
            | (1, Some(toml::Value::String(name)), _) => Ok(Arg::block(Block::getter(name))),
            | (1, _, Some(toml::Value::String(choice))) => Ok(Arg::Option(choice.clone())),
            | _ => Err(bad()),
        }
    }

    fn ring_body(&self, kind: RingKind, term: &toml::Value) -> Result<Arg> {
        match (kind, term) {
            | (_, toml::Value::Table(table)) if table.is_empty() => Ok(Arg::Empty),
            | (RingKind::Command, toml::Value::Array(items)) if is_script(items) => {
                Ok(Arg::Script(self.script(term)?))
            }
            | (_, toml::Value::Table(table)) => {
                self.table(SlotShape::Reporter { predicate: false, function: false }, table)
            }
            | _ => Ok(Arg::block(self.block(term)?)),
        }
    }
}

/// an array of arrays, or an empty array
fn is_script(items: &[toml::Value]) -> bool {
    items.iter().all(|item| matches!(item, toml::Value::Array(_)))
}

fn params(term: Option<&toml::Value>) -> Result<Vec<String>> {
    match term {
        | None => Ok(Vec::new()),
        | Some(toml::Value::Array(names)) => names
            .iter()
            .map(|name| match name {
                | toml::Value::String(name) => Ok(name.clone()),
                | other => Err(ProjectError::BadTerm(other.to_string())),
            })
            .collect(),
        | Some(other) => Err(ProjectError::BadTerm(other.to_string())),
    }
}

/// A variable's initial value. Arrays become lists.
pub fn value_of(term: &toml::Value) -> Result<Value> {
    let value = match term {
        | toml::Value::String(text) => Value::text(text),
        | toml::Value::Integer(n) => Value::Number(*n as f64),
        | toml::Value::Float(n) => Value::Number(*n),
        | toml::Value::Boolean(b) => Value::Bool(*b),
        | toml::Value::Array(items) => Value::list(items.iter().map(value_of).collect::<Result<_>>()?),
        | other => Err(ProjectError::BadValue(other.to_string()))?,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn load(source: &str) -> Result<Stage> {
        let project = Project::parse(source)?;
        build_stage(&project, Settings::default(), Box::new(Silent))
    }

    #[test]
    fn terms_follow_slot_shapes() {
        let stage = load(
            r#"
            name = "shapes"
            [variables]
            xs = [1, "two"]
            [[sprites]]
            name = "Cat"
            scripts = [[
                ["receiveGo"],
                ["doRepeat", 3, [["doAddToList", { var = "xs" }, { var = "xs" }]]],
                ["doReplaceInList", { option = "last" }, { var = "xs" }, ["reportJoinWords", ["a", {}]]],
                ["doRun", { ring = [["bubble", "hi"]] }, []],
            ]]
            "#,
        )
        .unwrap();
        let cat = stage.find("Cat").unwrap();
        let script = &stage.receiver(cat).unwrap().scripts[0];
        assert_eq!(script.len(), 4);
        assert_eq!(script[1].script_at(1).unwrap().len(), 1);
        assert_eq!(stage.globals.local(&"xs".into()).unwrap().to_string(), "[1, two]");
    }

    #[test]
    fn custom_blocks_resolve_by_spec() {
        let stage = load(
            r#"
            name = "custom"
            [[blocks]]
            spec = "double %n"
            type = "reporter"
            params = ["x"]
            body = [["doReport", ["reportProduct", { var = "x" }, 2]]]
            [[sprites]]
            name = "Cat"
            scripts = [[["receiveGo"], ["bubble", ["double %n", 21]]]]
            "#,
        )
        .unwrap();
        let cat = stage.find("Cat").unwrap();
        let bubble = &stage.receiver(cat).unwrap().scripts[0][1];
        let Content::Nested(call) = &bubble.inputs[0].content else { panic!("nested call") };
        assert_eq!(call.label.as_deref(), Some("double %n"));
        assert!(stage.custom_block(cat, "double %n").unwrap().body.is_some());
    }

    #[test]
    fn structural_errors_are_fatal() {
        let unknown = load("name = \"x\"\n[stage]\nscripts = [[[\"doJump\"]]]");
        assert!(matches!(unknown, Err(ProjectError::Syntax(SyntaxError::UnknownSelector(_)))));
        let arity = load("name = \"x\"\n[stage]\nscripts = [[[\"doWait\"]]]");
        assert!(matches!(arity, Err(ProjectError::Syntax(SyntaxError::Arity { .. }))));
        let twice = load("name = \"x\"\n[[sprites]]\nname = \"A\"\n[[sprites]]\nname = \"A\"");
        assert!(matches!(twice, Err(ProjectError::DuplicateSprite(_))));
        let kind = load("name = \"x\"\n[[blocks]]\nspec = \"y\"\ntype = \"hat\"");
        assert!(matches!(kind, Err(ProjectError::BadBlockType(_))));
    }
}
