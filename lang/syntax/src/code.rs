//! Code mapping: blocks rendered as text through user-supplied templates.
//! A template refers to the block's inputs as `<#1>`, `<#2>` and so on; a
//! custom block header may hold its body as `<body>`.

use crate::{block::*, custom::CustomBlockDefinition, selector::Selector, shape::*};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::HashMap, rc::Rc};

/// The templates of one stage.
#[derive(Clone, Debug, Default)]
pub struct CodeMappings {
    /// by selector id, `reify` for rings, and the shared keys `string`,
    /// `list`, `item` and `delim` (the last three also prefixed by `parms_`
    /// or `tempvars_`)
    code: HashMap<Rc<str>, Rc<str>>,
    headers: HashMap<Rc<str>, Rc<str>>,
    /// custom blocks, by spec
    custom_code: HashMap<Rc<str>, Rc<str>>,
    custom_headers: HashMap<Rc<str>, Rc<str>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListPart {
    List,
    Item,
    Delimiter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Collection,
    Variables,
    Parameters,
}

impl ListPart {
    /// anything but `list` and `item` maps the delimiter
    pub fn from_option(option: &str) -> Self {
        match option {
            | "list" => ListPart::List,
            | "item" => ListPart::Item,
            | _ => ListPart::Delimiter,
        }
    }
    fn key(self) -> &'static str {
        match self {
            | ListPart::List => "list",
            | ListPart::Item => "item",
            | ListPart::Delimiter => "delim",
        }
    }
}

impl ListKind {
    pub fn from_option(option: &str) -> Self {
        match option {
            | "parameters" => ListKind::Parameters,
            | "variables" => ListKind::Variables,
            | _ => ListKind::Collection,
        }
    }
    fn prefix(self) -> &'static str {
        match self {
            | ListKind::Collection => "",
            | ListKind::Variables => "tempvars_",
            | ListKind::Parameters => "parms_",
        }
    }
}

/// the key a block's template is filed under
fn key_of(block: &Block) -> Rc<str> {
    match (block.is_custom(), block.ring_kind()) {
        | (true, _) => block.spec().into(),
        | (false, Some(_)) => "reify".into(),
        | (false, None) => block.selector.as_str().into(),
    }
}

impl CodeMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files `code` as the template of `block`'s kind. Blank code is ignored.
    pub fn map_code(&mut self, block: &Block, code: &str) {
        if code.is_empty() {
            return;
        }
        let table = if block.is_custom() { &mut self.custom_code } else { &mut self.code };
        table.insert(key_of(block), code.into());
    }

    pub fn map_header(&mut self, block: &Block, header: &str) {
        if header.is_empty() {
            return;
        }
        let table = if block.is_custom() { &mut self.custom_headers } else { &mut self.headers };
        table.insert(key_of(block), header.into());
    }

    /// the template text inputs are wrapped in; blank resets it
    pub fn map_string(&mut self, code: &str) {
        let code = if code.is_empty() { "<#1>" } else { code };
        self.code.insert("string".into(), code.into());
    }

    pub fn map_list(&mut self, part: ListPart, kind: ListKind, code: &str) {
        self.code.insert(format!("{}{}", kind.prefix(), part.key()).into(), code.into());
    }

    /// a non-blank template
    fn get(&self, key: &str) -> Option<&str> {
        self.code.get(key).map(|code| &**code).filter(|code| !code.is_empty())
    }

    /// The text of `block`, preceded by the headers of every block kind it
    /// uses. `lookup` resolves custom block specs.
    pub fn mapped_code<'d>(
        &self, block: &Block, lookup: impl Fn(&str) -> Option<&'d CustomBlockDefinition>,
    ) -> String {
        let mut writer = Writer { table: self, lookup, headers: IndexMap::new() };
        let code = writer.block(block);
        writer.finish(code)
    }

    /// like [`CodeMappings::mapped_code`], one block per line
    pub fn mapped_script<'d>(
        &self, script: &Script, lookup: impl Fn(&str) -> Option<&'d CustomBlockDefinition>,
    ) -> String {
        let mut writer = Writer { table: self, lookup, headers: IndexMap::new() };
        let code = writer.script(script);
        writer.finish(code)
    }
}

/* --------------------------------- Writer --------------------------------- */

struct Writer<'t, F> {
    table: &'t CodeMappings,
    lookup: F,
    /// in the order their block kinds were first met; `None` for kinds
    /// without a header
    headers: IndexMap<Rc<str>, Option<String>>,
}

impl<'t, 'd, F> Writer<'t, F>
where
    F: Fn(&str) -> Option<&'d CustomBlockDefinition>,
{
    fn finish(self, code: String) -> String {
        let headers = self.headers.into_values().flatten().collect::<Vec<_>>();
        match headers.is_empty() {
            | true => code,
            | false => format!("{}\n\n{}", headers.join("\n\n"), code),
        }
    }

    fn script(&mut self, script: &Script) -> String {
        script.iter().map(|block| self.block(block)).collect::<Vec<_>>().join("\n")
    }

    fn block(&mut self, block: &Block) -> String {
        let table = self.table;
        if block.selector == Selector::ReportGetVar {
            return block.spec().to_owned();
        }
        let key = key_of(block);
        let code = match block.is_custom() {
            | true => table.custom_code.get(&key).map(|code| &**code),
            | false => table.get(&key),
        };
        if !self.headers.contains_key(&key) {
            // entered first, so a recursive definition does not expand twice
            self.headers.insert(key.clone(), None);
            let header = match block.is_custom() {
                | true => self.custom_header(&key),
                | false => table.headers.get(&key).map(ToString::to_string),
            };
            self.headers.insert(key, header);
        }
        let mut code = code.unwrap_or_default().to_owned();
        for (idx, slot) in block.inputs.iter().enumerate() {
            let part = self.slot(block, slot);
            code = substitute(&code, &format!("<#{}>", idx + 1), &part);
        }
        code
    }

    fn custom_header(&mut self, spec: &str) -> Option<String> {
        let table = self.table;
        let header = table.custom_headers.get(spec)?;
        if !header.contains("<body") {
            return Some(header.to_string());
        }
        let body = (self.lookup)(spec).and_then(|def| def.body.as_ref());
        let body = body.map(|body| self.script(body)).unwrap_or_default();
        Some(substitute(header, "<body>", &body))
    }

    fn slot(&mut self, owner: &Block, slot: &Slot) -> String {
        let table = self.table;
        match (&slot.shape, &slot.content) {
            | (SlotShape::Command(_), content) => {
                let nested = match content {
                    | Content::Script(script) => self.script(script),
                    | _ => String::new(),
                };
                substitute(table.get("reify").unwrap_or("<#1>"), "<#1>", &nested)
            }
            | (_, Content::Nested(block)) => self.block(block),
            | (_, Content::Script(script)) => self.script(script),
            | (_, Content::Items(items)) => self.items(owner, items),
            | (SlotShape::Variadic { .. }, Content::Empty) => self.items(owner, &[]),
            | (shape, Content::Literal(Literal::Text(text))) => self.text(owner, *shape, text),
            | (shape @ SlotShape::Input { .. }, Content::Empty) => self.text(owner, *shape, ""),
            | (_, Content::Literal(Literal::Number(n))) => n.to_string(),
            | (_, Content::Literal(Literal::Bool(b))) => b.to_string(),
            | (_, Content::Literal(Literal::Option(choice))) => choice.to_string(),
            | (_, Content::Name(name)) => name.to_string(),
            | (_, Content::Empty) => String::new(),
        }
    }

    /// Text goes through the `string` template, unless it reads as a number
    /// or names a variable.
    fn text(&self, owner: &Block, shape: SlotShape, text: &str) -> String {
        let raw = matches!(shape, SlotShape::Input { numeric: true, .. })
            || LEADING_NUMBER.is_match(text.trim_start())
            || matches!(owner.selector, Selector::DoSetVar | Selector::DoChangeVar);
        match raw {
            | true => text.to_owned(),
            | false => self.table.get("string").unwrap_or("<#1>").replace("<#1>", text),
        }
    }

    fn items(&mut self, owner: &Block, items: &[Slot]) -> String {
        let table = self.table;
        let prefix = match (owner.ring_kind(), owner.selector) {
            | (Some(_), _) => ListKind::Parameters.prefix(),
            | (None, Selector::DoDeclareVariables) => ListKind::Variables.prefix(),
            | _ => ListKind::Collection.prefix(),
        };
        let template = move |part: ListPart| table.get(&format!("{}{}", prefix, part.key()));
        let item = template(ListPart::Item).unwrap_or("<#1>");
        let parts = (items.iter())
            .map(|slot| item.replace("<#1>", &self.slot(owner, slot)))
            .collect::<Vec<_>>();
        let joined = parts.join(template(ListPart::Delimiter).unwrap_or(" "));
        template(ListPart::List).unwrap_or("<#1>").replace("<#1>", &joined)
    }
}

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(Infinity|\d|\.\d)").expect("leading number pattern")
});

/// Replaces `placeholder` by `part` in every line of `code`. A placeholder
/// that opens its line indents the following lines of `part` to match.
fn substitute(code: &str, placeholder: &str, part: &str) -> String {
    let part_lines = part.split('\n').collect::<Vec<_>>();
    let flat = part_lines.join("\n");
    let lines = code.split('\n').map(|line| {
        let trimmed = line.trim_start();
        let prefix = match trimmed.starts_with(placeholder) {
            | true => &line[..line.len() - trimmed.len()],
            | false => "",
        };
        let first = line.replacen(placeholder, &part_lines.join(&format!("\n{}", prefix)), 1);
        first.replace(placeholder, &flat)
    });
    lines.collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Arg;
    use pretty_assertions::assert_eq;

    fn sum(a: Arg, b: Arg) -> Block {
        Block::build(Selector::ReportSum, vec![a, b]).unwrap()
    }

    fn no_blocks(_: &str) -> Option<&'static CustomBlockDefinition> {
        None
    }

    #[test]
    fn placeholders_keep_their_indentation() {
        assert_eq!(substitute("if x {\n    <#1>\n}", "<#1>", "a\nb"), "if x {\n    a\n    b\n}");
        assert_eq!(substitute("f(<#1>, <#1>)", "<#1>", "y"), "f(y, y)");
    }

    #[test]
    fn inputs_fill_the_template() {
        let mut table = CodeMappings::new();
        let block = sum(Arg::block(Block::getter("x")), Arg::Number(3.0));
        assert_eq!(table.mapped_code(&block, no_blocks), "");
        table.map_code(&block, "(<#1> + <#2>)");
        assert_eq!(table.mapped_code(&block, no_blocks), "(x + 3)");
    }

    #[test]
    fn text_goes_through_the_string_template() {
        let mut table = CodeMappings::new();
        let say = Block::build(Selector::Bubble, vec![Arg::text("hi")]).unwrap();
        let set = Block::build(Selector::DoSetVar, vec![Arg::text("a"), Arg::text("hi")]).unwrap();
        table.map_code(&say, "say(<#1>)");
        table.map_code(&set, "<#1> = <#2>");
        table.map_string("'<#1>'");
        assert_eq!(table.mapped_code(&say, no_blocks), "say('hi')");
        assert_eq!(table.mapped_code(&set, no_blocks), "a = hi");
        let say = Block::build(Selector::Bubble, vec![Arg::text("12 apples")]).unwrap();
        assert_eq!(table.mapped_code(&say, no_blocks), "say(12 apples)");
    }

    #[test]
    fn variadic_items_use_the_list_templates() {
        let mut table = CodeMappings::new();
        let log = Block::build(Selector::Log, vec![Arg::Items(vec![Arg::Number(1.0), Arg::Number(2.0)])])
            .unwrap();
        table.map_code(&log, "print(<#1>)");
        assert_eq!(table.mapped_code(&log, no_blocks), "print(1 2)");
        table.map_list(ListPart::Delimiter, ListKind::Collection, ", ");
        table.map_list(ListPart::Item, ListKind::Collection, "[<#1>]");
        assert_eq!(table.mapped_code(&log, no_blocks), "print([1], [2])");
    }

    #[test]
    fn headers_lead_the_code_once() {
        let mut table = CodeMappings::new();
        let inner = sum(Arg::Number(1.0), Arg::Number(2.0));
        let outer = sum(Arg::block(inner), Arg::Number(3.0));
        table.map_code(&outer, "<#1> + <#2>");
        table.map_header(&outer, "use add;");
        assert_eq!(table.mapped_code(&outer, no_blocks), "use add;\n\n1 + 2 + 3");
    }

    #[test]
    fn custom_headers_expand_their_body() {
        let def = CustomBlockDefinition::new("double %n", BlockKind::Reporter, vec!["x".into()])
            .unwrap();
        let body = Block::build(Selector::DoReport, vec![Arg::block(sum(
            Arg::block(Block::getter("x")),
            Arg::block(Block::getter("x")),
        ))])
        .unwrap();
        let def = def.with_body(Script::new(vec![Rc::new(body)])).unwrap();
        let mut table = CodeMappings::new();
        let call = Block::custom(&def, vec![Arg::Number(5.0)]).unwrap();
        table.map_code(&call, "double(<#1>)");
        table.map_header(&call, "fn double(x) {\n    <body>\n}");
        table.map_code(&def.body.as_ref().unwrap()[0], "return <#1>");
        table.map_code(&sum(Arg::Empty, Arg::Empty), "(<#1> + <#2>)");
        let lookup = |spec: &str| (spec == "double %n").then_some(&def);
        assert_eq!(
            table.mapped_code(&call, lookup),
            "fn double(x) {\n    return (x + x)\n}\n\ndouble(5)"
        );
    }

    #[test]
    fn c_slots_nest_their_scripts() {
        let mut table = CodeMappings::new();
        let change = Block::build(Selector::DoChangeVar, vec![Arg::text("n"), Arg::Number(1.0)]).unwrap();
        let repeat =
            Block::build(Selector::DoRepeat, vec![Arg::Number(2.0), Arg::Script(Script::new(vec![
                Rc::new(change.clone()),
                Rc::new(change.clone()),
            ]))])
            .unwrap();
        table.map_code(&change, "<#1> += <#2>");
        table.map_code(&repeat, "repeat <#1> {\n  <#2>\n}");
        assert_eq!(table.mapped_code(&repeat, no_blocks), "repeat 2 {\n  n += 1\n  n += 1\n}");
    }
}
