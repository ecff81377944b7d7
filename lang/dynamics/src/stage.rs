//! The stage and its sprites: every receiver of scripts, with their
//! variables and custom blocks.

use crate::{effects::Effects, frame::FrameRef, settings::*, value::Value};
use blox_syntax::prelude::*;
use blox_utils::prelude::*;
use std::{rc::Rc, time::Instant};

new_key_type! {
    pub struct ReceiverId;
}

/// A top-level script, by its owner and position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScriptId {
    pub receiver: ReceiverId,
    pub index: usize,
}

/// What a hat block can wait for.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    GreenFlag,
    Message(Rc<str>),
    CloneInit,
    Click,
    Key(Rc<str>),
}

#[derive(Debug)]
pub struct Receiver {
    pub name: Rc<str>,
    pub frame: FrameRef,
    pub scripts: Vec<Script>,
    /// sprite-local custom blocks
    pub blocks: Vec<CustomBlockDefinition>,
    /// the name of the sprite this clone was made from
    pub clone_of: Option<Rc<str>>,
    pub warp_depth: usize,
    pub thread_safety: Option<ThreadSafety>,
}

impl Receiver {
    pub fn new(name: &str, globals: &FrameRef) -> Self {
        Receiver {
            name: name.into(),
            frame: FrameRef::new(Some(globals.clone())),
            scripts: Vec::new(),
            blocks: Vec::new(),
            clone_of: None,
            warp_depth: 0,
            thread_safety: None,
        }
    }

    pub fn is_clone(&self) -> bool {
        self.clone_of.is_some()
    }

    fn matches(&self, script: &Script, event: &Event) -> bool {
        let Some(hat) = script.hat() else { return false };
        match (hat.selector, event) {
            | (Selector::ReceiveGo, Event::GreenFlag) => true,
            | (Selector::ReceiveOnClone, Event::CloneInit) => true,
            | (Selector::ReceiveClick, Event::Click) => true,
            | (Selector::ReceiveMessage, Event::Message(message)) => match hat.literal_at(0) {
                | Some(Literal::Option(choice)) => &**choice == "any message",
                | Some(Literal::Text(text)) => text == message,
                | _ => false,
            },
            | (Selector::ReceiveKey, Event::Key(key)) => match hat.literal_at(0) {
                | Some(Literal::Option(choice) | Literal::Text(choice)) => {
                    &**choice == "any key" || choice.to_lowercase() == key.to_lowercase()
                }
                | _ => false,
            },
            | _ => false,
        }
    }
}

pub struct Stage {
    receivers: ArenaSparse<ReceiverId, Receiver>,
    id: ReceiverId,
    pub globals: FrameRef,
    /// global custom blocks
    pub blocks: Vec<CustomBlockDefinition>,
    pub settings: Settings,
    /// code-mapping templates
    pub code: CodeMappings,
    timer_start: Instant,
    pub last_message: Rc<str>,
    clone_count: usize,
    effects: Box<dyn Effects>,
}

impl Stage {
    pub fn new(settings: Settings, effects: Box<dyn Effects>) -> Self {
        let globals = FrameRef::new(None);
        let mut receivers = ArenaSparse::default();
        let id = receivers.alloc(Receiver::new("Stage", &globals));
        Stage {
            receivers,
            id,
            globals,
            blocks: Vec::new(),
            settings,
            code: CodeMappings::new(),
            timer_start: Instant::now(),
            last_message: "".into(),
            clone_count: 0,
            effects,
        }
    }

    /// the stage's own receiver
    pub fn id(&self) -> ReceiverId {
        self.id
    }

    pub fn add_sprite(&mut self, name: &str) -> ReceiverId {
        self.receivers.alloc(Receiver::new(name, &self.globals))
    }

    pub fn receiver(&self, id: ReceiverId) -> Option<&Receiver> {
        self.receivers.get(&id)
    }

    pub fn receiver_mut(&mut self, id: ReceiverId) -> Option<&mut Receiver> {
        self.receivers.get_mut(&id)
    }

    pub fn receivers(&self) -> impl Iterator<Item = (ReceiverId, &Receiver)> + '_ {
        self.receivers.iter()
    }

    /// the stage or an original sprite, by name
    pub fn find(&self, name: &str) -> Option<ReceiverId> {
        self.receivers.iter().find(|(_, r)| !r.is_clone() && &*r.name == name).map(|(id, _)| id)
    }

    /// empty for receivers that no longer exist
    pub fn name_of(&self, id: ReceiverId) -> Rc<str> {
        self.receiver(id).map_or_else(|| "".into(), |r| r.name.clone())
    }

    pub fn frame_of(&self, id: ReceiverId) -> FrameRef {
        self.receiver(id).map_or_else(|| self.globals.clone(), |r| r.frame.clone())
    }

    pub fn add_script(&mut self, id: ReceiverId, script: Script) -> Option<ScriptId> {
        let receiver = self.receivers.get_mut(&id)?;
        receiver.scripts.push(script);
        Some(ScriptId { receiver: id, index: receiver.scripts.len() - 1 })
    }

    pub fn script(&self, id: ScriptId) -> Option<&Script> {
        self.receiver(id.receiver)?.scripts.get(id.index)
    }

    pub fn scripts_of(&self, id: ReceiverId) -> Vec<ScriptId> {
        let count = self.receiver(id).map_or(0, |r| r.scripts.len());
        (0..count).map(|index| ScriptId { receiver: id, index }).collect()
    }

    /// Scripts whose hat matches `event`: sprites first, in order, then the
    /// stage.
    pub fn hats_for(&self, event: &Event) -> Vec<ScriptId> {
        let sprites = self.receivers.keys().filter(|id| *id != self.id);
        sprites.chain([self.id]).flat_map(|id| self.hats_of(id, event)).collect()
    }

    pub fn hats_of(&self, id: ReceiverId, event: &Event) -> Vec<ScriptId> {
        let Some(receiver) = self.receiver(id) else { return Vec::new() };
        (receiver.scripts.iter().enumerate())
            .filter(|(_, script)| receiver.matches(script, event))
            .map(|(index, _)| ScriptId { receiver: id, index })
            .collect()
    }

    /// A custom block as seen from `receiver`; local definitions shadow
    /// global ones.
    pub fn custom_block(&self, receiver: ReceiverId, spec: &str) -> Option<&CustomBlockDefinition> {
        let local = self.receiver(receiver).and_then(|r| r.blocks.iter().find(|def| &*def.spec == spec));
        local.or_else(|| self.blocks.iter().find(|def| &*def.spec == spec))
    }

    pub fn thread_safety(&self, receiver: ReceiverId) -> ThreadSafety {
        (self.receiver(receiver).and_then(|r| r.thread_safety))
            .unwrap_or(self.settings.thread_safety)
    }

    /// elapsed seconds, truncated to tenths
    pub fn timer(&self) -> f64 {
        let ms = self.timer_start.elapsed().as_millis() as f64;
        (ms / 100.0).floor() / 10.0
    }

    pub fn reset_timer(&mut self) {
        self.timer_start = Instant::now();
    }

    /* --------------------------------- Clones --------------------------------- */

    pub fn clone_count(&self) -> usize {
        self.clone_count
    }

    pub fn clones(&self) -> Vec<ReceiverId> {
        self.receivers.iter().filter(|(_, r)| r.is_clone()).map(|(id, _)| id).collect()
    }

    /// Copies a sprite's scripts, blocks and variable values into a new
    /// receiver. The stage cannot be cloned, and nothing happens past the
    /// clone limit.
    pub fn make_clone(&mut self, origin: ReceiverId) -> Option<ReceiverId> {
        if origin == self.id || self.clone_count >= self.settings.clone_limit {
            return None;
        }
        let original = self.receiver(origin)?;
        let clone = Receiver {
            name: original.name.clone(),
            frame: original.frame.copy(),
            scripts: original.scripts.clone(),
            blocks: original.blocks.clone(),
            clone_of: Some(original.clone_of.clone().unwrap_or_else(|| original.name.clone())),
            warp_depth: 0,
            thread_safety: original.thread_safety,
        };
        self.clone_count += 1;
        Some(self.receivers.alloc(clone))
    }

    /// Drops a clone; originals are never destroyed.
    pub fn destroy(&mut self, id: ReceiverId) -> bool {
        if !self.receiver(id).is_some_and(Receiver::is_clone) {
            return false;
        }
        self.receivers.remove(&id);
        self.clone_count = self.clone_count.saturating_sub(1);
        true
    }

    /* --------------------------------- Effects -------------------------------- */

    pub fn effects(&mut self) -> &mut dyn Effects {
        self.effects.as_mut()
    }

    /// shows `data` above a receiver; empty data shows nothing
    pub fn bubble(&mut self, id: ReceiverId, data: &Value, thought: bool) {
        match data {
            | Value::Nothing => return,
            | Value::Text(text) if text.is_empty() => return,
            | _ => {}
        }
        let name = self.name_of(id);
        self.effects.bubble(&name, &data.to_string(), thought);
    }

    pub fn start_warp(&mut self, id: ReceiverId) {
        let Some(receiver) = self.receivers.get_mut(&id) else { return };
        receiver.warp_depth += 1;
        let name = receiver.name.clone();
        self.effects.start_warp(&name);
    }

    pub fn end_warp(&mut self, id: ReceiverId) {
        let Some(receiver) = self.receivers.get_mut(&id) else { return };
        receiver.warp_depth = receiver.warp_depth.saturating_sub(1);
        let name = receiver.name.clone();
        self.effects.end_warp(&name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Silent;
    use pretty_assertions::assert_eq;

    fn hat(selector: Selector, args: Vec<Arg>) -> Script {
        Script::new(vec![Rc::new(Block::build(selector, args).unwrap())])
    }

    #[test]
    fn messages_match_exactly_or_any() {
        let mut stage = Stage::new(Settings::default(), Box::new(Silent));
        let sprite = stage.add_sprite("Cat");
        let go = stage.add_script(sprite, hat(Selector::ReceiveMessage, vec![Arg::text("go")]));
        let any = stage.add_script(stage.id(), hat(Selector::ReceiveMessage, vec![Arg::Option(
            "any message".into(),
        )]));
        assert_eq!(stage.hats_for(&Event::Message("go".into())), vec![go.unwrap(), any.unwrap()]);
        assert_eq!(stage.hats_for(&Event::Message("Go".into())), vec![any.unwrap()]);
    }

    #[test]
    fn keys_match_without_case() {
        let mut stage = Stage::new(Settings::default(), Box::new(Silent));
        let key = stage.add_script(stage.id(), hat(Selector::ReceiveKey, vec![Arg::text("Space")]));
        assert_eq!(stage.hats_for(&Event::Key("space".into())), vec![key.unwrap()]);
    }

    #[test]
    fn clones_copy_values_and_respect_the_limit() {
        let settings = Settings { clone_limit: 1, ..Settings::default() };
        let mut stage = Stage::new(settings, Box::new(Silent));
        let cat = stage.add_sprite("Cat");
        stage.frame_of(cat).add_var("lives", Value::Number(9.0));
        let clone = stage.make_clone(cat).unwrap();
        stage.frame_of(clone).add_var("lives", Value::Number(1.0));
        assert_eq!(stage.frame_of(cat).local(&"lives".into()).unwrap().to_string(), "9");
        assert!(stage.make_clone(cat).is_none());
        assert!(stage.make_clone(stage.id()).is_none());
        assert_eq!(stage.find("Cat"), Some(cat));
        assert!(stage.destroy(clone));
        assert!(!stage.destroy(cat));
        assert_eq!(stage.clone_count(), 0);
    }

    #[test]
    fn local_blocks_shadow_global_ones() {
        let mut stage = Stage::new(Settings::default(), Box::new(Silent));
        let cat = stage.add_sprite("Cat");
        let def = |atomic| {
            CustomBlockDefinition::new("jump", BlockKind::Command, vec![]).unwrap().atomic(atomic)
        };
        stage.blocks.push(def(false));
        stage.receiver_mut(cat).unwrap().blocks.push(def(true));
        assert!(stage.custom_block(cat, "jump").unwrap().is_atomic);
        assert!(!stage.custom_block(stage.id(), "jump").unwrap().is_atomic);
    }
}
