//! The project notation: a stage, its sprites and their scripts, written as
//! TOML.

use crate::err::ProjectError;
use sculptor::{FileIO, SerdeStr};
use serde::{Deserialize, Serialize};
use std::{io, path::PathBuf};

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Project {
    #[serde(skip)]
    pub path: PathBuf,
    pub name: String,
    /// the default for every receiver; see [`crate::conf::Conf::thread_safe`]
    #[serde(default)]
    pub thread_safe: Option<bool>,
    /// global variables
    #[serde(default)]
    pub variables: toml::Table,
    #[serde(default)]
    pub stage: StageDecl,
    #[serde(default)]
    pub sprites: Vec<SpriteDecl>,
    /// global custom blocks
    #[serde(default)]
    pub blocks: Vec<BlockDecl>,
    /// final global values checked by `test`
    #[serde(default)]
    pub expect: toml::Table,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct StageDecl {
    #[serde(default)]
    pub variables: toml::Table,
    #[serde(default)]
    pub scripts: Vec<toml::Value>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct SpriteDecl {
    pub name: String,
    #[serde(default)]
    pub variables: toml::Table,
    #[serde(default)]
    pub scripts: Vec<toml::Value>,
    /// sprite-local custom blocks
    #[serde(default)]
    pub blocks: Vec<BlockDecl>,
    #[serde(default)]
    pub thread_safe: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct BlockDecl {
    pub spec: String,
    #[serde(rename = "type", default = "BlockDecl::command")]
    pub kind: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub body: Option<toml::Value>,
    #[serde(default)]
    pub atomic: bool,
}

impl BlockDecl {
    fn command() -> String {
        "command".to_owned()
    }
}

impl SerdeStr for Project {
    fn de_from_str(s: &str) -> io::Result<Self>
    where
        Self: Sized,
    {
        toml::from_str(s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn ser_to_string(&self) -> io::Result<String> {
        toml::to_string(self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl Project {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ProjectError> {
        let path = path.into();
        Ok(Self {
            path: path.clone(),
            ..FileIO::new(path.clone()).load().map_err(|e| match e.kind() {
                | io::ErrorKind::NotFound => ProjectError::ProjectFileNotFound(path),
                | _ => ProjectError::ProjectFileInvalid(path, e),
            })?
        })
    }

    pub fn parse(source: &str) -> Result<Self, ProjectError> {
        Ok(toml::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn minimal_project() {
        let project = Project::parse("name = \"empty\"").unwrap();
        assert_eq!(project.name, "empty");
        assert!(project.sprites.is_empty());
        assert_eq!(project.thread_safe, None);
    }

    #[test]
    fn block_types_default_to_command() {
        let project = Project::parse(
            r#"
            name = "blocks"
            [[blocks]]
            spec = "jump"
            "#,
        )
        .unwrap();
        assert_eq!(project.blocks[0].kind, "command");
        assert!(!project.blocks[0].atomic);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Project::parse("name = \"x\"\ncostume = 3").is_err());
    }
}
