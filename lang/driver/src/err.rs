use blox_syntax::prelude::SyntaxError;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that keeps a project file from becoming a stage.
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Project file not found: `{}`", .0.display())]
    ProjectFileNotFound(PathBuf),
    #[error("Project file at `{}` invalid: {}", .0.display(), .1)]
    ProjectFileInvalid(PathBuf, std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{0}")]
    Syntax(#[from] SyntaxError),
    #[error("a block must be an array starting with its selector, found `{0}`")]
    NotABlock(String),
    #[error("a script must be an array of blocks, found `{0}`")]
    NotAScript(String),
    #[error("cannot read `{0}` as a term")]
    BadTerm(String),
    #[error("cannot read `{0}` as a value")]
    BadValue(String),
    #[error("unknown block type `{0}`; expected command, reporter or predicate")]
    BadBlockType(String),
    #[error("more than one sprite is named `{0}`")]
    DuplicateSprite(String),
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("{0}")]
    ProjectError(#[from] ProjectError),
    #[error("{0} process(es) failed")]
    ProcessesFailed(usize),
    #[error("Test failed:\n{0}")]
    TestFailed(String),
}

pub type Result<T> = std::result::Result<T, BuildError>;
