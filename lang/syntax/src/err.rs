use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("unknown selector `{0}`")]
    UnknownSelector(String),
    #[error("unknown custom block `{0}`")]
    UnknownCustomBlock(String),
    #[error("`{block}` takes {expected} input(s), but {found} were given")]
    Arity { block: String, expected: usize, found: usize },
    #[error("slot {index} of `{block}` is {shape} and cannot hold {found}")]
    BadSlot { block: String, index: usize, shape: &'static str, found: &'static str },
    #[error("`{0}` is a command and cannot fill a slot")]
    NotAReporter(String),
    #[error("`{0}` is a reporter and cannot appear in a script")]
    NotACommand(String),
    #[error("hat block `{0}` can only start a script")]
    MisplacedHat(String),
    #[error("empty script")]
    EmptyScript,
    #[error("custom block `{spec}` has {slots} slot(s) but names {names} parameter(s)")]
    ParamMismatch { spec: String, slots: usize, names: usize },
    #[error("custom block `{0}` must be a command, reporter or predicate")]
    BadCustomKind(String),
}

pub type Result<T> = std::result::Result<T, SyntaxError>;
