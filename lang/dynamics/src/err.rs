use blox_syntax::prelude::Selector;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("a variable of name '{0}' does not exist in this context")]
    UndeclaredVariable(String),
    #[error("expecting {expected} input(s), but getting {found}")]
    Arity { expected: usize, found: usize },
    #[error("expecting a ring but getting a {0}")]
    NotARing(&'static str),
    #[error("expecting a list but getting a {0}")]
    NotAList(&'static str),
    #[error("expecting a text instead of a {0}")]
    NotAText(&'static str),
    #[error("continuations cannot be forked")]
    ForkedContinuation,
    #[error("unknown custom block `{0}`")]
    UnknownCustomBlock(String),
    #[error("a getter without a variable name")]
    NamelessGetter,
    #[error("no primitive is registered for `{0}`")]
    NoPrimitive(Selector),
    #[error("'{0}' is not a valid option")]
    BadOption(String),
    #[error("malformed URI sequence in `{0}`")]
    MalformedUri(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;
