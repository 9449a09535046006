use thiserror::Error;

/// Errors surfaced while decoding RCFiles.
///
/// `Io` covers short reads and storage failures, `Format` covers
/// malformed on-disk bytes, `Codec` covers unknown codec names and
/// decompression failures. `Context` wraps an inner error with the
/// enclosing operation so the final report lists the fault site first
/// and each enclosing layer after it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Format(String),
    #[error("{0}")]
    Codec(String),
    #[error("{source}, {context}")]
    Context {
        context: String,
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The message stack, oldest (innermost fault site) first.
    pub fn messages(&self) -> Vec<String> {
        match self {
            Error::Context { context, source } => {
                let mut msgs = source.messages();
                msgs.push(context.clone());
                msgs
            }
            other => vec![other.to_string()],
        }
    }

    /// The root error, with any context layers peeled off.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().context(f()))
    }
}

macro_rules! format_err {
    ($fmt:expr) => (crate::errors::Error::Format($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (crate::errors::Error::Format(format!($fmt, $($args),*)));
}

macro_rules! codec_err {
    ($fmt:expr) => (crate::errors::Error::Codec($fmt.to_owned()));
    ($fmt:expr, $($args:expr),*) => (crate::errors::Error::Codec(format!($fmt, $($args),*)));
}
