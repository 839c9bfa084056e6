use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown provider {0:?}, expected one of: env, pip, npm, apt, brew")]
    UnknownProvider(String),

    #[error("provider {0:?} is not registered")]
    NotRegistered(String),

    #[error(transparent)]
    Core(#[from] binprov_core::Error),
}
