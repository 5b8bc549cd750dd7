/// Core error type for the relay.
///
/// Only `Config` is ever surfaced to the operator. Adapter crates map their
/// transport failures into `Transport` so the dispatcher can log and drop the
/// affected event without knowing which messenger produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
