use thiserror::Error;

/// Failures raised by the library itself.
///
/// Computation errors travel as the `Err` half of a `Result` and can be of
/// any type `E` that converts from this one, so these variants reach the
/// caller through the caller's own error channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The promise was dropped before it was kept or failed.
    #[error("promise dropped before it was fulfilled")]
    PromiseDropped,
    /// The launched computation panicked.
    #[error("computation panicked: {0}")]
    Panicked(String),
    /// A dynamic [`Value`](crate::Value) held some other type.
    #[error("type mismatch: expected {expected}")]
    TypeMismatch { expected: &'static str },
    /// `first_of` was given nothing to race.
    #[error("no futures to race")]
    NoInputs,
    #[error("{0}")]
    Failed(String),
}

impl Error {
    /// Build a plain failure from a message.
    ///
    /// ```
    /// use promise_flow::Error;
    /// assert_eq!(Error::msg("skip").to_string(), "skip");
    /// ```
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Failed(message.into())
    }
}
