use crate::Error;
use std::any::{type_name, Any};
use std::fmt::{self, Debug, Formatter};

/// A type-erased payload for pipelines whose stages change type in ways
/// that are awkward to spell out.
///
/// # Examples
///
/// ```
/// use promise_flow::{launch, Error, Value};
///
/// let future = launch(|| Ok::<_, Error>(Value::new(84_i32)))
///     .then(|v| Ok(Value::new(v.downcast::<i32>()?.to_string())))
///     .then(|v| v.downcast::<String>());
/// assert_eq!(future.wait(), Ok("84".to_string()));
/// ```
pub struct Value {
    inner: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Value {
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            inner: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// Unwrap the payload, or fail with [`Error::TypeMismatch`].
    pub fn downcast<T: Any>(self) -> Result<T, Error> {
        match self.inner.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(Error::TypeMismatch {
                expected: type_name::<T>(),
            }),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.type_name)
    }
}
