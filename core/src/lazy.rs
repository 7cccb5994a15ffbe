//! Deferred, cached single-value computation for domain objects.

use std::cell::{OnceCell, RefCell};
use std::convert::Infallible;
use std::fmt;

type Factory<T, E> = Box<dyn FnMut() -> Result<T, E> + Send>;

/// A value computed on first access and cached afterwards.
///
/// Only a successful factory call is cached. When the factory fails, the
/// error is returned and the factory is kept, so the next access tries
/// again. After the first success the factory is dropped.
///
/// `LazyValue` is `Send` but not `Sync`: the owning object can move between
/// threads, and it is resolved from whichever thread holds it.
///
/// # Examples
///
/// ```
/// use record_codec_core::LazyValue;
///
/// let mut attempts = 0;
/// let lazy = LazyValue::new(move || {
///     attempts += 1;
///     if attempts == 1 { Err("not yet") } else { Ok(attempts) }
/// });
///
/// assert_eq!(lazy.get(), Err("not yet"));
/// assert_eq!(lazy.get(), Ok(&2));
/// assert_eq!(lazy.get(), Ok(&2));
/// ```
pub struct LazyValue<T, E = Infallible> {
    value: OnceCell<T>,
    factory: RefCell<Option<Factory<T, E>>>,
}

impl<T, E> LazyValue<T, E> {
    /// Defers `factory` until the first access.
    pub fn new(factory: impl FnMut() -> Result<T, E> + Send + 'static) -> Self {
        Self {
            value: OnceCell::new(),
            factory: RefCell::new(Some(Box::new(factory))),
        }
    }

    /// An already resolved value; no factory is ever run.
    pub fn resolved(value: T) -> Self {
        Self {
            value: OnceCell::from(value),
            factory: RefCell::new(None),
        }
    }

    /// Returns the cached value, running the factory if nothing is cached.
    ///
    /// # Panics
    ///
    /// Panics if the factory reads the same `LazyValue` while it is running.
    pub fn get(&self) -> Result<&T, E> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }
        let mut slot = self.factory.borrow_mut();
        let factory = match slot.as_mut() {
            Some(factory) => factory,
            None => unreachable!("unresolved LazyValue without a factory"),
        };
        let value = factory()?;
        *slot = None;
        Ok(self.value.get_or_init(|| value))
    }

    /// Stores `value` directly, bypassing and dropping the factory.
    pub fn set(&mut self, value: T) {
        self.value = OnceCell::from(value);
        *self.factory.get_mut() = None;
    }

    /// Returns `true` once a value is cached.
    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    /// Cached value without running the factory.
    pub fn peek(&self) -> Option<&T> {
        self.value.get()
    }
}

impl<T> LazyValue<T, Infallible> {
    /// Defers an infallible computation.
    pub fn from_fn(mut factory: impl FnMut() -> T + Send + 'static) -> Self {
        Self::new(move || Ok(factory()))
    }

    /// Returns the value, computing it on first access.
    pub fn force(&self) -> &T {
        match self.get() {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for LazyValue<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.get() {
            Some(value) => f.debug_tuple("LazyValue").field(value).finish(),
            None => f.write_str("LazyValue(<pending>)"),
        }
    }
}
