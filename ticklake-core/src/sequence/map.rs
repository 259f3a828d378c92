use super::Sequence;
use crate::error::DataError;
use tracing::warn;

pub type CloseHook = Box<dyn FnOnce() -> Result<(), DataError> + Send>;

/// 1:1 transformation of another sequence, with an optional hook run once on close.
///
/// A failing hook is logged and suppressed; the inner sequence is closed
/// regardless. Dropping without closing still runs the hook.
pub struct Mapped<S, F> {
    inner: S,
    f: F,
    on_close: Option<CloseHook>,
}

impl<S, F> Mapped<S, F> {
    pub fn new(inner: S, f: F) -> Self {
        Self {
            inner,
            f,
            on_close: None,
        }
    }

    pub fn on_close(mut self, hook: impl FnOnce() -> Result<(), DataError> + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    fn run_hook(&mut self) {
        if let Some(hook) = self.on_close.take() {
            if let Err(e) = hook() {
                warn!(error = %e, "on-close hook failed; continuing cleanup");
            }
        }
    }
}

impl<S, F, U> Sequence for Mapped<S, F>
where
    S: Sequence,
    F: FnMut(S::Item) -> U,
{
    type Item = U;

    fn has_next(&mut self) -> Result<bool, DataError> {
        self.inner.has_next()
    }

    fn next_item(&mut self) -> Result<U, DataError> {
        let item = self.inner.next_item()?;
        Ok((self.f)(item))
    }

    fn close(&mut self) -> Result<(), DataError> {
        self.run_hook();
        self.inner.close()
    }
}

impl<S, F> Drop for Mapped<S, F> {
    fn drop(&mut self) {
        self.run_hook();
    }
}
