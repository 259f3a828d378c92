//! Lazy pull-based sequences.
//!
//! A [`Sequence`] is pulled with `has_next` / `next_item` and released with
//! `close`. `has_next` may read ahead, but whatever it reads is handed out by
//! the following `next_item`. Combinators in this module compose sequences
//! without materialising them: [`Concat`] chains sub-sequences (with optional
//! filtering), [`Mapped`] transforms 1:1, and the window-extension searches
//! widen a time window until enough elements are found.

pub mod concat;
pub mod extend;
pub mod map;

pub use concat::Concat;
pub use extend::{BackwardExtension, ForwardExtension, WindowFetch};
pub use map::{CloseHook, Mapped};

use crate::error::DataError;
use std::collections::VecDeque;

pub trait Sequence {
    type Item;

    /// Whether another element is available. Never loses an element.
    fn has_next(&mut self) -> Result<bool, DataError>;

    /// Next element; `SequenceExhausted` when there is none.
    fn next_item(&mut self) -> Result<Self::Item, DataError>;

    /// Release underlying resources. Idempotent.
    fn close(&mut self) -> Result<(), DataError> {
        Ok(())
    }
}

pub type BoxSequence<T> = Box<dyn Sequence<Item = T> + Send>;

impl<S: Sequence + ?Sized> Sequence for Box<S> {
    type Item = S::Item;

    fn has_next(&mut self) -> Result<bool, DataError> {
        (**self).has_next()
    }

    fn next_item(&mut self) -> Result<Self::Item, DataError> {
        (**self).next_item()
    }

    fn close(&mut self) -> Result<(), DataError> {
        (**self).close()
    }
}

/// Convenience adapters for any sequence.
pub trait SequenceExt: Sequence + Sized {
    fn boxed(self) -> BoxSequence<Self::Item>
    where
        Self: Send + 'static,
    {
        Box::new(self)
    }

    /// Std iterator view. Yields the first error and then stops.
    fn results(self) -> Results<Self> {
        Results {
            inner: self,
            failed: false,
        }
    }

    /// Drain into a `Vec` and close.
    fn collect_vec(mut self) -> Result<Vec<Self::Item>, DataError> {
        let mut out = Vec::new();
        let drained = (|| {
            while self.has_next()? {
                out.push(self.next_item()?);
            }
            Ok(())
        })();
        let closed = self.close();
        drained.and(closed)?;
        Ok(out)
    }
}

impl<S: Sequence> SequenceExt for S {}

pub struct Results<S> {
    inner: S,
    failed: bool,
}

impl<S: Sequence> Iterator for Results<S> {
    type Item = Result<S::Item, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.inner.has_next() {
            Ok(true) => {
                let item = self.inner.next_item();
                self.failed = item.is_err();
                Some(item)
            }
            Ok(false) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// In-memory sequence.
#[derive(Debug, Clone)]
pub struct VecSequence<T> {
    items: VecDeque<T>,
}

impl<T> VecSequence<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn empty() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T> Sequence for VecSequence<T> {
    type Item = T;

    fn has_next(&mut self) -> Result<bool, DataError> {
        Ok(!self.items.is_empty())
    }

    fn next_item(&mut self) -> Result<T, DataError> {
        self.items.pop_front().ok_or(DataError::SequenceExhausted)
    }

    fn close(&mut self) -> Result<(), DataError> {
        self.items.clear();
        Ok(())
    }
}
