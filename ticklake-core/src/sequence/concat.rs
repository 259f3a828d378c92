use super::{BoxSequence, Sequence};
use crate::error::DataError;

type Sources<T> = Box<dyn Iterator<Item = Result<BoxSequence<T>, DataError>> + Send>;
type Predicate<T> = Box<dyn FnMut(&T) -> bool + Send>;

/// Chains sub-sequences in order, opening each one only when it is reached.
///
/// An exhausted (or immediately empty) sub-sequence is closed before the next
/// one is opened. With a filter, only matching elements are surfaced.
pub struct Concat<T> {
    sources: Sources<T>,
    current: Option<BoxSequence<T>>,
    filter: Option<Predicate<T>>,
    peeked: Option<T>,
}

impl<T: Send + 'static> Concat<T> {
    pub fn new<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Result<BoxSequence<T>, DataError>>,
        I::IntoIter: Send + 'static,
    {
        Self {
            sources: Box::new(sources.into_iter()),
            current: None,
            filter: None,
            peeked: None,
        }
    }

    pub fn with_filter(mut self, filter: impl FnMut(&T) -> bool + Send + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    fn advance(&mut self) -> Result<bool, DataError> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        loop {
            let Some(current) = self.current.as_mut() else {
                match self.sources.next() {
                    Some(next) => {
                        self.current = Some(next?);
                        continue;
                    }
                    None => return Ok(false),
                }
            };

            if !current.has_next()? {
                if let Some(mut done) = self.current.take() {
                    done.close()?;
                }
                continue;
            }

            let item = current.next_item()?;
            let keep = self.filter.as_mut().map_or(true, |f| f(&item));
            if keep {
                self.peeked = Some(item);
                return Ok(true);
            }
        }
    }
}

impl<T: Send + 'static> Sequence for Concat<T> {
    type Item = T;

    fn has_next(&mut self) -> Result<bool, DataError> {
        self.advance()
    }

    fn next_item(&mut self) -> Result<T, DataError> {
        self.advance()?;
        self.peeked.take().ok_or(DataError::SequenceExhausted)
    }

    fn close(&mut self) -> Result<(), DataError> {
        self.peeked = None;
        self.sources = Box::new(std::iter::empty());
        match self.current.take() {
            Some(mut current) => current.close(),
            None => Ok(()),
        }
    }
}
