//! Registry of the bindings requested by a queue.
//!
//! Entries are keyed by the exchange name and keep the options of the last `bind` call on that
//! exchange. `unbind` doesn't touch the registry, so it tells which bindings were ever requested
//! rather than which are active on the server.
use crate::options::BindOpts;
use std::{iter, slice};

type Entry = (String, BindOpts);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<Entry>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the options of `exchange`. An overwritten entry keeps its position.
    pub fn record(&mut self, exchange: &str, opts: BindOpts) {
        match self.entries.iter_mut().find(|(e, _)| e == exchange) {
            Some((_, existing)) => *existing = opts,
            None => self.entries.push((exchange.to_string(), opts)),
        }
    }

    pub fn get(&self, exchange: &str) -> Option<&BindOpts> {
        self.entries.iter().find(|(e, _)| e == exchange).map(|(_, o)| o)
    }

    /// Iterates over the bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindOpts)> {
        self.into_iter()
    }

    /// Same as [`Bindings::iter`].
    pub fn all(&self) -> impl Iterator<Item = (&str, &BindOpts)> {
        self.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn borrow_entry((exchange, opts): &Entry) -> (&str, &BindOpts) {
    (exchange.as_str(), opts)
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = (&'a str, &'a BindOpts);
    type IntoIter = iter::Map<slice::Iter<'a, Entry>, fn(&'a Entry) -> (&'a str, &'a BindOpts)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter().map(borrow_entry as fn(&'a Entry) -> (&'a str, &'a BindOpts))
    }
}
