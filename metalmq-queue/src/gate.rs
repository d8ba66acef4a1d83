//! Single-fire gates.
//!
//! A [`Deferred`] collects continuations until it is fired, then it runs them in the order they
//! were registered. After firing, new continuations run immediately. Queues own one for their
//! declaration and channels own one for their `Channel.OpenOk`.
//!
//! Everything runs on one thread cooperatively, so the gate is built on `Rc<RefCell<_>>` and it
//! is not `Send`.
use log::trace;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use tokio::sync::oneshot;

/// Code to be run when a gate is fulfilled.
pub type Continuation = Box<dyn FnOnce()>;

#[derive(Default)]
struct DeferredState {
    fulfilled: bool,
    pending: VecDeque<Continuation>,
}

/// Single-fire, success-only gate. Cloning gives another handle to the same gate.
#[derive(Clone, Default)]
pub struct Deferred {
    state: Rc<RefCell<DeferredState>>,
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();

        f.debug_struct("Deferred")
            .field("fulfilled", &state.fulfilled)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl Deferred {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.state.borrow().fulfilled
    }

    /// Fulfills the gate and drains the registered continuations in order. Firing twice is a
    /// no-op.
    pub fn fire(&self) {
        {
            let mut state = self.state.borrow_mut();

            if state.fulfilled {
                return;
            }

            state.fulfilled = true;

            trace!("Fire gate with {} pending continuations", state.pending.len());
        }

        // The borrow must be released before a continuation runs, it may register new
        // continuations on this very gate.
        loop {
            let next = self.state.borrow_mut().pending.pop_front();

            match next {
                Some(continuation) => continuation(),
                None => break,
            }
        }
    }

    /// Runs `continuation` now if the gate is fulfilled, otherwise queues it.
    pub fn on_fulfilled<F>(&self, continuation: F)
    where
        F: FnOnce() + 'static,
    {
        let mut state = self.state.borrow_mut();

        if state.fulfilled {
            drop(state);

            continuation();
        } else {
            state.pending.push_back(Box::new(continuation));
        }
    }

    /// Number of continuations waiting for the gate.
    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Drops the waiting continuations without running them. Receivers of [`Deferred::wait`]
    /// get an error. Continuations registered later are queued as usual.
    pub fn abandon(&self) {
        let pending = std::mem::take(&mut self.state.borrow_mut().pending);

        trace!("Abandon gate with {} pending continuations", pending.len());

        // Dropping a continuation may drop other handles of this gate.
        drop(pending);
    }

    /// Returns a receiver which completes when the gate is fired. If the gate is dropped without
    /// firing the receiver gets an error.
    pub fn wait(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();

        self.on_fulfilled(move || {
            // The receiver may have been dropped, nobody waits then.
            let _ = tx.send(());
        });

        rx
    }
}
