//! Internal primitives powering the public walker API.
//!
//! Kept separate so the scheduling internals stay out of the public surface. They
//! provide the minimal handles used by [`WalkerHandle`](super::WalkerHandle) and
//! [`WalkerNodeHandle`](super::WalkerNodeHandle).
use std::{cell::RefCell, collections::VecDeque};

use crate::expr::QueryExpr;

/// One scheduled visit: (node, depth, input).
pub(super) type WalkerStackType<'e, I> = VecDeque<(&'e QueryExpr, usize, I)>;

/// Handle for scheduling a child visit from within a visitor.
pub(super) struct InternalWalkerNodeHandle<'s, 'e, I> {
    pub(super) stack: &'s RefCell<WalkerStackType<'e, I>>,
    pub(super) child: &'e QueryExpr,
    pub(super) child_depth: usize,
}

impl<'s, 'e, I> InternalWalkerNodeHandle<'s, 'e, I> {
    /// Schedule the child to be visited immediately (LIFO/DFS).
    #[inline]
    pub fn schedule_immediate(&self, input: I) {
        self.stack
            .borrow_mut()
            .push_front((self.child, self.child_depth, input));
    }

    /// Schedule the child to be visited later (FIFO/BFS).
    #[inline]
    pub fn schedule_deferred(&self, input: I) {
        self.stack
            .borrow_mut()
            .push_back((self.child, self.child_depth, input));
    }

    /// Drop every pending visit. Visits scheduled after this call still happen.
    #[inline]
    pub fn break_(&self) {
        self.stack.borrow_mut().clear();
    }
}
