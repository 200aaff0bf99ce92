//! Iterative walkers over [`QueryExpr`] trees, plus the two traversals the rest of the
//! workspace is built on: collecting field references and substituting them.
//!
//! Traversal strategy
//! - Explicit stack (no recursion), so walking deep expression chains cannot overflow.
//! - You are in control: only children for which you call
//!   [`WalkerNodeHandle::schedule_visit`] (or [`WalkerHandle::schedule_children`]) are
//!   traversed. This makes partial traversals and pruning easy.
//!
//! Example: count nodes
//! ```
//! use hyexpr::expr::*;
//! use hyexpr::walker::walk_no_input;
//!
//! let expr = (F("a") + 1) * F("b");
//! let mut count = 0usize;
//! walk_no_input(&expr, |node| {
//!     node.schedule_children(());
//!     count += 1;
//! });
//! assert_eq!(count, 5);
//! ```
mod internal;

use std::{cell::RefCell, ops::Deref};

use crate::expr::QueryExpr;
use internal::{InternalWalkerNodeHandle, WalkerStackType};

/// Handle on a child of the node being visited.
pub struct WalkerNodeHandle<'s, 'e, I> {
    internal: InternalWalkerNodeHandle<'s, 'e, I>,
}

impl<'s, 'e, I> WalkerNodeHandle<'s, 'e, I> {
    /// Schedule this child to be visited immediately (LIFO), i.e., depth-first.
    #[inline]
    pub fn schedule_immediate(&self, input: I) {
        self.internal.schedule_immediate(input);
    }

    /// Schedule this child to be visited later (FIFO), i.e., breadth-first.
    #[inline]
    pub fn schedule_deferred(&self, input: I) {
        self.internal.schedule_deferred(input);
    }

    /// Shorthand for [`schedule_immediate`](Self::schedule_immediate).
    #[inline]
    pub fn schedule_visit(&self, input: I) {
        self.schedule_immediate(input)
    }

    /// Stop the traversal: every pending visit is dropped. Nodes scheduled after this
    /// call are still visited.
    #[inline]
    pub fn break_(&self) {
        self.internal.break_();
    }
}

impl<'s, 'e, I> Deref for WalkerNodeHandle<'s, 'e, I> {
    type Target = QueryExpr;

    fn deref(&self) -> &Self::Target {
        self.internal.child
    }
}

/// Handle on the node being visited.
///
/// Derefs to the underlying [`QueryExpr`], so it can be matched on directly.
pub struct WalkerHandle<'s, 'e, I> {
    stack: &'s RefCell<WalkerStackType<'e, I>>,
    node: &'e QueryExpr,
    depth: usize,
}

impl<'s, 'e, I> WalkerHandle<'s, 'e, I> {
    /// The visited node, with the lifetime of the walked tree.
    #[inline]
    pub fn node(&self) -> &'e QueryExpr {
        self.node
    }

    /// Distance from the root (the root has depth 0).
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Handles on the direct children, left to right.
    pub fn children(&self) -> impl Iterator<Item = WalkerNodeHandle<'s, 'e, I>> + use<'s, 'e, I> {
        let stack = self.stack;
        let child_depth = self.depth + 1;
        self.node.children().map(move |child| WalkerNodeHandle {
            internal: InternalWalkerNodeHandle {
                stack,
                child,
                child_depth,
            },
        })
    }

    /// Schedule every child for a depth-first visit so that they are visited left to
    /// right, each with a clone of `input`.
    pub fn schedule_children(&self, input: I)
    where
        I: Clone,
    {
        let children: Vec<_> = self.children().collect();
        for child in children.into_iter().rev() {
            child.schedule_immediate(input.clone());
        }
    }

    /// Stop the traversal after this node.
    pub fn break_(&self) {
        self.stack.borrow_mut().clear();
    }
}

impl<'s, 'e, I> Deref for WalkerHandle<'s, 'e, I> {
    type Target = QueryExpr;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.node
    }
}

/// Walk an expression in a DFS, user-scheduled manner.
///
/// The visitor receives the input threaded to the current node and a [`WalkerHandle`].
/// Scheduling children with [`WalkerHandle::schedule_children`] yields a stable
/// left-to-right pre-order.
pub fn walk<'e, F, I>(expr: &'e QueryExpr, input: I, mut walker: F)
where
    F: FnMut(I, WalkerHandle<'_, 'e, I>),
{
    let stack = RefCell::new(WalkerStackType::<'e, I>::new());
    stack.borrow_mut().push_front((expr, 0, input));

    loop {
        // Pop with a short-lived mutable borrow so the visitor can schedule freely.
        let next = {
            let mut s = stack.borrow_mut();
            s.pop_front()
        };
        let Some((node, depth, input)) = next else {
            break;
        };

        walker(
            input,
            WalkerHandle {
                stack: &stack,
                node,
                depth,
            },
        );
    }
}

/// Convenience when no input/state needs to be threaded.
#[inline]
pub fn walk_no_input<'e, F>(expr: &'e QueryExpr, mut walker: F)
where
    F: FnMut(WalkerHandle<'_, 'e, ()>),
{
    walk(expr, (), |(), node| walker(node));
}

/// Names referenced through [`QueryExpr::Field`] nodes, in pre-order (left to right),
/// each name reported once.
///
/// ```
/// use hyexpr::{expr::*, walker::field_references};
///
/// let e = F("a") + F("b") * F("a");
/// assert_eq!(field_references(&e), ["a", "b"]);
/// ```
pub fn field_references(expr: &QueryExpr) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    walk_no_input(expr, |node| {
        if let Some(name) = node.node().as_field() {
            if !names.contains(&name) {
                names.push(name);
            }
        } else {
            node.schedule_children(());
        }
    });
    names
}

/// Whether `expr` references the field `name` anywhere.
pub fn references_field(expr: &QueryExpr, name: &str) -> bool {
    let mut found = false;
    walk_no_input(expr, |node| {
        if node.as_field() == Some(name) {
            found = true;
            node.break_();
        } else {
            node.schedule_children(());
        }
    });
    found
}

/// Rebuild `expr`, replacing every field reference for which `replace` returns
/// `Some`. Replacements are inserted as-is and not walked again.
///
/// ```
/// use hyexpr::{expr::*, walker::substitute_fields};
///
/// let e = F("alias") + 30;
/// let inlined = substitute_fields(&e, &mut |name| (name == "alias").then(|| F("int_field")));
/// assert_eq!(inlined, F("int_field") + 30);
/// ```
pub fn substitute_fields(
    expr: &QueryExpr,
    replace: &mut dyn FnMut(&str) -> Option<QueryExpr>,
) -> QueryExpr {
    // Post-order rebuild with an explicit stack: (node, children_done).
    let mut pending: Vec<(&QueryExpr, bool)> = vec![(expr, false)];
    let mut built: Vec<QueryExpr> = Vec::new();

    while let Some((node, children_done)) = pending.pop() {
        if !children_done {
            if let QueryExpr::Field(name) = node {
                built.push(replace(name).unwrap_or_else(|| node.clone()));
                continue;
            }
            pending.push((node, true));
            let children: Vec<_> = node.children().collect();
            for child in children.into_iter().rev() {
                pending.push((child, false));
            }
            continue;
        }

        let arity = node.children().count();
        let mut args = built.split_off(built.len() - arity).into_iter();
        let rebuilt = match node {
            QueryExpr::Combined { op, .. } => match (args.next(), args.next()) {
                (Some(lhs), Some(rhs)) => QueryExpr::Combined {
                    op: *op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                _ => unreachable!("combined nodes always have two children"),
            },
            QueryExpr::Negate(_) => match args.next() {
                Some(inner) => QueryExpr::Negate(Box::new(inner)),
                None => unreachable!("negation always has one child"),
            },
            QueryExpr::Func { name, .. } => QueryExpr::Func {
                name: name.clone(),
                args: args.collect(),
            },
            QueryExpr::Field(_) | QueryExpr::Literal(_) => node.clone(),
        };
        built.push(rebuilt);
    }

    debug_assert_eq!(built.len(), 1);
    built.pop().unwrap_or_else(|| expr.clone())
}
