use enum_map::Enum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoStaticStr};

/// Node type of a [`QueryExpr`](super::QueryExpr).
///
/// Used as a type tag wherever behavior is dispatched per expression kind (for instance
/// capability tables indexed with `enum_map`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Enum, EnumIter, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExprKind {
    Field,
    Literal,
    Combined,
    Negate,
    Func,
}

impl ExprKind {
    /// Whether nodes of this kind may hold children.
    pub fn is_composite(self) -> bool {
        matches!(self, ExprKind::Combined | ExprKind::Negate | ExprKind::Func)
    }
}

impl std::fmt::Display for ExprKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name: &'static str = (*self).into();
        f.write_str(name)
    }
}
