//! Relational primitives. Only same-kind Number/String/Bool pairs compare;
//! every other pairing is neither equal nor less.

use crate::runtime::object::{Object, ObjectHolder};

pub fn equal(lhs: &ObjectHolder, rhs: &ObjectHolder) -> bool {
    match (lhs.get().as_deref(), rhs.get().as_deref()) {
        (Some(Object::Number(a)), Some(Object::Number(b))) => a == b,
        (Some(Object::String(a)), Some(Object::String(b))) => a == b,
        (Some(Object::Bool(a)),   Some(Object::Bool(b)))   => a == b,
        _ => false,
    }
}

pub fn less(lhs: &ObjectHolder, rhs: &ObjectHolder) -> bool {
    match (lhs.get().as_deref(), rhs.get().as_deref()) {
        (Some(Object::Number(a)), Some(Object::Number(b))) => a < b,
        (Some(Object::String(a)), Some(Object::String(b))) => a < b,
        (Some(Object::Bool(a)),   Some(Object::Bool(b)))   => a < b,
        _ => false,
    }
}

/// The six source-level operators, each derived from `equal` and `less`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
}

impl Comparator {
    pub fn apply(self, lhs: &ObjectHolder, rhs: &ObjectHolder) -> bool {
        match self {
            Self::Equal          => equal(lhs, rhs),
            Self::NotEqual       => !equal(lhs, rhs),
            Self::Less           => less(lhs, rhs),
            Self::Greater        => less(rhs, lhs),
            Self::LessOrEqual    => !less(rhs, lhs),
            Self::GreaterOrEqual => !less(lhs, rhs),
        }
    }
}
