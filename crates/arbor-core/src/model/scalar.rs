use std::fmt;

use serde::{Deserialize, Serialize};

use super::identifier::Identifier;

/// Kinds of leaf value a schema can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Str,
    Id,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Bool => "Bool",
            ScalarKind::Int => "Int",
            ScalarKind::Float => "Float",
            ScalarKind::Str => "Str",
            ScalarKind::Id => "Identifier",
        };
        f.write_str(name)
    }
}

/// A plain value node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Id(Identifier),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Float(_) => ScalarKind::Float,
            Scalar::Str(_) => ScalarKind::Str,
            Scalar::Id(_) => ScalarKind::Id,
        }
    }

    pub fn as_id(&self) -> Option<&Identifier> {
        match self {
            Scalar::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => write!(f, "{:?}", s),
            Scalar::Id(id) => write!(f, "{}", id),
        }
    }
}
