//! OData filter expressions
//!
//! A [`Filter`] is one binary term (`field op value`) with operator aliases
//! canonicalized to the OData spelling. Array values expand into OR/AND
//! groups; string-function operators render as `op(field,literal)`.

use crate::error::{Error, Result};

use super::value::ODataValue;

/// Canonical comparison operators, parsed from common aliases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    /// Canonicalize an operator alias. `in` maps to `eq` and `ni` to `ne`;
    /// both rely on the array expansion in [`Filter::render`].
    pub fn parse(alias: &str) -> Result<Self> {
        match alias {
            "=" | "eq" | "in" => Ok(CompareOp::Eq),
            "<>" | "!=" | "ne" | "ni" => Ok(CompareOp::Ne),
            ">" | "gt" => Ok(CompareOp::Gt),
            ">=" | "ge" => Ok(CompareOp::Ge),
            "<" | "lt" => Ok(CompareOp::Lt),
            "<=" | "=<" | "le" => Ok(CompareOp::Le),
            "contains" => Ok(CompareOp::Contains),
            "startswith" => Ok(CompareOp::StartsWith),
            "endswith" => Ok(CompareOp::EndsWith),
            other => Err(Error::Filter(format!("unknown operator '{other}'"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::Contains => "contains",
            CompareOp::StartsWith => "startswith",
            CompareOp::EndsWith => "endswith",
        }
    }

    /// String functions render as `op(field,literal)` instead of infix.
    fn is_function(&self) -> bool {
        matches!(
            self,
            CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith
        )
    }
}

/// Right-hand side of a filter term
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    One(ODataValue),
    Many(Vec<ODataValue>),
}

macro_rules! filter_value_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    FilterValue::One(value.into())
                }
            }

            impl From<Vec<$ty>> for FilterValue {
                fn from(values: Vec<$ty>) -> Self {
                    FilterValue::Many(values.into_iter().map(Into::into).collect())
                }
            }
        )+
    };
}

filter_value_from!(
    ODataValue,
    &str,
    String,
    i32,
    i64,
    f64,
    bool,
    uuid::Uuid,
    chrono::DateTime<chrono::Utc>,
    chrono::NaiveDate,
);

/// A single binary filter term
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: CompareOp,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(
        field: impl Into<String>,
        op: CompareOp,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Build a filter from an operator alias (`"="`, `"<>"`, `"in"`, ...).
    pub fn with_alias(
        field: impl Into<String>,
        alias: &str,
        value: impl Into<FilterValue>,
    ) -> Result<Self> {
        Ok(Self::new(field, CompareOp::parse(alias)?, value))
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, CompareOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, CompareOp::Ne, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, CompareOp::Contains, value)
    }

    /// Render this term as OData filter syntax.
    ///
    /// Array values expand per operator: `eq` into a parenthesized OR-group,
    /// `ne` into an AND-join, the string functions into a parenthesized
    /// OR-group of per-element calls. Other operators reject arrays.
    pub fn render(&self) -> Result<String> {
        match &self.value {
            FilterValue::One(value) => Ok(self.render_one(value)),
            FilterValue::Many(values) => {
                if values.is_empty() {
                    return Err(Error::Filter(format!(
                        "empty array not allowed for field '{}'",
                        self.field
                    )));
                }
                let parts: Vec<String> = values.iter().map(|v| self.render_one(v)).collect();
                match self.op {
                    CompareOp::Eq => Ok(Self::or_join(&parts)),
                    CompareOp::Ne => Ok(Self::and_join(&parts)),
                    op if op.is_function() => Ok(Self::or_join(&parts)),
                    op => Err(Error::Filter(format!(
                        "array not supported for operator '{}'",
                        op.as_str()
                    ))),
                }
            }
        }
    }

    fn render_one(&self, value: &ODataValue) -> String {
        if self.op.is_function() {
            format!("{}({},{})", self.op.as_str(), self.field, value.encode())
        } else {
            format!("{} {} {}", self.field, self.op.as_str(), value.encode())
        }
    }

    /// Join rendered terms with ` and `. AND-groups are never parenthesized.
    pub fn and_join(parts: &[String]) -> String {
        parts.join(" and ")
    }

    /// Join rendered terms with ` or `, wrapped in exactly one parenthesis
    /// pair regardless of the members' own nesting.
    pub fn or_join(parts: &[String]) -> String {
        format!("({})", parts.join(" or "))
    }
}
