//! Boolean expression tree for WHERE, HAVING and JOIN ... ON.

use crate::ast::{Field, LogicalOp, Operator, Part, SelectQuery, Template};
use crate::transpiler::{conditions::write_predicate, ParamContext, ToSql};
use crate::value::Value;

/// Right-hand side of a comparison.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Another column, rendered as an identifier.
    Field(Field),
    /// A literal, rendered as a placeholder.
    Value(Value),
    /// A literal list, rendered as `($1, $2, ...)`.
    Values(Vec<Value>),
    /// A subquery, rendered as `(SELECT ...)`.
    Query(SelectQuery),
}

impl From<Field> for Operand {
    fn from(field: Field) -> Self {
        Operand::Field(field)
    }
}

impl From<&Field> for Operand {
    fn from(field: &Field) -> Self {
        Operand::Field(field.clone())
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<Vec<Value>> for Operand {
    fn from(values: Vec<Value>) -> Self {
        Operand::Values(values)
    }
}

impl From<SelectQuery> for Operand {
    fn from(query: SelectQuery) -> Self {
        Operand::Query(query)
    }
}

impl From<&SelectQuery> for Operand {
    fn from(query: &SelectQuery) -> Self {
        Operand::Query(query.clone())
    }
}

/// A boolean expression.
#[derive(Debug, Clone)]
pub enum Predicate {
    Comparison {
        left: Field,
        op: Operator,
        right: Operand,
    },
    /// `field IS NULL`, or `IS NOT NULL` when negated.
    NullCheck { field: Field, negated: bool },
    /// Free-form templated expression. See [`predicatef!`](crate::predicatef).
    Raw(Template),
    /// Members joined by `AND`/`OR`. Parenthesized whenever nested in another group.
    Group {
        op: LogicalOp,
        members: Vec<Predicate>,
    },
}

impl Predicate {
    /// Raw predicate from a `?` template.
    ///
    /// # Panics
    ///
    /// Panics if the number of `?` markers differs from `parts.len()`.
    pub fn raw(format: &str, parts: Vec<Part>) -> Self {
        Predicate::Raw(Template::new(format, parts))
    }

    /// Whether this predicate renders to nothing (an empty group, possibly nested).
    pub fn is_vacuous(&self) -> bool {
        match self {
            Predicate::Group { members, .. } => members.iter().all(Predicate::is_vacuous),
            _ => false,
        }
    }
}

impl ToSql for Predicate {
    fn write_sql(&self, sql: &mut String, params: &mut ParamContext) {
        write_predicate(self, sql, params);
    }
}

impl From<&Predicate> for Predicate {
    fn from(predicate: &Predicate) -> Self {
        predicate.clone()
    }
}

/// Join `predicates` with `AND`.
pub fn and<I>(predicates: I) -> Predicate
where
    I: IntoIterator,
    I::Item: Into<Predicate>,
{
    Predicate::Group {
        op: LogicalOp::And,
        members: predicates.into_iter().map(Into::into).collect(),
    }
}

/// Join `predicates` with `OR`.
pub fn or<I>(predicates: I) -> Predicate
where
    I: IntoIterator,
    I::Item: Into<Predicate>,
{
    Predicate::Group {
        op: LogicalOp::Or,
        members: predicates.into_iter().map(Into::into).collect(),
    }
}
