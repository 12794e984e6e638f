//! Column references and scalar expressions.

use crate::ast::relation::Qualifier;
use crate::ast::{NullsOrder, Operand, Operator, Predicate, SelectQuery, SortOrder, Template};
use crate::transpiler::{conditions::write_field_expr, ParamContext, ToSql};
use crate::value::Value;

#[derive(Debug, Clone)]
pub(crate) enum FieldExpr {
    /// `qualifier.name`, or bare `name` when unqualified.
    Column {
        qualifier: Option<Qualifier>,
        name: String,
    },
    /// A templated expression such as `COUNT(?)`.
    Custom(Template),
}

/// A column or scalar expression.
///
/// Fields are plain values: every modifier returns a new field and leaves the
/// original untouched. The output alias only renders in the select list and the
/// sort modifiers only inside ORDER BY.
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) expr: FieldExpr,
    pub(crate) alias: Option<String>,
    pub(crate) order: Option<SortOrder>,
    pub(crate) nulls: Option<NullsOrder>,
}

impl Field {
    fn from_expr(expr: FieldExpr) -> Self {
        Self {
            expr,
            alias: None,
            order: None,
            nulls: None,
        }
    }

    pub(crate) fn column(qualifier: Qualifier, name: impl Into<String>) -> Self {
        Self::from_expr(FieldExpr::Column {
            qualifier: Some(qualifier),
            name: name.into(),
        })
    }

    /// An unqualified column, e.g. a name produced by the select list itself.
    pub fn named(name: impl Into<String>) -> Self {
        Self::from_expr(FieldExpr::Column {
            qualifier: None,
            name: name.into(),
        })
    }

    /// A custom expression. See [`fieldf!`](crate::fieldf).
    pub fn custom(template: Template) -> Self {
        Self::from_expr(FieldExpr::Custom(template))
    }

    /// Column name, or `None` for custom expressions.
    pub fn name(&self) -> Option<&str> {
        match &self.expr {
            FieldExpr::Column { name, .. } => Some(name),
            FieldExpr::Custom(_) => None,
        }
    }

    /// Output alias, if set.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..self.clone()
        }
    }

    pub fn asc(&self) -> Self {
        Self {
            order: Some(SortOrder::Asc),
            ..self.clone()
        }
    }

    pub fn desc(&self) -> Self {
        Self {
            order: Some(SortOrder::Desc),
            ..self.clone()
        }
    }

    pub fn nulls_first(&self) -> Self {
        Self {
            nulls: Some(NullsOrder::First),
            ..self.clone()
        }
    }

    pub fn nulls_last(&self) -> Self {
        Self {
            nulls: Some(NullsOrder::Last),
            ..self.clone()
        }
    }

    // Comparisons

    /// General comparison against a field, value, value list or subquery.
    pub fn compare(&self, op: Operator, right: impl Into<Operand>) -> Predicate {
        Predicate::Comparison {
            left: self.clone(),
            op,
            right: right.into(),
        }
    }

    /// `self = other`, both rendered as identifiers.
    pub fn eq(&self, other: &Field) -> Predicate {
        self.compare(Operator::Eq, other)
    }

    pub fn ne(&self, other: &Field) -> Predicate {
        self.compare(Operator::Ne, other)
    }

    pub fn eq_value(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Operator::Eq, value.into())
    }

    pub fn ne_value(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Operator::Ne, value.into())
    }

    pub fn gt_value(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Operator::Gt, value.into())
    }

    pub fn gte_value(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Operator::Gte, value.into())
    }

    pub fn lt_value(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Operator::Lt, value.into())
    }

    pub fn lte_value(&self, value: impl Into<Value>) -> Predicate {
        self.compare(Operator::Lte, value.into())
    }

    pub fn eq_int(&self, value: i64) -> Predicate {
        self.eq_value(value)
    }

    pub fn eq_string(&self, value: impl Into<String>) -> Predicate {
        self.eq_value(value.into())
    }

    pub fn eq_bool(&self, value: bool) -> Predicate {
        self.eq_value(value)
    }

    pub fn like_string(&self, pattern: impl Into<String>) -> Predicate {
        self.compare(Operator::Like, Value::String(pattern.into()))
    }

    pub fn ilike_string(&self, pattern: impl Into<String>) -> Predicate {
        self.compare(Operator::ILike, Value::String(pattern.into()))
    }

    pub fn not_like_string(&self, pattern: impl Into<String>) -> Predicate {
        self.compare(Operator::NotLike, Value::String(pattern.into()))
    }

    /// `self IN ($1, $2, ...)`.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty: `IN ()` is not valid SQL.
    pub fn in_values<I>(&self, values: I) -> Predicate
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.compare(Operator::In, value_list(values, "in_values"))
    }

    /// `self NOT IN ($1, $2, ...)`.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn not_in_values<I>(&self, values: I) -> Predicate
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.compare(Operator::NotIn, value_list(values, "not_in_values"))
    }

    /// `self IN (SELECT ...)`.
    pub fn in_query(&self, query: &SelectQuery) -> Predicate {
        self.compare(Operator::In, query)
    }

    pub fn is_null(&self) -> Predicate {
        Predicate::NullCheck {
            field: self.clone(),
            negated: false,
        }
    }

    pub fn is_not_null(&self) -> Predicate {
        Predicate::NullCheck {
            field: self.clone(),
            negated: true,
        }
    }
}

fn value_list<I>(values: I, caller: &str) -> Vec<Value>
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    assert!(!values.is_empty(), "{caller}: value list must not be empty");
    values
}

impl ToSql for Field {
    /// The bare expression, without alias or sort modifiers.
    fn write_sql(&self, sql: &mut String, params: &mut ParamContext) {
        write_field_expr(self, sql, params);
    }
}

impl From<&Field> for Field {
    fn from(field: &Field) -> Self {
        field.clone()
    }
}
