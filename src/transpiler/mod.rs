//! SQL compiler for qx statements.
//!
//! Every node writes its SQL into one shared buffer while registering bound values
//! in a [`ParamContext`]. Because the buffer is filled strictly left to right,
//! placeholder numbers always follow their textual order, across CTE bodies and
//! nested subqueries alike.

pub mod conditions;
pub mod select;

use std::fmt::Write;

use crate::value::Value;

/// Placeholder counter and argument sink threaded through one compilation.
#[derive(Debug, Default)]
pub struct ParamContext {
    params: Vec<Value>,
}

impl ParamContext {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Register a value and write its placeholder (`$n`) into `sql`.
    pub fn push_param(&mut self, sql: &mut String, value: Value) {
        self.params.push(value);
        let _ = write!(sql, "${}", self.params.len());
    }

    /// Number of placeholders emitted so far.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}

/// Trait for converting AST nodes to parameterized SQL.
pub trait ToSql {
    /// Append this node's SQL to `sql`, binding literal values through `params`.
    fn write_sql(&self, sql: &mut String, params: &mut ParamContext);

    /// Compile this node on its own, numbering placeholders from `$1`.
    fn to_sql(&self) -> (String, Vec<Value>) {
        let mut params = ParamContext::new();
        let mut sql = String::new();
        self.write_sql(&mut sql, &mut params);
        tracing::debug!(sql = %sql, args = params.len(), "compiled statement");
        (sql, params.into_params())
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn write_sql(&self, sql: &mut String, params: &mut ParamContext) {
        (**self).write_sql(sql, params)
    }
}

/// Write `items` separated by `sep`, using `write` for each item.
pub(crate) fn write_joined<T>(
    sql: &mut String,
    params: &mut ParamContext,
    items: &[T],
    sep: &str,
    mut write: impl FnMut(&T, &mut String, &mut ParamContext),
) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            sql.push_str(sep);
        }
        write(item, sql, params);
    }
}
