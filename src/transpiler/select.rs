//! SELECT statement compilation.
//!
//! Clauses are emitted in SQL order: WITH, SELECT, FROM and joins, WHERE,
//! GROUP BY, HAVING, ORDER BY, LIMIT, OFFSET. Empty clauses are skipped, so a
//! statement holding only ORDER BY compiles to just `ORDER BY ...`.

use crate::ast::{Clauses, Distinct, Relation, SelectQuery};
use crate::transpiler::conditions::{
    write_field_expr, write_order_item, write_predicate, write_predicate_list, write_select_item,
};
use crate::transpiler::{write_joined, ParamContext, ToSql};
use crate::value::Value;

/// Start a new clause: a single space unless it is the first one.
fn begin_clause(sql: &mut String, start: usize, keyword: &str) {
    if sql.len() > start {
        sql.push(' ');
    }
    sql.push_str(keyword);
}

/// Derived tables in one FROM list must not share an alias cell, or both would
/// render under the same alias.
///
/// # Panics
///
/// Panics naming the shared alias.
fn check_derived_aliases(c: &Clauses) {
    let derived: Vec<&SelectQuery> = c
        .from
        .iter()
        .chain(c.joins.iter().map(|join| &join.relation))
        .filter_map(|relation| match relation {
            Relation::Subquery(query) => Some(query),
            _ => None,
        })
        .collect();
    for (i, query) in derived.iter().enumerate() {
        let cell = query.alias_cell();
        if derived[i + 1..].iter().any(|other| other.alias_cell().shares_identity(cell)) {
            panic!(
                "derived tables branched from one statement share the alias {:?}; \
                 give each its own with `with_alias`",
                cell.get_or_assign()
            );
        }
    }
}

/// Append the SQL for `query` to `sql`, registering its values in `params`.
///
/// # Panics
///
/// Panics if two derived tables of the same FROM list share an alias cell.
pub fn build_select(query: &SelectQuery, sql: &mut String, params: &mut ParamContext) {
    let c = query.clauses();
    let start = sql.len();

    // CTE bodies come first and claim the lowest placeholder numbers.
    if !c.ctes.is_empty() {
        begin_clause(sql, start, "WITH ");
        write_joined(sql, params, &c.ctes, ", ", |cte, sql, params| {
            sql.push_str(cte.name());
            sql.push_str(" AS (");
            build_select(cte.query(), sql, params);
            sql.push(')');
        });
    }

    let distinct = !matches!(c.distinct, Distinct::None);
    if !c.columns.is_empty() || distinct {
        begin_clause(sql, start, "SELECT");
        match &c.distinct {
            Distinct::None => {}
            Distinct::All => sql.push_str(" DISTINCT"),
            Distinct::On(exprs) => {
                sql.push_str(" DISTINCT ON (");
                write_joined(sql, params, exprs, ", ", |f, sql, params| {
                    write_field_expr(f, sql, params)
                });
                sql.push(')');
            }
        }
        if !c.columns.is_empty() {
            sql.push(' ');
            write_joined(sql, params, &c.columns, ", ", |f, sql, params| {
                write_select_item(f, sql, params)
            });
        }
    }

    check_derived_aliases(c);
    if let Some(from) = &c.from {
        begin_clause(sql, start, "FROM ");
        from.write_sql(sql, params);
    }

    for join in c.joins.iter() {
        begin_clause(sql, start, join.kind.sql_keyword());
        sql.push(' ');
        join.relation.write_sql(sql, params);
        if let Some(on) = join.on.as_ref().filter(|on| !on.is_vacuous()) {
            sql.push_str(" ON ");
            write_predicate(on, sql, params);
        }
    }

    // A clause made only of empty groups is dropped entirely.
    if c.filters.iter().any(|p| !p.is_vacuous()) {
        begin_clause(sql, start, "WHERE ");
        write_predicate_list(&c.filters, sql, params);
    }

    if !c.group_by.is_empty() {
        begin_clause(sql, start, "GROUP BY ");
        write_joined(sql, params, &c.group_by, ", ", |f, sql, params| {
            write_field_expr(f, sql, params)
        });
    }

    if c.having.iter().any(|p| !p.is_vacuous()) {
        begin_clause(sql, start, "HAVING ");
        write_predicate_list(&c.having, sql, params);
    }

    if !c.order_by.is_empty() {
        begin_clause(sql, start, "ORDER BY ");
        write_joined(sql, params, &c.order_by, ", ", |f, sql, params| {
            write_order_item(f, sql, params)
        });
    }

    if let Some(limit) = c.limit {
        begin_clause(sql, start, "LIMIT ");
        params.push_param(sql, Value::UInt(limit));
    }

    if let Some(offset) = c.offset {
        begin_clause(sql, start, "OFFSET ");
        params.push_param(sql, Value::UInt(offset));
    }
}
