//! Expression-level rendering: fields, predicates and templates.

use crate::ast::field::FieldExpr;
use crate::ast::{Field, NullsOrder, Operand, Part, Predicate, SortOrder, Template, Segment};
use crate::transpiler::select::build_select;
use crate::transpiler::{write_joined, ParamContext};

/// The bare expression of a field: `qualifier.name`, `name`, or the expanded
/// custom template.
pub(crate) fn write_field_expr(field: &Field, sql: &mut String, params: &mut ParamContext) {
    match &field.expr {
        FieldExpr::Column { qualifier, name } => {
            if let Some(qualifier) = qualifier.as_ref().and_then(|q| q.resolve()) {
                sql.push_str(&qualifier);
                sql.push('.');
            }
            sql.push_str(name);
        }
        FieldExpr::Custom(template) => write_template(template, sql, params),
    }
}

/// Select-list position: `expr [AS alias]`.
pub(crate) fn write_select_item(field: &Field, sql: &mut String, params: &mut ParamContext) {
    write_field_expr(field, sql, params);
    if let Some(alias) = &field.alias {
        sql.push_str(" AS ");
        sql.push_str(alias);
    }
}

/// ORDER BY position: `expr [ASC|DESC] [NULLS FIRST|LAST]`.
pub(crate) fn write_order_item(field: &Field, sql: &mut String, params: &mut ParamContext) {
    write_field_expr(field, sql, params);
    match field.order {
        Some(SortOrder::Asc) => sql.push_str(" ASC"),
        Some(SortOrder::Desc) => sql.push_str(" DESC"),
        None => {}
    }
    match field.nulls {
        Some(NullsOrder::First) => sql.push_str(" NULLS FIRST"),
        Some(NullsOrder::Last) => sql.push_str(" NULLS LAST"),
        None => {}
    }
}

fn write_operand(operand: &Operand, sql: &mut String, params: &mut ParamContext) {
    match operand {
        Operand::Field(field) => write_field_expr(field, sql, params),
        Operand::Value(value) => params.push_param(sql, value.clone()),
        Operand::Values(values) => {
            sql.push('(');
            write_joined(sql, params, values, ", ", |v, sql, params| {
                params.push_param(sql, v.clone())
            });
            sql.push(')');
        }
        Operand::Query(query) => {
            sql.push('(');
            build_select(query, sql, params);
            sql.push(')');
        }
    }
}

/// Render a predicate at top level: a group's members are joined by its keyword
/// without surrounding parentheses.
pub(crate) fn write_predicate(predicate: &Predicate, sql: &mut String, params: &mut ParamContext) {
    match predicate {
        Predicate::Comparison { left, op, right } => {
            write_field_expr(left, sql, params);
            sql.push(' ');
            sql.push_str(op.sql_symbol());
            sql.push(' ');
            write_operand(right, sql, params);
        }
        Predicate::NullCheck { field, negated } => {
            write_field_expr(field, sql, params);
            sql.push_str(if *negated { " IS NOT NULL" } else { " IS NULL" });
        }
        Predicate::Raw(template) => write_template(template, sql, params),
        Predicate::Group { op, members } => {
            let live: Vec<&Predicate> = members.iter().filter(|p| !p.is_vacuous()).collect();
            let sep = format!(" {} ", op.sql_keyword());
            write_joined(sql, params, &live, &sep, |p, sql, params| {
                write_nested(p, sql, params)
            });
        }
    }
}

/// Render a group member; nested groups are always parenthesized.
fn write_nested(predicate: &Predicate, sql: &mut String, params: &mut ParamContext) {
    if matches!(predicate, Predicate::Group { .. }) {
        sql.push('(');
        write_predicate(predicate, sql, params);
        sql.push(')');
    } else {
        write_predicate(predicate, sql, params);
    }
}

/// Render the predicate list of a clause (WHERE, HAVING).
///
/// A single predicate renders as itself; several form an implicit AND group.
/// Returns `false`, writing nothing, when every predicate is vacuous.
pub(crate) fn write_predicate_list(
    predicates: &[Predicate],
    sql: &mut String,
    params: &mut ParamContext,
) -> bool {
    let live: Vec<&Predicate> = predicates.iter().filter(|p| !p.is_vacuous()).collect();
    match live.as_slice() {
        [] => false,
        [only] => {
            write_predicate(only, sql, params);
            true
        }
        _ => {
            write_joined(sql, params, &live, " AND ", |p, sql, params| {
                write_nested(p, sql, params)
            });
            true
        }
    }
}

/// Expand a template, pairing markers with parts left to right.
pub(crate) fn write_template(template: &Template, sql: &mut String, params: &mut ParamContext) {
    let mut parts = template.parts().iter();
    for segment in template.segments() {
        match segment {
            Segment::Text(text) => sql.push_str(text),
            // Template construction guarantees one part per marker.
            Segment::Marker => {
                if let Some(part) = parts.next() {
                    write_part(part, sql, params);
                }
            }
        }
    }
}

fn write_part(part: &Part, sql: &mut String, params: &mut ParamContext) {
    match part {
        Part::Field(field) => write_field_expr(field, sql, params),
        Part::Fields(fields) => write_joined(sql, params, fields, ", ", |f, sql, params| {
            write_field_expr(f, sql, params)
        }),
        Part::Relation(relation) => relation.write_source(sql, params),
        // Surrounding template text may bind tighter than OR.
        Part::Predicate(predicate) => write_nested(predicate, sql, params),
        Part::TopLevel(predicate) => write_predicate(predicate, sql, params),
        Part::Value(value) => params.push_param(sql, value.clone()),
        Part::Values(values) => write_joined(sql, params, values, ", ", |v, sql, params| {
            params.push_param(sql, v.clone())
        }),
        Part::Rows(rows) => write_joined(sql, params, rows, ", ", |row, sql, params| {
            sql.push('(');
            write_joined(sql, params, row, ", ", |v, sql, params| {
                params.push_param(sql, v.clone())
            });
            sql.push(')');
        }),
    }
}
