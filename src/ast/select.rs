//! The SELECT statement builder.
//!
//! A [`SelectQuery`] is an immutable value. Every mutator borrows `self` and
//! returns a new statement, so a prototype can be branched freely:
//!
//! ```ignore
//! let base = SelectQuery::new().from(&u);
//! let active = base.filter([u.active.eq_bool(true)]);
//! let admins = base.filter([u.role.eq_string("admin")]);
//! ```
//!
//! Clause lists are `Arc<Vec<_>>` appended through [`Arc::make_mut`]: a branch copies
//! a list the first time it extends one that is still shared, and never writes
//! through to storage another statement can see.

use std::sync::Arc;

use crate::ast::relation::Qualifier;
use crate::ast::{AliasCell, Cte, Field, JoinKind, Predicate, Relation};
use crate::transpiler::{select::build_select, ParamContext, ToSql};

/// DISTINCT mode of the select list.
#[derive(Debug, Clone, Default)]
pub enum Distinct {
    #[default]
    None,
    /// `SELECT DISTINCT`
    All,
    /// `SELECT DISTINCT ON (exprs)`
    On(Arc<Vec<Field>>),
}

#[derive(Debug, Clone)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub relation: Relation,
    /// `None` only for CROSS JOIN.
    pub on: Option<Predicate>,
}

/// Clause contents of a statement, in compile order.
#[derive(Debug, Clone, Default)]
pub struct Clauses {
    pub ctes: Arc<Vec<Cte>>,
    pub distinct: Distinct,
    pub columns: Arc<Vec<Field>>,
    pub from: Option<Relation>,
    pub joins: Arc<Vec<JoinClause>>,
    pub filters: Arc<Vec<Predicate>>,
    pub group_by: Arc<Vec<Field>>,
    pub having: Arc<Vec<Predicate>>,
    pub order_by: Arc<Vec<Field>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn append<T: Clone>(list: &mut Arc<Vec<T>>, items: impl IntoIterator<Item = T>) {
    Arc::make_mut(list).extend(items);
}

/// A SELECT statement.
///
/// Statements chained from the same [`SelectQuery::new`] share one alias cell: once
/// any of them is aliased (implicitly through [`get_alias`](Self::get_alias) or
/// explicitly through [`set_alias`](Self::set_alias)), all of them carry that alias.
/// Use [`with_alias`](Self::with_alias) to give a branch its own identity; two
/// branches of one prototype used as separate derived tables in the same statement
/// need explicit aliases.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    clauses: Arc<Clauses>,
    alias: AliasCell,
}

/// Start a statement with a select list.
pub fn select<I>(fields: I) -> SelectQuery
where
    I: IntoIterator,
    I::Item: Into<Field>,
{
    SelectQuery::new().select(fields)
}

impl SelectQuery {
    /// An empty statement; compiles to the empty string.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clauses(&self) -> &Clauses {
        &self.clauses
    }

    fn derive(&self, apply: impl FnOnce(&mut Clauses)) -> Self {
        let mut clauses = Clauses::clone(&self.clauses);
        apply(&mut clauses);
        Self {
            clauses: Arc::new(clauses),
            alias: self.alias.clone(),
        }
    }

    /// Append CTE definitions to the WITH clause.
    pub fn with<I>(&self, ctes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Cte>,
    {
        self.derive(|c| append(&mut c.ctes, ctes.into_iter().map(Into::into)))
    }

    /// Extend the select list.
    pub fn select<I>(&self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Field>,
    {
        self.derive(|c| append(&mut c.columns, fields.into_iter().map(Into::into)))
    }

    /// Extend the select list and switch to `SELECT DISTINCT`.
    pub fn select_distinct<I>(&self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Field>,
    {
        self.derive(|c| {
            c.distinct = Distinct::All;
            append(&mut c.columns, fields.into_iter().map(Into::into));
        })
    }

    /// `SELECT DISTINCT ON (exprs)`; the select list follows through
    /// [`DistinctOn::select`].
    pub fn select_distinct_on<I>(&self, exprs: I) -> DistinctOn
    where
        I: IntoIterator,
        I::Item: Into<Field>,
    {
        DistinctOn {
            query: self.clone(),
            exprs: exprs.into_iter().map(Into::into).collect(),
        }
    }

    /// Set the base relation, replacing any previous one.
    pub fn from(&self, relation: impl Into<Relation>) -> Self {
        let relation = relation.into();
        self.derive(|c| c.from = Some(relation))
    }

    fn add_join(&self, kind: JoinKind, relation: Relation, on: Option<Predicate>) -> Self {
        self.derive(|c| {
            append(
                &mut c.joins,
                [JoinClause {
                    kind,
                    relation,
                    on,
                }],
            )
        })
    }

    pub fn join(&self, relation: impl Into<Relation>, on: Predicate) -> Self {
        self.add_join(JoinKind::Inner, relation.into(), Some(on))
    }

    pub fn left_join(&self, relation: impl Into<Relation>, on: Predicate) -> Self {
        self.add_join(JoinKind::Left, relation.into(), Some(on))
    }

    pub fn right_join(&self, relation: impl Into<Relation>, on: Predicate) -> Self {
        self.add_join(JoinKind::Right, relation.into(), Some(on))
    }

    pub fn full_join(&self, relation: impl Into<Relation>, on: Predicate) -> Self {
        self.add_join(JoinKind::Full, relation.into(), Some(on))
    }

    pub fn cross_join(&self, relation: impl Into<Relation>) -> Self {
        self.add_join(JoinKind::Cross, relation.into(), None)
    }

    /// Append WHERE predicates; all of them must hold.
    pub fn filter<I>(&self, predicates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Predicate>,
    {
        self.derive(|c| append(&mut c.filters, predicates.into_iter().map(Into::into)))
    }

    pub fn group_by<I>(&self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Field>,
    {
        self.derive(|c| append(&mut c.group_by, fields.into_iter().map(Into::into)))
    }

    pub fn having<I>(&self, predicates: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Predicate>,
    {
        self.derive(|c| append(&mut c.having, predicates.into_iter().map(Into::into)))
    }

    pub fn order_by<I>(&self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Field>,
    {
        self.derive(|c| append(&mut c.order_by, fields.into_iter().map(Into::into)))
    }

    /// LIMIT by the absolute value of `n`.
    pub fn limit(&self, n: i64) -> Self {
        self.derive(|c| c.limit = Some(n.unsigned_abs()))
    }

    /// OFFSET by the absolute value of `n`.
    pub fn offset(&self, n: i64) -> Self {
        self.derive(|c| c.offset = Some(n.unsigned_abs()))
    }

    pub(crate) fn alias_cell(&self) -> &AliasCell {
        &self.alias
    }

    /// The explicit or already materialized alias.
    pub fn alias(&self) -> Option<String> {
        self.alias.get()
    }

    /// The alias, assigning an implicit `_q<N>` one on first use.
    pub fn get_alias(&self) -> String {
        self.alias.get_or_assign()
    }

    /// The same statement under a new identity carrying `alias`.
    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        Self {
            clauses: Arc::clone(&self.clauses),
            alias: AliasCell::with_alias(alias),
        }
    }

    /// Overwrite the alias of this statement and of every statement sharing its
    /// identity.
    pub fn set_alias(&self, alias: impl Into<String>) {
        self.alias.set(alias);
    }

    /// A column of this statement's output, qualified by its alias.
    pub fn get(&self, column: impl Into<String>) -> Field {
        self.alias.get_or_assign();
        Field::column(Qualifier::new(self.alias.clone(), None), column)
    }
}

impl ToSql for SelectQuery {
    fn write_sql(&self, sql: &mut String, params: &mut ParamContext) {
        build_select(self, sql, params);
    }
}

/// A statement waiting for its `DISTINCT ON` select list.
#[derive(Debug, Clone)]
#[must_use = "DISTINCT ON takes effect only once the select list is given"]
pub struct DistinctOn {
    query: SelectQuery,
    exprs: Vec<Field>,
}

impl DistinctOn {
    pub fn select<I>(self, fields: I) -> SelectQuery
    where
        I: IntoIterator,
        I::Item: Into<Field>,
    {
        let exprs = Arc::new(self.exprs);
        self.query.derive(|c| {
            c.distinct = Distinct::On(exprs);
            append(&mut c.columns, fields.into_iter().map(Into::into));
        })
    }
}
