//! Relations: anything that can sit in FROM or JOIN.
//!
//! A relation is a plain table, a nested select used as a derived table, or a
//! reference to a common table expression. All three carry an [`AliasCell`], the one
//! piece of shared mutable state in an otherwise immutable statement tree.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::ast::{Field, SelectQuery};
use crate::transpiler::{select::build_select, ParamContext, ToSql};

static NEXT_ALIAS: AtomicU64 = AtomicU64::new(1);

/// Shared, lazily assigned alias slot.
///
/// Clones share the slot: an alias materialized or overwritten through one clone
/// is observed by every other clone. Implicit aliases are `_q<N>`, unique for the
/// lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct AliasCell(Arc<RwLock<Option<String>>>);

impl AliasCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh cell that already holds `alias`.
    pub fn with_alias(alias: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(Some(alias.into()))))
    }

    pub fn get(&self) -> Option<String> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Overwrite the alias for every holder of this cell.
    pub fn set(&self, alias: impl Into<String>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(alias.into());
    }

    /// Return the alias, assigning an implicit one on first use.
    pub fn get_or_assign(&self) -> String {
        if let Some(alias) = self.get() {
            return alias;
        }
        let mut slot = self.0.write().unwrap_or_else(PoisonError::into_inner);
        // Another holder may have assigned it between the read and the write lock.
        slot.get_or_insert_with(|| {
            let alias = format!("_q{}", NEXT_ALIAS.fetch_add(1, Ordering::Relaxed));
            tracing::trace!(alias = %alias, "assigned implicit alias");
            alias
        })
        .clone()
    }

    /// Whether both cells are the same slot.
    pub fn shares_identity(&self, other: &AliasCell) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// How a column is qualified: the relation's alias, else its bare name.
#[derive(Debug, Clone)]
pub(crate) struct Qualifier {
    alias: AliasCell,
    fallback: Option<String>,
}

impl Qualifier {
    pub(crate) fn new(alias: AliasCell, fallback: Option<String>) -> Self {
        Self { alias, fallback }
    }

    pub(crate) fn resolve(&self) -> Option<String> {
        self.alias.get().or_else(|| self.fallback.clone())
    }
}

/// A plain table.
#[derive(Debug, Clone)]
pub struct Table {
    schema: String,
    name: String,
    alias: AliasCell,
}

impl Table {
    /// Table `schema.name`. An empty schema renders the bare name.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            alias: AliasCell::new(),
        }
    }

    /// An independent table value carrying `alias`.
    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        Self {
            schema: self.schema.clone(),
            name: self.name.clone(),
            alias: AliasCell::with_alias(alias),
        }
    }

    /// Overwrite the alias seen by this table and every clone of it.
    pub fn set_alias(&self, alias: impl Into<String>) {
        self.alias.set(alias);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The explicit alias, if any.
    pub fn alias(&self) -> Option<String> {
        self.alias.get()
    }

    /// The name fields are qualified with: the alias, else the bare table name.
    pub fn get_alias(&self) -> String {
        self.alias.get().unwrap_or_else(|| self.name.clone())
    }

    pub fn qualified_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }

    /// A column of this table.
    pub fn get(&self, column: impl Into<String>) -> Field {
        Field::column(
            Qualifier::new(self.alias.clone(), Some(self.name.clone())),
            column,
        )
    }
}

#[derive(Debug)]
struct CteDef {
    name: String,
    query: SelectQuery,
}

/// A common table expression.
///
/// The value returned by [`Cte::new`] is the definition to pass to
/// [`SelectQuery::with`]; [`Cte::with_alias`] hands out further references to the
/// same definition, e.g. for self-joins. Only `WITH` ever renders the body.
#[derive(Debug, Clone)]
pub struct Cte {
    def: Arc<CteDef>,
    alias: AliasCell,
}

impl Cte {
    pub fn new(name: impl Into<String>, query: SelectQuery) -> Self {
        Self {
            def: Arc::new(CteDef {
                name: name.into(),
                query,
            }),
            alias: AliasCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn query(&self) -> &SelectQuery {
        &self.def.query
    }

    /// A new reference to the same definition, carrying `alias`.
    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        Self {
            def: Arc::clone(&self.def),
            alias: AliasCell::with_alias(alias),
        }
    }

    pub fn set_alias(&self, alias: impl Into<String>) {
        self.alias.set(alias);
    }

    pub fn alias(&self) -> Option<String> {
        self.alias.get()
    }

    /// The alias, else the CTE name.
    pub fn get_alias(&self) -> String {
        self.alias.get().unwrap_or_else(|| self.def.name.clone())
    }

    /// A column of the CTE's output.
    pub fn get(&self, column: impl Into<String>) -> Field {
        Field::column(
            Qualifier::new(self.alias.clone(), Some(self.def.name.clone())),
            column,
        )
    }

    /// Whether both handles point at the same definition.
    pub fn same_definition(&self, other: &Cte) -> bool {
        Arc::ptr_eq(&self.def, &other.def)
    }
}

/// Anything usable in FROM or JOIN.
#[derive(Debug, Clone)]
pub enum Relation {
    Table(Table),
    Subquery(SelectQuery),
    Cte(Cte),
}

impl Relation {
    /// The alias fields of this relation are qualified with.
    ///
    /// Subqueries get an implicit alias on first call; tables and CTEs fall back to
    /// their own name.
    pub fn get_alias(&self) -> String {
        match self {
            Relation::Table(table) => table.get_alias(),
            Relation::Subquery(query) => query.get_alias(),
            Relation::Cte(cte) => cte.get_alias(),
        }
    }

    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        match self {
            Relation::Table(table) => Relation::Table(table.with_alias(alias)),
            Relation::Subquery(query) => Relation::Subquery(query.with_alias(alias)),
            Relation::Cte(cte) => Relation::Cte(cte.with_alias(alias)),
        }
    }

    pub fn get(&self, column: impl Into<String>) -> Field {
        match self {
            Relation::Table(table) => table.get(column),
            Relation::Subquery(query) => query.get(column),
            Relation::Cte(cte) => cte.get(column),
        }
    }

    /// The relation itself without any alias: `schema.table`, `cte`, or
    /// `(SELECT ...)`.
    pub(crate) fn write_source(&self, sql: &mut String, params: &mut ParamContext) {
        match self {
            Relation::Table(table) => sql.push_str(&table.qualified_name()),
            Relation::Subquery(query) => {
                sql.push('(');
                build_select(query, sql, params);
                sql.push(')');
            }
            Relation::Cte(cte) => sql.push_str(cte.name()),
        }
    }
}

impl ToSql for Relation {
    /// FROM/JOIN form: the source followed by `AS alias` where one applies.
    fn write_sql(&self, sql: &mut String, params: &mut ParamContext) {
        self.write_source(sql, params);
        let alias = match self {
            Relation::Table(table) => table.alias(),
            Relation::Subquery(query) => Some(query.get_alias()),
            Relation::Cte(cte) => cte.alias(),
        };
        if let Some(alias) = alias {
            sql.push_str(" AS ");
            sql.push_str(&alias);
        }
    }
}

impl From<Table> for Relation {
    fn from(table: Table) -> Self {
        Relation::Table(table)
    }
}

impl From<&Table> for Relation {
    fn from(table: &Table) -> Self {
        Relation::Table(table.clone())
    }
}

impl From<SelectQuery> for Relation {
    fn from(query: SelectQuery) -> Self {
        Relation::Subquery(query)
    }
}

impl From<&SelectQuery> for Relation {
    fn from(query: &SelectQuery) -> Self {
        Relation::Subquery(query.clone())
    }
}

impl From<Cte> for Relation {
    fn from(cte: Cte) -> Self {
        Relation::Cte(cte)
    }
}

impl From<&Cte> for Relation {
    fn from(cte: &Cte) -> Self {
        Relation::Cte(cte.clone())
    }
}

impl From<&Cte> for Cte {
    fn from(cte: &Cte) -> Self {
        cte.clone()
    }
}

impl From<&Relation> for Relation {
    fn from(relation: &Relation) -> Self {
        relation.clone()
    }
}
