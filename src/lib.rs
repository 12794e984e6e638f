//! # qx: composable SELECT statements for PostgreSQL
//!
//! Build a statement from typed tables, fields and predicates, then compile it
//! into SQL text with `$n` placeholders and the matching argument list.
//!
//! ## Quick Example
//!
//! ```
//! use qx::prelude::*;
//!
//! qx::table! {
//!     pub struct Users("public", "users") { uid, displayname, email }
//! }
//!
//! let u = Users::new().with_alias("u");
//! let query = select([&u.uid, &u.displayname])
//!     .from(&u)
//!     .filter([u.email.is_not_null(), u.displayname.ilike_string("%bob%")])
//!     .order_by([u.uid.desc()])
//!     .limit(10);
//!
//! let (sql, args) = query.to_sql();
//! assert_eq!(
//!     sql,
//!     "SELECT u.uid, u.displayname FROM public.users AS u \
//!      WHERE u.email IS NOT NULL AND u.displayname ILIKE $1 \
//!      ORDER BY u.uid DESC LIMIT $2"
//! );
//! assert_eq!(args, vec![Value::from("%bob%"), Value::UInt(10)]);
//! ```
//!
//! ## Aliases
//!
//! | Relation         | Qualifier without alias | FROM text                 |
//! |------------------|-------------------------|---------------------------|
//! | `Table`          | table name              | `schema.table`            |
//! | `Cte`            | CTE name                | `name`                    |
//! | `SelectQuery`    | implicit `_q<N>`        | `(SELECT ...) AS _q<N>`   |

#[macro_use]
mod macros;

pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod transpiler;
pub mod value;

pub use ast::{
    and, or, select, AliasCell, Cte, Field, Operand, Operator, Part, Predicate, RawQuery,
    Relation, SelectQuery, Table, Template,
};
pub use error::{QxError, QxResult};
pub use transpiler::{ParamContext, ToSql};
pub use value::Value;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::error::*;
    pub use crate::transpiler::ToSql;
    pub use crate::value::Value;
    pub use crate::{fieldf, predicatef, queryf, table};
}
