//! Declarative helpers: table descriptors and `?` templates.

/// Declare typed table descriptors.
///
/// ```
/// qx::table! {
///     pub struct Users("public", "users") { uid, displayname, email }
/// }
///
/// let u = Users::new().with_alias("u");
/// let (sql, _) = qx::ToSql::to_sql(&qx::select([&u.uid, &u.email]).from(&u));
/// assert_eq!(sql, "SELECT u.uid, u.email FROM public.users AS u");
/// ```
#[macro_export]
macro_rules! table {
    ($(
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($schema:expr, $table:expr) {
            $($column:ident),* $(,)?
        }
    )*) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            table: $crate::Table,
            $(pub $column: $crate::Field,)*
        }

        impl $name {
            pub fn new() -> Self {
                Self::from_table($crate::Table::new($schema, $table))
            }

            fn from_table(table: $crate::Table) -> Self {
                Self {
                    $($column: table.get(stringify!($column)),)*
                    table,
                }
            }

            /// An independent descriptor whose columns are qualified by `alias`.
            pub fn with_alias(&self, alias: impl Into<String>) -> Self {
                Self::from_table(self.table.with_alias(alias))
            }

            pub fn set_alias(&self, alias: impl Into<String>) {
                self.table.set_alias(alias);
            }

            pub fn table(&self) -> &$crate::Table {
                &self.table
            }

            /// Any column by name, including ones not declared here.
            pub fn get(&self, column: impl Into<String>) -> $crate::Field {
                self.table.get(column)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<&$name> for $crate::Relation {
            fn from(t: &$name) -> Self {
                $crate::Relation::Table(t.table.clone())
            }
        }

        impl From<$name> for $crate::Relation {
            fn from(t: $name) -> Self {
                $crate::Relation::Table(t.table)
            }
        }

        impl From<&$name> for $crate::Part {
            fn from(t: &$name) -> Self {
                $crate::Part::Relation($crate::Relation::Table(t.table.clone()))
            }
        }
    )*};
}

/// Raw predicate from a `?` template: `predicatef!("TRIM(?)::INT > ?", &c.cohort, 2020)`.
///
/// Panics if the marker count differs from the number of parts.
#[macro_export]
macro_rules! predicatef {
    ($format:expr $(, $part:expr)* $(,)?) => {
        $crate::Predicate::raw($format, vec![$($crate::Part::from($part)),*])
    };
}

/// Custom field from a `?` template: `fieldf!("COUNT(?)", &u.uid).with_alias("n")`.
///
/// Panics if the marker count differs from the number of parts.
#[macro_export]
macro_rules! fieldf {
    ($format:expr $(, $part:expr)* $(,)?) => {
        $crate::Field::custom($crate::Template::new($format, vec![$($crate::Part::from($part)),*]))
    };
}

/// Whole statement from a `?` template.
///
/// Panics if the marker count differs from the number of parts.
#[macro_export]
macro_rules! queryf {
    ($format:expr $(, $part:expr)* $(,)?) => {
        $crate::RawQuery::new($format, vec![$($crate::Part::from($part)),*])
    };
}
