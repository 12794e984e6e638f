//! `?`-marker templates.
//!
//! A template is a format string in which every `?` is replaced, left to right,
//! by the next [`Part`]. Fields and relations splice in as identifiers, values
//! become placeholders. `??` is a literal question mark, which keeps PostgreSQL's
//! JSON operators (`??|`, `??&`) writable.
//!
//! ```text
//! TRIM(?)::INT > ?      with parts [c.cohort, 2020]
//! TRIM(c.cohort)::INT > $1                  args [2020]
//! ```

use chrono::{DateTime, Utc};
use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::char,
    combinator::{map, value},
    IResult,
};

use crate::ast::{Cte, Field, Predicate, Relation, SelectQuery, Table};
use crate::error::{QxError, QxResult};
use crate::transpiler::{conditions::write_template, ParamContext, ToSql};
use crate::value::Value;

/// A piece of a parsed format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Marker,
}

/// One substitution for a `?` marker.
#[derive(Debug, Clone)]
pub enum Part {
    /// Rendered as the field's expression.
    Field(Field),
    /// Rendered as a comma-separated expression list.
    Fields(Vec<Field>),
    /// Rendered as the relation's source text, without alias.
    Relation(Relation),
    /// Rendered as a predicate; a group is parenthesized.
    Predicate(Predicate),
    /// Rendered as a predicate with a group's members bare, as after `WHERE`.
    TopLevel(Predicate),
    /// Rendered as a placeholder.
    Value(Value),
    /// Rendered as a comma-separated placeholder list.
    Values(Vec<Value>),
    /// Rendered as parenthesized placeholder rows: `($1, $2), ($3, $4)`.
    Rows(Vec<Vec<Value>>),
}

impl Part {
    /// A predicate spliced without surrounding parentheses.
    ///
    /// Only safe where the template text cannot bind tighter than the group's
    /// keyword, e.g. `WHERE ?` or `(?)`.
    pub fn top_level(predicate: impl Into<Predicate>) -> Self {
        Part::TopLevel(predicate.into())
    }

    /// A list of value rows, as used by `VALUES ?`.
    pub fn rows<R, I, V>(rows: R) -> Self
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Part::Rows(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    /// An empty list would render as `()`, which is never valid SQL.
    fn has_empty_list(&self) -> bool {
        match self {
            Part::Values(values) => values.is_empty(),
            Part::Rows(rows) => rows.is_empty() || rows.iter().any(Vec::is_empty),
            _ => false,
        }
    }
}

/// A parsed format string together with its parts.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
    parts: Vec<Part>,
}

impl Template {
    /// Parse `format` and pair its markers with `parts`.
    ///
    /// Fails when the marker count differs from the part count; the error position
    /// points at the first marker without a part, or at the end of the format when
    /// parts are left over. Also fails when a value list or row list is empty,
    /// pointing at its marker.
    pub fn parse(format: &str, parts: Vec<Part>) -> QxResult<Self> {
        let (segments, markers) = scan(format);
        if markers.len() != parts.len() {
            let position = markers.get(parts.len()).copied().unwrap_or(format.len());
            return Err(QxError::template(
                position,
                format!(
                    "format has {} marker(s) but {} part(s) were given",
                    markers.len(),
                    parts.len()
                ),
            ));
        }
        if let Some((&position, _)) = markers.iter().zip(&parts).find(|(_, p)| p.has_empty_list()) {
            return Err(QxError::template(position, "value list must not be empty"));
        }
        Ok(Self { segments, parts })
    }

    /// Like [`Template::parse`] for formats written in code.
    ///
    /// # Panics
    ///
    /// Panics if the marker count differs from the part count, or if a value
    /// list is empty.
    pub fn new(format: &str, parts: Vec<Part>) -> Self {
        match Self::parse(format, parts) {
            Ok(template) => template,
            Err(err) => panic!("invalid template {format:?}: {err}"),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

/// Split `format` into segments without pairing any parts.
pub fn segments(format: &str) -> Vec<Segment> {
    scan(format).0
}

fn segment(input: &str) -> IResult<&str, Segment> {
    alt((
        value(Segment::Text("?".to_string()), tag("??")),
        value(Segment::Marker, char('?')),
        map(is_not("?"), |text: &str| Segment::Text(text.to_string())),
    ))(input)
}

/// Segments plus the byte offset of every marker. Adjacent text is merged.
fn scan(format: &str) -> (Vec<Segment>, Vec<usize>) {
    let mut segments = Vec::new();
    let mut markers = Vec::new();
    let mut rest = format;
    while let Ok((next, seg)) = segment(rest) {
        match seg {
            Segment::Marker => {
                markers.push(format.len() - rest.len());
                segments.push(Segment::Marker);
            }
            Segment::Text(text) => match segments.last_mut() {
                Some(Segment::Text(prev)) => prev.push_str(&text),
                _ => segments.push(Segment::Text(text)),
            },
        }
        rest = next;
    }
    (segments, markers)
}

/// A complete statement written as a template. See [`queryf!`](crate::queryf).
#[derive(Debug, Clone)]
pub struct RawQuery {
    template: Template,
}

impl RawQuery {
    /// # Panics
    ///
    /// Panics if the marker count differs from the part count.
    pub fn new(format: &str, parts: Vec<Part>) -> Self {
        Self {
            template: Template::new(format, parts),
        }
    }

    pub fn parse(format: &str, parts: Vec<Part>) -> QxResult<Self> {
        Template::parse(format, parts).map(|template| Self { template })
    }

    pub fn template(&self) -> &Template {
        &self.template
    }
}

impl ToSql for RawQuery {
    fn write_sql(&self, sql: &mut String, params: &mut ParamContext) {
        write_template(&self.template, sql, params);
    }
}

impl From<Field> for Part {
    fn from(field: Field) -> Self {
        Part::Field(field)
    }
}

impl From<&Field> for Part {
    fn from(field: &Field) -> Self {
        Part::Field(field.clone())
    }
}

impl From<Vec<Field>> for Part {
    fn from(fields: Vec<Field>) -> Self {
        Part::Fields(fields)
    }
}

impl From<Relation> for Part {
    fn from(relation: Relation) -> Self {
        Part::Relation(relation)
    }
}

impl From<Table> for Part {
    fn from(table: Table) -> Self {
        Part::Relation(table.into())
    }
}

impl From<&Table> for Part {
    fn from(table: &Table) -> Self {
        Part::Relation(table.into())
    }
}

impl From<Cte> for Part {
    fn from(cte: Cte) -> Self {
        Part::Relation(cte.into())
    }
}

impl From<&Cte> for Part {
    fn from(cte: &Cte) -> Self {
        Part::Relation(cte.into())
    }
}

impl From<SelectQuery> for Part {
    fn from(query: SelectQuery) -> Self {
        Part::Relation(query.into())
    }
}

impl From<&SelectQuery> for Part {
    fn from(query: &SelectQuery) -> Self {
        Part::Relation(query.into())
    }
}

impl From<Predicate> for Part {
    fn from(predicate: Predicate) -> Self {
        Part::Predicate(predicate)
    }
}

impl From<Value> for Part {
    fn from(value: Value) -> Self {
        Part::Value(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Part {
    fn from(values: Vec<T>) -> Self {
        Part::Values(values.into_iter().map(Into::into).collect())
    }
}

impl From<i32> for Part {
    fn from(n: i32) -> Self {
        Part::Value(n.into())
    }
}

impl From<i64> for Part {
    fn from(n: i64) -> Self {
        Part::Value(n.into())
    }
}

impl From<u64> for Part {
    fn from(n: u64) -> Self {
        Part::Value(n.into())
    }
}

impl From<f64> for Part {
    fn from(n: f64) -> Self {
        Part::Value(n.into())
    }
}

impl From<bool> for Part {
    fn from(b: bool) -> Self {
        Part::Value(b.into())
    }
}

impl From<&str> for Part {
    fn from(s: &str) -> Self {
        Part::Value(s.into())
    }
}

impl From<String> for Part {
    fn from(s: String) -> Self {
        Part::Value(s.into())
    }
}

impl From<DateTime<Utc>> for Part {
    fn from(ts: DateTime<Utc>) -> Self {
        Part::Value(ts.into())
    }
}
