// Query Model (AST) Implementation
//
// This module defines the query model produced by the parser and consumed by
// the algebra converter and the rewrite heuristics. Predicates are kept as
// small expression trees so heuristics can match them structurally.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A parsed SELECT statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryModel {
    /// Columns in the SELECT clause
    pub select: SelectList,
    /// Table named in the FROM clause
    pub from_table: String,
    /// Annotations attached to the FROM table by the heuristics
    pub from_access: AccessAnnotations,
    /// INNER JOIN clauses in left-deep build order
    pub joins: Vec<Join>,
    /// WHERE clause; empty when the query has none
    pub where_clause: Conjunction,
}

/// SELECT list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectList {
    /// All columns (*)
    Wildcard,
    /// Explicit column references in source order
    Columns(Vec<ColumnRef>),
}

/// One INNER JOIN entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub table: String,
    pub condition: Conjunction,
    pub access: AccessAnnotations,
}

/// Work pushed down to a table access point. Always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAnnotations {
    /// Predicates evaluated against the table before it is joined
    pub pushed_selection: Conjunction,
    /// Unqualified column names required from the table
    pub pushed_projection: BTreeSet<String>,
}

/// Column reference (could be qualified with table name)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
}

/// Literal values appearing in predicates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    /// Numeric literal kept in its source spelling
    Number(String),
    String(String),
    Null,
}

/// Comparison operand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Column(ColumnRef),
    Literal(Literal),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
}

/// Binary comparison `left op right`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub left: Operand,
    pub op: CompareOp,
    pub right: Operand,
}

/// Boolean predicate tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    Comparison(Comparison),
    IsNull { operand: Operand, negated: bool },
    Or(Vec<Predicate>),
    /// Nested conjunction; only appears below `Or` or `Not`
    And(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Text the predicate grammar does not decompose, with the columns it mentions
    Opaque { text: String, columns: Vec<ColumnRef> },
}

/// AND-separated list of atomic predicates. Empty means "no predicate".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conjunction(pub Vec<Predicate>);

impl ColumnRef {
    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        ColumnRef {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    pub fn bare(name: impl Into<String>) -> Self {
        ColumnRef {
            table: None,
            name: name.into(),
        }
    }

    /// True when the column is qualified with `table`
    pub fn belongs_to(&self, table: &str) -> bool {
        self.table.as_deref() == Some(table)
    }
}

impl Operand {
    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            Operand::Column(col) => Some(col),
            Operand::Literal(_) => None,
        }
    }
}

impl Comparison {
    /// Returns both column references when this is `T1.C1 = T2.C2` over two
    /// different tables.
    pub fn as_equi_join(&self) -> Option<(&ColumnRef, &ColumnRef)> {
        if self.op != CompareOp::Eq {
            return None;
        }
        let left = self.left.as_column()?;
        let right = self.right.as_column()?;
        match (&left.table, &right.table) {
            (Some(lt), Some(rt)) if lt != rt => Some((left, right)),
            _ => None,
        }
    }

    /// Same comparison with operands swapped, for symmetric operators only
    fn mirrored(&self) -> Option<Comparison> {
        match self.op {
            CompareOp::Eq | CompareOp::NotEq => Some(Comparison {
                left: self.right.clone(),
                op: self.op,
                right: self.left.clone(),
            }),
            _ => None,
        }
    }
}

impl Predicate {
    /// Column references in order of appearance
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            Predicate::Comparison(cmp) => {
                out.extend(cmp.left.as_column());
                out.extend(cmp.right.as_column());
            }
            Predicate::IsNull { operand, .. } => out.extend(operand.as_column()),
            Predicate::Or(items) | Predicate::And(items) => {
                for item in items {
                    item.collect_columns(out);
                }
            }
            Predicate::Not(inner) => inner.collect_columns(out),
            Predicate::Opaque { columns, .. } => out.extend(columns.iter()),
        }
    }

    /// Distinct tables referenced through qualified columns
    pub fn tables(&self) -> BTreeSet<&str> {
        self.columns()
            .into_iter()
            .filter_map(|col| col.table.as_deref())
            .collect()
    }

    /// True when the predicate contains an equality comparison anywhere
    pub fn has_equality(&self) -> bool {
        match self {
            Predicate::Comparison(cmp) => cmp.op == CompareOp::Eq,
            Predicate::Or(items) | Predicate::And(items) => items.iter().any(Predicate::has_equality),
            Predicate::Not(inner) => inner.has_equality(),
            Predicate::IsNull { .. } => false,
            Predicate::Opaque { text, .. } => text.contains('='),
        }
    }

    /// Equality modulo operand order for `=` and `<>`
    pub fn equivalent(&self, other: &Predicate) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (Predicate::Comparison(a), Predicate::Comparison(b)) => {
                a.mirrored().is_some_and(|m| &m == b)
            }
            _ => false,
        }
    }
}

impl Conjunction {
    pub fn new() -> Self {
        Conjunction(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Predicate> {
        self.0.iter()
    }

    /// True when an equivalent predicate is already part of the conjunction
    pub fn contains(&self, predicate: &Predicate) -> bool {
        self.0.iter().any(|p| p.equivalent(predicate))
    }

    /// Appends `predicate` unless an equivalent one is already present.
    /// Returns whether it was added.
    pub fn push_unique(&mut self, predicate: Predicate) -> bool {
        if self.contains(&predicate) {
            false
        } else {
            self.0.push(predicate);
            true
        }
    }

    /// All column references across the conjunction
    pub fn columns(&self) -> Vec<&ColumnRef> {
        self.0.iter().flat_map(|p| p.columns()).collect()
    }

    pub fn has_equality(&self) -> bool {
        self.0.iter().any(Predicate::has_equality)
    }
}

impl From<Vec<Predicate>> for Conjunction {
    fn from(predicates: Vec<Predicate>) -> Self {
        Conjunction(predicates)
    }
}

impl IntoIterator for Conjunction {
    type Item = Predicate;
    type IntoIter = std::vec::IntoIter<Predicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Conjunction {
    type Item = &'a Predicate;
    type IntoIter = std::slice::Iter<'a, Predicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl QueryModel {
    /// Builds a model with empty annotations, as produced by the parser
    pub fn new(select: SelectList, from_table: impl Into<String>, joins: Vec<Join>, where_clause: Conjunction) -> Self {
        QueryModel {
            select,
            from_table: from_table.into(),
            from_access: AccessAnnotations::default(),
            joins,
            where_clause,
        }
    }

    /// FROM table followed by the joined tables, in build order
    pub fn tables(&self) -> Vec<&str> {
        std::iter::once(self.from_table.as_str())
            .chain(self.joins.iter().map(|j| j.table.as_str()))
            .collect()
    }

    pub fn has_where(&self) -> bool {
        !self.where_clause.is_empty()
    }

    pub fn is_select_all(&self) -> bool {
        matches!(self.select, SelectList::Wildcard)
    }

    /// Annotations for `table`, whether it is the FROM table or a joined one
    pub fn access_for(&self, table: &str) -> Option<&AccessAnnotations> {
        if self.from_table == table {
            return Some(&self.from_access);
        }
        self.joins.iter().find(|j| j.table == table).map(|j| &j.access)
    }
}

impl Join {
    pub fn new(table: impl Into<String>, condition: Conjunction) -> Self {
        Join {
            table: table.into(),
            condition,
            access: AccessAnnotations::default(),
        }
    }

    pub fn has_condition(&self) -> bool {
        !self.condition.is_empty()
    }
}

impl AccessAnnotations {
    pub fn is_empty(&self) -> bool {
        self.pushed_selection.is_empty() && self.pushed_projection.is_empty()
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(col) => write!(f, "{}", col),
            Operand::Literal(lit) => write!(f, "{}", lit),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Like => "LIKE",
        };
        write!(f, "{}", symbol)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

/// Writes `items` separated by `sep`, parenthesizing compound children
fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Predicate], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", sep)?;
        }
        match item {
            Predicate::Or(_) | Predicate::And(_) => write!(f, "({})", item)?,
            _ => write!(f, "{}", item)?,
        }
    }
    Ok(())
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Comparison(cmp) => write!(f, "{}", cmp),
            Predicate::IsNull { operand, negated: false } => write!(f, "{} IS NULL", operand),
            Predicate::IsNull { operand, negated: true } => write!(f, "{} IS NOT NULL", operand),
            Predicate::Or(items) => write_joined(f, items, "OR"),
            Predicate::And(items) => write_joined(f, items, "AND"),
            Predicate::Not(inner) => match inner.as_ref() {
                Predicate::Comparison(_) | Predicate::IsNull { .. } | Predicate::Opaque { .. } => {
                    write!(f, "NOT {}", inner)
                }
                _ => write!(f, "NOT ({})", inner),
            },
            Predicate::Opaque { text, .. } => write!(f, "{}", text),
        }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            // A lone disjunction needs no parentheses
            return write!(f, "{}", self.0[0]);
        }
        write_joined(f, &self.0, "AND")
    }
}

impl fmt::Display for SelectList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectList::Wildcard => write!(f, "*"),
            SelectList::Columns(cols) => {
                let names: Vec<String> = cols.iter().map(ToString::to_string).collect();
                write!(f, "{}", names.join(", "))
            }
        }
    }
}

impl fmt::Display for QueryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {} FROM {}", self.select, self.from_table)?;
        for join in &self.joins {
            write!(f, " INNER JOIN {}", join.table)?;
            if join.has_condition() {
                write!(f, " ON {}", join.condition)?;
            }
        }
        if self.has_where() {
            write!(f, " WHERE {}", self.where_clause)?;
        }
        write!(f, ";")
    }
}
