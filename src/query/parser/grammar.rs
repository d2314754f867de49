// Grammar Patterns
//
// The supported SQL subset is recognized by a single anchored pattern.
// Secondary patterns extract JOIN clauses and classify rejected input.

use once_cell::sync::Lazy;
use regex::Regex;

/// `SELECT <cols> FROM <table> (INNER JOIN <t> ON <t>.<c> = <t>.<c>)* (WHERE <pred>)?`
pub static QUERY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?s)^SELECT\s+(?P<select>[\w\.\s,\*]+)\s+",
        r"FROM\s+(?P<from>\w+)",
        r"(?P<joins>(?:\s+INNER\s+JOIN\s+\w+\s+ON\s+\w+\.\w+\s*=\s*\w+\.\w+)*)",
        r"(?:\s+WHERE\s+(?P<where>.+?))?",
        r";?$",
    ))
    .expect("query pattern must compile")
});

/// One INNER JOIN clause with its equality condition split into parts
pub static JOIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"INNER\s+JOIN\s+(?P<table>\w+)\s+ON\s+",
        r"(?P<lt>\w+)\.(?P<lc>\w+)\s*=\s*(?P<rt>\w+)\.(?P<rc>\w+)",
    ))
    .expect("join pattern must compile")
});

/// Start of any INNER JOIN clause
pub static JOIN_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bINNER\s+JOIN\b").expect("join keyword pattern must compile"));

/// A well-formed INNER JOIN clause followed by the next clause or the end
pub static JOIN_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?s)^INNER\s+JOIN\s+\w+\s+ON\s+\w+\.\w+\s*=\s*\w+\.\w+",
        r"(?:\s+INNER\s+JOIN\b|\s+WHERE\b|\s*$)",
    ))
    .expect("join clause pattern must compile")
});

/// A WHERE keyword with nothing after it
pub static DANGLING_WHERE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\sWHERE\s*$").expect("dangling where pattern must compile"));

/// Text of the first malformed INNER JOIN clause in `query`, if any. The
/// clause text runs up to the next INNER JOIN or WHERE keyword.
pub fn find_malformed_join(query: &str) -> Option<String> {
    let starts: Vec<usize> = JOIN_KEYWORD.find_iter(query).map(|m| m.start()).collect();
    for (i, &start) in starts.iter().enumerate() {
        let rest = &query[start..];
        if JOIN_CLAUSE.is_match(rest) {
            continue;
        }
        let end = starts.get(i + 1).copied().unwrap_or(query.len());
        let clause = &query[start..end];
        let clause = clause.split(" WHERE ").next().unwrap_or(clause);
        return Some(clause.trim().to_string());
    }
    None
}
