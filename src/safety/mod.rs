//! Statement classification.
//!
//! Decides whether generated SQL is a mutating (DDL/DML) statement or a
//! read-only query. The decision selects which answer instruction the final
//! stage uses; it does not gate or restrict execution.
//!
//! The check is lexical: a case-insensitive substring search for any of
//! [`MUTATING_KEYWORDS`] anywhere in the text. A read-only query mentioning
//! one of them inside a string literal, identifier or comment (e.g.
//! `SELECT * FROM events WHERE kind = 'CREATE'`) is classified as mutating.

/// Keywords whose presence marks a statement as mutating.
pub const MUTATING_KEYWORDS: [&str; 6] = ["CREATE", "INSERT", "UPDATE", "DELETE", "DROP", "ALTER"];

/// Returns true if `sql` contains any mutating keyword, in any letter-casing.
pub fn is_mutating(sql: &str) -> bool {
    matched_keyword(sql).is_some()
}

/// Returns the first keyword from [`MUTATING_KEYWORDS`] found in `sql`.
pub fn matched_keyword(sql: &str) -> Option<&'static str> {
    let upper = sql.to_uppercase();
    MUTATING_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| upper.contains(keyword))
}
