//! Literal and identifier quoting.

/// A SQL string literal wrapper.
///
/// Display writes the value escaped and quoted with single quotes.
///
/// # Example
/// ```
/// use sparkify::Lit;
/// assert_eq!(format!("{}", Lit("foo")), "'foo'");
/// assert_eq!(format!("{}", Lit("it's")), "'it''s'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "'")
    }
}

/// A SQL identifier wrapper.
///
/// Display writes the value escaped and quoted with double quotes.
///
/// # Example
/// ```
/// use sparkify::Ident;
/// assert_eq!(format!("{}", Ident("time")), "\"time\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// Quote a table name.
///
/// Table names are always quoted: `time` is also a type name. Column names
/// are left bare so the warehouse folds `firstName` and friends to lower
/// case the same way in DDL, COPY and DML.
pub fn quote_ident(name: &str) -> String {
    format!("{}", Ident(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_quote_reserved_table_name() {
        assert_eq!(quote_ident("time"), "\"time\"");
        assert_eq!(quote_ident("users"), "\"users\"");
    }

    proptest! {
        // Whatever goes in, the rendered literal is one closed string token:
        // stripping the outer quotes leaves only doubled quotes behind.
        #[test]
        fn literal_never_terminates_early(s in ".*") {
            let rendered = format!("{}", Lit(&s));
            prop_assert!(rendered.starts_with('\'') && rendered.ends_with('\''));
            let inner = &rendered[1..rendered.len() - 1];
            prop_assert_eq!(inner.replace("''", ""), s.replace('\'', ""));
            prop_assert_eq!(inner.replace("''", "'"), s);
        }
    }
}
