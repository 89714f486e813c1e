// SPDX-License-Identifier: Apache-2.0

//! Literal and identifier quoting for generated SQL

/// Quote a string literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote an identifier with backticks, doubling embedded backticks
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `<catalog>.information_schema.<view>` with the catalog quoted
pub fn information_schema(catalog: &str, view: &str) -> String {
    format!("{}.information_schema.{}", quote_ident(catalog), view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_escapes_quotes() {
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
        assert_eq!(quote_literal(""), "''");
    }

    #[test]
    fn ident_escapes_backticks() {
        assert_eq!(quote_ident("my`cat"), "`my``cat`");
        assert_eq!(
            information_schema("demo", "columns"),
            "`demo`.information_schema.columns"
        );
    }
}
