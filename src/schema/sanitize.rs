//! Header → identifier normalization.

/// Normalize a raw header into a column identifier.
///
/// Trims the header, turns every run of whitespace into a single `_`, drops every character
/// outside ASCII `[A-Za-z0-9_]`, then lowercases. The result may be empty when the header was
/// made only of symbols; [`super::build_schema`] rejects that case.
pub fn sanitize_column_name(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut in_whitespace = false;
    for c in header.trim().chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::sanitize_column_name;

    #[test]
    fn strips_symbols_and_lowercases() {
        assert_eq!(sanitize_column_name("First Name!"), "first_name");
        assert_eq!(sanitize_column_name("Unit Price ($)"), "unit_price_");
        assert_eq!(sanitize_column_name("ID"), "id");
    }

    #[test]
    fn collapses_whitespace_runs_after_trimming() {
        assert_eq!(sanitize_column_name("  Total  Cost  "), "total_cost");
        assert_eq!(sanitize_column_name("a\t\n b"), "a_b");
    }

    #[test]
    fn whitespace_is_replaced_before_symbols_are_dropped() {
        // "a ! b" -> "a_!_b" -> "a__b"
        assert_eq!(sanitize_column_name("a ! b"), "a__b");
    }

    #[test]
    fn non_ascii_letters_are_dropped() {
        assert_eq!(sanitize_column_name("Café Größe"), "caf_gre");
    }

    #[test]
    fn symbolic_header_becomes_empty() {
        assert_eq!(sanitize_column_name("!!!"), "");
        assert_eq!(sanitize_column_name("   "), "");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let headers = [
            "First Name!",
            "  Total  Cost  ",
            "a ! b",
            "__EMPTY_1",
            "Café",
            "x-y z",
            "",
            "MiXeD\tCase 42",
        ];
        for h in headers {
            let once = sanitize_column_name(h);
            assert_eq!(sanitize_column_name(&once), once, "header {h:?}");
            assert!(once.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }
    }
}
