use crate::error::{LoaderError, Result};

/// Placeholder bindings for SQL templates,
/// e.g. `{"schema": "gis", "srid": "2154"}`.
pub type TemplateBindings = std::collections::HashMap<String, String>;

/// Fill every `%key%` placeholder in `template` from `bindings`.
///
/// Substitution is a single pass: substituted values are never re-scanned for
/// placeholders. A placeholder name is a non-empty run of `[A-Za-z0-9_]`; any
/// `%` that does not open such a placeholder is kept as literal text. A
/// placeholder with no binding is an error; unused bindings are silently
/// ignored.
pub fn fill_template(template: &str, bindings: &TemplateBindings) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if end > 0 && is_placeholder_name(&after[..end]) => {
                let name = &after[..end];
                match bindings.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(LoaderError::MissingPlaceholder {
                            placeholder: name.to_string(),
                        });
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                // literal percent sign
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_placeholder_name(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bindings(pairs: &[(&str, &str)]) -> TemplateBindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fill_single_placeholder() {
        let filled =
            fill_template("select * from %table%;", &bindings(&[("table", "foo")])).unwrap();
        assert_eq!(filled, "select * from foo;");
    }

    #[test]
    fn test_fill_repeated_placeholder() {
        let filled = fill_template(
            "insert into %t% select * from %t%_staging;",
            &bindings(&[("t", "roads")]),
        )
        .unwrap();
        assert_eq!(filled, "insert into roads select * from roads_staging;");
    }

    #[test]
    fn test_fill_missing_binding_fails() {
        let err = fill_template("select * from %table%;", &bindings(&[])).unwrap_err();
        assert!(matches!(
            err,
            LoaderError::MissingPlaceholder { placeholder } if placeholder == "table"
        ));
    }

    #[test]
    fn test_fill_extra_bindings_ignored() {
        let filled = fill_template(
            "select %a%;",
            &bindings(&[("a", "1"), ("unused", "whatever")]),
        )
        .unwrap();
        assert_eq!(filled, "select 1;");
    }

    #[test]
    fn test_fill_is_not_recursive() {
        let filled = fill_template("%a%", &bindings(&[("a", "%b%"), ("b", "nope")])).unwrap();
        assert_eq!(filled, "%b%");
    }

    #[test]
    fn test_literal_percent_survives() {
        let filled = fill_template(
            "select count(*) * 100 / %n% || '%' from t;",
            &bindings(&[("n", "42")]),
        )
        .unwrap();
        assert_eq!(filled, "select count(*) * 100 / 42 || '%' from t;");
    }

    #[test]
    fn test_percent_pair_with_non_name_content_is_literal() {
        let filled = fill_template("like '%foo bar%'", &bindings(&[])).unwrap();
        assert_eq!(filled, "like '%foo bar%'");
    }

    #[test]
    fn test_no_placeholders_passthrough() {
        let sql = "create extension postgis;";
        assert_eq!(fill_template(sql, &bindings(&[])).unwrap(), sql);
    }
}
