use crate::error::{LoaderError, Result};

/// Database connection parameters extracted from a connection descriptor.
///
/// A descriptor is a space-separated list of `key=value` tokens, values
/// optionally single-quoted, e.g.
/// `"dbname='routing' host='localhost' port='5432' user='postgres'"`.
/// Only `host`, `user`, `port` and `dbname` are forwarded to the client;
/// anything else is retained in `extras` but unused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: Option<String>,
    pub user: Option<String>,
    pub port: Option<String>,
    pub dbname: Option<String>,
    pub extras: std::collections::HashMap<String, String>,
}

impl ConnectionParams {
    /// Parse a connection descriptor.
    ///
    /// An empty descriptor yields an empty parameter set. A token that does
    /// not split into exactly one `key=value` pair is an error. Duplicate
    /// keys are allowed; the last occurrence wins.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let mut params = Self::default();
        for token in tokenize(descriptor)? {
            let (key, raw) = match token.split_once('=') {
                Some(pair) if !pair.0.is_empty() => pair,
                _ => {
                    return Err(LoaderError::MalformedConnectionString {
                        token: token.clone(),
                    });
                }
            };
            let value = if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
                raw[1..raw.len() - 1].to_string()
            } else if raw.contains('=') || raw.contains('\'') {
                // unquoted values carry no escaping, so a second `=` or a stray
                // quote means the token is not a single key=value pair
                return Err(LoaderError::MalformedConnectionString {
                    token: token.clone(),
                });
            } else {
                raw.to_string()
            };
            match key {
                "host" => params.host = Some(value),
                "user" => params.user = Some(value),
                "port" => params.port = Some(value),
                "dbname" => params.dbname = Some(value),
                _ => {
                    params.extras.insert(key.to_string(), value);
                }
            }
        }
        Ok(params)
    }

    /// Build the client invocation arguments.
    ///
    /// One flag per present parameter, always in host, user, port, dbname
    /// order; absent parameters are simply omitted.
    pub fn to_args(&self) -> Vec<String> {
        let flags = [
            ("--host", &self.host),
            ("--username", &self.user),
            ("--port", &self.port),
            ("--dbname", &self.dbname),
        ];
        flags
            .iter()
            .filter_map(|(flag, value)| value.as_ref().map(|v| format!("{}={}", flag, v)))
            .collect()
    }
}

/// Split a descriptor on spaces, keeping single-quoted spans intact.
fn tokenize(descriptor: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in descriptor.chars() {
        match c {
            '\'' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(LoaderError::MalformedConnectionString { token: current });
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_descriptor() {
        let params =
            ConnectionParams::parse("dbname='routing' host='localhost' port='5432' user='postgres'")
                .unwrap();
        assert_eq!(params.dbname.as_deref(), Some("routing"));
        assert_eq!(params.host.as_deref(), Some("localhost"));
        assert_eq!(params.port.as_deref(), Some("5432"));
        assert_eq!(params.user.as_deref(), Some("postgres"));
        assert!(params.extras.is_empty());
    }

    #[test]
    fn test_parse_is_order_independent() {
        let a = ConnectionParams::parse("dbname='d' host='h' port='5432' user='u'").unwrap();
        let b = ConnectionParams::parse("user='u' port='5432' host='h' dbname='d'").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_unquoted_values() {
        let params = ConnectionParams::parse("host=db.example.org port=5433").unwrap();
        assert_eq!(params.host.as_deref(), Some("db.example.org"));
        assert_eq!(params.port.as_deref(), Some("5433"));
        assert_eq!(params.dbname, None);
        assert_eq!(params.user, None);
    }

    #[test]
    fn test_parse_quoted_value_with_spaces() {
        let params = ConnectionParams::parse("host='my pg box' dbname=d").unwrap();
        assert_eq!(params.host.as_deref(), Some("my pg box"));
        assert_eq!(params.dbname.as_deref(), Some("d"));
    }

    #[test]
    fn test_parse_retains_unrecognized_keys() {
        let params = ConnectionParams::parse("dbname=d sslmode=require").unwrap();
        assert_eq!(
            params.extras.get("sslmode").map(String::as_str),
            Some("require")
        );
        assert_eq!(params.to_args(), vec!["--dbname=d".to_string()]);
    }

    #[test]
    fn test_parse_last_duplicate_wins() {
        let params = ConnectionParams::parse("host=first host=second").unwrap();
        assert_eq!(params.host.as_deref(), Some("second"));
    }

    #[test]
    fn test_parse_empty_descriptor() {
        let params = ConnectionParams::parse("").unwrap();
        assert_eq!(params, ConnectionParams::default());
        assert!(params.to_args().is_empty());
    }

    #[test]
    fn test_parse_rejects_token_without_equals() {
        let err = ConnectionParams::parse("dbname='d' nonsense").unwrap_err();
        assert!(matches!(
            err,
            LoaderError::MalformedConnectionString { token } if token == "nonsense"
        ));
    }

    #[test]
    fn test_parse_rejects_unquoted_double_equals() {
        let err = ConnectionParams::parse("password=a=b").unwrap_err();
        assert!(matches!(err, LoaderError::MalformedConnectionString { .. }));
    }

    #[test]
    fn test_parse_rejects_unterminated_quote() {
        let err = ConnectionParams::parse("host='oops").unwrap_err();
        assert!(matches!(err, LoaderError::MalformedConnectionString { .. }));
    }

    #[test]
    fn test_args_fixed_order() {
        let params = ConnectionParams::parse("dbname='d' user='u' host='h' port='5432'").unwrap();
        assert_eq!(
            params.to_args(),
            vec![
                "--host=h".to_string(),
                "--username=u".to_string(),
                "--port=5432".to_string(),
                "--dbname=d".to_string(),
            ]
        );
    }

    #[test]
    fn test_args_only_dbname() {
        let params = ConnectionParams::parse("dbname=routing").unwrap();
        assert_eq!(params.to_args(), vec!["--dbname=routing".to_string()]);
    }
}
