use crate::{
    adapter::{AdapterArgs, AdapterConfig, ArgValue},
    error::InternalError,
    marshal::{deserialize_arg, serialize_arg, serialize_args},
};

const CREATE_PREFIX: &str = "CREATE VIRTUAL TABLE ";
const SCHEMA_PREFIX: &str = "main.";

/// Drop an optional `main.` schema qualifier.
#[must_use]
pub fn strip_schema(identifier: &str) -> &str {
    identifier.strip_prefix(SCHEMA_PREFIX).unwrap_or(identifier)
}

/// Double-quote an identifier, doubling embedded quotes.
#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

///
/// VirtualTableDefinition
///
/// A virtual table creation statement: table identifier, adapter module,
/// marshalled constructor arguments and keyword configuration.
///
/// The configuration travels as the last argument token so the statement
/// alone is enough to rebuild the adapter.
///

#[derive(Clone, Debug, PartialEq)]
pub struct VirtualTableDefinition {
    pub table: String,
    pub module: String,
    pub args: AdapterArgs,
    pub config: AdapterConfig,
}

impl VirtualTableDefinition {
    pub fn to_sql(&self) -> Result<String, InternalError> {
        let mut tokens = serialize_args(&self.args)?;
        tokens.push(serialize_arg(&ArgValue::Map(self.config.clone()))?);
        let tokens: Vec<String> = tokens.into_iter().map(|t| format!("'{t}'")).collect();

        Ok(format!(
            "{CREATE_PREFIX}{} USING {}({})",
            quote_identifier(&self.table),
            self.module,
            tokens.join(", ")
        ))
    }

    pub fn parse(sql: &str) -> Result<Self, InternalError> {
        let malformed = || InternalError::marshal_invalid(format!("malformed virtual table statement: {sql}"));

        let rest = sql
            .get(..CREATE_PREFIX.len())
            .filter(|head| head.eq_ignore_ascii_case(CREATE_PREFIX))
            .map(|_| &sql[CREATE_PREFIX.len()..])
            .ok_or_else(malformed)?;
        let (table, rest) = split_quoted_identifier(rest).ok_or_else(malformed)?;
        let rest = rest.trim_start();
        let rest = rest
            .get(..6)
            .filter(|kw| kw.eq_ignore_ascii_case("USING "))
            .map(|_| &rest[6..])
            .ok_or_else(malformed)?;

        let open = rest.find('(').ok_or_else(malformed)?;
        let close = rest.rfind(')').filter(|close| *close > open).ok_or_else(malformed)?;
        let module = rest[..open].trim();
        if module.is_empty() {
            return Err(malformed());
        }

        let body = rest[open + 1..close].trim();
        let mut args = if body.is_empty() {
            Vec::new()
        } else {
            body.split(',')
                .map(|token| {
                    let token = token.trim();
                    let token = token
                        .strip_prefix('\'')
                        .and_then(|t| t.strip_suffix('\''))
                        .unwrap_or(token);
                    deserialize_arg(token)
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let config = match args.pop() {
            Some(ArgValue::Map(config)) => config,
            _ => return Err(malformed()),
        };

        Ok(Self {
            table,
            module: module.to_string(),
            args,
            config,
        })
    }
}

// `"a ""b"""  rest` -> (`a "b"`, `  rest`)
fn split_quoted_identifier(input: &str) -> Option<(String, &str)> {
    let body = input.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if ch != '"' {
            out.push(ch);
            continue;
        }
        if matches!(chars.peek(), Some((_, '"'))) {
            chars.next();
            out.push('"');
            continue;
        }
        return Some((out, &body[i + 1..]));
    }

    None
}
