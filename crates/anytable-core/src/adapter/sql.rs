use crate::{
    adapter::ScanRequest,
    error::InternalError,
    field::{Columns, Field},
    filter::Filter,
    value::Value,
};
use std::collections::BTreeMap;

///
/// SqlOptions
///
/// Target of a generated query. `column_map` renames engine columns to
/// the names the remote side expects.
///

#[derive(Clone, Debug, Default)]
pub struct SqlOptions {
    pub table: Option<String>,
    pub alias: Option<String>,
    pub column_map: BTreeMap<String, String>,
}

/// Render a scan request as a query for adapters that front a SQL-ish API.
///
/// Fails on `Filter::Impossible`; adapters should short-circuit those
/// before building a query.
pub fn build_sql(columns: &Columns, request: &ScanRequest, options: &SqlOptions) -> Result<String, InternalError> {
    let mut sql = String::from("SELECT *");
    if let Some(table) = &options.table {
        sql.push_str(" FROM ");
        sql.push_str(table);
        if let Some(alias) = &options.alias {
            sql.push_str(" AS ");
            sql.push_str(alias);
        }
    }

    let mut conditions = Vec::new();
    for (column, filter) in &request.bounds {
        let field = columns
            .get(column)
            .ok_or_else(|| InternalError::adapter_invalid(format!("unknown column '{column}'")))?;
        conditions.extend(condition(column_name(options, column), field, filter)?);
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    if !request.order.is_empty() {
        let keys: Vec<String> = request
            .order
            .iter()
            .map(|(column, direction)| format!("{} {direction}", column_name(options, column)))
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&keys.join(", "));
    }

    if let Some(limit) = request.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = request.offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }

    Ok(sql)
}

fn column_name<'a>(options: &'a SqlOptions, column: &'a str) -> &'a str {
    options.column_map.get(column).map_or(column, String::as_str)
}

/// Conditions for one column's filter, values quoted by the column field.
pub fn condition(column: &str, field: &Field, filter: &Filter) -> Result<Vec<String>, InternalError> {
    let conditions = match filter {
        Filter::Impossible => {
            return Err(InternalError::filter_invalid(format!(
                "impossible filter on column '{column}' cannot be rendered"
            )));
        }
        Filter::Equal(value) => vec![format!("{column} = {}", field.quote(value))],
        Filter::NotEqual(value) => vec![format!("{column} != {}", field.quote(value))],
        Filter::IsNull => vec![format!("{column} IS NULL")],
        Filter::IsNotNull => vec![format!("{column} IS NOT NULL")],
        Filter::Like(pattern) => vec![format!(
            "{column} LIKE {}",
            field.quote(&Value::Text(pattern.pattern().to_string()))
        )],
        Filter::Range(range) => {
            if let Some(point) = range.point() {
                vec![format!("{column} = {}", field.quote(point))]
            } else {
                let mut parts = Vec::new();
                if let Some(start) = &range.start {
                    let op = if range.include_start { ">=" } else { ">" };
                    parts.push(format!("{column} {op} {}", field.quote(start)));
                }
                if let Some(end) = &range.end {
                    let op = if range.include_end { "<=" } else { "<" };
                    parts.push(format!("{column} {op} {}", field.quote(end)));
                }
                parts
            }
        }
    };

    Ok(conditions)
}
