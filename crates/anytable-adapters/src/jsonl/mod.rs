//! Module: jsonl
//! Responsibility: JSON-lines files as tables, one object per line.
//! Does not own: remote files; only local paths and `file://` URLs.
//!
//! The file is read once when the table opens. Inserts and deletes are
//! applied in memory and the file is rewritten when the table closes,
//! without the deleted rows. Updates fall back to delete + insert.

mod convert;


use anytable_core::{
    adapter::{
        Adapter, AdapterArgs, AdapterConfig, AdapterFactory, ArgValue, Capabilities, Row, RowId,
        RowIdManager, RowStream, ScanRequest, Support, analyze, filter_data, update_order,
    },
    error::InternalError,
    field::{Columns, Field, FieldKind},
    filter::{Direction, FilterKind, Operator, Order},
    value::Value,
};
use serde_json::{Map, Value as Json};
use std::{
    collections::BTreeMap,
    ffi::OsStr,
    fmt,
    fs::{self, File},
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use url::Url;

const EXTENSIONS: [&str; 2] = ["jsonl", "ndjson"];

const INITIAL_COST: f64 = 0.0;
const FILTERING_COST: f64 = 1_000.0;
const SORTING_COST: f64 = 10_000.0;

type Record = BTreeMap<String, Value>;

fn io_error(path: &Path, err: impl fmt::Display) -> InternalError {
    InternalError::adapter_io(format!("{}: {err}", path.display()))
}

/// Local path named by an identifier, if it names one.
fn resolve_path(identifier: &str) -> Option<PathBuf> {
    match Url::parse(identifier) {
        Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
        // single-letter schemes are drive letters
        Ok(url) if url.scheme().len() > 1 => None,
        _ => Some(PathBuf::from(identifier)),
    }
}

fn has_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Whether the first non-blank line parses as a JSON object.
fn sniff(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| serde_json::from_str::<Map<String, Json>>(&line).is_ok())
}

fn read_records(path: &Path) -> Result<Vec<Record>, InternalError> {
    let file = File::open(path).map_err(|err| io_error(path, err))?;
    let mut records = Vec::new();

    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|err| io_error(path, err))?;
        if line.trim().is_empty() {
            continue;
        }

        let object: Map<String, Json> = serde_json::from_str(&line).map_err(|err| {
            InternalError::adapter_io(format!("{}:{}: {err}", path.display(), number + 1))
        })?;
        records.push(
            object
                .into_iter()
                .map(|(column, json)| (column, convert::from_json(json)))
                .collect(),
        );
    }

    Ok(records)
}

fn jsonl_field(kind: FieldKind, order: Order) -> Field {
    let mut filters = vec![
        FilterKind::Range,
        FilterKind::Equal,
        FilterKind::NotEqual,
        FilterKind::IsNull,
        FilterKind::IsNotNull,
    ];
    if kind == FieldKind::Text {
        filters.push(FilterKind::Like);
    }

    Field::native(kind)
        .with_filters(filters)
        .with_order(order)
        .with_exact(true)
}

/// Coerce a value into the column kind `analyze` settled on.
fn coerce(kind: FieldKind, value: Value) -> Value {
    match (kind, value) {
        (FieldKind::Float, Value::Integer(v)) => Value::Float(convert::widen(v)),
        (FieldKind::Text, value @ (Value::Null | Value::Text(_))) => value,
        (FieldKind::Text, other) => Value::Text(convert::to_json(&other).to_string()),
        (_, value) => value,
    }
}

/// Columns inferred from the records, which are padded with nulls and
/// coerced to the inferred kinds along the way.
fn infer_columns(records: &mut [Record]) -> Columns {
    let mut names: Vec<String> = Vec::new();
    for record in records.iter() {
        for column in record.keys() {
            if !names.contains(column) {
                names.push(column.clone());
            }
        }
    }

    let kinds = analyze(records.iter().cloned()).kinds;
    for record in records.iter_mut() {
        for name in &names {
            let kind = kinds.get(name).copied().unwrap_or(FieldKind::Text);
            let value = record.remove(name).unwrap_or(Value::Null);
            record.insert(name.clone(), coerce(kind, value));
        }
    }

    let order = analyze(records.iter().cloned()).order;
    names
        .into_iter()
        .map(|name| {
            let kind = kinds.get(&name).copied().unwrap_or(FieldKind::Text);
            let order = order.get(&name).copied().unwrap_or(Order::None);
            (name, jsonl_field(kind, order))
        })
        .collect()
}

/// Columns for a file with no rows yet, from the `columns` key.
fn configured_columns(config: &AdapterConfig) -> Result<Option<Columns>, InternalError> {
    let Some(columns) = config.get("columns") else {
        return Ok(None);
    };
    let columns = columns
        .as_map()
        .ok_or_else(|| InternalError::adapter_invalid("jsonl: `columns` must map names to types"))?;

    columns
        .iter()
        .map(|(name, kind)| {
            let kind = kind
                .as_str()
                .and_then(FieldKind::from_type_name)
                .filter(|kind| {
                    matches!(
                        kind,
                        FieldKind::Boolean | FieldKind::Float | FieldKind::Integer | FieldKind::Text
                    )
                })
                .ok_or_else(|| {
                    InternalError::adapter_invalid(format!(
                        "jsonl: column '{name}' must be INTEGER, REAL, TEXT or BOOLEAN"
                    ))
                })?;
            Ok::<_, InternalError>((name.clone(), jsonl_field(kind, Order::None)))
        })
        .collect::<Result<Columns, _>>()
        .map(Some)
}

///
/// JsonLinesAdapter
///
/// Physical rows never move until the file is rewritten; `ids` marks
/// which of them are still live.
///

pub struct JsonLinesAdapter {
    path: PathBuf,
    columns: Columns,
    records: Vec<Record>,
    ids: RowIdManager,
    modified: bool,
    dropped: bool,
}

impl JsonLinesAdapter {
    pub fn open(path: PathBuf, config: &AdapterConfig) -> Result<Self, InternalError> {
        info!(path = %path.display(), "opening JSON-lines file");

        let mut records = if path.exists() {
            read_records(&path)?
        } else {
            Vec::new()
        };
        let columns = if records.is_empty() {
            configured_columns(config)?.ok_or_else(|| {
                io_error(&path, "no rows to infer columns from and no `columns` configured")
            })?
        } else {
            infer_columns(&mut records)
        };
        debug!(path = %path.display(), rows = records.len(), columns = columns.len(), "read JSON-lines file");

        Ok(Self {
            ids: RowIdManager::with_rows(records.len()),
            path,
            columns,
            records,
            modified: false,
            dropped: false,
        })
    }

    fn live(&self) -> impl Iterator<Item = (RowId, &Record)> {
        self.ids
            .iter()
            .zip(&self.records)
            .filter_map(|(rowid, record)| rowid.map(|rowid| (rowid, record)))
    }

    /// Re-derive each column's order after appending `record`.
    fn refresh_order(&mut self, previous: Option<&Record>, record: &Record) {
        let num_rows = self.ids.live().count();

        self.columns = self
            .columns
            .iter()
            .map(|column| {
                let order = previous.map_or(Order::None, |previous| {
                    update_order(
                        column.field.order(),
                        previous.get(&column.name).unwrap_or(&Value::Null),
                        record.get(&column.name).unwrap_or(&Value::Null),
                        num_rows,
                    )
                });
                (column.name.clone(), column.field.clone().with_order(order))
            })
            .collect();
    }

    fn flush(&self) -> Result<usize, InternalError> {
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut file = NamedTempFile::new_in(dir).map_err(|err| io_error(&self.path, err))?;

        let mut written = 0;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            for (_, record) in self.live() {
                serde_json::to_writer(&mut writer, &convert::record_to_json(record))
                    .map_err(|err| io_error(&self.path, err))?;
                writer
                    .write_all(b"\n")
                    .map_err(|err| io_error(&self.path, err))?;
                written += 1;
            }
            writer.flush().map_err(|err| io_error(&self.path, err))?;
        }

        file.persist(&self.path)
            .map_err(|err| io_error(&self.path, err.error))?;

        Ok(written)
    }
}

impl Adapter for JsonLinesAdapter {
    fn columns(&self) -> &Columns {
        &self.columns
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
            .with_limit_offset()
            .with_requested_columns()
            .with_insert_delete()
            .with_drop()
    }

    fn metadata(&self) -> BTreeMap<String, Value> {
        let rows = self.ids.live().count();

        BTreeMap::from([
            ("path".to_string(), Value::Text(self.path.display().to_string())),
            ("rows".to_string(), Value::Integer(i64::try_from(rows).unwrap_or(i64::MAX))),
        ])
    }

    // Filtering streams in one pass; sorting buffers every row.
    #[expect(clippy::cast_precision_loss)]
    fn estimate_cost(&self, filtered: &[(String, Operator)], order: &[(String, Direction)]) -> f64 {
        let filtering = if filtered.is_empty() { 0.0 } else { FILTERING_COST };

        SORTING_COST.mul_add(order.len() as f64, INITIAL_COST + filtering)
    }

    fn get_data(&mut self, request: &ScanRequest) -> Result<RowStream<'_>, InternalError> {
        let rows = self.live().map(|(rowid, record)| {
            Ok(Row {
                rowid: Some(rowid),
                values: record.clone(),
            })
        });

        Ok(filter_data(rows, request))
    }

    fn insert_data(&mut self, row: Row) -> Result<RowId, InternalError> {
        let previous = self.live().last().map(|(_, record)| record.clone());
        let rowid = self.ids.insert(row.rowid)?;

        let mut record = row.values;
        for column in self.columns.names() {
            record.entry(column.to_string()).or_insert(Value::Null);
        }
        self.refresh_order(previous.as_ref(), &record);
        self.records.push(record);
        self.modified = true;
        debug!(path = %self.path.display(), rowid, "appended row");

        Ok(rowid)
    }

    fn delete_data(&mut self, rowid: RowId) -> Result<(), InternalError> {
        self.ids.delete(rowid)?;
        self.modified = true;
        debug!(path = %self.path.display(), rowid, "deleted row");

        Ok(())
    }

    fn drop_table(&mut self) -> Result<(), InternalError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(io_error(&self.path, err)),
        }
        info!(path = %self.path.display(), "removed JSON-lines file");

        self.dropped = true;
        self.records.clear();
        self.ids = RowIdManager::with_rows(0);

        Ok(())
    }

    /// Rewrite the file without deleted rows, if anything changed.
    fn close(&mut self) -> Result<(), InternalError> {
        if self.dropped || !self.modified {
            return Ok(());
        }

        let rows = self.flush()?;
        self.modified = false;
        info!(path = %self.path.display(), rows, "flushed JSON-lines file");

        Ok(())
    }
}

///
/// JsonLinesFactory
///
/// A `.jsonl` or `.ndjson` path is claimed on the fast pass, before the
/// file needs to exist. Any other path is sniffed on the slow pass.
///

#[derive(Debug, Default)]
pub struct JsonLinesFactory;

impl AdapterFactory for JsonLinesFactory {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn supports(&self, identifier: &str, fast: bool, _config: &AdapterConfig) -> Support {
        let Some(path) = resolve_path(identifier) else {
            return Support::No;
        };

        if has_extension(&path) {
            Support::Yes
        } else if fast {
            Support::Maybe
        } else if sniff(&path) {
            Support::Yes
        } else {
            Support::No
        }
    }

    fn parse_identifier(&self, identifier: &str) -> Result<AdapterArgs, InternalError> {
        let path = resolve_path(identifier).ok_or_else(|| {
            InternalError::adapter_invalid(format!("not a local file identifier: {identifier}"))
        })?;

        Ok(vec![ArgValue::Text(path.to_string_lossy().into_owned())])
    }

    fn create(&self, args: &AdapterArgs, config: &AdapterConfig) -> Result<Box<dyn Adapter>, InternalError> {
        let path = args
            .first()
            .and_then(ArgValue::as_str)
            .ok_or_else(|| InternalError::adapter_invalid("jsonl: expected a path argument"))?;

        Ok(Box::new(JsonLinesAdapter::open(PathBuf::from(path), config)?))
    }
}
