//! CSV-backed repository implementation.
//!
//! # Responsibility
//! - Stream a record file line by line and decode rows through the schema.
//! - Append, bulk-write, patch and delete rows.
//!
//! # Invariants
//! - The file's own header row decides the column-to-field mapping on read;
//!   writes of new rows always use schema declaration order.
//! - `load` stops reading at the first match and releases the file handle.
//! - `update`/`delete` copy non-matching rows verbatim and replace the file
//!   via rename only when at least one row matched. The replacement keeps
//!   the original file's permissions.
//! - A row whose key cell fails to parse never matches; it is not an error.

use super::record::{FieldValues, Record};
use super::{FieldAssignments, RepoError, RepoResult, Repository};
use crate::codec::line::QUOTE;
use crate::codec::{escape, format_value, parse_line, parse_value, tokenize, Cell, Value};
use crate::schema::{Field, FieldSpec, Schema};
use log::{debug, error, info};
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Lines, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// Delimiter used when none is configured.
pub const DEFAULT_DELIMITER: char = ',';

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Repository of `E` records stored in one delimited file.
pub struct CsvRepository<E: Record> {
    path: PathBuf,
    delimiter: char,
    _record: PhantomData<fn() -> E>,
}

impl<E: Record> CsvRepository<E> {
    /// Creates a comma-delimited repository bound to `path`.
    ///
    /// The file itself is not touched until the first operation.
    pub fn try_new(path: impl Into<PathBuf>) -> RepoResult<Self> {
        Self::with_delimiter(path, DEFAULT_DELIMITER)
    }

    /// Creates a repository with a custom single-character delimiter.
    ///
    /// # Errors
    /// - `InvalidDelimiter` for `"`, `\n` or `\r`.
    /// - `InvalidSchema` when `E::schema()` fails validation.
    pub fn with_delimiter(path: impl Into<PathBuf>, delimiter: char) -> RepoResult<Self> {
        if matches!(delimiter, QUOTE | '\n' | '\r') {
            return Err(RepoError::InvalidDelimiter(delimiter));
        }
        E::schema().validate().map_err(RepoError::InvalidSchema)?;

        Ok(Self {
            path: path.into(),
            delimiter,
            _record: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Header row written by `insert`/`insert_many`.
    pub fn header_line(&self) -> String {
        join_cells(&E::schema().headers(self.delimiter), self.delimiter)
    }

    /// Opens a lazy record stream.
    ///
    /// The header is validated eagerly; rows are decoded as they are pulled.
    /// Dropping the stream closes the file.
    pub fn iter(&self) -> RepoResult<Records<E>> {
        let mut rows = RowReader::open(&self.path)?;
        let columns = match rows.next().transpose()? {
            Some((_, header)) => Some(ColumnMap::parse(
                E::schema(),
                &header,
                self.delimiter,
                HeaderMode::Strict,
            )?),
            None => None,
        };

        Ok(Records {
            rows,
            columns,
            delimiter: self.delimiter,
            _record: PhantomData,
        })
    }

    fn encode(&self, record: &E) -> String {
        let cells: Vec<String> = E::schema()
            .columns()
            .map(|spec| {
                escape(
                    &format_value(&record.value(spec.field), spec.format()),
                    self.delimiter,
                )
            })
            .collect();
        join_cells(&cells, self.delimiter)
    }

    fn append(&self, record: &E) -> RepoResult<usize> {
        let io_error = |err: io::Error| RepoError::io(&self.path, err);
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(io_error)?;

        let mut out = String::new();
        if file.metadata().map_err(io_error)?.len() == 0 {
            out.push_str(&self.header_line());
            out.push('\n');
        } else if !ends_with_newline(&mut file).map_err(io_error)? {
            out.push('\n');
        }
        out.push_str(&self.encode(record));
        out.push('\n');

        file.write_all(out.as_bytes()).map_err(io_error)?;
        Ok(1)
    }

    fn overwrite(&self, records: &[E]) -> RepoResult<usize> {
        let file = File::create(&self.path).map_err(|err| RepoError::io(&self.path, err))?;
        let mut writer = BufWriter::new(file);

        write_line(&mut writer, &self.header_line(), &self.path)?;
        for record in records {
            write_line(&mut writer, &self.encode(record), &self.path)?;
        }
        writer
            .flush()
            .map_err(|err| RepoError::io(&self.path, err))?;

        Ok(records.len())
    }

    /// Streams the file into a staged copy, applying `edit` to matching rows,
    /// then renames the copy over the original.
    fn rewrite(&self, keys: &[Resolved<E::Field>], edit: RowEdit<'_, E::Field>) -> RepoResult<usize> {
        let mut rows = RowReader::open(&self.path)?;
        let Some((_, header)) = rows.next().transpose()? else {
            return Ok(0);
        };
        let columns = ColumnMap::parse(E::schema(), &header, self.delimiter, HeaderMode::Lenient)?;
        let key_positions = columns.positions(keys)?;
        let patch_positions = match edit {
            RowEdit::Patch(patch) => columns.positions(patch)?,
            RowEdit::Remove => Vec::new(),
        };

        let mut staged =
            NamedTempFile::new_in(self.staging_dir()).map_err(|err| RepoError::io(&self.path, err))?;
        let mut matched = 0;
        {
            let mut writer = BufWriter::new(&mut staged);
            write_line(&mut writer, &header, &self.path)?;

            for row in rows {
                let (_, line) = row?;
                if line.trim().is_empty() {
                    write_line(&mut writer, &line, &self.path)?;
                    continue;
                }

                let cells = tokenize(&line, self.delimiter);
                if !row_matches(keys, &key_positions, &cells) {
                    write_line(&mut writer, &line, &self.path)?;
                    continue;
                }

                matched += 1;
                if let RowEdit::Patch(patch) = edit {
                    let patched = self.patch_line(&cells, patch, &patch_positions);
                    write_line(&mut writer, &patched, &self.path)?;
                }
            }

            writer
                .flush()
                .map_err(|err| RepoError::io(&self.path, err))?;
        }

        if matched == 0 {
            // Dropping the staged file removes it; the original stays untouched.
            return Ok(0);
        }

        // The staged file is created 0600; carry the original's mode over.
        let permissions = std::fs::metadata(&self.path)
            .map_err(|err| RepoError::io(&self.path, err))?
            .permissions();
        staged
            .as_file()
            .set_permissions(permissions)
            .map_err(|err| RepoError::io(&self.path, err))?;
        staged
            .persist(&self.path)
            .map_err(|err| RepoError::io(&self.path, err.error))?;
        Ok(matched)
    }

    /// Re-joins a row, replacing only the patched cells. Untouched cells keep
    /// their original raw text, including any quoting.
    fn patch_line(&self, cells: &[Cell<'_>], patch: &[Resolved<E::Field>], positions: &[usize]) -> String {
        let width = positions
            .iter()
            .map(|index| index + 1)
            .max()
            .unwrap_or(0)
            .max(cells.len());
        let mut out: Vec<String> = (0..width)
            .map(|index| cells.get(index).map_or_else(String::new, |cell| cell.raw.to_string()))
            .collect();

        for (entry, &index) in patch.iter().zip(positions) {
            out[index] = escape(
                &format_value(&entry.value, entry.spec.format()),
                self.delimiter,
            );
        }

        join_cells(&out, self.delimiter)
    }

    fn staging_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn resolve_keys(keys: FieldAssignments<'_, E::Field>) -> RepoResult<Vec<Resolved<E::Field>>> {
        E::schema()
            .fields()
            .iter()
            .filter(|spec| spec.primary_key)
            .map(|spec| {
                let (_, value) = keys
                    .iter()
                    .find(|(field, _)| *field == spec.field)
                    .ok_or(RepoError::MissingPrimaryKey(spec.field.name()))?;
                Resolved::new(spec, value.clone())
            })
            .collect()
    }

    fn resolve_patch(patch: FieldAssignments<'_, E::Field>) -> RepoResult<Vec<Resolved<E::Field>>> {
        patch
            .iter()
            .map(|(field, value)| {
                let spec = E::schema()
                    .spec(*field)
                    .filter(|spec| spec.is_persisted() && !spec.primary_key)
                    .ok_or(RepoError::InvalidField(field.name()))?;
                Resolved::new(spec, value.clone())
            })
            .collect()
    }
}

impl<E: Record> Repository<E> for CsvRepository<E> {
    fn all(&self) -> RepoResult<Vec<E>> {
        let started_at = Instant::now();
        let result = self
            .iter()
            .and_then(|records| records.collect::<RepoResult<Vec<E>>>());

        match &result {
            Ok(records) => debug!(
                "event=csv_all module=repo status=ok path={} rows={} duration_ms={}",
                self.path.display(),
                records.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=csv_all module=repo status=error path={} duration_ms={} error_code={}",
                self.path.display(),
                started_at.elapsed().as_millis(),
                err.code()
            ),
        }
        result
    }

    fn load(&self, keys: FieldAssignments<'_, E::Field>) -> RepoResult<Option<E>> {
        let started_at = Instant::now();
        let keys = Self::resolve_keys(keys)?;

        let mut rows = match RowReader::open(&self.path) {
            Ok(rows) => rows,
            Err(err) if err.is_missing_file() => {
                debug!(
                    "event=csv_load module=repo status=ok path={} found=false reason=missing_file",
                    self.path.display()
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let Some((_, header)) = rows.next().transpose()? else {
            return Ok(None);
        };
        let columns = ColumnMap::parse(E::schema(), &header, self.delimiter, HeaderMode::Lenient)?;
        let positions = columns.positions(&keys)?;

        for row in rows {
            let (line_no, line) = row?;
            if line.trim().is_empty() {
                continue;
            }
            let cells = tokenize(&line, self.delimiter);
            if row_matches(&keys, &positions, &cells) {
                let record = decode_row::<E>(&columns, &cells, line_no)?;
                debug!(
                    "event=csv_load module=repo status=ok path={} found=true line={} duration_ms={}",
                    self.path.display(),
                    line_no,
                    started_at.elapsed().as_millis()
                );
                return Ok(Some(record));
            }
        }

        debug!(
            "event=csv_load module=repo status=ok path={} found=false duration_ms={}",
            self.path.display(),
            started_at.elapsed().as_millis()
        );
        Ok(None)
    }

    fn insert(&self, record: &E) -> RepoResult<usize> {
        let started_at = Instant::now();
        let result = self.append(record);
        log_mutation("csv_insert", &self.path, started_at, &result);
        result
    }

    fn insert_many(&self, records: &[E]) -> RepoResult<usize> {
        let started_at = Instant::now();
        let result = self.overwrite(records);
        log_mutation("csv_insert_many", &self.path, started_at, &result);
        result
    }

    fn update(
        &self,
        patch: FieldAssignments<'_, E::Field>,
        keys: FieldAssignments<'_, E::Field>,
    ) -> RepoResult<usize> {
        let started_at = Instant::now();
        let result = Self::resolve_patch(patch).and_then(|patch| {
            let keys = Self::resolve_keys(keys)?;
            self.rewrite(&keys, RowEdit::Patch(&patch))
        });
        log_mutation("csv_update", &self.path, started_at, &result);
        result
    }

    fn delete(&self, keys: FieldAssignments<'_, E::Field>) -> RepoResult<usize> {
        let started_at = Instant::now();
        let result = Self::resolve_keys(keys).and_then(|keys| self.rewrite(&keys, RowEdit::Remove));
        log_mutation("csv_delete", &self.path, started_at, &result);
        result
    }
}

impl<E: Record> Clone for CsvRepository<E> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            delimiter: self.delimiter,
            _record: PhantomData,
        }
    }
}

impl<E: Record> Debug for CsvRepository<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvRepository")
            .field("path", &self.path)
            .field("delimiter", &self.delimiter)
            .finish()
    }
}

/// Lazy stream of decoded records, in file order.
pub struct Records<E: Record> {
    rows: RowReader,
    columns: Option<ColumnMap<E::Field>>,
    delimiter: char,
    _record: PhantomData<fn() -> E>,
}

impl<E: Record> Iterator for Records<E> {
    type Item = RepoResult<E>;

    fn next(&mut self) -> Option<Self::Item> {
        let columns = self.columns.as_ref()?;
        loop {
            let (line_no, line) = match self.rows.next()? {
                Ok(row) => row,
                Err(err) => return Some(Err(err)),
            };
            if line.trim().is_empty() {
                continue;
            }
            let cells = tokenize(&line, self.delimiter);
            return Some(decode_row::<E>(columns, &cells, line_no));
        }
    }
}

/// Numbered physical lines of one file. Line numbers are 1-based.
struct RowReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl RowReader {
    fn open(path: &Path) -> RepoResult<Self> {
        let file = File::open(path).map_err(|err| RepoError::io(path, err))?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }
}

impl Iterator for RowReader {
    type Item = RepoResult<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        self.line_no += 1;
        Some(
            line.map(|line| (self.line_no, line))
                .map_err(|err| RepoError::io(&self.path, err)),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderMode {
    /// Unknown header cells are a `SchemaMismatch`.
    Strict,
    /// Unknown header cells are carried along untouched.
    Lenient,
}

/// Column index -> field association read from a file header.
struct ColumnMap<F: Field> {
    specs: Vec<Option<&'static FieldSpec<F>>>,
}

impl<F: Field> ColumnMap<F> {
    fn parse(schema: &'static Schema<F>, header: &str, delimiter: char, mode: HeaderMode) -> RepoResult<Self> {
        let header = header.strip_prefix(BYTE_ORDER_MARK).unwrap_or(header);
        let mut seen = HashSet::new();
        let mut specs = Vec::new();

        for cell in parse_line(header, delimiter) {
            let spec = schema.by_header(&cell);
            match spec {
                Some(spec) => {
                    if !seen.insert(spec.field) {
                        return Err(RepoError::SchemaMismatch { header: cell });
                    }
                }
                None if mode == HeaderMode::Strict => {
                    return Err(RepoError::SchemaMismatch { header: cell });
                }
                None => {}
            }
            specs.push(spec);
        }

        Ok(Self { specs })
    }

    fn require(&self, spec: &FieldSpec<F>) -> RepoResult<usize> {
        self.specs
            .iter()
            .position(|column| matches!(column, Some(column) if column.field == spec.field))
            .ok_or(RepoError::MissingColumn {
                header: spec.header.unwrap_or_else(|| spec.field.name()),
            })
    }

    fn positions(&self, entries: &[Resolved<F>]) -> RepoResult<Vec<usize>> {
        entries.iter().map(|entry| self.require(entry.spec)).collect()
    }
}

/// A caller-supplied value coerced into its field's declared type.
struct Resolved<F: Field> {
    spec: &'static FieldSpec<F>,
    value: Value,
}

impl<F: Field> Resolved<F> {
    fn new(spec: &'static FieldSpec<F>, value: Value) -> RepoResult<Self> {
        let value = value
            .coerce(spec.value_type, spec.format())
            .map_err(|source| RepoError::ValueParse {
                field: spec.field.name(),
                line: None,
                source,
            })?;
        Ok(Self { spec, value })
    }
}

enum RowEdit<'a, F: Field> {
    Patch(&'a [Resolved<F>]),
    Remove,
}

impl<F: Field> Clone for RowEdit<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: Field> Copy for RowEdit<'_, F> {}

fn row_matches<F: Field>(keys: &[Resolved<F>], positions: &[usize], cells: &[Cell<'_>]) -> bool {
    keys.iter().zip(positions).all(|(key, &index)| {
        cells
            .get(index)
            .and_then(|cell| parse_value(&cell.value, key.spec.value_type, key.spec.format()).ok())
            .is_some_and(|value| value == key.value)
    })
}

fn decode_row<E: Record>(columns: &ColumnMap<E::Field>, cells: &[Cell<'_>], line_no: usize) -> RepoResult<E> {
    let schema = E::schema();
    let mut values = FieldValues::new(schema);

    for spec in schema.columns() {
        let index = columns.require(spec)?;
        let raw = cells.get(index).map_or("", |cell| cell.value.as_str());
        let value = parse_value(raw, spec.value_type, spec.format()).map_err(|source| {
            RepoError::ValueParse {
                field: spec.field.name(),
                line: Some(line_no),
                source,
            }
        })?;
        values.insert(spec.field, value);
    }

    E::from_values(values)
}

fn join_cells(cells: &[String], delimiter: char) -> String {
    let mut buf = [0_u8; 4];
    let separator: &str = delimiter.encode_utf8(&mut buf);
    cells.join(separator)
}

fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn write_line(writer: &mut impl Write, line: &str, path: &Path) -> RepoResult<()> {
    writer
        .write_all(line.as_bytes())
        .and_then(|()| writer.write_all(b"\n"))
        .map_err(|err| RepoError::io(path, err))
}

fn log_mutation(event: &str, path: &Path, started_at: Instant, result: &RepoResult<usize>) {
    match result {
        Ok(rows) => info!(
            "event={event} module=repo status=ok path={} rows={rows} duration_ms={}",
            path.display(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={event} module=repo status=error path={} duration_ms={} error_code={}",
            path.display(),
            started_at.elapsed().as_millis(),
            err.code()
        ),
    }
}
