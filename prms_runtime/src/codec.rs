//! Readers and writers for the three record kinds.
//!
//! Layouts, one item per line, each record preceded by a `####` line:
//!
//! - dimension: name, length
//! - parameter: name, dimension count, dimension names, value count,
//!   dtype code, values (terminated by the next delimiter or end of stream)
//! - setting: name, value count, dtype code, exactly `count` values
//!
//! Parameter value lines may use `count*value` run-length tokens. Writers
//! always emit one value per line; a parameter text value that is empty or
//! shaped like a run-length token is written as `1*value`.

use std::borrow::Cow;
use std::io::{self, BufRead, Write};

use serde::Serialize;

use crate::record_text::{
    Boundary, LineCursor, Location, RecordError, SectionKind, ValueToken, DELIMITER,
};
use crate::{Dtype, Values};

/// A parameter record as it appears on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamRecord {
    pub name: String,
    pub dim_names: Vec<String>,
    pub values: Values,
}

impl ParamRecord {
    pub fn dtype(&self) -> Dtype {
        self.values.dtype()
    }
}

/// A control-file setting as it appears on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingRecord {
    pub name: String,
    pub values: Values,
}

/// Outcome of reading one parameter record.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamRead {
    Kept(ParamRecord),
    /// Values were scanned and discarded; carries the record name.
    Skipped(String),
}

pub fn read_dimension<R: BufRead>(
    cursor: &mut LineCursor<R>,
) -> Result<(String, usize), RecordError> {
    let name = cursor.expect_field("dimension", "name")?;
    let length = cursor.expect_count(&name, "length")?;
    Ok((name, length))
}

/// Read one parameter record, starting at its name line.
///
/// `known_name` is used instead of reading a name line when the caller already
/// consumed it. When `keep` rejects the name, the remaining lines of the record
/// are still consumed so the cursor ends on the same boundary either way.
pub fn read_param<R, F>(
    cursor: &mut LineCursor<R>,
    known_name: Option<String>,
    keep: F,
) -> Result<(ParamRead, Boundary), RecordError>
where
    R: BufRead,
    F: FnOnce(&str) -> bool,
{
    let name = match known_name {
        Some(name) => name,
        None => cursor.expect_field("parameter", "name")?,
    };
    let ndim = cursor.expect_count(&name, "dimension count")?;
    let mut dim_names = Vec::with_capacity(ndim);
    for _ in 0..ndim {
        dim_names.push(cursor.expect_field(&name, "dimension name")?);
    }
    let declared = cursor.expect_count(&name, "value count")?;

    if !keep(&name) {
        let boundary = cursor.scan_values(|_, _| Ok(()))?;
        return Ok((ParamRead::Skipped(name), boundary));
    }

    let dtype = read_dtype(cursor, &name)?;
    let source = cursor.source().to_string();
    let mut values = Values::empty(dtype);
    let boundary = cursor.scan_values(|token, line| {
        push_token(&mut values, token, &name, declared, || {
            Location::new(source.clone(), line)
        })
    })?;

    if values.len() != declared {
        return Err(RecordError::CountMismatch {
            location: cursor.location(),
            record: name,
            declared,
            found: values.len(),
        });
    }

    Ok((
        ParamRead::Kept(ParamRecord {
            name,
            dim_names,
            values,
        }),
        boundary,
    ))
}

/// Read one control-file setting, starting at its name line.
pub fn read_setting<R: BufRead>(cursor: &mut LineCursor<R>) -> Result<SettingRecord, RecordError> {
    let name = cursor.expect_field("setting", "name")?;
    let count = cursor.expect_count(&name, "value count")?;
    let dtype = read_dtype(cursor, &name)?;
    let mut values = Values::empty(dtype);
    for _ in 0..count {
        let token = cursor.expect_value_line(&name, "value")?;
        let value = dtype
            .parse_token(&token)
            .map_err(|source| RecordError::ValueCoercion {
                location: cursor.location(),
                record: name.clone(),
                source,
            })?;
        values
            .push(value)
            .map_err(|source| RecordError::ValueCoercion {
                location: cursor.location(),
                record: name.clone(),
                source,
            })?;
    }
    Ok(SettingRecord { name, values })
}

fn read_dtype<R: BufRead>(cursor: &mut LineCursor<R>, record: &str) -> Result<Dtype, RecordError> {
    let code = cursor.expect_int(record, "dtype")?;
    Dtype::from_code(code).ok_or_else(|| RecordError::UnknownType {
        location: cursor.location(),
        record: record.to_string(),
        code,
    })
}

fn push_token<L>(
    values: &mut Values,
    token: &str,
    record: &str,
    declared: usize,
    location: L,
) -> Result<(), RecordError>
where
    L: Fn() -> Location,
{
    let dtype = values.dtype();
    let (count, literal) = match ValueToken::parse(token) {
        Ok(ValueToken::Literal(value)) => (1, value),
        Ok(ValueToken::Repeat { count, value }) => (count, value),
        // `*` is ordinary text in a text record unless it prefixes a count.
        Err(_) if dtype == Dtype::Text => (1, token),
        Err(source) => {
            return Err(RecordError::InvalidRepeat {
                location: location(),
                record: record.to_string(),
                token: token.to_string(),
                source,
            })
        }
    };

    let found = values.len().saturating_add(count);
    if found > declared {
        return Err(RecordError::CountMismatch {
            location: location(),
            record: record.to_string(),
            declared,
            found,
        });
    }

    let coerce_err = |source| RecordError::ValueCoercion {
        location: location(),
        record: record.to_string(),
        source,
    };
    let value = dtype.parse_token(literal).map_err(coerce_err)?;
    values.push_repeated(value, count).map_err(coerce_err)
}

pub fn write_section_header<W: Write>(out: &mut W, section: SectionKind) -> io::Result<()> {
    writeln!(out, "{}", section.header())
}

pub fn write_dimension<W: Write>(out: &mut W, name: &str, length: usize) -> io::Result<()> {
    writeln!(out, "{DELIMITER}")?;
    writeln!(out, "{name}")?;
    writeln!(out, "{length}")
}

pub fn write_param<W: Write>(
    out: &mut W,
    name: &str,
    dim_names: &[String],
    values: &Values,
) -> io::Result<()> {
    writeln!(out, "{DELIMITER}")?;
    writeln!(out, "{name}")?;
    writeln!(out, "{}", dim_names.len())?;
    for dim in dim_names {
        writeln!(out, "{dim}")?;
    }
    writeln!(out, "{}", values.len())?;
    writeln!(out, "{}", values.dtype().code())?;
    match values.as_text() {
        Some(texts) => {
            for text in texts {
                writeln!(out, "{}", param_text_line(text)?)?;
            }
        }
        None => {
            for token in values.tokens() {
                writeln!(out, "{token}")?;
            }
        }
    }
    Ok(())
}

pub fn write_setting<W: Write>(out: &mut W, name: &str, values: &Values) -> io::Result<()> {
    writeln!(out, "{DELIMITER}")?;
    writeln!(out, "{name}")?;
    writeln!(out, "{}", values.len())?;
    writeln!(out, "{}", values.dtype().code())?;
    if let Some(texts) = values.as_text() {
        texts.iter().try_for_each(|text| check_text_line(text))?;
    }
    for token in values.tokens() {
        writeln!(out, "{token}")?;
    }
    Ok(())
}

/// Line for one parameter text value. Setting values are read one line per
/// value and need no escaping.
fn param_text_line(text: &str) -> io::Result<Cow<'_, str>> {
    check_text_line(text)?;
    let repeat_shaped = matches!(ValueToken::parse(text), Ok(ValueToken::Repeat { .. }));
    if text.is_empty() || repeat_shaped {
        Ok(Cow::Owned(format!("1*{text}")))
    } else {
        Ok(Cow::Borrowed(text))
    }
}

/// Value lines are trimmed on read and end at a delimiter.
fn check_text_line(text: &str) -> io::Result<()> {
    if text.trim() != text || text.contains(['\n', '\r']) || text.contains(DELIMITER) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("text value {text:?} cannot be written as a single value line"),
        ));
    }
    Ok(())
}
