use std::fmt;
use std::io::{self, BufRead, Lines};
use std::num::ParseIntError;

use thiserror::Error;

use crate::CoercionError;

/// Marker of the line that separates records.
pub const DELIMITER: &str = "####";
/// Marker of a section header line such as `** Dimensions **`.
pub const SECTION_MARKER: &str = "**";

/// Source label plus 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub source: String,
    pub line: usize,
}

impl Location {
    pub fn new(source: impl Into<String>, line: usize) -> Self {
        Self {
            source: source.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{location}: record '{record}' is missing its {expected}")]
    Truncated {
        location: Location,
        record: String,
        expected: &'static str,
    },
    #[error("{location}: unexpected line '{line}' after record '{record}'")]
    UnexpectedLine {
        location: Location,
        record: String,
        line: String,
    },
    #[error("{location}: record '{record}' declares {declared} values but {found} were read")]
    CountMismatch {
        location: Location,
        record: String,
        declared: usize,
        found: usize,
    },
    #[error("{location}: invalid integer '{value}' for {field} of record '{record}': {source}")]
    InvalidInteger {
        location: Location,
        record: String,
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("{location}: invalid run-length token '{token}' in record '{record}': {source}")]
    InvalidRepeat {
        location: Location,
        record: String,
        token: String,
        #[source]
        source: ParseIntError,
    },
    #[error("{location}: unknown dtype code {code} for record '{record}'")]
    UnknownType {
        location: Location,
        record: String,
        code: i64,
    },
    #[error("{location}: {source} in record '{record}'")]
    ValueCoercion {
        location: Location,
        record: String,
        #[source]
        source: CoercionError,
    },
    #[error("{location}: read failed: {source}")]
    Io {
        location: Location,
        #[source]
        source: io::Error,
    },
}

impl RecordError {
    /// Structural problems: truncation, bad counts, stray lines, bad tokens.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            RecordError::Truncated { .. }
                | RecordError::UnexpectedLine { .. }
                | RecordError::CountMismatch { .. }
                | RecordError::InvalidInteger { .. }
                | RecordError::InvalidRepeat { .. }
        )
    }

    pub fn location(&self) -> &Location {
        match self {
            RecordError::Truncated { location, .. }
            | RecordError::UnexpectedLine { location, .. }
            | RecordError::CountMismatch { location, .. }
            | RecordError::InvalidInteger { location, .. }
            | RecordError::InvalidRepeat { location, .. }
            | RecordError::UnknownType { location, .. }
            | RecordError::ValueCoercion { location, .. }
            | RecordError::Io { location, .. } => location,
        }
    }
}

/// Section announced by a header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Dimensions,
    Parameters,
}

impl SectionKind {
    pub fn header(self) -> &'static str {
        match self {
            SectionKind::Dimensions => "** Dimensions **",
            SectionKind::Parameters => "** Parameters **",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Delimiter,
    /// Header line; `None` when the header names no known section.
    Section(Option<SectionKind>),
    Blank,
    Content(&'a str),
}

pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.contains(DELIMITER) {
        LineKind::Delimiter
    } else if trimmed.contains(SECTION_MARKER) {
        let kind = if trimmed.contains("Dimensions") {
            Some(SectionKind::Dimensions)
        } else if trimmed.contains("Parameters") {
            Some(SectionKind::Parameters)
        } else {
            None
        };
        LineKind::Section(kind)
    } else if trimmed.is_empty() {
        LineKind::Blank
    } else {
        LineKind::Content(trimmed)
    }
}

/// Where a record reader handed control back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// A delimiter line was consumed; the next line starts a record.
    Delimiter,
    /// A section header line was consumed.
    Section(Option<SectionKind>),
    End,
}

/// One value line, either literal or `count*value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueToken<'a> {
    Literal(&'a str),
    Repeat { count: usize, value: &'a str },
}

impl<'a> ValueToken<'a> {
    /// Fails only when the line has a `*` whose left side is not a count.
    pub fn parse(token: &'a str) -> Result<Self, ParseIntError> {
        let token = token.trim();
        match token.split_once('*') {
            Some((count, value)) => Ok(ValueToken::Repeat {
                count: count.trim().parse::<usize>()?,
                value: value.trim(),
            }),
            None => Ok(ValueToken::Literal(token)),
        }
    }
}

/// Forward-only cursor over the lines of one file.
///
/// Record readers pull exactly the lines of their record and report the
/// boundary they stopped at, so the cursor never needs to look ahead.
pub struct LineCursor<R> {
    lines: Lines<R>,
    line_no: usize,
    source: String,
}

impl<R: BufRead> LineCursor<R> {
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of the last line consumed (0 before the first read).
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    pub fn location(&self) -> Location {
        Location::new(self.source.clone(), self.line_no)
    }

    pub fn next_line(&mut self) -> Result<Option<String>, RecordError> {
        match self.lines.next() {
            None => Ok(None),
            Some(Ok(line)) => {
                self.line_no += 1;
                Ok(Some(line))
            }
            Some(Err(source)) => Err(RecordError::Io {
                location: Location::new(self.source.clone(), self.line_no + 1),
                source,
            }),
        }
    }

    /// Collect the leading free-text block.
    ///
    /// The block ends at the first delimiter line, or at the first section
    /// header when `stop_at_section` is set.
    pub fn read_comments(
        &mut self,
        stop_at_section: bool,
    ) -> Result<(String, Boundary), RecordError> {
        let mut comments = String::new();
        while let Some(line) = self.next_line()? {
            match classify_line(&line) {
                LineKind::Delimiter => return Ok((comments, Boundary::Delimiter)),
                LineKind::Section(kind) if stop_at_section => {
                    return Ok((comments, Boundary::Section(kind)))
                }
                _ => {
                    comments.push_str(line.trim());
                    comments.push('\n');
                }
            }
        }
        Ok((comments, Boundary::End))
    }

    /// Advance past blank lines to the next delimiter or section header.
    pub fn next_boundary(&mut self, after_record: &str) -> Result<Boundary, RecordError> {
        while let Some(line) = self.next_line()? {
            match classify_line(&line) {
                LineKind::Delimiter => return Ok(Boundary::Delimiter),
                LineKind::Section(kind) => return Ok(Boundary::Section(kind)),
                LineKind::Blank => continue,
                LineKind::Content(text) => {
                    return Err(RecordError::UnexpectedLine {
                        location: self.location(),
                        record: after_record.to_string(),
                        line: text.to_string(),
                    })
                }
            }
        }
        Ok(Boundary::End)
    }

    /// Skip any lines up to the next delimiter.
    pub fn seek_delimiter(&mut self) -> Result<Boundary, RecordError> {
        while let Some(line) = self.next_line()? {
            match classify_line(&line) {
                LineKind::Delimiter => return Ok(Boundary::Delimiter),
                LineKind::Blank => {}
                _ => tracing::trace!(
                    target: "prms::record",
                    line = self.line_no,
                    "record.skipped_line"
                ),
            }
        }
        Ok(Boundary::End)
    }

    /// Next header line of a record (name, count, dtype...), trimmed.
    pub fn expect_field(
        &mut self,
        record: &str,
        expected: &'static str,
    ) -> Result<String, RecordError> {
        match self.next_line()? {
            Some(line) => match classify_line(&line) {
                LineKind::Content(text) => Ok(text.to_string()),
                _ => Err(self.truncated(record, expected)),
            },
            None => Err(self.truncated(record, expected)),
        }
    }

    /// Next value line of a fixed-count record. Blank lines are empty values.
    pub fn expect_value_line(
        &mut self,
        record: &str,
        expected: &'static str,
    ) -> Result<String, RecordError> {
        match self.next_line()? {
            Some(line) if classify_line(&line) != LineKind::Delimiter => {
                Ok(line.trim().to_string())
            }
            _ => Err(self.truncated(record, expected)),
        }
    }

    pub fn expect_int(&mut self, record: &str, field: &'static str) -> Result<i64, RecordError> {
        let value = self.expect_field(record, field)?;
        value
            .parse::<i64>()
            .map_err(|source| RecordError::InvalidInteger {
                location: self.location(),
                record: record.to_string(),
                field,
                value,
                source,
            })
    }

    pub fn expect_count(
        &mut self,
        record: &str,
        field: &'static str,
    ) -> Result<usize, RecordError> {
        let value = self.expect_field(record, field)?;
        value
            .parse::<usize>()
            .map_err(|source| RecordError::InvalidInteger {
                location: self.location(),
                record: record.to_string(),
                field,
                value,
                source,
            })
    }

    /// Feed each non-blank value line to `sink` until a delimiter or the end
    /// of the stream. `sink` receives the trimmed line and its line number.
    pub fn scan_values<F>(&mut self, mut sink: F) -> Result<Boundary, RecordError>
    where
        F: FnMut(&str, usize) -> Result<(), RecordError>,
    {
        while let Some(line) = self.next_line()? {
            let trimmed = line.trim();
            if trimmed.contains(DELIMITER) {
                return Ok(Boundary::Delimiter);
            }
            if trimmed.is_empty() {
                continue;
            }
            sink(trimmed, self.line_no)?;
        }
        Ok(Boundary::End)
    }

    fn truncated(&self, record: &str, expected: &'static str) -> RecordError {
        RecordError::Truncated {
            location: self.location(),
            record: record.to_string(),
            expected,
        }
    }
}
