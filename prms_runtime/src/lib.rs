//! Record codec for the PRMS parameter and control file formats.
//!
//! This crate re-exports the data contracts from `prms_schema` and adds the
//! line cursor plus the readers/writers for dimension, parameter and setting
//! records, without depending on the file and model layer in `prms_core`.

pub use prms_schema::*;

pub mod codec;
pub mod record_text;

pub use codec::{ParamRead, ParamRecord, SettingRecord};
pub use record_text::{
    classify_line, Boundary, LineCursor, LineKind, Location, RecordError, SectionKind, ValueToken,
    DELIMITER, SECTION_MARKER,
};
