//! Parameter files: a comment block, a dimension table and an ordered set of
//! parameters.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use indexmap::{IndexMap, IndexSet};
use prms_runtime::codec::{self, read_dimension, read_param};
use prms_runtime::{Boundary, GridShape, LineCursor, ParamRead, SectionKind};
use serde::Serialize;

use crate::dimensions::DimensionTable;
use crate::error::{PrmsError, PrmsResult};
use crate::parameter::{ActiveUnits, Parameter};
use crate::summary::SummaryRow;

pub const DEFAULT_COMMENTS: &str = "param file written by prms_core\n";

/// Options for [`ParamFile::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Keep only these parameters; every other record is scanned and dropped.
    pub load_only: Option<IndexSet<String>>,
    /// Grid used to reshape parameters whose value count fills it exactly.
    pub grid: Option<GridShape>,
}

impl LoadOptions {
    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_only = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_grid(mut self, grid: GridShape) -> Self {
        self.grid = Some(grid);
        self
    }
}

/// What a load kept, dropped and could not find.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub kept: usize,
    pub skipped: usize,
    /// Requested names that never appeared, in request order.
    pub not_found: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamFile {
    path: PathBuf,
    comments: String,
    dimensions: DimensionTable,
    params: IndexMap<String, Parameter>,
    param_order: Vec<String>,
}

impl ParamFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            comments: DEFAULT_COMMENTS.to_string(),
            dimensions: DimensionTable::new(),
            params: IndexMap::new(),
            param_order: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> PrmsResult<(Self, LoadReport)> {
        let path = path.as_ref();
        let file = File::open(path).map_err(PrmsError::read(path))?;
        Self::read_from(BufReader::new(file), path, options)
    }

    /// Parse a parameter file from any buffered reader; `path` labels the
    /// file in errors and in each parameter's origin.
    pub fn read_from<R: BufRead>(
        reader: R,
        path: impl Into<PathBuf>,
        options: &LoadOptions,
    ) -> PrmsResult<(Self, LoadReport)> {
        let mut file = ParamFile::new(path);
        let mut cursor = LineCursor::new(reader, file.path.display().to_string());
        let mut report = LoadReport::default();
        let mut pending = options.load_only.clone();

        let (comments, mut boundary) = cursor.read_comments(true)?;
        file.comments = comments;
        let mut section = SectionKind::Parameters;

        loop {
            match boundary {
                Boundary::End => break,
                Boundary::Section(kind) => {
                    if let Some(kind) = kind {
                        section = kind;
                    }
                    boundary = cursor.seek_delimiter()?;
                }
                Boundary::Delimiter => match section {
                    SectionKind::Dimensions => {
                        let (name, length) = read_dimension(&mut cursor)?;
                        boundary = cursor.next_boundary(&name)?;
                        file.dimensions.insert(name, length);
                    }
                    SectionKind::Parameters => {
                        if pending.as_ref().is_some_and(IndexSet::is_empty) {
                            break;
                        }
                        let keep =
                            |name: &str| pending.as_ref().map_or(true, |set| set.contains(name));
                        let (read, next) = read_param(&mut cursor, None, keep)?;
                        boundary = next;
                        match read {
                            ParamRead::Kept(record) => {
                                if let Some(set) = pending.as_mut() {
                                    set.shift_remove(&record.name);
                                }
                                let param = Parameter::from_record(
                                    record,
                                    Some(file.path.as_path()),
                                    options.grid,
                                );
                                file.insert(param);
                                report.kept += 1;
                            }
                            ParamRead::Skipped(name) => {
                                file.param_order.push(name);
                                report.skipped += 1;
                            }
                        }
                    }
                },
            }
        }

        if let Some(missing) = pending.filter(|set| !set.is_empty()) {
            report.not_found = missing.into_iter().collect();
            tracing::warn!(
                target: "prms::param_file",
                path = %file.path.display(),
                missing = ?report.not_found,
                "param_file.not_found"
            );
        }
        tracing::debug!(
            target: "prms::param_file",
            path = %file.path.display(),
            kept = report.kept,
            skipped = report.skipped,
            dimensions = file.dimensions.len(),
            "param_file.loaded"
        );
        Ok((file, report))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    /// Replace the comment block. Lines containing `####` or `**` would end
    /// the block early on the next read.
    pub fn set_comments(&mut self, comments: &str) {
        let mut text = comments.trim().to_string();
        text.push('\n');
        self.comments = text;
    }

    pub fn dimensions(&self) -> &DimensionTable {
        &self.dimensions
    }

    pub fn dimensions_mut(&mut self) -> &mut DimensionTable {
        &mut self.dimensions
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn params(&self) -> impl Iterator<Item = &Parameter> + '_ {
        self.params.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.params.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Add or replace a parameter. New names are appended to the write order.
    pub fn insert(&mut self, param: Parameter) -> Option<Parameter> {
        let name = param.name().to_string();
        let previous = self.params.insert(name.clone(), param);
        if previous.is_none() {
            self.param_order.push(name);
        }
        previous
    }

    pub fn remove(&mut self, name: &str) -> Option<Parameter> {
        let removed = self.params.shift_remove(name)?;
        self.param_order.retain(|entry| entry != name);
        Some(removed)
    }

    pub fn param_order(&self) -> &[String] {
        &self.param_order
    }

    pub fn set_param_order(&mut self, order: Vec<String>) {
        self.param_order = order;
    }

    /// Names in the order they will be written.
    ///
    /// The recorded order is used only when it names every stored parameter
    /// exactly once; otherwise names are sorted lexicographically.
    pub fn write_order(&self) -> Vec<&str> {
        let recorded: IndexSet<&str> = self.param_order.iter().map(String::as_str).collect();
        let complete = recorded.len() == self.param_order.len()
            && recorded.len() == self.params.len()
            && recorded.iter().all(|name| self.params.contains_key(*name));
        if complete {
            self.param_order.iter().map(String::as_str).collect()
        } else {
            let mut names: Vec<&str> = self.params.keys().map(String::as_str).collect();
            names.sort_unstable();
            names
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(self.comments.as_bytes())?;
        if !self.comments.is_empty() && !self.comments.ends_with('\n') {
            writeln!(out)?;
        }
        if !self.dimensions.is_empty() {
            codec::write_section_header(out, SectionKind::Dimensions)?;
            for (name, length) in self.dimensions.iter() {
                codec::write_dimension(out, name, length)?;
            }
        }
        if !self.params.is_empty() {
            codec::write_section_header(out, SectionKind::Parameters)?;
            for name in self.write_order() {
                if let Some(param) = self.params.get(name) {
                    codec::write_param(out, param.name(), param.dim_names(), param.values())?;
                }
            }
        }
        Ok(())
    }

    /// Write to this file's own path.
    pub fn write(&self) -> PrmsResult<()> {
        self.write_to_path(&self.path)
    }

    pub fn write_to_path(&self, path: impl AsRef<Path>) -> PrmsResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(PrmsError::write(path))?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)
            .and_then(|_| out.flush())
            .map_err(PrmsError::write(path))?;
        tracing::debug!(
            target: "prms::param_file",
            path = %path.display(),
            params = self.params.len(),
            "param_file.written"
        );
        Ok(())
    }

    pub fn summary(&self, units: Option<&ActiveUnits>) -> Vec<SummaryRow> {
        self.params
            .values()
            .map(|param| SummaryRow::from_parameter(param, units))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prms_runtime::{RecordError, Values};
    use std::io::Cursor;

    const BASIN: &str = "\
Example basin
written by hand
** Dimensions **
####
nhru
3
####
nmonths
12
** Parameters **
####
tmax_allsnow
1
nhru
3
2
32.0
33.0
34.0
####
covden_sum
1
nhru
3
2
0.1
2*0.2
####
hru_type
1
nhru
3
1
1
0
1
";

    fn parse(text: &str, options: &LoadOptions) -> PrmsResult<(ParamFile, LoadReport)> {
        ParamFile::read_from(Cursor::new(text.to_string()), "basin.param", options)
    }

    fn rendered(file: &ParamFile) -> String {
        let mut out = Vec::new();
        file.write_to(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn reads_comments_dimensions_and_params() {
        let (file, report) = parse(BASIN, &LoadOptions::default()).unwrap();
        assert_eq!(file.comments(), "Example basin\nwritten by hand\n");
        assert_eq!(file.dimensions().get("nmonths"), Some(12));
        assert_eq!(report.kept, 3);
        assert_eq!(
            file.get("covden_sum").unwrap().values(),
            &Values::Float(vec![0.1, 0.2, 0.2])
        );
        assert_eq!(file.write_order(), ["tmax_allsnow", "covden_sum", "hru_type"]);
        assert_eq!(
            file.get("hru_type").unwrap().file(),
            Some(Path::new("basin.param"))
        );
    }

    #[test]
    fn selective_load_keeps_only_targets() {
        let options = LoadOptions::default().only(["covden_sum"]);
        let (file, report) = parse(BASIN, &options).unwrap();
        assert_eq!(file.len(), 1);
        assert_eq!(file.get("covden_sum").unwrap().nvalues(), 3);
        assert_eq!(report.skipped, 1);
        assert!(report.not_found.is_empty());
        // Stopped before hru_type once every target was found.
        assert_eq!(report.kept + report.skipped, 2);
    }

    #[test]
    fn selective_load_reports_missing_names() {
        let options = LoadOptions::default().only(["ssr2gw_rate", "hru_type", "snarea_thresh"]);
        let (file, report) = parse(BASIN, &options).unwrap();
        assert_eq!(file.names().collect::<Vec<_>>(), ["hru_type"]);
        assert_eq!(report.not_found, ["ssr2gw_rate", "snarea_thresh"]);
    }

    #[test]
    fn empty_target_set_stops_at_first_parameter() {
        let options = LoadOptions::default().only(Vec::<String>::new());
        let (file, report) = parse(BASIN, &options).unwrap();
        assert!(file.is_empty());
        assert_eq!(file.dimensions().len(), 2);
        assert_eq!(report, LoadReport::default());
    }

    #[test]
    fn selective_load_writes_sorted() {
        let options = LoadOptions::default().only(["tmax_allsnow", "covden_sum"]);
        let (file, _) = parse(BASIN, &options).unwrap();
        assert_eq!(file.param_order().len(), 2);
        assert_eq!(file.write_order(), ["tmax_allsnow", "covden_sum"]);

        let options = LoadOptions::default().only(["hru_type", "tmax_allsnow"]);
        let (file, _) = parse(BASIN, &options).unwrap();
        assert_eq!(file.param_order().len(), 3);
        assert_eq!(file.write_order(), ["hru_type", "tmax_allsnow"]);
    }

    #[test]
    fn short_order_falls_back_to_sorted_names() {
        let (mut file, _) = parse(BASIN, &LoadOptions::default()).unwrap();
        file.set_param_order(vec!["tmax_allsnow".into(), "covden_sum".into()]);
        assert_eq!(file.write_order(), ["covden_sum", "hru_type", "tmax_allsnow"]);
    }

    #[test]
    fn repeated_order_entry_falls_back_to_sorted_names() {
        let (mut file, _) = parse(BASIN, &LoadOptions::default()).unwrap();
        file.set_param_order(vec![
            "hru_type".into(),
            "hru_type".into(),
            "covden_sum".into(),
        ]);
        assert_eq!(file.write_order(), ["covden_sum", "hru_type", "tmax_allsnow"]);

        let (again, _) = parse(&rendered(&file), &LoadOptions::default()).unwrap();
        assert_eq!(again.len(), 3);
        assert!(again.contains("tmax_allsnow"));
    }

    #[test]
    fn text_values_survive_write_and_read() {
        let mut file = ParamFile::new("poi.param");
        file.dimensions_mut().insert("npoigages", 4);
        let names = Values::Text(vec![
            "".into(),
            "2*a".into(),
            "Sagehen Creek".into(),
            "x*y".into(),
        ]);
        file.insert(Parameter::new(
            "poi_name",
            vec!["npoigages".into()],
            names.clone(),
        ));

        let (again, _) = parse(&rendered(&file), &LoadOptions::default()).unwrap();
        assert_eq!(again.get("poi_name").unwrap().values(), &names);
    }

    #[test]
    fn padded_text_value_fails_the_write() {
        let mut file = ParamFile::new("poi.param");
        file.insert(Parameter::new(
            "poi_name",
            vec!["one".into()],
            Values::Text(vec!["  pad".into()]),
        ));
        let err = file.write_to(&mut Vec::<u8>::new()).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn write_then_read_is_stable() {
        let (file, _) = parse(BASIN, &LoadOptions::default()).unwrap();
        let text = rendered(&file);
        let (again, _) = parse(&text, &LoadOptions::default()).unwrap();
        assert_eq!(again, file);
        assert_eq!(rendered(&again), text);
    }

    #[test]
    fn written_layout_has_headers_and_one_value_per_line() {
        let mut file = ParamFile::new("small.param");
        file.set_comments("two hrus");
        file.dimensions_mut().insert("nhru", 2);
        file.insert(Parameter::new(
            "hru_area",
            vec!["nhru".into()],
            Values::Float(vec![1.0, 2.5]),
        ));
        insta::assert_snapshot!(rendered(&file), @r"
        two hrus
        ** Dimensions **
        ####
        nhru
        2
        ** Parameters **
        ####
        hru_area
        1
        nhru
        2
        2
        1.0
        2.5
        ");
    }

    #[test]
    fn grid_option_reshapes_matching_params() {
        let options = LoadOptions::default().with_grid(GridShape::new(1, 3));
        let (file, _) = parse(BASIN, &options).unwrap();
        assert!(file.get("hru_type").unwrap().shape().is_grid());
    }

    #[test]
    fn truncated_record_names_record_and_line() {
        let text = "c\n####\nhru_area\n1\nnhru\n";
        let err = parse(text, &LoadOptions::default()).unwrap_err();
        match err {
            PrmsError::Record(RecordError::Truncated { location, record, .. }) => {
                assert_eq!(record, "hru_area");
                assert_eq!(location.source, "basin.param");
                assert_eq!(location.line, 5);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn remove_drops_tracked_order() {
        let (mut file, _) = parse(BASIN, &LoadOptions::default()).unwrap();
        assert!(file.remove("covden_sum").is_some());
        assert_eq!(file.write_order(), ["tmax_allsnow", "hru_type"]);
        assert!(file.remove("covden_sum").is_none());
    }
}
