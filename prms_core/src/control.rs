//! The control file: a closed catalogue of run settings stored with the same
//! record grammar as parameter files, minus dimensions.

use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use indexmap::{IndexMap, IndexSet};
use prms_runtime::codec::{read_setting, write_setting};
use prms_runtime::{Boundary, CoercionError, Dtype, LineCursor, Value, Values};
use serde::{Deserialize, Serialize};

use crate::error::{PrmsError, PrmsResult};

pub const DEFAULT_CONTROL_COMMENTS: &str = "control file written by prms_core\n";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setting {
    name: String,
    values: Values,
}

impl Setting {
    pub fn new(name: impl Into<String>, values: Values) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn dtype(&self) -> Dtype {
        self.values.dtype()
    }
}

fn text(name: &str, values: &[&str]) -> Setting {
    Setting::new(
        name,
        Values::Text(values.iter().map(|value| value.to_string()).collect()),
    )
}

fn int(name: &str, values: &[i64]) -> Setting {
    Setting::new(name, Values::Int(values.to_vec()))
}

/// Recognized settings and their defaults, in catalogue order.
pub fn default_settings() -> Vec<Setting> {
    vec![
        text("executable_model", &["gsflow.exe"]),
        text("model_mode", &["PRMS"]),
        text("capillary_module", &["soilzone_prms"]),
        text("et_module", &["potet_jh"]),
        text("gravity_module", &["soilzone_prms"]),
        text("precip_module", &["precip_1sta"]),
        text("solrad_module", &["ddsolrad"]),
        text("srunoff_module", &["srunoff_smidx"]),
        text("strmflow_module", &["muskingum"]),
        text("temp_module", &["temp_1sta"]),
        text("transp_module", &["transp_tindex"]),
        int("dprst_flag", &[0]),
        int("start_time", &[2000, 1, 1, 0, 0, 0]),
        int("end_time", &[2000, 12, 31, 0, 0, 0]),
        text("data_file", &[]),
        text("param_file", &[]),
        text("model_output_file", &["prms.out"]),
        int("statsON_OFF", &[1]),
        text("statVar_names", &[]),
        int("statVar_element", &[]),
        text("stat_var_file", &["1sta.statvar"]),
        int("csvON_OFF", &[0]),
        text("csv_output_file", &["prms_summary.csv"]),
        int("mapOutON_OFF", &[0]),
        text("mapOutVar_names", &[]),
        text("map_output_file", &["output.map"]),
        int("aniOutON_OFF", &[0]),
        text("aniOutVar_names", &[]),
        text("ani_output_file", &["prms.ani"]),
        int("dispGraphsBuffSize", &[10]),
        int("ndispGraphs", &[0]),
        int("dispVar_plot", &[4]),
        int("dispVar_element", &[4]),
        int("print_debug", &[-1]),
        int("parameter_check_flag", &[1]),
        int("cascade_flag", &[1]),
        int("cascadegw_flag", &[1]),
        int("subbasin_flag", &[1]),
        int("save_vars_to_file", &[0]),
        text("var_save_file", &["var.init"]),
        Setting::new("initial_deltat", Values::Float(vec![24.0])),
        text("stats_output_file", &["prms.stats"]),
        int("init_vars_from_file", &[0]),
    ]
}

/// Six-field simulation timestamp as stored in `start_time`/`end_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTimestamp {
    pub year: i64,
    pub month: i64,
    pub day: i64,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
}

impl SimTimestamp {
    pub fn date(year: i64, month: i64, day: i64) -> Self {
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }

    /// Requires exactly six integral values.
    pub fn from_values(values: &Values) -> Option<Self> {
        match values.to_i64()?.as_slice() {
            &[year, month, day, hour, minute, second] => Some(Self {
                year,
                month,
                day,
                hour,
                minute,
                second,
            }),
            _ => None,
        }
    }

    pub fn to_values(self) -> Values {
        Values::Int(vec![
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        ])
    }
}

impl fmt::Display for SimTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlFile {
    comments: String,
    settings: IndexMap<String, Setting>,
    order: Vec<String>,
}

impl Default for ControlFile {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlFile {
    /// A control file holding every catalogue default. The write order starts
    /// empty, so it writes sorted by name.
    pub fn new() -> Self {
        Self {
            comments: DEFAULT_CONTROL_COMMENTS.to_string(),
            settings: default_settings()
                .into_iter()
                .map(|setting| (setting.name.clone(), setting))
                .collect(),
            order: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> PrmsResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(PrmsError::read(path))?;
        Self::read_from(BufReader::new(file), &path.display().to_string())
    }

    /// Parse a control file. The result holds exactly the parsed settings;
    /// catalogue defaults are not merged in and unknown names are kept.
    pub fn read_from<R: BufRead>(reader: R, source: &str) -> PrmsResult<Self> {
        let mut cursor = LineCursor::new(reader, source);
        let (comments, mut boundary) = cursor.read_comments(false)?;
        let mut control = Self {
            comments,
            settings: IndexMap::new(),
            order: Vec::new(),
        };

        loop {
            match boundary {
                Boundary::End => break,
                Boundary::Section(_) => boundary = cursor.seek_delimiter()?,
                Boundary::Delimiter => {
                    let setting = read_setting(&mut cursor)?;
                    control.insert(Setting::new(setting.name, setting.values));
                    boundary = cursor.seek_delimiter()?;
                }
            }
        }

        tracing::debug!(
            target: "prms::control",
            source,
            settings = control.settings.len(),
            "control.loaded"
        );
        Ok(control)
    }

    fn insert(&mut self, setting: Setting) {
        let name = setting.name.clone();
        if self.settings.insert(name.clone(), setting).is_none() {
            self.order.push(name);
        }
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    pub fn set_comments(&mut self, comments: &str) {
        let mut text = comments.trim().to_string();
        text.push('\n');
        self.comments = text;
    }

    pub fn get(&self, name: &str) -> Option<&Setting> {
        self.settings.get(name)
    }

    pub fn settings(&self) -> impl Iterator<Item = &Setting> + '_ {
        self.settings.values()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Insert or replace a setting, coercing `values` to `dtype`.
    pub fn set(
        &mut self,
        name: &str,
        dtype: Dtype,
        values: Vec<Value>,
    ) -> Result<(), CoercionError> {
        let values = Values::from_values(dtype, values)?;
        self.set_values(name, values);
        Ok(())
    }

    pub fn set_values(&mut self, name: &str, values: Values) {
        self.insert(Setting::new(name, values));
    }

    pub fn remove(&mut self, name: &str) -> Option<Setting> {
        let removed = self.settings.shift_remove(name)?;
        self.order.retain(|entry| entry != name);
        Some(removed)
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn set_order(&mut self, order: Vec<String>) {
        self.order = order;
    }

    /// Same rule as parameter files: the recorded order when it names every
    /// setting exactly once, otherwise sorted names.
    pub fn write_order(&self) -> Vec<&str> {
        let recorded: IndexSet<&str> = self.order.iter().map(String::as_str).collect();
        let complete = recorded.len() == self.order.len()
            && recorded.len() == self.settings.len()
            && recorded.iter().all(|name| self.settings.contains_key(*name));
        if complete {
            self.order.iter().map(String::as_str).collect()
        } else {
            let mut names: Vec<&str> = self.settings.keys().map(String::as_str).collect();
            names.sort_unstable();
            names
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        out.write_all(self.comments.as_bytes())?;
        for name in self.write_order() {
            if let Some(setting) = self.settings.get(name) {
                write_setting(out, setting.name(), setting.values())?;
            }
        }
        Ok(())
    }

    pub fn write(&self, path: impl AsRef<Path>) -> PrmsResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(PrmsError::write(path))?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)
            .and_then(|_| out.flush())
            .map_err(PrmsError::write(path))
    }

    fn texts(&self, name: &str) -> &[String] {
        self.get(name)
            .and_then(|setting| setting.values.as_text())
            .unwrap_or(&[])
    }

    fn first_text(&self, name: &str) -> Option<&str> {
        self.texts(name).first().map(String::as_str)
    }

    fn timestamp(&self, name: &str) -> Option<SimTimestamp> {
        self.get(name)
            .and_then(|setting| SimTimestamp::from_values(&setting.values))
    }

    /// Parameter file entries, as listed (unresolved).
    pub fn param_files(&self) -> &[String] {
        self.texts("param_file")
    }

    pub fn data_files(&self) -> &[String] {
        self.texts("data_file")
    }

    pub fn model_mode(&self) -> Option<&str> {
        self.first_text("model_mode")
    }

    pub fn executable(&self) -> Option<&str> {
        self.first_text("executable_model")
    }

    pub fn start_time(&self) -> Option<SimTimestamp> {
        self.timestamp("start_time")
    }

    pub fn end_time(&self) -> Option<SimTimestamp> {
        self.timestamp("end_time")
    }

    pub fn set_start_time(&mut self, time: SimTimestamp) {
        self.set_values("start_time", time.to_values());
    }

    pub fn set_end_time(&mut self, time: SimTimestamp) {
        self.set_values("end_time", time.to_values());
    }

    pub fn n_stat_vars(&self) -> usize {
        self.texts("statVar_names").len()
    }

    pub fn n_map_out_vars(&self) -> usize {
        self.texts("mapOutVar_names").len()
    }

    pub fn n_ani_out_vars(&self) -> usize {
        self.texts("aniOutVar_names").len()
    }
}
