use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::aggregate::DEFAULT_SLICE_STEPS;
use crate::bias::BiasRules;
use crate::extent::Extent;
use crate::grid::calendar::MONTHS_PER_YEAR;
use crate::wet_days::DEFAULT_WET_THRESHOLD;

pub mod error;
pub use error::ConfigError;

pub mod jobs;
pub use jobs::{DebiasJob, DeriveJob, VariableRuleEntry};

pub const DEFAULT_COMPRESSION_LEVEL: u8 = 4;

/// NetCDF-style attributes per variable name.
pub type AttributeTable = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone)]
pub struct Config {
    precip_threshold: f64,
    region: Option<Extent>,
    compression_level: u8,
    chunk_steps: usize,
    nc_attributes: AttributeTable,
    bias_rules: BiasRules,
    input_directories: Vec<PathBuf>,
    output_directory: PathBuf,
    jobs: Vec<DebiasJob>,
    derive: Vec<DeriveJob>,
}

// Deserializes through a helper struct, then checks value ranges and grows the
// region by its margin.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            #[serde(default)]
            precip_threshold: Option<f64>,
            #[serde(default)]
            region: Option<[f64; 4]>,
            #[serde(default)]
            region_margin: Option<f64>,
            #[serde(default)]
            compression_level: Option<u8>,
            #[serde(default)]
            chunks: Option<ChunksHelper>,
            #[serde(default)]
            nc_attributes: AttributeTable,
            #[serde(default)]
            variables: BTreeMap<String, VariableRuleEntry>,
            input_directories: Vec<PathBuf>,
            output_directory: PathBuf,
            #[serde(default)]
            jobs: Vec<DebiasJob>,
            #[serde(default)]
            derive: Vec<DeriveJob>,
        }

        #[derive(Deserialize)]
        struct ChunksHelper {
            time: usize,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        let precip_threshold = helper.precip_threshold.unwrap_or(DEFAULT_WET_THRESHOLD);
        if !precip_threshold.is_finite() || precip_threshold < 0.0 {
            return Err(D::Error::custom(ConfigError::PrecipThreshold(precip_threshold)));
        }

        let compression_level = helper.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL);
        if compression_level > 9 {
            return Err(D::Error::custom(ConfigError::CompressionLevel(compression_level)));
        }

        let chunk_steps = helper.chunks.map_or(DEFAULT_SLICE_STEPS, |c| c.time);
        if chunk_steps == 0 || chunk_steps % MONTHS_PER_YEAR != 0 {
            return Err(D::Error::custom(ConfigError::ChunkSize(chunk_steps)));
        }

        let margin = helper.region_margin.unwrap_or(0.0);
        if !margin.is_finite() || margin < 0.0 {
            return Err(D::Error::custom(ConfigError::RegionMargin(margin)));
        }

        // Validate region if present
        let region = match helper.region {
            Some(region) => {
                let extent = Extent::from_array(region)
                    .map_err(|e| D::Error::custom(ConfigError::Region(e)))?;
                Some(if margin > 0.0 { extent.expand(margin) } else { extent })
            }
            None => None,
        };

        if helper.input_directories.is_empty() {
            return Err(D::Error::custom(ConfigError::NoInputDirectories));
        }
        if let Some(job) = helper.jobs.iter().find(|j| j.series.is_empty()) {
            return Err(D::Error::custom(ConfigError::EmptyJob(job.variable.clone())));
        }

        let bias_rules = helper
            .variables
            .into_iter()
            .fold(BiasRules::default(), |rules, (name, entry)| {
                rules.with_rule(&name, entry.into())
            });

        Ok(Config {
            precip_threshold,
            region,
            compression_level,
            chunk_steps,
            nc_attributes: helper.nc_attributes,
            bias_rules,
            input_directories: helper.input_directories,
            output_directory: helper.output_directory,
            jobs: helper.jobs,
            derive: helper.derive,
        })
    }
}

impl Config {
    pub fn new(input_directories: Vec<PathBuf>, output_directory: PathBuf) -> Self {
        Self {
            precip_threshold: DEFAULT_WET_THRESHOLD,
            region: None,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            chunk_steps: DEFAULT_SLICE_STEPS,
            nc_attributes: AttributeTable::new(),
            bias_rules: BiasRules::default(),
            input_directories,
            output_directory,
            jobs: Vec::new(),
            derive: Vec::new(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn with_jobs(mut self, jobs: Vec<DebiasJob>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_derive(mut self, derive: Vec<DeriveJob>) -> Self {
        self.derive = derive;
        self
    }

    pub fn with_region(mut self, region: Option<Extent>) -> Self {
        self.region = region;
        self
    }

    pub fn with_chunk_steps(mut self, chunk_steps: usize) -> Self {
        self.chunk_steps = chunk_steps;
        self
    }

    pub fn precip_threshold(&self) -> f64 {
        self.precip_threshold
    }

    /// Region after growing by the configured margin.
    pub fn region(&self) -> Option<&Extent> {
        self.region.as_ref()
    }

    pub fn compression_level(&self) -> u8 {
        self.compression_level
    }

    pub fn chunk_steps(&self) -> usize {
        self.chunk_steps
    }

    /// Attributes for `variable`, empty if none are configured.
    pub fn attributes_for(&self, variable: &str) -> BTreeMap<String, String> {
        self.nc_attributes.get(variable).cloned().unwrap_or_default()
    }

    pub fn bias_rules(&self) -> &BiasRules {
        &self.bias_rules
    }

    pub fn input_directories(&self) -> &[PathBuf] {
        &self.input_directories
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn jobs(&self) -> &[DebiasJob] {
        &self.jobs
    }

    pub fn derive(&self) -> &[DeriveJob] {
        &self.derive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bias::{CorrectionKind, Quantity};
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn parse(json: &str) -> Result<Config, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let mut file = File::create(&file_path).unwrap();

        let config_data = r#"
    {
        "precip_threshold": 0.2,
        "region": [20, 200, -10, 10],
        "region_margin": 10,
        "compression_level": 6,
        "chunks": {"time": 600},
        "nc_attributes": {"TREFHT": {"long_name": "Air temperature", "units": "K"}},
        "variables": {"TS": {"quantity": "temperature"}},
        "input_directories": ["heap", "cru"],
        "output_directory": "output",
        "jobs": [
            {
                "variable": "TREFHT",
                "series": ["trace.*.TREFHT.*.tif"],
                "simulated_climatology": "modern_trace_TREFHT.tif",
                "observed": "cru_tmp.tif",
                "observed_variable": "tmp"
            }
        ],
        "derive": [
            {"kind": "precip_sum", "convective": "PRECC.tif", "large_scale": "PRECL.tif", "output": "PRECT.tif"}
        ]
    }
    "#;

        file.write_all(config_data.as_bytes()).unwrap();

        let config = Config::from_file(file_path).unwrap();

        assert_eq!(config.precip_threshold(), 0.2);
        assert_eq!(
            config.region(),
            Some(&Extent::new(10.0, 210.0, -20.0, 20.0).unwrap())
        );
        assert_eq!(config.compression_level(), 6);
        assert_eq!(config.chunk_steps(), 600);
        assert_eq!(config.attributes_for("TREFHT")["long_name"], "Air temperature");
        assert!(config.attributes_for("PRECT").is_empty());
        assert_eq!(
            config.bias_rules().get("TS").unwrap().correction,
            CorrectionKind::Additive
        );
        assert_eq!(config.jobs()[0].observed_variable, "tmp");
        assert_eq!(config.jobs()[0].precip_std, None);
        assert_eq!(config.derive().len(), 1);
        assert_eq!(config.output_directory(), Path::new("output"));
    }

    #[test]
    fn test_defaults() {
        let config = parse(r#"{"input_directories": ["."], "output_directory": "out"}"#).unwrap();
        assert_eq!(config.precip_threshold(), DEFAULT_WET_THRESHOLD);
        assert_eq!(config.compression_level(), DEFAULT_COMPRESSION_LEVEL);
        assert_eq!(config.chunk_steps(), 1200);
        assert!(config.region().is_none());
        assert_eq!(
            config.bias_rules().get("CLDTOT").unwrap().quantity,
            Quantity::CloudFraction
        );
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            r#"{"precip_threshold": -1, "input_directories": ["."], "output_directory": "o"}"#,
            r#"{"compression_level": 10, "input_directories": ["."], "output_directory": "o"}"#,
            r#"{"chunks": {"time": 100}, "input_directories": ["."], "output_directory": "o"}"#,
            r#"{"region": [0, 0, -10, 10], "input_directories": ["."], "output_directory": "o"}"#,
            r#"{"region": [0, 10, 10, -10], "input_directories": ["."], "output_directory": "o"}"#,
            r#"{"region_margin": -2, "input_directories": ["."], "output_directory": "o"}"#,
            r#"{"input_directories": [], "output_directory": "o"}"#,
            r#"{"variables": {"X": {"quantity": "wind"}}, "input_directories": ["."], "output_directory": "o"}"#,
        ];
        for case in cases {
            assert!(parse(case).is_err(), "{case}");
        }
    }

    #[test]
    fn test_job_without_series() {
        let err = parse(
            r#"{"input_directories": ["."], "output_directory": "o",
                "jobs": [{"variable": "PRECT", "series": [], "simulated_climatology": "a", "observed": "b"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("PRECT"));
    }
}
