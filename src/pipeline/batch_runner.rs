use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::PipelineError;
use crate::aggregate::{daily_precip_std_climatology, monthly_climatology, split_series};
use crate::bias::{BiasCalculator, Quantity, apply_bias};
use crate::compose::{compose_actual_radiation, reconstruct_overcast_radiation, sum_precip_components};
use crate::config::{Config, DebiasJob, DeriveJob};
use crate::discovery::FileFinder;
use crate::extent::crop;
use crate::grid::calendar::MONTHS_PER_YEAR;
use crate::grid::{GridField, MonthlyClimatology, StdDevClimatology, TimeSeries};
use crate::readers::create_reader;
use crate::utils::log_field_statistics;
use crate::wet_days::estimate_wet_days;
use crate::writers::{GeoTiffWriter, write_gridlist};

pub const GRIDLIST_FILE: &str = "gridlist.txt";

/// Files written by one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutput {
    pub job: String,
    pub files: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct BatchRunner {
    config: Config,
    inputs: FileFinder,
    derived: FileFinder,
    writer: GeoTiffWriter,
    calculator: BiasCalculator,
}

impl BatchRunner {
    pub fn new(config: Config) -> Self {
        BatchRunner {
            inputs: FileFinder::new(config.input_directories().to_vec()),
            derived: FileFinder::new(vec![config.output_directory().to_path_buf()]),
            writer: GeoTiffWriter::new(config.compression_level()),
            calculator: BiasCalculator::new(config.bias_rules().clone()),
            config,
        }
    }

    /// Runs the derive jobs one after another in configured order, then every
    /// bias-correction job in parallel, and finally writes the gridlist.
    pub fn process(&self) -> Result<Vec<JobOutput>, PipelineError> {
        info!(
            derive = self.config.derive().len(),
            debias = self.config.jobs().len(),
            threads = rayon::current_num_threads(),
            "starting batch"
        );

        let mut outputs: Vec<JobOutput> = self
            .config
            .derive()
            .iter()
            .map(|job| self.run_derive(job).map_err(|e| e.in_job(job.output())))
            .collect::<Result<_, _>>()?;

        let debiased: Vec<(JobOutput, GridField)> = self
            .config
            .jobs()
            .par_iter()
            .map(|job| self.run_debias(job).map_err(|e| e.in_job(&job.variable)))
            .collect::<Result<_, _>>()?;

        if let Some((_, grid)) = debiased.first() {
            let path = self.config.output_directory().join(GRIDLIST_FILE);
            write_gridlist(grid, &path)?;
            outputs.push(JobOutput {
                job: GRIDLIST_FILE.to_string(),
                files: vec![path],
            });
        }
        outputs.extend(debiased.into_iter().map(|(output, _)| output));

        let files: usize = outputs.iter().map(|o| o.files.len()).sum();
        info!(files, "batch finished");
        Ok(outputs)
    }

    /// Same as [`BatchRunner::process`] on a dedicated pool of `threads`
    /// threads.
    pub fn process_with_threads(&self, threads: usize) -> Result<Vec<JobOutput>, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        pool.install(|| self.process())
    }

    fn run_derive(&self, job: &DeriveJob) -> Result<JobOutput, PipelineError> {
        info!(output = job.output(), inputs = ?job.inputs(), "deriving variable");
        let derived = match job {
            DeriveJob::PrecipSum {
                convective,
                large_scale,
                unit_factor,
                ..
            } => sum_precip_components(
                &self.read_series(convective, "PRECC")?,
                &self.read_series(large_scale, "PRECL")?,
                *unit_factor,
            )?,
            DeriveJob::OvercastRadiation {
                actual,
                clear_sky,
                cloud_fraction,
                ..
            } => reconstruct_overcast_radiation(
                &self.read_series(actual, "FSDS")?,
                &self.read_series(clear_sky, "FSDSC")?,
                &self.read_series(cloud_fraction, "CLDTOT")?,
            )?,
            DeriveJob::ActualRadiation {
                clear_sky,
                overcast,
                cloud_fraction,
                ..
            } => compose_actual_radiation(
                &self.read_series(clear_sky, "FSDSC")?,
                &self.read_series(overcast, "FSDSCL")?,
                &self.read_series(cloud_fraction, "CLDTOT")?,
            )?,
        };

        let field = self.stamp(derived.into_field());
        let path = self.config.output_directory().join(job.output());
        self.write(&field, &path)?;
        Ok(JobOutput {
            job: job.output().to_string(),
            files: vec![path],
        })
    }

    /// Bias correction of one variable. Returns the written files and the
    /// bias field, whose grid is shared by all outputs of the job.
    fn run_debias(&self, job: &DebiasJob) -> Result<(JobOutput, GridField), PipelineError> {
        info!(variable = job.variable.as_str(), "computing bias");
        let observed_variable = if job.observed_variable.is_empty() {
            job.variable.as_str()
        } else {
            job.observed_variable.as_str()
        };

        let simulated = to_climatology(self.read(&job.simulated_climatology, &job.variable)?)?;
        let observed = to_climatology(self.read(&job.observed, observed_variable)?)?;
        let bias = self
            .calculator
            .compute_bias(&simulated, &job.variable, &observed, &job.observed_variable)?;

        let mut files = Vec::new();
        let bias_path = self
            .config
            .output_directory()
            .join(format!("bias_{}.tif", job.variable));
        self.write(bias.field(), &bias_path)?;
        files.push(bias_path);

        let precip_std = match &job.precip_std {
            Some(pattern) => Some(to_std_climatology(self.read(pattern, "prec_std")?)?),
            None => None,
        };

        if precip_std.is_none() && self.calculator.rules().get(&job.variable)?.quantity == Quantity::Precipitation {
            warn!(
                variable = job.variable.as_str(),
                "no precipitation standard deviation given, wet days are not estimated"
            );
        }

        for pattern in &job.series {
            for path in self.finder_for(pattern).find_all(pattern)? {
                let raw = TimeSeries::new(self.read_path(&path, &job.variable)?)?;
                let corrected = apply_bias(&raw, &bias)?;
                let wet = match &precip_std {
                    Some(precip_std) => Some(estimate_wet_days(
                        &corrected,
                        precip_std,
                        self.config.precip_threshold(),
                    )?),
                    None => None,
                };
                files.extend(self.write_slices(&path, "", corrected)?);
                if let Some(wet) = wet {
                    let wet = TimeSeries::new(wet.to_field())?;
                    files.extend(self.write_slices(&path, "_wet_days", wet)?);
                }
            }
        }

        let grid = bias.climatology().field().clone();
        Ok((
            JobOutput {
                job: job.variable.clone(),
                files,
            },
            grid,
        ))
    }

    /// Writes `series` in slices of the configured length next to each other,
    /// named after `source` with `suffix` and a running index.
    fn write_slices(&self, source: &Path, suffix: &str, series: TimeSeries) -> Result<Vec<PathBuf>, PipelineError> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let series = TimeSeries::new(self.stamp(series.into_field()))?;
        let mut files = Vec::new();
        for (index, slice) in split_series(&series, self.config.chunk_steps())?.iter().enumerate() {
            let path = self
                .config
                .output_directory()
                .join(format!("{stem}{suffix}_{index:06}.tif"));
            self.write(slice.field(), &path)?;
            files.push(path);
        }
        Ok(files)
    }

    /// Outputs of derive jobs are looked up in the output directory, anything
    /// else only in the input directories.
    fn finder_for(&self, pattern: &str) -> &FileFinder {
        if self.config.derive().iter().any(|job| job.output() == pattern) {
            &self.derived
        } else {
            &self.inputs
        }
    }

    fn read(&self, pattern: &str, variable: &str) -> Result<GridField, PipelineError> {
        let path = self.finder_for(pattern).find_one(pattern)?;
        self.read_path(&path, variable)
    }

    /// Reads a field and crops it to the configured region.
    fn read_path(&self, path: &Path, variable: &str) -> Result<GridField, PipelineError> {
        let field = create_reader(path, variable)?.read_data()?;
        match self.config.region() {
            Some(region) => Ok(crop(&field, region)?),
            None => Ok(field),
        }
    }

    fn read_series(&self, pattern: &str, variable: &str) -> Result<TimeSeries, PipelineError> {
        Ok(TimeSeries::new(self.read(pattern, variable)?)?)
    }

    fn stamp(&self, field: GridField) -> GridField {
        let attributes = self.config.attributes_for(field.variable_name());
        field.with_attributes(&attributes)
    }

    fn write(&self, field: &GridField, path: &Path) -> Result<(), PipelineError> {
        self.writer.write(field, path)?;
        log_field_statistics(field);
        Ok(())
    }
}

/// A 12-step field is taken as it is; longer ones are averaged per month.
fn to_climatology(field: GridField) -> Result<MonthlyClimatology, PipelineError> {
    if field.shape().steps == MONTHS_PER_YEAR {
        return Ok(MonthlyClimatology::new(field)?);
    }
    Ok(monthly_climatology(&TimeSeries::new(field)?)?)
}

/// A 12-step field is taken as it is; longer ones are daily precipitation.
fn to_std_climatology(field: GridField) -> Result<StdDevClimatology, PipelineError> {
    if field.shape().steps == MONTHS_PER_YEAR {
        return Ok(StdDevClimatology::new(field)?);
    }
    Ok(daily_precip_std_climatology(&field)?)
}
