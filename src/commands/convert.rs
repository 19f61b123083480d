use crate::commands::Out;
use crate::config::{Config, IoSettings};
use crate::convert::check_skipped;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Normalized, OrphanRow, OutputColumns, SkippedRow};
use crate::{output, source, utils, Result};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use tracing::{debug, warn};

const CSV_DELIMITER: u8 = b',';

/// The supported export formats, one per subcommand.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Converter {
    Fineco,
    Paypal,
    N26,
    Unicredit,
}

serde_plain::derive_display_from_serialize!(Converter);
serde_plain::derive_fromstr_from_deserialize!(Converter);

impl Converter {
    /// The extension of the files this converter reads, used when looking in the input directory.
    pub fn extension(&self) -> &'static str {
        match self {
            Converter::Fineco => "xlsx",
            Converter::Paypal | Converter::N26 | Converter::Unicredit => "csv",
        }
    }
}

/// Where a run reads from and writes to, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Files {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl Files {
    pub fn new(
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input,
            output,
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// The explicit input, else the section's `default_input`, else the only file with the
    /// converter's extension in the input directory.
    fn input(&self, converter: Converter, io: &IoSettings) -> Result<PathBuf> {
        if let Some(input) = self.input.as_ref().or(io.default_input.as_ref()) {
            return Ok(input.clone());
        }
        utils::single_file_with_extension(&self.input_dir, converter.extension())
            .pub_result(ErrorType::Config)
    }

    /// The explicit output, else the section's `default_output`, else a timestamped file in the
    /// output directory.
    fn output(&self, converter: Converter, io: &IoSettings, now: NaiveDateTime) -> PathBuf {
        match self.output.as_ref().or(io.default_output.as_ref()) {
            Some(output) => output.clone(),
            None => self.output_dir.join(format!(
                "{converter}_to_firefly_{}.csv",
                now.format("%Y%m%d_%H%M%S")
            )),
        }
    }
}

/// What a conversion run did.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub converter: Converter,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Number of transactions written. More than `processed` when conversions are written as
    /// linked legs.
    pub transactions: usize,
    pub processed: usize,
    pub skipped: Vec<SkippedRow>,
    pub orphans: Vec<OrphanRow>,
}

impl ConversionSummary {
    /// Distinct skip reasons with how many rows each one covers, in order of first appearance.
    pub fn skip_reasons(&self) -> Vec<(&str, usize)> {
        let mut reasons: Vec<(&str, usize)> = Vec::new();
        for skipped in &self.skipped {
            match reasons.iter_mut().find(|(reason, _)| *reason == skipped.reason) {
                Some((_, count)) => *count += 1,
                None => reasons.push((skipped.reason.as_str(), 1)),
            }
        }
        reasons
    }
}

impl Display for ConversionSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Converted {} to {}: {} rows processed, {} rows skipped",
            self.input.display(),
            self.output.display(),
            self.processed,
            self.skipped.len()
        )?;
        if !self.skipped.is_empty() {
            let reasons: Vec<String> = self
                .skip_reasons()
                .into_iter()
                .map(|(reason, count)| format!("{reason}: {count}"))
                .collect();
            write!(f, " ({})", reasons.join("; "))?;
        }
        if self.converter == Converter::Paypal {
            write!(f, ", {} orphan rows", self.orphans.len())?;
        }
        Ok(())
    }
}

/// Converts a Fineco spreadsheet.
pub fn fineco(config: &Config, files: &Files) -> Result<Out<ConversionSummary>> {
    let section = config.fineco()?;
    let input = files.input(Converter::Fineco, &section.io)?;
    debug!("Reading the Fineco statement {}", input.display());
    let sheet = source::read_workbook(&input)?;
    let normalized = crate::convert::fineco::normalize(&sheet, &section)?;
    let run = Run::new(Converter::Fineco, files, &section.io, &section.output_columns);
    run.finish(input, normalized)
}

/// Converts a PayPal activity CSV.
pub fn paypal(config: &Config, files: &Files) -> Result<Out<ConversionSummary>> {
    let section = config.paypal()?;
    let input = files.input(Converter::Paypal, &section.io)?;
    debug!("Reading the PayPal activity {}", input.display());
    let table = source::read_csv(&input, CSV_DELIMITER)?;
    let normalized = crate::convert::paypal::normalize(&table, &section)?;
    let run = Run::new(Converter::Paypal, files, &section.io, &section.output_columns);
    run.finish(input, normalized)
}

/// Converts an N26 CSV export.
pub fn n26(config: &Config, files: &Files) -> Result<Out<ConversionSummary>> {
    let section = config.n26()?;
    let input = files.input(Converter::N26, &section.io)?;
    debug!("Reading the N26 export {}", input.display());
    let table = source::read_csv(&input, CSV_DELIMITER)?;
    let normalized = crate::convert::n26::normalize(&table, &section)?;
    let run = Run::new(Converter::N26, files, &section.io, &section.output_columns);
    run.finish(input, normalized)
}

/// Converts a UniCredit CSV export.
pub fn unicredit(config: &Config, files: &Files) -> Result<Out<ConversionSummary>> {
    let section = config.unicredit()?;
    let input = files.input(Converter::Unicredit, &section.io)?;
    debug!("Reading the UniCredit export {}", input.display());
    let table = source::read_csv(&input, crate::convert::unicredit::DELIMITER)?;
    let normalized = crate::convert::unicredit::normalize(&table, &section)?;
    let run = Run::new(
        Converter::Unicredit,
        files,
        &section.io,
        &section.output_columns,
    );
    run.finish(input, normalized)
}

/// The part of a run that is the same for every converter.
struct Run<'a> {
    converter: Converter,
    files: &'a Files,
    io: &'a IoSettings,
    columns: &'a OutputColumns,
}

impl<'a> Run<'a> {
    fn new(
        converter: Converter,
        files: &'a Files,
        io: &'a IoSettings,
        columns: &'a OutputColumns,
    ) -> Self {
        Self {
            converter,
            files,
            io,
            columns,
        }
    }

    /// Reports problem rows, enforces `max_skipped_rows` and writes the output file.
    fn finish(&self, input: PathBuf, normalized: Normalized) -> Result<Out<ConversionSummary>> {
        let Normalized {
            transactions,
            report,
        } = normalized;
        for skipped in &report.skipped {
            warn!("Skipped {skipped}");
        }
        for orphan in &report.orphans {
            warn!(
                "Unpaired {} {orphan} ({}), not written",
                orphan.kind, orphan.date
            );
        }
        check_skipped(&report, self.io)?;

        let output = self
            .files
            .output(self.converter, self.io, Local::now().naive_local());
        output::write_transactions(&output, self.columns, &transactions)?;

        let summary = ConversionSummary {
            converter: self.converter,
            input,
            output,
            transactions: transactions.len(),
            processed: report.processed,
            skipped: report.skipped,
            orphans: report.orphans,
        };
        Ok(Out::new(summary.to_string(), summary))
    }
}
