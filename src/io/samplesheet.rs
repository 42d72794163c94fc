//! Illumina Experiment Manager style sample sheets.

use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use fs_err as fs;
use std::path::{Path, PathBuf};

use crate::error::DemuxError;
use crate::model::ConfigRow;

pub const DATA_COLUMNS: [&str; 6] = [
    "Lane",
    "Sample_ID",
    "Sample_Name",
    "Sample_Project",
    "index",
    "index2",
];

/// What happened when a sheet was asked to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetOutcome {
    Written(PathBuf),
    /// Nothing to demultiplex; no file was touched.
    NoRecords,
}

/// In-memory sheet. Built once, transformed in stages, written once.
///
/// Sheets read from disk keep everything above the column line verbatim,
/// plus any columns beyond [`DATA_COLUMNS`] in their original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSheet {
    /// Text before the column line (`[Header]` ... `[Data]\n`).
    pub preamble: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<ConfigRow>,
}

impl SampleSheet {
    /// A fresh sheet dated today.
    pub fn new(rows: Vec<ConfigRow>, preamble: bool) -> Self {
        Self::dated(rows, preamble, Local::now().date_naive())
    }

    pub fn dated(rows: Vec<ConfigRow>, preamble: bool, date: NaiveDate) -> Self {
        Self {
            preamble: preamble.then(|| render_preamble(date)),
            columns: DATA_COLUMNS.map(String::from).to_vec(),
            rows,
        }
    }

    pub fn has_preamble(&self) -> bool {
        self.preamble.is_some()
    }

    pub fn render(&self) -> Result<String> {
        let mut wtr = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(self.record(row))?;
        }
        let table = wtr.into_inner().map_err(|e| e.into_error())?;
        let mut text = self.preamble.clone().unwrap_or_default();
        text += std::str::from_utf8(&table)?;
        Ok(text)
    }

    /// One output record in column order.
    fn record(&self, row: &ConfigRow) -> Vec<String> {
        let mut extra = row.extra.iter();
        self.columns
            .iter()
            .map(|c| match c.as_str() {
                "Lane" => row.lane.to_string(),
                "Sample_ID" => row.sample_id.clone(),
                "Sample_Name" => row.sample_name.clone(),
                "Sample_Project" => row.project.clone(),
                "index" => row.index1.clone(),
                "index2" => row.index2.clone(),
                _ => extra.next().cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// Overwrites `path`. An empty row set is reported, not written.
    pub fn write(&self, path: &Path) -> Result<SheetOutcome> {
        if self.rows.is_empty() {
            log::warn!("no records to write to {}", path.display());
            return Ok(SheetOutcome::NoRecords);
        }
        fs::write(path, self.render()?)?;
        log::info!("wrote {} sample sheet rows to {}", self.rows.len(), path.display());
        Ok(SheetOutcome::Written(path.to_path_buf()))
    }

    /// Parse a sheet written by us or by hand.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DemuxError::missing("sample sheet", path).into());
        }
        let text = fs::read_to_string(path)?;
        Self::parse(&text).with_context(|| format!("parse sample sheet {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self, DemuxError> {
        let bad = |reason: String| DemuxError::SheetFormat {
            what: "sample sheet".into(),
            path: PathBuf::from("<text>"),
            reason,
        };

        let start = column_line_offset(text)
            .ok_or_else(|| bad("no Lane,Sample_ID,... column line".into()))?;
        let preamble = (start > 0).then(|| text[..start].to_string());

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text[start..].as_bytes());
        let columns: Vec<String> = rdr
            .headers()
            .map_err(|e| bad(e.to_string()))?
            .iter()
            .map(String::from)
            .collect();

        let at = |name: &str| columns.iter().position(|c| c == name);
        let lane_at = at("Lane").ok_or_else(|| bad("no Lane column".into()))?;
        let id_at = at("Sample_ID").ok_or_else(|| bad("no Sample_ID column".into()))?;
        let known = [
            Some(lane_at),
            Some(id_at),
            at("Sample_Name"),
            at("Sample_Project"),
            at("index"),
            at("index2"),
        ];
        let extra_at: Vec<usize> = (0..columns.len())
            .filter(|i| !DATA_COLUMNS.contains(&columns[*i].as_str()))
            .collect();

        let mut rows = Vec::new();
        for (n, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| bad(e.to_string()))?;
            // spreadsheet exports pad the data block with rows of bare commas
            if record.iter().all(str::is_empty) {
                continue;
            }
            let field = |i: Option<usize>| {
                i.and_then(|i| record.get(i))
                    .unwrap_or_default()
                    .to_string()
            };
            let lane = field(known[0])
                .parse::<u32>()
                .map_err(|e| bad(format!("data row {}: Lane: {e}", n + 1)))?;
            rows.push(ConfigRow {
                lane,
                sample_id: field(known[1]),
                sample_name: field(known[2]),
                project: field(known[3]),
                index1: field(known[4]),
                index2: field(known[5]),
                extra: extra_at.iter().map(|&i| field(Some(i))).collect(),
            });
        }

        Ok(Self {
            preamble,
            columns,
            rows,
        })
    }
}

fn column_line_offset(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_start().starts_with("Lane,") {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// `[Header]` through `[Data]`; the date is M/D/YYYY without padding.
pub fn render_preamble(date: NaiveDate) -> String {
    let mut text = String::from("[Header]\n");
    text += &format!("Date,{}/{}/{}\n", date.month(), date.day(), date.year());
    text += "Workflow,GenerateFASTQ\n";
    text += "Application,FASTQ Only\n";
    text += "\n[Settings]\n\n[Data]\n";
    text
}

/// Sheet header for today.
pub fn render_header(preamble: bool) -> String {
    render_header_dated(preamble, Local::now().date_naive())
}

pub fn render_header_dated(preamble: bool, date: NaiveDate) -> String {
    let mut header = if preamble {
        render_preamble(date)
    } else {
        String::new()
    };
    header += &DATA_COLUMNS.join(",");
    header.push('\n');
    header
}
