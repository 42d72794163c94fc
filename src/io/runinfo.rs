//! Read configuration from an instrument run's `RunInfo.xml`.

use anyhow::{anyhow, Context, Result};
use fs_err as fs;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::path::Path;

use crate::error::DemuxError;

/// One `<Read>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadInfo {
    pub number: u32,
    /// Absent or unreadable in some instrument exports.
    pub num_cycles: Option<u32>,
    pub is_indexed: bool,
}

fn attr(e: &BytesStart, key: &str) -> Result<Option<String>> {
    match e.try_get_attribute(key)? {
        Some(a) => Ok(Some(a.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn read_info(e: &BytesStart) -> Result<ReadInfo> {
    let number: u32 = attr(e, "Number")?
        .ok_or_else(|| anyhow!("Read element without Number"))?
        .parse()
        .context("Read Number")?;
    let num_cycles = attr(e, "NumCycles")?.and_then(|v| match v.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            log::warn!("Read {number}: ignoring NumCycles={v:?}");
            None
        }
    });
    Ok(ReadInfo {
        number,
        num_cycles,
        is_indexed: is_indexed(e)?,
    })
}

fn is_indexed(e: &BytesStart) -> Result<bool> {
    Ok(attr(e, "IsIndexedRead")?.as_deref() == Some("Y"))
}

/// Call `f` on every `<Read>` element in document order.
fn for_each_read(xml: &str, mut f: impl FnMut(&BytesStart) -> Result<()>) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Read" => f(&e)?,
            Event::Eof => return Ok(()),
            _ => {}
        }
    }
}

pub fn parse_reads(xml: &str) -> Result<Vec<ReadInfo>> {
    let mut reads = Vec::new();
    for_each_read(xml, |e| {
        reads.push(read_info(e)?);
        Ok(())
    })?;
    Ok(reads)
}

fn load(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(DemuxError::missing("flowcell file RunInfo.xml", path).into());
    }
    Ok(fs::read_to_string(path)?)
}

pub fn read_run_info(path: &Path) -> Result<Vec<ReadInfo>> {
    parse_reads(&load(path)?).with_context(|| format!("parse {}", path.display()))
}

/// Number of `<Read IsIndexedRead="Y">` elements. Only that attribute is
/// looked at.
pub fn count_index_reads_in(xml: &str) -> Result<usize> {
    let mut n = 0;
    for_each_read(xml, |e| {
        n += usize::from(is_indexed(e)?);
        Ok(())
    })?;
    Ok(n)
}

pub fn count_index_reads(path: &Path) -> Result<usize> {
    count_index_reads_in(&load(path)?).with_context(|| format!("parse {}", path.display()))
}

/// `Number | NumCycles | IndexRead` table as logged by `preview`.
pub fn summary_table(reads: &[ReadInfo]) -> String {
    let mut out = String::from("Number | NumCycles | IndexRead\n");
    for r in reads {
        out += &format!(
            "{:<6} | {:<9} | {}\n",
            r.number,
            r.num_cycles.map_or_else(|| "-".to_string(), |n| n.to_string()),
            if r.is_indexed { "Y" } else { "N" }
        );
    }
    out
}
