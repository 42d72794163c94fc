//! 10x Genomics index tables: raw i7 sequence → sample index set name
//! (e.g. `SI-GA-A1`).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::error::DemuxError;
use crate::model::ConfigRow;

#[derive(Debug, Deserialize)]
struct TagEntry {
    index: String,
    tag: String,
}

#[derive(Debug, Clone, Default)]
pub struct TagTable {
    by_index: HashMap<String, String>,
}

impl TagTable {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DemuxError::missing("tag table", path).into());
        }
        let f = fs_err::File::open(path)?;
        Self::from_reader(f).with_context(|| format!("read tag table {}", path.display()))
    }

    /// Tab-separated with a header; only the `index` and `tag` columns are used.
    /// When an index appears twice the first tag is kept.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let mut by_index = HashMap::new();
        for entry in rdr.deserialize() {
            let TagEntry { index, tag } = entry?;
            by_index.entry(index).or_insert(tag);
        }
        Ok(Self { by_index })
    }

    pub fn get(&self, index: &str) -> Option<&str> {
        self.by_index.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}

/// Replace every row's raw `index1` with its tag. Rows without a match get
/// an empty `index1`; their sample ids are returned and logged.
pub fn substitute_tags(rows: &mut [ConfigRow], table: &TagTable) -> Vec<String> {
    let mut unmapped = Vec::new();
    for row in rows.iter_mut() {
        // lone samples in a lane carry no barcode to look up
        if row.index1.is_empty() {
            continue;
        }
        match table.get(&row.index1) {
            Some(tag) => row.index1 = tag.to_string(),
            None => {
                unmapped.push(row.sample_id.clone());
                row.index1.clear();
            }
        }
    }
    if !unmapped.is_empty() {
        log::warn!("Samples missing 10x Genomics barcodes are listed below:");
        for s in &unmapped {
            log::warn!("  {s}");
        }
    }
    unmapped
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "index\ttag\tkit\n\
                         ACGTACGT\tSI-GA-A1\tGA\n\
                         TTGGCCAA\tSI-GA-A2\tGA\n\
                         ACGTACGT\tSI-GA-XX\tGA\n";

    fn row(id: &str, i1: &str) -> ConfigRow {
        ConfigRow {
            lane: 2,
            sample_id: id.into(),
            sample_name: format!("{id}_RUN"),
            project: "1480R".into(),
            index1: i1.into(),
            index2: "GGGG".into(),
            extra: Vec::new(),
        }
    }

    #[test]
    fn first_tag_wins() {
        let t = TagTable::from_reader(TABLE.as_bytes()).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get("ACGTACGT"), Some("SI-GA-A1"));
        assert_eq!(t.get("NNNN"), None);
    }

    #[test]
    fn full_coverage_substitution() {
        let t = TagTable::from_reader(TABLE.as_bytes()).unwrap();
        let mut rows = vec![row("A", "ACGTACGT"), row("B", "TTGGCCAA")];
        let before = rows.clone();
        let unmapped = substitute_tags(&mut rows, &t);
        assert!(unmapped.is_empty());
        assert_eq!(rows.len(), before.len());
        assert_eq!(rows[0].index1, "SI-GA-A1");
        assert_eq!(rows[1].index1, "SI-GA-A2");
        for (a, b) in rows.iter().zip(&before) {
            assert_eq!(a.sample_id, b.sample_id);
            assert_eq!(a.index2, b.index2);
        }
    }

    #[test]
    fn one_unmapped_index() {
        let t = TagTable::from_reader(TABLE.as_bytes()).unwrap();
        let mut rows = vec![row("A", "ACGTACGT"), row("B", "CCCCCCCC")];
        let unmapped = substitute_tags(&mut rows, &t);
        assert_eq!(unmapped, ["B"]);
        assert_eq!(rows[1].index1, "");
        assert_eq!(rows[0].index1, "SI-GA-A1");
    }

    #[test]
    fn empty_index_is_left_alone() {
        let t = TagTable::from_reader(TABLE.as_bytes()).unwrap();
        let mut rows = vec![row("A", "")];
        assert!(substitute_tags(&mut rows, &t).is_empty());
        assert_eq!(rows[0].index1, "");
    }

    #[test]
    fn missing_table_file() {
        let err = TagTable::load(Path::new("/no/10x_tags.tsv")).unwrap_err();
        assert!(err.to_string().contains("tag table does not exist"));
    }
}
