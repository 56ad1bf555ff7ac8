use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::data::Cell;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnResolution {
    pub labels: Vec<String>,
    /// Label → total occurrences, only for labels seen more than once.
    pub duplicate_counts: BTreeMap<String, usize>,
    /// `"{label} (position {n})"` → generated label.
    pub renamed_columns: BTreeMap<String, String>,
}

pub fn header_label(position: usize, cell: &Cell) -> String {
    match cell {
        Cell::Null => format!("column_{}", position + 1),
        other => other.as_display().trim().to_string(),
    }
}

pub fn deduplicate(header: &[Cell]) -> ColumnResolution {
    deduplicate_with_source(header, None)
}

/// Like [`deduplicate`], but non-null cells take their label from `source`
/// (the untyped field text) where it is available.
pub fn deduplicate_with_source(header: &[Cell], source: Option<&[String]>) -> ColumnResolution {
    let base_labels = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| match (cell, source.and_then(|fields| fields.get(idx))) {
            (Cell::Null, _) | (_, None) => header_label(idx, cell),
            (_, Some(text)) => text.trim().to_string(),
        })
        .collect::<Vec<_>>();
    deduplicate_labels(&base_labels)
}

pub fn deduplicate_labels(base_labels: &[String]) -> ColumnResolution {
    let mut taken: HashSet<String> = base_labels.iter().cloned().collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut resolution = ColumnResolution {
        labels: Vec::with_capacity(base_labels.len()),
        ..ColumnResolution::default()
    };

    for (idx, label) in base_labels.iter().enumerate() {
        let occurrence = counts.entry(label.as_str()).or_insert(0);
        *occurrence += 1;
        if *occurrence == 1 {
            resolution.labels.push(label.clone());
            continue;
        }
        let mut suffix = *occurrence;
        let mut candidate = format!("{label}_{suffix}");
        while taken.contains(&candidate) {
            suffix += 1;
            candidate = format!("{label}_{suffix}");
        }
        taken.insert(candidate.clone());
        resolution
            .renamed_columns
            .insert(format!("{label} (position {})", idx + 1), candidate.clone());
        resolution.labels.push(candidate);
    }

    resolution.duplicate_counts = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    resolution
}
