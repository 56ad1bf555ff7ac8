use crate::{
    data::{Cell, HeaderSample, Row},
    error::IngestError,
};

pub const HEADER_SCAN_ROWS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderCandidateScore {
    pub row_index: usize,
    pub non_null: usize,
    pub strings: usize,
    pub numerics: usize,
}

impl HeaderCandidateScore {
    pub fn for_row(row_index: usize, row: &Row) -> Self {
        let mut score = Self {
            row_index,
            non_null: 0,
            strings: 0,
            numerics: 0,
        };
        for cell in row {
            match cell {
                Cell::Null => continue,
                Cell::Text(_) => score.strings += 1,
                Cell::Number(_) => score.numerics += 1,
                Cell::Boolean(_) => {}
            }
            score.non_null += 1;
        }
        score
    }

    pub fn looks_like_data(&self) -> bool {
        self.numerics > self.strings
    }
}

pub fn score_rows(sample: HeaderSample<'_>) -> Vec<HeaderCandidateScore> {
    sample
        .rows()
        .iter()
        .take(HEADER_SCAN_ROWS)
        .enumerate()
        .map(|(idx, row)| HeaderCandidateScore::for_row(idx, row))
        .collect()
}

pub fn resolve_header_row(sample: HeaderSample<'_>) -> Result<usize, IngestError> {
    if sample.is_empty() {
        return Err(IngestError::HeaderUndetected);
    }
    let mut best_non_null = 0usize;
    let mut header_row = 0usize;
    for score in score_rows(sample) {
        if score.looks_like_data() {
            continue;
        }
        if score.non_null > best_non_null {
            best_non_null = score.non_null;
            header_row = score.row_index;
        }
    }
    Ok(header_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RawTable;
    use proptest::prelude::*;

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|f| Cell::from_field(f)).collect()
    }

    #[test]
    fn text_heavy_row_after_title_rows_wins() {
        let table = RawTable::from_rows(vec![
            row(&["2024", "", "", ""]),
            row(&["", "17", "", ""]),
            row(&["Date", "Account", "Amount", "Memo"]),
            row(&["2024-01-02", "4000", "12.5", "coffee"]),
        ]);
        assert_eq!(resolve_header_row(table.header_sample()).unwrap(), 2);
    }

    #[test]
    fn first_seen_wins_ties() {
        let table = RawTable::from_rows(vec![
            row(&["a", "b"]),
            row(&["c", "d"]),
        ]);
        assert_eq!(resolve_header_row(table.header_sample()).unwrap(), 0);
    }

    #[test]
    fn all_numeric_sample_defaults_to_first_row() {
        let table = RawTable::from_rows(vec![row(&["1", "2"]), row(&["3", "4"])]);
        assert_eq!(resolve_header_row(table.header_sample()).unwrap(), 0);
    }

    #[test]
    fn rows_past_scan_window_are_ignored() {
        let mut rows: Vec<Row> = (0..HEADER_SCAN_ROWS).map(|_| row(&["x", "", ""])).collect();
        rows.push(row(&["a", "b", "c"]));
        let table = RawTable::from_rows(rows);
        assert_eq!(resolve_header_row(table.header_sample()).unwrap(), 0);
    }

    #[test]
    fn empty_sample_is_undetected() {
        let table = RawTable::default();
        let err = resolve_header_row(table.header_sample()).unwrap_err();
        assert!(matches!(err, IngestError::HeaderUndetected));
    }

    #[test]
    fn booleans_count_as_present_but_untyped() {
        let score = HeaderCandidateScore::for_row(
            0,
            &vec![Cell::Boolean(true), Cell::Number(1.0), Cell::Null],
        );
        assert_eq!(score.non_null, 2);
        assert_eq!(score.strings, 0);
        assert_eq!(score.numerics, 1);
        assert!(score.looks_like_data());
    }

    proptest! {
        #[test]
        fn header_index_stays_in_scan_window(
            cells in proptest::collection::vec(
                proptest::collection::vec(
                    prop_oneof![Just(""), Just("7"), Just("label")],
                    1..6,
                ),
                1..60,
            )
        ) {
            let rows = cells.iter().map(|r| row(r)).collect();
            let table = RawTable::from_rows(rows);
            let sample = table.header_sample();
            let index = resolve_header_row(sample).unwrap();
            prop_assert!(index < HEADER_SCAN_ROWS.min(sample.len()));
        }
    }
}
