use serde::Serialize;

/// Row accounting for one inner join.
///
/// `unmatched_rows` counts left-hand rows that found no partner and were excluded.
/// Because joins may fan out, `output_rows` can exceed `input_rows - unmatched_rows`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub unmatched_rows: usize,
}

impl JoinReport {
    pub fn matched_rows(&self) -> usize {
        self.input_rows - self.unmatched_rows
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CspReport {
    pub csp_join: JoinReport,
    pub address_join: JoinReport,
    pub categories: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IrisReport {
    /// Consumption rows whose street or postal code normalized to an empty key.
    pub incomplete_rows: usize,
    pub reference_join: JoinReport,
    pub zones: usize,
    pub paris_zones: usize,
    pub evry_zones: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicting_zones: Vec<String>,
}
