//! Companion kind listing

use petscale_types::KIND_TABLE;
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliResult;
use crate::output::{self, OutputFormat};

/// Table row for kind display
#[derive(Debug, Serialize, Tabled)]
struct KindRow {
    kind: String,
    model_id: i32,
    row_id: u32,
    selectors: String,
    floor: String,
    overridable: bool,
}

/// List every tracked companion kind
pub fn execute(format: OutputFormat) -> CliResult<()> {
    let rows: Vec<KindRow> = KIND_TABLE
        .iter()
        .map(|info| KindRow {
            kind: info.kind.to_string(),
            model_id: info.model_id,
            row_id: info.row_id,
            selectors: if info.kind.is_custom_eligible() {
                "custom".to_string()
            } else {
                "small/medium/large".to_string()
            },
            floor: info
                .custom_floor
                .map(|f| f.to_string())
                .unwrap_or_else(|| "-".to_string()),
            overridable: info.kind.is_overridable(),
        })
        .collect();
    output::print_output(rows, format)
}
