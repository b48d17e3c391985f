//! `variables.csv`: one row per variable, one column per scenario.
//!
//! ```csv
//! variable,Default,RetireEarly
//! retireDate,2045-06-01,2038-06-01
//! rentAmount,-1500,-1500
//! sweepFraction,{HALF},{FULL}
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use billsim_core::scenario::VariableValue;

use crate::error::Result;

pub type VariableTable = BTreeMap<String, BTreeMap<String, VariableValue>>;

const VARIABLE_COLUMN: &str = "variable";

/// Load the variable table; a missing file is an empty table.
pub fn load_variables(path: &Path) -> Result<VariableTable> {
    if !path.exists() {
        return Ok(VariableTable::new());
    }
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let scenario_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| *h != VARIABLE_COLUMN)
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let variable_column = headers
        .iter()
        .position(|h| h == VARIABLE_COLUMN)
        .unwrap_or(0);

    let mut table = VariableTable::new();
    for record in reader.records() {
        let record = record?;
        let Some(variable) = record.get(variable_column) else {
            continue;
        };
        let per_scenario = table.entry(variable.to_string()).or_default();
        for (column, scenario) in &scenario_columns {
            let Some(cell) = record.get(*column) else {
                continue;
            };
            if cell.trim().is_empty() {
                continue;
            }
            if let Some(value) = VariableValue::parse_cell(cell) {
                per_scenario.insert(scenario.clone(), value);
            } else {
                tracing::warn!("unparseable variable cell {variable}/{scenario}: {cell:?}");
            }
        }
    }
    Ok(table)
}

fn cell_of(value: &VariableValue) -> String {
    match value {
        VariableValue::Date(d) => d.to_string(),
        VariableValue::Amount(v) => {
            if v.fract() == 0.0 {
                format!("{v:.0}")
            } else {
                v.to_string()
            }
        }
        VariableValue::Fraction(f) => match serde_json::to_value(f) {
            Ok(serde_json::Value::String(s)) => s,
            _ => String::new(),
        },
    }
}

/// Save the table with a stable column order (scenario names sorted).
pub fn save_variables(path: &Path, table: &VariableTable) -> Result<()> {
    let mut scenarios: Vec<&String> = table
        .values()
        .flat_map(|per_scenario| per_scenario.keys())
        .collect();
    scenarios.sort();
    scenarios.dedup();

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec![VARIABLE_COLUMN.to_string()];
    header.extend(scenarios.iter().map(|s| s.to_string()));
    writer.write_record(&header)?;

    for (variable, per_scenario) in table {
        let mut row = vec![variable.clone()];
        for scenario in &scenarios {
            row.push(
                per_scenario
                    .get(scenario.as_str())
                    .map(cell_of)
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    super::atomic_write(path, &bytes)?;
    Ok(())
}
