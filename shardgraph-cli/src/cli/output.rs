// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result formatting for table, JSON and CSV output

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table as DisplayTable};
use serde_json::{Map, Value as JsonValue};

use super::commands::OutputFormat;
use shardgraph::storage::{Table, Value};

pub struct ResultFormatter;

impl ResultFormatter {
    pub fn format(table: &Table, format: OutputFormat) -> String {
        match format {
            OutputFormat::Table => Self::format_table(table),
            OutputFormat::Json => Self::format_json(table),
            OutputFormat::Csv => Self::format_csv(table),
        }
    }

    fn format_table(table: &Table) -> String {
        let mut display = DisplayTable::new();
        display
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(table.schema().names());

        for row in table.rows() {
            display.add_row(row.iter().map(display_value).collect::<Vec<_>>());
        }

        format!("{}\n{} rows", display, table.num_rows())
    }

    fn format_json(table: &Table) -> String {
        let names = table.schema().names();
        let rows: Vec<JsonValue> = table
            .rows()
            .into_iter()
            .map(|row| {
                let object: Map<String, JsonValue> = names
                    .iter()
                    .zip(row)
                    .map(|(name, value)| (name.to_string(), json_value(value)))
                    .collect();
                JsonValue::Object(object)
            })
            .collect();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_csv(table: &Table) -> String {
        let mut out = table.schema().names().join(",");
        out.push('\n');
        for row in table.rows() {
            let line: Vec<String> = row.iter().map(|v| csv_field(&display_value(v))).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}

fn json_value(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(b),
        Value::Integer(i) => JsonValue::from(i),
        Value::Float(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::String(s) => JsonValue::String(s),
    }
}

fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardgraph::storage::{DataType, Field, Schema};

    fn sample() -> Table {
        let schema = Schema::new(vec![
            Field::new("county", DataType::String),
            Field::nullable("lat", DataType::Float),
        ]);
        let rows = vec![
            vec!["Tyne, Wear".into(), 1.5.into()],
            vec!["A".into(), Value::Null],
        ];
        Table::ingest(schema, rows, 2).unwrap()
    }

    #[test]
    fn test_csv_quotes_fields() {
        let csv = ResultFormatter::format(&sample(), OutputFormat::Csv);
        assert_eq!(csv, "county,lat\n\"Tyne, Wear\",1.5\nA,NULL\n");
    }

    #[test]
    fn test_json_rows() {
        let json = ResultFormatter::format(&sample(), OutputFormat::Json);
        let parsed: JsonValue = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["lat"], JsonValue::from(1.5));
        assert_eq!(parsed[1]["lat"], JsonValue::Null);
    }
}
