//! HTML rendering of query results, for `tohtml` requests.

use std::fmt::Write as _;

use quick_xml::escape::escape;
use serde_json::{Map, Value};

const HTML_WRAPPER: &str = r#"<!DOCTYPE html>
<html lang="en">
  <head>
  <style>
  .dataframe {
    font-family: Arial, Helvetica, sans-serif;
    font-size: 12px;
    border-collapse: collapse;
    width: 100%;
  }
  .dataframe td, .dataframe th {
    border: 1px solid #ddd;
    padding: 4px;
  }
  .dataframe tr:nth-child(even){background-color: #f2f2f2;}
  .dataframe tr:hover {background-color: #ddd;}
  .dataframe th {
    padding-top: 8px;
    padding-bottom: 8px;
    text-align: left;
    background-color: #003469;
    color: white;
  }
  </style>
  </head>
  <body>
    <div>
      @TABLE
    </div>
  </body>
</html>"#;

/// Render rows as a styled document holding one `dataframe` table, with a
/// leading row-index column.
pub fn render(columns: &[String], rows: &[Map<String, Value>]) -> String {
  HTML_WRAPPER.replace("@TABLE", &table(columns, rows))
}

fn table(columns: &[String], rows: &[Map<String, Value>]) -> String {
  let mut out = String::from("<table border=\"1\" class=\"dataframe\">\n  <thead>\n");
  out.push_str("    <tr style=\"text-align: right;\">\n      <th></th>\n");
  for column in columns {
    let _ = writeln!(out, "      <th>{}</th>", escape(column));
  }
  out.push_str("    </tr>\n  </thead>\n  <tbody>\n");
  for (index, row) in rows.iter().enumerate() {
    let _ = writeln!(out, "    <tr>\n      <th>{index}</th>");
    for column in columns {
      let _ = writeln!(out, "      <td>{}</td>", escape(cell(row.get(column))));
    }
    out.push_str("    </tr>\n");
  }
  out.push_str("  </tbody>\n</table>");
  out
}

fn cell(value: Option<&Value>) -> String {
  match value {
    None | Some(Value::Null) => "None".to_owned(),
    Some(Value::Bool(b)) => (if *b { "True" } else { "False" }).to_owned(),
    Some(Value::String(s)) => s.clone(),
    Some(other) => other.to_string(),
  }
}
