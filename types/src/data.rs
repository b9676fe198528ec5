//! Query console types for results and loaded databases

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tsify::Tsify;

/// Text shown for a null cell
pub const NULL_TEXT: &str = "NULL";

/// Result of a SQL query, projected into a rectangular grid
#[derive(Tsify, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct QueryResult {
    /// Column metadata, in result order
    pub columns: Vec<ColumnSchema>,
    /// Row data as JSON values, one per column
    pub rows: Vec<Vec<Value>>,
    /// Number of rows
    pub row_count: u64,
    /// Execution time in milliseconds
    pub execution_time_ms: u32,
}

impl QueryResult {
    /// Column names in result order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Column metadata
#[derive(Tsify, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ColumnSchema {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: ColumnType,
    /// Whether column can be null
    pub nullable: bool,
}

impl ColumnSchema {
    /// Nullable column of unknown type
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: ColumnType::Unknown,
            nullable: true,
        }
    }
}

/// SQL data types
#[derive(Tsify, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub enum ColumnType {
    /// Boolean
    Boolean,
    /// 8-bit integer
    Int8,
    /// 16-bit integer
    Int16,
    /// 32-bit integer
    Int32,
    /// 64-bit integer
    Int64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Fixed-point decimal
    Decimal,
    /// UTF-8 string
    String,
    /// Binary data
    Binary,
    /// Date (days since epoch)
    Date,
    /// Time of day
    Time,
    /// Timestamp with timezone
    Timestamp,
    /// Nested list, struct or map
    Json,
    /// Null type
    Null,
    /// Unknown type
    Unknown,
}

impl ColumnType {
    /// Map an Arrow type name (as printed by Arrow JS) to a column type.
    ///
    /// Parameterized names like `Timestamp<MICROSECOND>` or `Decimal[18e2]`
    /// are matched on their base name. Unsigned integers widen to the next
    /// signed type that holds them.
    pub fn from_arrow_name(name: &str) -> Self {
        let base = name
            .split(|c: char| c == '<' || c == '[' || c == '(')
            .next()
            .unwrap_or_default()
            .trim();
        match base {
            "Bool" | "Boolean" => ColumnType::Boolean,
            "Int8" => ColumnType::Int8,
            "Int16" | "Uint8" => ColumnType::Int16,
            "Int32" | "Uint16" => ColumnType::Int32,
            "Int64" | "Uint32" | "Uint64" => ColumnType::Int64,
            "Float16" | "Float32" => ColumnType::Float32,
            "Float64" | "Float" => ColumnType::Float64,
            "Decimal" => ColumnType::Decimal,
            "Utf8" | "LargeUtf8" => ColumnType::String,
            "Binary" | "LargeBinary" | "FixedSizeBinary" => ColumnType::Binary,
            "Date32" | "Date64" | "Date" => ColumnType::Date,
            "Time32" | "Time64" | "Time" => ColumnType::Time,
            "Timestamp" => ColumnType::Timestamp,
            "List" | "LargeList" | "FixedSizeList" | "Struct" | "Map" => ColumnType::Json,
            "Null" => ColumnType::Null,
            _ => ColumnType::Unknown,
        }
    }
}

/// Rendered form of a query result: header and cell text
#[derive(Tsify, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ResultTable {
    /// Header labels
    pub headers: Vec<String>,
    /// Cell text per row
    pub rows: Vec<Vec<String>>,
}

impl From<&QueryResult> for ResultTable {
    fn from(result: &QueryResult) -> Self {
        Self {
            headers: result.columns.iter().map(|c| c.name.clone()).collect(),
            rows: result
                .rows
                .iter()
                .map(|row| row.iter().map(cell_text).collect())
                .collect(),
        }
    }
}

/// Text for a single cell. Nulls render as `NULL`, strings raw, numbers
/// the way JavaScript prints them, and nested values as compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => NULL_TEXT.to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) if n.is_f64() => n.as_f64().map_or_else(|| n.to_string(), number_text),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

/// Format a float as ECMAScript `Number.prototype.toString()` does:
/// positional notation for 1e-7 <= |n| < 1e21, exponent form otherwise.
pub fn number_text(number: f64) -> String {
    if number.is_nan() {
        return "NaN".to_string();
    }
    if number.is_infinite() {
        let text = if number > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }
    if number == 0.0 {
        return "0".to_string();
    }

    // Shortest round-trip digits, e.g. "1.2345e-7"
    let scientific = format!("{:e}", number.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent.parse::<i32>().unwrap_or(0) + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{}.{}", int, frac)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let sign = if n - 1 < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", lead, sign, (n - 1).abs())
        } else {
            format!("{}.{}e{}{}", lead, rest, sign, (n - 1).abs())
        }
    };

    if number < 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

/// Result of loading a database file
#[derive(Tsify, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct LoadResult {
    /// Name the file was registered under
    pub database: String,
    /// Original file name
    pub file_name: String,
    /// File size in bytes
    pub size: u64,
}

/// Console readiness snapshot
#[derive(Tsify, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct ConsoleStatus {
    /// A connection is open
    pub ready: bool,
    /// An initialization attempt is in flight
    pub initializing: bool,
    /// Registered name of the uploaded database, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}
