//! DuckDB-WASM adapter
//!
//! Drives `@duckdb/duckdb-wasm` through reflection on the module namespace
//! the page imports, so the console does not pin a particular build of the
//! JavaScript package.
//!
//! # Example (JavaScript)
//! ```js
//! import * as duckdb from "https://cdn.jsdelivr.net/npm/@duckdb/duckdb-wasm@1.28.0/+esm";
//! import init, { WebConsole } from "./pkg/query_console.js";
//!
//! await init();
//! const console = new WebConsole(duckdb, {});
//! console.mount();
//! ```

use console_types::{number_text, ColumnSchema, ColumnType, EngineConfig};
use js_sys::{Array, Function, Object, Promise, Reflect, Uint8Array};
use serde_json::{Map, Number, Value};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Worker;

use crate::engine::{ConnectOptions, Connection, Engine, EngineFactory, RecordSet};
use crate::error::EngineError;

/// Largest integer a JavaScript number represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Creates [`DuckDbWasm`] engines from the `@duckdb/duckdb-wasm` module
pub struct DuckDbWasmFactory {
    module: JsValue,
}

impl DuckDbWasmFactory {
    pub fn new(module: JsValue) -> Self {
        Self { module }
    }
}

impl EngineFactory for DuckDbWasmFactory {
    type Engine = DuckDbWasm;

    fn create(&self, config: &EngineConfig) -> Result<DuckDbWasm, EngineError> {
        let worker = Worker::new(&config.worker_url)?;
        let logger = Reflect::construct(&export(&self.module, "ConsoleLogger")?, &Array::new())?;
        let db = Reflect::construct(
            &export(&self.module, "AsyncDuckDB")?,
            &Array::of2(&logger, &worker),
        )?;
        log::debug!("Spawned DuckDB worker from {}", config.worker_url);
        Ok(DuckDbWasm { db, worker })
    }
}

/// An `AsyncDuckDB` instance and the worker it runs in
pub struct DuckDbWasm {
    db: JsValue,
    worker: Worker,
}

impl Engine for DuckDbWasm {
    type Connection = DuckDbWasmConnection;

    async fn instantiate(
        &self,
        wasm_url: &str,
        pthread_worker_url: Option<&str>,
    ) -> Result<(), EngineError> {
        let pthread = pthread_worker_url.map_or(JsValue::NULL, JsValue::from_str);
        call_async(
            &self.db,
            "instantiate",
            &Array::of2(&JsValue::from_str(wasm_url), &pthread),
        )
        .await?;
        Ok(())
    }

    async fn connect(
        &self,
        options: Option<ConnectOptions>,
    ) -> Result<DuckDbWasmConnection, EngineError> {
        let args = Array::new();
        if let Some(options) = options {
            let config = Object::new();
            Reflect::set(
                &config,
                &JsValue::from_str("database"),
                &JsValue::from_str(&options.database),
            )?;
            args.push(&config);
        }
        let conn = call_async(&self.db, "connect", &args).await?;
        Ok(DuckDbWasmConnection { conn })
    }

    async fn register_file_buffer(&self, name: &str, bytes: Vec<u8>) -> Result<(), EngineError> {
        let buffer = Uint8Array::from(bytes.as_slice());
        call_async(
            &self.db,
            "registerFileBuffer",
            &Array::of2(&JsValue::from_str(name), &buffer),
        )
        .await?;
        Ok(())
    }
}

impl Drop for DuckDbWasm {
    fn drop(&mut self) {
        self.worker.terminate();
    }
}

/// An `AsyncDuckDBConnection`
pub struct DuckDbWasmConnection {
    conn: JsValue,
}

impl Connection for DuckDbWasmConnection {
    async fn query(&self, sql: &str) -> Result<RecordSet, EngineError> {
        let table = call_async(&self.conn, "query", &Array::of1(&JsValue::from_str(sql))).await?;
        decode_table(&table)
    }

    async fn close(&self) -> Result<(), EngineError> {
        call_async(&self.conn, "close", &Array::new()).await?;
        Ok(())
    }
}

fn export(module: &JsValue, name: &str) -> Result<Function, EngineError> {
    Reflect::get(module, &JsValue::from_str(name))?
        .dyn_into::<Function>()
        .map_err(|_| EngineError::new(format!("duckdb module does not export {}", name)))
}

fn method(target: &JsValue, name: &str) -> Result<Function, EngineError> {
    Reflect::get(target, &JsValue::from_str(name))?
        .dyn_into::<Function>()
        .map_err(|_| EngineError::new(format!("{} is not a function", name)))
}

/// Call `target[name](...args)` and await the result if it is a promise.
async fn call_async(target: &JsValue, name: &str, args: &Array) -> Result<JsValue, EngineError> {
    let returned = method(target, name)?.apply(target, args)?;
    let value = JsFuture::from(Promise::resolve(&returned)).await?;
    Ok(value)
}

/// Decode an Arrow JS table into field metadata and name-keyed records.
pub fn decode_table(table: &JsValue) -> Result<RecordSet, EngineError> {
    let schema = Reflect::get(table, &JsValue::from_str("schema"))?;
    let fields = Reflect::get(&schema, &JsValue::from_str("fields"))?;
    let fields = Array::from(&fields)
        .iter()
        .map(|field| decode_field(&field))
        .collect::<Result<Vec<_>, _>>()?;

    let rows = method(table, "toArray")?.call0(table)?;
    let mut records = Vec::new();
    for row in Array::from(&rows).iter() {
        let mut record = Map::new();
        for field in &fields {
            let value = Reflect::get(&row, &JsValue::from_str(&field.name))?;
            record.insert(field.name.clone(), js_to_json(&value));
        }
        records.push(record);
    }
    log::debug!("Decoded {} rows x {} columns", records.len(), fields.len());
    Ok(RecordSet { fields, records })
}

fn decode_field(field: &JsValue) -> Result<ColumnSchema, EngineError> {
    let name = Reflect::get(field, &JsValue::from_str("name"))?
        .as_string()
        .unwrap_or_default();
    let data_type = Reflect::get(field, &JsValue::from_str("type"))?;
    let nullable = Reflect::get(field, &JsValue::from_str("nullable"))?
        .as_bool()
        .unwrap_or(true);
    Ok(ColumnSchema {
        name,
        data_type: ColumnType::from_arrow_name(&js_display(&data_type)),
        nullable,
    })
}

/// Convert a cell value returned by Arrow JS into JSON.
///
/// `BigInt` becomes an integer when it fits `i64` and text otherwise;
/// `Date` becomes its ISO string; other objects use `toString()`.
pub fn js_to_json(value: &JsValue) -> Value {
    if value.is_null() || value.is_undefined() {
        return Value::Null;
    }
    if let Some(flag) = value.as_bool() {
        return Value::Bool(flag);
    }
    if let Some(number) = value.as_f64() {
        return number_to_json(number);
    }
    if let Some(text) = value.as_string() {
        return Value::String(text);
    }
    if value.is_bigint() {
        let text = js_display(value);
        return text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(text));
    }
    if let Some(date) = value.dyn_ref::<js_sys::Date>() {
        return Value::String(String::from(date.to_iso_string()));
    }
    Value::String(js_display(value))
}

/// JSON for a JavaScript number. Safe integers become JSON integers,
/// non-finite values become their `String(n)` text, and other floats stay
/// floats for [`cell_text`](console_types::cell_text) to format.
pub fn number_to_json(number: f64) -> Value {
    if !number.is_finite() {
        return Value::String(number_text(number));
    }
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        return Value::from(number as i64);
    }
    Number::from_f64(number)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn js_display(value: &JsValue) -> String {
    String::from(value.unchecked_ref::<Object>().to_string())
}
