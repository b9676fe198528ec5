//! In-memory engine and recording view for controller tests

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::task::Poll;

use console_types::{ColumnSchema, EngineConfig, ResultTable};
use futures::channel::oneshot;
use futures::future::poll_fn;
use serde_json::Value;

use crate::engine::{ConnectOptions, Connection, Engine, EngineFactory, RecordSet};
use crate::error::EngineError;
use crate::view::ConsoleView;

/// Build a record set from column names and JSON object rows.
pub fn records(columns: &[&str], rows: Vec<Value>) -> RecordSet {
    RecordSet {
        fields: columns.iter().map(|c| ColumnSchema::named(*c)).collect(),
        records: rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => map,
                other => panic!("record must be an object, got {other}"),
            })
            .collect(),
    }
}

/// Return `Pending` once, waking immediately, so sibling futures can run.
async fn yield_now() {
    let mut yielded = false;
    poll_fn(|cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
    .await
}

/// Observations shared between a factory and everything it creates
#[derive(Default)]
pub struct EngineLog {
    pub creates: Cell<u32>,
    pub instantiations: Cell<u32>,
    /// Connections currently open
    pub open: Cell<i32>,
    events: RefCell<Vec<String>>,
}

impl EngineLog {
    fn push(&self, event: String) {
        self.events.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.with_prefix("query:")
    }

    pub fn registered(&self) -> Vec<String> {
        self.with_prefix("register:")
    }

    fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| e.strip_prefix(prefix).map(str::to_string))
            .collect()
    }
}

type Responses = HashMap<String, Result<RecordSet, EngineError>>;

#[derive(Default)]
struct Script {
    default: Responses,
    uploaded: Responses,
    fail_instantiate: Option<String>,
    fail_default_connect: Option<String>,
    fail_register: Option<String>,
    reject_uploads: bool,
    yielding: bool,
}

pub struct MemoryFactory {
    log: Rc<EngineLog>,
    script: Rc<Script>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
}

impl MemoryFactory {
    pub fn new() -> Self {
        Self {
            log: Rc::new(EngineLog::default()),
            script: Rc::new(Script::default()),
            gate: RefCell::new(None),
        }
    }

    pub fn log(&self) -> Rc<EngineLog> {
        Rc::clone(&self.log)
    }

    fn script_mut(&mut self) -> &mut Script {
        Rc::get_mut(&mut self.script).expect("script is only edited before use")
    }

    /// Answer `sql` on the default database
    pub fn respond(mut self, sql: &str, result: RecordSet) -> Self {
        self.script_mut().default.insert(sql.to_string(), Ok(result));
        self
    }

    /// Answer `sql` on any uploaded database
    pub fn respond_uploaded(mut self, sql: &str, result: RecordSet) -> Self {
        self.script_mut().uploaded.insert(sql.to_string(), Ok(result));
        self
    }

    pub fn fail_query(mut self, sql: &str, message: &str) -> Self {
        self.script_mut()
            .default
            .insert(sql.to_string(), Err(EngineError::new(message)));
        self
    }

    pub fn fail_instantiate(mut self, message: &str) -> Self {
        self.script_mut().fail_instantiate = Some(message.to_string());
        self
    }

    /// Fail `connect` without a database, after instantiation succeeded
    pub fn fail_default_connect(mut self, message: &str) -> Self {
        self.script_mut().fail_default_connect = Some(message.to_string());
        self
    }

    pub fn fail_register(mut self, message: &str) -> Self {
        self.script_mut().fail_register = Some(message.to_string());
        self
    }

    /// Suspend once inside every `connect` and `close`
    pub fn yielding(mut self) -> Self {
        self.script_mut().yielding = true;
        self
    }

    /// Refuse connections bound to uploaded files
    pub fn reject_uploads(mut self) -> Self {
        self.script_mut().reject_uploads = true;
        self
    }

    /// Hold instantiation until the returned sender fires
    pub fn gated(self) -> (Self, oneshot::Sender<()>) {
        let (release, gate) = oneshot::channel();
        *self.gate.borrow_mut() = Some(gate);
        (self, release)
    }
}

impl EngineFactory for MemoryFactory {
    type Engine = MemoryEngine;

    fn create(&self, _config: &EngineConfig) -> Result<MemoryEngine, EngineError> {
        self.log.creates.set(self.log.creates.get() + 1);
        Ok(MemoryEngine {
            log: Rc::clone(&self.log),
            script: Rc::clone(&self.script),
            gate: RefCell::new(self.gate.borrow_mut().take()),
            files: RefCell::new(HashMap::new()),
        })
    }
}

pub struct MemoryEngine {
    log: Rc<EngineLog>,
    script: Rc<Script>,
    gate: RefCell<Option<oneshot::Receiver<()>>>,
    files: RefCell<HashMap<String, Vec<u8>>>,
}

impl Engine for MemoryEngine {
    type Connection = MemoryConnection;

    async fn instantiate(
        &self,
        _wasm_url: &str,
        _pthread_worker_url: Option<&str>,
    ) -> Result<(), EngineError> {
        self.log
            .instantiations
            .set(self.log.instantiations.get() + 1);
        self.log.push("instantiate".to_string());

        let gate = self.gate.borrow_mut().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match &self.script.fail_instantiate {
            Some(message) => Err(EngineError::new(message.clone())),
            None => Ok(()),
        }
    }

    async fn connect(
        &self,
        options: Option<ConnectOptions>,
    ) -> Result<MemoryConnection, EngineError> {
        if self.script.yielding {
            yield_now().await;
        }
        let database = options.map(|o| o.database);
        if database.is_none() {
            if let Some(message) = &self.script.fail_default_connect {
                return Err(EngineError::new(message.clone()));
            }
        }
        if let Some(name) = &database {
            if self.script.reject_uploads {
                return Err(EngineError::new(format!("IO Error: {} is not a valid database", name)));
            }
            if !self.files.borrow().contains_key(name) {
                return Err(EngineError::new(format!("IO Error: no file named {}", name)));
            }
        }
        let label = database.clone().unwrap_or_else(|| "memory".to_string());
        self.log.push(format!("connect:{}", label));
        self.log.open.set(self.log.open.get() + 1);
        Ok(MemoryConnection {
            label,
            uploaded: database.is_some(),
            closed: Cell::new(false),
            log: Rc::clone(&self.log),
            script: Rc::clone(&self.script),
        })
    }

    async fn register_file_buffer(&self, name: &str, bytes: Vec<u8>) -> Result<(), EngineError> {
        if let Some(message) = &self.script.fail_register {
            return Err(EngineError::new(message.clone()));
        }
        self.log.push(format!("register:{}", name));
        self.files.borrow_mut().insert(name.to_string(), bytes);
        Ok(())
    }
}

pub struct MemoryConnection {
    label: String,
    uploaded: bool,
    closed: Cell<bool>,
    log: Rc<EngineLog>,
    script: Rc<Script>,
}

impl Connection for MemoryConnection {
    async fn query(&self, sql: &str) -> Result<RecordSet, EngineError> {
        if self.closed.get() {
            return Err(EngineError::new("Connection Error: connection closed"));
        }
        self.log.push(format!("query:{}", sql));
        let responses = if self.uploaded {
            &self.script.uploaded
        } else {
            &self.script.default
        };
        responses.get(sql).cloned().unwrap_or_else(|| {
            Err(EngineError::new(format!(
                "Catalog Error: no scripted result for {:?} on {}",
                sql, self.label
            )))
        })
    }

    async fn close(&self) -> Result<(), EngineError> {
        if self.script.yielding {
            yield_now().await;
        }
        if !self.closed.replace(true) {
            self.log.push(format!("close:{}", self.label));
            self.log.open.set(self.log.open.get() - 1);
        }
        Ok(())
    }
}

/// View that records what the console asked it to show
#[derive(Default)]
pub struct RecordingView {
    pub run_enabled: Cell<bool>,
    pub sql: RefCell<String>,
    pub file_info: RefCell<String>,
    pub error: RefCell<Option<String>>,
    pub table: RefCell<Option<ResultTable>>,
    pub renders: Cell<u32>,
}

impl ConsoleView for RecordingView {
    fn set_run_enabled(&self, enabled: bool) {
        self.run_enabled.set(enabled);
    }

    fn sql(&self) -> String {
        self.sql.borrow().clone()
    }

    fn set_sql(&self, sql: &str) {
        *self.sql.borrow_mut() = sql.to_string();
    }

    fn set_file_info(&self, text: &str) {
        *self.file_info.borrow_mut() = text.to_string();
    }

    fn show_error(&self, message: &str) {
        *self.error.borrow_mut() = Some(message.to_string());
    }

    fn hide_error(&self) {
        self.error.borrow_mut().take();
    }

    fn render_table(&self, table: &ResultTable) {
        *self.table.borrow_mut() = Some(table.clone());
        self.renders.set(self.renders.get() + 1);
    }
}
