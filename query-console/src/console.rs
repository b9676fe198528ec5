//! Query console controller
//!
//! Owns the engine handle, the single live connection and the page view.
//! Initialization runs once through a [`SingleFlight`] entry; queries and
//! file uploads wait on that same entry when the engine is not ready yet.
//! Uploads are serialized so that only one connection is ever open.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use futures::lock::Mutex;

use console_types::{
    now, ConsoleConfig, ConsoleStatus, LoadResult, QueryResult, ResultTable, Timestamp,
};

use crate::engine::{ConnectOptions, Connection, Engine, EngineFactory};
use crate::error::{ConsoleError, EngineError};
use crate::single_flight::{Flight, SingleFlight};
use crate::view::ConsoleView;

const INITIALIZE: &str = "initialize";

type EngineOf<F> = <F as EngineFactory>::Engine;
type ConnectionOf<F> = <EngineOf<F> as Engine>::Connection;

/// Console controller. Cloning yields another handle to the same console.
pub struct QueryConsole<F: EngineFactory, V> {
    inner: Rc<Inner<F, V>>,
}

impl<F: EngineFactory, V> Clone for QueryConsole<F, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

struct Inner<F: EngineFactory, V> {
    config: ConsoleConfig,
    factory: F,
    view: V,
    engine: RefCell<Option<Rc<EngineOf<F>>>>,
    connection: RefCell<Option<Rc<ConnectionOf<F>>>>,
    database: RefCell<Option<String>>,
    flights: SingleFlight<&'static str, Result<(), ConsoleError>>,
    /// Held for the whole register/close/connect sequence of one upload
    uploads: Mutex<()>,
    last_upload: Cell<Timestamp>,
}

impl<F, V> QueryConsole<F, V>
where
    F: EngineFactory + 'static,
    V: ConsoleView + 'static,
{
    pub fn new(factory: F, view: V, config: ConsoleConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                config,
                factory,
                view,
                engine: RefCell::new(None),
                connection: RefCell::new(None),
                database: RefCell::new(None),
                flights: SingleFlight::new(),
                uploads: Mutex::new(()),
                last_upload: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.inner.config
    }

    pub fn view(&self) -> &V {
        &self.inner.view
    }

    /// Disable the run trigger and start initialization.
    ///
    /// The returned flight must be polled (for example by spawning it) for
    /// initialization to make progress.
    pub fn mount(&self) -> Flight<Result<(), ConsoleError>> {
        self.inner.view.set_run_enabled(false);
        self.begin_initialize()
    }

    /// Join the initialization flight, starting it if this is the first call.
    pub fn begin_initialize(&self) -> Flight<Result<(), ConsoleError>> {
        let inner = Rc::downgrade(&self.inner);
        self.inner
            .flights
            .join(INITIALIZE, move || initialize_flight(inner))
    }

    /// Create the engine, instantiate it and open the first connection.
    /// Concurrent and repeated calls share one attempt and its outcome.
    pub async fn initialize(&self) -> Result<(), ConsoleError> {
        self.begin_initialize().await
    }

    /// Execute `sql` and render the result, replacing any previous table.
    ///
    /// Failures are logged and shown in the error region before being
    /// returned; the error region is hidden at the start of every attempt.
    pub async fn run_query(&self, sql: &str) -> Result<QueryResult, ConsoleError> {
        let view = &self.inner.view;
        view.hide_error();

        match self.execute(sql).await {
            Ok(result) => {
                view.render_table(&ResultTable::from(&result));
                Ok(result)
            }
            Err(err) => {
                log::error!("Query failed: {}", err);
                view.show_error(&err.to_string());
                Err(err)
            }
        }
    }

    /// Run whatever SQL the input currently holds. Outcomes are reported
    /// through the view only.
    pub async fn run_from_input(&self) {
        let sql = self.inner.view.sql();
        let _ = self.run_query(&sql).await;
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult, ConsoleError> {
        if self.inner.current_connection().is_none() {
            // A failed initialization is reported as not-ready below.
            let _ = self.begin_initialize().await;
        }
        let connection = self
            .inner
            .current_connection()
            .ok_or(ConsoleError::NotReady)?;

        log::debug!("Executing query: {}", sql);
        let started = now();
        let records = connection
            .query(sql)
            .await
            .map_err(|err| ConsoleError::Query(err.0))?;
        let elapsed = u32::try_from(now().saturating_sub(started)).unwrap_or(u32::MAX);

        let result = records.into_result(elapsed);
        log::info!(
            "Query returned {} rows, {} columns in {} ms",
            result.row_count,
            result.columns.len(),
            elapsed
        );
        Ok(result)
    }

    /// Register an uploaded database file and rebind the connection to it.
    ///
    /// Waits for initialization first. The engine handle is reused; only the
    /// connection is replaced, and the previous one is closed before the new
    /// one opens.
    pub async fn load_database_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<LoadResult, ConsoleError> {
        self.load_file_contents(file_name, Ok(bytes)).await
    }

    /// [`load_database_file`](Self::load_database_file) for a file whose
    /// contents may have failed to read.
    pub async fn load_file_contents(
        &self,
        file_name: &str,
        contents: Result<Vec<u8>, EngineError>,
    ) -> Result<LoadResult, ConsoleError> {
        let view = &self.inner.view;
        view.hide_error();

        let outcome = match contents {
            Ok(bytes) => self.rebind(file_name, bytes).await,
            Err(err) => Err(ConsoleError::Load(format!(
                "Failed to read {}: {}",
                file_name, err
            ))),
        };
        if let Err(err) = &outcome {
            log::error!("Loading {} failed: {}", file_name, err);
            view.show_error(&err.to_string());
        }
        outcome
    }

    async fn rebind(&self, file_name: &str, bytes: Vec<u8>) -> Result<LoadResult, ConsoleError> {
        let config = &self.inner.config;
        if !config.accepts_upload(file_name) {
            return Err(ConsoleError::Load(format!(
                "Please upload a {} file",
                config.upload_extension
            )));
        }

        let _upload = self.inner.uploads.lock().await;
        self.begin_initialize()
            .await
            .map_err(|_| ConsoleError::NotReady)?;
        let engine = self.inner.current_engine().ok_or(ConsoleError::NotReady)?;

        let database = self.inner.next_upload_name();
        let size = bytes.len() as u64;
        log::debug!("Registering {} ({} bytes) as {}", file_name, size, database);
        engine
            .register_file_buffer(&database, bytes)
            .await
            .map_err(|err| ConsoleError::Load(format!("Failed to register {}: {}", file_name, err)))?;

        self.inner.close_connection().await;

        let options = ConnectOptions {
            database: database.clone(),
        };
        match engine.connect(Some(options)).await {
            Ok(connection) => {
                *self.inner.connection.borrow_mut() = Some(Rc::new(connection));
                *self.inner.database.borrow_mut() = Some(database.clone());
                log::info!("Connected to uploaded database {}", database);
                Ok(LoadResult {
                    database,
                    file_name: file_name.to_string(),
                    size,
                })
            }
            Err(err) => {
                log::warn!(
                    "Could not open {}: {}; reconnecting to the default database",
                    database,
                    err
                );
                self.inner.database.borrow_mut().take();
                match engine.connect(None).await {
                    Ok(connection) => {
                        *self.inner.connection.borrow_mut() = Some(Rc::new(connection));
                    }
                    Err(fallback) => log::error!("Default reconnect failed: {}", fallback),
                }
                Err(ConsoleError::Load(format!("Failed to open {}: {}", file_name, err)))
            }
        }
    }

    pub fn status(&self) -> ConsoleStatus {
        ConsoleStatus {
            ready: self.inner.current_connection().is_some(),
            initializing: self.inner.flights.is_pending(&INITIALIZE),
            database: self.inner.database.borrow().clone(),
        }
    }

    /// Close the live connection and disable the run trigger.
    pub async fn shutdown(&self) {
        self.inner.close_connection().await;
        self.inner.database.borrow_mut().take();
        self.inner.view.set_run_enabled(false);
        log::info!("Query console shut down");
    }
}

async fn initialize_flight<F, V>(inner: Weak<Inner<F, V>>) -> Result<(), ConsoleError>
where
    F: EngineFactory,
    V: ConsoleView,
{
    match inner.upgrade() {
        Some(inner) => inner.initialize_once().await,
        None => Err(ConsoleError::Init("console was dropped".to_string())),
    }
}

impl<F, V> Inner<F, V>
where
    F: EngineFactory,
    V: ConsoleView,
{
    async fn initialize_once(&self) -> Result<(), ConsoleError> {
        let config = &self.config.engine;
        log::info!("Initializing database engine (worker: {})", config.worker_url);

        let engine = self.factory.create(config).map_err(init_error)?;
        engine
            .instantiate(&config.wasm_url, config.pthread_worker_url.as_deref())
            .await
            .map_err(init_error)?;
        let engine = Rc::new(engine);
        *self.engine.borrow_mut() = Some(Rc::clone(&engine));
        log::debug!("Engine instantiated from {}", config.wasm_url);

        let connection = engine.connect(None).await.map_err(init_error)?;
        *self.connection.borrow_mut() = Some(Rc::new(connection));

        self.view.set_sql(&self.config.default_query);
        self.view.set_run_enabled(true);
        log::info!("Database engine ready");
        Ok(())
    }

    fn current_engine(&self) -> Option<Rc<EngineOf<F>>> {
        self.engine.borrow().clone()
    }

    fn current_connection(&self) -> Option<Rc<ConnectionOf<F>>> {
        self.connection.borrow().clone()
    }

    async fn close_connection(&self) {
        let previous = self.connection.borrow_mut().take();
        if let Some(connection) = previous {
            if let Err(err) = connection.close().await {
                log::warn!("Failed to close connection: {}", err);
            }
        }
    }

    /// `uploaded-<ms>.duckdb`, with the timestamp bumped past the previous
    /// upload so names never repeat within a session.
    fn next_upload_name(&self) -> String {
        let stamp = now().max(self.last_upload.get() + 1);
        self.last_upload.set(stamp);
        format!("uploaded-{}.duckdb", stamp)
    }
}

fn init_error(err: EngineError) -> ConsoleError {
    log::error!("Engine initialization failed: {}", err);
    ConsoleError::Init(err.0)
}
