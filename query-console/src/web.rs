//! JavaScript entry point wiring the console to the page

use std::cell::RefCell;
use std::str::FromStr;

use console_types::{ConsoleConfig, ConsoleStatus, LoadResult};
use js_sys::{Promise, Uint8Array};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, spawn_local, JsFuture};
use web_sys::{Event, EventTarget, File, HtmlInputElement};

use crate::console::QueryConsole;
use crate::dom::DomView;
use crate::duckdb::DuckDbWasmFactory;
use crate::error::{ConsoleError, EngineError};
use crate::view::ConsoleView;

type DomConsole = QueryConsole<DuckDbWasmFactory, DomView>;

/// An event listener registered by [`WebConsole::mount`]
struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

/// Query console bound to the page and to DuckDB-WASM
///
/// # Example (JavaScript)
/// ```js
/// import * as duckdb from "https://cdn.jsdelivr.net/npm/@duckdb/duckdb-wasm@1.28.0/+esm";
/// import init, { WebConsole } from "./pkg/query_console.js";
///
/// await init();
/// const console = new WebConsole(duckdb, {
///   engine: { worker_url: "/static/duckdb/duckdb-browser-mvp.worker.js" },
/// });
/// console.mount();
/// window.addEventListener("pagehide", () => console.shutdown());
/// ```
#[wasm_bindgen]
pub struct WebConsole {
    console: DomConsole,
    listeners: RefCell<Vec<Listener>>,
}

#[wasm_bindgen]
impl WebConsole {
    /// Create a console over the `@duckdb/duckdb-wasm` module namespace.
    ///
    /// `config` is a plain object shaped like `ConsoleConfig`; omitted
    /// fields take their defaults.
    ///
    /// # Errors
    /// Returns an error if the config is malformed or a configured element
    /// is missing from the page
    #[wasm_bindgen(constructor)]
    pub fn new(duckdb: JsValue, config: JsValue) -> Result<WebConsole, JsValue> {
        let config = parse_config(config)?;
        match log::LevelFilter::from_str(&config.log_level) {
            Ok(level) => log::set_max_level(level),
            Err(_) => log::warn!("Unknown log level {:?}, keeping current", config.log_level),
        }

        let view = DomView::attach(&config.elements)?;
        Ok(WebConsole {
            console: QueryConsole::new(DuckDbWasmFactory::new(duckdb), view, config),
            listeners: RefCell::new(Vec::new()),
        })
    }

    /// Disable the run button, start initialization in the background and
    /// attach the run and file listeners.
    ///
    /// # Errors
    /// Returns an error if the console is already mounted
    pub fn mount(&self) -> Result<(), JsValue> {
        if !self.listeners.borrow().is_empty() {
            return Err(JsValue::from_str("WebConsole: already mounted"));
        }
        let init = self.console.mount();
        spawn_local(async move {
            // Failures are logged by the console and surface on the next run.
            let _ = init.await;
        });

        let console = self.console.clone();
        let run_button = self.console.view().run_button().clone();
        self.listen(run_button.into(), "click", move |_event| {
            let console = console.clone();
            spawn_local(async move { console.run_from_input().await });
        })?;

        let console = self.console.clone();
        let file_input = self.console.view().file_input().clone();
        self.listen(file_input.into(), "change", move |event| {
            let Some(file) = selected_file(&event) else {
                return;
            };
            console.view().set_file_info(&format!("Loaded: {}", file.name()));
            let console = console.clone();
            spawn_local(async move {
                let _ = load_file(&console, file).await;
            });
        })?;

        log::debug!("Query console mounted");
        Ok(())
    }

    /// Run the SQL currently in the input. Resolves with the query result,
    /// or `null` when the attempt failed; never rejects.
    pub fn run(&self) -> Promise {
        let console = self.console.clone();
        future_to_promise(async move {
            let sql = console.view().sql();
            match console.run_query(&sql).await {
                Ok(result) => to_js(&result).or_else(|err| {
                    log::error!("Failed to convert query result: {:?}", err);
                    Ok(JsValue::NULL)
                }),
                Err(_) => Ok(JsValue::NULL),
            }
        })
    }

    /// Load a database file chosen outside the bound file input. Resolves
    /// with the load result, or `null` when loading failed; never rejects.
    #[wasm_bindgen(js_name = loadFile)]
    pub fn load_file(&self, file: File) -> Promise {
        let console = self.console.clone();
        future_to_promise(async move {
            console.view().set_file_info(&format!("Loaded: {}", file.name()));
            match load_file(&console, file).await {
                Ok(loaded) => to_js(&loaded).or_else(|err| {
                    log::error!("Failed to convert load result: {:?}", err);
                    Ok(JsValue::NULL)
                }),
                Err(_) => Ok(JsValue::NULL),
            }
        })
    }

    pub fn status(&self) -> ConsoleStatus {
        self.console.status()
    }

    /// Detach listeners and close the connection.
    pub fn shutdown(&self) -> Promise {
        for listener in self.listeners.borrow_mut().drain(..) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.event,
                listener.callback.as_ref().unchecked_ref(),
            );
        }
        let console = self.console.clone();
        future_to_promise(async move {
            console.shutdown().await;
            Ok(JsValue::UNDEFINED)
        })
    }
}

impl WebConsole {
    fn listen(
        &self,
        target: EventTarget,
        event: &'static str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), JsValue> {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        self.listeners.borrow_mut().push(Listener {
            target,
            event,
            callback,
        });
        Ok(())
    }
}

fn selected_file(event: &Event) -> Option<File> {
    event
        .target()?
        .dyn_into::<HtmlInputElement>()
        .ok()?
        .files()?
        .get(0)
}

async fn load_file(console: &DomConsole, file: File) -> Result<LoadResult, ConsoleError> {
    let contents = JsFuture::from(file.array_buffer())
        .await
        .map(|buffer| Uint8Array::new(&buffer).to_vec())
        .map_err(EngineError::from);
    console.load_file_contents(&file.name(), contents).await
}

fn parse_config(config: JsValue) -> Result<ConsoleConfig, JsValue> {
    if config.is_null() || config.is_undefined() {
        return Ok(ConsoleConfig::default());
    }
    serde_wasm_bindgen::from_value(config)
        .map_err(|err| JsValue::from_str(&format!("WebConsole: invalid config: {}", err)))
}

/// Plain-object form of a result; maps and 64-bit integers become ordinary
/// JavaScript objects and numbers.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}
