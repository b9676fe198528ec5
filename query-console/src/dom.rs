//! Console view backed by page elements

use console_types::{ElementIds, ResultTable};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, HtmlButtonElement, HtmlElement, HtmlInputElement, HtmlTableElement,
    HtmlTextAreaElement,
};

use crate::view::ConsoleView;

pub struct DomView {
    document: Document,
    sql: HtmlTextAreaElement,
    run: HtmlButtonElement,
    file: HtmlInputElement,
    file_info: HtmlElement,
    table: HtmlTableElement,
    error: HtmlElement,
}

impl DomView {
    /// Look up every control by id in the current document.
    pub fn attach(ids: &ElementIds) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("DomView: no document available"))?;

        Ok(Self {
            sql: element(&document, &ids.sql)?,
            run: element(&document, &ids.run)?,
            file: element(&document, &ids.file)?,
            file_info: element(&document, &ids.file_info)?,
            table: element(&document, &ids.table)?,
            error: element(&document, &ids.error)?,
            document,
        })
    }

    pub fn run_button(&self) -> &HtmlButtonElement {
        &self.run
    }

    pub fn file_input(&self) -> &HtmlInputElement {
        &self.file
    }

    fn build_table(&self, table: &ResultTable) -> Result<(), JsValue> {
        self.table.set_inner_html("");

        let head = self.document.create_element("thead")?;
        let header_row = self.document.create_element("tr")?;
        for label in &table.headers {
            let th = self.cell("th", label)?;
            header_row.append_child(&th)?;
        }
        head.append_child(&header_row)?;
        self.table.append_child(&head)?;

        let body = self.document.create_element("tbody")?;
        for row in &table.rows {
            let tr = self.document.create_element("tr")?;
            for text in row {
                let td = self.cell("td", text)?;
                tr.append_child(&td)?;
            }
            body.append_child(&tr)?;
        }
        self.table.append_child(&body)?;
        Ok(())
    }

    fn cell(&self, tag: &str, text: &str) -> Result<Element, JsValue> {
        let cell = self.document.create_element(tag)?;
        cell.set_text_content(Some(text));
        Ok(cell)
    }

    fn set_error_display(&self, display: &str) {
        if let Err(err) = self.error.style().set_property("display", display) {
            log::warn!("Failed to toggle error region: {:?}", err);
        }
    }
}

fn element<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("DomView: missing element #{}", id)))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("DomView: element #{} has the wrong type", id)))
}

impl ConsoleView for DomView {
    fn set_run_enabled(&self, enabled: bool) {
        self.run.set_disabled(!enabled);
    }

    fn sql(&self) -> String {
        self.sql.value()
    }

    fn set_sql(&self, sql: &str) {
        self.sql.set_value(sql);
    }

    fn set_file_info(&self, text: &str) {
        self.file_info.set_text_content(Some(text));
    }

    fn show_error(&self, message: &str) {
        self.error.set_text_content(Some(message));
        self.set_error_display("block");
    }

    fn hide_error(&self) {
        self.set_error_display("none");
    }

    fn render_table(&self, table: &ResultTable) {
        if let Err(err) = self.build_table(table) {
            log::error!("Failed to render result table: {:?}", err);
        }
    }
}
