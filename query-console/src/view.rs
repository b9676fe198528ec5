//! User-facing controls the console drives

use console_types::ResultTable;

/// The page surface: SQL input, run trigger, file status line, result table
/// and error region. Implementations use interior mutability; the console
/// only holds a shared reference.
pub trait ConsoleView {
    /// Enable or disable the run trigger
    fn set_run_enabled(&self, enabled: bool);

    /// Current SQL input text
    fn sql(&self) -> String;

    fn set_sql(&self, sql: &str);

    /// Status line describing the loaded file
    fn set_file_info(&self, text: &str);

    /// Show `message` in the error region
    fn show_error(&self, message: &str);

    fn hide_error(&self);

    /// Replace whatever table is shown with `table`
    fn render_table(&self, table: &ResultTable);
}
