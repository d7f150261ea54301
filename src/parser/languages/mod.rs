//! Language adapter implementations.

mod javascript;
mod python;

pub use javascript::{Dialect, JavaScriptAdapter};
pub use python::PythonAdapter;

use super::LanguageAdapter;
use once_cell::sync::OnceCell;

/// Static storage for the Python adapter.
static PYTHON_ADAPTER: OnceCell<PythonAdapter> = OnceCell::new();

/// Static storage for the JavaScript adapter.
static JAVASCRIPT_ADAPTER: OnceCell<JavaScriptAdapter> = OnceCell::new();

/// Static storage for the TypeScript adapter.
static TYPESCRIPT_ADAPTER: OnceCell<JavaScriptAdapter> = OnceCell::new();

/// Static storage for the TSX adapter.
static TSX_ADAPTER: OnceCell<JavaScriptAdapter> = OnceCell::new();

fn python() -> &'static dyn LanguageAdapter {
    PYTHON_ADAPTER.get_or_init(PythonAdapter::new)
}

fn javascript() -> &'static dyn LanguageAdapter {
    JAVASCRIPT_ADAPTER.get_or_init(|| JavaScriptAdapter::new(Dialect::JavaScript))
}

fn typescript() -> &'static dyn LanguageAdapter {
    TYPESCRIPT_ADAPTER.get_or_init(|| JavaScriptAdapter::new(Dialect::TypeScript))
}

fn tsx() -> &'static dyn LanguageAdapter {
    TSX_ADAPTER.get_or_init(|| JavaScriptAdapter::new(Dialect::Tsx))
}

/// Get an adapter for the given file extension (without dot).
///
/// Returns None if no adapter handles the extension.
pub fn get_adapter(ext: &str) -> Option<&'static dyn LanguageAdapter> {
    match ext {
        "py" | "pyi" => Some(python()),
        "js" | "jsx" | "mjs" | "cjs" => Some(javascript()),
        "ts" | "mts" => Some(typescript()),
        "tsx" => Some(tsx()),
        _ => None,
    }
}

/// Get an adapter by language id, as accepted by `--language`.
pub fn get_adapter_by_id(id: &str) -> Option<&'static dyn LanguageAdapter> {
    match id.to_lowercase().as_str() {
        "python" | "py" => Some(python()),
        "javascript" | "js" => Some(javascript()),
        "typescript" | "ts" => Some(typescript()),
        "tsx" => Some(tsx()),
        _ => None,
    }
}

/// All language ids accepted by [`get_adapter_by_id`].
pub fn language_ids() -> &'static [&'static str] {
    &["python", "javascript", "typescript", "tsx"]
}

/// All file extensions with an adapter.
pub fn supported_extensions() -> Vec<&'static str> {
    [python(), javascript(), typescript(), tsx()]
        .iter()
        .flat_map(|a| a.file_extensions().iter().copied())
        .collect()
}
