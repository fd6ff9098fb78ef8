//! Drive `q` expressions for child listings

use drivekeep_core::ports::{KindConstraint, ListQuery};

/// MIME type Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type Drive uses for shortcuts
pub const SHORTCUT_MIME_TYPE: &str = "application/vnd.google-apps.shortcut";

/// Escapes a value for use inside a single-quoted query literal
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders `query` as a Drive search expression
///
/// Clauses are joined with ` and ` in a fixed order: extra clauses, kind
/// constraint, parent, trash filter.
pub fn render(query: &ListQuery) -> String {
    let mut parts: Vec<String> = query.extra_clauses.clone();

    match query.kind {
        KindConstraint::Any => {}
        KindConstraint::FolderLike => parts.push(format!(
            "(mimeType = '{FOLDER_MIME_TYPE}' or mimeType = '{SHORTCUT_MIME_TYPE}')"
        )),
        KindConstraint::FolderOnly => parts.push(format!("mimeType = '{FOLDER_MIME_TYPE}'")),
    }

    parts.push(format!(
        "'{}' in parents",
        escape_literal(query.parent.as_str())
    ));

    if !query.include_trashed {
        parts.push("trashed = false".to_string());
    }

    parts.join(" and ")
}
