//! Naming utilities
//!
//! Table and constraint naming, identifier quoting and migration file names.

use inflector::Inflector;

/// Format a name according to a pattern with `{placeholder}` slots
pub fn format_name(pattern: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = pattern.to_string();

    for (placeholder, value) in replacements {
        result = result.replace(&format!("{{{}}}", placeholder), value);
    }

    result
}

/// Snake-case table name for a model, pluralized unless told otherwise
pub fn get_table_name(model_name: &str, pluralize_name: bool) -> String {
    let name = model_name.to_snake_case();

    if pluralize_name {
        pluralize(&name)
    } else {
        name
    }
}

/// Create a constraint name based on table, constraint type and columns
pub fn get_constraint_name(
    pattern: &str,
    table_name: &str,
    constraint_type: &str,
    columns: &[String],
) -> String {
    let columns_str = columns.join("_");

    format_name(
        pattern,
        &[
            ("table", table_name),
            ("type", constraint_type),
            ("columns", &columns_str),
        ],
    )
}

/// Convert a singular name to plural
pub fn pluralize(name: &str) -> String {
    match name.to_lowercase().as_str() {
        "person" => "people".to_string(),
        "child" => "children".to_string(),
        "man" => "men".to_string(),
        "woman" => "women".to_string(),
        "mouse" => "mice".to_string(),
        _ => name.to_plural(),
    }
}

/// Quote an identifier with ANSI double quotes, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Format a free-form description as a migration file name segment
pub fn format_file_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    let collapsed = sanitized
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    collapsed.to_lowercase()
}
