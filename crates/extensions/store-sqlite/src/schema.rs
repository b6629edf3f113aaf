//! Per-target table layout.

use tablewatch_protocols::TargetDefinition;

/// Quote an identifier for use in SQL.
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` for one target.
///
/// The temporal column holds RFC 3339 text and is unique; every other
/// field is a non-null real.
pub(crate) fn create_table_sql(target: &TargetDefinition, temporal_field: &str) -> String {
    let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    for name in target.field_names() {
        if name == temporal_field {
            columns.push(format!("{} TEXT NOT NULL UNIQUE", quote(name)));
        } else {
            columns.push(format!("{} REAL NOT NULL", quote(name)));
        }
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote(&target.name),
        columns.join(", ")
    )
}

pub(crate) fn insert_sql(table: &str, fields: &[&str]) -> String {
    let columns: Vec<String> = fields.iter().map(|f| quote(f)).collect();
    let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(table),
        columns.join(", "),
        placeholders.join(", ")
    )
}

pub(crate) fn last_row_sql(target: &TargetDefinition) -> String {
    let columns: Vec<String> = target.field_names().map(quote).collect();
    format!(
        "SELECT {} FROM {} ORDER BY id DESC LIMIT 1",
        columns.join(", "),
        quote(&target.name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablewatch_protocols::FieldMapping;

    fn bond() -> TargetDefinition {
        TargetDefinition::new(
            "German10yrbond",
            vec![
                FieldMapping::new("UTCTime", "Germany", "Time"),
                FieldMapping::new("Value", "Germany", "Yield"),
            ],
        )
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("Value"), "\"Value\"");
        assert_eq!(quote("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_create_table_sql() {
        assert_eq!(
            create_table_sql(&bond(), "UTCTime"),
            "CREATE TABLE IF NOT EXISTS \"German10yrbond\" (id INTEGER PRIMARY KEY AUTOINCREMENT, \"UTCTime\" TEXT NOT NULL UNIQUE, \"Value\" REAL NOT NULL)"
        );
    }

    #[test]
    fn test_insert_sql() {
        assert_eq!(
            insert_sql("t", &["UTCTime", "Value"]),
            "INSERT INTO \"t\" (\"UTCTime\", \"Value\") VALUES (?1, ?2)"
        );
    }

    #[test]
    fn test_last_row_sql() {
        assert_eq!(
            last_row_sql(&bond()),
            "SELECT \"UTCTime\", \"Value\" FROM \"German10yrbond\" ORDER BY id DESC LIMIT 1"
        );
    }
}
