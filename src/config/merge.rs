use toml::{Table, Value};

/// Merges `overlay` into `base`.
///
/// Nested tables are merged key by key; any other value in `overlay`
/// (including arrays) replaces the one in `base`.
pub fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Inserts `value` under a dotted path, creating intermediate tables.
///
/// A scalar sitting where a table is needed gets replaced by the table.
pub fn insert_at_path(table: &mut Table, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        match (table.get_mut(*first), value) {
            (Some(Value::Table(base)), Value::Table(overlay)) => deep_merge(base, overlay),
            (_, value) => {
                table.insert((*first).to_string(), value);
            }
        }
        return;
    }

    if !matches!(table.get(*first), Some(Value::Table(_))) {
        table.insert((*first).to_string(), Value::Table(Table::new()));
    }

    if let Some(Value::Table(nested)) = table.get_mut(*first) {
        insert_at_path(nested, rest, value);
    }
}
