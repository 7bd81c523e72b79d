use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};

use crate::migrations::{
    REQUIRED_INDEX_NAMES, REQUIRED_META_KEYS, run_pending, safe_repair_statement,
};
use crate::state::{
    ensure_store_directory, map_sqlite_error, open_connection, resolve_store_home, store_db_path,
};
use crate::{ClientError, ClientResult};

/// A reference the ledger relies on for deletes: `column` points at `parent`
/// and SQLite must apply `on_delete` when the parent row goes away.
struct ForeignKeyRule {
    column: &'static str,
    parent: &'static str,
    on_delete: &'static str,
}

struct TableShape {
    name: &'static str,
    columns: &'static [&'static str],
    references: &'static [ForeignKeyRule],
}

const STORE_TABLES: [TableShape; 5] = [
    TableShape {
        name: "internal_meta",
        columns: &["key", "value"],
        references: &[],
    },
    TableShape {
        name: "internal_programs",
        columns: &[
            "program_id",
            "program_name",
            "rebate_percentage",
            "start_date",
            "end_date",
            "eligibility_criteria",
            "is_active",
            "created_at",
            "updated_at",
        ],
        references: &[],
    },
    TableShape {
        name: "internal_transactions",
        columns: &[
            "transaction_id",
            "amount",
            "transaction_date",
            "rebate_program_id",
            "created_at",
        ],
        references: &[ForeignKeyRule {
            column: "rebate_program_id",
            parent: "internal_programs",
            on_delete: "SET NULL",
        }],
    },
    TableShape {
        name: "internal_claims",
        columns: &[
            "claim_ref",
            "claim_id",
            "transaction_id",
            "claim_amount",
            "claim_status",
            "claim_date",
            "notes",
        ],
        references: &[ForeignKeyRule {
            column: "transaction_id",
            parent: "internal_transactions",
            on_delete: "CASCADE",
        }],
    },
    TableShape {
        name: "internal_report_cache",
        columns: &["cache_key", "payload", "expires_at"],
        references: &[],
    },
];

/// Location and version of a store that is migrated and checked.
#[derive(Debug, Clone)]
pub struct StoreSetup {
    pub db_path: PathBuf,
    pub schema_version: String,
}

pub fn ensure_initialized() -> ClientResult<StoreSetup> {
    ensure_initialized_with_home_override(None)
}

pub fn ensure_initialized_at(home_override: &Path) -> ClientResult<StoreSetup> {
    ensure_initialized_with_home_override(Some(home_override))
}

/// Brings the store under the resolved home up to the latest schema, then
/// checks that every table, column and delete rule the ledger depends on is
/// present. Indexes and meta keys are recreated when missing; anything else
/// that is off is reported as `store_corrupt` rather than patched.
pub(crate) fn ensure_initialized_with_home_override(
    home_override: Option<&Path>,
) -> ClientResult<StoreSetup> {
    let home = resolve_store_home(home_override)?;
    ensure_store_directory(&home)?;
    let db_path = store_db_path(&home);

    let mut connection = open_connection(&db_path)?;
    run_pending(&mut connection).map_err(|error| migration_error(&db_path, &error))?;

    for table in &STORE_TABLES {
        check_table_shape(&connection, &db_path, table)?;
    }
    restore_missing_indexes(&connection, &db_path)?;
    let schema_version = restore_meta_keys(&connection, &db_path)?;

    tracing::debug!(db_path = %db_path.display(), %schema_version, "rebate store ready");
    Ok(StoreSetup {
        db_path,
        schema_version,
    })
}

/// Lock, corruption and permission failures keep their own codes so callers
/// can tell a busy store from a broken migration.
fn migration_error(db_path: &Path, error: &rusqlite_migration::Error) -> ClientError {
    if let rusqlite_migration::Error::RusqliteError { err, .. } = error {
        let mapped = map_sqlite_error(db_path, err);
        if matches!(
            mapped.code.as_str(),
            "store_locked" | "store_corrupt" | "store_init_permission_denied"
        ) {
            return mapped;
        }
    }
    ClientError::migration_failed(db_path, &error.to_string())
}

fn check_table_shape(
    connection: &Connection,
    db_path: &Path,
    table: &TableShape,
) -> ClientResult<()> {
    let columns = query_strings(
        connection,
        db_path,
        "SELECT name FROM pragma_table_info(?1)",
        table.name,
    )?;
    // A missing table reports no columns at all.
    let has_all_columns = table
        .columns
        .iter()
        .all(|wanted| columns.iter().any(|column| column == wanted));
    if !has_all_columns {
        tracing::warn!(table = table.name, "store table is missing or lacks columns");
        return Err(ClientError::store_corrupt(db_path));
    }

    if table.references.is_empty() {
        return Ok(());
    }
    let mut statement = connection
        .prepare(r#"SELECT "from", "table", on_delete FROM pragma_foreign_key_list(?1)"#)
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let declared = statement
        .query_map([table.name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    for rule in table.references {
        let enforced = declared.iter().any(|(column, parent, on_delete)| {
            column == rule.column
                && parent == rule.parent
                && on_delete.eq_ignore_ascii_case(rule.on_delete)
        });
        if !enforced {
            tracing::warn!(
                table = table.name,
                column = rule.column,
                "store reference lost its delete rule"
            );
            return Err(ClientError::store_corrupt(db_path));
        }
    }
    Ok(())
}

fn restore_missing_indexes(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    let present = query_strings(
        connection,
        db_path,
        "SELECT name FROM sqlite_master WHERE type = ?1",
        "index",
    )?;
    for index_name in REQUIRED_INDEX_NAMES {
        if present.iter().any(|name| name == index_name) {
            continue;
        }
        let sql = safe_repair_statement(index_name).ok_or_else(|| {
            ClientError::store_init_failed(db_path, "Missing canonical SQL for index repair.")
        })?;
        tracing::warn!(index = index_name, "recreating missing index");
        connection
            .execute_batch(&sql)
            .map_err(|error| map_sqlite_error(db_path, &error))?;
    }
    Ok(())
}

/// Restores deleted meta keys and returns the recorded schema version. A key
/// holding an unexpected value means another tool rewrote the store.
fn restore_meta_keys(connection: &Connection, db_path: &Path) -> ClientResult<String> {
    let mut schema_version = None;
    for (key, expected) in REQUIRED_META_KEYS {
        connection
            .execute(
                "INSERT OR IGNORE INTO internal_meta (key, value) VALUES (?1, ?2)",
                params![key, expected],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        let stored = connection
            .query_row(
                "SELECT value FROM internal_meta WHERE key = ?1",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        if stored.as_deref() != Some(expected) {
            return Err(ClientError::store_corrupt(db_path));
        }
        if key == "schema_version" {
            schema_version = stored;
        }
    }
    schema_version.ok_or_else(|| ClientError::store_corrupt(db_path))
}

fn query_strings(
    connection: &Connection,
    db_path: &Path,
    sql: &str,
    argument: &str,
) -> ClientResult<Vec<String>> {
    let mut statement = connection
        .prepare(sql)
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    statement
        .query_map([argument], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|error| map_sqlite_error(db_path, &error))
}
