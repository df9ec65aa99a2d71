//! Thread-local in-memory store: the host-ORM stand-in behind the
//! engine's storage contract.
//!
//! Tables are keyed by entity path; rows carry `u64` auto-increment
//! primary keys. Unique constraints come from the schema registry so
//! every write path enforces them. Transactions are whole-store
//! snapshots; savepoints nest the same mechanism.

pub mod row;

use crate::{obs, registry, value::Value};
use row::Row;
use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
};
use thiserror::Error as ThisError;

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("unique constraint violation on {path} ({fields})")]
    UniqueViolation { path: String, fields: String },

    #[error("row {id} not found in {path}")]
    NotFound { path: String, id: u64 },

    #[error("no table registered for entity path '{path}'")]
    TableMissing { path: String },
}

///
/// Table
///

#[derive(Clone, Debug, Default)]
struct Table {
    rows: BTreeMap<u64, Row>,
    next_id: u64,
}

#[derive(Clone, Debug, Default)]
struct Stores {
    tables: HashMap<String, Table>,
}

thread_local! {
    static STORES: RefCell<Stores> = RefCell::new(Stores::default());
}

/// Drop all tables and rows.
pub fn reset() {
    STORES.with(|slot| *slot.borrow_mut() = Stores::default());
}

/// Create an empty table for `path` if absent. Called at registration.
pub fn ensure_table(path: &str) {
    STORES.with(|slot| {
        slot.borrow_mut()
            .tables
            .entry(path.to_string())
            .or_default();
    });
}

/// Insert a row, assigning the next primary key. Fails on unique
/// constraint violations; storage is unchanged on failure.
pub fn insert(path: &str, mut row: Row) -> Result<u64, StoreError> {
    let unique = registry::unique_indexes(path);

    STORES.with(|slot| {
        let mut stores = slot.borrow_mut();
        let table = stores
            .tables
            .get_mut(path)
            .ok_or_else(|| StoreError::TableMissing {
                path: path.to_string(),
            })?;

        check_unique(path, table, &row, &unique, None)?;

        table.next_id += 1;
        let id = table.next_id;
        row.set("id", Value::Uint(id));
        table.rows.insert(id, row);

        Ok(id)
    })
}

/// Overlay `patch` onto an existing row, re-checking unique constraints.
pub fn update(path: &str, id: u64, patch: &[(String, Value)]) -> Result<(), StoreError> {
    let unique = registry::unique_indexes(path);

    STORES.with(|slot| {
        let mut stores = slot.borrow_mut();
        let table = stores
            .tables
            .get_mut(path)
            .ok_or_else(|| StoreError::TableMissing {
                path: path.to_string(),
            })?;

        let mut row = table
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
                id,
            })?;
        row.apply(patch);

        check_unique(path, table, &row, &unique, Some(id))?;
        table.rows.insert(id, row);

        Ok(())
    })
}

/// Fetch one row by primary key.
#[must_use]
pub fn get(path: &str, id: u64) -> Option<Row> {
    obs::metrics::record_query();
    STORES.with(|slot| {
        slot.borrow()
            .tables
            .get(path)
            .and_then(|table| table.rows.get(&id).cloned())
    })
}

/// Scan a whole table. One storage query, however many rows match.
#[must_use]
pub fn rows(path: &str) -> Vec<(u64, Row)> {
    obs::metrics::record_query();
    STORES.with(|slot| {
        slot.borrow().tables.get(path).map_or_else(Vec::new, |table| {
            table.rows.iter().map(|(id, row)| (*id, row.clone())).collect()
        })
    })
}

/// Delete one row. Returns whether it existed.
pub fn delete(path: &str, id: u64) -> bool {
    STORES.with(|slot| {
        slot.borrow_mut()
            .tables
            .get_mut(path)
            .is_some_and(|table| table.rows.remove(&id).is_some())
    })
}

/// Row count for a table.
#[must_use]
pub fn len(path: &str) -> usize {
    STORES.with(|slot| {
        slot.borrow()
            .tables
            .get(path)
            .map_or(0, |table| table.rows.len())
    })
}

/// Run `f` inside a whole-store transaction: on `Err`, every table is
/// restored to its pre-transaction state.
pub fn transaction<R, E>(f: impl FnOnce() -> Result<R, E>) -> Result<R, E> {
    let snapshot = STORES.with(|slot| slot.borrow().clone());

    let outcome = f();
    if outcome.is_err() {
        STORES.with(|slot| *slot.borrow_mut() = snapshot);
    }

    outcome
}

/// Nested savepoint; identical rollback mechanics to [`transaction`],
/// named separately for intent at call sites.
pub fn savepoint<R, E>(f: impl FnOnce() -> Result<R, E>) -> Result<R, E> {
    transaction(f)
}

fn check_unique(
    path: &str,
    table: &Table,
    candidate: &Row,
    unique: &[Vec<String>],
    exclude: Option<u64>,
) -> Result<(), StoreError> {
    for tuple in unique {
        let values: Vec<Value> = tuple.iter().map(|f| candidate.value_or_null(f)).collect();

        // SQL semantics: tuples containing NULL never conflict.
        if values.iter().any(Value::is_null) {
            continue;
        }

        let conflict = table.rows.iter().any(|(id, row)| {
            Some(*id) != exclude
                && tuple
                    .iter()
                    .zip(values.iter())
                    .all(|(f, v)| row.value_or_null(f) == *v)
        });

        if conflict {
            return Err(StoreError::UniqueViolation {
                path: path.to_string(),
                fields: tuple.join(", "),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;

    fn seed() {
        test_fixtures::setup();
    }

    fn title_row(title: &str) -> Row {
        let mut row = Row::new();
        row.set("shared_field", Value::text(title));
        row
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        seed();
        let a = insert(test_fixtures::NORMAL, title_row("a")).unwrap();
        let b = insert(test_fixtures::NORMAL, title_row("b")).unwrap();
        assert_eq!(b, a + 1);
        assert_eq!(len(test_fixtures::NORMAL), 2);
    }

    #[test]
    fn unique_tuple_rejects_duplicates() {
        seed();
        let master = insert(test_fixtures::NORMAL, title_row("a")).unwrap();

        let mut t = Row::new();
        t.set("master", Value::Uint(master));
        t.set("language_code", Value::text("en"));
        insert(test_fixtures::NORMAL_TRANSLATION, t.clone()).unwrap();

        let err = insert(test_fixtures::NORMAL_TRANSLATION, t).unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
    }

    #[test]
    fn null_master_never_conflicts() {
        seed();
        for _ in 0..2 {
            let mut t = Row::new();
            t.set("master", Value::Null);
            t.set("language_code", Value::text("en"));
            insert(test_fixtures::NORMAL_TRANSLATION, t).unwrap();
        }
        assert_eq!(len(test_fixtures::NORMAL_TRANSLATION), 2);
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        seed();
        let before = len(test_fixtures::NORMAL);

        let outcome: Result<(), StoreError> = transaction(|| {
            insert(test_fixtures::NORMAL, title_row("doomed"))?;
            Err(StoreError::NotFound {
                path: test_fixtures::NORMAL.to_string(),
                id: 0,
            })
        });

        assert!(outcome.is_err());
        assert_eq!(len(test_fixtures::NORMAL), before);
    }
}
