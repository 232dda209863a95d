use core::time::Duration;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use seat_checkin_config::Worksheet;
use tokio::time::Instant;
use tracing::debug;

use crate::error::SheetsError;
use crate::table::Table;
use crate::TableStore;

#[derive(Debug)]
struct MemoEntry {
    table: Table,
    fetched_at: Instant,
}

/// One cached table per worksheet, each valid for `ttl` after it was stored.
#[derive(Debug)]
pub struct TtlMemo {
    ttl: Duration,
    entries: Mutex<HashMap<Worksheet, MemoEntry>>,
}

impl TtlMemo {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The cached table if it is younger than the ttl.
    #[must_use]
    pub fn get(&self, worksheet: &Worksheet) -> Option<Table> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(worksheet)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.table.clone())
    }

    pub fn put(&self, worksheet: Worksheet, table: Table) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                worksheet,
                MemoEntry {
                    table,
                    fetched_at: Instant::now(),
                },
            );
    }

    pub fn invalidate(&self, worksheet: &Worksheet) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(worksheet);
    }
}

/// Read-through cache in front of another store.
///
/// Saves write through and replace the cached entry, so a fetch inside the ttl
/// sees the saved table without asking the provider again.
#[derive(Debug)]
pub struct Memoized<S> {
    inner: S,
    memo: TtlMemo,
}

impl<S> Memoized<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            memo: TtlMemo::new(ttl),
        }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }

    pub const fn memo(&self) -> &TtlMemo {
        &self.memo
    }
}

impl<S: TableStore> TableStore for Memoized<S> {
    async fn fetch(&self, worksheet: &Worksheet) -> Result<Table, SheetsError> {
        if let Some(table) = self.memo.get(worksheet) {
            debug!(%worksheet, "memo hit");
            return Ok(table);
        }
        debug!(%worksheet, "memo miss");
        let table = self.inner.fetch(worksheet).await?;
        self.memo.put(worksheet.clone(), table.clone());
        Ok(table)
    }

    async fn save(&self, worksheet: &Worksheet, table: &Table) -> Result<(), SheetsError> {
        self.inner.save(worksheet, table).await?;
        self.memo.put(worksheet.clone(), table.clone());
        Ok(())
    }
}
