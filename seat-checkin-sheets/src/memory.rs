use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use seat_checkin_config::Worksheet;

use crate::error::SheetsError;
use crate::table::Table;
use crate::TableStore;

/// Tables kept in process memory. Clones share the same tables.
///
/// A worksheet that was never written reads as an empty table, like a fresh sheet.
#[derive(Clone, Debug, Default)]
pub struct InMemoryTables {
    tables: Arc<Mutex<HashMap<Worksheet, Table>>>,
    fetches: Arc<AtomicUsize>,
    saves: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryTables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_table(self, worksheet: Worksheet, table: Table) -> Self {
        self.insert(worksheet, table);
        self
    }

    pub fn insert(&self, worksheet: Worksheet, table: Table) {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(worksheet, table);
    }

    /// The current contents, bypassing the fetch counter.
    #[must_use]
    pub fn table(&self, worksheet: &Worksheet) -> Table {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(worksheet)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// While set, every fetch and save fails with [`SheetsError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), SheetsError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(SheetsError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl TableStore for InMemoryTables {
    async fn fetch(&self, worksheet: &Worksheet) -> Result<Table, SheetsError> {
        self.check_available()?;
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.table(worksheet))
    }

    async fn save(&self, worksheet: &Worksheet, table: &Table) -> Result<(), SheetsError> {
        self.check_available()?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.insert(worksheet.clone(), table.clone());
        Ok(())
    }
}
