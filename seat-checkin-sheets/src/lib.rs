//! Whole-table access to the spreadsheet that backs the check-in.
//!
//! Tables are always read completely and written back completely; there is no
//! row-level API.

pub mod error;
mod google;
mod memo;
mod memory;
pub mod table;

use core::future::Future;
use std::sync::Arc;

pub use error::SheetsError;
pub use google::GoogleSheets;
pub use memo::{Memoized, TtlMemo};
pub use memory::InMemoryTables;
pub use seat_checkin_config::Worksheet;
pub use table::{Record, Table};

pub trait TableStore: Send + Sync {
    /// Every row of the worksheet, header included.
    fn fetch(
        &self,
        worksheet: &Worksheet,
    ) -> impl Future<Output = Result<Table, SheetsError>> + Send;

    /// Replaces the worksheet's contents with `table`.
    fn save(
        &self,
        worksheet: &Worksheet,
        table: &Table,
    ) -> impl Future<Output = Result<(), SheetsError>> + Send;
}

impl<S: TableStore> TableStore for Arc<S> {
    fn fetch(
        &self,
        worksheet: &Worksheet,
    ) -> impl Future<Output = Result<Table, SheetsError>> + Send {
        (**self).fetch(worksheet)
    }

    fn save(
        &self,
        worksheet: &Worksheet,
        table: &Table,
    ) -> impl Future<Output = Result<(), SheetsError>> + Send {
        (**self).save(worksheet, table)
    }
}
