//! Snapshot-undo transactions over a temporal table.

use crate::error::StoreResult;
use crate::table::TemporalTable;

impl TemporalTable {
    /// Executes a function as one transaction.
    ///
    /// If the function returns `Ok`, its mutations stay committed. If it
    /// returns `Err`, the table is restored to its pre-transaction state —
    /// no partial commit.
    pub fn transaction<F, T>(&mut self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut TemporalTable) -> StoreResult<T>,
    {
        let snapshot = self.state();
        match f(self) {
            Ok(result) => Ok(result),
            Err(e) => {
                self.restore(snapshot);
                tracing::debug!(error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }
}
