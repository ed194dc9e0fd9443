use relmap_core::{Result, Storage};
use tracing::debug;

/// Tracks how deeply transactions are nested so that only the outermost
/// begin and commit reach the storage.
///
/// A rollback at any depth rolls back the whole transaction immediately and
/// resets the depth to zero. Commits issued after that are no-ops.
#[derive(Debug, Default)]
pub(crate) struct TransactionManager {
    depth: u32,
}

impl TransactionManager {
    pub(crate) fn depth(&self) -> u32 {
        self.depth
    }

    pub(crate) fn start(&mut self, storage: &mut dyn Storage) -> Result<()> {
        if self.depth == 0 {
            debug!("begin transaction");
            storage.begin_transaction()?;
        } else {
            debug!(depth = self.depth, "joining open transaction");
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn commit(&mut self, storage: &mut dyn Storage) -> Result<()> {
        match self.depth {
            0 => {
                debug!("commit without an open transaction; ignoring");
                Ok(())
            }
            1 => {
                self.depth = 0;
                debug!("commit transaction");
                storage.commit()
            }
            _ => {
                self.depth -= 1;
                Ok(())
            }
        }
    }

    pub(crate) fn rollback(&mut self, storage: &mut dyn Storage) -> Result<()> {
        if self.depth == 0 {
            debug!("rollback without an open transaction; ignoring");
            return Ok(());
        }

        debug!(depth = self.depth, "rollback transaction");
        self.depth = 0;
        storage.rollback()
    }
}
