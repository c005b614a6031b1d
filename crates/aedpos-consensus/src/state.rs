use crate::domain::TINY_BLOCKS_NUMBER;
use parking_lot::RwLock;

/// Derived values the service caches between blocks.
///
/// Everything consensus-critical lives in the round store; this only keeps
/// what the handlers computed last.
pub struct ConsensusState {
    pub lib_offset: RwLock<Option<i64>>,
    pub last_irreversible_height: RwLock<i64>,
}

impl ConsensusState {
    pub fn new() -> Self {
        Self {
            lib_offset: RwLock::new(None),
            last_irreversible_height: RwLock::new(0),
        }
    }

    /// Offset in rounds, as computed after the last block.
    pub fn lib_offset(&self) -> Option<i64> {
        *self.lib_offset.read()
    }

    /// Store the offset computed at `block_height` and return whether the
    /// irreversible height advanced. Each round offset covers
    /// `TINY_BLOCKS_NUMBER` blocks; the height never moves backwards.
    pub fn record_lib(&self, offset: Option<i64>, block_height: i64) -> bool {
        *self.lib_offset.write() = offset;
        let Some(offset) = offset else {
            return false;
        };
        let height = block_height.saturating_sub(offset.saturating_mul(TINY_BLOCKS_NUMBER));
        let mut last = self.last_irreversible_height.write();
        if height > *last {
            *last = height;
            true
        } else {
            false
        }
    }

    pub fn last_irreversible_height(&self) -> i64 {
        *self.last_irreversible_height.read()
    }
}

impl Default for ConsensusState {
    fn default() -> Self {
        Self::new()
    }
}
