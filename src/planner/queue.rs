//! Block buffer between the planner and the tick context.
//!
//! Single-producer/single-consumer: the planner pushes from foreground, the
//! core claims and discards from tick context. Callers are responsible for
//! masking the driver interrupt around foreground accesses that must not
//! interleave with a tick.

use heapless::Deque;

use crate::error::QueueError;

use super::Block;

/// Consumer view of the planner's block buffer.
pub trait BlockQueue {
    /// Claim the block at the head of the queue, marking it busy.
    ///
    /// The block stays at the head until [`discard_current`] removes it, so
    /// the planner can tell it must no longer be re-planned.
    ///
    /// [`discard_current`]: BlockQueue::discard_current
    fn claim_current(&mut self) -> Option<Block>;

    /// Remove the block previously claimed with [`claim_current`].
    ///
    /// [`claim_current`]: BlockQueue::claim_current
    fn discard_current(&mut self);

    /// Whether any blocks are queued.
    fn has_blocks(&self) -> bool;

    /// Discard every queued block.
    fn clear(&mut self);
}

/// Fixed-capacity block ring.
#[derive(Default)]
pub struct BlockRing<const N: usize = 16> {
    blocks: Deque<Block, N>,
}

impl<const N: usize> BlockRing<N> {
    /// Create an empty ring.
    pub fn new() -> Self {
        Self {
            blocks: Deque::new(),
        }
    }

    /// Producer side: append a planned block.
    pub fn push(&mut self, block: Block) -> Result<(), QueueError> {
        self.blocks.push_back(block).map_err(|_| QueueError::Full)
    }

    /// Number of queued blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the ring is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl<const N: usize> BlockQueue for BlockRing<N> {
    fn claim_current(&mut self) -> Option<Block> {
        let block = self.blocks.front_mut()?;
        block.busy = true;
        Some(*block)
    }

    fn discard_current(&mut self) {
        self.blocks.pop_front();
    }

    fn has_blocks(&self) -> bool {
        !self.blocks.is_empty()
    }

    fn clear(&mut self) {
        self.blocks.clear();
    }
}
