//! Work item and batch types.

use crate::{BatchId, CoreError, ItemState, Target};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// One unit of dispatch within a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    /// Position in the submitted batch. Stable and zero-based.
    pub index: usize,

    /// What to invoke.
    pub target: Target,

    /// Current lifecycle state.
    pub state: ItemState,

    /// When the item was admitted.
    pub started_at: Option<DateTime<Utc>>,

    /// When the item reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkItem {
    /// Create a new pending WorkItem.
    pub fn new(index: usize, target: Target) -> Self {
        Self {
            index,
            target,
            state: ItemState::Pending,
            started_at: None,
            finished_at: None,
        }
    }

    /// Mark the item as admitted.
    pub fn start(&mut self) -> Result<(), CoreError> {
        self.transition(ItemState::Pending, ItemState::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the item as succeeded.
    pub fn succeed(&mut self) -> Result<(), CoreError> {
        self.transition(ItemState::Running, ItemState::Succeeded)
    }

    /// Mark the item as failed.
    pub fn fail(&mut self) -> Result<(), CoreError> {
        self.transition(ItemState::Running, ItemState::Failed)
    }

    /// Mark a pending item as never run.
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        self.transition(ItemState::Pending, ItemState::Cancelled)
    }

    /// Milliseconds between admission and the terminal transition, if both happened.
    pub fn elapsed_ms(&self) -> Option<u64> {
        let started = self.started_at?;
        let finished = self.finished_at?;
        Some((finished - started).num_milliseconds().max(0) as u64)
    }

    fn transition(&mut self, from: ItemState, to: ItemState) -> Result<(), CoreError> {
        if self.state != from {
            return Err(CoreError::InvalidStateTransition {
                index: self.index,
                from: format!("{:?}", self.state),
                to: format!("{:?}", to),
            });
        }
        self.state = to;
        if to.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }
}

/// One caller-submitted, ordered collection of work items.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Unique batch identifier.
    pub id: BatchId,

    /// Items in input order. `items[i].index == i`.
    pub items: Vec<WorkItem>,

    /// Maximum number of items running at once. Always at least 1.
    pub concurrency_limit: usize,

    /// Optional batch-level deadline, measured from the start of execution.
    pub deadline: Option<Duration>,

    /// When the batch was created.
    pub created_at: DateTime<Utc>,
}

impl Batch {
    /// Create a new Batch, indexing targets in the order given.
    ///
    /// A concurrency limit of zero is raised to one.
    pub fn new(targets: Vec<Target>, concurrency_limit: usize) -> Self {
        let items = targets
            .into_iter()
            .enumerate()
            .map(|(index, target)| WorkItem::new(index, target))
            .collect();

        Self {
            id: BatchId::generate(),
            items,
            concurrency_limit: concurrency_limit.max(1),
            deadline: None,
            created_at: Utc::now(),
        }
    }

    /// Builder method to set a deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    fn target(n: usize) -> Target {
        Target::new(Method::Get, format!("http://svc/{n}"))
    }

    #[test]
    fn test_batch_indexes_in_input_order() {
        let batch = Batch::new((0..5).map(target).collect(), 2);
        assert_eq!(batch.len(), 5);
        for (i, item) in batch.items.iter().enumerate() {
            assert_eq!(item.index, i);
            assert_eq!(item.target.endpoint, format!("http://svc/{i}"));
            assert_eq!(item.state, ItemState::Pending);
        }
    }

    #[test]
    fn test_zero_concurrency_is_raised() {
        let batch = Batch::new(Vec::new(), 0);
        assert_eq!(batch.concurrency_limit, 1);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_item_lifecycle() {
        let mut item = WorkItem::new(0, target(0));
        item.start().unwrap();
        assert_eq!(item.state, ItemState::Running);
        item.fail().unwrap();
        assert_eq!(item.state, ItemState::Failed);
        assert!(item.elapsed_ms().is_some());
    }

    #[test]
    fn test_terminal_item_is_immutable() {
        let mut item = WorkItem::new(1, target(1));
        item.start().unwrap();
        item.succeed().unwrap();

        assert!(matches!(
            item.fail(),
            Err(CoreError::InvalidStateTransition { index: 1, .. })
        ));
        assert_eq!(item.state, ItemState::Succeeded);
    }

    #[test]
    fn test_only_pending_items_cancel() {
        let mut item = WorkItem::new(2, target(2));
        item.start().unwrap();
        assert!(item.cancel().is_err());

        let mut pending = WorkItem::new(3, target(3));
        pending.cancel().unwrap();
        assert_eq!(pending.state, ItemState::Cancelled);
        assert_eq!(pending.elapsed_ms(), None);
    }
}
