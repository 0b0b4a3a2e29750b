//! Tasks deferred until the host finishes its current render pass.

use std::collections::VecDeque;

use crate::types::ComposerAction;

/// Work the session runs at the next flush point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostRenderTask {
    /// Drop the active autocomplete trigger and its query.
    ClearAutocomplete,
    /// Hand a deferred composer action to the host.
    RunAction(ComposerAction),
}

/// FIFO of [`PostRenderTask`]s with a single flush point.
///
/// `flush` drains exactly what was queued before it was called; anything
/// scheduled while the drained tasks are applied waits for the next flush.
#[derive(Debug, Clone, Default)]
pub struct PostRenderQueue {
    tasks: VecDeque<PostRenderTask>,
}

impl PostRenderQueue {
    pub fn schedule(&mut self, task: PostRenderTask) {
        self.tasks.push_back(task);
    }

    /// Take every pending task in scheduling order.
    pub fn flush(&mut self) -> Vec<PostRenderTask> {
        self.tasks.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_drains_in_order_and_leaves_later_tasks() {
        let mut queue = PostRenderQueue::default();
        queue.schedule(PostRenderTask::ClearAutocomplete);
        queue.schedule(PostRenderTask::RunAction(ComposerAction::TakePhoto));

        let drained = queue.flush();
        assert_eq!(
            drained,
            vec![
                PostRenderTask::ClearAutocomplete,
                PostRenderTask::RunAction(ComposerAction::TakePhoto),
            ]
        );
        assert!(queue.is_empty());

        queue.schedule(PostRenderTask::ClearAutocomplete);
        assert_eq!(queue.len(), 1);
    }
}
