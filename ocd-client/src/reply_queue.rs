use std::collections::VecDeque;

use tokio::sync::oneshot;

use crate::error::DispatchError;

/// Completion handles of commands that wait for a reply, in the order the commands were sent.
///
/// The server answers strictly in order, so the oldest handle always belongs to the next reply.
/// There is no per-entry timeout: a reply that never arrives keeps its slot and
/// every reply behind it waits as well.
#[derive(Debug, Default)]
pub struct ReplyQueue {
    pending: VecDeque<oneshot::Sender<String>>,
}

impl ReplyQueue {
    pub fn new() -> ReplyQueue {
        ReplyQueue::default()
    }

    /// Appends the handle of a command that has just been sent.
    pub fn enqueue(&mut self, reply: oneshot::Sender<String>) {
        self.pending.push_back(reply);
    }

    /// Completes the oldest pending command with `reply`.
    ///
    /// A command whose caller stopped waiting still consumes its reply.
    pub fn complete(&mut self, reply: String) -> Result<(), DispatchError> {
        let Some(sender) = self.pending.pop_front() else {
            return Err(DispatchError::UnmatchedReply(reply));
        };
        if let Err(reply) = sender.send(reply) {
            log::debug!("Dropping reply for abandoned command: {}", reply);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops all pending handles. Their receivers observe a closed channel.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod test {
    use tokio::sync::oneshot;

    use super::ReplyQueue;
    use crate::error::DispatchError;

    #[test]
    fn replies_complete_in_send_order() {
        let mut queue = ReplyQueue::new();
        let receivers: Vec<_> = (0..3)
            .map(|_| {
                let (tx, rx) = oneshot::channel();
                queue.enqueue(tx);
                rx
            })
            .collect();

        for reply in ["r0", "r1", "r2"] {
            queue.complete(reply.to_string()).unwrap();
        }

        let replies: Vec<_> = receivers
            .into_iter()
            .map(|mut rx| rx.try_recv().unwrap())
            .collect();
        assert_eq!(replies, ["r0", "r1", "r2"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn abandoned_command_keeps_its_slot() {
        let mut queue = ReplyQueue::new();
        let (tx, rx) = oneshot::channel();
        queue.enqueue(tx);
        drop(rx);
        let (tx, mut rx) = oneshot::channel();
        queue.enqueue(tx);

        queue.complete("late".to_string()).unwrap();
        assert_eq!(queue.len(), 1);
        queue.complete("mine".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "mine");
    }

    #[test]
    fn reply_without_command() {
        let mut queue = ReplyQueue::new();
        assert_eq!(
            queue.complete("stray".to_string()),
            Err(DispatchError::UnmatchedReply("stray".to_string()))
        );
    }

    #[test]
    fn clear_closes_receivers() {
        let mut queue = ReplyQueue::new();
        let (tx, mut rx) = oneshot::channel::<String>();
        queue.enqueue(tx);
        queue.clear();
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
    }
}
