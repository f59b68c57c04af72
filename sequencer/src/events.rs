//! Producer notifications.

use tessera_primitives::UnprovenBlock;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerEvent {
    UnprovenBlockProduced(UnprovenBlock),
}

/// Broadcast channel for [`ProducerEvent`]s. Subscribers that fall behind
/// by more than the capacity miss events rather than block the producer.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ProducerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProducerEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers reached.
    pub fn emit(&self, event: ProducerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_primitives::NetworkState;

    #[tokio::test]
    async fn test_emit_without_subscribers_is_harmless() {
        let bus = EventBus::new(4);
        let block = UnprovenBlock::new(NetworkState::empty(), vec![]);
        assert_eq!(bus.emit(ProducerEvent::UnprovenBlockProduced(block.clone())), 0);

        let mut rx = bus.subscribe();
        assert_eq!(bus.emit(ProducerEvent::UnprovenBlockProduced(block.clone())), 1);
        assert_eq!(rx.recv().await.unwrap(), ProducerEvent::UnprovenBlockProduced(block));
    }
}
