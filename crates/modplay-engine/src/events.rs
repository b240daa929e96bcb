//! Change notifications from the engine to its consumer.
//!
//! The queue is a pre-allocated single-producer/single-consumer ring. The
//! producer side lives inside the engine core and is only touched under the
//! core lock; the consumer side is drained by the control context at its own
//! pace. Publishing never blocks and never allocates: when the ring is full
//! the event is dropped and counted.

use modplay_common::PlayerState;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::trace;

/// One logical playback change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// A new order position started.
    PatternChanged {
        /// Pattern index at `position`.
        pattern: usize,
        /// Order position.
        position: usize,
    },
    /// The row within the current pattern changed.
    RowChanged {
        /// New row.
        row: usize,
    },
    /// Elapsed whole seconds changed.
    TimeChanged {
        /// Elapsed seconds.
        seconds: u64,
    },
    /// The song ended or decoding failed, and the device has played out
    /// every queued buffer.
    PlaybackFinished,
    /// The controller entered a new state.
    StateChanged(PlayerState),
}

/// Producer half, owned by the engine core.
pub struct EventPublisher {
    producer: HeapProd<PlayerEvent>,
    dropped: u64,
}

/// Consumer half, drained by the control context.
pub struct EventSubscriber {
    consumer: HeapCons<PlayerEvent>,
}

/// Create a queue holding up to `capacity` undelivered events.
pub fn event_queue(capacity: usize) -> (EventPublisher, EventSubscriber) {
    let (producer, consumer) = HeapRb::<PlayerEvent>::new(capacity.max(1)).split();
    (
        EventPublisher {
            producer,
            dropped: 0,
        },
        EventSubscriber { consumer },
    )
}

impl EventPublisher {
    /// Queue an event; drops it if the consumer has fallen behind.
    pub fn publish(&mut self, event: PlayerEvent) {
        trace!(?event, "publish");
        if self.producer.try_push(event).is_err() {
            self.dropped += 1;
        }
    }

    /// Events lost to a full queue since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl EventSubscriber {
    /// Take the oldest pending event.
    pub fn poll(&mut self) -> Option<PlayerEvent> {
        self.consumer.try_pop()
    }

    /// Take every pending event in delivery order.
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(event) = self.consumer.try_pop() {
            events.push(event);
        }
        events
    }

    /// Number of undelivered events.
    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }
}
