// Communication channels lock-free

use crate::audio::mixer::ScheduledClick;
use crate::messaging::notification::Notification;
use crate::sequencer::scheduler::BeatEvent;
use ringbuf::{HeapRb, traits::Split};

/// Scheduler -> audio callback
pub type ClickProducer = ringbuf::HeapProd<ScheduledClick>;
pub type ClickConsumer = ringbuf::HeapCons<ScheduledClick>;

pub fn create_click_channel(capacity: usize) -> (ClickProducer, ClickConsumer) {
    let rb = HeapRb::<ScheduledClick>::new(capacity);
    rb.split()
}

/// Scheduler -> presentation (visual pulse)
pub type BeatProducer = ringbuf::HeapProd<BeatEvent>;
pub type BeatConsumer = ringbuf::HeapCons<BeatEvent>;

pub fn create_beat_channel(capacity: usize) -> (BeatProducer, BeatConsumer) {
    let rb = HeapRb::<BeatEvent>::new(capacity);
    rb.split()
}

/// Any thread -> UI, for problems the user should hear about
pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}
