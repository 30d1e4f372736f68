// Messaging - Lock-free hand-off between the scheduler, audio and presentation threads

pub mod channels;
pub mod notification;
