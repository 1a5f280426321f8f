// Simulated delivery receipts: every outbound message is marked delivered one
// tick after sending and read one tick after that.

use log::debug;

use super::{post, ChatEvent, EventSender, Timing};
use crate::models::DeliveryStatus;

/// Spawn the receipt timers for one message. The target ids are fixed here,
/// so the receipts land on the right conversation whatever is active later.
pub fn schedule_receipts(events: EventSender, timing: Timing, contact_id: String, message_id: String) {
    tokio::spawn(async move {
        for status in [DeliveryStatus::Delivered, DeliveryStatus::Read] {
            tokio::time::sleep(timing.ticks(1)).await;
            debug!("Simulated receipt: message {} for {} is {:?}", message_id, contact_id, status);
            post(
                &events,
                ChatEvent::StatusAdvanced {
                    contact_id: contact_id.clone(),
                    message_id: message_id.clone(),
                    status,
                },
            )
            .await;
        }
    });
}
