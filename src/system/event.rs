//! Host events and their delivery to the watchface

use chrono::NaiveDateTime;
use heapless::Vec;

use super::message::{AppMessageResult, INBOX_SIZE};
use crate::ui::{
    AppMessageHandlers, BatteryChargeState, BatteryStateHandler, ConnectionHandler, Host,
    TickHandler,
};

/// One callback from the host runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A new minute started
    Tick(NaiveDateTime),
    /// A dictionary arrived from the companion app
    InboxReceived(Vec<u8, INBOX_SIZE>),
    /// An inbound message was lost before it could be delivered
    InboxDropped(AppMessageResult),
    /// The last outbound message was delivered
    OutboxSent,
    /// The last outbound message was not delivered
    OutboxFailed(AppMessageResult),
    BatteryChanged(BatteryChargeState),
    ConnectionChanged(bool),
}

/// Route one event to the matching callback.
///
/// Callers deliver events one at a time; handlers never run concurrently.
pub fn dispatch<H, W>(watchface: &mut W, host: &mut H, event: &Event)
where
    H: Host,
    W: TickHandler<H> + AppMessageHandlers<H> + BatteryStateHandler<H> + ConnectionHandler<H>,
{
    match event {
        Event::Tick(now) => watchface.on_tick(host, now),
        Event::InboxReceived(payload) => watchface.inbox_received(host, payload),
        Event::InboxDropped(reason) => watchface.inbox_dropped(*reason),
        Event::OutboxSent => watchface.outbox_sent(),
        Event::OutboxFailed(reason) => watchface.outbox_failed(*reason),
        Event::BatteryChanged(state) => watchface.on_battery_change(host, *state),
        Event::ConnectionChanged(connected) => watchface.on_connection_change(host, *connected),
    }
}
