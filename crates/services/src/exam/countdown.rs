use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use super::{ExamEvent, TaskHandle};

pub(crate) const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Start a countdown that sends one `Tick` per `period`, the first one a full
/// period from now. Stops when the handle is dropped or the receiver is gone.
pub(crate) fn spawn_countdown(
    period: Duration,
    generation: u64,
    events: UnboundedSender<ExamEvent>,
) -> TaskHandle {
    TaskHandle::spawn(async move {
        let mut ticks = interval_at(Instant::now() + period, period);
        // A stalled runtime must not replay a burst of seconds.
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            if events.send(ExamEvent::tick(generation)).is_err() {
                break;
            }
        }
    })
}
