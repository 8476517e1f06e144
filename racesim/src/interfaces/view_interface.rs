use crate::post::race_result::ResultEntry;
use flume::Sender;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// ViewEvent is the event stream from the core to any presentation. The view drains these via a
/// channel; in addition it may poll the shared race state (snapshot_standings) on its own timer.
#[derive(Debug, Clone)]
pub enum ViewEvent {
    /// Human-readable race event line; a view may filter by substring.
    Log(String),
    /// Hint that the live ordering changed and should be re-read.
    StandingsChanged,
    /// Start light n in 1..=5 switched on.
    StartLight(u8),
    /// The start latch was released.
    StartReleased,
    /// The race is over; carries the final classification.
    RaceFinished(Vec<ResultEntry>),
}

/// EventSink wraps the optional channel towards the view. Sending never blocks, and a
/// disconnected or missing view is ignored so that the simulation core stays independent of any
/// presentation. Race-significant lines are mirrored to the log facade on info level; low-level
/// synchronization traces go to debug/trace directly.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<ViewEvent>>,
}

impl EventSink {
    pub fn new(tx: Option<Sender<ViewEvent>>) -> EventSink {
        EventSink { tx }
    }

    pub fn send(&self, event: ViewEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn log(&self, msg: String) {
        log::info!("{}", msg);
        self.send(ViewEvent::Log(msg));
    }
}
