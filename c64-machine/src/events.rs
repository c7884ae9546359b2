//! Typed notifications pushed by the chips to the host.
//!
//! Each producer has its own event type. Listeners are plain closures
//! registered on an [`EventHub`]; the machine drains the events the chips
//! queued during a step and hands them to every listener in order.

/// Notifications from the video unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEvent {
    /// A rendered frame is complete and `frame_buffer()` holds it.
    FrameReady { frame: u64 },
    /// `$D020` changed. Repainting the border alone is enough.
    BorderChanged { color: u8, rgb: u32 },
}

/// What a drive is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveActivity {
    Idle,
    Reading,
    Writing,
}

/// Notifications from the disk subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveEvent {
    /// Channel I/O changed the drive's activity or head position.
    Activity {
        drive: u8,
        state: DriveActivity,
        track: u8,
        sector: u8,
    },
    /// An image was attached. `label` is the disk or tape name.
    Attached { drive: u8, label: String },
    Detached { drive: u8 },
    /// The image contents diverged from what was attached, so a delta is
    /// worth saving.
    Modified { drive: u8 },
}

/// Consumer of the SID's PCM stream.
///
/// Bytes are unsigned 8-bit mono samples at
/// [`SAMPLE_RATE`](crate::devices::sid::SAMPLE_RATE).
pub trait AudioSink: Send {
    fn consume(&mut self, samples: &[u8]);
}

impl<F> AudioSink for F
where
    F: FnMut(&[u8]) + Send,
{
    fn consume(&mut self, samples: &[u8]) {
        self(samples)
    }
}

type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// Ordered list of listeners for one event type.
pub struct EventHub<E> {
    listeners: Vec<Listener<E>>,
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<E> EventHub<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, event: &E) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> std::fmt::Debug for EventHub<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
