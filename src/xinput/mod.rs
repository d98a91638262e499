pub mod report;

use std::collections::VecDeque;
use std::sync::MutexGuard;

use thiserror::Error;

use report::GamepadReport;

// Raw axis ranges reported by the XInput side.
pub const STICK_RANGE_MIN: i32 = -32768;
pub const STICK_RANGE_MAX: i32 = 32767;
pub const TRIGGER_RANGE_MIN: i32 = 0;
pub const TRIGGER_RANGE_MAX: i32 = 255;

/// Trigger pull depth beyond which a trigger mapped to a button reads as
/// pressed.
pub const TRIGGER_THRESHOLD: i32 = 30;

/// Neutral (resting) value for sticks and triggers.
pub const ANALOG_NEUTRAL: i32 = 0;

/// Centred point-of-view hat value expected by legacy clients. All bits set
/// when interpreted as an unsigned doubleword.
pub const POV_CENTERED: i32 = -1;

/// How many controller events a source buffers before dropping the oldest.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// A single element of the physical controller as reported by the XInput
/// side. Sticks contribute one element per direction; the d-pad is reported
/// as a whole.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhysicalElement {
    ButtonA,
    ButtonB,
    ButtonX,
    ButtonY,
    ButtonLB,
    ButtonRB,
    ButtonBack,
    ButtonStart,
    ThumbL,
    ThumbR,
    DPad,
    LStickX,
    LStickY,
    RStickX,
    RStickY,
    TriggerL,
    TriggerR,
}

/// Errors a source can report when polled for controller state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceError {
    #[error("device is not connected")]
    NotConnected,
    #[error("source reported error code {0:#010x}")]
    Other(u32),
}

/// A successful state poll: the packet number advances whenever the physical
/// controller state changed, and the snapshot carries the full gamepad state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolledState {
    pub packet_number: u32,
    pub gamepad: GamepadReport,
}

/// A change to one physical element, queued by the source for buffered
/// consumers.
///
/// Button elements carry 0 or 1, the d-pad carries an already-encoded POV
/// angle, and stick/trigger elements carry the raw axis value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerEvent {
    pub element: PhysicalElement,
    pub value: i32,
    pub sequence: u32,
    pub timestamp: u32,
}

/// Bounded FIFO of [ControllerEvent]s owned by a source. Sequence numbers
/// are assigned on push and increase strictly; when the buffer is full the
/// oldest event is dropped and the overflow flag latches until the next
/// batch read consumes it.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<ControllerEvent>,
    capacity: usize,
    overflowed: bool,
    next_sequence: u32,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            overflowed: false,
            next_sequence: 1,
        }
    }

    /// Queue a change to one physical element, assigning it the next
    /// sequence number.
    pub fn push(&mut self, element: PhysicalElement, value: i32, timestamp: u32) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
            self.overflowed = true;
        }
        self.events.push_back(ControllerEvent {
            element,
            value,
            sequence: self.next_sequence,
            timestamp,
        });
        self.next_sequence = self.next_sequence.wrapping_add(1);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Look at the event at the given queue position without consuming it.
    pub fn peek(&self, index: usize) -> Option<&ControllerEvent> {
        self.events.get(index)
    }

    /// Remove and return the oldest queued event.
    pub fn pop(&mut self) -> Option<ControllerEvent> {
        self.events.pop_front()
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Read and clear the overflow flag. Overflow is reported at most once
    /// per overflow episode.
    pub fn take_overflowed(&mut self) -> bool {
        let overflowed = self.overflowed;
        self.overflowed = false;
        overflowed
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// The capabilities the translation core needs from the XInput side. The
/// source outlives any controller borrowing it.
///
/// The event buffer guard is the source's event-buffer lock; callers hold it
/// for the duration of one batch and never together with any other lock.
pub trait XInputSource {
    /// Poll the current controller state.
    fn get_state(&self, controller_id: u32) -> Result<PolledState, SourceError>;

    /// Lock and borrow the source's buffered event queue.
    fn event_buffer(&self) -> MutexGuard<'_, EventBuffer>;
}
