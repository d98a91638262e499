use crate::controller::mapper::Mapper;
use crate::controller::properties::AxisPropertiesTable;
use crate::controller::{invert_axis, remap_range, DeviceError, ObjectKind};
use crate::xinput::{
    ControllerEvent, EventBuffer, PhysicalElement, STICK_RANGE_MAX, STICK_RANGE_MIN,
    TRIGGER_RANGE_MAX, TRIGGER_RANGE_MIN, TRIGGER_THRESHOLD,
};

use super::DataFormat;

/// One buffered event in the form the legacy client consumes: the byte
/// offset of the object that changed and its new value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppEvent {
    pub sequence: u32,
    pub timestamp: u32,
    pub offset: u32,
    pub data: u32,
}

/// Whether a batch read consumes the source's queue or leaves it intact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchMode {
    Peek,
    Drain,
}

/// Result of one batch read. `overflowed` reports that the source's buffer
/// overflowed since the previous batch; the events are still valid.
#[derive(Debug, Default)]
pub struct EventBatch {
    pub events: Vec<AppEvent>,
    pub overflowed: bool,
}

/// Last raw trigger values seen, kept so a change to one trigger of a
/// shared axis can be combined with the resting value of the other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TriggerCache {
    pub left: i32,
    pub right: i32,
}

/// Translate up to `max_events` queued physical events into application
/// events.
///
/// Events for elements the profile discards or the data format leaves
/// unbound are skipped without occupying an output slot; in drain mode they
/// are still consumed from the queue. The caller holds the source's
/// event-buffer lock for exactly this call.
pub fn encode_batch(
    buffer: &mut EventBuffer,
    max_events: usize,
    mode: BatchMode,
    mapper: &Mapper,
    properties: &AxisPropertiesTable,
    format: Option<&DataFormat>,
    triggers: &mut TriggerCache,
) -> Result<EventBatch, DeviceError> {
    let overflowed = buffer.take_overflowed();
    let mut events = Vec::new();

    let queued = buffer.len();
    let mut peek_index = 0;
    for _ in 0..queued {
        if events.len() >= max_events {
            break;
        }
        let event = match mode {
            BatchMode::Peek => {
                let Some(event) = buffer.peek(peek_index) else {
                    break;
                };
                peek_index += 1;
                *event
            }
            BatchMode::Drain => {
                let Some(event) = buffer.pop() else {
                    break;
                };
                event
            }
        };

        if let Some((offset, data)) = encode_event(&event, mapper, properties, format, triggers)? {
            events.push(AppEvent {
                sequence: event.sequence,
                timestamp: event.timestamp,
                offset,
                data,
            });
        }
    }

    log::trace!(
        "Encoded {} application events ({} queued, overflowed: {})",
        events.len(),
        queued,
        overflowed
    );

    Ok(EventBatch { events, overflowed })
}

/// Compute the offset and data for one physical event, or `None` when the
/// event has nowhere to go.
fn encode_event(
    event: &ControllerEvent,
    mapper: &Mapper,
    properties: &AxisPropertiesTable,
    format: Option<&DataFormat>,
    triggers: &mut TriggerCache,
) -> Result<Option<(u32, u32)>, DeviceError> {
    let Some(id) = mapper.map_element(event.element) else {
        return Ok(None);
    };
    let Some(offset) = format.and_then(|format| format.offset_for(id)) else {
        return Ok(None);
    };

    let data = match id.kind {
        ObjectKind::Button => {
            // A trigger bound to a button reads as pressed past the pull
            // threshold; real buttons carry their own state.
            let pressed = match event.element {
                PhysicalElement::TriggerL | PhysicalElement::TriggerR => {
                    event.value > TRIGGER_THRESHOLD
                }
                _ => event.value != 0,
            };
            if pressed {
                0x80
            } else {
                0x00
            }
        }
        ObjectKind::Pov => event.value as u32,
        ObjectKind::Axis => {
            let props = properties.axis(id.index).ok_or(DeviceError::Generic)?;
            let value = match event.element {
                PhysicalElement::LStickX | PhysicalElement::RStickX => {
                    props.apply(event.value, STICK_RANGE_MAX)
                }
                PhysicalElement::LStickY | PhysicalElement::RStickY => props.apply(
                    invert_axis(event.value, STICK_RANGE_MIN, STICK_RANGE_MAX),
                    STICK_RANGE_MAX,
                ),
                PhysicalElement::TriggerL | PhysicalElement::TriggerR => {
                    if mapper.has_shared_triggers() {
                        if event.element == PhysicalElement::TriggerL {
                            triggers.left = event.value;
                        } else {
                            triggers.right = event.value;
                        }
                        let direction =
                            mapper.shared_trigger_direction(PhysicalElement::TriggerL);
                        let multiplier = match direction {
                            d if d > 0 => 1,
                            d if d < 0 => -1,
                            _ => return Err(DeviceError::Generic),
                        };
                        let combined =
                            multiplier * triggers.left - multiplier * triggers.right;
                        props.apply(combined, TRIGGER_RANGE_MAX)
                    } else {
                        let displacement = remap_range(
                            event.value,
                            TRIGGER_RANGE_MIN,
                            TRIGGER_RANGE_MAX,
                            -TRIGGER_RANGE_MAX,
                            TRIGGER_RANGE_MAX,
                        );
                        props.apply(displacement, TRIGGER_RANGE_MAX)
                    }
                }
                // No other physical element may drive an axis.
                _ => return Err(DeviceError::Generic),
            };
            value as u32
        }
    };

    Ok(Some((offset, data)))
}
