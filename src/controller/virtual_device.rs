use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::dataformat::events::{encode_batch, BatchMode, EventBatch, TriggerCache};
use crate::dataformat::writer::write_state;
use crate::dataformat::{DataFormat, ObjectRequest};
use crate::xinput::report::GamepadReport;
use crate::xinput::{SourceError, XInputSource};

use super::mapper::{Mapper, MapperKind};
use super::properties::AxisPropertiesTable;
use super::{Capabilities, ControllerState, DeviceError, ObjectKind, ObjectKinds, VirtualId};

/// Offset reported for a virtual object the caller's data format has no
/// slot for.
pub const UNBOUND_OFFSET: u32 = 0xffff_ffff;

/// Identifies one observed source state: the packet number the source
/// reported and the error it returned, if any. Packet numbers are pinned at
/// zero while the source is failing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateIdentifier {
    pub packet_number: u32,
    pub error: Option<SourceError>,
}

/// Axis reporting modes of the legacy API. Only absolute is real; relative
/// is acknowledged and refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisMode {
    Absolute,
    Relative,
}

/// Property kinds the façade understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyKind {
    AxisMode,
    Range,
    Deadzone,
    Saturation,
}

/// What a property request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyTarget {
    /// The whole device.
    Device,
    /// One virtual object by identity.
    Object(VirtualId),
    /// One virtual object located through its bound byte offset.
    Offset(u32),
}

/// A property value, read or written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyValue {
    AxisMode(AxisMode),
    Range { min: i32, max: i32 },
    Deadzone(u32),
    Saturation(u32),
}

/// Outcome of a valid property write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyEffect {
    Applied,
    /// The request was valid and already satisfied.
    NoEffect,
}

/// One virtual object as reported to object enumeration: its identity, its
/// display name, and the byte offset the caller would read it at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub id: VirtualId,
    pub name: String,
    pub offset: u32,
}

/// Everything guarded by the controller's single internal mutex.
#[derive(Debug)]
struct SharedState {
    state: ControllerState,
    identifier: StateIdentifier,
    refresh_needed: bool,
    properties: AxisPropertiesTable,
    triggers: TriggerCache,
}

/// A complete virtual controller: the fixed mapping profile, the memoised
/// latest state, the caller's data format, and serialised access to all of
/// it.
///
/// The source is a borrowed capability and must outlive the controller.
pub struct VirtualController<'a> {
    source: &'a dyn XInputSource,
    controller_id: u32,
    mapper: Mapper,
    format: Option<DataFormat>,
    shared: Mutex<SharedState>,
}

impl<'a> VirtualController<'a> {
    /// Create a controller over the given source, fixed to the given
    /// mapping profile for its whole lifetime.
    pub fn new(kind: MapperKind, source: &'a dyn XInputSource, controller_id: u32) -> Self {
        Self {
            source,
            controller_id,
            mapper: Mapper::new(kind),
            format: None,
            shared: Mutex::new(SharedState {
                state: ControllerState::default(),
                identifier: StateIdentifier::default(),
                refresh_needed: true,
                properties: AxisPropertiesTable::new(),
                triggers: TriggerCache::default(),
            }),
        }
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn capabilities(&self) -> Capabilities {
        self.mapper.capabilities()
    }

    /// Bind the caller's data format. On failure the previously installed
    /// format, if any, stays in effect.
    pub fn set_data_format(
        &mut self,
        requests: &[ObjectRequest],
        packet_size: u32,
    ) -> Result<(), DeviceError> {
        match DataFormat::bind(requests, packet_size, &self.mapper) {
            Ok(format) => {
                self.format = Some(format);
                Ok(())
            }
            Err(err) => {
                log::warn!("Rejected application data format: {}", err);
                Err(err.into())
            }
        }
    }

    /// Drop the bound data format.
    pub fn reset_data_format(&mut self) {
        self.format = None;
    }

    pub fn data_format(&self) -> Option<&DataFormat> {
        self.format.as_ref()
    }

    /// Poll the source and install a freshly mapped state. Returns whether
    /// the virtual controller state really changed.
    pub fn refresh_state(&self) -> Result<bool, DeviceError> {
        let mut shared = self.lock_shared();
        self.refresh_locked(&mut shared)
    }

    /// Copy the latest mapped state, refreshing first when the previous
    /// read armed a refresh. Reading always arms the next refresh.
    pub fn get_state(&self, out: &mut ControllerState) -> Result<(), DeviceError> {
        let mut shared = self.lock_shared();
        if shared.refresh_needed {
            self.refresh_locked(&mut shared)?;
        }
        *out = shared.state;
        shared.refresh_needed = true;
        Ok(())
    }

    /// Write the latest mapped state into the caller's buffer in the shape
    /// of the bound data format.
    pub fn get_mapped_state(&self, out: &mut [u8]) -> Result<(), DeviceError> {
        let Some(format) = self.format.as_ref() else {
            return Err(DeviceError::InvalidParam);
        };

        let state = {
            let mut shared = self.lock_shared();
            if shared.refresh_needed {
                self.refresh_locked(&mut shared)?;
            }
            shared.refresh_needed = true;
            shared.state
        };

        write_state(&state, format, &self.mapper, out)
    }

    /// Translate up to `max_events` buffered physical events into
    /// application events.
    pub fn buffered_events(
        &self,
        max_events: usize,
        mode: BatchMode,
    ) -> Result<EventBatch, DeviceError> {
        // Snapshot what the encoder needs up front so the source's buffer
        // lock is never held together with the controller lock.
        let (properties, mut triggers) = {
            let shared = self.lock_shared();
            (shared.properties, shared.triggers)
        };

        let batch = {
            let mut buffer = self.source.event_buffer();
            encode_batch(
                &mut buffer,
                max_events,
                mode,
                &self.mapper,
                &properties,
                self.format.as_ref(),
                &mut triggers,
            )?
        };

        self.lock_shared().triggers = triggers;
        Ok(batch)
    }

    /// Visit every virtual object of the requested kinds: axes, then POVs,
    /// then buttons. The visitor returns whether to continue.
    pub fn enumerate_objects<F>(&self, kinds: ObjectKinds, mut visitor: F)
    where
        F: FnMut(&ObjectDescriptor) -> bool,
    {
        for kind in [ObjectKind::Axis, ObjectKind::Pov, ObjectKind::Button] {
            if !kinds.contains(kind) {
                continue;
            }
            for index in 0..self.mapper.count_of(kind) {
                let descriptor = self.describe(VirtualId::new(kind, index));
                if !visitor(&descriptor) {
                    return;
                }
            }
        }
    }

    /// Look up one virtual object by identity or bound offset.
    pub fn object_info(&self, target: PropertyTarget) -> Result<ObjectDescriptor, DeviceError> {
        let id = self.resolve_object(target)?;
        Ok(self.describe(id))
    }

    /// Read a property value.
    pub fn get_property(
        &self,
        kind: PropertyKind,
        target: PropertyTarget,
    ) -> Result<PropertyValue, DeviceError> {
        match kind {
            PropertyKind::AxisMode => {
                if target != PropertyTarget::Device {
                    return Err(DeviceError::InvalidParam);
                }
                Ok(PropertyValue::AxisMode(AxisMode::Absolute))
            }
            PropertyKind::Range => {
                let id = self.resolve_axis_target(target)?;
                let shared = self.lock_shared();
                let props = shared
                    .properties
                    .axis(id.index)
                    .ok_or(DeviceError::ObjectNotFound)?;
                Ok(PropertyValue::Range {
                    min: props.range_min,
                    max: props.range_max,
                })
            }
            PropertyKind::Deadzone => {
                let id = self.resolve_axis_target(target)?;
                let shared = self.lock_shared();
                let props = shared
                    .properties
                    .axis(id.index)
                    .ok_or(DeviceError::ObjectNotFound)?;
                Ok(PropertyValue::Deadzone(props.deadzone))
            }
            PropertyKind::Saturation => {
                let id = self.resolve_axis_target(target)?;
                let shared = self.lock_shared();
                let props = shared
                    .properties
                    .axis(id.index)
                    .ok_or(DeviceError::ObjectNotFound)?;
                Ok(PropertyValue::Saturation(props.saturation))
            }
        }
    }

    /// Write a property value. Whole-device writes of range, deadzone and
    /// saturation apply to every axis atomically.
    pub fn set_property(
        &self,
        value: PropertyValue,
        target: PropertyTarget,
    ) -> Result<PropertyEffect, DeviceError> {
        match value {
            PropertyValue::AxisMode(mode) => {
                if target != PropertyTarget::Device {
                    return Err(DeviceError::InvalidParam);
                }
                match mode {
                    // Absolute is the only mode there is.
                    AxisMode::Absolute => Ok(PropertyEffect::NoEffect),
                    AxisMode::Relative => Err(DeviceError::Unsupported),
                }
            }
            PropertyValue::Range { min, max } => {
                if target == PropertyTarget::Device {
                    self.device_axis_target()?;
                    self.lock_shared().properties.set_all_range(min, max)?;
                } else {
                    let id = self.resolve_axis_target(target)?;
                    self.lock_shared().properties.set_range(id.index, min, max)?;
                }
                Ok(PropertyEffect::Applied)
            }
            PropertyValue::Deadzone(deadzone) => {
                if target == PropertyTarget::Device {
                    self.device_axis_target()?;
                    self.lock_shared().properties.set_all_deadzone(deadzone)?;
                } else {
                    let id = self.resolve_axis_target(target)?;
                    self.lock_shared()
                        .properties
                        .set_deadzone(id.index, deadzone)?;
                }
                Ok(PropertyEffect::Applied)
            }
            PropertyValue::Saturation(saturation) => {
                if target == PropertyTarget::Device {
                    self.device_axis_target()?;
                    self.lock_shared().properties.set_all_saturation(saturation)?;
                } else {
                    let id = self.resolve_axis_target(target)?;
                    self.lock_shared()
                        .properties
                        .set_saturation(id.index, saturation)?;
                }
                Ok(PropertyEffect::Applied)
            }
        }
    }

    fn lock_shared(&self) -> MutexGuard<'_, SharedState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn describe(&self, id: VirtualId) -> ObjectDescriptor {
        // Legacy clients observe application offsets once a format is
        // bound, and the native contiguous layout before that.
        let offset = match self.format.as_ref() {
            Some(format) => format.offset_for(id).unwrap_or(UNBOUND_OFFSET),
            None => self.mapper.native_offset(id),
        };
        ObjectDescriptor {
            id,
            name: self.mapper.object_name(id),
            offset,
        }
    }

    /// Resolve a target to an existing virtual object.
    fn resolve_object(&self, target: PropertyTarget) -> Result<VirtualId, DeviceError> {
        match target {
            PropertyTarget::Device => Err(DeviceError::InvalidParam),
            PropertyTarget::Object(id) => {
                if self.mapper.contains(id) {
                    Ok(id)
                } else {
                    Err(DeviceError::ObjectNotFound)
                }
            }
            PropertyTarget::Offset(offset) => self
                .format
                .as_ref()
                .and_then(|format| format.object_at(offset))
                .ok_or(DeviceError::ObjectNotFound),
        }
    }

    /// Resolve a target for an axis-only property. Whole-device targets are
    /// unsupported here; non-axis objects likewise.
    fn resolve_axis_target(&self, target: PropertyTarget) -> Result<VirtualId, DeviceError> {
        if target == PropertyTarget::Device {
            return Err(DeviceError::Unsupported);
        }
        let id = self.resolve_object(target)?;
        if id.kind != ObjectKind::Axis {
            return Err(DeviceError::Unsupported);
        }
        Ok(id)
    }

    /// Whole-device axis writes need at least one axis to write to.
    fn device_axis_target(&self) -> Result<(), DeviceError> {
        if self.mapper.count_of(ObjectKind::Axis) == 0 {
            return Err(DeviceError::ObjectNotFound);
        }
        Ok(())
    }

    /// Poll the source, run the error-code state machine, and install a new
    /// mapped state when something really changed.
    fn refresh_locked(&self, shared: &mut SharedState) -> Result<bool, DeviceError> {
        let polled = self.source.get_state(self.controller_id);
        shared.refresh_needed = false;

        // On failure the snapshot reads as fully neutral and the packet
        // number pins at zero.
        let (new_identifier, gamepad) = match polled {
            Ok(state) => (
                StateIdentifier {
                    packet_number: state.packet_number,
                    error: None,
                },
                state.gamepad,
            ),
            Err(err) => (
                StateIdentifier {
                    packet_number: 0,
                    error: Some(err),
                },
                GamepadReport::default(),
            ),
        };

        // Observations for transitions of the three-state error machine.
        match (shared.identifier.error, new_identifier.error) {
            (Some(SourceError::NotConnected), None) => {
                log::info!("Virtual controller {}: connected", self.controller_id);
            }
            (Some(previous), None) => {
                log::warn!(
                    "Virtual controller {}: previous error condition is now cleared: {}",
                    self.controller_id,
                    previous
                );
            }
            (None, Some(SourceError::NotConnected)) => {
                log::info!("Virtual controller {}: disconnected", self.controller_id);
            }
            (None, Some(err)) => {
                log::warn!(
                    "Virtual controller {}: encountered error during state refresh: {}",
                    self.controller_id,
                    err
                );
            }
            (Some(previous), Some(current)) if previous != current => {
                log::warn!(
                    "Virtual controller {}: error changed during state refresh: {}",
                    self.controller_id,
                    current
                );
            }
            _ => {}
        }

        // An unchanged packet number means an unchanged state, unless the
        // source crossed between working and failing.
        let same_side = shared.identifier.error.is_none() == new_identifier.error.is_none();
        if new_identifier.packet_number == shared.identifier.packet_number && same_side {
            shared.identifier = new_identifier;
            return Ok(false);
        }
        shared.identifier = new_identifier;
        shared.triggers = TriggerCache {
            left: i32::from(gamepad.left_trigger),
            right: i32::from(gamepad.right_trigger),
        };

        let new_state = self.mapper.map_state(&gamepad, &shared.properties)?;

        // Deadzone or a discarding profile can swallow a physical change.
        if new_state == shared.state {
            return Ok(false);
        }
        shared.state = new_state;
        Ok(true)
    }
}
