pub mod events;
pub mod writer;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::controller::mapper::Mapper;
use crate::controller::{AxisKind, DeviceError, ObjectKind, ObjectKinds, VirtualId};

/// Largest data packet a caller may describe, in bytes.
pub const MAX_PACKET_SIZE: u32 = 1024;

/// Object identities a caller can name in a data-format request, standing in
/// for the GUID constants of the legacy API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectGuid {
    AxisX,
    AxisY,
    AxisZ,
    AxisRx,
    AxisRy,
    AxisRz,
    Button,
    Pov,
}

impl ObjectGuid {
    /// The axis identity this GUID names, if it names one.
    fn axis_kind(&self) -> Option<AxisKind> {
        match self {
            ObjectGuid::AxisX => Some(AxisKind::X),
            ObjectGuid::AxisY => Some(AxisKind::Y),
            ObjectGuid::AxisZ => Some(AxisKind::Z),
            ObjectGuid::AxisRx => Some(AxisKind::RX),
            ObjectGuid::AxisRy => Some(AxisKind::RY),
            ObjectGuid::AxisRz => Some(AxisKind::RZ),
            ObjectGuid::Button | ObjectGuid::Pov => None,
        }
    }
}

/// Which instance of a kind a request asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectInstance {
    /// Any still-unused instance will do.
    Any,
    /// A specific instance. For identity-constrained axis requests this is
    /// the n-th axis of that identity, otherwise the virtual object index.
    Index(u16),
}

/// One object slot in a caller-described data format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectRequest {
    pub kinds: ObjectKinds,
    pub guid: Option<ObjectGuid>,
    pub instance: ObjectInstance,
    pub offset: u32,
}

/// Why a data format failed to bind. All variants leave the previously
/// installed format untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    #[error("packet size {0} is not a multiple of 4")]
    PacketSizeUnaligned(u32),
    #[error("packet size {0} exceeds the maximum of {MAX_PACKET_SIZE}")]
    PacketSizeTooLarge(u32),
    #[error("request {0} does not name exactly one object kind")]
    AmbiguousKind(usize),
    #[error("request {index} does not fit in the packet at offset {offset}")]
    OffsetOutOfBounds { index: usize, offset: u32 },
    #[error("request {index} overlaps an earlier claim at offset {offset}")]
    OffsetOverlap { index: usize, offset: u32 },
    #[error("request {0} names an identity of a different kind")]
    IdentityMismatch(usize),
    #[error("request {0} asks for a specific instance that is unavailable")]
    InstanceUnavailable(usize),
}

impl From<BindError> for DeviceError {
    fn from(_: BindError) -> Self {
        DeviceError::InvalidParam
    }
}

/// A bound data format: the bidirectional assignment between virtual
/// objects and byte offsets in the caller's packet, plus the offsets the
/// caller reserved for objects this profile cannot fill.
#[derive(Clone, Debug, Default)]
pub struct DataFormat {
    packet_size: u32,
    by_object: HashMap<VirtualId, u32>,
    by_offset: HashMap<u32, VirtualId>,
    unused_axis_offsets: HashSet<u32>,
    unused_button_offsets: HashSet<u32>,
    unused_pov_offsets: HashSet<u32>,
}

impl DataFormat {
    /// Bind a caller-described object list against the active profile.
    ///
    /// Binding is deterministic and all-or-nothing: requests are honoured in
    /// order, "any instance" requests dequeue the next unused object of the
    /// matching kind, and the first invalid request fails the whole call
    /// without producing a format.
    pub fn bind(
        requests: &[ObjectRequest],
        packet_size: u32,
        mapper: &Mapper,
    ) -> Result<DataFormat, BindError> {
        if packet_size % 4 != 0 {
            return Err(BindError::PacketSizeUnaligned(packet_size));
        }
        if packet_size > MAX_PACKET_SIZE {
            return Err(BindError::PacketSizeTooLarge(packet_size));
        }

        let mut format = DataFormat {
            packet_size,
            ..Default::default()
        };

        let mut axis_used = vec![false; usize::from(mapper.count_of(ObjectKind::Axis))];
        let mut button_used = vec![false; usize::from(mapper.count_of(ObjectKind::Button))];
        let mut pov_used = vec![false; usize::from(mapper.count_of(ObjectKind::Pov))];
        let mut offset_used = vec![false; packet_size as usize];

        // Next unused instance of each kind, dequeued by "any instance"
        // requests.
        let mut next_axis: u16 = 0;
        let mut next_button: u16 = 0;
        let mut next_pov: u16 = 0;

        for (index, request) in requests.iter().enumerate() {
            let kind = request
                .kinds
                .exactly_one()
                .ok_or(BindError::AmbiguousKind(index))?;

            claim_offsets(&mut offset_used, request.offset, kind.packed_size(), index)?;

            let selected = match kind {
                ObjectKind::Axis => match request.guid {
                    // Any axis identity is acceptable.
                    None => match request.instance {
                        ObjectInstance::Any => select_instance(&mut axis_used, next_axis),
                        ObjectInstance::Index(n) => select_instance(&mut axis_used, n),
                    },
                    Some(guid) => match (guid.axis_kind(), request.instance) {
                        // An identity of another kind never matches an axis:
                        // a miss for "any instance", an error for a specific
                        // one.
                        (None, ObjectInstance::Any) => None,
                        (None, ObjectInstance::Index(_)) => {
                            return Err(BindError::IdentityMismatch(index))
                        }
                        (Some(identity), ObjectInstance::Any) => {
                            let mut selected = None;
                            for nth in 0u16.. {
                                let Some(candidate) = mapper.axis_index_by_kind(identity, nth)
                                else {
                                    break;
                                };
                                selected = select_instance(&mut axis_used, candidate);
                                if selected.is_some() {
                                    break;
                                }
                            }
                            selected
                        }
                        (Some(identity), ObjectInstance::Index(nth)) => mapper
                            .axis_index_by_kind(identity, nth)
                            .and_then(|candidate| select_instance(&mut axis_used, candidate)),
                    },
                },
                ObjectKind::Button => {
                    match request.guid {
                        None | Some(ObjectGuid::Button) => {}
                        Some(_) => return Err(BindError::IdentityMismatch(index)),
                    }
                    match request.instance {
                        ObjectInstance::Any => select_instance(&mut button_used, next_button),
                        ObjectInstance::Index(n) => select_instance(&mut button_used, n),
                    }
                }
                ObjectKind::Pov => {
                    match request.guid {
                        None | Some(ObjectGuid::Pov) => {}
                        Some(_) => return Err(BindError::IdentityMismatch(index)),
                    }
                    match request.instance {
                        ObjectInstance::Any => select_instance(&mut pov_used, next_pov),
                        ObjectInstance::Index(n) => select_instance(&mut pov_used, n),
                    }
                }
            };

            match selected {
                Some(object_index) => {
                    let id = VirtualId::new(kind, object_index);
                    log::debug!(
                        "Mapping {:?} instance {} to data format offset {}",
                        kind,
                        object_index,
                        request.offset
                    );
                    format.by_object.insert(id, request.offset);
                    format.by_offset.insert(request.offset, id);
                }
                None if request.instance == ObjectInstance::Any => {
                    // The caller reserved space for an object the profile
                    // does not have. That is fine; remember the offset.
                    log::debug!(
                        "No unused {:?} available; marking offset {} unused",
                        kind,
                        request.offset
                    );
                    format.unused_offsets_mut(kind).insert(request.offset);
                }
                None => return Err(BindError::InstanceUnavailable(index)),
            }

            // Advance each dequeue position past everything now used.
            next_axis = advance_next_free(&axis_used, next_axis);
            next_button = advance_next_free(&button_used, next_button);
            next_pov = advance_next_free(&pov_used, next_pov);
        }

        log::debug!(
            "Bound data format: packet size {}, {} objects, {} unused offsets",
            packet_size,
            format.by_object.len(),
            format.unused_axis_offsets.len()
                + format.unused_button_offsets.len()
                + format.unused_pov_offsets.len()
        );

        Ok(format)
    }

    pub fn packet_size(&self) -> u32 {
        self.packet_size
    }

    /// Byte offset the caller assigned to a virtual object.
    pub fn offset_for(&self, id: VirtualId) -> Option<u32> {
        self.by_object.get(&id).copied()
    }

    /// Virtual object bound at a byte offset.
    pub fn object_at(&self, offset: u32) -> Option<VirtualId> {
        self.by_offset.get(&offset).copied()
    }

    /// Every bound (object, offset) pair.
    pub fn bindings(&self) -> impl Iterator<Item = (VirtualId, u32)> + '_ {
        self.by_object.iter().map(|(id, offset)| (*id, *offset))
    }

    /// Offsets the caller reserved for objects of one kind that nothing
    /// fills.
    pub fn unused_offsets(&self, kind: ObjectKind) -> impl Iterator<Item = u32> + '_ {
        match kind {
            ObjectKind::Axis => self.unused_axis_offsets.iter().copied(),
            ObjectKind::Button => self.unused_button_offsets.iter().copied(),
            ObjectKind::Pov => self.unused_pov_offsets.iter().copied(),
        }
    }

    fn unused_offsets_mut(&mut self, kind: ObjectKind) -> &mut HashSet<u32> {
        match kind {
            ObjectKind::Axis => &mut self.unused_axis_offsets,
            ObjectKind::Button => &mut self.unused_button_offsets,
            ObjectKind::Pov => &mut self.unused_pov_offsets,
        }
    }
}

/// Claim `size` bytes at `offset`, failing on packet overrun or overlap
/// with an earlier claim.
fn claim_offsets(
    offset_used: &mut [bool],
    offset: u32,
    size: u32,
    request_index: usize,
) -> Result<(), BindError> {
    let start = offset as usize;
    let end = start
        .checked_add(size as usize)
        .ok_or(BindError::OffsetOutOfBounds {
            index: request_index,
            offset,
        })?;
    if end > offset_used.len() {
        return Err(BindError::OffsetOutOfBounds {
            index: request_index,
            offset,
        });
    }
    if offset_used[start..end].iter().any(|used| *used) {
        return Err(BindError::OffsetOverlap {
            index: request_index,
            offset,
        });
    }
    for slot in &mut offset_used[start..end] {
        *slot = true;
    }
    Ok(())
}

/// Mark the candidate instance used and return it, if it exists and is
/// still free. Instance index 0 is as selectable as any other.
fn select_instance(used: &mut [bool], candidate: u16) -> Option<u16> {
    let slot = used.get_mut(usize::from(candidate))?;
    if *slot {
        return None;
    }
    *slot = true;
    Some(candidate)
}

/// First index at or after `from` that is still unused.
fn advance_next_free(used: &[bool], from: u16) -> u16 {
    let mut next = from;
    while usize::from(next) < used.len() && used[usize::from(next)] {
        next += 1;
    }
    next
}
