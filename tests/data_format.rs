use std::sync::{Mutex, MutexGuard};

use padbridge::controller::{ObjectKind, ObjectKinds, VirtualId};
use padbridge::dataformat::{
    BindError, DataFormat, ObjectGuid, ObjectInstance, ObjectRequest, MAX_PACKET_SIZE,
};
use padbridge::xinput::{EventBuffer, PolledState, SourceError, XInputSource};
use padbridge::{DeviceError, Mapper, MapperKind, VirtualController};

fn any_request(kinds: ObjectKinds, offset: u32) -> ObjectRequest {
    ObjectRequest {
        kinds,
        guid: None,
        instance: ObjectInstance::Any,
        offset,
    }
}

#[test]
fn test_bind_joystick_like_format() {
    let mapper = Mapper::new(MapperKind::XInputNative);
    let requests = [
        ObjectRequest {
            kinds: ObjectKinds::AXIS,
            guid: Some(ObjectGuid::AxisX),
            instance: ObjectInstance::Any,
            offset: 0,
        },
        ObjectRequest {
            kinds: ObjectKinds::AXIS,
            guid: Some(ObjectGuid::AxisY),
            instance: ObjectInstance::Any,
            offset: 4,
        },
        any_request(ObjectKinds::AXIS, 8),
        any_request(ObjectKinds::POV, 16),
        any_request(ObjectKinds::BUTTON, 20),
        any_request(ObjectKinds::BUTTON, 21),
    ];

    let format = DataFormat::bind(&requests, 24, &mapper).expect("should bind the format");
    assert_eq!(format.packet_size(), 24);

    // The X and Y axes landed on their identities; the free-for-all axis
    // request dequeued the next unused axis, which is Z.
    assert_eq!(
        format.offset_for(VirtualId::new(ObjectKind::Axis, 0)),
        Some(0)
    );
    assert_eq!(
        format.offset_for(VirtualId::new(ObjectKind::Axis, 1)),
        Some(4)
    );
    assert_eq!(
        format.offset_for(VirtualId::new(ObjectKind::Axis, 2)),
        Some(8)
    );
    assert_eq!(
        format.offset_for(VirtualId::new(ObjectKind::Pov, 0)),
        Some(16)
    );
    assert_eq!(
        format.offset_for(VirtualId::new(ObjectKind::Button, 0)),
        Some(20)
    );
    assert_eq!(
        format.offset_for(VirtualId::new(ObjectKind::Button, 1)),
        Some(21)
    );

    // The object and offset maps are mutual inverses, and nothing bound
    // shows up in the unused sets.
    for (id, offset) in format.bindings() {
        assert_eq!(format.object_at(offset), Some(id));
        for kind in [ObjectKind::Axis, ObjectKind::Button, ObjectKind::Pov] {
            assert!(format.unused_offsets(kind).all(|unused| unused != offset));
        }
    }
}

#[test]
fn test_bind_rejects_bad_packet_sizes() {
    let mapper = Mapper::new(MapperKind::XInputNative);
    assert_eq!(
        DataFormat::bind(&[], 13, &mapper).unwrap_err(),
        BindError::PacketSizeUnaligned(13)
    );
    assert_eq!(
        DataFormat::bind(&[], MAX_PACKET_SIZE + 4, &mapper).unwrap_err(),
        BindError::PacketSizeTooLarge(MAX_PACKET_SIZE + 4)
    );
}

#[test]
fn test_bind_rejects_overlapping_claims() {
    let mapper = Mapper::new(MapperKind::XInputNative);
    let requests = [
        any_request(ObjectKinds::AXIS, 0),
        any_request(ObjectKinds::AXIS, 2),
    ];
    assert_eq!(
        DataFormat::bind(&requests, 8, &mapper).unwrap_err(),
        BindError::OffsetOverlap {
            index: 1,
            offset: 2
        }
    );
}

#[test]
fn test_bind_rejects_out_of_bounds_claims() {
    let mapper = Mapper::new(MapperKind::XInputNative);
    let requests = [any_request(ObjectKinds::AXIS, 6)];
    assert_eq!(
        DataFormat::bind(&requests, 8, &mapper).unwrap_err(),
        BindError::OffsetOutOfBounds {
            index: 0,
            offset: 6
        }
    );
}

#[test]
fn test_bind_accepts_specific_instance_zero() {
    // Instance index 0 is as selectable as any other.
    let mapper = Mapper::new(MapperKind::XInputNative);
    let requests = [ObjectRequest {
        kinds: ObjectKinds::BUTTON,
        guid: Some(ObjectGuid::Button),
        instance: ObjectInstance::Index(0),
        offset: 0,
    }];
    let format = DataFormat::bind(&requests, 4, &mapper).expect("should bind button 1");
    assert_eq!(
        format.object_at(0),
        Some(VirtualId::new(ObjectKind::Button, 0))
    );
}

#[test]
fn test_bind_records_unused_offsets() {
    // The shared-triggers profile has five axes; the sixth request has
    // nothing left to bind and its offset is remembered as unused.
    let mapper = Mapper::new(MapperKind::XInputSharedTriggers);
    let requests = [
        any_request(ObjectKinds::AXIS, 0),
        any_request(ObjectKinds::AXIS, 4),
        any_request(ObjectKinds::AXIS, 8),
        any_request(ObjectKinds::AXIS, 12),
        any_request(ObjectKinds::AXIS, 16),
        any_request(ObjectKinds::AXIS, 20),
        any_request(ObjectKinds::POV, 24),
        any_request(ObjectKinds::POV, 28),
    ];
    let format = DataFormat::bind(&requests, 32, &mapper).expect("should bind the format");

    let unused_axes: Vec<u32> = format.unused_offsets(ObjectKind::Axis).collect();
    assert_eq!(unused_axes, vec![20]);
    let unused_povs: Vec<u32> = format.unused_offsets(ObjectKind::Pov).collect();
    assert_eq!(unused_povs, vec![28]);
    assert_eq!(format.object_at(20), None);
}

#[test]
fn test_bind_specific_misses_fail() {
    let mapper = Mapper::new(MapperKind::XInputNative);

    // The same button twice: the second claim cannot be satisfied.
    let requests = [
        ObjectRequest {
            kinds: ObjectKinds::BUTTON,
            guid: None,
            instance: ObjectInstance::Index(3),
            offset: 0,
        },
        ObjectRequest {
            kinds: ObjectKinds::BUTTON,
            guid: None,
            instance: ObjectInstance::Index(3),
            offset: 1,
        },
    ];
    assert_eq!(
        DataFormat::bind(&requests, 4, &mapper).unwrap_err(),
        BindError::InstanceUnavailable(1)
    );

    // An axis identity the profile does not have.
    let standard = Mapper::new(MapperKind::StandardGamepad);
    let requests = [ObjectRequest {
        kinds: ObjectKinds::AXIS,
        guid: Some(ObjectGuid::AxisRx),
        instance: ObjectInstance::Index(0),
        offset: 0,
    }];
    assert_eq!(
        DataFormat::bind(&requests, 4, &standard).unwrap_err(),
        BindError::InstanceUnavailable(0)
    );
}

#[test]
fn test_bind_identity_kind_rules() {
    let mapper = Mapper::new(MapperKind::XInputNative);

    // A non-axis identity on an "any instance" axis slot is a miss, not an
    // error.
    let requests = [ObjectRequest {
        kinds: ObjectKinds::AXIS,
        guid: Some(ObjectGuid::Button),
        instance: ObjectInstance::Any,
        offset: 0,
    }];
    let format = DataFormat::bind(&requests, 4, &mapper).expect("should tolerate the miss");
    let unused: Vec<u32> = format.unused_offsets(ObjectKind::Axis).collect();
    assert_eq!(unused, vec![0]);

    // The same identity with a specific instance is an error.
    let requests = [ObjectRequest {
        kinds: ObjectKinds::AXIS,
        guid: Some(ObjectGuid::Button),
        instance: ObjectInstance::Index(0),
        offset: 0,
    }];
    assert_eq!(
        DataFormat::bind(&requests, 4, &mapper).unwrap_err(),
        BindError::IdentityMismatch(0)
    );

    // A button slot naming an axis identity is always an error.
    let requests = [ObjectRequest {
        kinds: ObjectKinds::BUTTON,
        guid: Some(ObjectGuid::AxisX),
        instance: ObjectInstance::Any,
        offset: 0,
    }];
    assert_eq!(
        DataFormat::bind(&requests, 4, &mapper).unwrap_err(),
        BindError::IdentityMismatch(0)
    );
}

#[test]
fn test_bind_rejects_ambiguous_kind_masks() {
    let mapper = Mapper::new(MapperKind::XInputNative);
    let requests = [any_request(ObjectKinds::AXIS | ObjectKinds::BUTTON, 0)];
    assert_eq!(
        DataFormat::bind(&requests, 4, &mapper).unwrap_err(),
        BindError::AmbiguousKind(0)
    );
    let requests = [any_request(ObjectKinds::ALL, 0)];
    assert!(DataFormat::bind(&requests, 4, &mapper).is_err());
}

struct NullSource {
    buffer: Mutex<EventBuffer>,
}

impl NullSource {
    fn new() -> Self {
        Self {
            buffer: Mutex::new(EventBuffer::new()),
        }
    }
}

impl XInputSource for NullSource {
    fn get_state(&self, _controller_id: u32) -> Result<PolledState, SourceError> {
        Ok(PolledState::default())
    }

    fn event_buffer(&self) -> MutexGuard<'_, EventBuffer> {
        self.buffer.lock().unwrap()
    }
}

#[test]
fn test_failed_rebind_preserves_installed_format() {
    let source = NullSource::new();
    let mut controller = VirtualController::new(MapperKind::XInputNative, &source, 0);

    let good = [
        any_request(ObjectKinds::AXIS, 0),
        any_request(ObjectKinds::BUTTON, 4),
    ];
    controller
        .set_data_format(&good, 8)
        .expect("should install the first format");

    // Two claims over bytes [0..4) and [2..6) overlap, so the whole call
    // fails and the installed format stays in effect.
    let bad = [
        any_request(ObjectKinds::AXIS, 0),
        any_request(ObjectKinds::AXIS, 2),
    ];
    assert_eq!(
        controller.set_data_format(&bad, 8),
        Err(DeviceError::InvalidParam)
    );

    let format = controller
        .data_format()
        .expect("the first format should still be installed");
    assert_eq!(format.packet_size(), 8);
    assert_eq!(
        format.object_at(4),
        Some(VirtualId::new(ObjectKind::Button, 0))
    );
}
