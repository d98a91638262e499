use crate::controller::mapper::Mapper;
use crate::controller::{ControllerState, DeviceError, ObjectKind};
use crate::xinput::POV_CENTERED;

use super::DataFormat;

/// Serialise a mapped controller state into the caller's buffer at the
/// offsets of the bound data format.
///
/// Validation happens before the first byte is written: an undersized
/// buffer is the caller's error, a binding that disagrees with the active
/// profile is ours. The packet area is zeroed, bound objects are written
/// (axes and POVs as little-endian doublewords, buttons as 0x80/0x00), and
/// every unused POV offset reads as centred.
pub fn write_state(
    state: &ControllerState,
    format: &DataFormat,
    mapper: &Mapper,
    out: &mut [u8],
) -> Result<(), DeviceError> {
    let packet_size = format.packet_size() as usize;
    if out.len() < packet_size {
        return Err(DeviceError::InvalidParam);
    }

    for (id, offset) in format.bindings() {
        if !mapper.contains(id) {
            return Err(DeviceError::Generic);
        }
        let end = offset as usize + id.kind.packed_size() as usize;
        if end > packet_size {
            return Err(DeviceError::Generic);
        }
    }

    // Everything not explicitly written reads as zero.
    out[..packet_size].fill(0);

    for (id, offset) in format.bindings() {
        let offset = offset as usize;
        match id.kind {
            ObjectKind::Axis => {
                let value = state.axes[usize::from(id.index)];
                out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            }
            ObjectKind::Pov => {
                let value = state.povs[usize::from(id.index)];
                out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            }
            ObjectKind::Button => {
                out[offset] = if state.buttons[usize::from(id.index)] {
                    0x80
                } else {
                    0x00
                };
            }
        }
    }

    // POV slots the caller reserved but the profile cannot drive must still
    // read as centred rather than zero (zero means north).
    for offset in format.unused_offsets(ObjectKind::Pov) {
        let offset = offset as usize;
        out[offset..offset + 4].copy_from_slice(&POV_CENTERED.to_le_bytes());
    }

    Ok(())
}
