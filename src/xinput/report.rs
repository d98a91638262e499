use packed_struct::prelude::*;

use super::{PhysicalElement, POV_CENTERED};

/// Size of a packed [GamepadReport] in bytes.
pub const GAMEPAD_REPORT_SIZE: usize = 12;

/// Snapshot of the full gamepad state as reported by the XInput side.
///
/// The layout matches the 12-byte XInput gamepad image: a 16-bit button
/// field followed by both triggers and the four stick axes, all words
/// little-endian. Sources that read a wire image can unpack it directly.
#[derive(PackedStruct, Debug, Copy, Clone, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "12")]
pub struct GamepadReport {
    // BYTE 0
    #[packed_field(bits = "7")]
    pub dpad_up: bool,
    #[packed_field(bits = "6")]
    pub dpad_down: bool,
    #[packed_field(bits = "5")]
    pub dpad_left: bool,
    #[packed_field(bits = "4")]
    pub dpad_right: bool,
    #[packed_field(bits = "3")]
    pub start: bool,
    #[packed_field(bits = "2")]
    pub back: bool,
    #[packed_field(bits = "1")]
    pub thumb_l: bool,
    #[packed_field(bits = "0")]
    pub thumb_r: bool,

    // BYTE 1
    #[packed_field(bits = "15")]
    pub lb: bool,
    #[packed_field(bits = "14")]
    pub rb: bool,
    #[packed_field(bits = "13")]
    pub guide: bool,
    #[packed_field(bits = "11")]
    pub a: bool,
    #[packed_field(bits = "10")]
    pub b: bool,
    #[packed_field(bits = "9")]
    pub x: bool,
    #[packed_field(bits = "8")]
    pub y: bool,

    // BYTE 2
    #[packed_field(bytes = "2")]
    pub left_trigger: u8,
    // BYTE 3
    #[packed_field(bytes = "3")]
    pub right_trigger: u8,

    // BYTES 4-11
    #[packed_field(bytes = "4..=5", endian = "lsb")]
    pub thumb_lx: i16,
    #[packed_field(bytes = "6..=7", endian = "lsb")]
    pub thumb_ly: i16,
    #[packed_field(bytes = "8..=9", endian = "lsb")]
    pub thumb_rx: i16,
    #[packed_field(bytes = "10..=11", endian = "lsb")]
    pub thumb_ry: i16,
}

impl Default for GamepadReport {
    fn default() -> Self {
        Self {
            dpad_up: Default::default(),
            dpad_down: Default::default(),
            dpad_left: Default::default(),
            dpad_right: Default::default(),
            start: Default::default(),
            back: Default::default(),
            thumb_l: Default::default(),
            thumb_r: Default::default(),
            lb: Default::default(),
            rb: Default::default(),
            guide: Default::default(),
            a: Default::default(),
            b: Default::default(),
            x: Default::default(),
            y: Default::default(),
            left_trigger: Default::default(),
            right_trigger: Default::default(),
            thumb_lx: Default::default(),
            thumb_ly: Default::default(),
            thumb_rx: Default::default(),
            thumb_ry: Default::default(),
        }
    }
}

impl GamepadReport {
    /// Encode the d-pad state as a POV hat angle.
    pub fn dpad_pov(&self) -> i32 {
        pov_from_dpad(self.dpad_up, self.dpad_down, self.dpad_left, self.dpad_right)
    }

    /// Compare against a previous snapshot and report every element whose
    /// value changed, in a fixed element order. This is the building block a
    /// source uses to fill its event buffer.
    pub fn changed_elements(&self, previous: &GamepadReport) -> Vec<(PhysicalElement, i32)> {
        let mut changes = Vec::new();

        let buttons = [
            (PhysicalElement::ButtonA, self.a, previous.a),
            (PhysicalElement::ButtonB, self.b, previous.b),
            (PhysicalElement::ButtonX, self.x, previous.x),
            (PhysicalElement::ButtonY, self.y, previous.y),
            (PhysicalElement::ButtonLB, self.lb, previous.lb),
            (PhysicalElement::ButtonRB, self.rb, previous.rb),
            (PhysicalElement::ButtonBack, self.back, previous.back),
            (PhysicalElement::ButtonStart, self.start, previous.start),
            (PhysicalElement::ThumbL, self.thumb_l, previous.thumb_l),
            (PhysicalElement::ThumbR, self.thumb_r, previous.thumb_r),
        ];
        for (element, now, before) in buttons {
            if now != before {
                changes.push((element, i32::from(now)));
            }
        }

        if self.dpad_pov() != previous.dpad_pov() {
            changes.push((PhysicalElement::DPad, self.dpad_pov()));
        }

        let axes = [
            (PhysicalElement::LStickX, self.thumb_lx, previous.thumb_lx),
            (PhysicalElement::LStickY, self.thumb_ly, previous.thumb_ly),
            (PhysicalElement::RStickX, self.thumb_rx, previous.thumb_rx),
            (PhysicalElement::RStickY, self.thumb_ry, previous.thumb_ry),
        ];
        for (element, now, before) in axes {
            if now != before {
                changes.push((element, i32::from(now)));
            }
        }

        if self.left_trigger != previous.left_trigger {
            changes.push((PhysicalElement::TriggerL, i32::from(self.left_trigger)));
        }
        if self.right_trigger != previous.right_trigger {
            changes.push((PhysicalElement::TriggerR, i32::from(self.right_trigger)));
        }

        changes
    }
}

/// Convert d-pad direction state into a POV hat angle in hundredths of a
/// degree, north = 0, clockwise. Opposing directions and the released state
/// read as centred.
pub fn pov_from_dpad(up: bool, down: bool, left: bool, right: bool) -> i32 {
    match (up, down, left, right) {
        (true, false, false, false) => 0,
        (true, false, false, true) => 4500,
        (false, false, false, true) => 9000,
        (false, true, false, true) => 13500,
        (false, true, false, false) => 18000,
        (false, true, true, false) => 22500,
        (false, false, true, false) => 27000,
        (true, false, true, false) => 31500,
        _ => POV_CENTERED,
    }
}
