use crate::xinput::report::GamepadReport;
use crate::xinput::{
    PhysicalElement, STICK_RANGE_MAX, STICK_RANGE_MIN, TRIGGER_RANGE_MAX, TRIGGER_RANGE_MIN,
    TRIGGER_THRESHOLD,
};

use super::properties::AxisPropertiesTable;
use super::{
    invert_axis, remap_range, AxisKind, Capabilities, ControllerState, DeviceError, ObjectKind,
    VirtualId, MAX_AXES, MAX_BUTTONS, MAX_POVS, UNKNOWN_AXIS_NAME,
};

/// Named mapping profiles. The profile chosen at construction is fixed for
/// the lifetime of the virtual controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MapperKind {
    /// Button layout of an older DirectInput-era gamepad: right stick on Z
    /// and Z-rotation, triggers on two extra buttons.
    StandardGamepad,
    /// Like [MapperKind::StandardGamepad] but each trigger gets its own
    /// rotation axis instead of a button.
    ExtendedGamepad,
    /// Matches how XInput itself models the controller: one axis per stick
    /// direction and per trigger.
    #[default]
    XInputNative,
    /// Like [MapperKind::XInputNative] except both triggers share the Z
    /// axis, pulling it in opposite directions.
    XInputSharedTriggers,
}

impl MapperKind {
    /// Parse a profile name from configuration. Unrecognised names map to
    /// `None` so the caller can fall back to the default.
    pub fn from_name(name: &str) -> Option<MapperKind> {
        match name {
            "StandardGamepad" => Some(MapperKind::StandardGamepad),
            "ExtendedGamepad" => Some(MapperKind::ExtendedGamepad),
            "XInputNative" => Some(MapperKind::XInputNative),
            "XInputSharedTriggers" => Some(MapperKind::XInputSharedTriggers),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MapperKind::StandardGamepad => "StandardGamepad",
            MapperKind::ExtendedGamepad => "ExtendedGamepad",
            MapperKind::XInputNative => "XInputNative",
            MapperKind::XInputSharedTriggers => "XInputSharedTriggers",
        }
    }
}

// Axis layouts per profile, in virtual axis index order.
const AXES_STANDARD: &[AxisKind] = &[AxisKind::X, AxisKind::Y, AxisKind::Z, AxisKind::RZ];
const AXES_EXTENDED: &[AxisKind] = &[
    AxisKind::X,
    AxisKind::Y,
    AxisKind::Z,
    AxisKind::RX,
    AxisKind::RY,
    AxisKind::RZ,
];
const AXES_NATIVE: &[AxisKind] = &[
    AxisKind::X,
    AxisKind::Y,
    AxisKind::Z,
    AxisKind::RX,
    AxisKind::RY,
    AxisKind::RZ,
];
const AXES_SHARED: &[AxisKind] = &[
    AxisKind::X,
    AxisKind::Y,
    AxisKind::Z,
    AxisKind::RX,
    AxisKind::RY,
];

/// Immutable projection table from physical controller elements onto the
/// virtual objects one profile exposes. No behaviour beyond lookup lives
/// here except [Mapper::map_state], which runs the full projection for one
/// snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mapper {
    kind: MapperKind,
    axes: &'static [AxisKind],
    buttons: u16,
    povs: u16,
}

impl Mapper {
    pub fn new(kind: MapperKind) -> Self {
        let (axes, buttons) = match kind {
            MapperKind::StandardGamepad => (AXES_STANDARD, 12),
            MapperKind::ExtendedGamepad => (AXES_EXTENDED, 10),
            MapperKind::XInputNative => (AXES_NATIVE, 10),
            MapperKind::XInputSharedTriggers => (AXES_SHARED, 10),
        };
        Self {
            kind,
            axes,
            buttons,
            povs: 1,
        }
    }

    pub fn kind(&self) -> MapperKind {
        self.kind
    }

    pub fn count_of(&self, kind: ObjectKind) -> u16 {
        match kind {
            ObjectKind::Axis => self.axes.len() as u16,
            ObjectKind::Button => self.buttons,
            ObjectKind::Pov => self.povs,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            axes: self.count_of(ObjectKind::Axis),
            buttons: self.count_of(ObjectKind::Button),
            povs: self.count_of(ObjectKind::Pov),
        }
    }

    /// Semantic identity of the axis at the given index.
    pub fn axis_kind(&self, index: u16) -> Option<AxisKind> {
        self.axes.get(usize::from(index)).copied()
    }

    /// Index of the `nth` axis (0-based) whose semantic identity matches.
    pub fn axis_index_by_kind(&self, kind: AxisKind, nth: u16) -> Option<u16> {
        self.axes
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == kind)
            .nth(usize::from(nth))
            .map(|(i, _)| i as u16)
    }

    /// Whether the given virtual object exists under this profile.
    pub fn contains(&self, id: VirtualId) -> bool {
        id.index < self.count_of(id.kind)
    }

    /// The virtual object driven by one physical element, if the profile
    /// maps it at all.
    pub fn map_element(&self, element: PhysicalElement) -> Option<VirtualId> {
        use ObjectKind::{Axis, Button, Pov};
        use PhysicalElement as E;

        let id = match element {
            E::ButtonA => VirtualId::new(Button, 0),
            E::ButtonB => VirtualId::new(Button, 1),
            E::ButtonX => VirtualId::new(Button, 2),
            E::ButtonY => VirtualId::new(Button, 3),
            E::ButtonLB => VirtualId::new(Button, 4),
            E::ButtonRB => VirtualId::new(Button, 5),
            E::ButtonBack => VirtualId::new(Button, self.aux_button_base()),
            E::ButtonStart => VirtualId::new(Button, self.aux_button_base() + 1),
            E::ThumbL => VirtualId::new(Button, self.aux_button_base() + 2),
            E::ThumbR => VirtualId::new(Button, self.aux_button_base() + 3),
            E::DPad => VirtualId::new(Pov, 0),
            E::LStickX => VirtualId::new(Axis, 0),
            E::LStickY => VirtualId::new(Axis, 1),
            E::RStickX => match self.kind {
                MapperKind::StandardGamepad | MapperKind::ExtendedGamepad => VirtualId::new(Axis, 2),
                MapperKind::XInputNative | MapperKind::XInputSharedTriggers => {
                    VirtualId::new(Axis, 3)
                }
            },
            E::RStickY => match self.kind {
                MapperKind::StandardGamepad => VirtualId::new(Axis, 3),
                MapperKind::ExtendedGamepad => VirtualId::new(Axis, 5),
                MapperKind::XInputNative | MapperKind::XInputSharedTriggers => {
                    VirtualId::new(Axis, 4)
                }
            },
            E::TriggerL => match self.kind {
                MapperKind::StandardGamepad => VirtualId::new(Button, 6),
                MapperKind::ExtendedGamepad => VirtualId::new(Axis, 3),
                MapperKind::XInputNative | MapperKind::XInputSharedTriggers => {
                    VirtualId::new(Axis, 2)
                }
            },
            E::TriggerR => match self.kind {
                MapperKind::StandardGamepad => VirtualId::new(Button, 7),
                MapperKind::ExtendedGamepad => VirtualId::new(Axis, 4),
                MapperKind::XInputNative => VirtualId::new(Axis, 5),
                MapperKind::XInputSharedTriggers => VirtualId::new(Axis, 2),
            },
        };

        Some(id)
    }

    /// First button index after the six face/shoulder buttons that is used
    /// for Back, Start and the stick clicks.
    fn aux_button_base(&self) -> u16 {
        match self.kind {
            // Buttons 6 and 7 belong to the triggers on this profile.
            MapperKind::StandardGamepad => 8,
            _ => 6,
        }
    }

    /// Whether both triggers drive the same virtual axis.
    pub fn has_shared_triggers(&self) -> bool {
        match (
            self.map_element(PhysicalElement::TriggerL),
            self.map_element(PhysicalElement::TriggerR),
        ) {
            (Some(lt), Some(rt)) => lt == rt,
            _ => false,
        }
    }

    /// Direction a trigger pulls a shared axis: the left trigger pulls
    /// positive, the right trigger negative. Never zero.
    pub fn shared_trigger_direction(&self, element: PhysicalElement) -> i32 {
        if element == PhysicalElement::TriggerL {
            1
        } else {
            -1
        }
    }

    /// Display name of a virtual object, 1-based for buttons and POVs.
    pub fn object_name(&self, id: VirtualId) -> String {
        match id.kind {
            ObjectKind::Axis => self
                .axis_kind(id.index)
                .map(|kind| kind.display_name())
                .unwrap_or(UNKNOWN_AXIS_NAME)
                .to_string(),
            ObjectKind::Button => format!("Button {}", id.index + 1),
            ObjectKind::Pov => format!("POV {}", id.index + 1),
        }
    }

    /// Byte offset of an object in the native contiguous layout: axes, then
    /// POVs, then buttons. Legacy clients observe these offsets before any
    /// data format is bound.
    pub fn native_offset(&self, id: VirtualId) -> u32 {
        let axis_bytes = u32::from(self.count_of(ObjectKind::Axis)) * ObjectKind::Axis.packed_size();
        let pov_bytes = u32::from(self.count_of(ObjectKind::Pov)) * ObjectKind::Pov.packed_size();
        let index = u32::from(id.index);
        match id.kind {
            ObjectKind::Axis => index * ObjectKind::Axis.packed_size(),
            ObjectKind::Pov => axis_bytes + index * ObjectKind::Pov.packed_size(),
            ObjectKind::Button => axis_bytes + pov_bytes + index,
        }
    }

    /// Project one gamepad snapshot through this profile and the configured
    /// axis properties into a virtual controller state.
    ///
    /// Every virtual target may be driven at most once per snapshot; any
    /// reuse or kind mismatch means the profile table itself is broken and
    /// surfaces as [DeviceError::Generic].
    pub fn map_state(
        &self,
        report: &GamepadReport,
        properties: &AxisPropertiesTable,
    ) -> Result<ControllerState, DeviceError> {
        let mut state = ControllerState::default();
        let mut axis_touched = [false; MAX_AXES];
        let mut button_touched = [false; MAX_BUTTONS];
        let mut pov_touched = [false; MAX_POVS];

        // Triggers first: they are the only elements that can share a
        // target.
        let lt = self.map_element(PhysicalElement::TriggerL);
        let rt = self.map_element(PhysicalElement::TriggerR);
        let lt_raw = i32::from(report.left_trigger);
        let rt_raw = i32::from(report.right_trigger);

        match (lt, rt) {
            (Some(shared), Some(other)) if shared == other => {
                if shared.kind != ObjectKind::Axis || !self.contains(shared) {
                    return Err(DeviceError::Generic);
                }
                let index = usize::from(shared.index);
                if axis_touched[index] {
                    return Err(DeviceError::Generic);
                }
                axis_touched[index] = true;

                let direction = self.shared_trigger_direction(PhysicalElement::TriggerL);
                let multiplier = match direction {
                    d if d > 0 => 1,
                    d if d < 0 => -1,
                    _ => return Err(DeviceError::Generic),
                };
                let combined = multiplier * lt_raw - multiplier * rt_raw;

                let props = properties
                    .axis(shared.index)
                    .ok_or(DeviceError::Generic)?;
                state.axes[index] = props.apply(combined, TRIGGER_RANGE_MAX);
            }
            _ => {
                for (id, raw) in [(lt, lt_raw), (rt, rt_raw)] {
                    let Some(id) = id else {
                        continue;
                    };
                    if !self.contains(id) {
                        return Err(DeviceError::Generic);
                    }
                    match id.kind {
                        ObjectKind::Axis => {
                            let index = usize::from(id.index);
                            if axis_touched[index] {
                                return Err(DeviceError::Generic);
                            }
                            axis_touched[index] = true;

                            // Recentre the trigger so released rests at the
                            // low end of the output range.
                            let displacement = remap_range(
                                raw,
                                TRIGGER_RANGE_MIN,
                                TRIGGER_RANGE_MAX,
                                -TRIGGER_RANGE_MAX,
                                TRIGGER_RANGE_MAX,
                            );
                            let props =
                                properties.axis(id.index).ok_or(DeviceError::Generic)?;
                            state.axes[index] = props.apply(displacement, TRIGGER_RANGE_MAX);
                        }
                        ObjectKind::Button => {
                            let index = usize::from(id.index);
                            if button_touched[index] {
                                return Err(DeviceError::Generic);
                            }
                            button_touched[index] = true;
                            state.buttons[index] = raw > TRIGGER_THRESHOLD;
                        }
                        ObjectKind::Pov => return Err(DeviceError::Generic),
                    }
                }
            }
        }

        // Stick axes. Vertical sticks are inverted to match the convention
        // legacy clients expect.
        let sticks = [
            (PhysicalElement::LStickX, i32::from(report.thumb_lx), false),
            (PhysicalElement::LStickY, i32::from(report.thumb_ly), true),
            (PhysicalElement::RStickX, i32::from(report.thumb_rx), false),
            (PhysicalElement::RStickY, i32::from(report.thumb_ry), true),
        ];
        for (element, raw, inverted) in sticks {
            let Some(id) = self.map_element(element) else {
                continue;
            };
            if id.kind != ObjectKind::Axis || !self.contains(id) {
                return Err(DeviceError::Generic);
            }
            let index = usize::from(id.index);
            if axis_touched[index] {
                return Err(DeviceError::Generic);
            }
            axis_touched[index] = true;

            let displacement = if inverted {
                invert_axis(raw, STICK_RANGE_MIN, STICK_RANGE_MAX)
            } else {
                raw
            };
            let props = properties.axis(id.index).ok_or(DeviceError::Generic)?;
            state.axes[index] = props.apply(displacement, STICK_RANGE_MAX);
        }

        // D-pad.
        if let Some(id) = self.map_element(PhysicalElement::DPad) {
            if id.kind != ObjectKind::Pov || !self.contains(id) {
                return Err(DeviceError::Generic);
            }
            let index = usize::from(id.index);
            if pov_touched[index] {
                return Err(DeviceError::Generic);
            }
            pov_touched[index] = true;
            state.povs[index] = report.dpad_pov();
        }

        // Digital buttons.
        let buttons = [
            (PhysicalElement::ButtonA, report.a),
            (PhysicalElement::ButtonB, report.b),
            (PhysicalElement::ButtonX, report.x),
            (PhysicalElement::ButtonY, report.y),
            (PhysicalElement::ButtonLB, report.lb),
            (PhysicalElement::ButtonRB, report.rb),
            (PhysicalElement::ButtonBack, report.back),
            (PhysicalElement::ButtonStart, report.start),
            (PhysicalElement::ThumbL, report.thumb_l),
            (PhysicalElement::ThumbR, report.thumb_r),
        ];
        for (element, pressed) in buttons {
            let Some(id) = self.map_element(element) else {
                continue;
            };
            if id.kind != ObjectKind::Button || !self.contains(id) {
                return Err(DeviceError::Generic);
            }
            let index = usize::from(id.index);
            if button_touched[index] {
                return Err(DeviceError::Generic);
            }
            button_touched[index] = true;
            state.buttons[index] = pressed;
        }

        Ok(state)
    }
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(MapperKind::default())
    }
}
