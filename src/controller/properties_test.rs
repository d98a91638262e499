use crate::controller::properties::{
    AxisProperties, AxisPropertiesTable, DEADZONE_MAX, DEFAULT_RANGE_MAX, DEFAULT_RANGE_MIN,
    SATURATION_MAX,
};
use crate::controller::{invert_axis, remap_range, DeviceError};
use crate::xinput::{STICK_RANGE_MAX, STICK_RANGE_MIN, TRIGGER_RANGE_MAX};

#[test]
fn test_remap_preserves_endpoints() {
    assert_eq!(remap_range(0, 0, 255, -255, 255), -255);
    assert_eq!(remap_range(255, 0, 255, -255, 255), 255);
    assert_eq!(remap_range(-32768, -32768, 32767, -10000, 10000), -10000);
    assert_eq!(remap_range(32767, -32768, 32767, -10000, 10000), 10000);

    // Either side may run in either direction.
    assert_eq!(remap_range(0, 0, 100, 100, 0), 100);
    assert_eq!(remap_range(100, 0, 100, 100, 0), 0);
}

#[test]
fn test_remap_needs_wide_intermediate() {
    // The intermediate product is 2^31-ish times 2^16-ish and only fits in
    // 64 bits.
    assert_eq!(
        remap_range(32767, -32768, 32767, i32::MIN, i32::MAX),
        i32::MAX
    );
    assert_eq!(
        remap_range(-32768, -32768, 32767, i32::MIN, i32::MAX),
        i32::MIN
    );
}

#[test]
fn test_invert_is_self_inverse() {
    for value in [-32768, -32767, -1, 0, 1, 12345, 32767] {
        let inverted = invert_axis(value, STICK_RANGE_MIN, STICK_RANGE_MAX);
        assert_eq!(
            invert_axis(inverted, STICK_RANGE_MIN, STICK_RANGE_MAX),
            value,
            "inverting twice should return the original value"
        );
    }
    assert_eq!(invert_axis(32767, STICK_RANGE_MIN, STICK_RANGE_MAX), -32768);
    assert_eq!(invert_axis(-32768, STICK_RANGE_MIN, STICK_RANGE_MAX), 32767);
}

#[test]
fn test_apply_neutral_reads_as_midpoint() {
    let default = AxisProperties::default();
    assert_eq!(default.apply(0, STICK_RANGE_MAX), default.range_mid());

    let shifted = AxisProperties {
        range_min: 0,
        range_max: 1000,
        ..Default::default()
    };
    assert_eq!(shifted.apply(0, STICK_RANGE_MAX), 500);
}

#[test]
fn test_apply_saturates_at_range_endpoints() {
    let props = AxisProperties::default();

    // Stick-sized displacement.
    assert_eq!(props.apply(STICK_RANGE_MAX, STICK_RANGE_MAX), DEFAULT_RANGE_MAX);
    assert_eq!(props.apply(-STICK_RANGE_MAX, STICK_RANGE_MAX), DEFAULT_RANGE_MIN);
    assert_eq!(props.apply(STICK_RANGE_MIN, STICK_RANGE_MAX), DEFAULT_RANGE_MIN);

    // Trigger-sized displacement.
    assert_eq!(props.apply(TRIGGER_RANGE_MAX, TRIGGER_RANGE_MAX), DEFAULT_RANGE_MAX);
    assert_eq!(props.apply(-TRIGGER_RANGE_MAX, TRIGGER_RANGE_MAX), DEFAULT_RANGE_MIN);
}

#[test]
fn test_apply_is_odd_about_the_midpoint() {
    let props = AxisProperties {
        range_min: -10000,
        range_max: 10000,
        ..Default::default()
    };
    for raw in [1, 100, 5000, 16384, 32000] {
        let positive = props.apply(raw, STICK_RANGE_MAX);
        let negative = props.apply(-raw, STICK_RANGE_MAX);
        let difference = (positive + negative).abs();
        assert!(
            difference <= 1,
            "apply should be odd about the midpoint, got {} and {}",
            positive,
            negative
        );
    }
}

#[test]
fn test_apply_deadzone_and_saturation_gating() {
    let props = AxisProperties {
        range_min: -10000,
        range_max: 10000,
        deadzone: 2000,
        saturation: 8000,
    };

    // 10% of full scale sits inside the deadzone.
    assert_eq!(props.apply(3276, STICK_RANGE_MAX), 0);
    // 80% of full scale is exactly at saturation.
    assert_eq!(props.apply(26214, STICK_RANGE_MAX), 10000);
    // Halfway between gets remapped linearly.
    let halfway = props.apply(16384, STICK_RANGE_MAX);
    assert!(halfway > 0 && halfway < 10000);
}

#[test]
fn test_set_range_requires_ordered_bounds() {
    let mut table = AxisPropertiesTable::new();
    assert_eq!(table.set_range(0, 100, 100), Err(DeviceError::InvalidParam));
    assert_eq!(table.set_range(0, 100, -100), Err(DeviceError::InvalidParam));
    assert!(table.set_range(0, -100, 100).is_ok());

    let axis = table.axis(0).expect("axis 0 should exist");
    assert_eq!((axis.range_min, axis.range_max), (-100, 100));
}

#[test]
fn test_set_deadzone_and_saturation_bounds() {
    let mut table = AxisPropertiesTable::new();
    assert_eq!(
        table.set_deadzone(0, DEADZONE_MAX + 1),
        Err(DeviceError::InvalidParam)
    );
    assert!(table.set_deadzone(0, DEADZONE_MAX).is_ok());
    assert_eq!(
        table.set_saturation(0, SATURATION_MAX + 1),
        Err(DeviceError::InvalidParam)
    );
    assert!(table.set_saturation(0, 0).is_ok());
}

#[test]
fn test_bulk_setters_are_atomic() {
    let mut table = AxisPropertiesTable::new();
    table.set_deadzone(2, 500).expect("should set a deadzone");

    assert_eq!(
        table.set_all_deadzone(DEADZONE_MAX + 1),
        Err(DeviceError::InvalidParam)
    );
    assert_eq!(
        table.axis(2).expect("axis 2 should exist").deadzone,
        500,
        "a rejected bulk write should not touch any axis"
    );

    table.set_all_deadzone(750).expect("should set every deadzone");
    for index in 0..6 {
        assert_eq!(table.axis(index).expect("axis should exist").deadzone, 750);
    }
}
