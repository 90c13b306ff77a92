//! Name-based property access on opaque host objects.
//!
//! # Invariants
//! - Writes replace the whole backing value; element-wise mutation is not
//!   offered because host storage may need to reallocate.
//! - A write never changes the kind of an existing property.

use crate::error::{ExtensionError, ExtensionResult};
use crate::host::{PropertyValue, Reflect};

const FLOATS: &str = "float sequence";
const UINT: &str = "uint";

/// Reads a float sequence property.
pub fn get_floats(target: &dyn Reflect, property: &str) -> ExtensionResult<Vec<f32>> {
    match resolve(target, property)? {
        PropertyValue::Floats(values) => Ok(values.clone()),
        other => Err(mismatch(property, FLOATS, other)),
    }
}

/// Replaces a float sequence property.
pub fn set_floats(
    target: &mut dyn Reflect,
    property: &str,
    values: Vec<f32>,
) -> ExtensionResult<()> {
    let slot = resolve_mut(target, property)?;
    if !matches!(slot, PropertyValue::Floats(_)) {
        return Err(mismatch(property, FLOATS, slot));
    }
    *slot = PropertyValue::Floats(values);
    Ok(())
}

/// Reads an unsigned scalar property.
pub fn get_uint(target: &dyn Reflect, property: &str) -> ExtensionResult<u32> {
    match resolve(target, property)? {
        PropertyValue::UInt(value) => Ok(*value),
        other => Err(mismatch(property, UINT, other)),
    }
}

/// Replaces an unsigned scalar property.
pub fn set_uint(target: &mut dyn Reflect, property: &str, value: u32) -> ExtensionResult<()> {
    let slot = resolve_mut(target, property)?;
    if !matches!(slot, PropertyValue::UInt(_)) {
        return Err(mismatch(property, UINT, slot));
    }
    *slot = PropertyValue::UInt(value);
    Ok(())
}

/// Probes an optional unsigned property.
///
/// Returns `Ok(false)` when the host has no such property, and
/// `TypeMismatch` when it exists with another kind.
pub fn probe_uint(target: &dyn Reflect, property: &str) -> ExtensionResult<bool> {
    match target.resolve_property(property) {
        None => Ok(false),
        Some(PropertyValue::UInt(_)) => Ok(true),
        Some(other) => Err(mismatch(property, UINT, other)),
    }
}

fn resolve<'a>(target: &'a dyn Reflect, property: &str) -> ExtensionResult<&'a PropertyValue> {
    target
        .resolve_property(property)
        .ok_or_else(|| ExtensionError::PropertyNotFound {
            type_name: target.type_name().to_string(),
            property: property.to_string(),
        })
}

fn resolve_mut<'a>(
    target: &'a mut dyn Reflect,
    property: &str,
) -> ExtensionResult<&'a mut PropertyValue> {
    let type_name = target.type_name().to_string();
    target
        .resolve_property_mut(property)
        .ok_or_else(|| ExtensionError::PropertyNotFound {
            type_name,
            property: property.to_string(),
        })
}

fn mismatch(property: &str, expected: &'static str, found: &PropertyValue) -> ExtensionError {
    ExtensionError::TypeMismatch {
        property: property.to_string(),
        expected,
        found: found.kind(),
    }
}

#[cfg(test)]
mod tests {
    use super::{get_floats, get_uint, probe_uint, set_floats, set_uint};
    use crate::error::ExtensionError;
    use crate::host::memory::MemoryObject;
    use crate::host::PropertyValue;

    fn time_manager() -> MemoryObject {
        MemoryObject::new("TimeManager")
            .with_property("timeScales", PropertyValue::Floats(vec![0.0, 1.0, 2.0, 3.0]))
            .with_property("highestVisibleTimeScaleIndex", PropertyValue::UInt(3))
            .with_property("label", PropertyValue::Text("speed".to_string()))
    }

    #[test]
    fn reads_and_replaces_float_sequence() {
        let mut object = time_manager();
        assert_eq!(
            get_floats(&object, "timeScales").expect("read"),
            vec![0.0, 1.0, 2.0, 3.0]
        );

        set_floats(&mut object, "timeScales", vec![0.0, 1.0, 2.0, 3.0, 5.0]).expect("write");
        assert_eq!(
            get_floats(&object, "timeScales").expect("read back"),
            vec![0.0, 1.0, 2.0, 3.0, 5.0]
        );
    }

    #[test]
    fn missing_property_is_reported_with_type_name() {
        let object = time_manager();
        let err = get_floats(&object, "speeds").expect_err("missing property must fail");
        assert_eq!(
            err,
            ExtensionError::PropertyNotFound {
                type_name: "TimeManager".to_string(),
                property: "speeds".to_string(),
            }
        );
    }

    #[test]
    fn wrong_storage_kind_is_type_mismatch() {
        let mut object = time_manager();
        let err = get_floats(&object, "label").expect_err("text is not a float sequence");
        assert!(matches!(err, ExtensionError::TypeMismatch { found: "text", .. }));

        let err = set_floats(&mut object, "highestVisibleTimeScaleIndex", vec![1.0])
            .expect_err("uint slot must not be overwritten with floats");
        assert!(matches!(err, ExtensionError::TypeMismatch { found: "uint", .. }));
        assert_eq!(
            get_uint(&object, "highestVisibleTimeScaleIndex").expect("unchanged"),
            3
        );
    }

    #[test]
    fn uint_roundtrip_and_probe() {
        let mut object = time_manager();
        set_uint(&mut object, "highestVisibleTimeScaleIndex", 9).expect("write");
        assert_eq!(get_uint(&object, "highestVisibleTimeScaleIndex").expect("read"), 9);

        assert!(probe_uint(&object, "highestVisibleTimeScaleIndex").expect("present"));
        assert!(!probe_uint(&object, "maxIndex").expect("absent is not an error"));
        assert!(probe_uint(&object, "label").is_err());
    }
}
