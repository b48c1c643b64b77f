//! Version validation for enum-typed values.
//!
//! One table-driven predicate serves every enumeration: callers hand in the
//! kind and the `(wire value, since)` pairs of the members, the negotiated
//! version, and the candidate value.

use serde::{Deserialize, Serialize};

/// How the members of an enumeration combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumKind {
    /// Values are mutually exclusive.
    #[default]
    Scalar,
    /// Values are independent flags that may be OR-ed together.
    Bitfield,
}

/// OR of every member value available at `version`.
pub fn allowed_mask<I>(members: I, version: u32) -> u32
where
    I: IntoIterator<Item = (u32, u32)>,
{
    members
        .into_iter()
        .filter(|&(_, since)| since <= version)
        .fold(0, |mask, (value, _)| mask | value)
}

/// Decide whether `value` is legal at `version`.
///
/// Scalar: the value must equal a member available at `version`.
/// Bitfield: every set bit must belong to some member available at `version`,
/// so `0` (no flags) is always accepted and flags compose.
pub fn accepts<I>(kind: EnumKind, members: I, value: u32, version: u32) -> bool
where
    I: IntoIterator<Item = (u32, u32)>,
{
    match kind {
        EnumKind::Scalar => members
            .into_iter()
            .any(|(member, since)| member == value && version >= since),
        EnumKind::Bitfield => value & !allowed_mask(members, version) == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOO: &[(u32, u32)] = &[(0, 1), (1, 1), (2, 2), (u32::MAX, 2), (3, 2)];
    const BAR: &[(u32, u32)] = &[(0x01, 1), (0x02, 1), (0x04, 2)];

    #[test]
    fn test_scalar_respects_since() {
        assert!(accepts(EnumKind::Scalar, FOO.iter().copied(), 0, 1));
        assert!(accepts(EnumKind::Scalar, FOO.iter().copied(), 1, 1));
        assert!(!accepts(EnumKind::Scalar, FOO.iter().copied(), 2, 1));
        assert!(accepts(EnumKind::Scalar, FOO.iter().copied(), 2, 2));
        assert!(accepts(EnumKind::Scalar, FOO.iter().copied(), 3, 5));
    }

    #[test]
    fn test_scalar_negative_uses_bit_pattern() {
        let negative = -1i32 as u32;
        assert!(!accepts(EnumKind::Scalar, FOO.iter().copied(), negative, 1));
        assert!(accepts(EnumKind::Scalar, FOO.iter().copied(), negative, 2));
    }

    #[test]
    fn test_scalar_unknown_rejected() {
        assert!(!accepts(EnumKind::Scalar, FOO.iter().copied(), 42, 100));
    }

    #[test]
    fn test_bitfield_zero_always_valid() {
        for version in 0..4 {
            assert!(accepts(EnumKind::Bitfield, BAR.iter().copied(), 0, version));
        }
    }

    #[test]
    fn test_bitfield_flags_compose() {
        assert!(accepts(EnumKind::Bitfield, BAR.iter().copied(), 0x03, 1));
        assert!(!accepts(EnumKind::Bitfield, BAR.iter().copied(), 0x05, 1));
        assert!(accepts(EnumKind::Bitfield, BAR.iter().copied(), 0x07, 2));
        assert!(!accepts(EnumKind::Bitfield, BAR.iter().copied(), 0x08, 2));
    }

    #[test]
    fn test_allowed_mask() {
        assert_eq!(allowed_mask(BAR.iter().copied(), 0), 0);
        assert_eq!(allowed_mask(BAR.iter().copied(), 1), 0x03);
        assert_eq!(allowed_mask(BAR.iter().copied(), 2), 0x07);
    }
}
