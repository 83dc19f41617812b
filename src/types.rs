//! The closed set of field types, and the per-type flags that drive tag-byte
//! encoding (see [`crate::read`] and [`crate::write`]).

/// A field's wire type. The discriminants are part of the wire format: they
/// are packed into the high nibble of every tag byte, so they must never be
/// renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PackType {
  Array  = 1,
  Bin    = 2,
  Bool   = 3,
  I32    = 4,
  I64    = 5,
  Object = 6,
  Ptr    = 7,
  Str    = 8,
  Time   = 9,
  U32    = 10,
  U64    = 11,
}

impl PackType {
  /// Recovers a `PackType` from the high nibble of a tag byte. Returns `None`
  /// for `0` (reserved for the container terminator) and for any value above
  /// `11`, neither of which a conforming writer ever emits.
  pub fn from_ordinal(ordinal: u8) -> Option<Self> {
    Some(match ordinal {
      1 => PackType::Array,
      2 => PackType::Bin,
      3 => PackType::Bool,
      4 => PackType::I32,
      5 => PackType::I64,
      6 => PackType::Object,
      7 => PackType::Ptr,
      8 => PackType::Str,
      9 => PackType::Time,
      10 => PackType::U32,
      11 => PackType::U64,
      _ => return None,
    })
  }

  pub fn ordinal(&self) -> u8 { *self as u8 }

  /// True for `Array`/`Object`: these have no value payload of their own,
  /// only an ID-delta and a nested frame.
  pub fn is_container(&self) -> bool { matches!(self, PackType::Array | PackType::Object) }

  /// True for the types whose value is a single bit packed directly into the
  /// tag byte (`Bool`, `Bin`, `Str`).
  pub fn is_single_bit(&self) -> bool { matches!(self, PackType::Bool | PackType::Bin | PackType::Str) }

  /// True for the types whose value is a varint that may or may not fit in
  /// the tag byte's small-value bit (`I32`, `I64`, `U32`, `U64`, `Time`, `Ptr`).
  pub fn is_multi_bit(&self) -> bool {
    matches!(self, PackType::I32 | PackType::I64 | PackType::U32 | PackType::U64 | PackType::Time | PackType::Ptr)
  }

  /// True for `Bin`/`Str`: these carry a length-prefixed payload in addition
  /// to their single value bit.
  pub fn has_size(&self) -> bool { matches!(self, PackType::Bin | PackType::Str) }

  /// A short, stable name for diagnostics.
  pub fn name(&self) -> &'static str {
    match self {
      PackType::Array => "array",
      PackType::Bin => "bin",
      PackType::Bool => "bool",
      PackType::I32 => "i32",
      PackType::I64 => "i64",
      PackType::Object => "object",
      PackType::Ptr => "ptr",
      PackType::Str => "str",
      PackType::Time => "time",
      PackType::U32 => "u32",
      PackType::U64 => "u64",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ordinal_roundtrip() {
    for ord in 1..=11u8 {
      let ty = PackType::from_ordinal(ord).unwrap();
      assert_eq!(ty.ordinal(), ord);
    }
  }

  #[test]
  fn reserved_ordinals_absent() {
    assert!(PackType::from_ordinal(0).is_none());
    assert!(PackType::from_ordinal(12).is_none());
    assert!(PackType::from_ordinal(15).is_none());
  }

  #[test]
  fn u32_ordinal_matches_worked_example() {
    // Tag byte 0xA4 = U32 (ordinal 10) << 4 | 0x4, from the worked single-field example.
    assert_eq!(PackType::U32.ordinal(), 10);
  }

  #[test]
  fn category_flags() {
    assert!(PackType::Object.is_container());
    assert!(PackType::Str.is_single_bit());
    assert!(PackType::Str.has_size());
    assert!(!PackType::Bool.has_size());
    assert!(PackType::U64.is_multi_bit());
  }
}
