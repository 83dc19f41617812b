use pack::{FormatError, PackReader, PackWriter, ReadError};
use pretty_assertions::assert_eq;

#[test]
fn empty_message_is_a_single_terminator_byte() {
  let bytes = PackWriter::to_vec().write_end_to_vec().unwrap();
  assert_eq!(bytes, vec![0x00]);

  PackReader::from_slice(&bytes).read_end().unwrap();
}

#[test]
fn single_u32_field_matches_worked_tag_byte() {
  let mut w = PackWriter::to_vec();
  w.write_u32(1, 1).unwrap();
  let bytes = w.write_end_to_vec().unwrap();
  assert_eq!(bytes, vec![0xA4, 0x00]);

  let mut r = PackReader::from_slice(&bytes);
  assert_eq!(r.read_u32(1).unwrap(), 1);
  r.read_end().unwrap();
}

#[test]
fn sparse_object_round_trips_with_gaps() {
  let mut w = PackWriter::to_vec();
  w.write_null(1);
  w.write_u32(3, 42).unwrap();
  w.write_null(5);
  w.write_str(7, "ok").unwrap();
  let bytes = w.write_end_to_vec().unwrap();

  let mut r = PackReader::from_slice(&bytes);
  assert!(r.read_null(1).unwrap());
  assert_eq!(r.read_u32(3).unwrap(), 42);
  assert!(r.read_null(5).unwrap());
  assert_eq!(r.read_str(7).unwrap(), "ok");
  r.read_end().unwrap();
}

#[test]
fn sparse_object_field_absent_without_default_is_a_format_error() {
  let mut w = PackWriter::to_vec();
  w.write_u32(5, 1).unwrap();
  let bytes = w.write_end_to_vec().unwrap();

  let mut r = PackReader::from_slice(&bytes);
  let err = r.read_u32(1).unwrap_err();
  assert!(matches!(err, ReadError::Format(FormatError::FieldDoesNotExist { id: 1 })));
}

#[test]
fn nested_array_holding_bools() {
  let mut w = PackWriter::to_vec();
  w.obj_begin(1).unwrap();
  w.write_str(1, "name").unwrap();
  w.array_begin(2).unwrap();
  w.write_bool(1, true).unwrap();
  w.write_bool(2, false).unwrap();
  w.write_bool(3, true).unwrap();
  w.array_end().unwrap();
  w.obj_end().unwrap();
  let bytes = w.write_end_to_vec().unwrap();

  let mut r = PackReader::from_slice(&bytes);
  r.obj_begin(1).unwrap();
  assert_eq!(r.read_str(1).unwrap(), "name");
  r.array_begin(2).unwrap();
  let mut flags = vec![];
  while r.read_next().unwrap() {
    flags.push(r.read_bool(0).unwrap());
  }
  r.array_end().unwrap();
  r.obj_end().unwrap();
  r.read_end().unwrap();

  assert_eq!(flags, vec![true, false, true]);
}

#[test]
fn null_elision_is_indistinguishable_from_an_explicit_null_on_the_wire() {
  let mut explicit = PackWriter::to_vec();
  explicit.write_null(1);
  explicit.write_u32(2, 9).unwrap();
  let explicit = explicit.write_end_to_vec().unwrap();

  let mut elided = PackWriter::to_vec();
  elided.write_u32_default(1, 0, 0).unwrap();
  elided.write_u32(2, 9).unwrap();
  let elided = elided.write_end_to_vec().unwrap();

  assert_eq!(explicit, elided);
}

#[test]
fn varint_boundary_at_one_byte_cutoff() {
  // 0x80 needs a second byte: low 7 bits are 0 with the continuation bit set,
  // then a final byte holding the carried-over high bit.
  let mut w = PackWriter::to_vec();
  w.write_u64(1, 0x80).unwrap();
  let bytes = w.write_end_to_vec().unwrap();
  assert_eq!(&bytes[1..3], &[0x80, 0x01]);

  let mut r = PackReader::from_slice(&bytes);
  assert_eq!(r.read_u64(1).unwrap(), 0x80);
  r.read_end().unwrap();
}

#[test]
fn streaming_reader_over_a_std_io_read_matches_buffer_mode() {
  let mut w = PackWriter::to_vec();
  w.write_i64(1, -12345).unwrap();
  w.write_bin(2, b"raw bytes").unwrap();
  let bytes = w.write_end_to_vec().unwrap();

  let mut streamed = PackReader::from_reader(&bytes[..]);
  assert_eq!(streamed.read_i64(1).unwrap(), -12345);
  assert_eq!(streamed.read_bin(2).unwrap(), b"raw bytes".to_vec());
  streamed.read_end().unwrap();
}

#[test]
fn borrowed_buffer_writer_appends_without_taking_ownership() {
  let mut out = Vec::new();
  {
    let mut w = PackWriter::to_buf(&mut out);
    w.write_bool(1, true).unwrap();
    w.write_end().unwrap();
  }
  let mut r = PackReader::from_slice(&out);
  assert!(r.read_bool(1).unwrap());
  r.read_end().unwrap();
}

#[test]
fn time_round_trips_through_zig_zag_on_both_value_paths() {
  // id=1 is negative (zig-zag maps it to an odd unsigned value, large-value
  // path); id=2 is a small positive value that fits the small-value path.
  let mut w = PackWriter::to_vec();
  w.write_time(1, -86_400).unwrap();
  w.write_time(2, 0).unwrap();
  let bytes = w.write_end_to_vec().unwrap();

  let mut r = PackReader::from_slice(&bytes);
  assert_eq!(r.read_time(1).unwrap(), -86_400);
  assert_eq!(r.read_time(2).unwrap(), 0);
  r.read_end().unwrap();
}

#[test]
fn time_default_elision_matches_explicit_null() {
  let mut explicit = PackWriter::to_vec();
  explicit.write_null(1);
  explicit.write_bool(2, true).unwrap();
  let explicit = explicit.write_end_to_vec().unwrap();

  let mut elided = PackWriter::to_vec();
  elided.write_time_default(1, 0, 0).unwrap();
  elided.write_bool(2, true).unwrap();
  let elided = elided.write_end_to_vec().unwrap();

  assert_eq!(explicit, elided);
}

#[test]
fn ptr_round_trips_as_an_opaque_handle() {
  let mut w = PackWriter::to_vec();
  w.write_ptr(1, 0x7fff_0000_dead_beef).unwrap();
  let bytes = w.write_end_to_vec().unwrap();

  let mut r = PackReader::from_slice(&bytes);
  assert_eq!(r.read_ptr(1).unwrap(), 0x7fff_0000_dead_beef);
  r.read_end().unwrap();
}

#[test]
fn ptr_default_elision_matches_explicit_null() {
  let mut explicit = PackWriter::to_vec();
  explicit.write_null(1);
  explicit.write_bool(2, true).unwrap();
  let explicit = explicit.write_end_to_vec().unwrap();

  let mut elided = PackWriter::to_vec();
  elided.write_ptr_default(1, 0, 0).unwrap();
  elided.write_bool(2, true).unwrap();
  let elided = elided.write_end_to_vec().unwrap();

  assert_eq!(explicit, elided);
  assert_eq!(PackReader::from_slice(&elided).read_ptr_or(1, 0).unwrap(), 0);
}

#[test]
fn skipping_a_sized_field_of_a_different_type_does_not_desync_the_stream() {
  // Field 1 is a non-trivial Str the caller never reads directly; field 3 is
  // a Bool the caller does read. Reading straight to field 3 must correctly
  // skip field 1's length-prefixed payload using field 1's own type, not the
  // Bool type being requested.
  let mut w = PackWriter::to_vec();
  w.write_str(1, "this field is never read directly").unwrap();
  w.write_bool(3, true).unwrap();
  let bytes = w.write_end_to_vec().unwrap();

  let mut r = PackReader::from_slice(&bytes);
  assert!(r.read_bool(3).unwrap());
  r.read_end().unwrap();
}
