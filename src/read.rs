use std::io::Read;

use crate::{
  error::{FormatError, ReadError},
  frame::{FrameKind, Stack},
  types::PackType,
  varint::ZigZag,
};

type Result<T> = std::result::Result<T, ReadError>;

const EMPTY: u32 = 0;
const TERMINATED: u32 = u32::MAX;
const DEFAULT_STREAM_BUFFER: usize = 8 * 1024;

enum Source<'a> {
  Buffer { data: &'a [u8], pos: usize },
  Stream { reader: Box<dyn Read + 'a>, buf: Vec<u8>, pos: usize, filled: usize },
}

/// A pull parser over a pack-encoded byte stream. Holds exactly one tag of
/// lookahead; every `read_*` call either matches that lookahead against the
/// requested field ID and type, or skips forward over lower-numbered fields
/// first.
///
/// Reading is strictly single-threaded and forward-only: there is no seeking,
/// and any error other than a caller's own misuse (an out-of-order field ID,
/// for instance, which panics rather than returning a `Result`) leaves the
/// reader in an unspecified state. Construct one with [`from_slice`] over an
/// already-resident buffer, or [`from_reader`] over any `std::io::Read`.
///
/// [`from_slice`]: PackReader::from_slice
/// [`from_reader`]: PackReader::from_reader
pub struct PackReader<'a> {
  source: Source<'a>,
  stack: Stack,
  // Sentinel-encoded lookahead: EMPTY means "not yet parsed", TERMINATED
  // means "saw the container terminator". Anything else is a real field ID,
  // paired with tag_next_type/tag_next_value.
  tag_next_id: u32,
  tag_next_type: Option<PackType>,
  tag_next_value: u64,
}

impl<'a> PackReader<'a> {
  pub fn from_slice(data: &'a [u8]) -> Self {
    PackReader {
      source:         Source::Buffer { data, pos: 0 },
      stack:          Stack::new(),
      tag_next_id:    EMPTY,
      tag_next_type:  None,
      tag_next_value: 0,
    }
  }

  pub fn from_reader(reader: impl Read + 'a) -> Self {
    PackReader {
      source:         Source::Stream {
        reader: Box::new(reader),
        buf:    vec![0u8; DEFAULT_STREAM_BUFFER],
        pos:    0,
        filled: 0,
      },
      stack:          Stack::new(),
      tag_next_id:    EMPTY,
      tag_next_type:  None,
      tag_next_value: 0,
    }
  }

  fn read_byte(&mut self) -> Result<u8> {
    match &mut self.source {
      Source::Buffer { data, pos } => {
        if *pos >= data.len() {
          return Err(FormatError::UnexpectedEof.into());
        }
        let b = data[*pos];
        *pos += 1;
        Ok(b)
      }
      Source::Stream { reader, buf, pos, filled } => {
        if *pos >= *filled {
          let n = reader.read(buf)?;
          if n == 0 {
            return Err(FormatError::UnexpectedEof.into());
          }
          *pos = 0;
          *filled = n;
        }
        let b = buf[*pos];
        *pos += 1;
        Ok(b)
      }
    }
  }

  fn read_varint(&mut self) -> Result<u64> {
    let mut value: u64 = 0;
    for i in 0..crate::varint::VARINT_MAX_BYTES {
      let byte = self.read_byte()?;
      value |= ((byte & 0x7f) as u64) << (7 * i);
      if byte & 0x80 == 0 {
        return Ok(value);
      }
    }
    Err(FormatError::UnterminatedVarint.into())
  }

  fn read_sized_payload(&mut self) -> Result<Vec<u8>> {
    let len = self.read_varint()? as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
      out.push(self.read_byte()?);
    }
    Ok(out)
  }

  /// Parses the next tag byte into the lookahead. Returns `Ok(false)` if it
  /// was the container terminator.
  fn read_tag_next(&mut self) -> Result<bool> {
    let tag = self.read_byte()?;
    if tag == 0 {
      self.tag_next_id = TERMINATED;
      self.tag_next_type = None;
      self.tag_next_value = 0;
      return Ok(false);
    }

    let ty = PackType::from_ordinal(tag >> 4)
      .unwrap_or_else(|| panic!("invalid pack type ordinal {:#x} in tag byte {:#x}", tag >> 4, tag));

    let (id_delta, value): (u32, u64) = if ty.is_container() {
      let mut delta = (tag & 0x07) as u32;
      if tag & 0x08 != 0 {
        delta |= (self.read_varint()? as u32) << 3;
      }
      (delta, 0)
    } else if ty.is_single_bit() {
      let mut delta = (tag & 0x03) as u32;
      if tag & 0x04 != 0 {
        delta |= (self.read_varint()? as u32) << 2;
      }
      (delta, ((tag >> 3) & 0x01) as u64)
    } else if tag & 0x08 != 0 {
      // multi-bit, large-value path
      let mut delta = (tag & 0x03) as u32;
      if tag & 0x04 != 0 {
        delta |= (self.read_varint()? as u32) << 2;
      }
      (delta, self.read_varint()?)
    } else {
      // multi-bit, small-value path
      let mut delta = (tag & 0x01) as u32;
      if tag & 0x02 != 0 {
        delta |= (self.read_varint()? as u32) << 1;
      }
      (delta, ((tag >> 2) & 0x01) as u64)
    };

    let id_last = self.stack.top().id_last;
    self.tag_next_id = id_delta + id_last + 1;
    self.tag_next_type = Some(ty);
    self.tag_next_value = value;
    Ok(true)
  }

  /// Resolves `id == 0` to "one past the last field read in this frame", and
  /// asserts the caller isn't rereading or reordering fields.
  fn resolve_id(&self, id: u32) -> u32 {
    let id_last = self.stack.top().id_last;
    if id == 0 {
      id_last + 1
    } else {
      assert!(id > id_last, "field {id} was already read (last read in this frame was {id_last})");
      id
    }
  }

  /// Skips forward, discarding every field whose ID is below `id`, until the
  /// lookahead's ID is `>= id` (or the terminator was reached).
  fn advance_to(&mut self, id: u32) -> Result<()> {
    loop {
      if self.tag_next_id == EMPTY {
        self.read_tag_next()?;
      }
      if self.tag_next_id >= id {
        return Ok(());
      }
      // Discarding a field smaller than `id`: if it owns a size-prefixed
      // payload (Bin/Str) with a set value bit, that payload must be
      // consumed too, or the stream desyncs. This checks the *skipped*
      // field's own type, not the type the caller is ultimately after.
      if let Some(ty) = self.tag_next_type {
        if ty.has_size() && self.tag_next_value != 0 {
          let len = self.read_varint()? as usize;
          for _ in 0..len {
            self.read_byte()?;
          }
        }
      }
      self.stack.top_mut().id_last = self.tag_next_id;
      self.tag_next_id = EMPTY;
      self.tag_next_type = None;
    }
  }

  /// Pure peek: reports whether `id` is absent without mutating `id_last`.
  /// Backs the public [`read_null`](Self::read_null), which callers may
  /// invoke repeatedly without committing to having "read" the field.
  fn is_absent(&mut self, id: u32) -> Result<bool> {
    self.advance_to(id)?;
    Ok(self.tag_next_id != id)
  }

  /// Like `is_absent`, but when the field really is absent this commits to
  /// having read it: `id_last` advances to `id` even though nothing was on
  /// the wire, so a later `id == 0` ("next") resolves past it. Backs every
  /// `read_x_or` default-value accessor.
  fn take_default(&mut self, id: u32) -> Result<bool> {
    self.advance_to(id)?;
    if self.tag_next_id == id {
      Ok(true)
    } else {
      self.stack.top_mut().id_last = id;
      Ok(false)
    }
  }

  /// Matches the lookahead against `(id, expect)` and consumes it, or raises
  /// the appropriate format error.
  fn consume(&mut self, id: u32, expect: PackType) -> Result<u64> {
    self.advance_to(id)?;
    if self.tag_next_id != id {
      return Err(FormatError::FieldDoesNotExist { id }.into());
    }
    let found = self.tag_next_type.expect("a loaded lookahead always has a type");
    if found != expect {
      return Err(FormatError::TypeMismatch { id, found, expected: expect }.into());
    }
    let value = self.tag_next_value;
    self.stack.top_mut().id_last = id;
    self.tag_next_id = EMPTY;
    self.tag_next_type = None;
    Ok(value)
  }

  /// Peeks at whether `id` is present without consuming anything. Forces a
  /// lookahead parse if needed (and may skip past lower IDs first).
  pub fn read_null(&mut self, id: u32) -> Result<bool> {
    let id = self.resolve_id(id);
    self.is_absent(id)
  }

  /// Forces a lookahead parse (if one isn't already pending) and reports
  /// whether a field follows at all (`false` at a container terminator).
  pub fn read_next(&mut self) -> Result<bool> {
    if self.tag_next_id == EMPTY {
      self.read_tag_next()?;
    }
    Ok(self.tag_next_id != TERMINATED)
  }

  /// The ID of the pending lookahead, if one has been parsed and it isn't
  /// the terminator.
  pub fn read_id(&self) -> Option<u32> {
    match self.tag_next_id {
      EMPTY | TERMINATED => None,
      id => Some(id),
    }
  }

  /// The type of the pending lookahead, if any.
  pub fn read_type(&self) -> Option<PackType> { self.tag_next_type }

  pub fn read_bool(&mut self, id: u32) -> Result<bool> {
    let id = self.resolve_id(id);
    Ok(self.consume(id, PackType::Bool)? != 0)
  }
  pub fn read_bool_or(&mut self, id: u32, default: bool) -> Result<bool> {
    let id = self.resolve_id(id);
    if !self.take_default(id)? { Ok(default) } else { Ok(self.consume(id, PackType::Bool)? != 0) }
  }

  pub fn read_u32(&mut self, id: u32) -> Result<u32> {
    let id = self.resolve_id(id);
    Ok(self.consume(id, PackType::U32)? as u32)
  }
  pub fn read_u32_or(&mut self, id: u32, default: u32) -> Result<u32> {
    let id = self.resolve_id(id);
    if !self.take_default(id)? { Ok(default) } else { Ok(self.consume(id, PackType::U32)? as u32) }
  }

  pub fn read_u64(&mut self, id: u32) -> Result<u64> {
    let id = self.resolve_id(id);
    self.consume(id, PackType::U64)
  }
  pub fn read_u64_or(&mut self, id: u32, default: u64) -> Result<u64> {
    let id = self.resolve_id(id);
    if !self.take_default(id)? { Ok(default) } else { self.consume(id, PackType::U64) }
  }

  pub fn read_i32(&mut self, id: u32) -> Result<i32> {
    let id = self.resolve_id(id);
    Ok(i32::zag(self.consume(id, PackType::I32)? as u32))
  }
  pub fn read_i32_or(&mut self, id: u32, default: i32) -> Result<i32> {
    let id = self.resolve_id(id);
    if !self.take_default(id)? { Ok(default) } else { Ok(i32::zag(self.consume(id, PackType::I32)? as u32)) }
  }

  pub fn read_i64(&mut self, id: u32) -> Result<i64> {
    let id = self.resolve_id(id);
    Ok(i64::zag(self.consume(id, PackType::I64)?))
  }
  pub fn read_i64_or(&mut self, id: u32, default: i64) -> Result<i64> {
    let id = self.resolve_id(id);
    if !self.take_default(id)? { Ok(default) } else { Ok(i64::zag(self.consume(id, PackType::I64)?)) }
  }

  pub fn read_time(&mut self, id: u32) -> Result<i64> {
    let id = self.resolve_id(id);
    Ok(i64::zag(self.consume(id, PackType::Time)?))
  }
  pub fn read_time_or(&mut self, id: u32, default: i64) -> Result<i64> {
    let id = self.resolve_id(id);
    if !self.take_default(id)? { Ok(default) } else { Ok(i64::zag(self.consume(id, PackType::Time)?)) }
  }

  /// Reads an opaque pointer handle. Never reconstructed into a typed
  /// reference by this crate; only meaningful to a reader in the same
  /// process that wrote it.
  pub fn read_ptr(&mut self, id: u32) -> Result<u64> {
    let id = self.resolve_id(id);
    self.consume(id, PackType::Ptr)
  }
  pub fn read_ptr_or(&mut self, id: u32, default: u64) -> Result<u64> {
    let id = self.resolve_id(id);
    if !self.take_default(id)? { Ok(default) } else { self.consume(id, PackType::Ptr) }
  }

  pub fn read_bin(&mut self, id: u32) -> Result<Vec<u8>> {
    let id = self.resolve_id(id);
    let has_data = self.consume(id, PackType::Bin)? != 0;
    if has_data { self.read_sized_payload() } else { Ok(Vec::new()) }
  }
  pub fn read_bin_or(&mut self, id: u32, default: Vec<u8>) -> Result<Vec<u8>> {
    let id = self.resolve_id(id);
    if !self.take_default(id)? {
      Ok(default)
    } else {
      let has_data = self.consume(id, PackType::Bin)? != 0;
      if has_data { self.read_sized_payload() } else { Ok(Vec::new()) }
    }
  }

  pub fn read_str(&mut self, id: u32) -> Result<String> {
    let id = self.resolve_id(id);
    let has_data = self.consume(id, PackType::Str)? != 0;
    let bytes = if has_data { self.read_sized_payload()? } else { Vec::new() };
    String::from_utf8(bytes).map_err(|e| FormatError::InvalidUtf8(e.utf8_error()).into())
  }
  pub fn read_str_or(&mut self, id: u32, default: String) -> Result<String> {
    let id = self.resolve_id(id);
    if !self.take_default(id)? {
      Ok(default)
    } else {
      let has_data = self.consume(id, PackType::Str)? != 0;
      let bytes = if has_data { self.read_sized_payload()? } else { Vec::new() };
      String::from_utf8(bytes).map_err(|e| FormatError::InvalidUtf8(e.utf8_error()).into())
    }
  }

  pub fn array_begin(&mut self, id: u32) -> Result<()> {
    let id = self.resolve_id(id);
    self.consume(id, PackType::Array)?;
    self.stack.push(FrameKind::Array);
    Ok(())
  }

  pub fn obj_begin(&mut self, id: u32) -> Result<()> {
    let id = self.resolve_id(id);
    self.consume(id, PackType::Object)?;
    self.stack.push(FrameKind::Object);
    Ok(())
  }

  fn end_frame(&mut self, expect: FrameKind, wrong_kind: FormatError) -> Result<()> {
    if self.stack.top().kind != expect {
      return Err(wrong_kind.into());
    }
    // Drain whatever fields the caller didn't read, up to the terminator.
    self.advance_to(u32::MAX - 1)?;
    self.stack.pop();
    self.tag_next_id = EMPTY;
    self.tag_next_type = None;
    Ok(())
  }

  pub fn array_end(&mut self) -> Result<()> { self.end_frame(FrameKind::Array, FormatError::NotInArray) }

  pub fn obj_end(&mut self) -> Result<()> { self.end_frame(FrameKind::Object, FormatError::NotInObject) }

  /// Closes every remaining frame, including the implicit outermost one, and
  /// consumes the reader — there is nothing left to read afterward.
  pub fn read_end(mut self) -> Result<()> {
    while !self.stack.is_outermost() {
      let kind = self.stack.top().kind;
      match kind {
        FrameKind::Array => self.array_end()?,
        FrameKind::Object => self.obj_end()?,
      }
    }
    self.advance_to(u32::MAX - 1)?;
    Ok(())
  }
}
