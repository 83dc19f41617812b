use std::io::Write;

use crate::{
  error::WriteError,
  frame::{FrameKind, Stack},
  types::PackType,
  varint::ZigZag,
};

type Result<T = ()> = std::result::Result<T, WriteError>;

const DEFAULT_SINK_BUFFER: usize = 8 * 1024;

enum Sink<'a> {
  Writer { writer: Box<dyn Write + 'a>, buf: Vec<u8> },
  Owned(Vec<u8>),
  Borrowed(&'a mut Vec<u8>),
}

/// The write half of the codec. Mirrors [`crate::read::PackReader`]'s
/// lookahead-free, forward-only shape: every `write_*` call emits exactly one
/// tag (plus any ID-delta/value varints and payload bytes) and advances the
/// current frame's `id_last`.
///
/// Three constructors match the three ways a caller might want the encoded
/// bytes: streamed out to a `std::io::Write` ([`to_writer`]), collected into
/// a freshly owned buffer ([`to_vec`]), or appended onto a buffer the caller
/// already owns ([`to_buf`]).
///
/// [`to_writer`]: PackWriter::to_writer
/// [`to_vec`]: PackWriter::to_vec
/// [`to_buf`]: PackWriter::to_buf
pub struct PackWriter<'a> {
  sink:  Sink<'a>,
  stack: Stack,
}

impl<'a> PackWriter<'a> {
  pub fn to_writer(writer: impl Write + 'a) -> Self {
    PackWriter {
      sink:  Sink::Writer { writer: Box::new(writer), buf: Vec::with_capacity(DEFAULT_SINK_BUFFER) },
      stack: Stack::new(),
    }
  }

  pub fn to_vec() -> Self { PackWriter { sink: Sink::Owned(Vec::new()), stack: Stack::new() } }

  pub fn to_buf(buf: &'a mut Vec<u8>) -> Self { PackWriter { sink: Sink::Borrowed(buf), stack: Stack::new() } }

  fn write_bytes(&mut self, bytes: &[u8]) -> Result {
    match &mut self.sink {
      Sink::Owned(buf) => buf.extend_from_slice(bytes),
      Sink::Borrowed(buf) => buf.extend_from_slice(bytes),
      Sink::Writer { writer, buf } => {
        if buf.len() + bytes.len() <= buf.capacity() {
          buf.extend_from_slice(bytes);
        } else {
          writer.write_all(buf)?;
          buf.clear();
          if bytes.len() <= buf.capacity() {
            buf.extend_from_slice(bytes);
          } else {
            writer.write_all(bytes)?;
          }
        }
      }
    }
    Ok(())
  }

  fn write_byte(&mut self, byte: u8) -> Result { self.write_bytes(&[byte]) }

  fn write_varint(&mut self, value: u64) -> Result {
    let mut encoded = Vec::with_capacity(crate::varint::VARINT_MAX_BYTES);
    crate::varint::write_varint(&mut encoded, value);
    self.write_bytes(&encoded)
  }

  fn resolve_id(&self, id: u32) -> u32 {
    let id_last = self.stack.top().id_last;
    if id == 0 {
      id_last + 1
    } else {
      assert!(id > id_last, "field {id} is not greater than the last field written ({id_last})");
      id
    }
  }

  /// Emits the tag (and any accompanying ID-delta/value varints) for `ty` at
  /// `id`, carrying `value` as the 0/1 bit (container/single-bit types) or
  /// the full integer value (multi-bit types). Does not touch `id_last`;
  /// callers update it after any size-prefixed payload has also been
  /// written, since `id_last` marks "this field is fully on the wire".
  fn write_tag(&mut self, ty: PackType, id: u32, value: u64) -> Result {
    let id_last = self.stack.top().id_last;
    let id_delta = id - id_last - 1;
    let ordinal = ty.ordinal();

    if ty.is_container() {
      if id_delta <= 0x07 {
        self.write_byte((ordinal << 4) | (id_delta as u8))?;
      } else {
        self.write_byte((ordinal << 4) | 0x08 | (id_delta as u8 & 0x07))?;
        self.write_varint((id_delta >> 3) as u64)?;
      }
    } else if ty.is_single_bit() {
      let value_bit = (value & 1) as u8;
      if id_delta <= 0x03 {
        self.write_byte((ordinal << 4) | (value_bit << 3) | (id_delta as u8 & 0x03))?;
      } else {
        self.write_byte((ordinal << 4) | (value_bit << 3) | 0x04 | (id_delta as u8 & 0x03))?;
        self.write_varint((id_delta >> 2) as u64)?;
      }
    } else if value <= 1 {
      // multi-bit, small-value path
      let value_bit = value as u8;
      if id_delta <= 0x01 {
        self.write_byte((ordinal << 4) | (value_bit << 2) | (id_delta as u8 & 0x01))?;
      } else {
        self.write_byte((ordinal << 4) | (value_bit << 2) | 0x02 | (id_delta as u8 & 0x01))?;
        self.write_varint((id_delta >> 1) as u64)?;
      }
    } else {
      // multi-bit, large-value path
      if id_delta <= 0x03 {
        self.write_byte((ordinal << 4) | 0x08 | (id_delta as u8 & 0x03))?;
      } else {
        self.write_byte((ordinal << 4) | 0x08 | 0x04 | (id_delta as u8 & 0x03))?;
        self.write_varint((id_delta >> 2) as u64)?;
      }
      self.write_varint(value)?;
    }
    Ok(())
  }

  fn write_sized_payload(&mut self, bytes: &[u8]) -> Result {
    self.write_varint(bytes.len() as u64)?;
    self.write_bytes(bytes)
  }

  /// Unconditionally elides a field: advances `id_last` to `id` without
  /// putting anything on the wire. Used both as the public no-value "null"
  /// write and, internally, by every `write_x_default` when the value
  /// matches its declared default.
  pub fn write_null(&mut self, id: u32) {
    let id = self.resolve_id(id);
    self.stack.top_mut().id_last = id;
  }

  pub fn write_bool(&mut self, id: u32, value: bool) -> Result {
    let id = self.resolve_id(id);
    self.write_tag(PackType::Bool, id, value as u64)?;
    self.stack.top_mut().id_last = id;
    Ok(())
  }
  pub fn write_bool_default(&mut self, id: u32, value: bool, default: bool) -> Result {
    if value == default {
      self.write_null(id);
      Ok(())
    } else {
      self.write_bool(id, value)
    }
  }

  pub fn write_u32(&mut self, id: u32, value: u32) -> Result {
    let id = self.resolve_id(id);
    self.write_tag(PackType::U32, id, value as u64)?;
    self.stack.top_mut().id_last = id;
    Ok(())
  }
  pub fn write_u32_default(&mut self, id: u32, value: u32, default: u32) -> Result {
    if value == default {
      self.write_null(id);
      Ok(())
    } else {
      self.write_u32(id, value)
    }
  }

  pub fn write_u64(&mut self, id: u32, value: u64) -> Result {
    let id = self.resolve_id(id);
    self.write_tag(PackType::U64, id, value)?;
    self.stack.top_mut().id_last = id;
    Ok(())
  }
  pub fn write_u64_default(&mut self, id: u32, value: u64, default: u64) -> Result {
    if value == default {
      self.write_null(id);
      Ok(())
    } else {
      self.write_u64(id, value)
    }
  }

  pub fn write_i32(&mut self, id: u32, value: i32) -> Result {
    let id = self.resolve_id(id);
    self.write_tag(PackType::I32, id, value.zig() as u64)?;
    self.stack.top_mut().id_last = id;
    Ok(())
  }
  pub fn write_i32_default(&mut self, id: u32, value: i32, default: i32) -> Result {
    if value == default {
      self.write_null(id);
      Ok(())
    } else {
      self.write_i32(id, value)
    }
  }

  pub fn write_i64(&mut self, id: u32, value: i64) -> Result {
    let id = self.resolve_id(id);
    self.write_tag(PackType::I64, id, value.zig())?;
    self.stack.top_mut().id_last = id;
    Ok(())
  }
  pub fn write_i64_default(&mut self, id: u32, value: i64, default: i64) -> Result {
    if value == default {
      self.write_null(id);
      Ok(())
    } else {
      self.write_i64(id, value)
    }
  }

  pub fn write_time(&mut self, id: u32, value: i64) -> Result {
    let id = self.resolve_id(id);
    self.write_tag(PackType::Time, id, value.zig())?;
    self.stack.top_mut().id_last = id;
    Ok(())
  }
  pub fn write_time_default(&mut self, id: u32, value: i64, default: i64) -> Result {
    if value == default {
      self.write_null(id);
      Ok(())
    } else {
      self.write_time(id, value)
    }
  }

  /// Writes an opaque pointer handle. See [`crate::read::PackReader::read_ptr`]:
  /// this crate never constructs one of these from a real reference, it only
  /// carries whatever `u64` the caller supplies.
  pub fn write_ptr(&mut self, id: u32, value: u64) -> Result {
    let id = self.resolve_id(id);
    self.write_tag(PackType::Ptr, id, value)?;
    self.stack.top_mut().id_last = id;
    Ok(())
  }
  pub fn write_ptr_default(&mut self, id: u32, value: u64, default: u64) -> Result {
    if value == default {
      self.write_null(id);
      Ok(())
    } else {
      self.write_ptr(id, value)
    }
  }

  pub fn write_bin(&mut self, id: u32, value: &[u8]) -> Result {
    let id = self.resolve_id(id);
    self.write_tag(PackType::Bin, id, !value.is_empty() as u64)?;
    if !value.is_empty() {
      self.write_sized_payload(value)?;
    }
    self.stack.top_mut().id_last = id;
    Ok(())
  }
  pub fn write_bin_default(&mut self, id: u32, value: &[u8], default: &[u8]) -> Result {
    if value == default {
      self.write_null(id);
      Ok(())
    } else {
      self.write_bin(id, value)
    }
  }

  pub fn write_str(&mut self, id: u32, value: &str) -> Result {
    let id = self.resolve_id(id);
    self.write_tag(PackType::Str, id, !value.is_empty() as u64)?;
    if !value.is_empty() {
      self.write_sized_payload(value.as_bytes())?;
    }
    self.stack.top_mut().id_last = id;
    Ok(())
  }
  pub fn write_str_default(&mut self, id: u32, value: &str, default: &str) -> Result {
    if value == default {
      self.write_null(id);
      Ok(())
    } else {
      self.write_str(id, value)
    }
  }

  pub fn array_begin(&mut self, id: u32) -> Result {
    let id = self.resolve_id(id);
    self.write_tag(PackType::Array, id, 0)?;
    self.stack.top_mut().id_last = id;
    self.stack.push(FrameKind::Array);
    Ok(())
  }

  pub fn obj_begin(&mut self, id: u32) -> Result {
    let id = self.resolve_id(id);
    self.write_tag(PackType::Object, id, 0)?;
    self.stack.top_mut().id_last = id;
    self.stack.push(FrameKind::Object);
    Ok(())
  }

  fn end_frame(&mut self, expect: FrameKind) -> Result {
    assert!(
      self.stack.top().kind == expect,
      "cannot close a {:?} frame as {:?}",
      self.stack.top().kind,
      expect
    );
    self.write_byte(0)?;
    self.stack.pop();
    Ok(())
  }

  pub fn array_end(&mut self) -> Result { self.end_frame(FrameKind::Array) }

  pub fn obj_end(&mut self) -> Result { self.end_frame(FrameKind::Object) }

  /// Closes the implicit outermost frame and flushes. Returns the finished
  /// bytes for [`to_vec`](Self::to_vec); the other two constructors already
  /// wrote everything to their destination, so they return `()`.
  fn finish(mut self) -> Result<Sink<'a>> {
    assert!(self.stack.is_outermost(), "write_end called with a container still open");
    self.write_byte(0)?;
    if let Sink::Writer { writer, buf } = &mut self.sink {
      writer.write_all(buf)?;
      writer.flush()?;
    }
    Ok(self.sink)
  }

  pub fn write_end(self) -> Result {
    self.finish()?;
    Ok(())
  }
}

impl<'a> PackWriter<'a> {
  /// Like [`write_end`](Self::write_end), but for a [`to_vec`](Self::to_vec)
  /// writer: returns the finished, owned buffer instead of discarding it.
  pub fn write_end_to_vec(self) -> Result<Vec<u8>> {
    match self.finish()? {
      Sink::Owned(buf) => Ok(buf),
      _ => panic!("write_end_to_vec called on a writer not constructed with PackWriter::to_vec"),
    }
  }
}
