use std::{error::Error, fmt, io};

use crate::types::PackType;

/// The closed set of recoverable decode/encode errors. Anything outside this
/// set (an out-of-order field ID, closing the wrong kind of frame, closing
/// the outermost frame, using a reader/writer after `read_end`/`write_end`) is
/// a programmer error and panics instead of returning a `Result`.
#[derive(Debug)]
#[non_exhaustive]
pub enum FormatError {
  /// The underlying source ran out of bytes mid-tag, mid-varint, or
  /// mid-payload.
  UnexpectedEof,
  /// A varint ran past the maximum of 10 bytes without its continuation bit
  /// clearing.
  UnterminatedVarint,
  /// The requested field ID has no corresponding tag in the current frame,
  /// and no default was supplied.
  FieldDoesNotExist { id: u32 },
  /// The tag recorded at the requested ID names a different type than the
  /// one being read.
  TypeMismatch { id: u32, found: PackType, expected: PackType },
  /// `array_end` was called while the current frame is not an array.
  NotInArray,
  /// `obj_end` was called while the current frame is not an object.
  NotInObject,
  /// A `Str` field's payload was not valid UTF-8. Not part of the
  /// distilled error list, but present on the teacher crate's own
  /// equivalent (`ValidReadError::InvalidUtf8`) — the wire format calls
  /// `Str` a UTF-8 string, so decoding one has to be able to report this.
  InvalidUtf8(std::str::Utf8Error),
}

impl fmt::Display for FormatError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::UnexpectedEof => write!(f, "unexpected end of input"),
      Self::UnterminatedVarint => write!(f, "varint exceeded 10 bytes without terminating"),
      Self::FieldDoesNotExist { id } => write!(f, "field {id} does not exist"),
      Self::TypeMismatch { id, found, expected } => {
        write!(f, "field {id} has type {}, expected {}", found.name(), expected.name())
      }
      Self::NotInArray => write!(f, "not currently inside an array"),
      Self::NotInObject => write!(f, "not currently inside an object"),
      Self::InvalidUtf8(e) => write!(f, "str field was not valid utf8: {e}"),
    }
  }
}
impl Error for FormatError {}

/// An error while reading a pack value. [`Format`](Self::Format) errors mean
/// the wire data itself was malformed; [`Io`](Self::Io) errors are propagated
/// unchanged from the underlying `Read`. Either way, the reader's internal
/// state after an error is undefined and it must be discarded.
#[derive(Debug)]
pub enum ReadError {
  Format(FormatError),
  Io(io::Error),
}

impl fmt::Display for ReadError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Format(e) => write!(f, "pack format error: {e}"),
      Self::Io(e) => write!(f, "pack io error: {e}"),
    }
  }
}
impl Error for ReadError {}
impl From<FormatError> for ReadError {
  fn from(e: FormatError) -> Self { ReadError::Format(e) }
}
impl From<io::Error> for ReadError {
  fn from(e: io::Error) -> Self { ReadError::Io(e) }
}

/// An error while writing a pack value. The writer has no recoverable format
/// errors of its own (there is nothing to validate on the way out besides
/// what the type system already guarantees) — only the underlying sink can
/// fail.
#[derive(Debug)]
pub enum WriteError {
  Io(io::Error),
}

impl fmt::Display for WriteError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Io(e) => write!(f, "pack io error: {e}"),
    }
  }
}
impl Error for WriteError {}
impl From<io::Error> for WriteError {
  fn from(e: io::Error) -> Self { WriteError::Io(e) }
}
