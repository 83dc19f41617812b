//! A compact, self-describing binary encoding for sparse, field-addressed
//! records.
//!
//! A pack value is a tree of typed fields organized into objects (keyed by
//! small integer field IDs) and arrays (ordered). Missing fields cost zero
//! bytes: IDs are delta-encoded against the last field actually seen, so a
//! mostly-empty object with one field near the end is only a few bytes
//! larger than an empty one. Small integers fit entirely inside the tag
//! byte; everything else falls back to a base-128 varint.
//!
//! ```
//! use pack::{PackReader, PackWriter};
//!
//! let mut w = PackWriter::to_vec();
//! w.write_u32(1, 7).unwrap();
//! w.write_str(3, "hi").unwrap(); // field 2 is implicitly absent
//! let bytes = w.write_end_to_vec().unwrap();
//!
//! let mut r = PackReader::from_slice(&bytes);
//! assert_eq!(r.read_u32(1).unwrap(), 7);
//! assert!(r.read_null(2).unwrap());
//! assert_eq!(r.read_str(3).unwrap(), "hi");
//! r.read_end().unwrap();
//! ```
//!
//! This is not wire-compatible with Protocol Buffers or any other
//! self-describing format despite some surface similarity (small-integer
//! varints, field-number addressing): the tag-byte bit layout, the container
//! framing, and the null-elision rules are specific to this crate.
//!
//! Reading and writing are both strictly single-pass and single-threaded;
//! see [`PackReader`] and [`PackWriter`] for the full operation set, and
//! [`error`] for how failures are categorized.

mod error;
mod frame;
pub mod read;
mod types;
mod varint;
pub mod write;

pub use error::{FormatError, ReadError, WriteError};
pub use read::PackReader;
pub use types::PackType;
pub use write::PackWriter;
