//! Flat typed records to and from URL query strings.
//!
//! A record is a plain struct whose fields are booleans, integers, `f32`,
//! `f64`, strings, or `Vec`s of those. Each field maps to one query key: the
//! field name lowercased. Scalars become one `key=value` pair, sequences one
//! pair per element, in order.
//!
//! Records are described through their serde impls, so deriving
//! `Serialize` and `Deserialize` is all it takes.
//!
//! ## Supported Types
//!
//! * `bool`: `true` / `false`, nothing else is accepted when decoding.
//! * integers (`i8..=i64`, `u8..=u64`, `isize`, `usize`): decimal, with an
//!   optional sign.
//! * `f32` / `f64`: written in fixed-point notation with six fractional
//!   digits, read from any float literal.
//! * `String`: written and read verbatim, percent-encoded on the wire.
//! * `Vec<T>` of any of the above, and newtype structs around any of the above.
//!
//! Any other field type (options, nested structs, maps, enums, ...) makes the
//! record unsupported: encoding fails when it reaches the field and decoding
//! fails up front.
//!
//! ## Usage
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
//! struct Search {
//!     q: String,
//!     page: u32,
//!     exact: bool,
//!     tags: Vec<String>,
//! }
//!
//! let search = Search {
//!     q: "rust query".to_owned(),
//!     page: 2,
//!     exact: false,
//!     tags: vec!["serde".to_owned(), "url".to_owned()],
//! };
//!
//! let encoded = qparams::to_string(&search).unwrap();
//! assert_eq!(encoded, "?q=rust+query&page=2&exact=false&tags=serde&tags=url");
//!
//! let url = url::Url::parse(&format!("http://example.org/search{encoded}")).unwrap();
//! let mut decoded = Search::default();
//! qparams::from_query_into(&qparams::QueryMap::from(&url), &mut decoded).unwrap();
//! assert_eq!(decoded, search);
//! ```
//!
//! Decoding only touches the fields named in the query. Unknown keys are
//! ignored, malformed values for known keys are errors.

mod config;
mod de;
mod error;
mod introspect;
mod query;
mod ser;
mod value;

pub use config::{Config, DuplicateScalar};
#[doc(inline)]
pub use de::{from_query, from_query_into, from_str, from_str_into};
pub use error::{Error, Result};
#[doc(inline)]
pub use introspect::{Field, FieldType, Kind, describe, query_key};
pub use query::QueryMap;
#[doc(inline)]
pub use ser::{to_query_map, to_string, to_writer};
