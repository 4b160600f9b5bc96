//! # Brook Core
//!
//! Object model and exotic object core for the Brook JavaScript engine.
//!
//! ## Design Principles
//!
//! - **Thread-safe**: values are `Send + Sync`; objects use `Arc` handles
//!   with interior locking
//! - **Descriptor-driven**: every property access flows through the ten
//!   fundamental internal operations, so arrays, proxies, and typed arrays
//!   compose without special cases in callers
//! - **Observable order**: coercions, traps, and accessor calls happen in
//!   the canonical sequence, which is what proxies and detach-during-callback
//!   code can see

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod array;
pub mod array_buffer;
pub mod array_ops;
pub mod bigint;
pub mod convert;
pub mod enumerate;
pub mod error;
pub mod limits;
pub mod object;
pub mod proxy;
pub mod proxy_ops;
pub mod string;
pub mod typed_array;
pub mod value;

pub use array_buffer::ArrayBufferRecord;
pub use bigint::JsBigInt;
pub use enumerate::ForInIterator;
pub use error::{EngineError, EngineResult};
pub use limits::Limits;
pub use object::{
    DescriptorSpec, JsObject, PropertyAttributes, PropertyDescriptor, PropertyKey,
};
pub use string::JsString;
pub use typed_array::{ElementKind, TypedArrayRecord};
pub use value::{JsSymbol, Value};
