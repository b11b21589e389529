//! Wire handling for inbound notification requests.
//!
//! Bytes read from a connection are fed to a [`StreamAssembler`], which
//! reports when a complete minimal HTTP request is buffered. The request
//! body is then handed to [`decode_payload`] to produce an [`Event`].
//! [`parse_request`] performs the same header split on a whole buffer.
//!
//! ```text
//! read ─► StreamAssembler::feed ─► decode_payload ─► Event
//!             │ AwaitingMoreData
//!             └──────────────► read again
//! ```
//!
//! [`Event`]: glass_types::Event

mod assembler;
mod decoder;
mod error;
mod parser;

pub use assembler::{AssemblyState, StreamAssembler, MAX_REQUEST_BYTES};
pub use decoder::decode_payload;
pub use error::{DecodeError, FramingError};
pub use parser::{parse_request, ParsedRequest, HEADER_TERMINATOR};
