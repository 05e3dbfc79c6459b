//! These models represent the objects exchanged with the analysis service
//! and with the tool server.
//!
//! Messages go over the wire as-is; tool definitions are rendered into the
//! JSON-RPC `tools/list` reply by the binary.
pub mod message;
pub mod tool;
