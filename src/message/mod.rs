//! The reusable byte buffers backing both directions of the connection.
//!
//! A session owns exactly one [`MessageBuilder`] (outbound) and one
//! [`MessageReader`] (inbound) for its whole lifetime; neither ever grows
//! without bound across requests since both reset to empty once their
//! contents are consumed.

mod builder;
mod reader;

pub use builder::MessageBuilder;
pub use reader::{MessageReader, RawMessage};
