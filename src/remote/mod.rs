//! Remote parser seam and wire payload types.

mod parser;

pub use parser::{ParserError, RemoteFieldSignal, RemoteParse, RemoteParser, UnavailableParser};
