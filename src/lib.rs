
pub mod util;
pub mod stati;
pub mod reporter;
pub mod impl_std;
pub mod impl_tokio;

/// server port to listen on/connect to
pub const DEFAULT_PORT: u16 = 5201;

/// every message on the wire is exactly one byte
pub const PAYLOAD_LEN: usize = 1;
