/// Marker type for the transaction verification flow: a server-to-gateway
/// lookup of the authoritative state of one payment attempt.
#[derive(Debug, Clone)]
pub struct Verify;
