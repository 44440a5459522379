// ---------------------------------------------------------------------------
// LinkState
// ---------------------------------------------------------------------------

/// Half-close state of a unidirectional link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    // ---
    /// Both halves open.
    Open,

    /// Producer side shut; messages already admitted may still drain to
    /// the reader.
    WriteClosed,

    /// Consumer side shut; no further deliveries.
    ReadClosed,

    /// Both halves shut.
    Closed,
}
