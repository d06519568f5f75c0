//! Catalog core: pure data model, status vocabulary, playlist parsing and
//! catalog assembly. No I/O happens here.
mod catalog;
mod entry;
mod playlist;
mod status;

pub use catalog::Catalog;
pub use entry::{
    CandidateEntry, CandidateKind, EntryId, RequestHeaders, ResolvedEntry, DEFAULT_GROUP,
};
pub use playlist::parse_playlist;
pub use status::{ErrorDetail, StreamStatus, UnknownStatus, MAX_ERROR_MESSAGE_CHARS};
