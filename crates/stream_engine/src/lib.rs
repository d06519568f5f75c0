//! Stream engine: network I/O, candidate extraction, resolution and the
//! bounded-concurrency run pipeline.
mod batch;
mod charset;
mod context;
mod embed;
mod engine;
mod export;
mod extract;
mod fetch;
mod obfuscation;
mod persist;
mod renderer;
mod resolve;
mod titles;
mod types;

pub use batch::{partition_batches, BatchRunner, CandidateResolver};
pub use charset::{decode_body, DecodedText};
pub use context::{
    EngineConfig, EngineContext, LogProgressSink, ProgressSink, DEFAULT_GATED_HOSTS,
    DEFAULT_USER_AGENT,
};
pub use embed::{EmbedInspector, EmbedResolver};
pub use engine::StreamEngine;
pub use export::{catalog_to_json, write_catalog, CatalogForm, ExportError};
pub use extract::{
    CandidateExtractor, Discovered, EventHandlerStrategy, ExtractionStrategy, ExtractorSettings,
    IframeStrategy, InputValueStrategy, PageSource, PatternStrategy, RenderedValueStrategy,
};
pub use fetch::{FetchHeaders, Fetcher, ReqwestFetcher};
pub use obfuscation::{DecodeMiss, ObfuscationDecoder};
pub use persist::{ensure_output_dir, write_atomic, PersistError};
pub use renderer::{NoopRenderer, RenderedPage, Renderer};
pub use resolve::{contains_manifest_marker, looks_like_stream, HttpResolver, StreamProbe};
pub use titles::{extract_titles, label_for};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, RunEvent, RunOutcome};
