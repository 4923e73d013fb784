//! Hot-reload plumbing for a single live-edited fragment shader.
//!
//! The crate is GPU-agnostic. The renderer implements [`ShaderProgram`] on top of
//! `wgpu`; everything else (fingerprinting fetched source, deciding whether a
//! recompile is needed, polling the source on a timer) lives here:
//!
//! ```text
//!   Poller thread ── tick / ResyncHandle ──▶ SourceFetcher::fetch()
//!        │ FetchedSource { sequence, text }
//!        ▼
//!   ShaderSync::apply() ── fingerprint changed? ──▶ detach ▶ create_shader ▶ link
//! ```

mod fetch;
mod fingerprint;
mod hooks;
mod kind;
mod poller;
mod program;
mod sync;

pub use fetch::{
    FetchError, FileFetcher, HttpFetcher, SourceClient, SourceFetcher, SourceLocation,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_SOURCE,
};
pub use fingerprint::Fingerprint;
pub use hooks::{LoggingHooks, ReloadHooks};
pub use kind::ShaderKind;
pub use poller::{Poller, ResyncHandle, DEFAULT_POLL_INTERVAL};
pub use program::{frag, vert, ActiveShaders, ProgramError, ShaderProgram};
pub use sync::{FetchedSource, ResyncOutcome, ShaderSync};
