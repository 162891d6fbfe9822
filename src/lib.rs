//! # imgpress
//!
//! Multi-tool image processing core: a client hands over an image and
//! names one of ~100 tools (resize, passport-photo, byte-budget
//! compression, format conversion, …); the core decodes once, applies
//! the tool's transform recipe, and returns re-encoded bytes plus
//! diagnostics.
//!
//! # Architecture: One Pipeline, Many Recipes
//!
//! ```text
//! bytes → ImageHandle → Recipe (may call the compression engine)
//!       → encoded bytes → response, buffers released
//! ```
//!
//! Every tool shares this pipeline. A [`recipes::Recipe`] is a stateless
//! `(image, params) → output` function registered once at startup; the
//! [`dispatch::Dispatcher`] owns the registry, validates parameters
//! against each recipe's schema, and serializes the CPU-heavy section
//! behind a process-wide gate so peak memory stays bounded no matter how
//! many requests are in flight.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`dispatch`] | Request orchestration: lookup, decode, validate, gate, respond; the `ToolError` taxonomy |
//! | [`recipes`] | The tool table — six families, ~100 entries, each independently testable |
//! | [`compress`] | Size-targeted compression: bounded binary search over codec quality |
//! | [`imaging`] | Codec seam: decode/encode, density sniffing, pure geometry math |
//! | [`params`] | Typed parameter schemas with unit-aware geometry normalization |
//! | [`lifecycle`] | Transform gate + RAII request scopes (the release invariant) |
//! | [`config`] | `config.toml` loading, validation, stock config generation |
//! | [`collab`] | Collaborator traits (text recognition) consumed by JSON tools |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Heavy Transform At A Time
//!
//! Decoded surfaces for multi-megapixel uploads run to hundreds of
//! megabytes. The [`lifecycle::TransformGate`] trades throughput for a
//! hard bound on peak memory: CPU-bound codec work is serialized
//! process-wide, and waiting requests simply queue on the lock. Requests
//! share nothing else — no cache, no cross-request state.
//!
//! ## Deterministic Release Instead Of GC Sweeps
//!
//! Every buffer a request allocates (decoded surface, canvases, output)
//! is owned by that request's stack frame and dropped when the
//! [`lifecycle::RequestScope`] ends, on success and error paths alike.
//! There is deliberately no periodic collection backstop here; ownership
//! already guarantees what a GC sweep would only approximate.
//!
//! ## Bounded Compression Search
//!
//! Byte-budget tools cannot invert quality→size analytically, so
//! [`compress`] binary-searches the quality knob with a hard probe cap
//! and a tolerance band. An unreachable budget returns the closest
//! encoding with a non-convergence flag — never an error.
//!
//! ## Recipes Over A Hundred-Arm Match
//!
//! Tools are entries in a registry table built at startup, not cases in
//! a giant dispatch match. Preset families (country passport sizes,
//! social canvas sizes, byte budgets) are mechanical tables over shared
//! apply functions, so each entry stays independently unit-testable.

pub mod collab;
pub mod compress;
pub mod config;
pub mod dispatch;
pub mod imaging;
pub mod lifecycle;
pub mod output;
pub mod params;
pub mod recipes;

#[cfg(test)]
pub(crate) mod test_helpers;
