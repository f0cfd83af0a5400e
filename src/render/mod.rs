//! Chart artifact rendering.
//!
//! - [`builder`] - the build pipeline run on a cache miss
//! - [`service`] - the external render service contract and its HTTP client
//! - [`decrypt`] - plaintext materialization of encrypted uploads
//! - [`template`] - chart page and fragment templates
//! - [`guard`] - scoped deletion of transient files
//!
//! The render service, decryptor and template engine are traits so the
//! plugin can be driven with in-process fakes in tests.

pub mod builder;
pub mod decrypt;
pub mod guard;
pub mod service;
pub mod template;

pub use builder::{
    ArtifactBuilder, BuildJob, ChartDisplay, Series, fix_svg_casing, truncate_for_diagnostics,
};
pub use decrypt::{CommandDecryptor, Decryptor, MaterializedFile, NoDecryptor, PlaintextRegistry};
pub use guard::TransientFile;
pub use service::{HttpRenderService, RenderRequest, RenderService};
pub use template::{ChartTemplate, TemplateEngine, TeraTemplateEngine};
