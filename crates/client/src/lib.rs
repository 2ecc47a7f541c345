//! Upstream adapters and markup rewriting for lazarus.
//!
//! This crate provides the render and archive sources, the fallback chain
//! that sequences them, and the rewriter that makes fetched markup servable
//! from the mirror domain.

pub mod archive;
pub mod orchestrator;
pub mod render;
pub mod rewrite;

pub use archive::{ArchiveConfig, ArchiveError, ArchiveSource};
pub use orchestrator::{FetchOrchestrator, Source};
pub use render::{RenderCapability, RenderError, RenderOptions, RenderSource, RenderedPage, Renderer};
pub use rewrite::{RewriteConfig, Rewriter, Rule, SiteProfile};

#[cfg(feature = "render")]
pub use render::HeadlessRenderer;
