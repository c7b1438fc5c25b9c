//! Template engine: normalizes legacy call syntax, parses placeholders,
//! dispatches the fixed helper catalogue against merged saidata, and
//! safety-validates the result.

pub mod derive;
pub mod error;
pub mod helpers;
pub mod normalize;
pub mod parser;
pub mod render;
pub mod safety;

pub use error::{TemplateErrorKind, TemplateResolutionError};
pub use helpers::RenderContext;
pub use render::render;
