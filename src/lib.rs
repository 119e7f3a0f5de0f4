//! # mathpage
//!
//! Turns an HTML page containing TeX, AsciiMath or MathML into a static
//! page where every formula is pre-rendered SVG.
//!
//! ## Features
//!
//! - Parses real-world HTML5 (and legacy encodings) with html5ever
//! - Hands the body to a pluggable [`Typesetter`] and splices the result back
//! - Hoists shared glyph definitions into `<head>`
//! - Strips the typesetter's client-side loader scripts
//! - Optionally writes each formula out as a standalone `.svg` file
//!
//! ## Quick Start
//!
//! ```no_run
//! use mathpage::{CommandTypesetter, Converter};
//!
//! let engine = CommandTypesetter::new("mathjax-typeset");
//! let page = std::fs::read("page.html").unwrap();
//!
//! let out = Converter::new(engine)
//!     .with_image_prefix("eq")
//!     .convert_bytes(&page)
//!     .unwrap();
//! std::fs::write("page.static.html", out.html).unwrap();
//! ```
//!
//! ## Custom typesetters
//!
//! Any closure from [`TypesetRequest`] to [`Result<TypesetResult>`] works:
//!
//! ```
//! use mathpage::{Converter, TypesetRequest, TypesetResult};
//!
//! let engine = |req: TypesetRequest| -> mathpage::Result<TypesetResult> {
//!     let body = req.html.replace("$x$", "<svg><text>x</text></svg>");
//!     Ok(TypesetResult::new(format!("<svg id=\"defs\"></svg>{body}")))
//! };
//!
//! let out = Converter::new(engine).convert("<p>$x$</p>").unwrap();
//! assert!(out.html.contains("<p><svg><text>x</text></svg></p>"));
//! ```

pub mod dom;
pub mod error;
pub mod images;
pub mod namespace;
pub mod pipeline;
pub mod splice;
pub mod typeset;
pub(crate) mod util;

pub use dom::Document;
pub use error::{Error, Result};
pub use images::ExtractedImage;
pub use pipeline::{Conversion, Converter};
pub use typeset::{
    CacheScope, CommandTypesetter, EngineConfig, EquationNumbers, InputFormat, Renderer,
    TypesetOptions, TypesetRequest, TypesetResult, Typesetter,
};
