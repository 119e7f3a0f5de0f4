//! Typesetter requests, results and the single-shot completion protocol.
//!
//! The layout engine itself lives outside this crate. A [`Typesetter`]
//! receives the body markup plus a [`TypesetRequest`] describing what to
//! look for and how to render it, and answers exactly once through a
//! [`Pending`] handle.
//!
//! # Example
//!
//! ```
//! use mathpage::typeset::{Renderer, TypesetOptions, TypesetRequest, TypesetResult, Typesetter};
//!
//! // Any `Fn(TypesetRequest) -> Result<TypesetResult>` is a typesetter.
//! let echo = |req: TypesetRequest| -> mathpage::Result<TypesetResult> {
//!     Ok(TypesetResult::new(req.html))
//! };
//!
//! let request = TypesetRequest::new("<p>$x$</p>", &TypesetOptions::default(), Renderer::Svg, "mml");
//! let result = echo.typeset(request).wait().unwrap();
//! assert_eq!(result.html, "<p>$x$</p>");
//! ```

mod command;
mod pending;

pub use command::{CommandTypesetter, EngineConfig};
pub use pending::{Completion, Pending, channel};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Output mode of the typesetter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Renderer {
    /// Inline SVG in the page.
    #[serde(rename = "SVG")]
    Svg,
    /// `<img>` elements carrying SVG data URIs, meant to be externalized.
    #[serde(rename = "IMG")]
    Img,
}

/// A math notation the typesetter scans for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFormat {
    AsciiMath,
    TeX,
    MathML,
}

impl InputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            InputFormat::AsciiMath => "AsciiMath",
            InputFormat::TeX => "TeX",
            InputFormat::MathML => "MathML",
        }
    }

    /// Parse a comma separated list such as `"AsciiMath, TeX,MathML"`.
    pub fn parse_list(s: &str) -> std::result::Result<Vec<Self>, String> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asciimath" => Ok(InputFormat::AsciiMath),
            "tex" | "latex" => Ok(InputFormat::TeX),
            "mathml" => Ok(InputFormat::MathML),
            _ => Err(format!("unknown input format: {s}")),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Equation numbering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EquationNumbers {
    #[default]
    #[serde(rename = "none")]
    None,
    /// Number only AMS numbered environments, in sequence.
    #[serde(rename = "AMS")]
    Ams,
    #[serde(rename = "all")]
    All,
}

impl FromStr for EquationNumbers {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(EquationNumbers::None),
            "ams" => Ok(EquationNumbers::Ams),
            "all" => Ok(EquationNumbers::All),
            _ => Err(format!("unknown equation number style: {s}")),
        }
    }
}

/// Lifetime of the typesetter's shared glyph definitions.
///
/// Passed with every request so the caller, not process-wide state,
/// decides whether definitions are shared across equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheScope {
    /// One set of definitions for the whole page.
    #[default]
    Global,
    /// Definitions repeated inside each equation.
    PerEquation,
}

/// Options that shape how math is found and rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct TypesetOptions {
    pub inputs: Vec<InputFormat>,
    pub equation_numbers: EquationNumbers,
    /// Treat `$...$` as inline math.
    pub single_dollars: bool,
    /// Share glyph paths through `<defs>`/`<use>`.
    pub font_cache: bool,
    pub cache_scope: CacheScope,
    pub preview: bool,
    pub speech: bool,
    pub speech_ruleset: String,
    pub speech_style: String,
    /// ex height in pixels.
    pub ex: u32,
    /// Container width in ex.
    pub width: u32,
    pub linebreaks: bool,
}

impl Default for TypesetOptions {
    fn default() -> Self {
        Self {
            inputs: vec![InputFormat::AsciiMath, InputFormat::TeX, InputFormat::MathML],
            equation_numbers: EquationNumbers::None,
            single_dollars: true,
            font_cache: true,
            cache_scope: CacheScope::Global,
            preview: false,
            speech: false,
            speech_ruleset: "mathspeak".to_string(),
            speech_style: "default".to_string(),
            ex: 6,
            width: 100,
            linebreaks: false,
        }
    }
}

impl TypesetOptions {
    pub fn with_inputs(mut self, inputs: Vec<InputFormat>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_equation_numbers(mut self, numbers: EquationNumbers) -> Self {
        self.equation_numbers = numbers;
        self
    }

    pub fn with_single_dollars(mut self, enabled: bool) -> Self {
        self.single_dollars = enabled;
        self
    }

    pub fn with_font_cache(mut self, enabled: bool, scope: CacheScope) -> Self {
        self.font_cache = enabled;
        self.cache_scope = scope;
        self
    }

    pub fn with_preview(mut self, enabled: bool) -> Self {
        self.preview = enabled;
        self
    }

    /// Enable speech text with the given ruleset and style.
    pub fn with_speech(mut self, ruleset: impl Into<String>, style: impl Into<String>) -> Self {
        self.speech = true;
        self.speech_ruleset = ruleset.into();
        self.speech_style = style.into();
        self
    }

    pub fn with_size(mut self, ex: u32, width: u32) -> Self {
        self.ex = ex;
        self.width = width;
        self
    }

    pub fn with_linebreaks(mut self, enabled: bool) -> Self {
        self.linebreaks = enabled;
        self
    }
}

/// `chromevox` is the engine's `default` ruleset.
fn engine_ruleset(ruleset: &str) -> String {
    if ruleset.eq_ignore_ascii_case("chromevox") {
        "default".to_string()
    } else {
        ruleset.to_string()
    }
}

/// One typesetting job, in the typesetter's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypesetRequest {
    /// Body markup to scan for math.
    pub html: String,
    pub renderer: Renderer,
    pub inputs: Vec<InputFormat>,
    pub equation_numbers: EquationNumbers,
    pub single_dollars: bool,
    pub use_font_cache: bool,
    pub use_global_cache: bool,
    pub add_preview: bool,
    pub speak_text: bool,
    pub speak_ruleset: String,
    pub speak_style: String,
    pub ex: u32,
    pub width: u32,
    pub linebreaks: bool,
    /// Prefix to qualify emitted MathML elements with.
    pub xmlns: String,
}

impl TypesetRequest {
    pub fn new(
        html: impl Into<String>,
        options: &TypesetOptions,
        renderer: Renderer,
        xmlns: impl Into<String>,
    ) -> Self {
        Self {
            html: html.into(),
            renderer,
            inputs: options.inputs.clone(),
            equation_numbers: options.equation_numbers,
            single_dollars: options.single_dollars,
            use_font_cache: options.font_cache,
            use_global_cache: options.cache_scope == CacheScope::Global,
            add_preview: options.preview,
            speak_text: options.speech,
            speak_ruleset: engine_ruleset(&options.speech_ruleset),
            speak_style: options.speech_style.clone(),
            ex: options.ex,
            width: options.width,
            linebreaks: options.linebreaks,
            xmlns: xmlns.into(),
        }
    }
}

/// What the typesetter hands back.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypesetResult {
    /// Replacement body markup. The first node is the shared definitions
    /// block destined for `<head>`.
    pub html: String,
    /// Non-fatal problems reported by the engine (e.g. TeX errors).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl TypesetResult {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            errors: Vec::new(),
        }
    }
}

/// An external typesetting engine.
pub trait Typesetter {
    /// Start typesetting. The returned handle resolves exactly once.
    fn typeset(&self, request: TypesetRequest) -> Pending;
}

impl<F> Typesetter for F
where
    F: Fn(TypesetRequest) -> Result<TypesetResult>,
{
    fn typeset(&self, request: TypesetRequest) -> Pending {
        Pending::ready(self(request))
    }
}
