//! The conversion pipeline.
//!
//! ```text
//! parse -> resolve MathML prefix -> typeset -> splice -> [externalize images] -> serialize
//! ```
//!
//! Each stage takes the [`Document`] by value and hands it on, so no stage
//! can observe another's half-finished tree.

use std::time::Duration;

use crate::dom::Document;
use crate::error::Result;
use crate::images::{self, ExtractedImage};
use crate::namespace;
use crate::splice;
use crate::typeset::{Renderer, TypesetOptions, TypesetRequest, Typesetter};

/// Output of one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// The finished document, doctype line included.
    pub html: String,
    /// Images written in image mode, in ordinal order.
    pub images: Vec<ExtractedImage>,
    /// Problems the typesetter reported without failing.
    pub warnings: Vec<String>,
}

/// Converts pages with a given typesetter and settings.
///
/// # Example
///
/// ```
/// use mathpage::{Converter, TypesetRequest, TypesetResult};
///
/// // A stand-in typesetter that prepends a definitions block.
/// let oracle = |req: TypesetRequest| -> mathpage::Result<TypesetResult> {
///     Ok(TypesetResult::new(format!("<svg id=\"defs\"></svg>{}", req.html)))
/// };
///
/// let out = Converter::new(oracle).convert("<p>plain</p>").unwrap();
/// assert_eq!(
///     out.html,
///     "<!DOCTYPE html>\n<html><head><svg id=\"defs\"></svg></head><body><p>plain</p></body></html>"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Converter<T> {
    typesetter: T,
    options: TypesetOptions,
    image_prefix: Option<String>,
    timeout: Option<Duration>,
}

impl<T: Typesetter> Converter<T> {
    pub fn new(typesetter: T) -> Self {
        Self {
            typesetter,
            options: TypesetOptions::default(),
            image_prefix: None,
            timeout: None,
        }
    }

    pub fn with_options(mut self, options: TypesetOptions) -> Self {
        self.options = options;
        self
    }

    /// Switch to image mode, writing files named `<prefix>NNNN.svg`.
    /// An empty prefix means inline SVG.
    pub fn with_image_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.image_prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Give up on the typesetter after `timeout`. Without one the
    /// conversion waits for as long as the typesetter takes.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn options(&self) -> &TypesetOptions {
        &self.options
    }

    pub fn renderer(&self) -> Renderer {
        if self.image_prefix.is_some() {
            Renderer::Img
        } else {
            Renderer::Svg
        }
    }

    pub fn convert(&self, html: &str) -> Result<Conversion> {
        self.convert_document(Document::parse(html)?)
    }

    /// Like [`Converter::convert`], decoding non-UTF-8 input first.
    pub fn convert_bytes(&self, bytes: &[u8]) -> Result<Conversion> {
        self.convert_document(Document::parse_bytes(bytes)?)
    }

    #[tracing::instrument(skip_all, fields(renderer = ?self.renderer()))]
    pub fn convert_document(&self, doc: Document) -> Result<Conversion> {
        let xmlns = namespace::mathml_prefix(&doc);
        tracing::debug!(%xmlns, "resolved MathML prefix");

        let request = TypesetRequest::new(doc.body_html(), &self.options, self.renderer(), xmlns);
        let result = self.typesetter.typeset(request).wait_for(self.timeout)?;
        for error in &result.errors {
            tracing::warn!(%error, "typesetter reported a problem");
        }

        let doc = splice::splice(doc, &result.html);

        let (doc, images) = match &self.image_prefix {
            Some(prefix) => images::externalize_images(doc, prefix)?,
            None => (doc, Vec::new()),
        };
        tracing::info!(images = images.len(), "conversion finished");

        Ok(Conversion {
            html: doc.to_html_document(),
            images,
            warnings: result.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::Error;
    use crate::typeset::{CacheScope, Pending, TypesetResult, channel};

    type Seen = Rc<RefCell<Option<TypesetRequest>>>;

    /// Records the request and answers with fixed markup.
    struct Recorder {
        seen: Seen,
        answer: String,
    }

    fn recorder(answer: &str) -> (Recorder, Seen) {
        let seen = Seen::default();
        let recorder = Recorder {
            seen: Rc::clone(&seen),
            answer: answer.to_string(),
        };
        (recorder, seen)
    }

    impl Typesetter for Recorder {
        fn typeset(&self, request: TypesetRequest) -> Pending {
            *self.seen.borrow_mut() = Some(request);
            Pending::ready(Ok(TypesetResult::new(self.answer.clone())))
        }
    }

    #[test]
    fn test_request_carries_body_prefix_and_options() {
        let (recorder, seen) = recorder("<div></div>");
        let options = TypesetOptions::default().with_font_cache(false, CacheScope::PerEquation);
        let converter = Converter::new(recorder).with_options(options);

        converter
            .convert(r#"<html xmlns:m="http://www.w3.org/1998/Math/MathML"><body><p>$x$</p></body></html>"#)
            .unwrap();

        let seen = seen.borrow();
        let request = seen.as_ref().unwrap();
        assert_eq!(request.html, "<p>$x$</p>");
        assert_eq!(request.xmlns, "m");
        assert_eq!(request.renderer, Renderer::Svg);
        assert!(!request.use_font_cache);
        assert!(!request.use_global_cache);
    }

    #[test]
    fn test_image_prefix_selects_img_renderer() {
        let (img_recorder, _) = recorder("<div></div>");
        let converter = Converter::new(img_recorder).with_image_prefix("eq");
        assert_eq!(converter.renderer(), Renderer::Img);

        let (svg_recorder, _) = recorder("<div></div>");
        let converter = Converter::new(svg_recorder).with_image_prefix("");
        assert_eq!(converter.renderer(), Renderer::Svg);
    }

    #[test]
    fn test_zero_math_round_trip() {
        let input = concat!(
            "<!DOCTYPE html>\n<html lang=\"en\"><head><title>Plain</title>",
            "<script src=\"site.js\"></script></head>",
            "<body><h1>No math here</h1><p>Just &amp; text.</p></body></html>"
        );
        // Identity typesetter: shared definitions first, then the body unchanged.
        let oracle = |req: TypesetRequest| -> Result<TypesetResult> {
            Ok(TypesetResult::new(format!("<style>.m{{}}</style>{}", req.html)))
        };

        let out = Converter::new(oracle).convert(input).unwrap();

        assert_eq!(
            out.html,
            concat!(
                "<!DOCTYPE html>\n<html lang=\"en\"><head><title>Plain</title>",
                "<script src=\"site.js\"></script><style>.m{}</style></head>",
                "<body><h1>No math here</h1><p>Just &amp; text.</p></body></html>"
            )
        );
        assert!(out.images.is_empty());
    }

    #[test]
    fn test_typesetter_warnings_are_reported() {
        let oracle = |_req: TypesetRequest| -> Result<TypesetResult> {
            Ok(TypesetResult {
                html: "<div></div>".to_string(),
                errors: vec!["Undefined control sequence \\foo".to_string()],
            })
        };

        let out = Converter::new(oracle).convert("<p>$\\foo$</p>").unwrap();
        assert_eq!(out.warnings, vec!["Undefined control sequence \\foo".to_string()]);
    }

    #[test]
    fn test_typesetter_failure_aborts() {
        let oracle = |_req: TypesetRequest| -> Result<TypesetResult> {
            Err(Error::OracleFailed("engine crashed".into()))
        };

        let err = Converter::new(oracle).convert("<p>x</p>").unwrap_err();
        assert!(matches!(err, Error::OracleFailed(_)));
    }

    #[test]
    fn test_timeout_applies_to_silent_typesetter() {
        struct Silent;
        impl Typesetter for Silent {
            fn typeset(&self, _request: TypesetRequest) -> Pending {
                let (completion, pending) = channel();
                // Keep the completion alive without ever firing it.
                std::mem::forget(completion);
                pending
            }
        }

        let err = Converter::new(Silent)
            .with_timeout(Duration::from_millis(20))
            .convert("<p>x</p>")
            .unwrap_err();
        assert!(matches!(err, Error::OracleTimeout(_)));
    }
}
