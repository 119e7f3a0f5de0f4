//! Writing typeset images out as standalone SVG files.
//!
//! In image mode the typesetter emits `<img class="MathJax_SVG_IMG">`
//! elements whose `src` is an SVG data URI. Each one is written to
//! `<prefix><NNNN>.svg`, numbered from 1 in document order, and its `src`
//! is pointed at the file. Numbering depends only on position, so running
//! twice over the same page overwrites the same files.

use std::fs;
use std::path::PathBuf;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use percent_encoding::percent_decode_str;

use crate::dom::Document;
use crate::error::{Error, Result};

/// Class carried by externalizable images.
pub const IMAGE_CLASS: &str = "MathJax_SVG_IMG";

/// XML declaration and SVG 1.1 doctype written ahead of every image.
pub const SVG_PROLOGUE: &str = concat!(
    "<?xml version=\"1.0\" standalone=\"no\"?>\n",
    "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" ",
    "\"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n",
);

/// Standard alphabet, padding optional.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// One image written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    /// 1-based position among the marked images.
    pub ordinal: usize,
    pub path: PathBuf,
    /// Size of the decoded SVG payload, prologue excluded.
    pub bytes: usize,
}

/// File name for the `ordinal`-th image: `prefix` + 4-digit number + `.svg`.
pub fn image_path(prefix: &str, ordinal: usize) -> String {
    format!("{prefix}{ordinal:04}.svg")
}

/// Decode the payload of a data URI.
///
/// Everything up to the first comma is the header. The payload is base64
/// (ASCII whitespace ignored) unless the header is present and lacks
/// `;base64`, in which case it is percent-decoded.
pub fn decode_data_uri(src: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let (header, payload) = match src.split_once(',') {
        Some((header, payload)) => (Some(header), payload),
        None => (None, src),
    };

    if let Some(header) = header
        && header.starts_with("data:")
        && !header.ends_with(";base64")
    {
        return Ok(percent_decode_str(payload).collect());
    }

    let cleaned: Vec<u8> = payload
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    LENIENT_BASE64.decode(cleaned)
}

/// Write every marked image to disk and point its `src` at the file.
///
/// The first decode or write failure aborts; files written before it are
/// left in place.
#[tracing::instrument(skip(doc))]
pub fn externalize_images(
    mut doc: Document,
    prefix: &str,
) -> Result<(Document, Vec<ExtractedImage>)> {
    let marked = doc
        .dom()
        .elements_by_class(doc.dom().document(), IMAGE_CLASS);
    let mut images = Vec::with_capacity(marked.len());

    for (index, id) in marked.into_iter().enumerate() {
        let ordinal = index + 1;
        let src = doc.dom().get_attr(id, "src").unwrap_or_default();
        let svg = decode_data_uri(src).map_err(|source| Error::ImageDecode { ordinal, source })?;

        let path = image_path(prefix, ordinal);
        let mut contents = Vec::with_capacity(SVG_PROLOGUE.len() + svg.len());
        contents.extend_from_slice(SVG_PROLOGUE.as_bytes());
        contents.extend_from_slice(&svg);
        fs::write(&path, contents)?;
        tracing::debug!(ordinal, %path, bytes = svg.len(), "image written");

        doc.dom_mut().set_attr(id, "src", &path);
        images.push(ExtractedImage {
            ordinal,
            path: PathBuf::from(path),
            bytes: svg.len(),
        });
    }

    Ok((doc, images))
}
