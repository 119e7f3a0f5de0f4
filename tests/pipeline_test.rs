//! End-to-end conversion tests.
//!
//! Every test drives [`Converter`] with an in-process typesetter that
//! mimics the real engine: it prepends a shared definitions block and
//! replaces each `$...$` span with rendered output.

use std::cell::RefCell;
use std::fs;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mathpage::{Converter, Document, Error, Renderer, TypesetRequest, TypesetResult};
use tempfile::TempDir;

const DEFS: &str = r#"<svg style="display:none"><defs><path id="MJX-x" d="M0 0"></path></defs></svg>"#;
const FORMULA: &str = r##"<svg class="MathJax_SVG"><use href="#MJX-x"></use></svg>"##;

/// Replace every `$...$` span in `html` with `with`.
fn replace_math(html: &str, with: &str) -> String {
    let mut out = String::new();
    let mut rest = html;
    while let Some(start) = rest.find('$') {
        let Some(len) = rest[start + 1..].find('$') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(with);
        rest = &rest[start + len + 2..];
    }
    out.push_str(rest);
    out
}

fn fake_engine(req: TypesetRequest) -> mathpage::Result<TypesetResult> {
    let body = match req.renderer {
        Renderer::Svg => replace_math(&req.html, FORMULA),
        Renderer::Img => {
            let img = format!(
                r#"<img class="MathJax_SVG_IMG" src="data:image/svg+xml;base64,{}">"#,
                STANDARD.encode(FORMULA)
            );
            replace_math(&req.html, &img)
        }
    };
    Ok(TypesetResult::new(format!("{DEFS}{body}")))
}

fn prefix_in(dir: &TempDir, name: &str) -> String {
    format!("{}/{}", dir.path().display(), name)
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_inline_svg_end_to_end() {
    let out = Converter::new(fake_engine)
        .convert("<html><body><span>$x+y$</span></body></html>")
        .unwrap();

    assert_eq!(
        out.html,
        format!("<!DOCTYPE html>\n<html><head>{DEFS}</head><body><span>{FORMULA}</span></body></html>")
    );
    assert!(out.images.is_empty());
    assert!(out.warnings.is_empty());
}

#[test]
fn test_image_mode_end_to_end() {
    let dir = TempDir::new().unwrap();
    let prefix = prefix_in(&dir, "eq");

    let out = Converter::new(fake_engine)
        .with_image_prefix(prefix.as_str())
        .convert("<html><body><span>$x+y$</span></body></html>")
        .unwrap();

    let file = format!("{prefix}0001.svg");
    assert_eq!(out.images.len(), 1);
    assert_eq!(out.images[0].path.to_str(), Some(file.as_str()));
    assert_eq!(
        out.html,
        format!(
            "<!DOCTYPE html>\n<html><head>{DEFS}</head><body><span><img class=\"MathJax_SVG_IMG\" src=\"{file}\"></span></body></html>"
        )
    );

    let written = fs::read_to_string(&file).unwrap();
    assert!(written.starts_with("<?xml version=\"1.0\" standalone=\"no\"?>\n<!DOCTYPE svg PUBLIC"));
    assert!(written.ends_with(FORMULA));
}

#[test]
fn test_three_images_in_document_order() {
    let dir = TempDir::new().unwrap();
    let prefix = prefix_in(&dir, "page-");

    let out = Converter::new(fake_engine)
        .with_image_prefix(prefix.as_str())
        .convert("<h1>$a$</h1><p>text $b$ more</p><ul><li>$c$</li></ul>")
        .unwrap();

    let paths: Vec<String> = out
        .images
        .iter()
        .map(|image| image.path.display().to_string())
        .collect();
    assert_eq!(
        paths,
        vec![
            format!("{prefix}0001.svg"),
            format!("{prefix}0002.svg"),
            format!("{prefix}0003.svg"),
        ]
    );

    let h1 = out.html.find(&paths[0]).unwrap();
    let p = out.html.find(&paths[1]).unwrap();
    let li = out.html.find(&paths[2]).unwrap();
    assert!(h1 < p && p < li);
    assert!(!out.html.contains("data:image"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);
}

// ============================================================================
// Stage properties observed through the pipeline
// ============================================================================

#[test]
fn test_zero_math_page_round_trips() {
    let page = concat!(
        "<!DOCTYPE html>\n",
        "<html lang=\"en\"><head><meta charset=\"utf-8\"><title>Notes</title></head>",
        "<body><p class=\"lead\">Prices &lt; 5&nbsp;€</p><img src=\"a.png\" alt=\"\"><br></body></html>"
    );
    let engine = |req: TypesetRequest| -> mathpage::Result<TypesetResult> {
        Ok(TypesetResult::new(format!("{DEFS}{}", req.html)))
    };

    let out = Converter::new(engine).convert(page).unwrap();

    let expected = page.replace("</title></head>", &format!("</title>{DEFS}</head>"));
    assert_eq!(out.html, expected);
}

#[test]
fn test_noscript_and_template_round_trip() {
    let body = concat!(
        "<noscript><p>Enable <a href=\"/help\">JavaScript</a></p></noscript>",
        "<template id=\"row\"><li class=\"item\">a &amp; b</li></template>",
        "<p>tail</p>"
    );
    let page = format!("<!DOCTYPE html>\n<html><head><title>T</title></head><body>{body}</body></html>");
    let seen = RefCell::new(String::new());
    let engine = |req: TypesetRequest| -> mathpage::Result<TypesetResult> {
        *seen.borrow_mut() = req.html.clone();
        Ok(TypesetResult::new(format!("{DEFS}{}", req.html)))
    };

    let out = Converter::new(&engine).convert(&page).unwrap();

    assert_eq!(*seen.borrow(), body);
    assert_eq!(
        out.html,
        page.replace("</title></head>", &format!("</title>{DEFS}</head>"))
    );
}

#[test]
fn test_head_gains_exactly_one_child() {
    let head = "<title>T</title><link rel=\"stylesheet\" href=\"s.css\">";
    let page = format!("<html><head>{head}</head><body><p>$x$</p><p>$y$</p></body></html>");

    let out = Converter::new(fake_engine).convert(&page).unwrap();

    assert_eq!(
        out.html,
        format!(
            "<!DOCTYPE html>\n<html><head>{head}{DEFS}</head><body><p>{FORMULA}</p><p>{FORMULA}</p></body></html>"
        )
    );
}

#[test]
fn test_bootstrap_scripts_stripped_others_kept() {
    let page = concat!(
        "<html><head>",
        "<script type=\"text/x-mathjax-config\">MathJax.Hub.Config({tex2jax: {}});</script>",
        "<script src=\"https://cdn.example.org/mathjax/2.7/MathJax.js?config=TeX-AMS_SVG\"></script>",
        "<script src=\"analytics.js\"></script>",
        "</head><body><p>$x$</p><script>document.title = 'x';</script></body></html>"
    );

    let out = Converter::new(fake_engine).convert(page).unwrap();

    assert!(!out.html.contains("text/x-mathjax-config"));
    assert!(!out.html.contains("MathJax.js"));
    assert!(out.html.contains("<script src=\"analytics.js\"></script>"));
    assert!(out.html.contains("<script>document.title = 'x';</script>"));
}

#[test]
fn test_serialization_is_idempotent() {
    // Definitions that stay in <head> when the output is parsed again.
    let engine = |req: TypesetRequest| -> mathpage::Result<TypesetResult> {
        let body = replace_math(&req.html, FORMULA);
        Ok(TypesetResult::new(format!("<style>.MathJax_SVG {{ display: inline }}</style>{body}")))
    };

    let out = Converter::new(engine)
        .convert("<div>$x$<table><tr><td>cell &amp; more</td></tr></table></div>")
        .unwrap();

    let reparsed = Document::parse(&out.html).unwrap();
    assert_eq!(reparsed.to_html_document(), out.html);
    assert_eq!(reparsed.to_html_document(), reparsed.to_html_document());
}

#[test]
fn test_mathml_prefix_reaches_typesetter() {
    let seen = RefCell::new(Vec::new());
    let engine = |req: TypesetRequest| -> mathpage::Result<TypesetResult> {
        seen.borrow_mut().push(req.xmlns.clone());
        Ok(TypesetResult::new("<div></div>"))
    };
    let converter = Converter::new(&engine);

    converter
        .convert(r#"<html xmlns:m="http://www.w3.org/1998/Math/MathML"><body></body></html>"#)
        .unwrap();
    converter.convert("<html><body></body></html>").unwrap();

    assert_eq!(*seen.borrow(), vec!["m".to_string(), "mml".to_string()]);
}

#[test]
fn test_legacy_encoding_input() {
    // "café" in Windows-1252
    let page = b"<html><body><p>caf\xe9 $x$</p></body></html>";

    let out = Converter::new(fake_engine).convert_bytes(page).unwrap();

    assert!(out.html.contains(&format!("<p>café {FORMULA}</p>")));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_typesetter_error_aborts() {
    let engine = |_req: TypesetRequest| -> mathpage::Result<TypesetResult> {
        Err(Error::OracleFailed("TeX parse error".to_string()))
    };

    let err = Converter::new(engine).convert("<p>$x$</p>").unwrap_err();
    assert!(matches!(err, Error::OracleFailed(_)));
}

#[test]
fn test_frameset_document_rejected() {
    let engine = |req: TypesetRequest| -> mathpage::Result<TypesetResult> {
        Ok(TypesetResult::new(req.html))
    };

    let err = Converter::new(engine)
        .convert("<html><frameset><frame src=\"a.html\"></frameset></html>")
        .unwrap_err();
    assert!(matches!(err, Error::MissingElement(ref name) if name == "body"));
}
