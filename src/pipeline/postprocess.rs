//! HTML Post-Processing
//!
//! Structural fixes and payload inlining applied to the converter output:
//!
//! 1. drop the title block header
//! 2. move the table of contents into a collapsible sidebar
//! 3. declare the supported color schemes
//! 4. inline the stylesheet
//! 5. inline the script
//! 6. replace diagram `<img>` references with the SVG markup itself
//!
//! Every step first checks whether its result is already present, so running
//! the processor on its own output changes nothing. Edits splice by byte
//! position; payloads are never interpreted as replacement templates.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use tracing::{debug, info, warn};

use super::assets::AssetResolver;
use crate::constants::html::{
    COLOR_SCHEME_META, CSS_MARKER, JS_MARKER, SVG_NAMESPACE, TOC_SIDEBAR_ID,
};
use crate::types::{ArtifactKind, BuildUnit, Result, ResultExt, SlideError};

static TITLE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<header\b[^>]*\bid=["']title-block-header["'][^>]*>.*?</header>\s*"#)
        .expect("valid title header pattern")
});

static TOC_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<((?i:nav|div))\b[^>]*\bid=["']TOC["'][^>]*>"#).expect("valid toc pattern")
});

static NAV_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</nav\s*>").expect("valid nav close pattern"));

static DIV_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</div\s*>").expect("valid div close pattern"));

static BODY_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body\b[^>]*>").expect("valid body pattern"));

static HEAD_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</head\s*>").expect("valid head pattern"));

static DOCUMENT_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</body\s*>\s*</html\s*>\s*$").expect("valid document end pattern")
});

static COLOR_META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\b[^>]*\bname=["']color-scheme["']"#).expect("valid meta pattern")
});

static IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*\bsrc=["']([^"']+)["'][^>]*>"#).expect("valid img pattern")
});

static XML_PROLOG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<\?xml.*?\?>\s*").expect("valid prolog pattern"));

static DOCTYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!DOCTYPE[^>]*>\s*").expect("valid doctype pattern"));

static SVG_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<svg\b").expect("valid svg pattern"));

static XMLNS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\sxmlns\s*=").expect("valid xmlns pattern"));

/// A structural anchor required for an edit is absent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingAnchor(pub &'static str);

fn splice(html: &str, range: std::ops::Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(html.len() + replacement.len());
    out.push_str(&html[..range.start]);
    out.push_str(replacement);
    out.push_str(&html[range.end..]);
    out
}

/// Whether an idempotency marker is already present
pub fn has_marker(html: &str, marker: &str) -> bool {
    html.contains(marker)
}

pub fn remove_title_header(html: &str) -> String {
    match TITLE_HEADER_RE.find(html) {
        Some(m) => splice(html, m.range(), ""),
        None => html.to_string(),
    }
}

/// Move the converter's TOC into the sidebar right after `<body>`
pub fn relocate_toc(html: &str) -> std::result::Result<String, MissingAnchor> {
    if html.contains(TOC_SIDEBAR_ID) {
        return Ok(html.to_string());
    }
    let Some(caps) = TOC_OPEN_RE.captures(html) else {
        return Ok(html.to_string());
    };
    let Some(open) = caps.get(0) else {
        return Ok(html.to_string());
    };

    let close_re = if caps[1].eq_ignore_ascii_case("nav") {
        &NAV_CLOSE_RE
    } else {
        &DIV_CLOSE_RE
    };
    let close = close_re
        .find_at(html, open.end())
        .ok_or(MissingAnchor("closing tag of the table of contents"))?;

    let inner = html[open.end()..close.start()].trim();
    let sidebar = format!(
        "\n<nav class=\"toc-sidebar\" {} aria-label=\"Table of contents\">\n  <details id=\"toc-details\">\n    <summary>Contents</summary>\n    {}\n  </details>\n</nav>\n",
        TOC_SIDEBAR_ID, inner
    );

    let without = splice(html, open.start()..close.end(), "");
    let body = BODY_OPEN_RE
        .find(&without)
        .ok_or(MissingAnchor("<body>"))?;
    Ok(splice(&without, body.end()..body.end(), &sidebar))
}

pub fn ensure_color_scheme(html: &str) -> std::result::Result<String, MissingAnchor> {
    if COLOR_META_RE.is_match(html) {
        return Ok(html.to_string());
    }
    let head = HEAD_CLOSE_RE.find(html).ok_or(MissingAnchor("</head>"))?;
    Ok(splice(
        html,
        head.start()..head.start(),
        &format!("  {}\n", COLOR_SCHEME_META),
    ))
}

/// Insert the stylesheet block before `</head>`; callers check the marker first
pub fn inject_stylesheet(html: &str, css: &str) -> std::result::Result<String, MissingAnchor> {
    let head = HEAD_CLOSE_RE.find(html).ok_or(MissingAnchor("</head>"))?;
    Ok(splice(
        html,
        head.start()..head.start(),
        &format!("{}\n<style>\n{}\n</style>\n", CSS_MARKER, css.trim_end()),
    ))
}

/// Insert the script block before the closing `</body></html>`; callers check the marker first
pub fn inject_script(html: &str, js: &str) -> std::result::Result<String, MissingAnchor> {
    let end = DOCUMENT_END_RE
        .find(html)
        .ok_or(MissingAnchor("</body></html>"))?;
    Ok(splice(
        html,
        end.range(),
        &format!(
            "{}\n<script>\n{}\n</script>\n</body>\n</html>\n",
            JS_MARKER,
            js.trim_end()
        ),
    ))
}

/// Make artifact markup embeddable: no prolog, no doctype, explicit namespace
pub fn prepare_svg(svg: &str) -> String {
    let svg = XML_PROLOG_RE.replace(svg, "");
    let svg = DOCTYPE_RE.replace(&svg, "");
    let svg = svg.trim();
    if XMLNS_RE.is_match(svg) {
        return svg.to_string();
    }
    match SVG_OPEN_RE.find(svg) {
        Some(open) => splice(svg, open.end()..open.end(), &format!(" {}", SVG_NAMESPACE)),
        None => svg.to_string(),
    }
}

/// Replace `<img src="<image_dir>/tikz-N.svg">` elements with the artifact markup.
///
/// Returns the new document and the artifacts that were referenced but absent.
pub fn inline_svgs(html: &str, image_dir: &Path, image_dir_name: &str) -> (String, Vec<PathBuf>) {
    let prefix = format!("{}/", image_dir_name);
    let mut out = String::with_capacity(html.len());
    let mut missing = Vec::new();
    let mut cursor = 0;

    for caps in IMG_RE.captures_iter(html) {
        let (Some(element), Some(src)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(file_name) = src.as_str().strip_prefix(prefix.as_str()) else {
            continue;
        };
        if file_name.contains('/') || ArtifactKind::classify(file_name) != Some(ArtifactKind::Final) {
            continue;
        }

        let path = image_dir.join(file_name);
        match std::fs::read_to_string(&path) {
            Ok(svg) => {
                out.push_str(&html[cursor..element.start()]);
                out.push_str(&prepare_svg(&svg));
                cursor = element.end();
            }
            Err(_) => missing.push(path),
        }
    }

    out.push_str(&html[cursor..]);
    (out, missing)
}

/// What one post-processing pass did
#[derive(Debug, Clone, Default)]
pub struct PostProcessSummary {
    /// Whether the document on disk was rewritten
    pub changed: bool,
    pub missing_artifacts: Vec<PathBuf>,
}

#[derive(Clone)]
pub struct HtmlPostProcessor {
    assets: AssetResolver,
    image_dir_name: String,
}

impl HtmlPostProcessor {
    pub fn new(assets: AssetResolver, image_dir_name: impl Into<String>) -> Self {
        Self {
            assets,
            image_dir_name: image_dir_name.into(),
        }
    }

    /// Apply every step to `html`, returning the processed document
    pub fn transform(&self, html: &str, unit: &BuildUnit) -> Result<(String, Vec<PathBuf>)> {
        let anchor = |MissingAnchor(what): MissingAnchor| {
            SlideError::post_process(&unit.output_html, format!("document has no {}", what))
        };

        let html = remove_title_header(html);
        let html = relocate_toc(&html).map_err(anchor)?;
        let mut html = ensure_color_scheme(&html).map_err(anchor)?;

        if !has_marker(&html, CSS_MARKER) {
            let css = self.assets.stylesheet(unit)?;
            debug!("[{}] Stylesheet from {}", unit.name, css.source);
            html = inject_stylesheet(&html, &css.text).map_err(anchor)?;
        }

        if !has_marker(&html, JS_MARKER) {
            let js = self.assets.script(unit)?;
            debug!("[{}] Script from {}", unit.name, js.source);
            html = inject_script(&html, &js.text).map_err(anchor)?;
        }

        let (html, missing) = inline_svgs(&html, &unit.image_dir, &self.image_dir_name);
        for path in &missing {
            warn!("[{}] Diagram artifact missing: {}", unit.name, path.display());
        }

        Ok((html, missing))
    }

    /// Process the unit's generated page in place, writing only on change
    pub async fn process(&self, unit: &BuildUnit) -> Result<PostProcessSummary> {
        let path = &unit.output_html;
        let original = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SlideError::post_process(path, format!("cannot read: {}", e)))?;

        // Asset and SVG reads happen inside `transform`
        let worker = self.clone();
        let owned = unit.clone();
        let (original, (processed, missing_artifacts)) = tokio::task::spawn_blocking(move || {
            let result = worker.transform(&original, &owned);
            result.map(|out| (original, out))
        })
        .await
        .map_err(|e| SlideError::Io(std::io::Error::other(e.to_string())))??;
        let changed = processed != original;
        if changed {
            tokio::fs::write(path, &processed).await.with_path(path)?;
            info!("[{}] Post-processed {}", unit.name, path.display());
        } else {
            debug!("[{}] {} already up to date", unit.name, path.display());
        }

        Ok(PostProcessSummary {
            changed,
            missing_artifacts,
        })
    }
}
