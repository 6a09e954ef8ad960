//! Global Constants
//!
//! Centralized constants for file layout, markup markers and tool defaults.
//! All magic strings should be defined here with documentation.

/// Unit directory layout
pub mod layout {
    /// Directory (relative to the working directory) holding build units
    pub const DEFAULT_ROOT: &str = "slides";

    /// Root document every unit must contain
    pub const ROOT_DOCUMENT: &str = "main.tex";

    /// Generated page, written next to the root document
    pub const OUTPUT_HTML: &str = "index.html";

    /// Optional bibliography colocated with the root document
    pub const BIBLIOGRAPHY: &str = "refs.bib";

    /// Sub-directory receiving diagram artifacts
    pub const IMAGE_DIR: &str = "images";

    /// Suffix appended to the root document stem for the composite source
    pub const TEMP_SOURCE_SUFFIX: &str = "-temp.tex";
}

/// Diagram naming and template constants
pub mod diagram {
    /// Artifact name prefix: `tikz-<ordinal>.<ext>`
    pub const ARTIFACT_PREFIX: &str = "tikz";

    /// Extension of final artifacts
    pub const FINAL_EXTENSION: &str = "svg";

    /// Opening marker of an embedded diagram block
    pub const BEGIN_MARKER: &str = r"\begin{tikzpicture}";

    /// Closing marker of an embedded diagram block
    pub const END_MARKER: &str = r"\end{tikzpicture}";

    /// Default TikZ libraries loaded by the standalone template
    pub const DEFAULT_TIKZ_LIBRARIES: &[&str] = &[
        "arrows.meta",
        "automata",
        "positioning",
        "calc",
        "decorations.pathmorphing",
        "shapes.geometric",
    ];

    /// Packages every standalone diagram document loads
    pub const BASE_PACKAGES: &[&str] = &["[T1]{fontenc}", "{lmodern}", "{tikz}", "{amsmath}"];

    /// Default font format embedded by the converter
    pub const DEFAULT_FONT_FORMAT: &str = "woff2";

    /// Prefix of the fingerprint comment stamped into compiled SVGs
    pub const FINGERPRINT_PREFIX: &str = "<!-- slidepress:fingerprint=";
}

/// HTML post-processing markers
pub mod html {
    /// Sentinel preceding the injected stylesheet
    pub const CSS_MARKER: &str = "<!-- injected:styles.css -->";

    /// Sentinel preceding the injected script
    pub const JS_MARKER: &str = "<!-- injected:index.js -->";

    /// Attribute identifying an already-relocated table of contents
    pub const TOC_SIDEBAR_ID: &str = r#"id="toc-sidebar""#;

    /// Meta tag ensuring both color schemes are honored
    pub const COLOR_SCHEME_META: &str = r#"<meta name="color-scheme" content="light dark">"#;

    /// Namespace attribute required on inlined SVG roots
    pub const SVG_NAMESPACE: &str = r#"xmlns="http://www.w3.org/2000/svg""#;

    /// Unit-local stylesheet override
    pub const STYLESHEET_NAME: &str = "styles.css";

    /// Unit-local script override
    pub const SCRIPT_NAME: &str = "index.js";
}

/// External tool defaults
pub mod tools {
    pub const LATEX: &str = "latex";
    pub const DVISVGM: &str = "dvisvgm";
    pub const PANDOC: &str = "pandoc";

    /// Per-invocation timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Maximum characters of captured output kept in a diagnostic
    pub const MAX_DIAGNOSTIC_CHARS: usize = 4000;
}

/// Document converter defaults
pub mod pandoc {
    /// Default table-of-contents depth
    pub const DEFAULT_TOC_DEPTH: u8 = 3;

    /// Deepest heading level pandoc can list
    pub const MAX_TOC_DEPTH: u8 = 6;
}
