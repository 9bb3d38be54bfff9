//! Structural minification and the shared lightningcss pass.

use std::collections::HashSet;

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use vendorcss_shared::{Result, VendorCssError};

/// Minify a stylesheet.
pub fn minify(css: &str) -> Result<String> {
    transform(css, HashSet::new(), true)
}

/// Parse, drop rules referencing `unused_symbols`, and print.
///
/// Parsing recovers from invalid rules and declarations so vendor hacks do
/// not abort the run.
pub(crate) fn transform(css: &str, unused_symbols: HashSet<String>, minify: bool) -> Result<String> {
    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            error_recovery: true,
            ..ParserOptions::default()
        },
    )
    .map_err(|e| VendorCssError::css(format!("error parsing CSS: {e}")))?;

    stylesheet
        .minify(MinifyOptions {
            unused_symbols,
            ..MinifyOptions::default()
        })
        .map_err(|e| VendorCssError::css(format!("error minifying CSS: {e}")))?;

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify,
            ..PrinterOptions::default()
        })
        .map_err(|e| VendorCssError::css(format!("error printing CSS: {e}")))?;

    Ok(printed.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_whitespace_and_comments() {
        let css = "/* banner */\n.a {\n  color: red;\n}\n\n.b   > .c { margin: 0px }\n";
        let out = minify(css).unwrap();
        assert!(!out.contains("banner"));
        assert!(!out.contains('\n'));
        assert!(out.contains(".a{"));
        assert!(out.len() < css.len());
    }

    #[test]
    fn minify_is_stable() {
        let css = ".a{color:red}.b{color:blue}@media (min-width:768px){.a{color:green}}";
        let once = minify(css).unwrap();
        let twice = minify(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn recovers_from_invalid_declarations() {
        let css = ".a{color:red}.b{filter:progid:DXImageTransform.Microsoft.gradient(enabled=false)}";
        let out = minify(css).unwrap();
        assert!(out.contains(".a"));
    }
}
