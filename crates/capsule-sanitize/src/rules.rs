//! # Rewrite Passes
//!
//! Each pass is a single streaming rewrite over the document. Untouched
//! markup is passed through byte for byte, which is what makes a second
//! sanitization of the output a no-op.

use std::borrow::Cow;
use std::collections::HashMap;

use lol_html::html_content::Element;
use lol_html::{element, rewrite_str, ElementContentHandlers, RewriteStrSettings, Selector};

use crate::error::SanitizeError;

/// Elements that execute code or load nested documents.
pub const ACTIVE_ELEMENTS: &[&str] = &[
    "script", "iframe", "frame", "frameset", "object", "embed", "applet", "portal",
];

/// `<link rel>` tokens that trigger fetches when the snapshot is opened.
pub const FETCHING_LINK_RELS: &[&str] = &[
    "preload",
    "modulepreload",
    "prefetch",
    "prerender",
    "dns-prefetch",
    "preconnect",
    "manifest",
];

/// `<meta http-equiv>` values that act at transport level.
pub const BLOCKED_HTTP_EQUIV: &[&str] = &[
    "content-security-policy",
    "content-security-policy-report-only",
    "refresh",
];

/// Attributes that may carry a navigable URL.
pub const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction"];

/// Modal dialogs, consent banners and sign-in pickers.
pub const EPHEMERAL_UI_SELECTORS: &[&str] = &[
    "dialog",
    "[role=\"dialog\"]",
    "[role=\"alertdialog\"]",
    "[aria-modal=\"true\"]",
    // OneTrust
    "#onetrust-consent-sdk",
    "#onetrust-banner-sdk",
    // Cookiebot
    "#CybotCookiebotDialog",
    "#CybotCookiebotDialogBodyUnderlay",
    // cookieconsent (Osano)
    ".cc-window",
    ".cc-banner",
    ".cookieconsent",
    // Usercentrics
    "#usercentrics-root",
    // Google Funding Choices
    ".fc-consent-root",
    // generic
    "#cookie-banner",
    ".cookie-banner",
    "#cookie-consent",
    ".cookie-consent",
    "#cookie-notice",
    ".cookie-notice",
    // Google Identity Services
    "#credential_picker_container",
    "#credential_picker_iframe",
    "#g_id_onload",
];

type Handlers<'h> = Vec<(Cow<'static, Selector>, ElementContentHandlers<'h>)>;

fn run(html: &str, handlers: Handlers<'_>) -> Result<String, SanitizeError> {
    Ok(rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::new()
        },
    )?)
}

fn remove_all(selectors: &[&str]) -> Result<Handlers<'static>, SanitizeError> {
    selectors
        .iter()
        .map(|selector| {
            // Validate up front so a bad selector is a typed error, not a panic.
            selector
                .parse::<Selector>()
                .map_err(|e| SanitizeError::Rewrite(format!("selector {selector:?}: {e}")))?;
            Ok(element!(selector, |el| {
                el.remove();
                Ok(())
            }))
        })
        .collect()
}

/// Every `src` of an `<img>`, in document order.
pub(crate) fn collect_image_sources(html: &str) -> Result<Vec<String>, SanitizeError> {
    let mut sources = Vec::new();
    run(
        html,
        vec![element!("img[src]", |el| {
            if let Some(src) = el.get_attribute("src") {
                sources.push(src);
            }
            Ok(())
        })],
    )?;
    Ok(sources)
}

/// Pass 1 (rewrite half): swap `src` for its embedded form and drop
/// `srcset`, for every image in `inlined` (keyed by original `src`).
pub(crate) fn inline_images(html: &str, inlined: &HashMap<String, String>) -> Result<String, SanitizeError> {
    if inlined.is_empty() {
        return Ok(html.to_string());
    }
    run(
        html,
        vec![element!("img[src]", |el| {
            let Some(src) = el.get_attribute("src") else {
                return Ok(());
            };
            if let Some(data) = inlined.get(&src) {
                el.set_attribute("src", data)?;
                el.remove_attribute("srcset");
            }
            Ok(())
        })],
    )
}

/// Pass 2: delete active content and fetch-triggering hints.
pub(crate) fn remove_active_content(html: &str) -> Result<String, SanitizeError> {
    let mut handlers = remove_all(ACTIVE_ELEMENTS)?;
    handlers.push(element!("link[rel]", |el| {
        if has_token(el, "rel", FETCHING_LINK_RELS) {
            el.remove();
        }
        Ok(())
    }));
    handlers.push(element!("meta[http-equiv]", |el| {
        let value = el
            .get_attribute("http-equiv")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if BLOCKED_HTTP_EQUIV.contains(&value.as_str()) {
            el.remove();
        }
        Ok(())
    }));
    run(html, handlers)
}

/// Pass 3: strip `on*` handlers and `javascript:` URLs from every element.
pub(crate) fn strip_event_handlers(html: &str) -> Result<String, SanitizeError> {
    run(
        html,
        vec![element!("*", |el| {
            let doomed: Vec<String> = el
                .attributes()
                .iter()
                .filter(|attr| {
                    let name = attr.name();
                    is_event_handler(&name)
                        || (URL_ATTRIBUTES.contains(&name.as_str()) && is_script_url(&attr.value()))
                })
                .map(|attr| attr.name())
                .collect();
            for name in doomed {
                el.remove_attribute(&name);
            }
            Ok(())
        })],
    )
}

/// Pass 4: delete transient overlays.
pub(crate) fn remove_ephemeral_ui(html: &str) -> Result<String, SanitizeError> {
    run(html, remove_all(EPHEMERAL_UI_SELECTORS)?)
}

fn has_token(el: &Element<'_, '_>, attr: &str, tokens: &[&str]) -> bool {
    el.get_attribute(attr)
        .map(|value| {
            value
                .to_ascii_lowercase()
                .split_ascii_whitespace()
                .any(|t| tokens.contains(&t))
        })
        .unwrap_or(false)
}

fn is_event_handler(name: &str) -> bool {
    name.len() > 2 && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("on"))
}

/// Browsers ignore ASCII whitespace and control characters inside the
/// scheme, so `java\tscript:` must match too.
fn is_script_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .take(11)
        .collect();
    compact.eq_ignore_ascii_case("javascript:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_content_removed() {
        let html = r#"<html><head>
<script src="a.js"></script>
<link rel="stylesheet" href="s.css">
<link rel="Preload" href="f.woff2" as="font">
<link rel="manifest" href="/m.json">
<meta http-equiv="Content-Security-Policy" content="default-src 'self'">
<meta http-equiv="refresh" content="5">
<meta charset="utf-8">
</head><body><iframe src="x"></iframe><object data="y"></object><embed src="z"><p>keep</p></body></html>"#;
        let out = remove_active_content(html).unwrap();
        assert!(!out.contains("<script"));
        assert!(!out.contains("<iframe"));
        assert!(!out.contains("<object"));
        assert!(!out.contains("<embed"));
        assert!(!out.contains("Preload"));
        assert!(!out.contains("manifest"));
        assert!(!out.contains("http-equiv"));
        assert!(out.contains(r#"<link rel="stylesheet" href="s.css">"#));
        assert!(out.contains(r#"<meta charset="utf-8">"#));
        assert!(out.contains("<p>keep</p>"));
    }

    #[test]
    fn event_handlers_and_script_urls_stripped() {
        let html = r#"<body onload="x()"><a href="javascript:alert(1)" onclick="y()">a</a><a href=" JavaScript:1">b</a><a href="/ok">c</a><img src="p.png" onerror="z()"></body>"#;
        let out = strip_event_handlers(html).unwrap();
        assert!(!out.contains("onload"));
        assert!(!out.contains("onclick"));
        assert!(!out.contains("onerror"));
        assert!(!out.to_ascii_lowercase().contains("javascript:"));
        assert!(out.contains(r#"<a href="/ok">c</a>"#));
        assert!(out.contains(r#"src="p.png""#));
    }

    #[test]
    fn script_url_detection() {
        assert!(is_script_url("javascript:void(0)"));
        assert!(is_script_url("  JAVASCRIPT:x"));
        assert!(is_script_url("java\tscript:x"));
        assert!(!is_script_url("https://example.com/javascript:"));
        assert!(!is_script_url("/javascript"));
    }

    #[test]
    fn event_handler_names() {
        assert!(is_event_handler("onclick"));
        assert!(is_event_handler("ONLOAD"));
        assert!(!is_event_handler("on"));
        assert!(!is_event_handler("o"));
        assert!(!is_event_handler("class"));
    }

    #[test]
    fn ephemeral_ui_removed() {
        let html = r#"<body><main>article</main>
<dialog open>modal</dialog>
<div role="dialog">signup</div>
<div id="onetrust-consent-sdk"><p>cookies?</p></div>
<div class="banner cookie-banner">we use cookies</div>
<div id="credential_picker_container"><iframe></iframe></div>
<div aria-modal="true">overlay</div>
</body>"#;
        let out = remove_ephemeral_ui(html).unwrap();
        assert!(out.contains("<main>article</main>"));
        for gone in ["modal", "signup", "cookies?", "we use cookies", "credential_picker", "overlay"] {
            assert!(!out.contains(gone), "{gone} survived: {out}");
        }
    }

    #[test]
    fn collect_and_inline_images() {
        let html = r#"<img src="a.png" srcset="a2.png 2x"><img src="b.png"><img alt="none">"#;
        assert_eq!(collect_image_sources(html).unwrap(), vec!["a.png", "b.png"]);

        let mut inlined = HashMap::new();
        inlined.insert("a.png".to_string(), "data:image/png;base64,AAAA".to_string());
        let out = inline_images(html, &inlined).unwrap();
        assert!(out.contains(r#"src="data:image/png;base64,AAAA""#));
        assert!(!out.contains("srcset"));
        assert!(out.contains(r#"<img src="b.png">"#));
    }

    #[test]
    fn untouched_markup_is_byte_identical() {
        let html = "<!DOCTYPE html>\n<html><head><title>T</title></head><body class='x'  id=y>text &amp; more</body></html>";
        assert_eq!(remove_active_content(html).unwrap(), html);
        assert_eq!(strip_event_handlers(html).unwrap(), html);
        assert_eq!(remove_ephemeral_ui(html).unwrap(), html);
    }
}
