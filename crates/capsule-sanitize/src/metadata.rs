//! Title and description extraction.

use std::cell::RefCell;

use lol_html::{element, rewrite_str, text, RewriteStrSettings};

use crate::error::SanitizeError;

/// Best-effort document metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Text of the first `<title>`, whitespace-collapsed.
    pub title: Option<String>,
    /// `content` of `<meta name="description">`.
    pub description: Option<String>,
}

#[derive(Default)]
struct TitleState {
    seen: usize,
    text: String,
}

/// Extract metadata from a document.
pub fn extract_metadata(html: &str) -> Result<DocumentMetadata, SanitizeError> {
    let title = RefCell::new(TitleState::default());
    let mut description = None;

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("title", |_| {
                    title.borrow_mut().seen += 1;
                    Ok(())
                }),
                text!("title", |chunk| {
                    let mut state = title.borrow_mut();
                    if state.seen == 1 {
                        state.text.push_str(chunk.as_str());
                    }
                    Ok(())
                }),
                element!("meta[name][content]", |el| {
                    let is_description = el
                        .get_attribute("name")
                        .is_some_and(|n| n.trim().eq_ignore_ascii_case("description"));
                    if is_description && description.is_none() {
                        description = el.get_attribute("content");
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::new()
        },
    )?;

    let title = title.into_inner().text;
    Ok(DocumentMetadata {
        title: clean(&title),
        description: description.as_deref().and_then(clean),
    })
}

/// Decode entities, collapse whitespace, drop if blank.
fn clean(raw: &str) -> Option<String> {
    let decoded = decode_entities(raw);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Decode the named entities that show up in titles plus numeric
/// references. Anything unrecognised is kept literally.
fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_one(&rest[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_one(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
