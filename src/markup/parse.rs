//! HTML fragment parsing with tl.

use super::{Element, Node};
use crate::utils::html::unescape;

/// Parse a fragment into nodes. Input tl rejects becomes a single text node.
pub fn parse(html: &str) -> Vec<Node> {
    let Ok(dom) = tl::parse(html, tl::ParserOptions::default()) else {
        return vec![Node::Text(html.to_owned())];
    };

    let parser = dom.parser();
    dom.children()
        .iter()
        .filter_map(|handle| convert(*handle, parser))
        .collect()
}

fn convert(handle: tl::NodeHandle, parser: &tl::Parser) -> Option<Node> {
    match handle.get(parser)? {
        tl::Node::Tag(tag) => {
            let mut el = Element::new(tag.name().as_utf8_str().to_lowercase());

            for (key, value) in tag.attributes().iter() {
                let key = key.to_lowercase();
                let value = value.map(|v| unescape(&v).into_owned()).unwrap_or_default();
                if el.attr(&key).is_none() {
                    el.attrs.push((key, value));
                }
            }
            // tl keeps attributes in a map with `id` and `class` split out
            let order = attribute_names(&tag.raw().as_utf8_str());
            el.attrs.sort_by_key(|(key, _)| {
                order
                    .iter()
                    .position(|name| name == key)
                    .unwrap_or(usize::MAX)
            });

            for child in tag.children().top().iter() {
                if let Some(node) = convert(*child, parser) {
                    el.children.push(node);
                }
            }
            Some(Node::Element(el))
        }
        tl::Node::Raw(bytes) => {
            let text = bytes.as_utf8_str();
            (!text.is_empty()).then(|| Node::Text(text.into_owned()))
        }
        tl::Node::Comment(bytes) => {
            let raw = bytes.as_utf8_str();
            let inner = raw
                .strip_prefix("<!--")
                .and_then(|s| s.strip_suffix("-->"))
                .unwrap_or(&raw);
            Some(Node::Comment(inner.to_owned()))
        }
    }
}

/// Attribute names of the opening tag at the start of `raw`, lowercased, in
/// source order.
fn attribute_names(raw: &str) -> Vec<String> {
    let bytes = raw.as_bytes();
    let mut names = Vec::new();

    // skip `<` and the tag name
    let mut i = 1;
    while i < bytes.len() && !is_attr_break(bytes[i]) {
        i += 1;
    }

    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] == b'>' {
            break;
        }

        let start = i;
        while i < bytes.len() && !is_attr_break(bytes[i]) && bytes[i] != b'=' {
            i += 1;
        }
        if i == start {
            // stray `=` or quote
            i += 1;
            continue;
        }
        names.push(raw[start..i].to_ascii_lowercase());

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&quote @ (b'"' | b'\'')) => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != quote {
                        i += 1;
                    }
                    i += 1;
                }
                _ => {
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                }
            }
        }
    }
    names
}

fn is_attr_break(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'>' || b == b'/'
}
