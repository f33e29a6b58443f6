//! Page lists embedded in signing-page markup
//!
//! Each document link carries its rendered pages as a list literal in a
//! `data-urls` attribute. Server templates emit it with single quotes
//! (`['/static/doc/page_1.png', '/static/doc/page_2.png']`), so both that
//! form and strict JSON are accepted.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("data-urls attribute is blank")]
    BlankAttribute,

    #[error("Invalid page list: {0}")]
    Malformed(String),

    #[error("Page {0} has an empty URL")]
    BlankUrl(usize),
}

/// Parse a `data-urls` attribute into ordered page identifiers
pub fn parse_page_urls(raw: &str) -> Result<Vec<String>, ParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ParseError::BlankAttribute);
    }

    let urls: Vec<String> = match serde_json::from_str(raw) {
        Ok(urls) => urls,
        Err(_) => serde_json::from_str(&raw.replace('\'', "\""))
            .map_err(|e| ParseError::Malformed(e.to_string()))?,
    };

    if let Some(blank) = urls.iter().position(|u| u.trim().is_empty()) {
        return Err(ParseError::BlankUrl(blank));
    }

    Ok(urls)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn single_quoted_lists_parse_in_order(
            names in prop::collection::vec("[a-z0-9_]{1,12}", 0..8)
        ) {
            let urls: Vec<String> = names.iter().map(|n| format!("/static/{}.png", n)).collect();
            let raw = format!(
                "[{}]",
                urls.iter().map(|u| format!("'{}'", u)).collect::<Vec<_>>().join(", ")
            );
            prop_assert_eq!(parse_page_urls(&raw).unwrap(), urls);
        }
    }
}
