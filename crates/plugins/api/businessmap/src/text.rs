//! Cleanup of card text returned by Businessmap.

/// Decode the HTML entities Businessmap escapes and turn `[card:N]`
/// references into markdown links to the card on `base_url`.
///
/// Without a base URL, card references are left as they are.
pub fn clean_text(text: &str, base_url: Option<&str>) -> String {
    let decoded = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");

    match base_url {
        Some(base) => link_card_refs(&decoded, base.trim_end_matches('/')),
        None => decoded,
    }
}

fn link_card_refs(text: &str, base: &str) -> String {
    const OPEN: &str = "[card:";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();

        if digits > 0 && after[digits..].starts_with(']') {
            let id = &after[..digits];
            out.push_str(&format!("[Card #{id}]({base}/view/card/{id})"));
            rest = &after[digits + 1..];
        } else {
            out.push_str(OPEN);
            rest = after;
        }
    }

    out.push_str(rest);
    out
}
