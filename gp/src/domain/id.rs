//! Domain ID generation
//!
//! All IDs use the format: `{8-char-hex}-{kind}-{slug}`
//! Example: `5f2a91c0-work-pricing-research`

/// Longest slug kept in an ID
const MAX_SLUG_LEN: usize = 40;

/// Generate a domain ID from a kind and a human-readable title
///
/// The hex prefix comes from the random tail of a UUID v7, so IDs minted in
/// the same millisecond for the same title still differ.
pub fn generate_id(kind: &str, title: &str) -> String {
    let uuid = uuid::Uuid::now_v7().simple().to_string();
    let hex = &uuid[uuid.len() - 8..];
    let slug = slugify(title);
    if slug.is_empty() {
        format!("{}-{}", hex, kind)
    } else {
        format!("{}-{}-{}", hex, kind, slug)
    }
}

/// Slugify a title for use in IDs
fn slugify(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .chars()
        // Strip apostrophes entirely, replace other non-alphanumeric with hyphens
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' || c == '\u{2018}' {
                None
            } else {
                Some('-')
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.len() <= MAX_SLUG_LEN {
        return slug;
    }
    slug[..MAX_SLUG_LEN].trim_end_matches('-').to_string()
}
