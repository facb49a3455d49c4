//! URL slugs for products and categories.

/// Maximum slug length.
pub const MAX_LENGTH: usize = 120;

/// Turn a display name into a URL slug.
///
/// ASCII letters and digits are kept (lower-cased); every other run of
/// characters collapses into a single hyphen. Leading and trailing hyphens
/// are dropped and the result is capped at [`MAX_LENGTH`].
///
/// ```
/// use emporium_core::slug::slugify;
///
/// assert_eq!(slugify("Walnut Desk Organizer (Large)"), "walnut-desk-organizer-large");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
        if slug.len() >= MAX_LENGTH {
            break;
        }
    }

    slug.truncate(MAX_LENGTH);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Whether `s` is already a well-formed slug.
#[must_use]
pub fn is_valid(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_LENGTH
        && !s.starts_with('-')
        && !s.ends_with('-')
        && !s.contains("--")
        && s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  Hello,   World!  "), "hello-world");
        assert_eq!(slugify("USB-C -- Cable 2m"), "usb-c-cable-2m");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("Café Crème 100%"), "caf-cr-me-100");
        assert_eq!(slugify("★★★"), "");
    }

    #[test]
    fn test_slugify_caps_length() {
        let slug = slugify(&"ab ".repeat(100));
        assert!(slug.len() <= MAX_LENGTH);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid("walnut-desk-2"));
        assert!(!is_valid("Walnut"));
        assert!(!is_valid("-lead"));
        assert!(!is_valid("double--hyphen"));
        assert!(!is_valid(""));
    }
}
