/// Turns a title or category name into a lowercase, hyphen-separated
/// URL segment. Deterministic; collision handling is left to the unique
/// index on the slug column.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_hyphen = true;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }

    while out.ends_with('-') {
        out.pop();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Hello World"), "hello-world");
    }

    #[test]
    fn collapses_runs_of_separators() {
        assert_eq!(slugify("Rust --  2024 Edition!"), "rust-2024-edition");
    }

    #[test]
    fn strips_leading_and_trailing_punctuation() {
        assert_eq!(slugify("  ...Tech?  "), "tech");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn keeps_digits() {
        assert_eq!(slugify("Top 10 Posts of 2025"), "top-10-posts-of-2025");
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(slugify("Same Input"), slugify("Same Input"));
    }
}
