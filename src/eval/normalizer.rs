/// Canonicalization of tag-key spellings.
///
/// Synonymous keys must compare equal before any set comparison, and the
/// same rules must be applied to predicted keys and to truth keys alike:
/// normalizing only one side is a correctness bug, not a feature.
pub struct KeyNormalizer;

impl KeyNormalizer {
    /// Normalizes a single tag key.
    ///
    /// Rewrite rules, applied in order as substring replacements, then
    /// surrounding whitespace is stripped:
    ///
    /// - `contact:phone` becomes `phone`
    /// - `contact:website` becomes `website`
    ///
    /// The function is pure, total, and idempotent.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagbench::eval::KeyNormalizer;
    ///
    /// assert_eq!(KeyNormalizer::normalize("contact:phone"), "phone");
    /// assert_eq!(KeyNormalizer::normalize("contact:website"), "website");
    /// assert_eq!(KeyNormalizer::normalize("  cuisine  "), "cuisine");
    /// assert_eq!(KeyNormalizer::normalize("opening_hours"), "opening_hours");
    /// ```
    #[must_use]
    pub fn normalize(key: &str) -> String {
        key.replace("contact:phone", "phone")
            .replace("contact:website", "website")
            .trim()
            .to_string()
    }
}
