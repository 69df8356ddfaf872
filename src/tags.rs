/// Clean-up for note tags typed on the command line.
///
/// Applied at input time; the store keeps whatever tags it is given. Case is
/// kept, so unlike a slug normalizer this only trims, drops blanks, and
/// removes repeats.
pub struct TagCleaner;

impl TagCleaner {
    /// Trims a tag and collapses runs of whitespace to a single space.
    ///
    /// # Examples
    ///
    /// ```
    /// use lamp::tags::TagCleaner;
    ///
    /// assert_eq!(TagCleaner::clean_tag("  Prayer "), "Prayer");
    /// assert_eq!(TagCleaner::clean_tag("Quiet\t time"), "Quiet time");
    /// assert_eq!(TagCleaner::clean_tag("   "), "");
    /// ```
    #[must_use]
    pub fn clean_tag(tag: &str) -> String {
        tag.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Cleans a list of tags, keeping the first spelling of each
    /// case-insensitive repeat and the original order.
    ///
    /// # Examples
    ///
    /// ```
    /// use lamp::tags::TagCleaner;
    ///
    /// let tags = TagCleaner::clean_tags(["Prayer", " prayer", "", "Praise"]);
    /// assert_eq!(tags, vec!["Prayer", "Praise"]);
    /// ```
    #[must_use]
    pub fn clean_tags<I, S>(tags: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = std::collections::HashSet::new();
        let mut result = Vec::new();

        for tag in tags {
            let cleaned = Self::clean_tag(tag.as_ref());
            if cleaned.is_empty() {
                continue;
            }
            if seen.insert(cleaned.to_lowercase()) {
                result.push(cleaned);
            }
        }

        result
    }
}
