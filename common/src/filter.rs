//! Substring filters for address and hostname lines.

/// A line passes when the filter set is empty or when it contains at least
/// one of the filter strings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineFilter {
    needles: Vec<String>,
}

impl LineFilter {
    pub fn new<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            needles: needles
                .into_iter()
                .map(Into::into)
                .filter(|n: &String| !n.is_empty())
                .collect(),
        }
    }

    /// Builds a filter from a comma-separated flag value.
    pub fn from_flag(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::trim))
    }

    pub fn passes(&self, line: &str) -> bool {
        self.needles.is_empty() || self.needles.iter().any(|n| line.contains(n.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.needles.is_empty()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_passes_everything() {
        let filter = LineFilter::default();
        assert!(filter.passes("10.0.0.1"));
        assert!(filter.passes(""));
        assert!(filter.is_empty());
    }

    #[test]
    fn non_empty_filter_requires_a_substring() {
        let filter = LineFilter::new(["dev", "stage"]);
        assert!(filter.passes("dev.example.com"));
        assert!(filter.passes("api.stage.example.com"));
        assert!(!filter.passes("www.example.com"));
    }

    #[test]
    fn from_flag_ignores_blank_entries() {
        let filter = LineFilter::from_flag("10.0., ,");
        assert_eq!(filter, LineFilter::new(["10.0."]));
        assert!(filter.passes("10.0.3.4"));
        assert!(!filter.passes("192.168.0.1"));

        assert!(LineFilter::from_flag("").is_empty());
    }
}
