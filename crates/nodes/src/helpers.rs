//! Helper function library.
//!
//! Rendered operator code may call a fixed set of statically named helpers.
//! Their definitions are emitted into batched operator fragments as source
//! text. Blocklist patterns the helpers receive are compiled here first, so
//! an invalid pattern fails compilation instead of the generated workflow.

use regex::Regex;
use serde::Serialize;

/// The helpers rendered code may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelperFunction {
    /// Drops items whose name matches any blocklist pattern.
    FilterWithBlocklist,
    /// Groups a sequence into consecutive fixed-size chunks.
    GroupedList,
}

impl HelperFunction {
    /// Every helper, in emission order.
    pub const ALL: [HelperFunction; 2] = [Self::FilterWithBlocklist, Self::GroupedList];

    /// Function name as it appears in emitted code.
    pub fn name(self) -> &'static str {
        match self {
            Self::FilterWithBlocklist => "generator_helper_filter_with_blocklist",
            Self::GroupedList => "generator_helper_grouped_list",
        }
    }

    /// Definition emitted into operator fragments.
    pub fn source(self) -> &'static str {
        match self {
            Self::FilterWithBlocklist => FILTER_WITH_BLOCKLIST_SOURCE,
            Self::GroupedList => GROUPED_LIST_SOURCE,
        }
    }
}

const FILTER_WITH_BLOCKLIST_SOURCE: &str = "\
def generator_helper_filter_with_blocklist(items, item_name_builder, blocklist):
    import re
    patterns = [re.compile(pattern) for pattern in blocklist]
    return [
        item for (index, item) in enumerate(items)
        if not any(pattern.match(item_name_builder(index, item)) for pattern in patterns)
    ]
";

const GROUPED_LIST_SOURCE: &str = "\
def generator_helper_grouped_list(items, batch_size):
    items = list(items)
    return [items[start:start + batch_size] for start in range(0, len(items), batch_size)]
";

/// Name and source of one helper, as handed to templates.
#[derive(Debug, Clone, Serialize)]
pub struct HelperView {
    pub name: &'static str,
    pub source: &'static str,
}

/// Template view of the whole library.
pub fn helper_views() -> Vec<HelperView> {
    HelperFunction::ALL
        .iter()
        .map(|helper| HelperView {
            name: helper.name(),
            source: helper.source(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Blocklist
// ---------------------------------------------------------------------------

/// Blocklist patterns, validated at node construction.
///
/// Emitted code matches each pattern at the start of an item name
/// (`re.match`).
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    patterns: Vec<Regex>,
}

impl Blocklist {
    /// Compiles `patterns`. On failure returns the index of the first invalid
    /// pattern together with the regex error.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, (usize, regex::Error)> {
        let patterns = patterns
            .iter()
            .enumerate()
            .map(|(index, pattern)| Regex::new(pattern.as_ref()).map_err(|err| (index, err)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Source text of each pattern, in declaration order.
    pub fn patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(Regex::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_sources_define_their_names() {
        for helper in HelperFunction::ALL {
            assert!(helper
                .source()
                .starts_with(&format!("def {}(", helper.name())));
        }
    }

    #[test]
    fn invalid_pattern_reports_its_index() {
        let (index, _) = Blocklist::new(&["ok", "("]).unwrap_err();
        assert_eq!(index, 1);
    }

    #[test]
    fn patterns_keep_declaration_order() {
        let blocklist = Blocklist::new(&["tmp_", "b$"]).unwrap();
        assert_eq!(blocklist.patterns(), vec!["tmp_", "b$"]);
        assert!(Blocklist::default().patterns().is_empty());
    }
}
