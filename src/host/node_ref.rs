//! Host-side description of a node, before it enters the registry.
//!
//! A [`HostNodeRef`] is what a host adapter hands over: identity, whatever
//! metadata the host could read, and the nested children. Missing metadata is
//! resolved with fixed fallbacks so the registry never sees an unnamed node.

use serde::{Deserialize, Serialize};
use treewatch_types::UpdateStrategy;

/// Selector used when neither a selector nor a type name is known.
pub const UNKNOWN_SELECTOR: &str = "<unknown>";

/// Name used when neither a name nor a type name is known.
pub const UNKNOWN_NAME: &str = "Unknown";

/// A node reference as supplied by the host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HostNodeRef {
    /// Stable identity. Must not change across scans for the same logical node.
    pub id: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Type/class name of the node, used to derive missing metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    /// Host selector (e.g. the element tag).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Update strategy, if the host exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_strategy: Option<UpdateStrategy>,

    /// Nested children in host order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HostNodeRef>,
}

impl HostNodeRef {
    /// Create a reference with only an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn strategy(mut self, strategy: UpdateStrategy) -> Self {
        self.update_strategy = Some(strategy);
        self
    }

    /// Append one child.
    pub fn child(mut self, child: HostNodeRef) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children, keeping their order.
    pub fn children(mut self, children: impl IntoIterator<Item = HostNodeRef>) -> Self {
        self.children.extend(children);
        self
    }

    /// Display name: the host name, else the type name, else [`UNKNOWN_NAME`].
    pub fn resolved_name(&self) -> String {
        non_empty(&self.name)
            .or_else(|| non_empty(&self.type_name))
            .unwrap_or(UNKNOWN_NAME)
            .to_string()
    }

    /// Selector: the host selector, else `<kebab-type-name>`, else [`UNKNOWN_SELECTOR`].
    pub fn resolved_selector(&self) -> String {
        if let Some(selector) = non_empty(&self.selector) {
            return selector.to_string();
        }

        match non_empty(&self.type_name).or_else(|| non_empty(&self.name)) {
            Some(type_name) => format!("<{}>", kebab_case(type_name)),
            None => UNKNOWN_SELECTOR.to_string(),
        }
    }

    pub fn resolved_strategy(&self) -> UpdateStrategy {
        self.update_strategy.unwrap_or_default()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(HostNodeRef::subtree_len).sum::<usize>()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Convert `CamelCase` to `kebab-case`.
///
/// Acronym runs stay together: `HTTPClientPanel` becomes `http-client-panel`.
pub fn kebab_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !out.ends_with('-') {
                out.push('-');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kebab_case_simple() {
        assert_eq!(kebab_case("CounterWidget"), "counter-widget");
        assert_eq!(kebab_case("App"), "app");
        assert_eq!(kebab_case("userList2Card"), "user-list2-card");
    }

    #[test]
    fn kebab_case_keeps_acronyms_together() {
        assert_eq!(kebab_case("HTTPClientPanel"), "http-client-panel");
    }

    #[test]
    fn resolved_selector_prefers_host_value() {
        let node = HostNodeRef::new("1").selector("app-root").type_name("AppRoot");
        assert_eq!(node.resolved_selector(), "app-root");
    }

    #[test]
    fn resolved_selector_falls_back_to_type_name() {
        let node = HostNodeRef::new("1").type_name("StatsCard");
        assert_eq!(node.resolved_selector(), "<stats-card>");
        assert_eq!(node.resolved_name(), "StatsCard");
    }

    #[test]
    fn empty_name_falls_back_like_selector() {
        let node = HostNodeRef::new("x").name("").type_name("CounterWidget");
        assert_eq!(node.resolved_name(), "CounterWidget");
        assert_eq!(node.resolved_selector(), "<counter-widget>");

        let node = HostNodeRef::new("y").type_name("").name("Sidebar").selector("");
        assert_eq!(node.resolved_name(), "Sidebar");
        assert_eq!(node.resolved_selector(), "<sidebar>");
    }

    #[test]
    fn resolved_metadata_without_anything() {
        let node = HostNodeRef::new("1");
        assert_eq!(node.resolved_selector(), UNKNOWN_SELECTOR);
        assert_eq!(node.resolved_name(), UNKNOWN_NAME);
        assert_eq!(node.resolved_strategy(), UpdateStrategy::Eager);
    }

    #[test]
    fn subtree_len_counts_descendants() {
        let tree = HostNodeRef::new("a")
            .child(HostNodeRef::new("b").child(HostNodeRef::new("d")))
            .child(HostNodeRef::new("c"));
        assert_eq!(tree.subtree_len(), 4);
    }

    #[test]
    fn test_deserialize_host_tree() {
        let json = r#"[
            {
                "id": "root",
                "type_name": "AppRoot",
                "update_strategy": "lazy",
                "children": [ { "id": "child", "name": "Child" } ]
            }
        ]"#;

        let roots: Vec<HostNodeRef> = serde_json::from_str(json).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].resolved_strategy(), UpdateStrategy::Lazy);
        assert_eq!(roots[0].children[0].resolved_selector(), "<child>");
    }
}
