use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;

/// Key-value data a node contributes to every option beneath it.
pub type Payload = serde_json::Map<String, JsonValue>;

/// One node of the structured-input tree. A node with a non-empty `choices`
/// list is a branch; anything else is a leaf and becomes one submittable option.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ConfigNode {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub kv: Option<Payload>,
    #[serde(default)]
    pub choices: Option<Vec<ConfigNode>>,
}

impl ConfigNode {
    pub fn is_leaf(&self) -> bool {
        self.choices.as_ref().map(|c| c.is_empty()).unwrap_or(true)
    }

    pub fn leaf_count(&self) -> usize {
        match &self.choices {
            Some(children) if !children.is_empty() => {
                children.iter().map(ConfigNode::leaf_count).sum()
            }
            _ => 1,
        }
    }

    /// The widget only renders once the host has supplied a tree with `choices`.
    pub fn has_choices(&self) -> bool {
        self.choices.is_some()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PageConfig {
    #[serde(default = "default_server")]
    pub server: String,
    pub botname: String,
    #[serde(default = "default_featured")]
    pub featured: Vec<String>,
    #[serde(default)]
    pub structured_input: Option<ConfigNode>,
    // JSON file with the tree, as the server emits it for the element's `config`
    #[serde(default)]
    pub structured_input_path: Option<String>,
    #[serde(default)]
    pub history_path: Option<String>,
    #[serde(default)]
    pub label_separator: Option<String>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            botname: String::new(),
            featured: default_featured(),
            structured_input: None,
            structured_input_path: None,
            history_path: None,
            label_separator: None,
        }
    }
}

impl PageConfig {
    pub fn separator(&self) -> &str {
        self.label_separator.as_deref().unwrap_or(" + ")
    }

    pub fn history_path(&self) -> &str {
        self.history_path.as_deref().unwrap_or("history/recent")
    }
}

fn default_server() -> String {
    "http://localhost:9048/diary/".to_string()
}

fn default_featured() -> Vec<String> {
    vec!["dose".to_string(), "activity".to_string()]
}

pub(crate) fn validate_page_config(cfg: &PageConfig) -> Result<(), String> {
    if cfg.botname.trim().is_empty() {
        return Err("botname must not be empty".to_string());
    }
    if cfg.botname.contains('/') {
        return Err(format!("botname '{}' must be a single path segment", cfg.botname));
    }
    let Some(root) = &cfg.structured_input else {
        return Ok(());
    };
    check_scalars(root, "structured_input")
}

/// Leaves whose merged payloads are identical submit indistinguishable entries.
/// The tree is still usable, so these are reported rather than rejected.
pub(crate) fn duplicate_payload_warnings(root: &ConfigNode) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for choice in crate::nav::flatten::flatten(root) {
        // serde_json::Map without preserve_order is sorted, so the text is canonical
        let canon = JsonValue::Object(choice.kv.clone()).to_string();
        if !seen.insert(canon.clone()) {
            out.push(format!(
                "multiple leaf nodes have kv {canon} (labels: {})",
                choice.labels.join(" / ")
            ));
        }
    }
    out
}

fn check_scalars(node: &ConfigNode, at: &str) -> Result<(), String> {
    if let Some(kv) = &node.kv {
        for (k, v) in kv {
            if v.is_array() || v.is_object() {
                return Err(format!("{at}.kv.{k} must be a scalar, got {v}"));
            }
        }
    }
    if let Some(children) = &node.choices {
        for (i, child) in children.iter().enumerate() {
            check_scalars(child, &format!("{at}.choices[{i}]"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(v: JsonValue) -> ConfigNode {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn missing_fields_deserialize_as_absent() {
        let n = node(json!({}));
        assert!(n.label.is_none());
        assert!(n.kv.is_none());
        assert!(n.is_leaf());
        assert!(!n.has_choices());
    }

    #[test]
    fn empty_choices_is_a_leaf() {
        let n = node(json!({"label": "x", "choices": []}));
        assert!(n.is_leaf());
        assert!(n.has_choices());
        assert_eq!(n.leaf_count(), 1);
    }

    #[test]
    fn leaf_count_walks_nested_branches() {
        let n = node(json!({"choices": [
            {"label": "dose", "choices": [{"label": "5mg"}, {"label": "10mg"}]},
            {"label": "sleep"}
        ]}));
        assert_eq!(n.leaf_count(), 3);
    }

    #[test]
    fn page_config_defaults_from_yaml() {
        let cfg: PageConfig = serde_yaml::from_str("botname: bot1\n").unwrap();
        assert_eq!(cfg.featured, vec!["dose", "activity"]);
        assert_eq!(cfg.separator(), " + ");
        assert_eq!(cfg.history_path(), "history/recent");
        assert!(cfg.structured_input.is_none());
    }

    #[test]
    fn duplicate_leaf_payloads_are_reported() {
        let root = node(json!({"choices": [
            {"label": "a", "kv": {"k": "same"}},
            {"label": "b", "kv": {"k": "same"}},
            {"label": "c", "kv": {"k": "other"}}
        ]}));
        let warnings = duplicate_payload_warnings(&root);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("multiple leaf nodes"));
        assert!(warnings[0].contains("labels: b"));
    }

    #[test]
    fn validate_rejects_nested_kv_values() {
        let cfg = PageConfig {
            botname: "bot1".into(),
            structured_input: Some(node(json!({"choices": [
                {"label": "a", "kv": {"k": {"nested": 1}}}
            ]}))),
            ..Default::default()
        };
        let err = validate_page_config(&cfg).unwrap_err();
        assert!(err.contains("choices[0].kv.k"));
    }

    #[test]
    fn validate_requires_botname() {
        let err = validate_page_config(&PageConfig::default()).unwrap_err();
        assert!(err.contains("botname"));
    }
}
