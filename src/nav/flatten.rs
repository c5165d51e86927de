use crate::model::{ConfigNode, Payload};

/// A leaf of the structured-input tree, ready to submit: the labels from the
/// root down to the leaf, and the payload merged along that path.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatChoice {
    pub labels: Vec<String>,
    pub kv: Payload,
}

/// Copy `layer` over `base`; keys already in `base` are overwritten.
pub fn overlay(base: &mut Payload, layer: &Payload) {
    for (k, v) in layer {
        base.insert(k.clone(), v.clone());
    }
}

pub fn flatten(root: &ConfigNode) -> Vec<FlatChoice> {
    fn walk(out: &mut Vec<FlatChoice>, node: &ConfigNode, labels: &[String], kv: &Payload) {
        let mut merged = kv.clone();
        if let Some(own) = &node.kv {
            overlay(&mut merged, own);
        }
        let mut path = labels.to_vec();
        if let Some(label) = node.label.as_deref().filter(|l| !l.is_empty()) {
            path.push(label.to_string());
        }
        if node.is_leaf() {
            out.push(FlatChoice {
                labels: path,
                kv: merged,
            });
            return;
        }
        for child in node.choices.iter().flatten() {
            walk(out, child, &path, &merged);
        }
    }

    let mut out = Vec::new();
    walk(&mut out, root, &[], &Payload::new());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value as JsonValue};

    fn node(v: JsonValue) -> ConfigNode {
        serde_json::from_value(v).unwrap()
    }

    fn payload(v: JsonValue) -> Payload {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn flattens_dose_and_sleep_example() {
        let root = node(json!({"choices": [
            {"label": "dose", "kv": {"k": "d"}, "choices": [{"label": "5mg"}, {"label": "10mg"}]},
            {"label": "sleep", "kv": {"k": "s"}}
        ]}));
        let got = flatten(&root);
        assert_eq!(
            got,
            vec![
                FlatChoice {
                    labels: vec!["dose".into(), "5mg".into()],
                    kv: payload(json!({"k": "d"})),
                },
                FlatChoice {
                    labels: vec!["dose".into(), "10mg".into()],
                    kv: payload(json!({"k": "d"})),
                },
                FlatChoice {
                    labels: vec!["sleep".into()],
                    kv: payload(json!({"k": "s"})),
                },
            ]
        );
    }

    #[test]
    fn root_leaf_yields_single_unlabeled_choice() {
        let got = flatten(&node(json!({"kv": {"k": "v"}})));
        assert_eq!(got.len(), 1);
        assert!(got[0].labels.is_empty());
        assert_eq!(got[0].kv, payload(json!({"k": "v"})));
    }

    #[test]
    fn deeper_kv_wins_and_ancestors_accumulate() {
        let root = node(json!({
            "kv": {"a": 1, "b": 1},
            "choices": [{
                "label": "x",
                "kv": {"b": 2, "c": 2},
                "choices": [{"label": "y", "kv": {"c": 3}}]
            }]
        }));
        let got = flatten(&root);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].labels, vec!["x", "y"]);
        assert_eq!(got[0].kv, payload(json!({"a": 1, "b": 2, "c": 3})));
    }

    #[test]
    fn empty_labels_are_skipped() {
        let root = node(json!({"label": "", "choices": [{"label": "only"}, {}]}));
        let got = flatten(&root);
        assert_eq!(got[0].labels, vec!["only"]);
        assert!(got[1].labels.is_empty());
    }

    #[test]
    fn choice_count_matches_leaf_count() {
        let root = node(json!({"choices": [
            {"label": "a", "choices": [
                {"label": "a1"},
                {"label": "a2", "choices": [{"label": "a2x"}, {"label": "a2y"}, {"label": "a2z"}]},
                {"label": "a3", "choices": []}
            ]},
            {"label": "b"},
            {"label": "c", "choices": [{"label": "c1"}]}
        ]}));
        assert_eq!(flatten(&root).len(), root.leaf_count());
        assert_eq!(root.leaf_count(), 7);
    }

    #[test]
    fn branch_label_is_threaded_to_children() {
        let root = node(json!({"label": "top", "choices": [{"label": "leaf"}]}));
        assert_eq!(flatten(&root)[0].labels, vec!["top", "leaf"]);
    }
}
