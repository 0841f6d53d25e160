//! Workflow template model and per-job customization.
//!
//! A template file is a JSON object with a `nodes` array and an
//! optional `description`.  Node `type` tags are modeled as a closed
//! enum with an explicit passthrough case so unrecognized kinds survive
//! a load/customize/save cycle untouched.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node kind tag.
///
/// `text` and `image` nodes receive per-job input substitution; every
/// other tag is carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Receives the user prompt in `inputs.text`.
    #[serde(rename = "text")]
    Text,
    /// Receives the base64-encoded input image in `inputs.image`.
    #[serde(rename = "image")]
    Image,
    /// Any other tag; never touched by customization.
    #[serde(untagged)]
    Other(String),
}

/// One node of a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Kind tag (`"type"` in the file format).
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Named node inputs.
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// Any additional node fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named job graph as loaded from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered node list.
    pub nodes: Vec<Node>,
    /// Any additional top-level fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkflowTemplate {
    /// Build the per-job graph for one request.
    ///
    /// Clones the template, then sets `inputs.text` on every [`NodeKind::Text`]
    /// node and `inputs.image` (base64) on every [`NodeKind::Image`] node
    /// when an input image was supplied.  No validation that any such
    /// node exists -- a template without them simply runs unchanged.
    pub fn customize(&self, prompt: &str, input_image: Option<&[u8]>) -> WorkflowTemplate {
        let mut job = self.clone();

        for node in &mut job.nodes {
            match node.kind {
                NodeKind::Text => {
                    node.inputs
                        .insert("text".to_owned(), Value::String(prompt.to_owned()));
                }
                NodeKind::Image => {
                    if let Some(bytes) = input_image {
                        node.inputs
                            .insert("image".to_owned(), Value::String(BASE64.encode(bytes)));
                    }
                }
                NodeKind::Other(_) => {}
            }
        }

        job
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The template description, if the file carried one.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template(value: Value) -> WorkflowTemplate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn prompt_lands_in_text_nodes() {
        let t = template(json!({
            "nodes": [{"type": "text", "inputs": {"text": ""}}]
        }));

        let job = t.customize("a cat", None);
        assert_eq!(job.nodes[0].inputs["text"], "a cat");
    }

    #[test]
    fn input_image_lands_base64_in_image_nodes() {
        let t = template(json!({
            "nodes": [{"type": "image", "inputs": {}}]
        }));

        let job = t.customize("ignored", Some(&[1u8, 2, 3]));
        assert_eq!(job.nodes[0].inputs["image"], BASE64.encode([1u8, 2, 3]));
    }

    #[test]
    fn image_nodes_untouched_without_input_image() {
        let t = template(json!({
            "nodes": [{"type": "image", "inputs": {"image": "placeholder"}}]
        }));

        let job = t.customize("a cat", None);
        assert_eq!(job.nodes[0].inputs["image"], "placeholder");
    }

    #[test]
    fn other_nodes_pass_through_untouched() {
        let t = template(json!({
            "nodes": [
                {"type": "sampler", "inputs": {"steps": 20}},
                {"type": "text", "inputs": {"text": ""}}
            ]
        }));

        let job = t.customize("a cat", Some(&[9u8]));
        assert_eq!(job.nodes[0].kind, NodeKind::Other("sampler".to_owned()));
        assert_eq!(job.nodes[0].inputs["steps"], 20);
        assert_eq!(job.nodes[1].inputs["text"], "a cat");
    }

    #[test]
    fn customization_is_idempotent_across_copies() {
        let t = template(json!({
            "nodes": [
                {"type": "text", "inputs": {"text": "old"}},
                {"type": "image", "inputs": {}}
            ]
        }));

        let first = t.customize("same prompt", Some(&[7u8, 8]));
        let second = t.customize("same prompt", Some(&[7u8, 8]));
        assert_eq!(first, second);
    }

    #[test]
    fn source_template_is_never_mutated() {
        let t = template(json!({
            "nodes": [{"type": "text", "inputs": {"text": "original"}}]
        }));
        let before = t.clone();

        let _ = t.customize("replacement", None);
        assert_eq!(t, before);
    }

    #[test]
    fn unknown_fields_round_trip() {
        let raw = json!({
            "description": "fancy",
            "version": 3,
            "nodes": [
                {"type": "text", "inputs": {"text": ""}, "id": "n1"},
                {"type": "latent", "inputs": {}, "size": [512, 512]}
            ]
        });

        let t = template(raw.clone());
        assert_eq!(serde_json::to_value(&t).unwrap(), raw);
    }
}
