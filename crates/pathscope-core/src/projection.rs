//! Visual projection of backend records into renderer nodes and edges.

use pathscope_protocol::kinds::{self, rel};
use pathscope_protocol::{Node, Relationship};
use serde::{Deserialize, Serialize};

use crate::config::ProjectionConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub weight: u32,
}

/// Icon file per kind; the first kind the node carries wins.
const ICONS: &[(&[&str], &str)] = &[
    (&[kinds::AWS_ACCOUNT], "account_icon.svg"),
    (&[kinds::AWS_ROLE], "role_icon.svg"),
    (&[kinds::AWS_USER], "user_icon.svg"),
    (&[kinds::AWS_GROUP], "group_icon.svg"),
    (
        &[kinds::AWS_MANAGED_POLICY, kinds::AWS_INLINE_POLICY],
        "policy_icon.svg",
    ),
    (&[kinds::AWS_POLICY_DOCUMENT], "policy_document_icon.svg"),
    (&[kinds::AWS_STATEMENT], "statement_icon.svg"),
    (&[kinds::AWS_ASSUME_ROLE_POLICY], "assume_role_policy_icon.svg"),
    (&[kinds::AWS_RESOURCE_TYPE], "resource_type_icon.svg"),
    (&[kinds::AWS_RESOURCE_BLOB], "resource_blob_icon.svg"),
    (&[kinds::AWS_ACTION_BLOB], "action_blob_icon.svg"),
    (&[kinds::AWS_CONDITION], "condition_icon.svg"),
    (&[kinds::UNIQUE_ARN], "resource_icon.svg"),
];

/// Label property per kind, checked in order.
const LABEL_PROPERTIES: &[(&str, &str)] = &[
    (kinds::AWS_ACCOUNT, "account_id"),
    (kinds::AWS_ROLE, "rolename"),
    (kinds::AWS_USER, "name"),
    (kinds::AWS_GROUP, "name"),
    (kinds::AWS_MANAGED_POLICY, "policyname"),
    (kinds::UNIQUE_ARN, "arn"),
    (kinds::UNIQUE_NAME, "name"),
    (kinds::AWS_STATEMENT, "sid"),
    (kinds::AWS_POLICY_VERSION, "versionid"),
];

pub fn node_label(node: &Node) -> String {
    LABEL_PROPERTIES
        .iter()
        .find(|(kind, _)| node.has_kind(kind))
        .and_then(|(_, key)| node.properties.get_str(key))
        .filter(|label| !label.is_empty())
        .map(|label| label.into_owned())
        .unwrap_or_else(|| node.id.to_string())
}

pub fn icon_name(node: &Node) -> Option<&'static str> {
    ICONS
        .iter()
        .find(|(matches, _)| matches.iter().any(|k| node.has_kind(k)))
        .map(|(_, icon)| *icon)
}

#[derive(Debug, Clone, Default)]
pub struct Projector {
    config: ProjectionConfig,
}

impl Projector {
    pub fn new(config: ProjectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    pub fn icon(&self, node: &Node) -> String {
        icon_name(node)
            .map(|name| format!("{}{}", self.config.icon_dir, name))
            .unwrap_or_default()
    }

    fn fill(&self, node: &Node) -> Option<String> {
        if !node.has_kind(kinds::AWS_STATEMENT) {
            return None;
        }
        let allow = node.properties.get_str("effect").as_deref() == Some("Allow");
        Some(if allow {
            self.config.allow_fill.clone()
        } else {
            self.config.deny_fill.clone()
        })
    }

    pub fn node(&self, node: &Node) -> GraphNode {
        GraphNode {
            id: node.id.to_string(),
            label: node_label(node),
            icon: self.icon(node),
            fill: self.fill(node),
        }
    }

    pub fn edge(&self, relationship: &Relationship) -> GraphEdge {
        let label = if relationship.kind == rel::IDENTITY_TRANSFORM {
            relationship
                .properties
                .get_str("name")
                .map(|s| s.into_owned())
                .unwrap_or_else(|| relationship.kind.clone())
        } else {
            relationship.kind.clone()
        };
        let weight = if relationship.layer() == Some(self.config.emphasized_edge_layer) {
            self.config.emphasized_edge_weight
        } else {
            self.config.default_edge_weight
        };
        GraphEdge {
            id: relationship.id.to_string(),
            source: relationship.start_id.to_string(),
            target: relationship.end_id.to_string(),
            label,
            weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_kind_precedence() {
        let role = Node::new(5)
            .with_kind(kinds::AWS_ROLE)
            .with_kind(kinds::UNIQUE_ARN)
            .with_property("rolename", "admin")
            .with_property("arn", "arn:aws:iam::1:role/admin");
        assert_eq!(node_label(&role), "admin");

        let account = Node::new(6)
            .with_kind(kinds::AWS_ACCOUNT)
            .with_property("account_id", "123456789012");
        assert_eq!(node_label(&account), "123456789012");

        let bare = Node::new(77).with_kind("Mystery");
        assert_eq!(node_label(&bare), "77");
    }

    #[test]
    fn statement_without_sid_uses_id() {
        let stmt = Node::new(9).with_kind(kinds::AWS_STATEMENT);
        assert_eq!(node_label(&stmt), "9");
        let named = stmt.clone().with_property("sid", "AllowS3");
        assert_eq!(node_label(&named), "AllowS3");
    }

    #[test]
    fn statements_are_filled_by_effect() {
        let projector = Projector::default();
        let allow = Node::new(1)
            .with_kind(kinds::AWS_STATEMENT)
            .with_property("effect", "Allow");
        let deny = Node::new(2)
            .with_kind(kinds::AWS_STATEMENT)
            .with_property("effect", "Deny");
        assert_eq!(projector.node(&allow).fill.as_deref(), Some("#76d654"));
        assert_eq!(projector.node(&deny).fill.as_deref(), Some("#de6e68"));
        assert_eq!(projector.node(&Node::new(3)).fill, None);
    }

    #[test]
    fn icons_are_prefixed_and_inline_policies_share_policy_icon() {
        let projector = Projector::default();
        let inline = Node::new(1).with_kind(kinds::AWS_INLINE_POLICY);
        assert_eq!(projector.icon(&inline), "./policy_icon.svg");
        assert_eq!(projector.icon(&Node::new(2).with_kind(kinds::AWS_ACTION)), "");
    }

    #[test]
    fn edges_weigh_by_layer_and_label_identity_transforms() {
        let projector = Projector::default();
        let structural = Relationship::new(10, 1, 2, rel::MEMBER_OF).with_property("layer", "1");
        let meaningful = Relationship::new(11, 2, 3, rel::IDENTITY_TRANSFORM)
            .with_property("layer", "2")
            .with_property("name", "sts:assumerole");
        let a = projector.edge(&structural);
        let b = projector.edge(&meaningful);
        assert_eq!((a.id.as_str(), a.source.as_str(), a.target.as_str()), ("10", "1", "2"));
        assert_eq!(a.weight, 3);
        assert_eq!(a.label, "MemberOf");
        assert_eq!(b.weight, 7);
        assert_eq!(b.label, "sts:assumerole");
    }
}
