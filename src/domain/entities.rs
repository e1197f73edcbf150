//! Domain entities: core data structures

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owning context of a taxonomy, usually a company.
///
/// Names are unique and counts are aggregated only within one scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Scope name as stored on node records, e.g. "Acme Corporation"
    pub name: String,
    /// Short suffix appended to entity names, e.g. "AC"
    pub abbreviation: String,
}

impl Scope {
    pub fn new(name: impl Into<String>, abbreviation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            abbreviation: abbreviation.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.abbreviation)
    }
}

/// Group or leaf classification entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique within scope
    pub id: String,
    pub display_name: String,
    /// Only group nodes may be parents
    pub is_group: bool,
    /// Parent group, None for roots
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Name of the owning scope
    pub scope: String,
    /// Default designation marker (warehouses and similar leaf taxonomies)
    #[serde(default)]
    pub is_default: bool,
    /// Last modification as reported by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Node {
    /// True if the node belongs to `scope`.
    pub fn in_scope(&self, scope: &Scope) -> bool {
        self.scope == scope.name
    }
}

/// Payload for creating a node.
///
/// `is_group: None` lets the store pick the type (see `TaxonomyStore::create`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    pub display_name: String,
    pub parent_id: Option<String>,
    pub is_group: Option<bool>,
}

impl NewNode {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            parent_id: None,
            is_group: None,
        }
    }

    pub fn under(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn group(mut self, is_group: bool) -> Self {
        self.is_group = Some(is_group);
        self
    }
}

/// Fully resolved create request as sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub display_name: String,
    pub parent_id: Option<String>,
    pub is_group: bool,
    pub scope: String,
}

/// Partial update of a node. `None` fields are left untouched.
///
/// `parent_id: Some(None)` moves the node to the root level.
/// There is deliberately no way to change `is_group` here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

impl NodeUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            display_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn reparent(parent_id: Option<String>) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Self::default()
        }
    }

    pub fn default_flag(is_default: bool) -> Self {
        Self {
            is_default: Some(is_default),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.parent_id.is_none() && self.is_default.is_none()
    }
}

/// Record assigned to a node by its (raw, unnormalized) group name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafMember {
    pub raw_group_name: String,
    pub scope: String,
}

impl LeafMember {
    pub fn new(raw_group_name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            raw_group_name: raw_group_name.into(),
            scope: scope.into(),
        }
    }
}

/// Node filter matching the remote store's `kind` query parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ListKind {
    #[default]
    All,
    ParentsOnly,
    LeafsOnly,
}

impl ListKind {
    pub fn accepts(&self, node: &Node) -> bool {
        match self {
            ListKind::All => true,
            ListKind::ParentsOnly => node.is_group,
            ListKind::LeafsOnly => !node.is_group,
        }
    }

    /// Query value for the remote store, None for unfiltered listing.
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            ListKind::All => None,
            ListKind::ParentsOnly => Some("parents"),
            ListKind::LeafsOnly => Some("leafs"),
        }
    }
}

/// Classification families sharing the same tree semantics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaxonomyKind {
    #[default]
    ItemGroup,
    CostCenter,
    Warehouse,
    CustomerGroup,
    SupplierGroup,
}

/// Where leaf members of a taxonomy live on the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberSource {
    /// Collection path, e.g. "items"
    pub resource: &'static str,
    /// Field holding the raw group name, e.g. "item_group"
    pub group_field: &'static str,
}

impl TaxonomyKind {
    pub const ALL: [TaxonomyKind; 5] = [
        TaxonomyKind::ItemGroup,
        TaxonomyKind::CostCenter,
        TaxonomyKind::Warehouse,
        TaxonomyKind::CustomerGroup,
        TaxonomyKind::SupplierGroup,
    ];

    /// Collection path of the nodes on the remote store.
    pub fn resource(&self) -> &'static str {
        match self {
            TaxonomyKind::ItemGroup => "item-groups",
            TaxonomyKind::CostCenter => "cost-centers",
            TaxonomyKind::Warehouse => "warehouses",
            TaxonomyKind::CustomerGroup => "customer-groups",
            TaxonomyKind::SupplierGroup => "supplier-groups",
        }
    }

    /// Members counted by aggregation, if this taxonomy has any.
    pub fn member_source(&self) -> Option<MemberSource> {
        match self {
            TaxonomyKind::ItemGroup => Some(MemberSource {
                resource: "items",
                group_field: "item_group",
            }),
            TaxonomyKind::CustomerGroup => Some(MemberSource {
                resource: "customers",
                group_field: "customer_group",
            }),
            TaxonomyKind::SupplierGroup => Some(MemberSource {
                resource: "suppliers",
                group_field: "supplier_group",
            }),
            TaxonomyKind::CostCenter | TaxonomyKind::Warehouse => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyKind::ItemGroup => "item-group",
            TaxonomyKind::CostCenter => "cost-center",
            TaxonomyKind::Warehouse => "warehouse",
            TaxonomyKind::CustomerGroup => "customer-group",
            TaxonomyKind::SupplierGroup => "supplier-group",
        }
    }
}

impl fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxonomyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaxonomyKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s || k.resource() == s)
            .ok_or_else(|| format!("unknown taxonomy kind: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_kind_parses_singular_and_resource_names() {
        assert_eq!("item-group".parse::<TaxonomyKind>(), Ok(TaxonomyKind::ItemGroup));
        assert_eq!("cost-centers".parse::<TaxonomyKind>(), Ok(TaxonomyKind::CostCenter));
        assert!("tax-template".parse::<TaxonomyKind>().is_err());
    }

    #[test]
    fn test_node_wire_format_is_camel_case() {
        let node = Node {
            id: "n1".into(),
            display_name: "Products - AC".into(),
            is_group: true,
            parent_id: None,
            scope: "Acme".into(),
            is_default: false,
            modified: None,
        };
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"displayName\""));
        assert!(json.contains("\"isGroup\":true"));
        assert!(json.contains("\"parentId\":null"));
    }

    #[test]
    fn test_node_update_skips_untouched_fields() {
        let json = serde_json::to_string(&NodeUpdate::reparent(Some("g1".into()))).unwrap();
        assert_eq!(json, r#"{"parentId":"g1"}"#);

        let json = serde_json::to_string(&NodeUpdate::reparent(None)).unwrap();
        assert_eq!(json, r#"{"parentId":null}"#);
    }

    #[test]
    fn test_list_kind_filters_by_group_flag() {
        let mut node = Node {
            id: "n1".into(),
            display_name: "x".into(),
            is_group: false,
            parent_id: Some("g".into()),
            scope: "Acme".into(),
            is_default: false,
            modified: None,
        };
        assert!(ListKind::All.accepts(&node));
        assert!(ListKind::LeafsOnly.accepts(&node));
        assert!(!ListKind::ParentsOnly.accepts(&node));
        node.is_group = true;
        assert!(ListKind::ParentsOnly.accepts(&node));
    }
}
