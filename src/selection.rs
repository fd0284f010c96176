// Selection: what the dashboard is looking at, plus the structured keys parsed out of it.
// Parsing is purely structural; whether the entity exists is decided by the aggregators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind label shared by selections, payloads and query strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionKind {
    Root,
    Cluster,
    Node,
    Guest,
    BackupServer,
    BackupStore,
}

impl SelectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionKind::Root => "root",
            SelectionKind::Cluster => "cluster",
            SelectionKind::Node => "node",
            SelectionKind::Guest => "guest",
            SelectionKind::BackupServer => "backup-server",
            SelectionKind::BackupStore => "backup-store",
        }
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form: `{"kind": "node", "id": "conn:pve1"}`; root carries no id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "kebab-case")]
pub enum Selection {
    Root,
    Cluster(String),
    Node(String),
    Guest(String),
    BackupServer(String),
    BackupStore(String),
}

impl Selection {
    /// Builds a selection from a query-string style `(kind, id)` pair. A missing id is empty.
    pub fn from_parts(kind: SelectionKind, id: Option<String>) -> Self {
        let id = id.unwrap_or_default();
        match kind {
            SelectionKind::Root => Selection::Root,
            SelectionKind::Cluster => Selection::Cluster(id),
            SelectionKind::Node => Selection::Node(id),
            SelectionKind::Guest => Selection::Guest(id),
            SelectionKind::BackupServer => Selection::BackupServer(id),
            SelectionKind::BackupStore => Selection::BackupStore(id),
        }
    }

    pub fn kind(&self) -> SelectionKind {
        match self {
            Selection::Root => SelectionKind::Root,
            Selection::Cluster(_) => SelectionKind::Cluster,
            Selection::Node(_) => SelectionKind::Node,
            Selection::Guest(_) => SelectionKind::Guest,
            Selection::BackupServer(_) => SelectionKind::BackupServer,
            Selection::BackupStore(_) => SelectionKind::BackupStore,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Selection::Root => "",
            Selection::Cluster(id)
            | Selection::Node(id)
            | Selection::Guest(id)
            | Selection::BackupServer(id)
            | Selection::BackupStore(id) => id,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Root => f.write_str("root"),
            other => write!(f, "{}:{}", other.kind(), other.id()),
        }
    }
}

/// `connection:node`; the node name keeps any further colons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeKey {
    pub connection: String,
    pub node: String,
}

impl NodeKey {
    pub fn parse(id: &str) -> Self {
        let (connection, node) = id.split_once(':').unwrap_or((id, ""));
        Self {
            connection: connection.to_string(),
            node: node.to_string(),
        }
    }
}

/// `connection:node:type:vmid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestKey {
    pub connection: String,
    pub node: String,
    pub guest_type: String,
    pub vmid: String,
}

impl GuestKey {
    pub fn parse(id: &str) -> Self {
        let mut parts = id.splitn(4, ':');
        let mut next = || parts.next().unwrap_or_default().to_string();
        Self {
            connection: next(),
            node: next(),
            guest_type: next(),
            vmid: next(),
        }
    }

    pub fn is_container(&self) -> bool {
        self.guest_type == "lxc"
    }
}

/// `server:store`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKey {
    pub server: String,
    pub store: String,
}

impl StoreKey {
    pub fn parse(id: &str) -> Self {
        let (server, store) = id.split_once(':').unwrap_or((id, ""));
        Self {
            server: server.to_string(),
            store: store.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_key_keeps_extra_colons_in_node_name() {
        let k = NodeKey::parse("c1:pve:odd");
        assert_eq!(k.connection, "c1");
        assert_eq!(k.node, "pve:odd");
    }

    #[test]
    fn node_key_without_colon_is_total() {
        let k = NodeKey::parse("c1");
        assert_eq!(k.connection, "c1");
        assert_eq!(k.node, "");
    }

    #[test]
    fn guest_key_four_segments() {
        let k = GuestKey::parse("c1:pve1:qemu:100");
        assert_eq!(
            k,
            GuestKey {
                connection: "c1".into(),
                node: "pve1".into(),
                guest_type: "qemu".into(),
                vmid: "100".into(),
            }
        );
        assert!(!k.is_container());
        assert!(GuestKey::parse("c1:pve1:lxc:101").is_container());
    }

    #[test]
    fn guest_key_short_input_pads_with_empty() {
        let k = GuestKey::parse("c1:pve1");
        assert_eq!(k.guest_type, "");
        assert_eq!(k.vmid, "");
    }

    #[test]
    fn store_key_split_on_first_colon() {
        let k = StoreKey::parse("pbs1:fast:ssd");
        assert_eq!(k.server, "pbs1");
        assert_eq!(k.store, "fast:ssd");
    }

    #[test]
    fn selection_wire_format() {
        let s: Selection = serde_json::from_str(r#"{"kind":"backup-store","id":"pbs:main"}"#).unwrap();
        assert_eq!(s, Selection::BackupStore("pbs:main".into()));
        assert_eq!(s.kind(), SelectionKind::BackupStore);
        let root: Selection = serde_json::from_str(r#"{"kind":"root"}"#).unwrap();
        assert_eq!(root, Selection::Root);
        assert_eq!(
            serde_json::to_string(&Selection::Node("c:n".into())).unwrap(),
            r#"{"kind":"node","id":"c:n"}"#
        );
    }

    #[test]
    fn from_parts_maps_every_kind() {
        assert_eq!(
            Selection::from_parts(SelectionKind::Guest, Some("a:b:qemu:1".into())),
            Selection::Guest("a:b:qemu:1".into())
        );
        assert_eq!(Selection::from_parts(SelectionKind::Root, None), Selection::Root);
        assert_eq!(Selection::from_parts(SelectionKind::Cluster, None).id(), "");
    }
}
