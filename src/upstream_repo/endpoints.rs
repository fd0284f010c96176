// Upstream paths, relative to `upstream.base_url`. Every caller-supplied segment is
// percent-encoded so names carrying `/`, `?` or `#` stay inside their segment.

use std::borrow::Cow;
use urlencoding::encode;

use crate::models::Timeframe;
use crate::selection::{GuestKey, NodeKey, StoreKey};

fn seg(raw: &str) -> Cow<'_, str> {
    encode(raw)
}

pub fn connections() -> String {
    "/connections".to_string()
}

pub fn connection(id: &str) -> String {
    format!("/connections/{}", seg(id))
}

pub fn nodes(connection: &str) -> String {
    format!("/connections/{}/nodes", seg(connection))
}

pub fn resources(connection: &str) -> String {
    format!("/connections/{}/resources", seg(connection))
}

pub fn cluster_status(connection: &str) -> String {
    format!("/connections/{}/cluster/status", seg(connection))
}

pub fn version(connection: &str) -> String {
    format!("/connections/{}/version", seg(connection))
}

pub fn node_status(key: &NodeKey) -> String {
    format!("/connections/{}/nodes/{}/status", seg(&key.connection), seg(&key.node))
}

pub fn node_subscription(key: &NodeKey) -> String {
    format!(
        "/connections/{}/nodes/{}/subscription",
        seg(&key.connection),
        seg(&key.node)
    )
}

pub fn node_updates(key: &NodeKey) -> String {
    format!("/connections/{}/nodes/{}/updates", seg(&key.connection), seg(&key.node))
}

pub fn node_rrd(key: &NodeKey, timeframe: Timeframe) -> String {
    format!(
        "/connections/{}/nodes/{}/rrd?timeframe={}",
        seg(&key.connection),
        seg(&key.node),
        timeframe.as_str()
    )
}

fn guest_base(key: &GuestKey) -> String {
    format!(
        "/connections/{}/guests/{}/{}/{}",
        seg(&key.connection),
        seg(&key.node),
        seg(&key.guest_type),
        seg(&key.vmid)
    )
}

pub fn guest_config(key: &GuestKey) -> String {
    format!("{}/config", guest_base(key))
}

pub fn guest_rrd(key: &GuestKey, timeframe: Timeframe) -> String {
    format!("{}/rrd?timeframe={}", guest_base(key), timeframe.as_str())
}

pub fn backup_status(server: &str) -> String {
    format!("/backup/{}/status", seg(server))
}

pub fn backup_datastores(server: &str) -> String {
    format!("/backup/{}/datastores", seg(server))
}

pub fn backup_rrd(server: &str, timeframe: Timeframe) -> String {
    format!("/backup/{}/rrd?timeframe={}", seg(server), timeframe.as_str())
}

pub fn store_backups(key: &StoreKey, limit: u32) -> String {
    format!(
        "/backup/{}/datastores/{}/backups?page=1&limit={limit}",
        seg(&key.server),
        seg(&key.store)
    )
}

pub fn store_rrd(key: &StoreKey, timeframe: Timeframe) -> String {
    format!(
        "/backup/{}/datastores/{}/rrd?timeframe={}",
        seg(&key.server),
        seg(&key.store),
        timeframe.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_paths() {
        let k = GuestKey::parse("c1:pve1:lxc:101");
        assert_eq!(guest_config(&k), "/connections/c1/guests/pve1/lxc/101/config");
        assert_eq!(
            guest_rrd(&k, Timeframe::Day),
            "/connections/c1/guests/pve1/lxc/101/rrd?timeframe=day"
        );
    }

    #[test]
    fn store_paths() {
        let k = StoreKey::parse("pbs:main");
        assert_eq!(
            store_backups(&k, 25),
            "/backup/pbs/datastores/main/backups?page=1&limit=25"
        );
    }

    #[test]
    fn reserved_characters_stay_inside_their_segment() {
        let k = StoreKey::parse("pbs:nightly/offsite?x#1");
        assert_eq!(
            store_rrd(&k, Timeframe::Hour),
            "/backup/pbs/datastores/nightly%2Foffsite%3Fx%231/rrd?timeframe=hour"
        );
        let n = NodeKey::parse("c 1:pve/1");
        assert_eq!(node_status(&n), "/connections/c%201/nodes/pve%2F1/status");
    }
}
