//! Node announcement side channel.
//!
//! Records carrying a node FDN and a node type are announced to an injected
//! [`NodeNotifier`] so an external assignment service can pick the node up.
//! Announcement failures are logged here and never reach the parse outcome.

use thiserror::Error;

use crate::observability::{log_debug, log_warn};

const NODE_FDN_KEYS: [&str; 2] = ["srcNodeFDN", "nodeFDN"];
const NODE_TYPE_KEYS: [&str; 2] = ["nodeType", "srcNodeType"];
const SOURCE_TYPE_KEY: &str = "sourceType";

/// A node discovered while parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeAnnouncement {
    /// Node type, e.g. `ERBS`.
    pub ne_type: String,
    /// Fully distinguished name of the node.
    pub node_fdn: String,
    /// Second `/`-separated segment of the source's `inDir`, if any.
    pub oss_id: Option<String>,
}

/// Errors a notifier may report.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The receiving service cannot be reached.
    #[error("notifier unavailable: {0}")]
    Unavailable(String),
    /// The service refused the announcement.
    #[error("announcement rejected: {0}")]
    Rejected(String),
}

/// Receiver of node announcements.
pub trait NodeNotifier: Send + Sync {
    /// Report one node. Failures are logged by the caller and never fail a parse.
    fn announce(&self, announcement: &NodeAnnouncement) -> Result<(), NotifyError>;
}

/// Notifier that accepts and drops every announcement.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl NodeNotifier for NoopNotifier {
    fn announce(&self, _announcement: &NodeAnnouncement) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Per-file memory of the last node FDN and node type seen.
#[derive(Clone, Debug, Default)]
pub(crate) struct NodeTracker {
    node_fdn: Option<String>,
    ne_type: Option<String>,
}

impl NodeTracker {
    /// Inspect one staged pair.
    pub(crate) fn observe(&mut self, key: &str, value: &str) {
        if NODE_FDN_KEYS.contains(&key) {
            self.node_fdn = Some(value.to_string());
        }
        if NODE_TYPE_KEYS.contains(&key) || (key == SOURCE_TYPE_KEY && !value.is_empty()) {
            self.ne_type = Some(value.to_string());
        }
    }

    /// The announcement for the node seen so far, once both parts are known.
    pub(crate) fn announcement(&self, in_dir: Option<&str>) -> Option<NodeAnnouncement> {
        let node_fdn = self.node_fdn.as_deref().filter(|fdn| !fdn.is_empty())?;
        let ne_type = self.ne_type.as_deref().filter(|ty| !ty.is_empty())?;
        Some(NodeAnnouncement {
            ne_type: ne_type.to_string(),
            node_fdn: node_fdn.to_string(),
            oss_id: in_dir.and_then(oss_id_from_dir),
        })
    }
}

/// Second `/`-separated segment of `in_dir`: `/eniq_oss_1/lterbs/in` yields
/// `eniq_oss_1`.
pub(crate) fn oss_id_from_dir(in_dir: &str) -> Option<String> {
    in_dir
        .split('/')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Send the tracked node, if any, logging instead of failing.
pub(crate) fn announce_tracked(
    notifier: Option<&dyn NodeNotifier>,
    tracker: &NodeTracker,
    in_dir: Option<&str>,
) {
    let Some(notifier) = notifier else {
        return;
    };
    let Some(announcement) = tracker.announcement(in_dir) else {
        return;
    };
    match notifier.announce(&announcement) {
        Ok(()) => log_debug!(
            component = "notify",
            event = "node_announced",
            ne_type = %announcement.ne_type,
            node_fdn = %announcement.node_fdn,
        ),
        Err(err) => log_warn!(
            component = "notify",
            event = "node_announce_failed",
            node_fdn = %announcement.node_fdn,
            error = %err,
        ),
    }
}
