//! In-memory mirror of sway's outputs, workspaces and windows
//!
//! `StateStore` holds three flat maps keyed by node id plus the `ActiveState`
//! focus cache. A `GET_TREE` reply rebuilds everything from scratch; workspace
//! and window events then patch single entries.
//!
//! Map entries are stored detached: their `nodes`/`floating_nodes` are empty
//! and children are found by id through `focus` or their own map entry.

use std::collections::HashMap;

use tracing::{debug, trace};

use super::events::{WindowChange, WindowEvent, WorkspaceChange, WorkspaceEvent};
use super::types::{ActiveClient, ActiveState, ActiveWorkspace, Node, NodeType};

/// The mirrored window manager state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateStore {
    monitors: HashMap<i64, Node>,
    workspaces: HashMap<i64, Node>,
    clients: HashMap<i64, Node>,
    active: ActiveState,
}

impl StateStore {
    /// Create an empty store; nothing is known until the first tree arrives
    pub fn new() -> Self {
        Self::default()
    }

    /// Outputs keyed by node id
    pub fn monitors(&self) -> &HashMap<i64, Node> {
        &self.monitors
    }

    /// Workspaces keyed by node id, including ones on the `__i3` scratch output
    pub fn workspaces(&self) -> &HashMap<i64, Node> {
        &self.workspaces
    }

    /// Containers and windows keyed by node id, tiling and floating alike
    ///
    /// Split containers land here too since sway reports them as `con`.
    pub fn clients(&self) -> &HashMap<i64, Node> {
        &self.clients
    }

    /// Focus cache, see [`ActiveState`]
    pub fn active(&self) -> &ActiveState {
        &self.active
    }

    /// Rebuild all maps from a full tree
    ///
    /// Walks the tree depth-first in pre-order with an explicit stack, so very
    /// deep trees cannot exhaust the call stack. Tiling children are visited
    /// before floating ones. Nodes of an untracked type are skipped along with
    /// everything below them. If several workspaces contain a focused node,
    /// the last one visited wins.
    pub fn sync_tree(&mut self, root: Node) {
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            match node.node_type {
                NodeType::Root => {
                    self.monitors.clear();
                    self.workspaces.clear();
                    self.clients.clear();
                    self.active = ActiveState::default();
                }
                NodeType::Output => {
                    if node.active {
                        self.active.monitor = node.name.clone();
                    }
                }
                NodeType::Workspace => {
                    if node.has_focused_descendant() {
                        self.active.workspace = ActiveWorkspace::from_node(&node);
                    }
                }
                NodeType::Con | NodeType::FloatingCon => {
                    if node.focused {
                        self.active.client = ActiveClient::from_node(&node);
                    }
                }
                NodeType::Unknown => {
                    // e.g. i3's dockarea; nothing below it is a regular window
                    trace!(id = node.id, "Skipping untracked subtree");
                    continue;
                }
            }

            let node_type = node.node_type;
            let (flat, children) = node.into_parts();
            match node_type {
                NodeType::Output => {
                    self.monitors.insert(flat.id, flat);
                }
                NodeType::Workspace => {
                    self.workspaces.insert(flat.id, flat);
                }
                NodeType::Con | NodeType::FloatingCon => {
                    self.clients.insert(flat.id, flat);
                }
                NodeType::Root | NodeType::Unknown => {}
            }

            // Reversed so the first child is popped first
            stack.extend(children.into_iter().rev());
        }

        debug!(
            monitors = self.monitors.len(),
            workspaces = self.workspaces.len(),
            clients = self.clients.len(),
            "Synchronized tree"
        );
    }

    /// Apply a workspace event
    ///
    /// A `current` of `None` is only valid for `reload`; other changes without
    /// one are ignored here since decoding already rejects them.
    pub fn apply_workspace_event(&mut self, event: WorkspaceEvent) {
        let WorkspaceEvent {
            change,
            current,
            old,
        } = event;

        if change == WorkspaceChange::Reload {
            return;
        }
        let Some(current) = current else {
            return;
        };

        match change {
            WorkspaceChange::Init => {
                self.workspaces.insert(current.id, current.detached());
            }
            WorkspaceChange::Empty => {
                self.workspaces.remove(&current.id);
            }
            WorkspaceChange::Focus => {
                self.active.workspace = ActiveWorkspace::from_node(&current);
                self.active.monitor = current.output.clone().unwrap_or_default();
                self.workspaces.insert(current.id, current.detached());
                if let Some(old) = old {
                    self.workspaces.insert(old.id, old.detached());
                }
            }
            WorkspaceChange::Rename => {
                if self.active.workspace.id == current.id {
                    self.active.workspace.name = current.name.clone();
                }
                self.workspaces.insert(current.id, current.detached());
            }
            WorkspaceChange::Move
            | WorkspaceChange::Urgent
            | WorkspaceChange::Other
            | WorkspaceChange::Reload => {
                self.workspaces.insert(current.id, current.detached());
            }
        }
    }

    /// Apply a window event
    ///
    /// Closing the focused window leaves `ActiveState::client` pointing at it
    /// until the next focus event.
    pub fn apply_window_event(&mut self, event: WindowEvent) {
        let WindowEvent { change, container } = event;
        let id = container.id;

        match change {
            WindowChange::New => {
                self.clients.insert(id, container.detached());
            }
            WindowChange::Close => {
                self.clients.remove(&id);
            }
            WindowChange::Focus => {
                if self.active.client.id == id {
                    return;
                }
                if let Some(previous) = self.clients.get_mut(&self.active.client.id) {
                    previous.focused = false;
                }
                self.active.client = ActiveClient::from_node(&container);
            }
            WindowChange::Title => {
                if container.focused {
                    self.active.client.title = container.name.clone();
                }
                self.clients.insert(id, container.detached());
            }
            WindowChange::FullscreenMode
            | WindowChange::Move
            | WindowChange::Floating
            | WindowChange::Urgent
            | WindowChange::Mark
            | WindowChange::Other => {
                self.clients.insert(id, container.detached());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn node(value: Value) -> Node {
        serde_json::from_value(value).unwrap()
    }

    fn window_event(change: &str, container: Value) -> WindowEvent {
        serde_json::from_value(json!({ "change": change, "container": container })).unwrap()
    }

    fn workspace_event(change: &str, current: Value, old: Value) -> WorkspaceEvent {
        serde_json::from_value(json!({ "change": change, "current": current, "old": old }))
            .unwrap()
    }

    fn tree(raw: &str) -> Node {
        serde_json::from_str(raw).unwrap()
    }

    /// root -> HDMI-1 (active) -> workspace 1 -> focused con 10
    fn single_output_tree() -> Node {
        tree(
            r#"{
                "id": 0, "type": "root", "name": "root",
                "nodes": [{
                    "id": 100, "type": "output", "name": "HDMI-1", "active": true,
                    "nodes": [{
                        "id": 1, "type": "workspace", "name": "1",
                        "output": "HDMI-1", "focus": [10],
                        "nodes": [{
                            "id": 10, "type": "con", "name": "~/src",
                            "app_id": "term", "shell": "xdg_shell", "focused": true
                        }]
                    }]
                }]
            }"#,
        )
    }

    /// Two outputs plus the scratchpad, tiling + floating + nested clients
    fn multi_output_tree() -> Node {
        tree(
            r#"{
                "id": 0, "type": "root",
                "nodes": [
                    {
                        "id": 200, "type": "output", "name": "__i3",
                        "nodes": [{ "id": 201, "type": "workspace", "name": "__i3_scratch" }]
                    },
                    {
                        "id": 100, "type": "output", "name": "DP-1", "active": false,
                        "nodes": [{
                            "id": 1, "type": "workspace", "name": "1",
                            "nodes": [{ "id": 10, "type": "con", "name": "firefox", "app_id": "firefox" }]
                        }]
                    },
                    {
                        "id": 101, "type": "output", "name": "DP-2", "active": true,
                        "nodes": [
                            {
                                "id": 2, "type": "workspace", "name": "2:code",
                                "nodes": [{
                                    "id": 20, "type": "con", "name": "split",
                                    "nodes": [
                                        { "id": 21, "type": "con", "name": "a", "app_id": "foot" },
                                        { "id": 22, "type": "con", "name": "b", "app_id": "foot" }
                                    ]
                                }],
                                "floating_nodes": [{
                                    "id": 23, "type": "floating_con", "name": "Steam",
                                    "shell": "xwayland", "focused": true,
                                    "window_properties": { "class": "steam" }
                                }]
                            },
                            { "id": 3, "type": "workspace", "name": "3" }
                        ]
                    }
                ]
            }"#,
        )
    }

    #[test]
    fn test_sync_single_output_scenario() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());

        assert_eq!(store.monitors().len(), 1);
        assert_eq!(store.monitors()[&100].name, "HDMI-1");

        assert_eq!(store.workspaces().len(), 1);
        assert_eq!(store.workspaces()[&1].name, "1");

        assert_eq!(store.clients().len(), 1);
        assert_eq!(store.clients()[&10].name, "~/src");

        assert_eq!(
            store.active(),
            &ActiveState {
                client: ActiveClient {
                    id: 10,
                    title: "~/src".to_string(),
                    class: "term".to_string(),
                },
                monitor: "HDMI-1".to_string(),
                workspace: ActiveWorkspace {
                    id: 1,
                    name: "1".to_string(),
                },
            }
        );
    }

    #[test]
    fn test_sync_stores_detached_nodes() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());

        let ws = &store.workspaces()[&1];
        assert!(ws.nodes.is_empty());
        assert_eq!(ws.focus, vec![10]);
        assert!(store.monitors()[&100].nodes.is_empty());
    }

    #[test]
    fn test_sync_multi_output_collects_everything() {
        let mut store = StateStore::new();
        store.sync_tree(multi_output_tree());

        let mut monitors: Vec<i64> = store.monitors().keys().copied().collect();
        monitors.sort();
        assert_eq!(monitors, vec![100, 101, 200]);

        let mut workspaces: Vec<i64> = store.workspaces().keys().copied().collect();
        workspaces.sort();
        assert_eq!(workspaces, vec![1, 2, 3, 201]);

        // Split container, its leaves and the floating window are all clients
        let mut clients: Vec<i64> = store.clients().keys().copied().collect();
        clients.sort();
        assert_eq!(clients, vec![10, 20, 21, 22, 23]);
    }

    #[test]
    fn test_sync_focus_in_floating_window() {
        let mut store = StateStore::new();
        store.sync_tree(multi_output_tree());

        let active = store.active();
        assert_eq!(active.monitor, "DP-2");
        assert_eq!(
            active.workspace,
            ActiveWorkspace {
                id: 2,
                name: "2:code".to_string()
            }
        );
        assert_eq!(
            active.client,
            ActiveClient {
                id: 23,
                title: "Steam".to_string(),
                class: "steam".to_string(),
            }
        );
    }

    #[test]
    fn test_sync_is_idempotent() {
        let mut once = StateStore::new();
        once.sync_tree(multi_output_tree());

        let mut twice = StateStore::new();
        twice.sync_tree(multi_output_tree());
        twice.sync_tree(multi_output_tree());

        assert_eq!(once, twice);
    }

    #[test]
    fn test_sync_replaces_previous_state() {
        let mut store = StateStore::new();
        store.sync_tree(multi_output_tree());
        store.sync_tree(single_output_tree());

        let mut fresh = StateStore::new();
        fresh.sync_tree(single_output_tree());

        assert_eq!(store, fresh);
        assert!(!store.clients().contains_key(&23));
    }

    #[test]
    fn test_sync_without_focus_resets_active() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());

        store.sync_tree(node(json!({
            "id": 0,
            "type": "root",
            "nodes": [{ "id": 100, "type": "output", "name": "HDMI-1" }],
        })));

        assert_eq!(store.active(), &ActiveState::default());
        assert!(store.workspaces().is_empty());
    }

    #[test]
    fn test_sync_last_focused_workspace_wins() {
        let mut store = StateStore::new();
        store.sync_tree(tree(
            r#"{
                "id": 0, "type": "root",
                "nodes": [{
                    "id": 100, "type": "output", "name": "DP-1",
                    "nodes": [
                        {
                            "id": 1, "type": "workspace", "name": "first",
                            "nodes": [{ "id": 10, "type": "con", "focused": true }]
                        },
                        {
                            "id": 2, "type": "workspace", "name": "second",
                            "nodes": [{ "id": 20, "type": "con", "focused": true }]
                        }
                    ]
                }]
            }"#,
        ));

        assert_eq!(store.active().workspace.id, 2);
        assert_eq!(store.active().client.id, 20);
    }

    #[test]
    fn test_sync_skips_dockarea_subtree() {
        let root = tree(
            r#"{
                "id": 1, "type": "root",
                "nodes": [{
                    "id": 2, "type": "output", "name": "eDP-1", "active": true,
                    "nodes": [
                        {
                            "id": 3, "type": "dockarea",
                            "nodes": [{ "id": 4, "type": "con", "name": "i3bar" }]
                        },
                        {
                            "id": 5, "type": "con", "name": "content",
                            "nodes": [{
                                "id": 6, "type": "workspace", "name": "1",
                                "nodes": [{ "id": 7, "type": "con", "name": "xterm", "focused": true }]
                            }]
                        }
                    ]
                }]
            }"#,
        );

        let mut store = StateStore::new();
        store.sync_tree(root);

        let mut ids: Vec<i64> = store.clients().keys().copied().collect();
        ids.sort();
        assert_eq!(ids, vec![5, 7]);
        assert!(!store.clients().contains_key(&3));
        assert_eq!(store.active().client.id, 7);
        assert_eq!(store.active().workspace.id, 6);
    }

    #[test]
    fn test_sync_survives_deep_nesting() {
        // Build a chain of nested containers without recursion in the test
        let mut leaf = Node {
            id: 100_000,
            node_type: NodeType::Con,
            focused: true,
            ..Node::default()
        };
        for id in (10_000..15_000).rev() {
            leaf = Node {
                id,
                node_type: NodeType::Con,
                nodes: vec![leaf],
                ..Node::default()
            };
        }
        let ws = Node {
            id: 1,
            node_type: NodeType::Workspace,
            nodes: vec![leaf],
            ..Node::default()
        };
        let root = Node {
            id: 0,
            node_type: NodeType::Root,
            nodes: vec![ws],
            ..Node::default()
        };

        let mut store = StateStore::new();
        store.sync_tree(root);

        assert_eq!(store.clients().len(), 5_001);
        assert_eq!(store.active().client.id, 100_000);
        assert_eq!(store.active().workspace.id, 1);
    }

    #[test]
    fn test_window_new_then_close_restores_baseline() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());
        let baseline = store.clone();

        store.apply_window_event(window_event(
            "new",
            json!({ "id": 11, "type": "con", "name": "new", "app_id": "foot" }),
        ));
        assert!(store.clients().contains_key(&11));

        store.apply_window_event(window_event("close", json!({ "id": 11, "type": "con" })));
        assert_eq!(store, baseline);
    }

    #[test]
    fn test_window_close_keeps_active_client() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());
        let active_before = store.active().clone();

        store.apply_window_event(window_event("close", json!({ "id": 10, "type": "con" })));

        assert!(!store.clients().contains_key(&10));
        assert_eq!(store.active(), &active_before);
    }

    #[test]
    fn test_window_focus_switches_active_client() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());
        store.apply_window_event(window_event(
            "new",
            json!({ "id": 11, "type": "con", "name": "other", "app_id": "foot" }),
        ));

        store.apply_window_event(window_event(
            "focus",
            json!({
                "id": 11, "type": "con", "name": "other",
                "app_id": "foot", "shell": "xdg_shell", "focused": true,
            }),
        ));

        assert_eq!(
            store.active().client,
            ActiveClient {
                id: 11,
                title: "other".to_string(),
                class: "foot".to_string(),
            }
        );
        assert!(!store.clients()[&10].focused, "previous client loses focus");
    }

    #[test]
    fn test_window_focus_is_idempotent() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());
        let focus = window_event(
            "focus",
            json!({ "id": 12, "type": "con", "name": "x", "app_id": "foot", "focused": true }),
        );

        store.apply_window_event(focus.clone());
        let after_one = store.clone();
        store.apply_window_event(focus);

        assert_eq!(store, after_one);
    }

    #[test]
    fn test_window_focus_on_same_id_does_not_touch_clients() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());
        let before = store.clone();

        store.apply_window_event(window_event(
            "focus",
            json!({ "id": 10, "type": "con", "name": "renamed?", "focused": true }),
        ));

        assert_eq!(store, before);
    }

    #[test]
    fn test_window_focus_with_unknown_previous_client() {
        let mut store = StateStore::new();
        store.apply_window_event(window_event(
            "focus",
            json!({ "id": 5, "type": "con", "name": "five", "app_id": "a" }),
        ));

        assert_eq!(store.active().client.id, 5);
        assert!(store.clients().is_empty());
    }

    #[test]
    fn test_window_title_on_focused_updates_active() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());

        store.apply_window_event(window_event(
            "title",
            json!({ "id": 10, "type": "con", "name": "~/src/sway", "focused": true, "app_id": "term" }),
        ));

        assert_eq!(store.active().client.title, "~/src/sway");
        assert_eq!(store.clients()[&10].name, "~/src/sway");
    }

    #[test]
    fn test_window_title_on_unfocused_keeps_active() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());

        store.apply_window_event(window_event(
            "title",
            json!({ "id": 30, "type": "con", "name": "background", "focused": false }),
        ));

        assert_eq!(store.active().client.title, "~/src");
        assert_eq!(store.clients()[&30].name, "background");
    }

    #[test]
    fn test_window_default_changes_upsert() {
        for change in ["fullscreen_mode", "move", "floating", "urgent", "mark", "whatever"] {
            let mut store = StateStore::new();
            store.sync_tree(single_output_tree());

            store.apply_window_event(window_event(
                change,
                json!({ "id": 10, "type": "con", "name": "~/src", "urgent": true }),
            ));

            assert!(store.clients()[&10].urgent, "change {change} should upsert");
        }
    }

    #[test]
    fn test_window_upsert_stores_detached() {
        let mut store = StateStore::new();
        store.apply_window_event(window_event(
            "move",
            json!({ "id": 40, "type": "con", "nodes": [{ "id": 41 }] }),
        ));

        assert!(store.clients()[&40].nodes.is_empty());
    }

    #[test]
    fn test_workspace_init_and_empty() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());
        let baseline = store.clone();

        store.apply_workspace_event(workspace_event(
            "init",
            json!({ "id": 4, "type": "workspace", "name": "4", "output": "HDMI-1" }),
            Value::Null,
        ));
        assert_eq!(store.workspaces()[&4].name, "4");

        store.apply_workspace_event(workspace_event(
            "empty",
            json!({ "id": 4, "type": "workspace", "name": "4" }),
            Value::Null,
        ));
        assert_eq!(store, baseline);
    }

    #[test]
    fn test_workspace_focus_updates_active_and_both_entries() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());

        store.apply_workspace_event(workspace_event(
            "focus",
            json!({ "id": 2, "type": "workspace", "name": "2", "output": "DP-2", "focused": true }),
            json!({ "id": 1, "type": "workspace", "name": "1", "output": "HDMI-1", "focused": false }),
        ));

        assert_eq!(
            store.active().workspace,
            ActiveWorkspace {
                id: 2,
                name: "2".to_string()
            }
        );
        assert_eq!(store.active().monitor, "DP-2");
        assert!(store.workspaces()[&2].focused);
        assert!(!store.workspaces()[&1].focused);
    }

    #[test]
    fn test_workspace_focus_without_old() {
        let mut store = StateStore::new();

        store.apply_workspace_event(workspace_event(
            "focus",
            json!({ "id": 2, "type": "workspace", "name": "2", "output": "DP-2" }),
            Value::Null,
        ));

        assert_eq!(store.active().workspace.id, 2);
        assert_eq!(store.workspaces().len(), 1);
    }

    #[test]
    fn test_workspace_rename_active() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());

        store.apply_workspace_event(workspace_event(
            "rename",
            json!({ "id": 1, "type": "workspace", "name": "1:web" }),
            Value::Null,
        ));

        assert_eq!(store.active().workspace.name, "1:web");
        assert_eq!(store.workspaces()[&1].name, "1:web");
    }

    #[test]
    fn test_workspace_rename_inactive() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());

        store.apply_workspace_event(workspace_event(
            "rename",
            json!({ "id": 7, "type": "workspace", "name": "7:mail" }),
            Value::Null,
        ));

        assert_eq!(store.active().workspace.name, "1");
        assert_eq!(store.workspaces()[&7].name, "7:mail");
    }

    #[test]
    fn test_workspace_reload_is_noop() {
        let mut store = StateStore::new();
        store.sync_tree(single_output_tree());
        let before = store.clone();

        store.apply_workspace_event(workspace_event("reload", Value::Null, Value::Null));
        store.apply_workspace_event(workspace_event(
            "reload",
            json!({ "id": 99, "type": "workspace" }),
            Value::Null,
        ));

        assert_eq!(store, before);
    }

    #[test]
    fn test_workspace_default_changes_upsert() {
        for change in ["move", "urgent", "something_new"] {
            let mut store = StateStore::new();
            store.sync_tree(single_output_tree());

            store.apply_workspace_event(workspace_event(
                change,
                json!({ "id": 1, "type": "workspace", "name": "1", "urgent": true }),
                Value::Null,
            ));

            assert!(store.workspaces()[&1].urgent, "change {change} should upsert");
        }
    }
}
