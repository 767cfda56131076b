//! Typed views of sway tree data
//!
//! `Node` mirrors the JSON objects returned by `GET_TREE` and embedded in
//! workspace/window events. Only `id` is required; every other field falls back
//! to its default so that partial nodes (as sent in some events) and newer
//! sway releases with extra fields both decode cleanly.

use serde::{Deserialize, Serialize};

/// Kind of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Output,
    Workspace,
    #[default]
    Con,
    FloatingCon,
    /// Node types this client does not track (e.g. `dockarea` on i3)
    #[serde(other)]
    Unknown,
}

/// Rectangle in layout coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// X11 window properties, only present for xwayland clients
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowProperties {
    pub title: Option<String>,
    pub class: Option<String>,
    pub instance: Option<String>,
    pub window_role: Option<String>,
    pub window_type: Option<String>,
    pub transient_for: Option<i64>,
}

/// Idle inhibitors attached to a view
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleInhibitors {
    pub application: String,
    pub user: String,
}

/// One entity in the window manager's tree
///
/// The same shape describes the root, outputs, workspaces and windows; which
/// fields carry meaning depends on `node_type`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    /// Unique id of the node, stable for its lifetime
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type", default)]
    pub node_type: NodeType,

    #[serde(default)]
    pub border: String,
    #[serde(default)]
    pub current_border_width: i32,
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub orientation: String,
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub window_rect: Rect,
    #[serde(default)]
    pub deco_rect: Rect,
    #[serde(default)]
    pub geometry: Rect,
    #[serde(default)]
    pub fullscreen_mode: u32,

    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub sticky: bool,
    /// Only reported for outputs
    #[serde(default)]
    pub active: bool,
    /// Only reported for views
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub marks: Vec<String>,
    /// Child ids in focus order, most recent first
    #[serde(default)]
    pub focus: Vec<i64>,
    #[serde(default)]
    pub representation: Option<String>,

    /// Wayland app id, `None` for xwayland clients
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub pid: Option<i32>,
    /// `xdg_shell` or `xwayland`
    #[serde(default)]
    pub shell: Option<String>,
    /// Output name, reported on workspaces
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub inhibit_idle: Option<bool>,
    #[serde(default)]
    pub idle_inhibitors: Option<IdleInhibitors>,
    /// X11 window id for xwayland clients
    #[serde(default)]
    pub window: Option<i64>,
    #[serde(default)]
    pub window_properties: Option<WindowProperties>,

    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub floating_nodes: Vec<Node>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Node {
    /// Effective application class
    ///
    /// xwayland clients report their class through the X11 window properties,
    /// native clients through `app_id`.
    pub fn derived_class(&self) -> String {
        if self.shell.as_deref() == Some("xwayland") {
            self.window_properties
                .as_ref()
                .and_then(|props| props.class.clone())
                .unwrap_or_default()
        } else {
            self.app_id.clone().unwrap_or_default()
        }
    }

    /// Whether any node below this one, tiling or floating, is focused
    pub fn has_focused_descendant(&self) -> bool {
        let mut stack: Vec<&Node> = self.children().collect();
        while let Some(node) = stack.pop() {
            if node.focused {
                return true;
            }
            stack.extend(node.children());
        }
        false
    }

    /// Tiling children followed by floating children
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().chain(self.floating_nodes.iter())
    }

    /// This node without its child collections
    ///
    /// Child ids stay reachable through `focus`.
    pub fn detached(mut self) -> Node {
        self.nodes.clear();
        self.floating_nodes.clear();
        self
    }

    /// Split this node into its detached self and its children, in visit order
    pub(crate) fn into_parts(mut self) -> (Node, Vec<Node>) {
        let mut children = std::mem::take(&mut self.nodes);
        children.append(&mut self.floating_nodes);
        (self, children)
    }
}

/// The focused client as seen by the mirror
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ActiveClient {
    pub id: i64,
    pub title: String,
    pub class: String,
}

/// The focused workspace as seen by the mirror
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ActiveWorkspace {
    pub id: i64,
    pub name: String,
}

/// What currently has focus
///
/// This is a cache kept current by the event handlers, not something derived
/// from the entity maps on read. A closed client stays here until the next
/// focus change.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ActiveState {
    pub client: ActiveClient,
    /// Name of the focused output
    pub monitor: String,
    pub workspace: ActiveWorkspace,
}

impl ActiveClient {
    pub(crate) fn from_node(node: &Node) -> Self {
        Self {
            id: node.id,
            title: node.name.clone(),
            class: node.derived_class(),
        }
    }
}

impl ActiveWorkspace {
    pub(crate) fn from_node(node: &Node) -> Self {
        Self {
            id: node.id,
            name: node.name.clone(),
        }
    }
}
