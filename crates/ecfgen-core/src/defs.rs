//! In-memory definition tree.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use tracing::debug;

use crate::{DefKind, DefinitionTree, Error, NodeHandle, Result};

/// A suite, family or task held by [`Defs`].
#[derive(Debug, Clone)]
pub struct DefNode {
    kind: DefKind,
    name: String,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
    edits: Vec<(String, String)>,
    events: Vec<String>,
    trigger: Option<String>,
    detached: bool,
}

impl DefNode {
    fn new(kind: DefKind, name: &str, parent: Option<NodeHandle>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            parent,
            children: Vec::new(),
            edits: Vec::new(),
            events: Vec::new(),
            trigger: None,
            detached: false,
        }
    }

    pub fn kind(&self) -> DefKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Variables in insertion order.
    pub fn edits(&self) -> &[(String, String)] {
        &self.edits
    }

    /// Value of a single variable.
    pub fn edit(&self, key: &str) -> Option<&str> {
        self.edits
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn trigger(&self) -> Option<&str> {
        self.trigger.as_deref()
    }
}

/// An ecFlow definition: externs plus an ordered set of suites.
///
/// Nodes live in an arena and are addressed by [`NodeHandle`]. Discarded
/// suites stay in the arena but are unreachable and reject further calls.
#[derive(Debug, Clone, Default)]
pub struct Defs {
    nodes: Vec<DefNode>,
    suites: Vec<NodeHandle>,
    externs: Vec<String>,
}

impl Defs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live suites in creation order.
    pub fn suites(&self) -> &[NodeHandle] {
        &self.suites
    }

    pub fn externs(&self) -> &[String] {
        &self.externs
    }

    /// Look up a live node.
    pub fn node(&self, handle: NodeHandle) -> Option<&DefNode> {
        self.nodes
            .get(handle.index())
            .filter(|node| !node.detached)
    }

    /// Find a node by its `/`-separated path, e.g. `suite1/fam1/t1`.
    /// A leading `/` is accepted.
    pub fn find(&self, path: &str) -> Option<NodeHandle> {
        let mut parts = path.trim_start_matches('/').split('/');
        let first = parts.next()?;
        let mut current = self
            .suites
            .iter()
            .copied()
            .find(|h| self.nodes[h.index()].name == first)?;
        for part in parts {
            current = self.child_named(current, part)?;
        }
        Some(current)
    }

    /// Absolute ecFlow path of a node, e.g. `/suite1/fam1/t1`.
    pub fn abs_path(&self, handle: NodeHandle) -> String {
        let mut names = Vec::new();
        let mut cursor = Some(handle);
        while let Some(h) = cursor {
            let Some(node) = self.nodes.get(h.index()) else {
                break;
            };
            names.push(node.name.as_str());
            cursor = node.parent;
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Number of live suites, families and tasks.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| !n.detached).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nested, serializable copy of the definition.
    pub fn export(&self) -> DefsDocument {
        DefsDocument {
            externs: self.externs.clone(),
            suites: self.suites.iter().map(|h| self.export_node(*h)).collect(),
        }
    }

    fn export_node(&self, handle: NodeHandle) -> ExportedNode {
        let node = &self.nodes[handle.index()];
        ExportedNode {
            kind: node.kind,
            name: node.name.clone(),
            edits: node.edits.clone(),
            events: node.events.clone(),
            trigger: node.trigger.clone(),
            children: node
                .children
                .iter()
                .map(|h| self.export_node(*h))
                .collect(),
        }
    }

    fn child_named(&self, parent: NodeHandle, name: &str) -> Option<NodeHandle> {
        self.nodes[parent.index()]
            .children
            .iter()
            .copied()
            .find(|h| self.nodes[h.index()].name == name)
    }

    fn live(&self, handle: NodeHandle) -> Result<&DefNode> {
        self.node(handle)
            .ok_or_else(|| Error::NotFound(format!("definition node {}", handle)))
    }

    fn live_mut(&mut self, handle: NodeHandle) -> Result<&mut DefNode> {
        match self.nodes.get_mut(handle.index()) {
            Some(node) if !node.detached => Ok(node),
            _ => Err(Error::NotFound(format!("definition node {}", handle))),
        }
    }

    fn push(&mut self, node: DefNode) -> NodeHandle {
        self.nodes.push(node);
        NodeHandle::from_index(self.nodes.len() - 1)
    }

    fn add_child(&mut self, parent: NodeHandle, kind: DefKind, name: &str) -> Result<NodeHandle> {
        let parent_node = self.live(parent)?;
        if !parent_node.kind.is_container() {
            return Err(Error::InvalidOperation(format!(
                "cannot add {} '{}' to {} {}",
                kind,
                name,
                parent_node.kind,
                self.abs_path(parent)
            )));
        }

        if let Some(existing) = self.child_named(parent, name) {
            let existing_kind = self.nodes[existing.index()].kind;
            if existing_kind == kind {
                return Ok(existing);
            }
            return Err(Error::InvalidOperation(format!(
                "{} already holds a {} named '{}'",
                self.abs_path(parent),
                existing_kind,
                name
            )));
        }

        let handle = self.push(DefNode::new(kind, name, Some(parent)));
        self.nodes[parent.index()].children.push(handle);
        debug!("added {} {}", kind, self.abs_path(handle));
        Ok(handle)
    }

    fn write_node(&self, out: &mut String, handle: NodeHandle, depth: usize) -> fmt::Result {
        let node = &self.nodes[handle.index()];
        let pad = "  ".repeat(depth);
        let inner = "  ".repeat(depth + 1);

        writeln!(out, "{}{} {}", pad, node.kind, node.name)?;
        for (key, value) in &node.edits {
            writeln!(out, "{}edit {} {}", inner, key, quote_value(value))?;
        }
        if let Some(trigger) = &node.trigger {
            writeln!(out, "{}trigger {}", inner, trigger)?;
        }
        for event in &node.events {
            writeln!(out, "{}event {}", inner, event)?;
        }
        for child in &node.children {
            self.write_node(out, *child, depth + 1)?;
        }
        match node.kind {
            DefKind::Suite => writeln!(out, "{}endsuite", pad),
            DefKind::Family => writeln!(out, "{}endfamily", pad),
            DefKind::Task => Ok(()),
        }
    }
}

impl DefinitionTree for Defs {
    fn create_suite(&mut self, name: &str) -> Result<NodeHandle> {
        if self
            .suites
            .iter()
            .any(|h| self.nodes[h.index()].name == name)
        {
            return Err(Error::InvalidOperation(format!(
                "suite /{} already exists",
                name
            )));
        }
        let handle = self.push(DefNode::new(DefKind::Suite, name, None));
        self.suites.push(handle);
        debug!("added suite /{}", name);
        Ok(handle)
    }

    fn add_family(&mut self, parent: NodeHandle, name: &str) -> Result<NodeHandle> {
        self.add_child(parent, DefKind::Family, name)
    }

    fn add_task(&mut self, parent: NodeHandle, name: &str) -> Result<NodeHandle> {
        self.add_child(parent, DefKind::Task, name)
    }

    fn add_edit(&mut self, node: NodeHandle, key: &str, value: &str) -> Result<()> {
        let target = self.live_mut(node)?;
        match target.edits.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => target.edits.push((key.to_string(), value.to_string())),
        }
        debug!("added edit {}={} to {}", key, value, self.abs_path(node));
        Ok(())
    }

    fn add_event(&mut self, node: NodeHandle, name: &str) -> Result<()> {
        let path = self.abs_path(node);
        let target = self.live_mut(node)?;
        if target.kind == DefKind::Suite {
            return Err(Error::InvalidOperation(format!(
                "suites cannot hold events (event '{}' on {})",
                name, path
            )));
        }
        if !target.events.iter().any(|e| e == name) {
            target.events.push(name.to_string());
        }
        debug!("added event {} to {}", name, path);
        Ok(())
    }

    fn add_trigger(&mut self, node: NodeHandle, expression: &str) -> Result<()> {
        let path = self.abs_path(node);
        let target = self.live_mut(node)?;
        if target.kind == DefKind::Suite {
            return Err(Error::InvalidOperation(format!(
                "suites cannot hold triggers (trigger '{}' on {})",
                expression, path
            )));
        }
        if let Some(existing) = &target.trigger {
            return Err(Error::TriggerConflict {
                node: path,
                existing: existing.clone(),
                attempted: expression.to_string(),
            });
        }
        target.trigger = Some(expression.to_string());
        debug!("added trigger [{}] to {}", expression, path);
        Ok(())
    }

    fn add_extern(&mut self, path: &str) -> Result<()> {
        if !self.externs.iter().any(|e| e == path) {
            self.externs.push(path.to_string());
        }
        Ok(())
    }

    fn discard_suite(&mut self, suite: NodeHandle) -> Result<()> {
        if self.live(suite)?.kind != DefKind::Suite {
            return Err(Error::InvalidOperation(format!(
                "{} is not a suite",
                self.abs_path(suite)
            )));
        }

        let mut stack = vec![suite];
        while let Some(handle) = stack.pop() {
            let node = &mut self.nodes[handle.index()];
            node.detached = true;
            stack.extend(node.children.iter().copied());
        }
        self.suites.retain(|h| *h != suite);
        debug!("discarded suite {}", self.abs_path(suite));
        Ok(())
    }
}

/// Quote an edit value for the `.def` format: single quotes unless the
/// value holds one, then double quotes with `"` and `\` escaped.
fn quote_value(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Renders the ecFlow text definition format.
impl fmt::Display for Defs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for path in &self.externs {
            writeln!(out, "extern {}", path)?;
        }
        for suite in &self.suites {
            self.write_node(&mut out, *suite, 0)?;
        }
        f.write_str(&out)
    }
}

/// Serializable snapshot of a [`Defs`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefsDocument {
    pub externs: Vec<String>,
    pub suites: Vec<ExportedNode>,
}

/// Serializable snapshot of one definition node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedNode {
    pub kind: DefKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExportedNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Defs, NodeHandle, NodeHandle, NodeHandle) {
        let mut defs = Defs::new();
        let suite = defs.create_suite("s1").unwrap();
        let family = defs.add_family(suite, "f1").unwrap();
        let task = defs.add_task(family, "t1").unwrap();
        (defs, suite, family, task)
    }

    #[test]
    fn test_build_and_find() {
        let (defs, suite, family, task) = sample();
        assert_eq!(defs.find("s1"), Some(suite));
        assert_eq!(defs.find("/s1/f1"), Some(family));
        assert_eq!(defs.find("s1/f1/t1"), Some(task));
        assert_eq!(defs.find("s1/missing"), None);
        assert_eq!(defs.abs_path(task), "/s1/f1/t1");
        assert_eq!(defs.len(), 3);
    }

    #[test]
    fn test_readding_child_returns_existing() {
        let (mut defs, suite, family, _) = sample();
        assert_eq!(defs.add_family(suite, "f1").unwrap(), family);
        assert_eq!(defs.len(), 3);
    }

    #[test]
    fn test_duplicate_suite_is_rejected() {
        let (mut defs, suite, _, _) = sample();
        assert!(matches!(
            defs.create_suite("s1"),
            Err(Error::InvalidOperation(_))
        ));
        assert_eq!(defs.suites(), [suite]);

        // a discarded suite frees its name
        defs.discard_suite(suite).unwrap();
        let again = defs.create_suite("s1").unwrap();
        assert_ne!(again, suite);
        assert_eq!(defs.find("s1"), Some(again));
    }

    #[test]
    fn test_kind_clash_is_rejected() {
        let (mut defs, suite, _, _) = sample();
        let result = defs.add_task(suite, "f1");
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_task_cannot_hold_children() {
        let (mut defs, _, _, task) = sample();
        assert!(matches!(
            defs.add_family(task, "nested"),
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(
            defs.add_task(task, "nested"),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_edit_replaces_value() {
        let (mut defs, suite, _, _) = sample();
        defs.add_edit(suite, "ECF_HOME", "/a").unwrap();
        defs.add_edit(suite, "ECF_HOME", "/b").unwrap();
        let node = defs.node(suite).unwrap();
        assert_eq!(node.edits().len(), 1);
        assert_eq!(node.edit("ECF_HOME"), Some("/b"));
    }

    #[test]
    fn test_second_trigger_conflicts() {
        let (mut defs, _, _, task) = sample();
        defs.add_trigger(task, "a == complete").unwrap();
        let err = defs.add_trigger(task, "b == complete").unwrap_err();
        match err {
            Error::TriggerConflict {
                node,
                existing,
                attempted,
            } => {
                assert_eq!(node, "/s1/f1/t1");
                assert_eq!(existing, "a == complete");
                assert_eq!(attempted, "b == complete");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(defs.node(task).unwrap().trigger(), Some("a == complete"));
    }

    #[test]
    fn test_suite_rejects_trigger_and_event() {
        let (mut defs, suite, _, _) = sample();
        assert!(defs.add_trigger(suite, "x == complete").is_err());
        assert!(defs.add_event(suite, "ready").is_err());
    }

    #[test]
    fn test_duplicate_event_ignored() {
        let (mut defs, _, _, task) = sample();
        defs.add_event(task, "ready").unwrap();
        defs.add_event(task, "ready").unwrap();
        assert_eq!(defs.node(task).unwrap().events(), ["ready".to_string()]);
    }

    #[test]
    fn test_discard_suite() {
        let (mut defs, suite, family, task) = sample();
        let other = defs.create_suite("s2").unwrap();
        defs.discard_suite(suite).unwrap();

        assert_eq!(defs.suites(), [other]);
        assert!(defs.node(family).is_none());
        assert!(defs.find("s1/f1/t1").is_none());
        assert!(matches!(
            defs.add_edit(task, "X", "1"),
            Err(Error::NotFound(_))
        ));
        assert!(defs.discard_suite(other).is_ok());
        assert!(defs.is_empty());
    }

    #[test]
    fn test_discard_requires_suite() {
        let (mut defs, _, family, _) = sample();
        assert!(matches!(
            defs.discard_suite(family),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_render_def_format() {
        let (mut defs, suite, family, task) = sample();
        defs.add_extern("/other/task").unwrap();
        defs.add_edit(suite, "ECF_HOME", "/home/ecf").unwrap();
        defs.add_edit(family, "MEMBER", "3").unwrap();
        defs.add_trigger(task, "/other/task == complete").unwrap();
        defs.add_event(task, "release").unwrap();
        defs.add_task(suite, "t2").unwrap();

        let expected = "\
extern /other/task
suite s1
  edit ECF_HOME '/home/ecf'
  family f1
    edit MEMBER '3'
    task t1
      trigger /other/task == complete
      event release
  endfamily
  task t2
endsuite
";
        assert_eq!(defs.to_string(), expected);
    }

    #[test]
    fn test_render_quotes_edit_values() {
        let (mut defs, suite, _, _) = sample();
        defs.add_edit(suite, "MSG", "it's").unwrap();
        defs.add_edit(suite, "MIXED", r#"it's "done""#).unwrap();
        defs.add_edit(suite, "PLAIN", r#"say "hi""#).unwrap();

        let text = defs.to_string();
        assert!(text.contains(r#"  edit MSG "it's""#));
        assert!(text.contains(r#"  edit MIXED "it's \"done\"""#));
        assert!(text.contains(r#"  edit PLAIN 'say "hi"'"#));
    }

    #[test]
    fn test_export_serializes() {
        let (mut defs, _, _, task) = sample();
        defs.add_event(task, "go").unwrap();
        let doc = defs.export();
        assert_eq!(doc.suites.len(), 1);
        assert_eq!(doc.suites[0].children[0].children[0].events, vec!["go"]);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["suites"][0]["kind"], "suite");
        assert_eq!(json["suites"][0]["children"][0]["children"][0]["name"], "t1");
        assert!(json["suites"][0].get("trigger").is_none());
    }
}
