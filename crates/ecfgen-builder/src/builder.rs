//! Definition builder - applies configuration trees to a definition tree.

use ecfgen_config::{ConfigDocument, ConfigNode, ConfigTree, EnvironmentResolver};
use ecfgen_core::{DefKind, DefinitionTree, NodeHandle};
use tracing::{debug, error, info, warn};

use crate::{BuildError, BuildResult};

/// Outcome of building one suite.
#[derive(Debug)]
pub enum SuiteState {
    Built,
    Failed(BuildError),
}

impl SuiteState {
    pub fn is_success(&self) -> bool {
        matches!(self, SuiteState::Built)
    }
}

/// Result of building a whole document.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Per-suite outcome, in document order.
    pub suite_states: Vec<(String, SuiteState)>,
}

impl BuildReport {
    pub fn success(&self) -> bool {
        self.suite_states.iter().all(|(_, state)| state.is_success())
    }

    /// Names of suites that were built.
    pub fn built(&self) -> impl Iterator<Item = &str> {
        self.suite_states
            .iter()
            .filter(|(_, state)| state.is_success())
            .map(|(name, _)| name.as_str())
    }

    /// Suites that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &BuildError)> {
        self.suite_states.iter().filter_map(|(name, state)| match state {
            SuiteState::Failed(err) => Some((name.as_str(), err)),
            SuiteState::Built => None,
        })
    }
}

/// Applies configuration trees to a [`DefinitionTree`].
///
/// Each node of a suite is visited pre-order and processed in a fixed
/// order: family attachment, edits, events, tasks, triggers. A parent is
/// therefore always bound to a definition object before its attribute
/// containers are reached.
pub struct DefinitionBuilder<'d, T: DefinitionTree + ?Sized> {
    defs: &'d mut T,
}

impl<'d, T: DefinitionTree + ?Sized> DefinitionBuilder<'d, T> {
    pub fn new(defs: &'d mut T) -> Self {
        Self { defs }
    }

    /// Build every suite of `doc`, resolving `env.` values from the process
    /// environment.
    pub fn build(&mut self, doc: &ConfigDocument) -> BuildResult<BuildReport> {
        self.build_with(doc, &EnvironmentResolver::new())
    }

    /// Build every suite of `doc`.
    ///
    /// A trigger conflict fails only its own suite, which is removed from
    /// the definition tree and recorded in the report. Any other rejection
    /// from the definition tree aborts the run; suites built before it stay.
    pub fn build_with(
        &mut self,
        doc: &ConfigDocument,
        resolver: &EnvironmentResolver,
    ) -> BuildResult<BuildReport> {
        for path in doc.externs() {
            debug!(extern_path = %path, "Adding extern");
            self.defs
                .add_extern(&path)
                .map_err(|source| BuildError::Extern {
                    path: path.clone(),
                    source,
                })?;
        }

        let mut report = BuildReport::default();
        for tree in doc.suites_with(resolver) {
            let name = tree.root().name().to_string();
            match self.build_suite(&tree) {
                Ok(()) => {
                    info!(suite = %name, nodes = tree.len(), "Suite built");
                    report.suite_states.push((name, SuiteState::Built));
                }
                Err(err) if err.is_conflict() => {
                    error!(suite = %name, error = %err, "Suite failed");
                    report.suite_states.push((name, SuiteState::Failed(err)));
                }
                Err(err) => {
                    error!(suite = %name, error = %err, "Aborting build");
                    return Err(err);
                }
            }
        }
        Ok(report)
    }

    /// Build one suite. On failure the partially built suite is discarded
    /// before the error is returned.
    pub fn build_suite(&mut self, tree: &ConfigTree) -> BuildResult<()> {
        let suite = tree.root();
        let result = self.apply_suite(tree);

        if result.is_err() {
            if let Some(handle) = suite.bound_instance() {
                if let Err(err) = self.defs.discard_suite(handle) {
                    warn!(suite = %suite.name(), error = %err, "Failed to discard suite");
                }
            }
        }
        result
    }

    fn apply_suite(&mut self, tree: &ConfigTree) -> BuildResult<()> {
        let suite = tree.root();
        self.instance(suite)?;
        for node in suite.traverse_down() {
            self.apply_node(node)?;
        }
        Ok(())
    }

    /// Apply a single node's own definitions.
    pub fn apply_node(&mut self, node: ConfigNode<'_>) -> BuildResult<()> {
        self.add_family(node)?;
        self.add_edits(node)?;
        self.add_events(node)?;
        self.add_tasks(node)?;
        self.add_triggers(node)
    }

    fn add_family(&mut self, node: ConfigNode<'_>) -> BuildResult<()> {
        if node.role() != Some(DefKind::Family) {
            return Ok(());
        }
        if let Some(parent) = node.definition_parent() {
            debug!(family = %node.name(), parent = %parent.name(), "Adding family");
        }
        self.instance(node)?;
        Ok(())
    }

    fn add_edits(&mut self, node: ConfigNode<'_>) -> BuildResult<()> {
        let edits = node.edits();
        if edits.is_empty() {
            return Ok(());
        }
        let Some(handle) = self.target(node, "edits")? else {
            return Ok(());
        };

        let names: Vec<&str> = edits.iter().map(|e| e.name.as_str()).collect();
        debug!(node = %node, edits = %names.join(","), "Adding edits");
        for edit in &edits {
            self.defs
                .add_edit(handle, &edit.name, &edit.value)
                .map_err(|source| rejected(node, source))?;
        }
        Ok(())
    }

    fn add_events(&mut self, node: ConfigNode<'_>) -> BuildResult<()> {
        let events = node.events();
        if events.is_empty() {
            return Ok(());
        }
        let Some(handle) = self.target(node, "events")? else {
            return Ok(());
        };

        debug!(node = %node, events = %events.join(","), "Adding events");
        for event in &events {
            self.defs
                .add_event(handle, event)
                .map_err(|source| rejected(node, source))?;
        }
        Ok(())
    }

    fn add_tasks(&mut self, node: ConfigNode<'_>) -> BuildResult<()> {
        let tasks = node.tasks();
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<&str> = tasks.iter().map(|t| t.name()).collect();
        debug!(node = %node, tasks = %names.join(","), "Adding tasks");
        for task in tasks {
            if self.instance(task)?.is_none() {
                warn!(
                    task = %task.name(),
                    path = %node.local_path(),
                    "Task has no suite or family to attach to; skipping"
                );
            }
        }
        Ok(())
    }

    fn add_triggers(&mut self, node: ConfigNode<'_>) -> BuildResult<()> {
        let triggers = node.triggers();
        if triggers.is_empty() {
            return Ok(());
        }
        let Some(handle) = self.target(node, "triggers")? else {
            return Ok(());
        };

        for trigger in &triggers {
            debug!(node = %node, trigger = %trigger, "Adding trigger");
            self.defs
                .add_trigger(handle, &trigger.expression)
                .map_err(|source| rejected(node, source))?;
        }
        Ok(())
    }

    /// Definition object for `node`, creating it on first use.
    fn instance(&mut self, node: ConfigNode<'_>) -> BuildResult<Option<NodeHandle>> {
        node.external_instance(&mut *self.defs)
            .map_err(|source| rejected(node, source))
    }

    /// Definition object that should receive `node`'s attributes. Nodes
    /// with no definition counterpart are skipped with a warning.
    fn target(&mut self, node: ConfigNode<'_>, attribute: &str) -> BuildResult<Option<NodeHandle>> {
        let handle = self.instance(node)?;
        if handle.is_none() {
            warn!(
                node = %node,
                path = %node.local_path(),
                "Node has no definition object; ignoring its {}",
                attribute
            );
        }
        Ok(handle)
    }
}

fn rejected(node: ConfigNode<'_>, source: ecfgen_core::Error) -> BuildError {
    let suite = node.root().name().to_string();
    let path = node.local_path();
    match source {
        ecfgen_core::Error::TriggerConflict {
            existing,
            attempted,
            ..
        } => BuildError::TriggerConflict {
            suite,
            path,
            existing,
            attempted,
        },
        source => BuildError::Definition {
            suite,
            path,
            source,
        },
    }
}
