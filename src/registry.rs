use crate::action::{
    ActionId, ActionPriority, BehaviorFactory, BehaviorInstance, BehaviorKind,
    DescendantUsability, ShortcutPolicy,
};
use crate::context::{ContextId, ContextTree};
use crate::shortcut::{RebindFile, Shortcut};
use anyhow::{bail, Context as _, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Registration input for one action kind. Contexts are attached by
/// explicit `ContextId`, never inferred from names.
pub struct ActionSpec<S: 'static> {
    pub id: ActionId,
    pub context: ContextId,
    pub kind: BehaviorKind,
    pub usability: DescendantUsability,
    pub shortcut_policy: ShortcutPolicy,
    pub priority: ActionPriority,
    /// Always enqueue in the forced arbitration lane, above High.
    pub forced_conflict: bool,
    pub undoable: bool,
    pub shortcut: Option<Shortcut>,
    pub behavior: BehaviorFactory<S>,
}

/// Static metadata for one registered action kind. Immutable after
/// registration except for the shortcut override, which only changes
/// through [`ActionRegistry::rebind`].
pub struct ActionDescriptor<S: 'static> {
    pub id: ActionId,
    pub context: ContextId,
    pub kind: BehaviorKind,
    pub usability: DescendantUsability,
    pub shortcut_policy: ShortcutPolicy,
    pub priority: ActionPriority,
    pub forced_conflict: bool,
    pub undoable: bool,
    default_shortcut: Option<Shortcut>,
    override_shortcut: Option<Shortcut>,
    behavior: BehaviorFactory<S>,
}

impl<S: 'static> ActionDescriptor<S> {
    pub fn default_shortcut(&self) -> Option<&Shortcut> {
        self.default_shortcut.as_ref()
    }

    /// The override if one is set, else the default binding.
    pub fn effective_shortcut(&self) -> Option<&Shortcut> {
        self.override_shortcut.as_ref().or(self.default_shortcut.as_ref())
    }

    pub fn is_rebound(&self) -> bool {
        self.override_shortcut.is_some()
    }

    pub(crate) fn instantiate(&self) -> BehaviorInstance<S> {
        self.behavior.instantiate()
    }
}

/// Explicitly constructed action table, owned by the application root and
/// injected into the dispatcher. No ambient statics.
pub struct ActionRegistry<S: 'static> {
    tree: Arc<ContextTree>,
    index: HashMap<ActionId, usize>,
    actions: Vec<ActionDescriptor<S>>,
}

impl<S: 'static> ActionRegistry<S> {
    pub fn new(tree: Arc<ContextTree>) -> Self {
        Self { tree, index: HashMap::new(), actions: Vec::new() }
    }

    pub fn tree(&self) -> &Arc<ContextTree> {
        &self.tree
    }

    /// Validates and stores a descriptor. Every rejection here is a
    /// configuration fault and should abort startup.
    pub fn register(&mut self, spec: ActionSpec<S>) -> Result<()> {
        if self.index.contains_key(&spec.id) {
            bail!("Action '{}' is already registered", spec.id);
        }
        if !self.tree.contains(spec.context) {
            bail!("Action '{}' references a context outside the tree", spec.id);
        }
        if spec.kind.is_long() != spec.behavior.is_long() {
            bail!(
                "Action '{}' is {:?} but its behavior factory builds the other contract",
                spec.id,
                spec.kind
            );
        }
        match spec.shortcut_policy {
            ShortcutPolicy::Unbound => {
                if spec.shortcut.is_some() {
                    bail!("Action '{}' is unbound but declares a default shortcut", spec.id);
                }
            }
            ShortcutPolicy::Rebindable | ShortcutPolicy::Locked => {
                if spec.shortcut.is_none() {
                    bail!("Action '{}' is shortcut-bound but has no default shortcut", spec.id);
                }
            }
        }
        self.index.insert(spec.id, self.actions.len());
        self.actions.push(ActionDescriptor {
            id: spec.id,
            context: spec.context,
            kind: spec.kind,
            usability: spec.usability,
            shortcut_policy: spec.shortcut_policy,
            priority: spec.priority,
            forced_conflict: spec.forced_conflict,
            undoable: spec.undoable,
            default_shortcut: spec.shortcut,
            override_shortcut: None,
            behavior: spec.behavior,
        });
        Ok(())
    }

    pub fn lookup(&self, id: ActionId) -> Option<&ActionDescriptor<S>> {
        self.index.get(&id).map(|&slot| &self.actions[slot])
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Descriptors in declaration order; the dispatcher relies on this
    /// order as the stable arbitration tie-break.
    pub fn iter(&self) -> impl Iterator<Item = &ActionDescriptor<S>> {
        self.actions.iter()
    }

    pub fn all_in(&self, context: ContextId) -> impl Iterator<Item = &ActionDescriptor<S>> {
        self.actions.iter().filter(move |desc| desc.context == context)
    }

    /// Replaces the effective shortcut of a rebindable action. Locked and
    /// unbound actions reject the rebind with no state change.
    pub fn rebind(&mut self, id: ActionId, shortcut: Shortcut) -> Result<()> {
        let Some(&slot) = self.index.get(&id) else {
            bail!("Cannot rebind unknown action '{id}'");
        };
        let desc = &mut self.actions[slot];
        match desc.shortcut_policy {
            ShortcutPolicy::Locked => bail!("Shortcut for '{id}' is locked"),
            ShortcutPolicy::Unbound => bail!("Action '{id}' takes no shortcut"),
            ShortcutPolicy::Rebindable => {
                log::debug!("rebinding '{id}' to {shortcut}");
                desc.override_shortcut = Some(shortcut);
                Ok(())
            }
        }
    }

    /// Drops the override and restores the default binding.
    pub fn clear_rebind(&mut self, id: ActionId) -> Result<()> {
        let Some(&slot) = self.index.get(&id) else {
            bail!("Cannot rebind unknown action '{id}'");
        };
        self.actions[slot].override_shortcut = None;
        Ok(())
    }

    /// Applies a rebind file leniently: unknown actions, unparsable
    /// shortcuts and non-rebindable targets are skipped with a diagnostic
    /// and the defaults kept. A missing or malformed file keeps all
    /// defaults.
    pub fn load_rebinds_or_default(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let file = match RebindFile::load(path) {
            Ok(file) => file,
            Err(err) => {
                eprintln!(
                    "[shortcuts] Failed to load {}: {err}. Keeping default bindings.",
                    path.display()
                );
                return;
            }
        };
        for (name, raw) in &file.bindings {
            let id = match self.iter().find(|desc| desc.id.0 == name.as_str()) {
                Some(desc) => desc.id,
                None => {
                    eprintln!("[shortcuts] {}: unknown action '{name}', ignoring.", path.display());
                    continue;
                }
            };
            let shortcut = match Shortcut::parse(raw) {
                Ok(shortcut) => shortcut,
                Err(err) => {
                    eprintln!("[shortcuts] {}: {err}, ignoring '{name}'.", path.display());
                    continue;
                }
            };
            if let Err(err) = self.rebind(id, shortcut) {
                eprintln!("[shortcuts] {}: {err}, ignoring '{name}'.", path.display());
            }
        }
    }

    /// Writes the current overrides (only) to the rebind file.
    pub fn save_rebinds(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = RebindFile::default();
        for desc in &self.actions {
            if let Some(shortcut) = &desc.override_shortcut {
                file.bindings.insert(desc.id.0.to_string(), shortcut.to_string());
            }
        }
        file.save(path).with_context(|| format!("Failed to write {}", path.display()))
    }
}
