use anyhow::{bail, Result};
use std::collections::HashMap;

/// Name of the implicit root context. Always reachable from every other
/// context, regardless of detachment boundaries in between.
pub const GLOBAL_CONTEXT: &str = "Global";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u32);

impl ContextId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declarative description of one context and its children. Top-level
/// declarations become children of the implicit `Global` root.
#[derive(Debug, Clone)]
pub struct ContextDecl {
    pub name: String,
    pub detached: bool,
    pub children: Vec<ContextDecl>,
}

impl ContextDecl {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), detached: false, children: Vec::new() }
    }

    /// A detached context blocks ancestor visibility past itself: actions
    /// owned above it are not reachable from it or its descendants.
    pub fn detached(name: &str) -> Self {
        Self { name: name.to_string(), detached: true, children: Vec::new() }
    }

    pub fn with_children(mut self, children: Vec<ContextDecl>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug)]
struct ContextNode {
    name: String,
    path: String,
    detached: bool,
    parent: Option<ContextId>,
    children: Vec<ContextId>,
}

/// Static, immutable hierarchy of named scopes. Built once at startup and
/// read-only thereafter; share it via `Arc`.
#[derive(Debug)]
pub struct ContextTree {
    nodes: Vec<ContextNode>,
    by_path: HashMap<String, ContextId>,
    global: ContextId,
}

impl ContextTree {
    pub fn build(decls: &[ContextDecl]) -> Result<Self> {
        let global = ContextId(0);
        let mut tree = Self {
            nodes: vec![ContextNode {
                name: GLOBAL_CONTEXT.to_string(),
                path: GLOBAL_CONTEXT.to_string(),
                detached: false,
                parent: None,
                children: Vec::new(),
            }],
            by_path: HashMap::from([(GLOBAL_CONTEXT.to_string(), global)]),
            global,
        };
        for decl in decls {
            tree.insert(global, decl)?;
        }
        Ok(tree)
    }

    fn insert(&mut self, parent: ContextId, decl: &ContextDecl) -> Result<ContextId> {
        if decl.name.is_empty() {
            bail!("Context under '{}' has an empty name", self.path(parent));
        }
        if decl.name.contains('/') {
            bail!("Context name '{}' must not contain '/'", decl.name);
        }
        if decl.name == GLOBAL_CONTEXT {
            bail!("'{GLOBAL_CONTEXT}' is the implicit root and cannot be redeclared");
        }
        let path = if parent == self.global {
            decl.name.clone()
        } else {
            format!("{}/{}", self.nodes[parent.index()].path, decl.name)
        };
        if self.by_path.contains_key(&path) {
            bail!("Duplicate context path '{path}'");
        }
        let id = ContextId(self.nodes.len() as u32);
        self.nodes.push(ContextNode {
            name: decl.name.clone(),
            path: path.clone(),
            detached: decl.detached,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.by_path.insert(path, id);
        self.nodes[parent.index()].children.push(id);
        for child in &decl.children {
            self.insert(id, child)?;
        }
        Ok(id)
    }

    pub fn global(&self) -> ContextId {
        self.global
    }

    pub fn find(&self, path: &str) -> Option<ContextId> {
        self.by_path.get(path).copied()
    }

    pub fn path(&self, id: ContextId) -> &str {
        &self.nodes[id.index()].path
    }

    pub fn name(&self, id: ContextId) -> &str {
        &self.nodes[id.index()].name
    }

    pub fn is_detached(&self, id: ContextId) -> bool {
        self.nodes[id.index()].detached
    }

    pub fn parent(&self, id: ContextId) -> Option<ContextId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: ContextId) -> &[ContextId] {
        &self.nodes[id.index()].children
    }

    pub fn contains(&self, id: ContextId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Strict, detachment-aware ancestry. True when `a` lies on `b`'s
    /// parent chain and no context strictly between them (inclusive of
    /// `b`, exclusive of `a`) is detached. `Global` is always an ancestor.
    pub fn is_ancestor_of(&self, a: ContextId, b: ContextId) -> bool {
        if a == self.global {
            return true;
        }
        if a == b {
            return false;
        }
        let mut cur = b;
        loop {
            if self.nodes[cur.index()].detached {
                return false;
            }
            match self.nodes[cur.index()].parent {
                Some(parent) if parent == a => return true,
                Some(parent) => cur = parent,
                None => return false,
            }
        }
    }

    /// Raw parent-chain ancestry with detachment ignored. Used by actions
    /// that are allowed to reach across detachment boundaries.
    pub fn is_raw_ancestor_of(&self, a: ContextId, b: ContextId) -> bool {
        if a == self.global {
            return true;
        }
        let mut cur = b;
        while let Some(parent) = self.nodes[cur.index()].parent {
            if parent == a {
                return true;
            }
            cur = parent;
        }
        false
    }

    /// True when an action owned by `target` may be invoked while `invoker`
    /// is the current context: same context, the `Global` root, or a
    /// detachment-respecting ancestor.
    pub fn can_access(&self, invoker: ContextId, target: ContextId) -> bool {
        invoker == target || target == self.global || self.is_ancestor_of(target, invoker)
    }

    pub fn contexts(&self) -> impl Iterator<Item = ContextId> + '_ {
        (0..self.nodes.len() as u32).map(ContextId)
    }
}
