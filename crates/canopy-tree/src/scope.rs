use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("local id must not be empty")]
    EmptyLocalId,
    #[error("duplicate local id '{local_id}' under '{parent_path}'")]
    DuplicateChildId {
        parent_path: String,
        local_id: String,
    },
}

/// A handle to one node of the synthesis tree.
///
/// Handles are cheap to clone and share the underlying node. Trees are built
/// within a single synthesis pass on one thread; handles are deliberately not
/// `Send`.
#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

struct ScopeInner {
    local_id: String,
    parent: Option<Weak<ScopeInner>>,
    children: RefCell<BTreeMap<String, Scope>>,
    attachment: RefCell<Option<Rc<dyn Any>>>,
}

impl Scope {
    /// Create the anonymous root of a new synthesis session.
    pub fn root() -> Self {
        Scope(Rc::new(ScopeInner {
            local_id: String::new(),
            parent: None,
            children: RefCell::new(BTreeMap::new()),
            attachment: RefCell::new(None),
        }))
    }

    /// Register a child node under `local_id`.
    ///
    /// Local ids are unique among siblings; registering the same id twice
    /// under one parent fails with [`TreeError::DuplicateChildId`].
    pub fn child(&self, local_id: &str) -> Result<Scope, TreeError> {
        let trimmed = local_id.trim();
        if trimmed.is_empty() {
            return Err(TreeError::EmptyLocalId);
        }

        let mut children = self.0.children.borrow_mut();
        if children.contains_key(trimmed) {
            return Err(TreeError::DuplicateChildId {
                parent_path: self.path_string(),
                local_id: trimmed.to_owned(),
            });
        }

        let child = Scope(Rc::new(ScopeInner {
            local_id: trimmed.to_owned(),
            parent: Some(Rc::downgrade(&self.0)),
            children: RefCell::new(BTreeMap::new()),
            attachment: RefCell::new(None),
        }));
        children.insert(trimmed.to_owned(), child.clone());
        Ok(child)
    }

    pub fn local_id(&self) -> &str {
        &self.0.local_id
    }

    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    pub fn parent(&self) -> Option<Scope> {
        self.0
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Scope)
    }

    /// Whether two handles refer to the same tree node.
    pub fn same_node(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Ancestors of this node, nearest first, up to and including the root.
    pub fn ancestors(&self) -> Vec<Scope> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            out.push(node);
        }
        out
    }

    /// Local ids from the session root (exclusive) down to this node.
    ///
    /// Stable for the lifetime of the tree: parents and local ids never
    /// change after registration.
    pub fn path_segments(&self) -> Vec<String> {
        let mut segments: Vec<String> = Vec::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if !node.is_root() {
                segments.push(node.local_id().to_owned());
            }
            current = node.parent();
        }
        segments.reverse();
        segments
    }

    /// Local ids below `ancestor` down to this node, or `None` if `ancestor`
    /// is not on this node's root path.
    pub fn path_segments_from(&self, ancestor: &Scope) -> Option<Vec<String>> {
        let mut segments: Vec<String> = Vec::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.same_node(ancestor) {
                segments.reverse();
                return Some(segments);
            }
            if node.is_root() {
                return None;
            }
            segments.push(node.local_id().to_owned());
            current = node.parent();
        }
        None
    }

    /// Slash-joined absolute path, `/` for the root.
    pub fn path_string(&self) -> String {
        let segments = self.path_segments();
        if segments.is_empty() {
            "/".to_owned()
        } else {
            format!("/{}", segments.join("/"))
        }
    }

    /// Children in stable (lexicographic local-id) order.
    pub fn children(&self) -> Vec<Scope> {
        self.0.children.borrow().values().cloned().collect()
    }

    /// Attach a typed value to this node, replacing any previous attachment.
    pub fn attach<T: 'static>(&self, value: Rc<T>) {
        let erased: Rc<dyn Any> = value;
        *self.0.attachment.borrow_mut() = Some(erased);
    }

    /// Find the nearest attachment of type `T` on this node or an ancestor.
    pub fn find_ancestor<T: 'static>(&self) -> Option<Rc<T>> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            let attached = node.0.attachment.borrow().clone();
            if let Some(any) = attached {
                if let Ok(typed) = any.downcast::<T>() {
                    return Some(typed);
                }
            }
            current = node.parent();
        }
        None
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("path", &self.path_string())
            .finish()
    }
}
