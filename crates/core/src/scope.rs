//! Variable scopes for include resolution.
//!
//! A scope is an immutable overlay chain: each include directive that
//! carries its own variables pushes a frame on top of the parent's chain,
//! and lookups walk from the innermost frame outwards. Sibling includes
//! each overlay the same parent and never see one another's bindings.

use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug)]
struct Frame {
    bindings: HashMap<String, String>,
    parent: Option<Rc<Frame>>,
}

/// A cheap-to-clone handle to one point in the overlay chain.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    frame: Option<Rc<Frame>>,
}

impl Scope {
    /// The scope with no bindings at all.
    #[must_use]
    pub fn empty() -> Self {
        Self { frame: None }
    }

    /// A root scope holding the processor-level bindings.
    #[must_use]
    pub fn root(bindings: HashMap<String, String>) -> Self {
        Self::empty().overlay(bindings)
    }

    /// A child scope whose `additions` shadow the parent's bindings.
    #[must_use]
    pub fn overlay(&self, additions: HashMap<String, String>) -> Self {
        if additions.is_empty() {
            return self.clone();
        }
        Self {
            frame: Some(Rc::new(Frame {
                bindings: additions,
                parent: self.frame.clone(),
            })),
        }
    }

    /// Innermost binding for `name`, if any frame holds one.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let mut frame = self.frame.as_deref();
        while let Some(current) = frame {
            if let Some(value) = current.bindings.get(name) {
                return Some(value);
            }
            frame = current.parent.as_deref();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn lookup_in_root() {
        let scope = Scope::root(bindings(&[("GREET", "Hello"), ("NAME", "Earth")]));
        assert_eq!(scope.lookup("GREET"), Some("Hello"));
        assert_eq!(scope.lookup("NAME"), Some("Earth"));
        assert_eq!(scope.lookup("MISSING"), None);
    }

    #[test]
    fn overlay_shadows_parent() {
        let root = Scope::root(bindings(&[("NAME", "Earth"), ("GREET", "Hello")]));
        let child = root.overlay(bindings(&[("NAME", "Venus")]));
        assert_eq!(child.lookup("NAME"), Some("Venus"));
        assert_eq!(child.lookup("GREET"), Some("Hello"));
        assert_eq!(root.lookup("NAME"), Some("Earth"));
    }

    #[test]
    fn sibling_overlays_are_independent() {
        let root = Scope::root(bindings(&[("NAME", "Earth")]));
        let venus = root.overlay(bindings(&[("NAME", "Venus")]));
        let mars = root.overlay(bindings(&[("NAME", "Mars")]));
        assert_eq!(venus.lookup("NAME"), Some("Venus"));
        assert_eq!(mars.lookup("NAME"), Some("Mars"));
    }

    #[test]
    fn empty_overlay_is_the_same_scope() {
        let root = Scope::root(bindings(&[("NAME", "Earth")]));
        let child = root.overlay(HashMap::new());
        assert_eq!(child.lookup("NAME"), Some("Earth"));
    }

    #[test]
    fn empty_scope_has_no_bindings() {
        assert_eq!(Scope::empty().lookup("ANYTHING"), None);
    }
}
