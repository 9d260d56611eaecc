use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A chain of name bindings shared by reference. Cloning a `Scope` clones the
/// handle, so closures and objects see later definitions in the same frame.
pub struct Scope<T> {
    frame: Rc<RefCell<Frame<T>>>,
}

struct Frame<T> {
    parent: Option<Scope<T>>,
    order: Vec<String>,
    values: HashMap<String, T>,
}

impl<T: Clone> Scope<T> {
    pub fn root() -> Self {
        Self::with_parent(None)
    }

    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    fn with_parent(parent: Option<Scope<T>>) -> Self {
        Self {
            frame: Rc::new(RefCell::new(Frame {
                parent,
                order: Vec::new(),
                values: HashMap::new(),
            })),
        }
    }

    /// Binds `name` in this frame. Returns false if it was already bound here.
    pub fn define(&self, name: impl Into<String>, value: T) -> bool {
        let name = name.into();
        let mut frame = self.frame.borrow_mut();
        if frame.values.contains_key(&name) {
            return false;
        }
        frame.order.push(name.clone());
        frame.values.insert(name, value);
        true
    }

    /// Looks `name` up in this frame, and in the parents unless `current_only`.
    pub fn get(&self, name: &str, current_only: bool) -> Option<T> {
        let frame = self.frame.borrow();
        if let Some(value) = frame.values.get(name) {
            return Some(value.clone());
        }
        match &frame.parent {
            Some(parent) if !current_only => parent.get(name, false),
            _ => None,
        }
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.frame.borrow().values.contains_key(name)
    }

    /// Rebinds the nearest existing `name`. Returns false if it is not bound anywhere.
    pub fn set(&self, name: &str, value: T) -> bool {
        let parent = {
            let mut frame = self.frame.borrow_mut();
            if let Some(slot) = frame.values.get_mut(name) {
                *slot = value;
                return true;
            }
            frame.parent.clone()
        };
        match parent {
            Some(parent) => parent.set(name, value),
            None => false,
        }
    }

    /// Bindings of this frame in definition order.
    pub fn entries(&self) -> Vec<(String, T)> {
        let frame = self.frame.borrow();
        frame
            .order
            .iter()
            .filter_map(|name| frame.values.get(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }

    /// Number of bindings in this frame, to pass to [`Scope::truncate`] later.
    pub fn local_count(&self) -> usize {
        self.frame.borrow().order.len()
    }

    /// Drops the bindings of this frame defined after the first `count`.
    pub fn truncate(&self, count: usize) {
        let mut frame = self.frame.borrow_mut();
        if count >= frame.order.len() {
            return;
        }
        let removed = frame.order.split_off(count);
        for name in removed {
            frame.values.remove(&name);
        }
    }

    pub fn ptr_eq(&self, other: &Scope<T>) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }
}

impl<T> Clone for Scope<T> {
    fn clone(&self) -> Self {
        Self {
            frame: Rc::clone(&self.frame),
        }
    }
}

impl<T> fmt::Debug for Scope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Frames can be cyclic through closures, so only names are shown.
        match self.frame.try_borrow() {
            Ok(frame) => f.debug_struct("Scope").field("names", &frame.order).finish(),
            Err(_) => f.write_str("Scope { .. }"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_rejects_local_duplicates_only() {
        let root: Scope<i32> = Scope::root();
        assert!(root.define("x", 1));
        assert!(!root.define("x", 2));

        let child = root.child();
        assert!(child.define("x", 3));
        assert_eq!(child.get("x", true), Some(3));
        assert_eq!(root.get("x", true), Some(1));
    }

    #[test]
    fn test_get_walks_parents_unless_current_only() {
        let root: Scope<i32> = Scope::root();
        root.define("x", 1);
        let child = root.child();
        assert_eq!(child.get("x", false), Some(1));
        assert_eq!(child.get("x", true), None);
    }

    #[test]
    fn test_set_updates_nearest_binding() {
        let root: Scope<i32> = Scope::root();
        root.define("x", 1);
        let child = root.child();
        assert!(child.set("x", 5));
        assert_eq!(root.get("x", true), Some(5));
        assert!(!child.set("missing", 0));
    }

    #[test]
    fn test_truncate_drops_later_bindings() {
        let root: Scope<i32> = Scope::root();
        root.define("x", 1);
        let mark = root.local_count();
        root.define("y", 2);
        root.define("z", 3);
        root.truncate(mark);

        assert_eq!(root.local_count(), 1);
        assert_eq!(root.get("x", true), Some(1));
        assert!(!root.contains_local("y"));
        assert!(root.define("y", 4));
    }

    #[test]
    fn test_entries_keep_definition_order() {
        let scope: Scope<i32> = Scope::root();
        scope.define("b", 2);
        scope.define("a", 1);
        let names: Vec<String> = scope.entries().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
