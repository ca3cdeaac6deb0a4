use crate::runtime::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Lexical frame chain. The parent link is fixed when the frame is created
/// (definition time), so closures capture the environment they were written
/// in, not the one they are called from. Frames are shared through `Rc`
/// because a closure keeps its defining frame alive after the call that
/// created it returns.
#[derive(Clone, Debug)]
pub struct Environment {
    frame: Rc<RefCell<Frame>>,
}

#[derive(Debug)]
struct Frame {
    slots: HashMap<String, Value>,
    parent: Option<Environment>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::global()
    }
}

impl Environment {
    pub fn global() -> Self {
        Self {
            frame: Rc::new(RefCell::new(Frame {
                slots: HashMap::new(),
                parent: None,
            })),
        }
    }

    /// New innermost frame whose parent is `self`. Used for every function
    /// call and every block.
    pub fn child(&self) -> Environment {
        Environment {
            frame: Rc::new(RefCell::new(Frame {
                slots: HashMap::new(),
                parent: Some(self.clone()),
            })),
        }
    }

    /// Declares in this frame, shadowing any outer binding (`let`, parameter
    /// and loop bindings).
    pub fn declare(&self, name: &str, value: Value) {
        self.frame
            .borrow_mut()
            .slots
            .insert(name.to_string(), value);
    }

    /// Bare assignment: rewrites the slot in the frame where the name is
    /// visible, or declares it here when it is visible nowhere
    /// (declaration-on-first-assignment).
    pub fn assign(&self, name: &str, value: Value) {
        if !self.assign_existing(name, value.clone()) {
            self.declare(name, value);
        }
    }

    fn assign_existing(&self, name: &str, value: Value) -> bool {
        let mut frame = self.frame.borrow_mut();
        if let Some(slot) = frame.slots.get_mut(name) {
            *slot = value;
            return true;
        }
        match &frame.parent {
            Some(parent) => parent.assign_existing(name, value),
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let frame = self.frame.borrow();
        if let Some(value) = frame.slots.get(name) {
            return Some(value.clone());
        }
        frame.parent.as_ref().and_then(|parent| parent.get(name))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}
