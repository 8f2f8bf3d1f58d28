use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::{LarkError, Result};
use crate::value::Value;

/// One scope in the lexical chain: a name-to-value mapping plus an optional
/// link to the enclosing scope.  Shared ownership (`Rc<RefCell<..>>`)
/// because function values keep their defining chain alive after the scope
/// has otherwise unwound.
#[derive(Debug)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// The global scope.
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` in this scope, overwriting any existing binding here.
    pub fn define(&mut self, name: &str, value: Value) {
        debug!("Defining '{}' = {}", name, value);

        self.values.insert(name.to_string(), value);
    }

    /// Look `name` up in this scope, then outward along the chain.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(LarkError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Update the nearest existing binding of `name`; never defines.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LarkError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Read `name` from the scope exactly `distance` hops out, with no
    /// fallback to enclosing scopes.  The resolver guarantees the binding
    /// exists there; a miss is a bug in this crate, not a user error.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str) -> Value {
        Self::ancestor(env, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("resolved local '{}' missing from its scope", name))
    }

    /// Write `name` in the scope exactly `distance` hops out.  Same
    /// invariant as [`Environment::get_at`].
    pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &str, value: Value) {
        let target: Rc<RefCell<Environment>> = Self::ancestor(env, distance);
        let mut target = target.borrow_mut();

        if !target.values.contains_key(name) {
            panic!("resolved local '{}' missing from its scope", name);
        }

        target.values.insert(name.to_string(), value);
    }

    fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut current: Rc<RefCell<Environment>> = env.clone();

        for _ in 0..distance {
            let next: Rc<RefCell<Environment>> = current
                .borrow()
                .enclosing
                .clone()
                .expect("environment chain shorter than resolved distance");

            current = next;
        }

        current
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
