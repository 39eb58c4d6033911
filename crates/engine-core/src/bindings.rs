use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{EngineError, EngineResult};

pub type BindingValue = Arc<dyn Any + Send + Sync>;

/// Two-layer key/value store: a persistent layer and a per-tick overlay.
///
/// Reads prefer the tick-scoped value when present. The tick-scoped layer is
/// cleared once per tick, after the last hook runs — see the control loop in
/// `engine::continuous`.
#[derive(Default)]
pub struct Bindings {
    persistent: DashMap<String, BindingValue>,
    tick_scoped: DashMap<String, BindingValue>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<BindingValue> {
        self.tick_scoped
            .get(key)
            .map(|v| v.clone())
            .or_else(|| self.persistent.get(key).map(|v| v.clone()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn put(&self, key: &str, value: BindingValue) -> EngineResult<Option<BindingValue>> {
        Self::validate_key(key)?;
        let prior = self.get(key);
        self.persistent.insert(key.to_string(), value);
        self.tick_scoped.remove(key);
        Ok(prior)
    }

    pub fn put_for_tick(
        &self,
        key: &str,
        value: BindingValue,
    ) -> EngineResult<Option<BindingValue>> {
        Self::validate_key(key)?;
        let prior = self.get(key);
        self.tick_scoped.insert(key.to_string(), value);
        Ok(prior)
    }

    pub fn remove(&self, key: &str) -> EngineResult<Option<BindingValue>> {
        Self::validate_key(key)?;
        let prior = self.get(key);
        self.persistent.remove(key);
        self.tick_scoped.remove(key);
        Ok(prior)
    }

    /// Clears the tick-scoped layer. Called exactly once per tick by the
    /// control loop, after the last hook.
    pub fn clear_tick_bindings(&self) {
        self.tick_scoped.clear();
    }

    fn validate_key(key: &str) -> EngineResult<()> {
        if key.is_empty() {
            return Err(EngineError::InvalidArgument(
                "binding key must be non-empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn val(n: i32) -> BindingValue {
        Arc::new(n)
    }

    fn as_i32(v: &BindingValue) -> i32 {
        *v.downcast_ref::<i32>().unwrap()
    }

    #[test]
    fn tick_scoped_shadows_persistent() {
        let b = Bindings::new();
        b.put("k", val(1)).unwrap();
        b.put_for_tick("k", val(2)).unwrap();
        assert_eq!(as_i32(&b.get("k").unwrap()), 2);
    }

    #[test]
    fn put_clears_tick_scoped_for_key() {
        let b = Bindings::new();
        b.put_for_tick("k", val(2)).unwrap();
        b.put("k", val(1)).unwrap();
        assert_eq!(as_i32(&b.get("k").unwrap()), 1);
    }

    #[test]
    fn clear_tick_bindings_reverts_to_persistent() {
        let b = Bindings::new();
        b.put("k", val(1)).unwrap();
        b.put_for_tick("k", val(2)).unwrap();
        b.clear_tick_bindings();
        assert_eq!(as_i32(&b.get("k").unwrap()), 1);
    }

    #[test]
    fn remove_clears_both_layers() {
        let b = Bindings::new();
        b.put("k", val(1)).unwrap();
        b.put_for_tick("k", val(2)).unwrap();
        b.remove("k").unwrap();
        assert!(!b.contains_key("k"));
    }

    #[test]
    fn empty_key_is_rejected() {
        let b = Bindings::new();
        assert!(b.put("", val(1)).is_err());
    }
}
