use super::TestClass;
use std::{collections::HashMap, sync::Arc};

/// The set of test classes a suite file can refer to, keyed by their fully
/// qualified name.
#[derive(Default, Clone)]
pub struct TestCatalog {
    classes: Vec<Arc<TestClass>>,
    index: HashMap<String, usize>,
}

impl TestCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `class`, replacing a class registered under the same name.
    pub fn register(&mut self, class: TestClass) -> &mut Self {
        let class = Arc::new(class);
        match self.index.get(class.name()) {
            Some(&idx) => self.classes[idx] = class,
            None => {
                self.index.insert(class.name().to_string(), self.classes.len());
                self.classes.push(class);
            }
        }
        self
    }

    pub fn with(mut self, class: TestClass) -> Self {
        self.register(class);
        self
    }

    /// Look up a class by its fully qualified name.
    pub fn resolve(&self, name: &str) -> Option<Arc<TestClass>> {
        self.index.get(name).map(|&idx| self.classes[idx].clone())
    }

    /// Registered classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<TestClass>> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, test: &str) -> TestClass {
        TestClass::builder(name, || Ok(()))
            .test(test, |_| Ok(()))
            .build()
    }

    #[test]
    fn register_and_resolve() {
        let catalog = TestCatalog::new()
            .with(class("a.First", "one"))
            .with(class("a.Second", "two"));
        assert_eq!(catalog.len(), 2);
        assert!(catalog.resolve("a.Missing").is_none());
        let second = catalog.resolve("a.Second").unwrap();
        assert_eq!(second.test_method_names(), vec!["two"]);
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut catalog = TestCatalog::new();
        catalog
            .register(class("a.First", "one"))
            .register(class("a.Second", "two"))
            .register(class("a.First", "three"));
        let names: Vec<&str> = catalog.classes().map(|c| c.name()).collect();
        assert_eq!(names, vec!["a.First", "a.Second"]);
        let first = catalog.resolve("a.First").unwrap();
        assert_eq!(first.test_method_names(), vec!["three"]);
    }
}
