use super::annotations::Annotation;
use std::{fmt, sync::Arc};

/// Identity and label of a suite or a single test, as seen by listeners.
/// Descriptions are shared through `Arc`; identity is pointer identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    display_name: String,
    class_name: Option<String>,
    method_name: Option<String>,
    annotations: Vec<Annotation>,
    children: Vec<Arc<Description>>,
}

impl Description {
    /// Describe a suite, such as a test class or the whole run.
    pub fn create_suite_description(
        name: &str,
        annotations: Vec<Annotation>,
    ) -> Self {
        Description {
            display_name: name.to_string(),
            class_name: Some(name.to_string()),
            method_name: None,
            annotations,
            children: Vec::new(),
        }
    }

    /// Describe a single test, displayed as `method(class)`.
    pub fn create_test_description(
        class_name: &str,
        method_name: &str,
        annotations: Vec<Annotation>,
    ) -> Self {
        Description {
            display_name: format!("{}({})", method_name, class_name),
            class_name: Some(class_name.to_string()),
            method_name: Some(method_name.to_string()),
            annotations,
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: Arc<Description>) {
        self.children.push(child);
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    pub fn method_name(&self) -> Option<&str> {
        self.method_name.as_deref()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn children(&self) -> &[Arc<Description>] {
        &self.children
    }

    pub fn is_suite(&self) -> bool {
        !self.is_test()
    }

    pub fn is_test(&self) -> bool {
        self.method_name.is_some()
    }

    /// Number of leaf tests below this description.
    pub fn test_count(&self) -> usize {
        if self.is_test() {
            return 1;
        }
        self.children.iter().map(|c| c.test_count()).sum()
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suite_counts_leaves() {
        let mut class = Description::create_suite_description("a.B", vec![]);
        class.add_child(Arc::new(Description::create_test_description(
            "a.B",
            "one",
            vec![],
        )));
        class.add_child(Arc::new(Description::create_test_description(
            "a.B",
            "two",
            vec![],
        )));
        let mut root = Description::create_suite_description("Root", vec![]);
        root.add_child(Arc::new(class));

        assert_eq!(root.test_count(), 2);
        assert!(root.is_suite());
        assert_eq!(root.children()[0].children()[1].display_name(), "two(a.B)");
        assert_eq!(root.children()[0].children()[1].method_name(), Some("two"));
    }
}
