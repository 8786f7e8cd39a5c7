/// Anything the registry can order.
pub trait Descriptor {
    fn priority(&self) -> Option<i64>;

    /// Hidden entries are left out of export ordering.
    fn hidden(&self) -> bool {
        false
    }

    fn exportable(&self) -> bool {
        true
    }
}

/// Which consumer is asking for an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderContext {
    Display,
    Export,
}

/// Base for derived priorities: the n-th definition gets `100 - n`.
pub const PRIORITY_BASE: i64 = 100;

/// Insertion-ordered map of key to descriptor.
#[derive(Debug, Clone)]
pub struct Registry<D> {
    entries: Vec<(String, D)>,
}

impl<D> Default for Registry<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<D: Descriptor> Registry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts, or replaces in place so a key keeps its insertion slot.
    pub fn define(&mut self, key: impl Into<String>, descriptor: D) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = descriptor,
            None => self.entries.push((key, descriptor)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&D> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, d)| d)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &D)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// Explicit priority, or the one derived from the insertion slot.
    pub fn priority_of(&self, key: &str) -> Option<i64> {
        self.entries
            .iter()
            .position(|(k, _)| k == key)
            .map(|index| self.resolved_priority(index))
    }

    /// Descending priority, ties in insertion order. Export context drops
    /// hidden and export-disabled entries.
    pub fn resolve_order(&self, context: OrderContext) -> Vec<(&str, &D)> {
        let mut ordered: Vec<(usize, i64)> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, (_, d))| match context {
                OrderContext::Display => true,
                OrderContext::Export => !d.hidden() && d.exportable(),
            })
            .map(|(index, _)| (index, self.resolved_priority(index)))
            .collect();
        // stable sort keeps insertion order among equal priorities
        ordered.sort_by(|a, b| b.1.cmp(&a.1));
        ordered
            .into_iter()
            .map(|(index, _)| {
                let (k, d) = &self.entries[index];
                (k.as_str(), d)
            })
            .collect()
    }

    fn resolved_priority(&self, index: usize) -> i64 {
        self.entries[index]
            .1
            .priority()
            .unwrap_or(PRIORITY_BASE - index as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Entry {
        priority: Option<i64>,
        hidden: bool,
        export: bool,
    }

    impl Entry {
        fn plain() -> Self {
            Self {
                export: true,
                ..Self::default()
            }
        }

        fn with_priority(priority: i64) -> Self {
            Self {
                priority: Some(priority),
                ..Self::plain()
            }
        }
    }

    impl Descriptor for Entry {
        fn priority(&self) -> Option<i64> {
            self.priority
        }

        fn hidden(&self) -> bool {
            self.hidden
        }

        fn exportable(&self) -> bool {
            self.export
        }
    }

    fn keys(order: Vec<(&str, &Entry)>) -> Vec<String> {
        order.into_iter().map(|(k, _)| k.to_string()).collect()
    }

    #[test]
    fn default_priority_follows_definition_order() {
        let mut registry = Registry::new();
        registry.define("a", Entry::plain());
        registry.define("b", Entry::plain());
        registry.define("c", Entry::plain());

        assert_eq!(registry.priority_of("a"), Some(100));
        assert_eq!(registry.priority_of("c"), Some(98));
        assert_eq!(keys(registry.resolve_order(OrderContext::Display)), ["a", "b", "c"]);
    }

    #[test]
    fn explicit_priority_wins_and_ties_keep_insertion_order() {
        let mut registry = Registry::new();
        registry.define("a", Entry::with_priority(5));
        registry.define("b", Entry::with_priority(10));
        registry.define("c", Entry::with_priority(5));
        registry.define("d", Entry::with_priority(10));

        assert_eq!(
            keys(registry.resolve_order(OrderContext::Display)),
            ["b", "d", "a", "c"]
        );
    }

    #[test]
    fn redefining_is_stable() {
        let mut registry = Registry::new();
        registry.define("a", Entry::plain());
        registry.define("b", Entry::plain());
        registry.define("c", Entry::plain());
        let before = keys(registry.resolve_order(OrderContext::Display));

        registry.define("a", Entry::plain());
        registry.define("b", Entry::plain());

        assert_eq!(registry.len(), 3);
        assert_eq!(keys(registry.resolve_order(OrderContext::Display)), before);
    }

    #[test]
    fn export_drops_hidden_and_disabled() {
        let mut registry = Registry::new();
        registry.define("name", Entry::plain());
        registry.define(
            "secret",
            Entry {
                hidden: true,
                ..Entry::plain()
            },
        );
        registry.define(
            "actions",
            Entry {
                export: false,
                ..Entry::plain()
            },
        );

        assert_eq!(keys(registry.resolve_order(OrderContext::Export)), ["name"]);
        assert_eq!(registry.resolve_order(OrderContext::Display).len(), 3);
    }

    #[test]
    fn empty_registry_orders_to_nothing() {
        let registry: Registry<Entry> = Registry::new();
        assert!(registry.resolve_order(OrderContext::Export).is_empty());
        assert!(registry.get("missing").is_none());
    }
}
