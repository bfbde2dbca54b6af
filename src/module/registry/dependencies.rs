//! Module dependency resolution
//!
//! Turns category-level requirements into module-level edges through the
//! default provider of each category, then computes a wave-based activation
//! order with Kahn's algorithm.
//!
//! Preference order, used everywhere a choice between modules is made:
//! higher priority first, then lexicographically smaller name. Names are
//! unique, so the order is total and never depends on registration order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::module::registry::error::RegistryError;
use crate::module::traits::Module;

/// Resolution input: the ordering-relevant view of one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub name: String,
    pub category: String,
    pub priority: i32,
    pub requires: Vec<String>,
}

impl ModuleNode {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        priority: i32,
        requires: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            priority,
            requires,
        }
    }

    pub fn from_module(module: &dyn Module) -> Self {
        Self {
            name: module.name().to_string(),
            category: module.category().to_string(),
            priority: module.priority(),
            requires: module.required_categories().to_vec(),
        }
    }
}

/// Dependency resolution result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyResolution {
    /// Modules in activation order (providers first)
    pub load_order: Vec<String>,
    /// Zero-in-degree frontiers, each sorted by preference
    pub waves: Vec<Vec<String>>,
    /// Module name -> distinct default providers it depends on
    pub dependencies: BTreeMap<String, BTreeSet<String>>,
}

/// Compare two modules by preference (priority descending, then name ascending)
pub fn preference_order(a_priority: i32, a_name: &str, b_priority: i32, b_name: &str) -> Ordering {
    b_priority.cmp(&a_priority).then_with(|| a_name.cmp(b_name))
}

/// Dependency resolver
pub struct ModuleDependencies;

impl ModuleDependencies {
    /// Pick the default provider of `category` among `nodes`
    pub fn default_provider<'a, I>(nodes: I, category: &str) -> Option<&'a ModuleNode>
    where
        I: IntoIterator<Item = &'a ModuleNode>,
    {
        nodes
            .into_iter()
            .filter(|n| n.category == category)
            .min_by(|a, b| preference_order(a.priority, &a.name, b.priority, &b.name))
    }

    /// Resolve module dependencies and determine activation order
    ///
    /// `nodes` must have unique names (the registry guarantees it).
    pub fn resolve(nodes: &[ModuleNode]) -> Result<DependencyResolution, RegistryError> {
        let by_name: HashMap<&str, &ModuleNode> =
            nodes.iter().map(|n| (n.name.as_str(), n)).collect();

        let mut by_category: HashMap<&str, Vec<&ModuleNode>> = HashMap::new();
        for node in nodes {
            by_category
                .entry(node.category.as_str())
                .or_default()
                .push(node);
        }

        // Visit requesters by name so the reported missing dependency is stable
        let mut requesters: Vec<&ModuleNode> = nodes.iter().collect();
        requesters.sort_by(|a, b| a.name.cmp(&b.name));

        let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for node in requesters {
            let mut providers = BTreeSet::new();
            for category in &node.requires {
                let provider = by_category
                    .get(category.as_str())
                    .and_then(|candidates| {
                        Self::default_provider(candidates.iter().copied(), category)
                    })
                    .ok_or_else(|| RegistryError::UnsatisfiedDependency {
                        requester: node.name.clone(),
                        category: category.clone(),
                    })?;
                providers.insert(provider.name.clone());
            }
            dependencies.insert(node.name.clone(), providers);
        }

        let (load_order, waves) = Self::topological_waves(&by_name, &dependencies);

        if load_order.len() != nodes.len() {
            let resolved: HashSet<&str> = load_order.iter().map(String::as_str).collect();
            let leftover: BTreeSet<&str> = by_name
                .keys()
                .copied()
                .filter(|name| !resolved.contains(name))
                .collect();
            let cycle = Self::find_cycle(&leftover, &dependencies);
            return Err(RegistryError::CircularDependency {
                modules: leftover.iter().map(|s| s.to_string()).collect(),
                cycle,
            });
        }

        debug!("Dependency resolution complete: {:?}", load_order);

        Ok(DependencyResolution {
            load_order,
            waves,
            dependencies,
        })
    }

    /// Wave-based Kahn traversal
    ///
    /// In-degree counts distinct providers. Each frontier is sorted as a whole
    /// and appended in full before any newly freed module is considered.
    fn topological_waves(
        by_name: &HashMap<&str, &ModuleNode>,
        dependencies: &BTreeMap<String, BTreeSet<String>>,
    ) -> (Vec<String>, Vec<Vec<String>>) {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for (module, providers) in dependencies {
            in_degree.insert(module.as_str(), providers.len());
            for provider in providers {
                dependents
                    .entry(provider.as_str())
                    .or_default()
                    .push(module.as_str());
            }
        }

        let mut frontier: Vec<&str> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&name, _)| name)
            .collect();

        let mut load_order = Vec::with_capacity(by_name.len());
        let mut waves = Vec::new();

        while !frontier.is_empty() {
            frontier.sort_by(|a, b| {
                let (na, nb) = (by_name[a], by_name[b]);
                preference_order(na.priority, &na.name, nb.priority, &nb.name)
            });

            let mut next = Vec::new();
            for &module in &frontier {
                if let Some(children) = dependents.get(module) {
                    for &child in children {
                        if let Some(degree) = in_degree.get_mut(child) {
                            *degree -= 1;
                            if *degree == 0 {
                                next.push(child);
                            }
                        }
                    }
                }
            }

            let wave: Vec<String> = frontier.iter().map(|s| s.to_string()).collect();
            load_order.extend(wave.iter().cloned());
            waves.push(wave);
            frontier = next;
        }

        (load_order, waves)
    }

    /// Extract one concrete cycle from the unresolved modules
    ///
    /// Every unresolved module still waits on at least one unresolved provider,
    /// so following those edges from any start must revisit a module.
    fn find_cycle(
        leftover: &BTreeSet<&str>,
        dependencies: &BTreeMap<String, BTreeSet<String>>,
    ) -> Vec<String> {
        let Some(&start) = leftover.iter().next() else {
            return Vec::new();
        };

        let mut path: Vec<&str> = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut current = start;

        loop {
            if let Some(&pos) = seen.get(current) {
                let mut cycle: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
                cycle.push(current.to_string());
                return cycle;
            }
            seen.insert(current, path.len());
            path.push(current);

            let next = dependencies
                .get(current)
                .and_then(|providers| {
                    providers
                        .iter()
                        .map(String::as_str)
                        .find(|p| leftover.contains(p))
                });
            match next {
                Some(provider) => current = provider,
                None => return path.iter().map(|s| s.to_string()).collect(),
            }
        }
    }
}
