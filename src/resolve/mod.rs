//! Dependency resolution
//!
//! Orders descriptors so that every dependency comes before the modules that
//! declare it, and propagates disabled status up the dependency chain.

mod cascade;

pub use cascade::propagate_disable;

use crate::error::{ModuleError, Result};
use crate::module::DescriptorStore;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Produces the order modules are constructed and enabled in
///
/// Implementations return indices into the store. Every index must appear
/// exactly once, after the indices of all its dependencies.
pub trait ResolveStrategy: Send {
    fn resolve(&self, store: &DescriptorStore) -> Result<Vec<usize>>;
}

/// What to do with a soft dependency that names no discovered module
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SoftDependencyPolicy {
    /// Skip the missing module; soft dependencies only affect ordering
    #[default]
    Ignore,
    /// Treat the missing module like a missing hard dependency
    Fail,
}

/// Depth-first post-order resolver
///
/// Hard dependencies are resolved first, then soft dependencies, then the
/// module itself. Independent modules keep their discovery order.
#[derive(Debug, Clone, Default)]
pub struct RecursiveResolver {
    soft_policy: SoftDependencyPolicy,
}

impl RecursiveResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_soft_policy(soft_policy: SoftDependencyPolicy) -> Self {
        Self { soft_policy }
    }
}

impl ResolveStrategy for RecursiveResolver {
    fn resolve(&self, store: &DescriptorStore) -> Result<Vec<usize>> {
        let mut walk = Walk {
            store,
            soft_policy: self.soft_policy,
            visiting: vec![false; store.len()],
            resolved: vec![false; store.len()],
            path: Vec::new(),
            order: Vec::with_capacity(store.len()),
        };

        for idx in 0..store.len() {
            walk.visit(idx)?;
        }

        tracing::debug!("Resolved module order: {:?}", walk.ids());
        Ok(walk.order)
    }
}

struct Walk<'a> {
    store: &'a DescriptorStore,
    soft_policy: SoftDependencyPolicy,
    visiting: Vec<bool>,
    resolved: Vec<bool>,
    path: Vec<usize>,
    order: Vec<usize>,
}

impl Walk<'_> {
    fn visit(&mut self, idx: usize) -> Result<()> {
        if self.resolved[idx] {
            return Ok(());
        }

        let store = self.store;
        let descriptor = &store[idx];
        if self.visiting[idx] {
            let start = self.path.iter().position(|&p| p == idx).unwrap_or(0);
            let mut cycle: Vec<String> = self.path[start..]
                .iter()
                .map(|&p| store[p].id().to_string())
                .collect();
            cycle.push(descriptor.id().to_string());
            return Err(ModuleError::CircularDependency {
                module: descriptor.id().to_string(),
                type_name: descriptor.type_name().to_string(),
                cycle,
            });
        }

        self.visiting[idx] = true;
        self.path.push(idx);

        for dependency in descriptor.dependencies() {
            let dep = store.index_of(dependency).ok_or_else(|| {
                ModuleError::DependencyNotFound {
                    module: descriptor.id().to_string(),
                    type_name: descriptor.type_name().to_string(),
                    dependency: dependency.clone(),
                }
            })?;
            self.visit(dep)?;
        }

        for dependency in descriptor.soft_dependencies() {
            match (store.index_of(dependency), self.soft_policy) {
                (Some(dep), _) => self.visit(dep)?,
                (None, SoftDependencyPolicy::Ignore) => {
                    tracing::debug!(
                        "Soft dependency '{}' of '{}' is not present, ignoring",
                        dependency,
                        descriptor.id()
                    );
                }
                (None, SoftDependencyPolicy::Fail) => {
                    return Err(ModuleError::DependencyNotFound {
                        module: descriptor.id().to_string(),
                        type_name: descriptor.type_name().to_string(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        self.path.pop();
        self.visiting[idx] = false;
        self.resolved[idx] = true;
        self.order.push(idx);
        Ok(())
    }

    fn ids(&self) -> Vec<&str> {
        self.order.iter().map(|&idx| self.store[idx].id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleDescriptor, ModuleMeta};
    use proptest::prelude::*;

    /// Random acyclic module sets in shuffled discovery order
    ///
    /// Module `mN` may only depend on modules with a lower N, each edge hard or
    /// soft at random.
    pub(crate) fn dag() -> impl Strategy<Value = Vec<ModuleMeta>> {
        (1usize..12)
            .prop_flat_map(|n| {
                let edges = prop::collection::vec(
                    prop::collection::vec((any::<bool>(), any::<bool>()), n),
                    n,
                );
                (edges, Just((0..n).collect::<Vec<_>>()).prop_shuffle())
            })
            .prop_map(|(edges, discovery)| {
                discovery
                    .into_iter()
                    .map(|i| {
                        let mut meta = ModuleMeta::new(format!("m{i}"), format!("M{i}"));
                        for (j, &(linked, hard)) in edges[i].iter().enumerate().take(i) {
                            if !linked {
                                continue;
                            }
                            meta = if hard {
                                meta.dependency(format!("m{j}"))
                            } else {
                                meta.soft_dependency(format!("m{j}"))
                            };
                        }
                        meta
                    })
                    .collect()
            })
    }

    fn store(metas: Vec<ModuleMeta>) -> DescriptorStore {
        let mut store = DescriptorStore::new();
        for meta in metas {
            store
                .insert(ModuleDescriptor::new(format!("test::{}", meta.id), meta))
                .unwrap();
        }
        store
    }

    fn resolve_ids(store: &DescriptorStore, resolver: &RecursiveResolver) -> Result<Vec<String>> {
        Ok(resolver
            .resolve(store)?
            .into_iter()
            .map(|idx| store[idx].id().to_string())
            .collect())
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|x| x == id).unwrap()
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let store = store(vec![
            ModuleMeta::new("app", "App").dependency("service"),
            ModuleMeta::new("service", "Service")
                .dependency("database")
                .soft_dependency("cache"),
            ModuleMeta::new("cache", "Cache"),
            ModuleMeta::new("database", "Database"),
        ]);
        let order = resolve_ids(&store, &RecursiveResolver::new()).unwrap();

        assert_eq!(order.len(), 4);
        assert!(position(&order, "database") < position(&order, "service"));
        assert!(position(&order, "cache") < position(&order, "service"));
        assert!(position(&order, "service") < position(&order, "app"));
    }

    #[test]
    fn test_independent_modules_keep_discovery_order() {
        let store = store(vec![
            ModuleMeta::new("c", "C"),
            ModuleMeta::new("a", "A"),
            ModuleMeta::new("b", "B"),
        ]);
        let order = resolve_ids(&store, &RecursiveResolver::new()).unwrap();
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_hard_dependencies_resolve_before_soft() {
        let store = store(vec![
            ModuleMeta::new("app", "App")
                .soft_dependency("soft")
                .dependency("hard"),
            ModuleMeta::new("soft", "Soft"),
            ModuleMeta::new("hard", "Hard"),
        ]);
        let order = resolve_ids(&store, &RecursiveResolver::new()).unwrap();
        assert_eq!(order, vec!["hard", "soft", "app"]);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let store = store(vec![
            ModuleMeta::new("top", "Top").dependency("left").dependency("right"),
            ModuleMeta::new("left", "Left").dependency("base"),
            ModuleMeta::new("right", "Right").dependency("base"),
            ModuleMeta::new("base", "Base"),
        ]);
        let order = resolve_ids(&store, &RecursiveResolver::new()).unwrap();
        assert_eq!(order, vec!["base", "left", "right", "top"]);
    }

    #[test]
    fn test_two_node_cycle_is_detected() {
        let store = store(vec![
            ModuleMeta::new("a", "A").dependency("b"),
            ModuleMeta::new("b", "B").dependency("a"),
        ]);
        let err = RecursiveResolver::new().resolve(&store).unwrap_err();
        match err {
            ModuleError::CircularDependency { module, cycle, .. } => {
                assert_eq!(module, "a");
                assert_eq!(cycle, vec!["a", "b", "a"]);
            }
            other => panic!("expected circular dependency, got {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let store = store(vec![ModuleMeta::new("a", "A").dependency("a")]);
        assert!(matches!(
            RecursiveResolver::new().resolve(&store),
            Err(ModuleError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_cycle_through_soft_dependency_is_detected() {
        let store = store(vec![
            ModuleMeta::new("a", "A").soft_dependency("b"),
            ModuleMeta::new("b", "B").dependency("c"),
            ModuleMeta::new("c", "C").dependency("a"),
        ]);
        let err = RecursiveResolver::new().resolve(&store).unwrap_err();
        assert!(
            matches!(err, ModuleError::CircularDependency { ref cycle, .. } if cycle == &["a", "b", "c", "a"])
        );
    }

    #[test]
    fn test_missing_hard_dependency_fails() {
        let store = store(vec![ModuleMeta::new("web", "Web").dependency("db")]);
        let err = RecursiveResolver::new().resolve(&store).unwrap_err();
        assert!(matches!(
            err,
            ModuleError::DependencyNotFound { ref module, ref dependency, .. }
                if module == "web" && dependency == "db"
        ));
    }

    #[test]
    fn test_missing_soft_dependency_follows_policy() {
        let store = store(vec![ModuleMeta::new("web", "Web").soft_dependency("metrics")]);

        let order = resolve_ids(&store, &RecursiveResolver::new()).unwrap();
        assert_eq!(order, vec!["web"]);

        let strict = RecursiveResolver::with_soft_policy(SoftDependencyPolicy::Fail);
        assert!(matches!(
            strict.resolve(&store),
            Err(ModuleError::DependencyNotFound { ref dependency, .. }) if dependency == "metrics"
        ));
    }

    #[test]
    fn test_soft_policy_parses_case_insensitively() {
        use std::str::FromStr;
        assert_eq!(
            SoftDependencyPolicy::from_str("FAIL").unwrap(),
            SoftDependencyPolicy::Fail
        );
        assert_eq!(SoftDependencyPolicy::Ignore.to_string(), "ignore");
    }

    proptest! {
        #[test]
        fn test_every_dependency_precedes_its_dependent(metas in dag()) {
            let store = store(metas.clone());
            let order = resolve_ids(&store, &RecursiveResolver::new()).unwrap();

            prop_assert_eq!(order.len(), metas.len());
            for meta in &metas {
                for dep in meta.dependencies.iter().chain(&meta.soft_dependencies) {
                    prop_assert!(
                        position(&order, dep) < position(&order, &meta.id),
                        "{} resolved after {}", dep, meta.id
                    );
                }
            }
        }

        #[test]
        fn test_unrelated_modules_keep_discovery_order(metas in dag()) {
            let store = store(metas.clone());
            let order = resolve_ids(&store, &RecursiveResolver::new()).unwrap();

            // A module with no edges in either direction
            let linked = |id: &String| {
                metas.iter().any(|m| {
                    (&m.id == id
                        && !(m.dependencies.is_empty() && m.soft_dependencies.is_empty()))
                        || m.dependencies.contains(id)
                        || m.soft_dependencies.contains(id)
                })
            };
            let discovered: Vec<&String> =
                metas.iter().map(|m| &m.id).filter(|id| !linked(*id)).collect();
            let resolved: Vec<&String> = order.iter().filter(|id| !linked(*id)).collect();
            prop_assert_eq!(resolved, discovered);
        }
    }
}
