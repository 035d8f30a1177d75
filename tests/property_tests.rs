//! Property-based tests for the service-group dependency graph using proptest.
//!
//! These tests verify that:
//! 1. `topological_order` respects every dependency edge for arbitrary DAGs
//! 2. `topological_order` is deterministic across repeated calls on the same graph
//! 3. A 2-node cycle is always rejected, regardless of which two names are chosen

use std::collections::HashMap;

use proptest::prelude::*;
use smoothstack_orchestrator_core::{
    topological_order, DependencyCondition, Service, ServiceDependency,
};

/// Strategy for generating arbitrary service names.
fn service_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}".prop_filter("non-empty", |s| !s.is_empty())
}

/// Strategy for a small set of distinct service names, ordered arbitrarily.
fn distinct_names_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(service_name_strategy(), 2..8).prop_map(|names| {
        let mut seen = std::collections::HashSet::new();
        names.into_iter().filter(|n| seen.insert(n.clone())).collect()
    })
}

/// Build a DAG: each service may depend only on services earlier in `names`,
/// so the input order is itself always a valid topological order.
fn services_from_forward_dag(
    names: &[String],
    edge_bits: &[bool],
) -> HashMap<String, Service> {
    let mut services = HashMap::new();
    let mut bit = 0;
    for (i, name) in names.iter().enumerate() {
        let mut service = Service::new(name.clone(), "img:latest");
        for earlier in &names[..i] {
            if edge_bits.get(bit).copied().unwrap_or(false) {
                service
                    .depends_on
                    .push(ServiceDependency::new(earlier.clone(), DependencyCondition::Started));
            }
            bit += 1;
        }
        services.insert(name.clone(), service);
    }
    services
}

proptest! {
    #[test]
    fn topological_order_respects_every_edge(
        names in distinct_names_strategy(),
        edge_bits in prop::collection::vec(any::<bool>(), 0..64),
    ) {
        let services = services_from_forward_dag(&names, &edge_bits);
        let order = topological_order(&services).expect("forward-only edges never cycle");

        for service in services.values() {
            let dependent_pos = order.iter().position(|n| n == &service.name).unwrap();
            for dep in &service.depends_on {
                let dep_pos = order.iter().position(|n| n == &dep.target).unwrap();
                prop_assert!(dep_pos < dependent_pos);
            }
        }
    }

    #[test]
    fn topological_order_is_deterministic_for_arbitrary_dags(
        names in distinct_names_strategy(),
        edge_bits in prop::collection::vec(any::<bool>(), 0..64),
    ) {
        let services = services_from_forward_dag(&names, &edge_bits);
        let first = topological_order(&services).expect("forward-only edges never cycle");
        let second = topological_order(&services).expect("forward-only edges never cycle");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn two_node_cycle_is_always_rejected(a in service_name_strategy(), b in service_name_strategy()) {
        prop_assume!(a != b);

        let mut services = HashMap::new();
        let mut svc_a = Service::new(a.clone(), "img:latest");
        svc_a.depends_on.push(ServiceDependency::new(b.clone(), DependencyCondition::Started));
        let mut svc_b = Service::new(b.clone(), "img:latest");
        svc_b.depends_on.push(ServiceDependency::new(a.clone(), DependencyCondition::Started));
        services.insert(a, svc_a);
        services.insert(b, svc_b);

        prop_assert!(topological_order(&services).is_err());
    }
}
