//! Property tests for nearest-ancestor shadow resolution.
//!
//! A linear chain `T0 <- T1 <- ... <- Tn` with shadows registered on an
//! arbitrary subset of its types must always resolve `Ti` to the deepest
//! registered `Tj` with `j <= i`, no matter the registration order or how
//! often the cache has been consulted.

use proptest::prelude::*;
use umbra_shadow::{ClassHierarchy, ShadowDescriptor, ShadowRegistry};
use umbra_types::RealType;

fn type_name(index: usize) -> String {
    format!("com.example.chain.T{index}")
}

fn chain(depth: usize) -> ClassHierarchy {
    let mut hierarchy = ClassHierarchy::new();
    for index in 1..depth {
        hierarchy
            .declare(type_name(index), type_name(index - 1))
            .unwrap();
    }
    hierarchy
}

fn expected(registered: &[bool], index: usize) -> Option<String> {
    (0..=index).rev().find(|&j| registered[j]).map(type_name)
}

proptest! {
    #[test]
    fn resolves_to_nearest_registered_ancestor(
        registered in prop::collection::vec(any::<bool>(), 1..24),
        reversed in any::<bool>(),
    ) {
        let registry = ShadowRegistry::new(chain(registered.len()));

        let mut order: Vec<usize> = (0..registered.len()).filter(|&i| registered[i]).collect();
        if reversed {
            order.reverse();
        }
        for index in order {
            registry
                .register(ShadowDescriptor::with_default::<()>(type_name(index)).build())
                .unwrap();
        }

        // Twice: the second pass is served from the cache.
        for _ in 0..2 {
            for index in 0..registered.len() {
                let resolved = registry
                    .resolve(&RealType::new(type_name(index)))
                    .map(|d| d.real_type().qualified_name().to_string());
                prop_assert_eq!(resolved, expected(&registered, index));
            }
        }
    }

    #[test]
    fn deregistering_falls_back_further(
        depth in 2usize..16,
        removed in 0usize..16,
    ) {
        let removed = removed % depth;
        let registry = ShadowRegistry::new(chain(depth));
        for index in 0..depth {
            registry
                .register(ShadowDescriptor::with_default::<()>(type_name(index)).build())
                .unwrap();
        }

        let leaf = RealType::new(type_name(depth - 1));
        prop_assert!(registry.resolve(&leaf).is_some());

        registry.deregister(&RealType::new(type_name(removed))).unwrap();

        let mut registered = vec![true; depth];
        registered[removed] = false;
        for index in 0..depth {
            let resolved = registry
                .resolve(&RealType::new(type_name(index)))
                .map(|d| d.real_type().qualified_name().to_string());
            prop_assert_eq!(resolved, expected(&registered, index));
        }
    }
}
