use burrow::raw;

#[test]
fn zero_size_allocation_is_valid() {
    unsafe {
        let payload = raw::allocate(None, 0).unwrap();
        assert_eq!(raw::size_of(payload), 0);
        assert!(!raw::has_parent(payload, None));
        raw::free(payload);
    }
}

#[test]
fn deeply_nested_chain_cascades_without_leaking() {
    const DEPTH: usize = 10_000;
    unsafe {
        let root = raw::allocate(None, 8).unwrap();
        let mut current = root;
        for _ in 0..DEPTH {
            let next = raw::allocate(Some(current), 8).unwrap();
            current = next;
        }
        raw::free(root);
    }
}

#[test]
fn sibling_order_does_not_affect_cascade_completeness() {
    unsafe {
        let parent = raw::allocate(None, 8).unwrap();
        let mut children = Vec::new();
        for _ in 0..64 {
            let child = raw::allocate(Some(parent), 8).unwrap();
            children.push(child);
        }
        for &child in &children {
            assert!(raw::has_parent(child, None));
            assert!(raw::has_parent(child, Some(parent)));
        }
        raw::free(parent);
    }
}
