//! Unit tests for the hybrid split oracle

use ucgen_core::compiler::hybrid::HybridChoice;

#[test]
fn test_seed_entries() {
    let choice = HybridChoice::build(64, false);
    for size in 0..=4 {
        assert_eq!(choice.next_k(size), 2);
    }
}

#[test]
fn test_chosen_option_is_minimal() {
    for zhao in [false, true] {
        let choice = HybridChoice::build(2000, zhao);
        for size in 5..=2000 {
            let (two, four) = choice.options(size);
            match choice.next_k(size) {
                2 => assert!(two <= four, "size {} (zhao {})", size, zhao),
                4 => assert!(four <= two, "size {} (zhao {})", size, zhao),
                other => panic!("unexpected split {}", other),
            }
        }
    }
}

#[test]
fn test_small_sizes_prefer_two_way() {
    let choice = HybridChoice::build(32, false);
    for size in 5..=13 {
        assert_eq!(choice.next_k(size), 2, "size {}", size);
    }
    // The first size where the 4-way body amortises (the tie goes to 4).
    assert_eq!(choice.next_k(14), 4);
}

#[test]
fn test_consistent_for_specific_size() {
    // The choice at 27 poles must match the recurrence directly.
    for zhao in [false, true] {
        let choice = HybridChoice::build(27, zhao);
        let (two, four) = choice.options(27);
        let expected = if two < four { 2 } else { 4 };
        assert_eq!(choice.next_k(27), expected, "zhao {}", zhao);
    }
}

#[test]
fn test_table_covers_requested_limit() {
    let choice = HybridChoice::build(123, true);
    assert_eq!(choice.limit(), 123);
    let _ = choice.next_k(123);
}
