//! Assertion helpers for the algebraic laws abstract domains must obey.
//!
//! These check properties over a given set of sample elements and collect all
//! violations into a single report, so you can see every failing law at once
//! rather than fixing them one at a time.
//!
//! # Example
//!
//! ```
//! use absint_interpreter::SetLattice;
//! use absint_test_utils::lattice::assert_domain_laws;
//!
//! let samples: Vec<SetLattice<u32>> = vec![
//!     SetLattice::new(),
//!     SetLattice::singleton(1),
//!     [1, 2].into_iter().collect(),
//! ];
//! assert_domain_laws(&samples);
//! ```

use std::fmt::{Debug, Write};

use absint_interpreter::AbstractDomain;
use absint_ir::{HasBottom, HasTop, Lattice};

fn report(violations: Vec<String>) {
    if violations.is_empty() {
        return;
    }
    let mut msg = format!("{} lattice law violation(s):\n", violations.len());
    for (i, v) in violations.iter().enumerate() {
        let _ = writeln!(msg, "  {}. {}", i + 1, v);
    }
    panic!("{msg}");
}

/// Check that `join` is an idempotent, commutative and associative upper
/// bound over the given elements.
pub fn assert_join_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_join_laws(elements, &mut violations);
    report(violations);
}

/// Check that `a.is_subseteq(&b)` holds exactly when `a.join(&b) == b`.
pub fn assert_ordering_consistent<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_ordering_consistent(elements, &mut violations);
    report(violations);
}

/// Check that `bottom()` is below every element and the identity of join.
pub fn assert_bottom_laws<L: HasBottom + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_bottom_laws(elements, &mut violations);
    report(violations);
}

/// Check that `top()` is above every element and absorbs join.
pub fn assert_top_laws<L: HasTop + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    let top = L::top();
    for x in elements {
        if !x.is_subseteq(&top) {
            violations.push(format!("element not below top: {x:?}.is_subseteq(top()) = false"));
        }
        if top.join(x) != top {
            violations.push(format!("top annihilation violated: top().join({x:?}) != top()"));
        }
    }
    report(violations);
}

/// Check that `widen` over-approximates both of its arguments.
pub fn assert_widening_laws<D: AbstractDomain>(elements: &[D]) {
    let mut violations = Vec::new();
    check_widening_laws(elements, &mut violations);
    report(violations);
}

/// Check every law an [`AbstractDomain`] must satisfy: join laws, ordering
/// consistency, bottom and widening. All violations are reported together.
pub fn assert_domain_laws<D: AbstractDomain>(elements: &[D]) {
    let mut violations = Vec::new();
    check_join_laws(elements, &mut violations);
    check_ordering_consistent(elements, &mut violations);
    check_bottom_laws(elements, &mut violations);
    check_widening_laws(elements, &mut violations);
    report(violations);
}

fn check_join_laws<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    for a in elements {
        // idempotent
        if a.join(a) != *a {
            v.push(format!("join not idempotent: {a:?}.join({a:?}) != {a:?}"));
        }
        for b in elements {
            let joined = a.join(b);
            if joined != b.join(a) {
                v.push(format!(
                    "join not commutative: {a:?}.join({b:?}) != {b:?}.join({a:?})"
                ));
            }
            if !a.is_subseteq(&joined) || !b.is_subseteq(&joined) {
                v.push(format!(
                    "join not an upper bound: {a:?}.join({b:?}) = {joined:?}"
                ));
            }
            for c in elements {
                if joined.join(c) != a.join(&b.join(c)) {
                    v.push(format!(
                        "join not associative: ({a:?}.join({b:?})).join({c:?}) != {a:?}.join({b:?}.join({c:?}))"
                    ));
                }
            }
        }
    }
}

fn check_ordering_consistent<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    for a in elements {
        for b in elements {
            let sub = a.is_subseteq(b);
            let join_agrees = a.join(b) == *b;
            if sub != join_agrees {
                v.push(format!(
                    "ordering inconsistent with join: {a:?}.is_subseteq({b:?}) = {sub}, \
                     but {a:?}.join({b:?}) == {b:?} is {join_agrees}"
                ));
            }
        }
    }
}

fn check_bottom_laws<L: HasBottom + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    let bot = L::bottom();
    for x in elements {
        if !bot.is_subseteq(x) {
            v.push(format!(
                "bottom not below element: bottom().is_subseteq({x:?}) = false"
            ));
        }
        if bot.join(x) != *x {
            v.push(format!("bottom identity violated: bottom().join({x:?}) != {x:?}"));
        }
    }
}

fn check_widening_laws<D: AbstractDomain>(elements: &[D], v: &mut Vec<String>) {
    for a in elements {
        for b in elements {
            let widened = a.widen(b);
            if !a.is_subseteq(&widened) || !b.is_subseteq(&widened) {
                v.push(format!(
                    "widening not an upper bound: {a:?}.widen({b:?}) = {widened:?}"
                ));
            }
        }
    }
}
