use std::cell::Cell;
use std::rc::Rc;

use grip::{HandleError, Strong, Weak, WEAK_COUNT_MAX};

struct Probe {
    drops: Rc<Cell<usize>>,
}

impl Probe {
    fn new(drops: &Rc<Cell<usize>>) -> Probe {
        Probe { drops: drops.clone() }
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[test]
fn test_weak_downgrade_counts() {
    let x = Strong::new(5usize);
    let w = x.downgrade();
    assert_eq!(x.strong_count(), 1);
    assert_eq!(x.weak_count(), 1);
    assert_eq!(w.strong_count(), 1);
    assert_eq!(w.weak_count(), 1);
    assert_eq!(w.is_attached(), true);
    assert_eq!(w.len(), 1);
    assert_eq!(w == x, true);
}

#[test]
fn test_weak_outlives_strong() {
    let drops = Rc::new(Cell::new(0));
    let x = Strong::new(Probe::new(&drops));
    let w = x.downgrade();
    assert_eq!(drops.get(), 0);
    // The last strong release destroys the payload, not the block.
    drop(x);
    assert_eq!(drops.get(), 1);
    assert_eq!(w.is_attached(), false);
    assert_eq!(w.strong_count(), 0);
    assert_eq!(w.weak_count(), 1);
    assert_eq!(w.upgrade().is_none(), true);
    assert_eq!(w.try_upgrade().err().unwrap(), HandleError::Cleared);
}

#[test]
fn test_weak_upgrade() {
    let drops = Rc::new(Cell::new(0));
    let x = Strong::new(Probe::new(&drops));
    let w = x.downgrade();
    {
        let y = w.upgrade().unwrap();
        assert_eq!(y.strong_count(), 2);
        assert_eq!(y.weak_count(), 1);
        assert_eq!(y.ptr_eq(&x), true);
    }
    assert_eq!(x.strong_count(), 1);
    assert_eq!(drops.get(), 0);
    // An upgraded handle keeps the payload alive on its own.
    let y = w.upgrade().unwrap();
    drop(x);
    assert_eq!(drops.get(), 0);
    drop(y);
    assert_eq!(drops.get(), 1);
    assert_eq!(w.upgrade().is_none(), true);
}

#[test]
fn test_weak_empty() {
    let w = Weak::<usize>::empty();
    assert_eq!(w.is_attached(), false);
    assert_eq!(w.strong_count(), 0);
    assert_eq!(w.weak_count(), 0);
    assert_eq!(w.len(), 0);
    assert_eq!(w.upgrade().is_none(), true);
    assert_eq!(w.try_upgrade().err().unwrap(), HandleError::Cleared);
    let v = w.try_clone().unwrap();
    assert_eq!(v.is_attached(), false);
    assert_eq!(w, Weak::default());
}

#[test]
fn test_weak_clone_counts() {
    let x = Strong::new(5usize);
    let w = x.downgrade();
    let v = w.clone();
    assert_eq!(x.weak_count(), 2);
    assert_eq!(w.ptr_eq(&v), true);
    drop(v);
    assert_eq!(x.weak_count(), 1);
}

#[test]
fn test_weak_clone_overflow() {
    let x = Strong::new(5usize);
    let w = x.downgrade();
    let mut clones = Vec::new();
    // Saturate the weak count bit field.
    for _ in 1..WEAK_COUNT_MAX {
        clones.push(w.clone());
    }
    assert_eq!(x.weak_count(), WEAK_COUNT_MAX);
    assert_eq!(w.try_clone().err().unwrap(), HandleError::WeakCountOverflow);
    assert_eq!(x.try_downgrade().err().unwrap(), HandleError::WeakCountOverflow);
    // Releasing one handle makes the count available again.
    drop(clones.pop());
    assert_eq!(w.try_clone().is_ok(), true);
}

#[test]
fn test_weak_clear() {
    let x = Strong::new(5usize);
    let mut w = x.downgrade();
    w.clear();
    assert_eq!(w.is_attached(), false);
    assert_eq!(x.weak_count(), 0);
}

#[test]
fn test_weak_eq_after_release() {
    let drops = Rc::new(Cell::new(0));
    let x = Strong::new(Probe::new(&drops));
    let w = x.downgrade();
    let v = w.clone();
    assert_eq!(w, v);
    drop(x);
    // Detached handles to the same block still compare equal, and also
    // equal to any other detached handle.
    assert_eq!(w, v);
    assert_eq!(w, Weak::empty());
}

#[test]
fn test_weak_clone_from_shared_block() {
    let x = Strong::new(5usize);
    let w = x.downgrade();
    let mut v = w.clone();
    // Assigning a handle over a handle to the same block must not release.
    v.clone_from(&w);
    assert_eq!(x.weak_count(), 2);
}

#[test]
fn test_weak_block_reclaimed_after_strong() {
    let drops = Rc::new(Cell::new(0));
    let w = {
        let x = Strong::new(Probe::new(&drops));
        x.downgrade()
    };
    assert_eq!(drops.get(), 1);
    assert_eq!(w.weak_count(), 1);
    // The last weak release frees the control block; this just must not
    // crash or leak.
    drop(w);
}
