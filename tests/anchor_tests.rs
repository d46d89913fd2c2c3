use std::cell::Cell;
use std::rc::Rc;

use grip::{Anchor, HandleError, Intrusive, Strong, Weak};

struct Node {
    anchor: Anchor<Node>,
    value: i32,
    drops: Rc<Cell<usize>>,
}

impl Node {
    fn new(value: i32, drops: &Rc<Cell<usize>>) -> Node {
        Node {
            anchor: Anchor::new(),
            value,
            drops: drops.clone(),
        }
    }
}

impl Intrusive for Node {
    fn anchor(&self) -> &Anchor<Node> {
        &self.anchor
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[test]
fn test_adopt() {
    let drops = Rc::new(Cell::new(0));
    let node = Box::new(Node::new(5, &drops));
    assert_eq!(node.anchor().is_adopted(), false);
    {
        let x = Strong::adopt(node);
        assert_eq!(x.anchor().is_adopted(), true);
        assert_eq!(x.strong_count(), 1);
        assert_eq!(x.weak_count(), 0);
        assert_eq!(x.value, 5);
        assert_eq!(drops.get(), 0);
    }
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_strong_from_payload_shares_block() {
    let drops = Rc::new(Cell::new(0));
    let x = Strong::adopt(Box::new(Node::new(5, &drops)));
    let y = Strong::from_payload(&*x);
    assert_eq!(x.ptr_eq(&y), true);
    assert_eq!(x.strong_count(), 2);
    drop(x);
    assert_eq!(drops.get(), 0);
    assert_eq!(y.strong_count(), 1);
    drop(y);
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_weak_from_payload_observes_release() {
    let drops = Rc::new(Cell::new(0));
    let x = Strong::adopt(Box::new(Node::new(5, &drops)));
    let w = Weak::from_payload(&*x);
    assert_eq!(x.strong_count(), 1);
    assert_eq!(x.weak_count(), 1);
    assert_eq!(w == x, true);
    drop(x);
    assert_eq!(drops.get(), 1);
    assert_eq!(w.is_attached(), false);
    assert_eq!(w.try_upgrade().err().unwrap(), HandleError::Cleared);
}

#[test]
fn test_weak_from_payload_upgrade_shares_block() {
    let drops = Rc::new(Cell::new(0));
    let x = Strong::adopt(Box::new(Node::new(5, &drops)));
    let w = Weak::from_payload(&*x);
    let y = w.upgrade().unwrap();
    assert_eq!(y.ptr_eq(&x), true);
    assert_eq!(x.strong_count(), 2);
}

#[test]
fn test_adopt_single_block_across_handles() {
    let drops = Rc::new(Cell::new(0));
    let x = Strong::adopt(Box::new(Node::new(5, &drops)));
    // Every handle minted from the payload shares the one embedded block.
    let y = Strong::from_payload(&*x);
    let z = Strong::from_payload(&*y);
    let w = Weak::from_payload(&*z);
    assert_eq!(x.strong_count(), 3);
    assert_eq!(x.weak_count(), 1);
    assert_eq!(x.ptr_eq(&z), true);
    assert_eq!(w.weak_count(), 1);
    drop(y);
    drop(z);
    assert_eq!(x.strong_count(), 1);
    assert_eq!(drops.get(), 0);
}

#[test]
#[should_panic(expected = "intrusive payload not adopted")]
fn test_unadopted_from_payload_panics() {
    let drops = Rc::new(Cell::new(0));
    let node = Node::new(5, &drops);
    let _ = Strong::from_payload(&node);
}
