use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use vc_pack::{Pack, PackError, PackOptions, Packer};

#[derive(Pack, Debug, PartialEq)]
struct Product {
    name: String,
    price: f64,
}

#[derive(Pack, Debug, PartialEq)]
struct Child {
    label: String,
}

#[derive(Pack, Debug)]
struct Parent {
    left: Rc<Child>,
    right: Rc<Child>,
}

#[derive(Pack, Debug, Default)]
struct Node {
    value: u32,
    next: Option<Rc<RefCell<Node>>>,
}

#[derive(Pack, Debug, PartialEq)]
struct Inner {
    data: Vec<u8>,
}

#[derive(Pack, Debug, PartialEq)]
struct Outer {
    inner: Inner,
    tail: u8,
}

#[derive(Pack, Debug)]
struct Unlisted {
    flag: bool,
}

#[derive(Pack, Debug, Default, PartialEq)]
struct Leaf {
    id: u8,
}

#[derive(Pack, Debug, PartialEq)]
struct Nested {
    child: Option<Box<Nested>>,
}

#[test]
fn scenario_bools_share_a_buffer() {
    let mut packer = Packer::new();
    packer.serialize(&true).unwrap();
    packer.serialize(&false).unwrap();
    assert_eq!(packer.length(), 2);

    packer.set_position(0).unwrap();
    let first: bool = packer.deserialize().unwrap();
    let second: bool = packer.deserialize().unwrap();
    assert_eq!((first, second), (true, false));
}

#[test]
fn scenario_product_round_trip() {
    let product = Product {
        name: "PC".into(),
        price: 450.0,
    };
    let mut packer = Packer::new();
    packer.serialize(&product).unwrap();
    // frame header + string header and payload + f64
    assert_eq!(packer.length(), 1 + (1 + 2) + 8);

    packer.set_position(0).unwrap();
    assert_eq!(packer.deserialize::<Product>().unwrap(), product);
}

#[test]
fn scenario_shared_child_keeps_identity() {
    let child = Rc::new(Child {
        label: "leaf".into(),
    });
    let parent = Parent {
        left: Rc::clone(&child),
        right: child,
    };

    let mut packer = Packer::new();
    packer.serialize(&parent).unwrap();
    // the second occurrence is a two byte back-reference
    assert_eq!(&packer.get_buffer()[packer.length() - 2..], &[0xC0, 0]);

    packer.set_position(0).unwrap();
    let back: Parent = packer.deserialize().unwrap();
    assert!(Rc::ptr_eq(&back.left, &back.right));
    assert_eq!(back.left.label, "leaf");
}

#[test]
fn arc_children_keep_identity() {
    let shared = Arc::new(vec![1u32, 2, 3]);
    let list = vec![Arc::clone(&shared), Arc::new(vec![4]), shared];

    let mut packer = Packer::new();
    packer.serialize(&list).unwrap();
    packer.set_position(0).unwrap();

    let back: Vec<Arc<Vec<u32>>> = packer.deserialize().unwrap();
    assert!(Arc::ptr_eq(&back[0], &back[2]));
    assert!(!Arc::ptr_eq(&back[0], &back[1]));
    assert_eq!(*back[1], [4]);
}

#[test]
fn nested_shared_pointers_keep_ordinals_aligned() {
    let inner = Rc::new(Leaf { id: 9 });
    let list = vec![Rc::new(Rc::clone(&inner)), Rc::new(inner)];

    let mut packer = Packer::new();
    packer.serialize(&list).unwrap();
    // each outer payload is framed, the inner repeat is a back-reference
    assert_eq!(packer.get_buffer(), &[0x82, 0x82, 0x81, 9, 0x82, 0xC0, 1]);

    packer.set_position(0).unwrap();
    let back: Vec<Rc<Rc<Leaf>>> = packer.deserialize().unwrap();
    assert!(!Rc::ptr_eq(&back[0], &back[1]));
    assert!(Rc::ptr_eq(&*back[0], &*back[1]));
    assert_eq!(back[1].id, 9);

    let inner = Rc::new(Leaf { id: 4 });
    let cells = vec![
        Rc::new(RefCell::new(Rc::clone(&inner))),
        Rc::new(RefCell::new(inner)),
    ];
    packer.set_length(0).unwrap();
    packer.serialize(&cells).unwrap();
    packer.set_position(0).unwrap();
    let back: Vec<Rc<RefCell<Rc<Leaf>>>> = packer.deserialize().unwrap();
    assert!(Rc::ptr_eq(&*back[0].borrow(), &*back[1].borrow()));

    let shared = Rc::new(Leaf { id: 1 });
    let boxed = vec![Arc::new(Box::new(Rc::clone(&shared))), Arc::new(Box::new(shared))];
    packer.set_length(0).unwrap();
    packer.serialize(&boxed).unwrap();
    packer.set_position(0).unwrap();
    let back: Vec<Arc<Box<Rc<Leaf>>>> = packer.deserialize().unwrap();
    assert!(Rc::ptr_eq(&**back[0], &**back[1]));
}

#[test]
fn self_referencing_graph_terminates() {
    let a = Rc::new(RefCell::new(Node {
        value: 1,
        next: None,
    }));
    let b = Rc::new(RefCell::new(Node {
        value: 2,
        next: Some(Rc::clone(&a)),
    }));
    a.borrow_mut().next = Some(Rc::clone(&b));

    let mut packer = Packer::new();
    packer.serialize(&a).unwrap();
    a.borrow_mut().next = None;

    packer.set_position(0).unwrap();
    let back: Rc<RefCell<Node>> = packer.deserialize().unwrap();
    let second = back.borrow().next.clone().unwrap();
    assert_eq!(back.borrow().value, 1);
    assert_eq!(second.borrow().value, 2);

    let third = second.borrow().next.clone().unwrap();
    assert!(Rc::ptr_eq(&back, &third));

    second.borrow_mut().next = None;
}

#[test]
fn backpatch_widens_nested_headers() {
    let value = Outer {
        inner: Inner {
            data: (0..70).collect(),
        },
        tail: 0xEE,
    };

    let mut packer = Packer::new();
    packer.serialize(&value).unwrap();
    let bytes = packer.get_buffer();

    // outer: 77 byte payload, inner: 73 byte payload, data: 70 elements
    assert_eq!(&bytes[..3], &[0x40, 0x9A, 0x01]);
    assert_eq!(&bytes[3..6], &[0x40, 0x92, 0x01]);
    assert_eq!(&bytes[6..9], &[0x40, 0x8C, 0x01]);
    assert_eq!(bytes[9], 0);
    assert_eq!(bytes[bytes.len() - 1], 0xEE);
    assert_eq!(bytes.len(), 80);

    packer.set_position(0).unwrap();
    assert_eq!(packer.deserialize::<Outer>().unwrap(), value);
}

#[test]
fn backpatch_across_inline_boundary() {
    for len in [59usize, 60, 61, 62, 63, 128] {
        let value = Inner {
            data: vec![7; len],
        };
        let mut packer = Packer::new();
        packer.serialize(&value).unwrap();
        packer.set_position(0).unwrap();
        assert_eq!(packer.deserialize::<Inner>().unwrap(), value, "len {len}");
        assert_eq!(packer.position(), packer.length());
    }
}

#[test]
fn null_empty_and_filled_are_distinct() {
    let values: [Option<Vec<u16>>; 3] = [None, Some(vec![]), Some(vec![5])];

    let mut packer = Packer::new();
    for value in &values {
        packer.serialize(value).unwrap();
    }
    assert_eq!(packer.get_buffer(), &[0x00, 0x80, 0x81, 5, 0]);

    packer.set_position(0).unwrap();
    for value in &values {
        assert_eq!(&packer.deserialize::<Option<Vec<u16>>>().unwrap(), value);
    }
}

#[test]
fn depth_limit_is_enforced() {
    let mut value = Nested { child: None };
    for _ in 0..8 {
        value = Nested {
            child: Some(Box::new(value)),
        };
    }

    let options = PackOptions::new().with_max_depth(4);
    let mut packer = Packer::with_options(options).unwrap();
    let err = packer.serialize(&value).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        PackError::DepthLimitExceeded { limit: 4 }
    ));
    assert_eq!(packer.length(), 0);

    let mut packer = Packer::new();
    packer.serialize(&value).unwrap();
    packer.set_position(0).unwrap();
    assert_eq!(packer.deserialize::<Nested>().unwrap(), value);
}

#[test]
fn failed_call_leaves_packer_reusable() {
    let mut packer = Packer::new();
    packer.serialize(&7u8).unwrap();

    // truncated object: claims 11 payload bytes, holds 3
    packer.buffer_mut().write_bytes(&[0x8B, 2, b'P', b'C']).unwrap();
    packer.set_position(1).unwrap();
    let err = packer.deserialize::<Product>().unwrap_err();
    assert!(err.is_end_of_data());
    assert_eq!(packer.position(), 1);

    // corrupt string inside an object is wrapped
    packer.set_length(1).unwrap();
    packer.buffer_mut().write_bytes(&[0x8B, 0x80]).unwrap();
    packer.buffer_mut().write_bytes(&[0; 10]).unwrap();
    packer.set_position(1).unwrap();
    let err = packer.deserialize::<Product>().unwrap_err();
    match &err {
        PackError::DataCorruption { type_path, .. } => {
            assert_eq!(*type_path, Product::type_path());
        }
        other => panic!("unexpected error: {other}"),
    }

    packer.set_position(0).unwrap();
    assert_eq!(packer.deserialize::<u8>().unwrap(), 7);
    packer.set_length(1).unwrap();
    packer.serialize(&Child { label: "ok".into() }).unwrap();
    packer.set_position(1).unwrap();
    assert_eq!(packer.deserialize::<Child>().unwrap().label, "ok");
}

#[test]
fn dynamic_dispatch_uses_the_registry() {
    let mut packer = Packer::new();
    packer.registry().write().register::<Product>();

    let value: Box<dyn core::any::Any> = Box::new(Product {
        name: "box".into(),
        price: 1.5,
    });
    packer.serialize_dyn(value.as_ref()).unwrap();

    packer.set_position(0).unwrap();
    let back = packer
        .deserialize_dyn(core::any::TypeId::of::<Product>())
        .unwrap();
    assert_eq!(back.downcast_ref::<Product>().unwrap().name, "box");

    packer.serialize_dyn(&0u8 as &dyn core::any::Any).unwrap();
    let err = packer.serialize_dyn(&Unlisted { flag: true }).unwrap_err();
    assert!(matches!(err, PackError::UnregisteredType { .. }));
}
