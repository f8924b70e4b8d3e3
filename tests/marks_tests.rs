use std::collections::BTreeSet;

use pagemark::marks::{DEFAULT_MIN_DRAG_PX, Group, Mark, MarkSet, label};
use pagemark::pdf::{NormRect, PageGeometry, Rotation, display_rect_to_norm};

/// Small deterministic generator so edit sequences are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

fn assert_dense(set: &MarkSet) {
    for (i, mark) in set.marks().iter().enumerate() {
        assert_eq!(mark.order_index, i, "order index of {}", mark.id);
        assert_eq!(mark.label, label(i));
    }
}

fn id_set(set: &MarkSet) -> BTreeSet<String> {
    set.ids().into_iter().collect()
}

#[test]
fn order_stays_dense_through_random_edits() {
    let mut rng = Lcg(7);
    let mut set = MarkSet::new();
    let mut next_id = 0;

    for _ in 0..400 {
        match rng.next(4) {
            0 => {
                let index = rng.next(set.len() + 1);
                let mark = Mark::new(format!("m{next_id}"), 0, NormRect::new(0.1, 0.1, 0.1, 0.1));
                next_id += 1;
                set.insert(index, mark).unwrap();
            }
            1 if !set.is_empty() => {
                let id = set.marks()[rng.next(set.len())].id.clone();
                set.remove(&id).unwrap();
            }
            2 if !set.is_empty() => {
                let before = id_set(&set);
                let id = set.marks()[rng.next(set.len())].id.clone();
                let to = rng.next(set.len());
                set.move_to(&id, to).unwrap();
                assert_eq!(id_set(&set), before);
                assert_eq!(set.position(&id), Some(to));
            }
            3 if !set.is_empty() => {
                let before = id_set(&set);
                let mut order = set.ids();
                for i in (1..order.len()).rev() {
                    order.swap(i, rng.next(i + 1));
                }
                set.set_order(&order).unwrap();
                assert_eq!(set.ids(), order);
                assert_eq!(id_set(&set), before);
            }
            _ => {}
        }
        assert_dense(&set);
    }
}

#[test]
fn backend_records_round_trip_through_json() {
    let json = r#"{
        "marks": [
            {"id": "x", "page_index": 0, "order_index": 1, "name": "Width",
             "nx": 0.1, "ny": 0.2, "nw": 0.3, "nh": 0.1, "instrument": "caliper"},
            {"id": "y", "page_index": 1, "order_index": 0, "name": "Depth",
             "nx": 0.5, "ny": 0.5, "nw": 0.6, "nh": 0.1, "zoom_hint": 2.5}
        ],
        "groups": [
            {"id": "g", "page_index": 0, "nx": 0.0, "ny": 0.0, "nw": 1.0, "nh": 0.5,
             "mark_ids": ["x", "y"]}
        ]
    }"#;
    let file: pagemark::cli::MarkFile = serde_json::from_str(json).unwrap();
    let mut set = MarkSet::from_records(file.marks, file.groups).unwrap();

    assert_eq!(set.ids(), vec!["y", "x"]);
    assert_eq!(set.get("x").unwrap().label, "B");
    // Loaded rects are kept even when they overflow the page
    assert!(set.get("y").unwrap().rect.exceeds_page());

    set.remove("y").unwrap();
    assert_eq!(set.group("g").unwrap().mark_ids, vec!["x"]);

    let value = serde_json::to_value(set.marks()).unwrap();
    assert_eq!(value[0]["label"], "A");
    assert_eq!(value[0]["instrument"], "caliper");
}

#[test]
fn drag_on_rotated_page_maps_back_to_unrotated_rect() {
    let page = PageGeometry::new(0, 600.0, 800.0, Rotation::Cw90);
    let mut set = MarkSet::new();

    // The rotated rect of (0.1, 0.2, 0.3, 0.1) at zoom 2
    let mark = set
        .create_from_drag(&page, 2.0, (320.0, 720.0), (480.0, 1080.0), DEFAULT_MIN_DRAG_PX)
        .unwrap();
    let r = mark.rect;
    assert!((r.nx - 0.1).abs() < 1e-4);
    assert!((r.ny - 0.2).abs() < 1e-4);
    assert!((r.nw - 0.3).abs() < 1e-4);
    assert!((r.nh - 0.1).abs() < 1e-4);
    assert_eq!(mark.page_index, 0);

    let back = display_rect_to_norm(mark.rect_at_zoom(&page, 2.0), &page, 2.0);
    assert!((back.nx - r.nx).abs() < 1e-5);
}

#[test]
fn group_members_resolve_in_group_order() {
    let mut set = MarkSet::new();
    for id in ["a", "b", "c"] {
        set.push(Mark::new(id, 0, NormRect::new(0.0, 0.0, 0.1, 0.1)))
            .unwrap();
    }
    let mut group = Group::new("g", 0, NormRect::new(0.0, 0.0, 1.0, 1.0));
    group.add_member("c");
    group.add_member("gone");
    group.add_member("a");
    set.add_group(group);

    let members: Vec<&str> = set
        .group_members("g")
        .unwrap()
        .iter()
        .map(|m| m.id.as_str())
        .collect();
    assert_eq!(members, vec!["c", "a"]);
}
