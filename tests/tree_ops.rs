mod common;

use common::SCHOOL_MARKUP;
use smartschool_api::config::Exclusions;
use smartschool_api::io::markup;
use smartschool_api::model::{Account, Group, GroupKind, GroupTree};
use smartschool_api::tree;

fn school() -> GroupTree {
    let mut groups = markup::ingest(SCHOOL_MARKUP).expect("markup ingested").tree;
    let root = groups.root();
    tree::sort(&mut groups, root);
    groups
}

fn names(groups: &GroupTree, ids: &[smartschool_api::model::GroupId]) -> Vec<String> {
    ids.iter().map(|id| groups.group(*id).name.clone()).collect()
}

#[test]
fn find_walks_pre_order_and_misses_unknown_names() {
    let groups = school();
    let top = groups.top_level().expect("top group");
    let none = Exclusions::new();

    assert_eq!(tree::find(&groups, top, &none, "Root"), Some(top));
    let board = tree::find(&groups, top, &none, "Directie").expect("board found");
    assert_eq!(groups.group(board).code, "DIR");
    assert_eq!(tree::find(&groups, top, &none, "Nobody"), None);
}

#[test]
fn exclusions_hide_subtrees_but_not_the_group() {
    let groups = school();
    let top = groups.top_level().expect("top group");
    let staff: Exclusions = ["Personeel"].into_iter().collect();

    assert!(tree::find(&groups, top, &staff, "Personeel").is_some());
    assert_eq!(tree::find(&groups, top, &staff, "Directie"), None);

    assert_eq!(tree::count(&groups, top, &Exclusions::new(), false), 6);
    assert_eq!(tree::count(&groups, top, &staff, false), 4);

    let flat = tree::flatten(&groups, top, &staff);
    assert_eq!(names(&groups, &flat), vec!["1A", "2B", "Leerlingen", "Personeel", "Root"]);
}

#[test]
fn counting_classes_never_exceeds_counting_groups() {
    let groups = school();
    let top = groups.top_level().expect("top group");
    let none = Exclusions::new();

    let classes = tree::count(&groups, top, &none, true);
    let all = tree::count(&groups, top, &none, false);
    assert_eq!(classes, 2);
    assert!(classes <= all);
}

#[test]
fn flatten_lists_children_before_parents() {
    let groups = school();
    let top = groups.top_level().expect("top group");
    let flat = tree::flatten(&groups, top, &Exclusions::new());

    assert_eq!(
        names(&groups, &flat),
        vec!["1A", "2B", "Leerlingen", "Directie", "Personeel", "Root"]
    );
    for (position, id) in flat.iter().enumerate() {
        for child in groups.children(*id) {
            let child_position = flat.iter().position(|entry| entry == child).expect("listed");
            assert!(child_position < position);
        }
    }
}

#[test]
fn sort_orders_every_level_by_ordinal_name() {
    let mut groups = GroupTree::with_root(Group::new("top", GroupKind::Group));
    let root = groups.root();
    for name in ["b", "B", "a", "10", "2"] {
        groups.add_child(root, Group::new(name, GroupKind::Group));
    }
    let nested = groups.children(root)[0];
    for name in ["z", "y"] {
        groups.add_child(nested, Group::new(name, GroupKind::Group));
    }

    tree::sort(&mut groups, root);

    assert_eq!(names(&groups, groups.children(root)), vec!["10", "2", "B", "a", "b"]);
    let b = tree::find(&groups, root, &Exclusions::new(), "b").expect("found");
    assert_eq!(names(&groups, groups.children(b)), vec!["y", "z"]);
}

#[test]
fn count_members_sums_loaded_accounts() {
    let mut groups = school();
    let top = groups.top_level().expect("top group");
    let none = Exclusions::new();
    let board = tree::find(&groups, top, &none, "Directie").expect("found");
    let class = tree::find(&groups, top, &none, "1A").expect("found");

    groups.get_mut(board).members = vec![Account::new("boss")];
    groups.get_mut(class).members = vec![Account::new("s1"), Account::new("s2")];

    assert_eq!(tree::count_members(&groups, top, &none), 3);
    let staff: Exclusions = ["Personeel"].into_iter().collect();
    assert_eq!(tree::count_members(&groups, top, &staff), 2);
}

#[test]
fn has_ancestor_follows_parent_links() {
    let groups = school();
    let top = groups.top_level().expect("top group");
    let class = tree::find(&groups, top, &Exclusions::new(), "2B").expect("found");

    assert!(tree::has_ancestor(&groups, class, "Leerlingen"));
    assert!(tree::has_ancestor(&groups, class, "Root"));
    assert!(!tree::has_ancestor(&groups, class, "Personeel"));
    assert!(!tree::has_ancestor(&groups, class, "2B"));
}

#[test]
fn detach_unlinks_a_subtree() {
    let mut groups = school();
    let top = groups.top_level().expect("top group");
    let none = Exclusions::new();
    let staff = tree::find(&groups, top, &none, "Personeel").expect("found");

    assert!(groups.detach(staff));
    assert!(!groups.detach(staff));
    assert_eq!(tree::find(&groups, top, &none, "Directie"), None);
    assert_eq!(tree::count(&groups, top, &none, false), 4);
    assert!(!groups.detach(groups.root()));
}

#[test]
fn deep_nesting_does_not_recurse() {
    let depth = 20_000;
    let source = format!(
        "{}{}",
        "<group><name>n</name>".repeat(depth),
        "</group>".repeat(depth)
    );
    let mut groups = markup::ingest(&source).expect("markup ingested").tree;
    let root = groups.root();
    let top = groups.top_level().expect("top group");
    tree::sort(&mut groups, root);

    assert_eq!(tree::count(&groups, top, &Exclusions::new(), false), depth);
    assert_eq!(tree::flatten(&groups, top, &Exclusions::new()).len(), depth);
    assert_eq!(tree::depth(&groups, top), depth);
}

#[test]
fn depth_counts_the_longest_branch() {
    let groups = school();
    let top = groups.top_level().expect("top group");
    let board = tree::find(&groups, top, &Exclusions::new(), "Directie").expect("found");

    assert_eq!(tree::depth(&groups, top), 3);
    assert_eq!(tree::depth(&groups, board), 1);
    assert_eq!(tree::depth(&groups, groups.root()), 4);
}
