use icschart::domain::{
    DomainError, MoveOutcome, NodeField, NodeRepository, NodeUpdate, OrganizationNode, RoleType,
    TemplateCatalog, DEFAULT_TITLE, ROOT_ID,
};
use icschart::util::testing;
use rstest::{fixture, rstest};

#[fixture]
fn repo() -> NodeRepository {
    testing::init_test_setup();
    NodeRepository::new()
}

fn child_ids(repo: &NodeRepository, id: &str) -> Vec<String> {
    repo.find(id)
        .map(|n| n.children().map(|c| c.id().to_string()).collect())
        .unwrap_or_default()
}

#[rstest]
fn given_default_chart_when_editing_then_follows_command_scenario(mut repo: NodeRepository) {
    assert_eq!(repo.root().unwrap().child_count(), 7);
    assert_eq!(child_ids(&repo, "ops"), vec!["ops-b1"]);

    let added = repo.add_child("ops").unwrap();
    assert_eq!(repo.find("ops").unwrap().child_count(), 2);
    assert_eq!(repo.find(added.as_str()).unwrap().title(), DEFAULT_TITLE);

    assert_eq!(repo.move_node("ops-b1", "plan").unwrap(), MoveOutcome::Moved);
    assert_eq!(child_ids(&repo, "plan"), vec!["ops-b1"]);
    assert_eq!(child_ids(&repo, "ops"), vec![added.to_string()]);

    let removed = repo.delete("ops").unwrap();
    assert_eq!(removed.len(), 2);
    assert!(!repo.contains("ops"));
    assert!(!repo.contains(added.as_str()));
    assert!(repo.contains("ops-b1"));
    assert_eq!(repo.root().unwrap().child_count(), 6);
    repo.check_invariants().unwrap();
}

#[rstest]
fn given_subordinate_target_when_moving_then_rejected_and_unchanged(mut repo: NodeRepository) {
    let before = repo.snapshot();
    let version = repo.version();

    let err = repo.move_node("ops", "ops-b1").unwrap_err();

    assert!(matches!(err, DomainError::CycleRejected { .. }));
    assert!(err.to_string().contains("own subordinate structure"));
    assert_eq!(repo.snapshot(), before);
    assert_eq!(repo.version(), version);
}

#[rstest]
#[case::delete_root(|r: &mut NodeRepository| r.delete(ROOT_ID).map(|_| ()))]
#[case::move_root(|r: &mut NodeRepository| r.move_node(ROOT_ID, "ops").map(|_| ()))]
#[case::sibling_of_root(|r: &mut NodeRepository| r.add_sibling(ROOT_ID).map(|_| ()))]
#[case::unknown_parent(|r: &mut NodeRepository| r.add_child("nope").map(|_| ()))]
#[case::unknown_update(|r: &mut NodeRepository| r.update("nope", NodeUpdate::Title("x".into())))]
fn given_invalid_edit_when_applied_then_tree_unchanged(
    mut repo: NodeRepository,
    #[case] edit: fn(&mut NodeRepository) -> Result<(), DomainError>,
) {
    let before = repo.snapshot();

    assert!(edit(&mut repo).is_err());

    assert_eq!(repo.snapshot(), before);
    repo.check_invariants().unwrap();
}

#[rstest]
fn given_same_source_and_target_when_moving_then_unchanged(mut repo: NodeRepository) {
    let version = repo.version();
    assert_eq!(repo.move_node("plan", "plan").unwrap(), MoveOutcome::Unchanged);
    assert_eq!(repo.version(), version);
}

#[rstest]
fn given_moved_subtree_when_relocated_then_contents_preserved(mut repo: NodeRepository) {
    repo.add_child("ops-b1").unwrap();
    repo.update("ops-b1", NodeUpdate::Assignee("J. Rivera".into()))
        .unwrap();
    let subtree = repo.find("ops").unwrap().to_tree();

    repo.move_node("ops", "log").unwrap();

    assert_eq!(repo.parent("ops").unwrap().id().as_str(), "log");
    assert_eq!(repo.find("ops").unwrap().to_tree(), subtree);
    assert_eq!(repo.depth("ops-b1"), Some(3));
    assert!(!child_ids(&repo, ROOT_ID).contains(&"ops".to_string()));
}

#[rstest]
fn given_sibling_request_when_adding_then_child_of_parent(mut repo: NodeRepository) {
    let id = repo.add_sibling("plan").unwrap();
    assert_eq!(repo.parent(id.as_str()).unwrap().id().as_str(), ROOT_ID);
    assert_eq!(repo.root().unwrap().child_count(), 8);
}

#[rstest]
fn given_field_updates_when_applied_then_visible_through_find(mut repo: NodeRepository) {
    repo.update("info", NodeUpdate::parse(NodeField::Title, "PIO").unwrap())
        .unwrap();
    repo.update("info", NodeUpdate::parse(NodeField::Role, "unit").unwrap())
        .unwrap();

    let node = repo.find("info").unwrap();
    assert_eq!(node.title(), "PIO");
    assert_eq!(node.role_type(), Some(RoleType::Unit));
    assert_eq!(node.effective_role(), RoleType::Unit);
    assert_eq!(repo.effective_role("liaison"), Some(RoleType::default_for_depth(1)));
}

#[rstest]
fn given_edits_when_loading_wildfire_then_prior_edits_discarded(mut repo: NodeRepository) {
    repo.add_child("plan").unwrap();
    repo.delete("safety").unwrap();
    let catalog = TemplateCatalog::builtin();
    let wildfire = catalog.get("Wildfire").unwrap().clone();

    repo.load_template("Wildfire", &wildfire).unwrap();

    assert_eq!(repo.snapshot(), wildfire);
    assert_eq!(repo.root().unwrap().id().as_str(), ROOT_ID);
    assert!(repo.contains("fire-branch"));
    assert!(!repo.contains("safety"));
}

#[rstest]
fn given_template_with_duplicate_ids_when_loading_then_rejected(mut repo: NodeRepository) {
    let bad = OrganizationNode::new(ROOT_ID, "Director").with_children(vec![
        OrganizationNode::new("a", "A"),
        OrganizationNode::new("a", "A again"),
    ]);
    let before = repo.snapshot();

    let err = repo.load_template("bad", &bad).unwrap_err();

    assert!(matches!(err, DomainError::InvalidTemplate { .. }));
    assert_eq!(repo.snapshot(), before);
}

#[rstest]
fn given_deleted_ids_when_adding_then_never_reused(mut repo: NodeRepository) {
    let first = repo.add_child("fin").unwrap();
    repo.delete(first.as_str()).unwrap();
    for _ in 0..20 {
        let id = repo.add_child("fin").unwrap();
        assert_ne!(id, first);
    }
    repo.check_invariants().unwrap();
}

#[rstest]
fn given_edits_when_resetting_then_default_chart_restored(mut repo: NodeRepository) {
    let default_chart = repo.snapshot();
    repo.delete("ops").unwrap();
    repo.reset().unwrap();
    assert_eq!(repo.snapshot(), default_chart);
}
