use std::fs;
use std::path::Path;
use std::sync::Arc;

use icschart::application::services::TemplateService;
use icschart::application::ApplicationError;
use icschart::domain::{DomainError, RoleType};
use icschart::infrastructure::traits::RealFileSystem;
use icschart::util::testing::init_test_setup;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const HAZMAT: &str = r#"
name = "Hazmat"

[root]
id = "root"
title = "EOC Director"
role = "Director"

[[root.children]]
id = "ops"
title = "Operations Chief"
role = "Section"

[[root.children.children]]
id = "decon"
title = "Decon Group"
role = "Group"
assignee = "K. Osei"
"#;

#[fixture]
fn service() -> TemplateService {
    init_test_setup();
    TemplateService::new(Arc::new(RealFileSystem))
}

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[rstest]
fn given_template_file_when_loading_then_tree_parsed(service: TemplateService) {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "hazmat.toml", HAZMAT);

    let loaded = service.load_file(&tmp.path().join("hazmat.toml")).unwrap();

    assert_eq!(loaded.name, "Hazmat");
    assert_eq!(loaded.tree.count(), 3);
    let decon = loaded.tree.find("decon").unwrap();
    assert_eq!(decon.role_type, Some(RoleType::Group));
    assert_eq!(decon.assignee_name, "K. Osei");
}

#[rstest]
fn given_unnamed_file_when_loading_then_stem_is_name(service: TemplateService) {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "tornado.toml",
        "[root]\nid = \"root\"\ntitle = \"EOC Director\"\n",
    );

    let loaded = service.load_file(&tmp.path().join("tornado.toml")).unwrap();

    assert_eq!(loaded.name, "tornado");
}

#[rstest]
#[case::wrong_root_id("[root]\nid = \"top\"\ntitle = \"Director\"\n")]
#[case::not_toml("root = [")]
#[case::missing_root("name = \"Empty\"\n")]
fn given_invalid_file_when_loading_then_invalid_template(
    service: TemplateService,
    #[case] content: &str,
) {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "bad.toml", content);

    let err = service.load_file(&tmp.path().join("bad.toml")).unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidTemplate { .. })
    ));
}

#[rstest]
fn given_nested_directory_when_building_catalog_then_overlaid_on_builtins(
    service: TemplateService,
) {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "extra/hazmat.toml", HAZMAT);
    write(
        tmp.path(),
        "Flood.toml",
        "[root]\nid = \"root\"\ntitle = \"Flood Director\"\n",
    );
    write(tmp.path(), "notes.txt", "ignored");

    let catalog = service.catalog(Some(tmp.path())).unwrap();

    assert_eq!(catalog.len(), 4);
    assert!(catalog.get("Hazmat").is_ok());
    assert_eq!(catalog.get("Flood").unwrap().title, "Flood Director");
    assert!(catalog.get("General").is_ok());
}

#[rstest]
fn given_missing_directory_when_building_catalog_then_config_error(service: TemplateService) {
    let tmp = TempDir::new().unwrap();

    let err = service
        .catalog(Some(&tmp.path().join("absent")))
        .unwrap_err();

    assert!(matches!(err, ApplicationError::Config { .. }));
}

#[rstest]
fn given_no_directory_when_building_catalog_then_builtins_in_order(service: TemplateService) {
    let catalog = service.catalog(None).unwrap();

    assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["General", "Wildfire", "Flood"]);
}
