use icschart::application::services::{parse_script, run_script, ScriptCommand, StepStatus};
use icschart::application::ApplicationError;
use icschart::domain::RoleType;
use icschart::util::testing::{init_test_setup, session_answering};
use rstest::rstest;

const STAFFING: &str = r#"
# morning operational period
title ops "Ops Section Chief"
assign ops "D. Alvarez"
role info unit
add plan
move ops-b1 plan
delete root
drag ops ops-b1
collapse log
zoom in
pan 12 -8
"#;

#[test]
fn given_staffing_script_when_run_then_rejections_reported_and_run_continues() {
    init_test_setup();
    let mut session = session_answering(true);
    let lines = parse_script(STAFFING).unwrap();
    assert_eq!(lines.len(), 10);

    let reports = run_script(&mut session, &lines).unwrap();

    let rejected: Vec<usize> = reports
        .iter()
        .filter(|r| matches!(r.status, StepStatus::Rejected(_)))
        .map(|r| r.line)
        .collect();
    // ops-b1 left the ops subtree on line 7, so the drag on line 9 is legal
    assert_eq!(rejected, vec![8]);

    let repo = session.repository();
    let ops = repo.find("ops").unwrap();
    assert_eq!(ops.title(), "Ops Section Chief");
    assert_eq!(ops.assignee_name(), "D. Alvarez");
    assert_eq!(ops.parent().unwrap().id().as_str(), "ops-b1");
    assert_eq!(repo.effective_role("info"), Some(RoleType::Unit));
    assert_eq!(repo.find("plan").unwrap().child_count(), 2);
    assert!(session.collapse_state().is_collapsed("log"));
    assert_eq!(session.viewport().pan().x, 12.0);
    assert!((session.viewport().zoom() - 1.1).abs() < 1e-6);
}

#[test]
fn given_drag_into_own_subtree_when_run_then_rejected() {
    let mut session = session_answering(true);
    let lines = parse_script("drag ops ops-b1\ndrag root plan\n").unwrap();

    let reports = run_script(&mut session, &lines).unwrap();

    assert!(matches!(reports[0].status, StepStatus::Rejected(_)));
    assert!(matches!(reports[1].status, StepStatus::Rejected(_)));
    assert!(!session.drag().is_active());
}

#[test]
fn given_declined_confirmations_when_run_then_steps_cancelled() {
    let mut session = session_answering(false);
    let lines = parse_script("delete ops\ntemplate Wildfire\nreset\n").unwrap();

    let reports = run_script(&mut session, &lines).unwrap();

    assert!(reports.iter().all(|r| r.status == StepStatus::Cancelled));
    assert!(session.repository().contains("ops-b1"));
}

#[rstest]
#[case("add", 1)]
#[case("title ops \"unterminated", 1)]
#[case("# header\nzoom sideways", 2)]
#[case("add ops\npan 1 x", 2)]
#[case("add ops\n\nrole ops captain", 3)]
#[case("frobnicate ops", 1)]
fn given_syntax_error_when_parsing_then_line_reported(#[case] source: &str, #[case] line: usize) {
    let err = parse_script(source).unwrap_err();
    match err {
        ApplicationError::Script { line: got, .. } => assert_eq!(got, line),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn given_multi_word_template_when_parsing_then_joined() {
    let lines = parse_script("template My Custom Chart\nsibling plan").unwrap();
    assert_eq!(
        lines[0].command,
        ScriptCommand::Template("My Custom Chart".to_string())
    );
    assert_eq!(lines[1].line, 2);
}
