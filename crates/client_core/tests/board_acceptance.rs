use std::collections::HashSet;

use client_core::{
    queries, BoardSummary, ExportFormat, Ignored, RetrospectiveState, Session, SessionError,
};
use proptest::prelude::*;
use shared::{
    domain::{Color, Goal, GoalId, Marker, MarkerId, ParticipantId, Position, Score},
    protocol::{decode_actions, Action},
};
use url::Url;

fn board_url() -> Url {
    Url::parse("http://localhost:5173/").expect("url")
}

#[derive(Debug, Clone)]
enum Op {
    AddGoal(u8),
    RemoveGoal(u8),
    AddMarker { marker: u8, goal: u8, score: u8 },
    UpdateMarker { marker: u8, goal: u8, score: u8, x: u8, y: u8 },
    RemoveMarker(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4).prop_map(Op::AddGoal),
        (0u8..4).prop_map(Op::RemoveGoal),
        (0u8..8, 0u8..4, 1u8..=8).prop_map(|(marker, goal, score)| Op::AddMarker {
            marker,
            goal,
            score
        }),
        (0u8..8, 0u8..4, 1u8..=8, 0u8..=100, 0u8..=100).prop_map(
            |(marker, goal, score, x, y)| Op::UpdateMarker {
                marker,
                goal,
                score,
                x,
                y
            }
        ),
        (0u8..8).prop_map(Op::RemoveMarker),
    ]
}

fn goal_id(n: u8) -> GoalId {
    GoalId::from(format!("g{n}"))
}

fn marker(n: u8, goal: u8, score: u8) -> Marker {
    Marker {
        id: MarkerId::from(format!("m{n}")),
        participant_id: ParticipantId::from("p"),
        goal_id: goal_id(goal),
        score: Score::new(score).expect("score"),
        position: Position::CENTER,
        color: Color::default(),
    }
}

fn to_action(op: &Op) -> Action {
    match *op {
        Op::AddGoal(n) => Action::AddGoal(Goal {
            id: goal_id(n),
            text: format!("Goal {n}"),
        }),
        Op::RemoveGoal(n) => Action::RemoveGoal(goal_id(n)),
        Op::AddMarker { marker: m, goal, score } => Action::AddMarker(marker(m, goal, score)),
        Op::UpdateMarker {
            marker: m,
            goal,
            score,
            x,
            y,
        } => Action::UpdateMarker(
            marker(m, goal, score)
                .moved_to(Position::new(f64::from(x), f64::from(y)).expect("position")),
        ),
        Op::RemoveMarker(n) => Action::RemoveMarker(MarkerId::from(format!("m{n}"))),
    }
}

fn assert_views_agree(state: &RetrospectiveState) -> Result<(), TestCaseError> {
    let flat: HashSet<&str> = state.markers().iter().map(|m| m.id.as_str()).collect();
    prop_assert_eq!(flat.len(), state.markers().len(), "duplicate marker id");

    let mut nested = HashSet::new();
    for goal in queries::nested_goals(state) {
        for marker in &goal.markers {
            prop_assert_eq!(&marker.goal_id, &goal.goal.id);
            prop_assert!(
                nested.insert(marker.id.to_string()),
                "marker {} nested twice",
                marker.id
            );
        }
    }
    let nested: HashSet<&str> = nested.iter().map(String::as_str).collect();
    prop_assert_eq!(flat, nested);

    let goals: HashSet<&GoalId> = state.goals().iter().map(|g| &g.id).collect();
    prop_assert_eq!(goals.len(), state.goals().len(), "duplicate goal id");
    Ok(())
}

proptest! {
    /// The flat marker list and the per-goal lists hold the same markers
    /// after any sequence of goal and marker edits.
    #[test]
    fn prop_flat_and_nested_views_agree(ops in prop::collection::vec(op(), 0..64)) {
        let mut state = RetrospectiveState::new();
        for op in &ops {
            state = state.apply(&to_action(op));
            assert_views_agree(&state)?;
        }
    }

    /// Removing a marker twice equals removing it once.
    #[test]
    fn prop_remove_marker_idempotent(ops in prop::collection::vec(op(), 0..32), target in 0u8..8) {
        let state = ops
            .iter()
            .fold(RetrospectiveState::new(), |s, op| s.apply(&to_action(op)));
        let remove = Action::RemoveMarker(MarkerId::from(format!("m{target}")));
        let once = state.apply(&remove);
        prop_assert_eq!(once.apply(&remove), once);
    }
}

#[test]
fn scored_marker_can_be_moved_without_changing_its_score() {
    let mut session = Session::open(&board_url(), "Retrospective Target Board");
    session.join_as_facilitator();
    let goal_id = session.add_goal("Improve testing").expect("goal");
    let ana = session
        .add_participant("Ana", Color::new("#3b82f6"))
        .expect("participant");
    session.act_as(&ana).expect("act as");

    let marker_id = session
        .place_marker(&goal_id, Score::new(5).expect("score"), Color::new("#3b82f6"))
        .expect("marker");
    assert_eq!(
        session.state().marker(&marker_id).map(|m| m.position),
        Some(Position::CENTER)
    );

    session
        .move_marker(&marker_id, Position::new(80.0, 20.0).expect("position"))
        .expect("move");

    let markers = queries::markers_for_goal(session.state(), &goal_id);
    assert_eq!(markers.len(), 1);
    assert_eq!((markers[0].position.x(), markers[0].position.y()), (80.0, 20.0));
    assert_eq!(markers[0].score.value(), 5);
    assert_eq!(
        queries::participant_name(session.state().participants(), &markers[0].participant_id),
        "Ana"
    );
}

#[test]
fn removing_a_goal_removes_its_markers_everywhere() {
    let mut session = Session::open(&board_url(), "Retro");
    session.join_as_facilitator();
    let goal_id = session.add_goal("Improve testing").expect("goal");
    let other_goal = session.add_goal("Ship weekly").expect("goal");
    let ana = session.add_participant("Ana", Color::default()).expect("ana");
    session.act_as(&ana).expect("act as");

    let score = Score::new(3).expect("score");
    let m1 = session.place_marker(&goal_id, score, Color::default()).expect("m1");
    let m2 = session.place_marker(&goal_id, score, Color::default()).expect("m2");
    let kept = session.place_marker(&other_goal, score, Color::default()).expect("kept");

    session.remove_goal(&goal_id).expect("remove");

    let state = session.state();
    assert!(state.marker(&m1).is_none());
    assert!(state.marker(&m2).is_none());
    assert!(state.marker(&kept).is_some());
    for nested in queries::nested_goals(state) {
        assert!(nested.markers.iter().all(|m| m.id != m1 && m.id != m2));
    }
}

#[test]
fn goals_keep_insertion_order_through_edits() {
    let mut session = Session::open(&board_url(), "Retro");
    session.join_as_facilitator();
    let g1 = session.add_goal("One").expect("g1");
    let g2 = session.add_goal("Two").expect("g2");
    let g3 = session.add_goal("Three").expect("g3");
    session.rename_goal(&g2, "Second").expect("rename");

    let ids: Vec<_> = session.state().goals().iter().map(|g| g.id.clone()).collect();
    assert_eq!(ids, vec![g1, g2, g3]);
}

#[test]
fn fresh_session_offers_no_goal_authoring() {
    let mut session = Session::open(&board_url(), "Retro");
    assert!(!session.has_joined());
    assert_eq!(
        session.add_goal("Sneaky"),
        Err(SessionError::FacilitatorRequired("add goals"))
    );

    session.join_as_facilitator();
    assert!(session.add_goal("Allowed").is_ok());
}

#[test]
fn empty_board_exports_zero_counts() {
    let session = Session::open(&board_url(), "Retro");
    let snapshot = session.export();

    assert_eq!(snapshot.summary(), BoardSummary::default());
    for format in [ExportFormat::Text, ExportFormat::Json] {
        let rendered = snapshot.render(session.title(), format).expect("render");
        assert!(!rendered.is_empty());
    }
}

const SAMPLE_LOG: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../demos/sample_actions.json"
));

#[test]
fn bundled_sample_log_replays_cleanly() {
    let batch = decode_actions(SAMPLE_LOG).expect("sample log is a JSON array");
    assert!(batch.skipped.is_empty(), "undecodable: {:?}", batch.skipped);

    let mut session = Session::open(&board_url(), "Sample");
    let ignored: Vec<Ignored> = batch
        .actions
        .into_iter()
        .filter_map(|action| session.dispatch(action))
        .collect();
    assert_eq!(ignored, vec![Ignored::UnknownMarker(MarkerId::from("m-missing"))]);

    let state = session.state();
    assert!(state.is_facilitator());
    assert_eq!(
        BoardSummary::of(state),
        BoardSummary {
            goals: 2,
            participants: 1,
            markers: 1
        }
    );
    let marker = state.marker(&MarkerId::from("m-1")).expect("m-1");
    assert_eq!(marker.position, Position::new(80.0, 20.0).expect("position"));
    assert_eq!(
        state.goal(&GoalId::from("g-ship")).map(|goal| goal.text.as_str()),
        Some("Ship every week")
    );

    let report = session
        .export()
        .render(session.title(), ExportFormat::Text)
        .expect("render");
    assert!(report.contains("Ana: 5 points"), "{report}");
}
