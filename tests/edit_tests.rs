//! Editing Integration Tests
//!
//! Selection, region select and drag sessions driven through `EventSink`.

use beatstack::edit::{
    row_y, ClickOutcome, EditSession, EventSink, PlaybackMode, PlotDelta, RoiRect, StackEditor,
};
use beatstack::engine::FrameNumber;
use beatstack::model::{EventId, Stack};

fn setup() -> (Stack, StackEditor) {
    let mut stack = Stack::new("groove", 2400);
    stack.create_layer("kick").unwrap();
    stack.create_layer("snare").unwrap();
    for frame in [100, 200, 300] {
        stack.add_event("kick", frame, None, None).unwrap();
    }
    stack.add_event("snare", 200, None, None).unwrap();
    let editor = StackEditor::for_stack(&stack);
    (stack, editor)
}

fn id_at(stack: &Stack, layer: &str, frame: FrameNumber) -> EventId {
    stack.get_event(layer, frame).unwrap().id()
}

#[test]
fn test_drag_commits_once_like_a_direct_move() {
    let (mut dragged, mut editor) = setup();
    let mut direct = dragged.clone();
    let id = id_at(&dragged, "kick", 200);

    {
        let mut session = EditSession::new(&mut dragged, &mut editor);
        session.on_select(id).unwrap();
        assert!(session.on_drag_start(id));
        for x in [3.2, 15.7, -40.0, 8.4, 24.6] {
            session.on_drag(PlotDelta::new(x, 0.0));
            // Nothing reaches the stack until the drag ends
            assert_eq!(session.stack().locate(id), Some(("kick".to_string(), 200)));
        }
        let outcome = session.on_drag_end();
        assert_eq!(outcome.moved, vec![id]);
        assert!(outcome.rejected.is_empty());
    }

    direct.move_event("kick", 200, 225).unwrap();
    assert_eq!(dragged, direct);
    assert_eq!(editor.plot().point(id).unwrap().x, 225.0);
    assert!(!editor.is_dragging());
}

#[test]
fn test_drag_whole_selection_through_itself() {
    let (mut stack, mut editor) = setup();
    let ids: Vec<EventId> = [100, 200, 300]
        .into_iter()
        .map(|f| id_at(&stack, "kick", f))
        .collect();

    let mut session = EditSession::new(&mut stack, &mut editor);
    session.on_select(ids[0]).unwrap();
    session.on_add_to_selection(ids[1]).unwrap();
    session.on_add_to_selection(ids[2]).unwrap();

    // Each event lands on the frame its neighbour held
    assert!(session.on_drag_start(ids[1]));
    session.on_drag(PlotDelta::new(100.0, 0.0));
    let outcome = session.on_drag_end();
    assert_eq!(outcome.moved.len(), 3);

    let frames: Vec<_> = session.stack().layer("kick").unwrap().frames().collect();
    assert_eq!(frames, vec![200, 300, 400]);
    assert_eq!(session.stack().locate(ids[0]), Some(("kick".to_string(), 200)));
}

#[test]
fn test_rejected_drag_member_snaps_back() {
    let (mut stack, mut editor) = setup();
    let a = id_at(&stack, "kick", 100);
    let b = id_at(&stack, "snare", 200);
    stack.add_event("snare", 210, None, None).unwrap();
    editor.rebuild(&stack);

    let mut session = EditSession::new(&mut stack, &mut editor);
    session.on_select(a).unwrap();
    session.on_add_to_selection(b).unwrap();
    assert!(session.on_drag_start(a));
    session.on_drag(PlotDelta::new(10.0, 0.0));
    let outcome = session.on_drag_end();

    assert_eq!(outcome.moved, vec![a]);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].0, b);
    assert_eq!(session.stack().locate(b), Some(("snare".to_string(), 200)));
    assert_eq!(session.editor().plot().point(b).unwrap().x, 200.0);
    assert_eq!(session.editor().plot().point(a).unwrap().x, 110.0);
}

#[test]
fn test_region_select_adds_to_selection() {
    let (mut stack, mut editor) = setup();
    let mut session = EditSession::new(&mut stack, &mut editor);

    // Covers kick 200/300 and snare 200
    let rect = RoiRect::from_corners(150.0, 0.0, 350.0, 2.0);
    let added = session.on_region_select(rect);
    assert_eq!(added.len(), 3);

    // A second sweep over the same area adds nothing new
    assert!(session.on_region_select(rect).is_empty());
    assert_eq!(session.editor().selection().len(), 3);

    session.on_clear_selection();
    assert!(session.editor().selection().is_empty());
    assert!(session.editor().plot().points().all(|p| !p.selected));
}

#[test]
fn test_plot_clicks_follow_mode() {
    let (mut stack, mut editor) = setup();
    editor.set_mode(PlaybackMode::Record);
    let mut session = EditSession::new(&mut stack, &mut editor);

    let y = row_y(1);
    let outcome = session.on_plot_click(450.4, y, false).unwrap();
    let ClickOutcome::Added(id) = outcome else {
        panic!("expected an added event, got {:?}", outcome);
    };
    assert_eq!(session.stack().locate(id), Some(("snare".to_string(), 450)));
    assert!(session.editor().plot().point(id).is_some());

    // Same spot again: occupied
    assert!(session.on_plot_click(450.0, y, false).is_err());
    assert_eq!(session.stack().event_count(), 5);
}

#[test]
fn test_deleting_selection_removes_plot_points() {
    let (mut stack, mut editor) = setup();
    let a = id_at(&stack, "kick", 100);
    let b = id_at(&stack, "snare", 200);

    let mut session = EditSession::new(&mut stack, &mut editor);
    session.on_select(a).unwrap();
    session.on_add_to_selection(b).unwrap();
    let deleted = session.delete_selected();

    assert_eq!(deleted.len(), 2);
    assert_eq!(session.stack().event_count(), 2);
    assert_eq!(session.editor().plot().len(), 2);
    assert!(session.editor().plot().point(a).is_none());
    assert!(session.editor().selection().is_empty());
}
