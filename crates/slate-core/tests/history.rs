use std::sync::{Arc, Mutex};

use manos_slate_core::{
    ChangeRecord, Document, Editor, EditorError, Node, Op, PathError, Point, PluginRegistry, Range,
    Transaction,
};

type Log = Arc<Mutex<Vec<ChangeRecord>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("manos_slate_core=trace")
        .with_test_writer()
        .try_init();
}

fn recorded(children: Vec<Node>, selection: Option<Range>) -> (Editor, Log) {
    init_tracing();
    let log = Log::default();
    let editor = Editor::new(Document::new(children), selection, PluginRegistry::richtext())
        .with_history(Arc::clone(&log));
    (editor, log)
}

fn undo_all(editor: &mut Editor, log: &Log) {
    let records: Vec<ChangeRecord> = log.lock().unwrap().drain(..).collect();
    for record in records.into_iter().rev() {
        let mut tx = Transaction::new(record.inverse_ops);
        if let Some(selection) = record.selection_before {
            tx = tx.selection_after(selection);
        }
        editor.apply(tx).unwrap();
    }
}

#[test]
fn inverse_ops_restore_typed_text() {
    let (mut editor, log) = recorded(
        vec![Node::paragraph("")],
        Some(Range::collapsed(Point::new(vec![0, 0], 0))),
    );

    editor.insert_text("hello").unwrap();

    {
        let records = log.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].ops,
            vec![Op::InsertText {
                path: vec![0, 0],
                offset: 0,
                text: "hello".to_string(),
            }]
        );
        assert_eq!(
            records[0].inverse_ops,
            vec![Op::RemoveText {
                path: vec![0, 0],
                range: 0..5,
            }]
        );
        assert_eq!(
            records[0].selection_after,
            Some(Range::collapsed(Point::new(vec![0, 0], 5)))
        );
    }

    undo_all(&mut editor, &log);
    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
    assert_eq!(
        editor.selection(),
        Some(&Range::collapsed(Point::new(vec![0, 0], 0)))
    );
}

#[test]
fn structural_changes_undo_cleanly() {
    let original = vec![Node::paragraph("a"), Node::paragraph("bc")];
    let (mut editor, log) = recorded(
        original.clone(),
        Some(Range::new(Point::new(vec![0, 0], 0), Point::new(vec![1, 0], 1))),
    );

    editor.toggle_block("bulleted-list").unwrap();
    editor.toggle_mark("bold").unwrap();
    editor.collapse(manos_slate_core::Edge::End).unwrap();
    editor.insert_break().unwrap();
    assert_ne!(editor.doc().children, original);

    undo_all(&mut editor, &log);

    assert_eq!(editor.doc().children, original);
}

#[test]
fn failed_transactions_leave_no_trace() {
    let (mut editor, log) = recorded(
        vec![Node::paragraph("keep")],
        Some(Range::collapsed(Point::new(vec![0, 0], 4))),
    );

    let err = editor
        .apply(Transaction::new(vec![
            Op::InsertText {
                path: vec![0, 0],
                offset: 4,
                text: "!".to_string(),
            },
            Op::RemoveNode { path: vec![9] },
        ]))
        .unwrap_err();

    assert_eq!(
        err,
        EditorError::Apply(PathError::Missing(vec![9]).into())
    );
    assert_eq!(editor.doc().children, vec![Node::paragraph("keep")]);
    assert_eq!(
        editor.selection(),
        Some(&Range::collapsed(Point::new(vec![0, 0], 4)))
    );
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn batched_transforms_commit_once_with_their_source() {
    let (mut editor, log) = recorded(
        vec![Node::paragraph("")],
        Some(Range::collapsed(Point::new(vec![0, 0], 0))),
    );

    editor
        .without_normalizing(|editor| {
            editor.insert_text("a")?;
            editor.insert_break()?;
            editor.insert_text("b")
        })
        .unwrap();
    editor
        .apply(
            Transaction::new(vec![Op::InsertText {
                path: vec![1, 0],
                offset: 1,
                text: "c".to_string(),
            }])
            .source("remote"),
        )
        .unwrap();

    let records = log.lock().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].source, None);
    assert_eq!(records[1].source.as_deref(), Some("remote"));
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("a"), Node::paragraph("bc")]
    );
}

#[test]
fn no_op_transforms_record_nothing() {
    let (mut editor, log) = recorded(vec![Node::paragraph("x")], None);

    editor.insert_text("ignored").unwrap();
    editor.delete_backward(manos_slate_core::Unit::Character).unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("x")]);
    assert!(log.lock().unwrap().is_empty());
}
