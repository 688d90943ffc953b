//! Session actor: open, intents, file events, watching and shutdown.

use std::fs;
use std::path::Path;
use std::time::Duration;

use omni_linkmap::{
    GraphEvent, GraphSession, GraphSnapshot, HostRequest, LinkMapError, LinkMapSettings,
    SessionOutput, UiIntent, ViewColumn, node_id_for,
};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn notebook() -> Result<TempDir, Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    write_file(&tmp.path().join("A.md"), "# Alpha\n[[B]]\n")?;
    write_file(&tmp.path().join("B.md"), "# Beta\n")?;
    Ok(tmp)
}

/// Wait (bounded) for a refresh whose snapshot satisfies `done`.
async fn wait_for_refresh(
    outputs: &mut UnboundedReceiver<SessionOutput>,
    done: impl Fn(&GraphSnapshot) -> bool,
) -> bool {
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(output) = outputs.recv().await {
            if output.as_snapshot().is_some_and(&done) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

async fn watching_session(
    root: &Path,
) -> Result<(GraphSession, UnboundedReceiver<SessionOutput>), Box<dyn std::error::Error>> {
    let (session, outputs) =
        GraphSession::open(&LinkMapSettings::default(), Some(root), None, true).await?;
    assert!(session.is_watching());
    // Give the OS watch a moment to settle before producing events.
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok((session, outputs))
}

#[tokio::test]
async fn test_open_without_root_fails() {
    let result = GraphSession::open(&LinkMapSettings::default(), None, None, false).await;
    match result {
        Err(error @ LinkMapError::NoRootDirectory) => assert_eq!(
            error.to_string(),
            "this command can only be activated in an open directory"
        ),
        other => panic!("expected NoRootDirectory, got {other:?}"),
    }
}

#[tokio::test]
async fn test_open_sets_current_node_only_for_known_documents() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let root = tmp.path().canonicalize()?;
    let settings = LinkMapSettings::default();

    let (session, _outputs) =
        GraphSession::open(&settings, Some(tmp.path()), Some(&tmp.path().join("A.md")), false).await?;
    let snapshot = session.snapshot().await?;
    assert_eq!(snapshot.current_node, Some(node_id_for(&root.join("A.md"))));
    assert_eq!(snapshot.node_count(), 2);
    session.close().await?;

    let (session, _outputs) =
        GraphSession::open(&settings, Some(tmp.path()), Some(&tmp.path().join("ghost.md")), false).await?;
    assert_eq!(session.snapshot().await?.current_node, None);
    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_ready_and_click_intents() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let settings = LinkMapSettings {
        open_column: ViewColumn::Beside,
        ..LinkMapSettings::default()
    };
    let (session, mut outputs) = GraphSession::open(&settings, Some(tmp.path()), None, false).await?;

    session.send(UiIntent::Ready).await?;
    session.send(UiIntent::click("/notes/A.md")).await?;
    session.close().await?;

    let first = outputs.recv().await.ok_or("missing refresh")?;
    assert_eq!(first.as_snapshot().map(|s| s.node_count()), Some(2));
    let second = outputs.recv().await.ok_or("missing open request")?;
    assert_eq!(
        second,
        SessionOutput::Host(HostRequest::OpenDocument {
            path: "/notes/A.md".to_string(),
            column: -2,
        })
    );
    assert!(outputs.recv().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_file_events_are_applied_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let root = tmp.path().canonicalize()?;
    let (session, mut outputs) =
        GraphSession::open(&LinkMapSettings::default(), Some(&root), None, false).await?;

    write_file(&root.join("C.md"), "# Gamma\n[[A]]\n")?;
    session.send(GraphEvent::Changed(root.join("C.md"))).await?;
    session.send(GraphEvent::Deleted(root.join("B.md"))).await?;
    session.send(GraphEvent::Deleted(root.join("B.md"))).await?;

    let snapshot = session.snapshot().await?;
    let ids: Vec<&String> = snapshot.adjacency_list.keys().collect();
    assert_eq!(ids.len(), 2);
    assert_eq!(
        snapshot.adjacency_list[&node_id_for(&root.join("A.md"))].links,
        vec![node_id_for(&root.join("C.md"))]
    );

    session.close().await?;
    let mut refreshes = 0;
    while let Some(output) = outputs.recv().await {
        assert!(output.as_snapshot().is_some());
        refreshes += 1;
    }
    // The second delete targets an unknown id and emits nothing.
    assert_eq!(refreshes, 2);
    Ok(())
}

#[tokio::test]
async fn test_watching_session_picks_up_new_notes() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let root = tmp.path().canonicalize()?;
    let (session, mut outputs) = watching_session(&root).await?;

    write_file(&root.join("D.md"), "# Delta\n[[A]]\n")?;
    let target = node_id_for(&root.join("D.md"));
    let found = wait_for_refresh(&mut outputs, |s| s.adjacency_list.contains_key(&target)).await;
    assert!(found, "watcher never reported the new note");

    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_watching_session_tracks_repeated_edits() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let root = tmp.path().canonicalize()?;
    let (session, mut outputs) = watching_session(&root).await?;
    let a = node_id_for(&root.join("A.md"));
    let b = node_id_for(&root.join("B.md"));

    write_file(&root.join("A.md"), "# Alpha Prime\n")?;
    let edited = wait_for_refresh(&mut outputs, |s| {
        s.adjacency_list
            .get(&a)
            .is_some_and(|n| n.label == "Alpha Prime" && n.links.is_empty())
    })
    .await;
    assert!(edited, "first edit never reached the graph");

    write_file(&root.join("A.md"), "# Alpha Again\n[[B]]\n")?;
    let edited_again = wait_for_refresh(&mut outputs, |s| {
        s.adjacency_list
            .get(&a)
            .is_some_and(|n| n.label == "Alpha Again" && n.links == vec![b.clone()])
    })
    .await;
    assert!(edited_again, "second edit never reached the graph");

    // Let any trailing events land, then the graph must match the file.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let snapshot = session.snapshot().await?;
    assert_eq!(snapshot.adjacency_list[&a].label, "Alpha Again");
    assert_eq!(snapshot.adjacency_list[&a].links, vec![b.clone()]);

    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_watching_session_drops_deleted_notes() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let root = tmp.path().canonicalize()?;
    let (session, mut outputs) = watching_session(&root).await?;
    let a = node_id_for(&root.join("A.md"));
    let b = node_id_for(&root.join("B.md"));

    fs::remove_file(root.join("B.md"))?;
    let removed = wait_for_refresh(&mut outputs, |s| {
        !s.adjacency_list.contains_key(&b)
            && s.adjacency_list.get(&a).is_some_and(|n| n.links.is_empty())
    })
    .await;
    assert!(removed, "deleted note stayed in the graph");

    session.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_watching_session_follows_renames() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = notebook()?;
    let root = tmp.path().canonicalize()?;
    let (session, mut outputs) = watching_session(&root).await?;
    let a = node_id_for(&root.join("A.md"));
    let b = node_id_for(&root.join("B.md"));
    let renamed = node_id_for(&root.join("Bravo.md"));

    fs::rename(root.join("B.md"), root.join("Bravo.md"))?;
    let moved = wait_for_refresh(&mut outputs, |s| {
        !s.adjacency_list.contains_key(&b)
            && s.adjacency_list
                .get(&renamed)
                .is_some_and(|n| n.label == "Beta")
    })
    .await;
    assert!(moved, "renamed note never reached the graph");

    let snapshot = session.snapshot().await?;
    assert!(snapshot.adjacency_list[&a].links.contains(&renamed));

    session.close().await?;
    Ok(())
}
