//! End-to-end draft lifecycle scenarios against the in-memory backend.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use replydesk_core::backend::{Call, CallKind, Fault};
use replydesk_core::{
    BatchCoordinator, ContextSync, DraftController, DraftId, DraftIndex, DraftStatus, Error,
    LoadOutcome, MemoryBackend, Message, MessageId, Selection, SendStrategy, StoreRemoval,
    SyncOutcome, SyncPolicy, ValidationError,
};

fn inbox() -> Vec<Message> {
    vec![
        Message::from_headers("m1", "Ana Lima <ana@example.com>", "Lunch", "", None),
        Message::from_headers("m2", "bob@example.com", "Invoice", "", None),
        Message::from_headers("m3", "\"Carol\" <carol@example.com>", "Re: Plans", "", None),
        Message::from_headers("m4", "dan@example.com", "Question", "", None),
        Message::from_headers("m5", "eve@example.com", "Hello", "", None),
        Message::from_headers("m6", "fay@example.com", "Report", "", None),
    ]
}

fn session() -> (Arc<MemoryBackend>, DraftController<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_messages(&inbox());
    let controller = DraftController::new(Arc::clone(&backend));
    controller.register_messages(&inbox());
    (backend, controller)
}

fn id(message_id: &str) -> MessageId {
    MessageId::from(message_id)
}

#[tokio::test]
async fn test_generate_twice_leaves_one_live_draft() {
    let (backend, controller) = session();

    let first = controller.generate(&id("m1")).await.unwrap();
    let second = controller.generate(&id("m1")).await.unwrap();
    let first_id = first.draft_id.unwrap();
    let second_id = second.draft_id.unwrap();

    assert_ne!(first_id, second_id);
    assert!(controller.is_retired(&first_id));
    assert!(!controller.is_retired(&second_id));
    assert_eq!(backend.remote_drafts_for(&id("m1")), 1);
    assert_eq!(backend.record_for(&id("m1")), Some(second_id));
}

#[tokio::test]
async fn test_every_message_has_at_most_one_live_draft() {
    let (backend, controller) = session();

    for round in 0..3 {
        for message in inbox().iter().take(3) {
            controller.generate(&message.id).await.unwrap();
        }
        if round == 1 {
            controller.delete_draft(&id("m2")).await.unwrap();
        }
    }

    for message in inbox().iter().take(3) {
        assert_eq!(backend.remote_drafts_for(&message.id), 1);
        let live = controller.draft(&message.id).unwrap().draft_id.unwrap();
        assert!(!controller.is_retired(&live));
    }
}

#[tokio::test]
async fn test_edit_then_send_round_trips_the_final_text() {
    let (backend, controller) = session();

    let draft = controller.generate(&id("m1")).await.unwrap();
    let d1 = draft.draft_id.unwrap();
    assert_ne!(draft.body, "<p>B2</p>");

    assert_eq!(
        controller.edit(&id("m1"), "<p>B2</p>").unwrap(),
        DraftStatus::Edited
    );
    let outcome = controller.send(&id("m1")).await.unwrap();
    assert_eq!(outcome.strategy, SendStrategy::UpdateThenSend);
    assert_eq!(outcome.body, "<p>B2</p>");
    assert_eq!(backend.sent_body(&id("m1")).as_deref(), Some("<p>B2</p>"));

    // The sent draft is never fetched again as if pending.
    backend.clear_calls();
    let reload = controller.load_existing(&id("m1"), &d1).await.unwrap();
    assert_eq!(reload, LoadOutcome::AlreadySent);
    assert!(backend.calls().is_empty());

    let state = controller.draft(&id("m1")).unwrap();
    assert_eq!(state.status, DraftStatus::Sent);
    assert_eq!(state.body, "<p>B2</p>");
}

#[tokio::test]
async fn test_edited_reply_is_addressed_to_the_sender() {
    let (backend, controller) = session();
    let draft = controller.generate(&id("m3")).await.unwrap();
    controller.edit(&id("m3"), "Works for me").unwrap();
    backend.clear_calls();

    controller.send(&id("m3")).await.unwrap();

    // The update preceded the send; the stored draft had the reply subject.
    assert!(matches!(
        backend.calls().first(),
        Some(Call::UpdateDraft(draft_id, body)) if Some(draft_id) == draft.draft_id.as_ref() && body == "Works for me"
    ));
    let reply = draft.reply_to.unwrap();
    assert_eq!(reply.to, "carol@example.com");
    assert_eq!(reply.subject, "Re: Plans");
}

#[tokio::test]
async fn test_deleting_without_a_draft_makes_no_network_call() {
    let (backend, controller) = session();

    let err = controller.delete_draft(&id("m4")).await.unwrap_err();
    assert!(matches!(err, Error::NoDraft(_)));
    assert!(err.is_recoverable());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_partial_delete_is_reported() {
    let (backend, controller) = session();
    let draft = controller.generate(&id("m1")).await.unwrap();
    backend.fail_next(CallKind::DeleteDraft, Fault::RecordDeleteFails);

    let outcome = controller.delete_draft(&id("m1")).await.unwrap();

    assert_eq!(controller.status(&id("m1")), DraftStatus::Absent);
    assert_eq!(outcome.remote, StoreRemoval::Deleted);
    assert!(matches!(outcome.record, StoreRemoval::Failed(_)));
    assert!(outcome.is_degraded());
    assert!(outcome.has_failure());
    assert!(backend.remote_draft(draft.draft_id.as_ref().unwrap()).is_none());
}

#[tokio::test]
async fn test_draft_deleted_remotely_still_clears_the_record() {
    let (backend, controller) = session();
    let draft = controller.generate(&id("m1")).await.unwrap();
    let draft_id = draft.draft_id.unwrap();
    backend.remove_remote_draft(&draft_id);

    let outcome = controller.delete_draft(&id("m1")).await.unwrap();

    assert_eq!(outcome.remote, StoreRemoval::AlreadyAbsent);
    assert_eq!(outcome.record, StoreRemoval::Deleted);
    assert!(backend.record_for(&id("m1")).is_none());
    assert_eq!(controller.status(&id("m1")), DraftStatus::Absent);
}

#[tokio::test]
async fn test_batch_keeps_successes_when_items_fail() {
    let (backend, controller) = session();
    backend.fail_generation_for(&id("m2"));
    backend.fail_generation_for(&id("m5"));

    let mut selection = Selection::new();
    for n in 1..=5 {
        selection.select(id(&format!("m{n}"))).unwrap();
    }

    let report = BatchCoordinator::new(&controller)
        .run(&mut selection)
        .await
        .unwrap();

    assert_eq!(report.items.len(), 5);
    assert_eq!(report.success_count(), 3);
    assert_eq!(report.fail_count(), 2);
    assert!(selection.is_empty());
    for message_id in ["m1", "m3", "m4"] {
        assert_eq!(controller.status(&id(message_id)), DraftStatus::Ready);
        assert_eq!(backend.remote_drafts_for(&id(message_id)), 1);
    }
    let failed: Vec<&str> = report.failures().map(|item| item.message_id.as_str()).collect();
    assert_eq!(failed, ["m2", "m5"]);
}

#[tokio::test]
async fn test_sixth_selection_is_rejected() {
    let mut selection = Selection::new();
    for message in inbox().into_iter().take(5) {
        selection.select(message.id).unwrap();
    }

    let err = selection.select(id("m6")).unwrap_err();
    assert_eq!(err, ValidationError::SelectionFull { limit: 5 });
    assert_eq!(selection.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_context_sync_times_out_without_blocking() {
    let backend = Arc::new(MemoryBackend::new().never_sync());
    let sync = ContextSync::new(Arc::clone(&backend), SyncPolicy::default());

    let outcome = tokio::time::timeout(Duration::from_secs(120), sync.start())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome, SyncOutcome::TimedOut { attempts: 30 });
    assert!(outcome.continues_in_background());
    assert_eq!(backend.trigger_count(), 1);
}

#[tokio::test]
async fn test_reload_rehydrates_from_the_records() {
    let (backend, controller) = session();
    controller.generate(&id("m1")).await.unwrap();
    let m2 = controller.generate(&id("m2")).await.unwrap();
    controller.generate(&id("m3")).await.unwrap();
    controller.send(&id("m3")).await.unwrap();
    backend.remove_remote_draft(m2.draft_id.as_ref().unwrap());

    // A fresh session over the same stores.
    let reloaded = DraftController::new(Arc::clone(&backend));
    let mut messages = inbox();
    let index = DraftIndex::fetch(backend.as_ref()).await.unwrap();
    reloaded.register_messages(&messages);
    reloaded.rehydrate(&index);
    reloaded.annotate(&mut messages);

    assert!(messages[0].has_pending_draft());
    assert!(messages[2].reply_sent);
    assert_eq!(reloaded.status(&id("m3")), DraftStatus::Sent);

    backend.clear_calls();
    assert!(matches!(
        reloaded.open(&id("m1")).await.unwrap(),
        LoadOutcome::Loaded(draft) if draft.status == DraftStatus::Ready
    ));
    assert_eq!(reloaded.open(&id("m2")).await.unwrap(), LoadOutcome::Missing);
    assert_eq!(reloaded.status(&id("m2")), DraftStatus::Absent);
    assert_eq!(
        reloaded.open(&id("m3")).await.unwrap(),
        LoadOutcome::AlreadySent
    );
    assert_eq!(reloaded.open(&id("m4")).await.unwrap(), LoadOutcome::NoDraft);

    let fetched: Vec<Call> = backend
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::GetDraft(_)))
        .collect();
    assert_eq!(fetched.len(), 2);
}

#[tokio::test]
async fn test_rejected_session_stops_further_calls() {
    let (backend, controller) = session();
    controller.generate(&id("m1")).await.unwrap();
    backend.fail_next(CallKind::Generate, Fault::Unauthorized);

    let err = controller.generate(&id("m2")).await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(!err.is_recoverable());
    assert_eq!(controller.status(&id("m2")), DraftStatus::Absent);

    let err = controller.send(&id("m1")).await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(controller.status(&id("m1")), DraftStatus::Ready);
}

#[tokio::test]
async fn test_stale_draft_id_is_never_reused() {
    let (backend, controller) = session();
    let first = controller.generate(&id("m1")).await.unwrap();
    let first_id = first.draft_id.unwrap();
    controller.generate(&id("m1")).await.unwrap();
    backend.clear_calls();

    let outcome = controller.load_existing(&id("m1"), &first_id).await.unwrap();
    assert_eq!(outcome, LoadOutcome::Superseded);
    assert!(backend.calls().is_empty());
    assert!(controller.is_retired(&DraftId::from(first_id.as_str())));
}
