mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use common::{in_memory_client, task, Task};
use firestore_proto::{MessageWithId, ProtoStoreErrorCode, PROTO_FIELD};
use firestore_proto::value::{FirestoreValue, MapValue};

#[tokio::test(flavor = "multi_thread")]
async fn write_pop_then_queue_is_empty() {
    let client = in_memory_client();
    client.set_proto_document_async("queue/t1", &task("t1")).unwrap().await.unwrap();

    let popped: Option<MessageWithId<Task>> = client.pop_proto_document_async("queue").unwrap().await.unwrap();
    let (id, message) = popped.expect("queued task").into_parts();
    assert_eq!(id, "t1");
    assert_eq!(message, task("t1"));

    let remaining: Vec<Task> = client.list_proto_documents_async("queue").unwrap().await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn pop_on_empty_collection_is_absent_not_error() {
    let client = in_memory_client();
    let popped: Option<MessageWithId<Task>> = client.pop_proto_document_async("queue").unwrap().await.unwrap();
    assert!(popped.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn listing_returns_every_written_message() {
    let client = in_memory_client();
    let ids = ["t3", "t1", "t2"];
    for id in ids {
        client.set_proto_document_in_async("queues/jobs/pending", id, &task(id)).unwrap().await.unwrap();
    }

    let listed: Vec<Task> = client.list_proto_documents_async("queues/jobs/pending").unwrap().await.unwrap();
    let listed_ids: BTreeSet<_> = listed.into_iter().map(|task| task.id).collect();
    let expected: BTreeSet<_> = ids.iter().map(|id| id.to_string()).collect();
    assert_eq!(listed_ids, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn overwrite_replaces_previous_message() {
    let client = in_memory_client();
    client.set_proto_document_async("queue/t1", &task("old")).unwrap().await.unwrap();
    let mut updated = task("t1");
    updated.attempts = 4;
    client.set_proto_document_async("queue/t1", &updated).unwrap().await.unwrap();

    let snapshot = client.get_document_async("queue/t1").unwrap().await.unwrap();
    assert_eq!(snapshot.data().map(|fields| fields.len()), Some(1));
    let loaded: Option<Task> = client.get_proto_document_async("queue/t1").unwrap().await.unwrap();
    assert_eq!(loaded, Some(updated));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_document_fails_the_listing() {
    let client = in_memory_client();
    client.set_proto_document_async("queue/a", &task("a")).unwrap().await.unwrap();
    let corrupt: MapValue = [(PROTO_FIELD, FirestoreValue::from_string("bm90IGEgcHJvdG8="))]
        .into_iter()
        .collect();
    client.set_document_async("queue/b", corrupt).unwrap().await.unwrap();

    let err = client.list_proto_documents_async::<Task>("queue").unwrap().await.unwrap_err();
    assert_eq!(err.code, ProtoStoreErrorCode::Decode);
    assert!(err.message().contains("'b'"));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_of_missing_document_succeeds() {
    let client = in_memory_client();
    client.delete_document_async("queue/never").unwrap().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn each_pop_removes_exactly_one_document() {
    let client = in_memory_client();
    for id in ["a", "b", "c"] {
        client.set_proto_document_in_async("queue", id, &task(id)).unwrap().await.unwrap();
    }

    let mut popped = Vec::new();
    while let Some(entry) = client.pop_proto_document_async::<Task>("queue").unwrap().await.unwrap() {
        let remaining = client.get_documents_async("queue").unwrap().await.unwrap();
        assert_eq!(remaining.len(), 2 - popped.len());
        popped.push(entry.id().to_string());
    }
    assert_eq!(popped, vec!["a", "b", "c"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_operations_share_one_session() {
    let client = Arc::new(in_memory_client());
    let writers = (0..8).map(|index| {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .add_proto_document_async("queue", &task(&format!("t{index}")))
                .unwrap()
                .await
                .unwrap()
        })
    });
    let mut ids = BTreeSet::new();
    for writer in writers {
        ids.insert(writer.await.unwrap());
    }
    assert_eq!(ids.len(), 8);

    let listed: Vec<Task> = client.list_proto_documents_async("queue").unwrap().await.unwrap();
    assert_eq!(listed.len(), 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_pops_drain_without_touching_siblings() {
    let client = Arc::new(in_memory_client());
    let ids: BTreeSet<String> = (0..6).map(|index| format!("t{index}")).collect();
    for id in &ids {
        client.set_proto_document_in_async("queue", id, &task(id)).unwrap().await.unwrap();
    }

    let poppers = (0..4).map(|_| {
        let client = client.clone();
        tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(entry) = client.pop_proto_document_async::<Task>("queue").unwrap().await.unwrap() {
                seen.push(entry.id().to_string());
            }
            seen
        })
    });
    let mut popped = BTreeSet::new();
    for popper in poppers {
        popped.extend(popper.await.unwrap());
    }

    // Racing pops may hand out the same document twice, but never lose one.
    assert_eq!(popped, ids);
    assert!(client.get_documents_async("queue").unwrap().await.unwrap().is_empty());
}

#[test]
fn blocking_forms_match_async_forms() {
    let client = in_memory_client();
    client.set_proto_document("queue/t1", &task("t1")).unwrap();
    let peeked: Option<MessageWithId<Task>> = client.get_document_from_collection("queue", false).unwrap();
    assert_eq!(peeked.map(|entry| entry.message().clone()), Some(task("t1")));

    let listed: Vec<Task> = client.list_proto_documents("queue").unwrap();
    assert_eq!(listed, vec![task("t1")]);

    let popped: Option<MessageWithId<Task>> = client.get_document_from_collection("queue", true).unwrap();
    assert!(popped.is_some());
    assert!(client.get_proto_document::<Task>("queue/t1").unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn blocking_forms_run_on_spawn_blocking_threads() {
    let client = in_memory_client();
    let worker = client.clone();
    let popped = tokio::task::spawn_blocking(move || {
        worker.set_proto_document("queue/t1", &task("t1"))?;
        worker.pop_proto_document::<Task>("queue")
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(popped.map(MessageWithId::into_parts), Some(("t1".to_string(), task("t1"))));
    assert!(client.get_documents_async("queue").unwrap().await.unwrap().is_empty());
}
