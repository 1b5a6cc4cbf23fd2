//! Signal channel tests

use std::sync::Arc;

use swdeployer::clients::memory::{MemoryObjectStore, MemoryQueue, MemorySignedUrls};
use swdeployer::clients::object_store::TEMP_URL_KEY_HEADER;
use swdeployer::deploy::data::ResourceData;
use swdeployer::signal::cfn::SIGNED_URL_KEY;
use swdeployer::signal::queue::QUEUE_ID_KEY;
use swdeployer::signal::temp_url::{OBJECT_NAME_KEY, TEMP_URL_KEY};
use swdeployer::signal::{
    CfnSignal, NoSignal, QueueSignal, SignalChannel, TempUrlOptions, TempUrlSignal,
};

use crate::common::STORAGE_URL;

const PHYSICAL_NAME: &str = "software_deployment_test_stack-deployment_mysql-e2qhmdqq7adz";

fn store() -> Arc<MemoryObjectStore> {
    let store = Arc::new(MemoryObjectStore::new(STORAGE_URL));
    store.set_account_header(TEMP_URL_KEY_HEADER, "1234");
    store
}

#[test]
fn test_no_signal_has_no_identifier() {
    let data = ResourceData::new();
    let channel = NoSignal;

    assert!(!channel.waits_for_signal());
    tokio_test::block_on(async {
        assert!(channel.provision(PHYSICAL_NAME, &data).await.unwrap().is_none());
        assert!(channel.identifier(&data).await.is_none());
        channel.release(PHYSICAL_NAME, &data).await.unwrap();
    });
}

#[tokio::test]
async fn test_temp_url_release_without_object_is_noop() {
    let store = store();
    let channel = TempUrlSignal::new(store.clone(), TempUrlOptions::default());
    let data = ResourceData::new();

    channel.release(PHYSICAL_NAME, &data).await.unwrap();
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_temp_url_release_removes_empty_container() {
    let store = store();
    let channel = TempUrlSignal::new(store.clone(), TempUrlOptions::default());
    let data = ResourceData::new();

    let url = channel.provision(PHYSICAL_NAME, &data).await.unwrap().unwrap();
    assert_eq!(channel.identifier(&data).await, Some(url));
    let object = data.get(OBJECT_NAME_KEY).await.unwrap();

    channel.release(PHYSICAL_NAME, &data).await.unwrap();

    assert!(!store.has_object(PHYSICAL_NAME, &object));
    assert!(!store.has_container(PHYSICAL_NAME));
    assert!(!data.contains(OBJECT_NAME_KEY).await);
    assert!(!data.contains(TEMP_URL_KEY).await);
    let calls = store.calls();
    assert_eq!(
        &calls[calls.len() - 3..],
        [
            format!("delete_object:{}/{}", PHYSICAL_NAME, object),
            format!("head_container:{}", PHYSICAL_NAME),
            format!("delete_container:{}", PHYSICAL_NAME),
        ]
    );
}

#[tokio::test]
async fn test_temp_url_release_keeps_shared_container() {
    use swdeployer::clients::ObjectStore;

    let store = store();
    let channel = TempUrlSignal::new(store.clone(), TempUrlOptions::default());
    let data = ResourceData::new();

    channel.provision(PHYSICAL_NAME, &data).await.unwrap();
    store.put_object(PHYSICAL_NAME, "other", b"").await.unwrap();

    channel.release(PHYSICAL_NAME, &data).await.unwrap();
    assert!(store.has_container(PHYSICAL_NAME));
    assert_eq!(store.count("delete_container"), 0);
}

#[tokio::test]
async fn test_temp_url_release_tolerates_missing_object() {
    let store = store();
    let channel = TempUrlSignal::new(store.clone(), TempUrlOptions::default());
    let data = ResourceData::new();
    data.set(OBJECT_NAME_KEY, "gone", false).await;
    data.set(TEMP_URL_KEY, "http://192.0.2.1/v1/AUTH_test_tenant_id/c/gone", true)
        .await;

    channel.release(PHYSICAL_NAME, &data).await.unwrap();
    assert!(!data.contains(OBJECT_NAME_KEY).await);
    assert!(!data.contains(TEMP_URL_KEY).await);
}

#[tokio::test]
async fn test_temp_url_release_error_still_clears_data() {
    let store = store();
    let channel = TempUrlSignal::new(store.clone(), TempUrlOptions::default());
    let data = ResourceData::new();
    channel.provision(PHYSICAL_NAME, &data).await.unwrap();

    store.set_broken(true);
    let err = channel.release(PHYSICAL_NAME, &data).await.unwrap_err();
    assert!(!err.is_not_found());
    assert!(!data.contains(OBJECT_NAME_KEY).await);
    assert!(!data.contains(TEMP_URL_KEY).await);
}

#[tokio::test]
async fn test_queue_provision_and_release() {
    let queue = Arc::new(MemoryQueue::new());
    let channel = QueueSignal::new(queue.clone());
    let data = ResourceData::new();

    let queue_id = channel.provision(PHYSICAL_NAME, &data).await.unwrap().unwrap();
    assert_eq!(queue_id, PHYSICAL_NAME);
    assert_eq!(
        queue.calls(),
        [
            format!("create_queue:{}", PHYSICAL_NAME),
            format!("register_signaling:{}", PHYSICAL_NAME),
            format!("grant_signed_access:{}", PHYSICAL_NAME),
        ]
    );

    // Cached on the second call
    channel.provision(PHYSICAL_NAME, &data).await.unwrap();
    assert_eq!(queue.calls().len(), 3);

    let inputs = channel.signal_inputs(&queue_id);
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].name, "deploy_queue_id");

    channel.release(PHYSICAL_NAME, &data).await.unwrap();
    assert!(queue.queue(PHYSICAL_NAME).is_none());
    assert!(!data.contains(QUEUE_ID_KEY).await);

    // Already gone
    data.set(QUEUE_ID_KEY, PHYSICAL_NAME, false).await;
    channel.release(PHYSICAL_NAME, &data).await.unwrap();
    assert!(!data.contains(QUEUE_ID_KEY).await);
}

#[tokio::test]
async fn test_cfn_signal_issue_and_revoke() {
    let issuer = Arc::new(MemorySignedUrls::new("http://192.0.2.1:8000/v1"));
    let channel = CfnSignal::new(issuer.clone());
    let data = ResourceData::new();

    channel.release(PHYSICAL_NAME, &data).await.unwrap();

    let url = channel.provision(PHYSICAL_NAME, &data).await.unwrap().unwrap();
    assert!(url.starts_with(&format!("http://192.0.2.1:8000/v1/signal/{}", PHYSICAL_NAME)));
    assert!(data.is_redacted(SIGNED_URL_KEY).await);
    assert_eq!(channel.provision(PHYSICAL_NAME, &data).await.unwrap(), Some(url));

    channel.release(PHYSICAL_NAME, &data).await.unwrap();
    assert!(issuer.issued().is_empty());
    assert!(!data.contains(SIGNED_URL_KEY).await);
}
