//! End-to-end scenarios over real `CacheServer` + `InternalCacheClient`
//! pairs on loopback TCP, exercising the fabric's testable properties (a
//! single hit/miss/push-registration path, stable sharding, concurrent
//! registration, cache-aside read-through, invalidation, and the startup
//! readiness window).

use cachefabric::cache::CacheServer;
use cachefabric::client::{CacheClient, CacheItem, InternalCacheClient, RegistrationListener};
use cachefabric::scope::Scope;
use cachefabric::services::post::{Post, PostService};
use cachefabric::error::FabricError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .expect("local_addr")
        .port()
}

/// Spawns a bare `CacheServer` with no peers to push-register with, and
/// returns its bind address once it has had a moment to start listening.
async fn spawn_bare_shard() -> String {
    let port = free_port();
    let addr = format!("127.0.0.1:{port}");
    let server = CacheServer::new(addr.clone());
    let bind_addr = addr.clone();
    tokio::spawn(async move {
        let _ = server.run(&bind_addr, &[]).await;
    });
    wait_for_listener(&addr).await;
    addr
}

async fn wait_for_listener(addr: &str) {
    for _ in 0..100 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("shard at {addr} never came up");
}

/// S1: a single shard pushes its registration to a waiting application
/// service, then a basic Get/Set/Delete round-trip behaves as documented.
#[tokio::test]
async fn s1_basic_hit_miss_and_push_registration() {
    let client = InternalCacheClient::new();
    let listener = RegistrationListener::new(client.clone());
    tokio::spawn(async move {
        let _ = listener.run("127.0.0.1:9999").await;
    });
    wait_for_listener("127.0.0.1:9999").await;

    let port = free_port();
    let advertise_addr = format!("127.0.0.1:{port}");
    let server = CacheServer::new(advertise_addr.clone());
    let bind_addr = advertise_addr.clone();
    tokio::spawn(async move {
        let _ = server.run(&bind_addr, &["127.0.0.1".to_string()]).await;
    });

    for _ in 0..200 {
        if client.shard_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(client.shard_count(), 1, "shard never pushed its registration");

    let scope = Scope::unbounded();
    assert!(matches!(
        client.get(&scope, "missing_key").await.unwrap(),
        cachefabric::client::CacheLookup::Miss
    ));

    client
        .set(&scope, CacheItem::new("greeting", "hello"))
        .await
        .unwrap();
    let hit = client.get(&scope, "greeting").await.unwrap().into_hit().unwrap();
    assert_eq!(&hit[..], b"hello");

    client.delete(&scope, "greeting").await.unwrap();
    assert!(matches!(
        client.get(&scope, "greeting").await.unwrap(),
        cachefabric::client::CacheLookup::Miss
    ));
}

/// S2: keys distribute stably across several registered shards, and the
/// same key always routes to the same shard.
#[tokio::test]
async fn s2_keys_shard_stably_across_several_servers() {
    let client = InternalCacheClient::new();
    for _ in 0..4 {
        let addr = spawn_bare_shard().await;
        client.register(addr).await.unwrap();
    }
    assert_eq!(client.shard_count(), 4);

    let scope = Scope::unbounded();
    for i in 0..40 {
        let key = format!("key_{i}");
        client
            .set(&scope, CacheItem::new(key.clone(), format!("value_{i}")))
            .await
            .unwrap();
    }
    for i in 0..40 {
        let key = format!("key_{i}");
        let hit = client.get(&scope, &key).await.unwrap().into_hit().unwrap();
        assert_eq!(hit, format!("value_{i}").as_bytes());
    }
}

/// S3: many concurrent registrations of distinct shards all land, with no
/// entry lost or duplicated, regardless of arrival order.
#[tokio::test]
async fn s3_concurrent_registration_preserves_every_shard() {
    let client = InternalCacheClient::new();
    let mut addrs = Vec::new();
    for _ in 0..8 {
        addrs.push(spawn_bare_shard().await);
    }

    let mut handles = Vec::new();
    for addr in addrs.iter().cloned() {
        let client = client.clone();
        handles.push(tokio::spawn(async move { client.register(addr).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(client.shard_count(), 8);

    // Re-registering every address again must stay idempotent.
    for addr in addrs {
        client.register(addr).await.unwrap();
    }
    assert_eq!(client.shard_count(), 8);
}

/// S4: cache-aside read-through hits the store exactly once across two
/// reads of the same post; the second read is served from cache.
#[tokio::test]
async fn s4_post_read_through_hits_the_store_exactly_once() {
    let client = InternalCacheClient::new();
    let addr = spawn_bare_shard().await;
    client.register(addr).await.unwrap();

    let scope = Scope::unbounded();
    let posts = PostService::new();
    posts.store_post(Post {
        post_id: 1,
        creator_id: 9,
        text: "hello world".to_string(),
        timestamp: 1000,
    });

    let store_reads = Arc::new(AtomicUsize::new(0));
    // read_post itself would read the store directly; to count store reads
    // distinctly from cache hits we drive the same read_through recipe
    // PostService uses, instrumented, rather than reaching into its private
    // store.
    let counting_fetch = {
        let store_reads = store_reads.clone();
        move || {
            let store_reads = store_reads.clone();
            async move {
                store_reads.fetch_add(1, Ordering::SeqCst);
                Ok::<Option<Post>, FabricError>(Some(Post {
                    post_id: 1,
                    creator_id: 9,
                    text: "hello world".to_string(),
                    timestamp: 1000,
                }))
            }
        }
    };

    let first: Option<Post> = cachefabric::aside::read_through(client.as_ref(), &scope, "post_1", counting_fetch.clone()).await.unwrap();
    let second: Option<Post> = cachefabric::aside::read_through(client.as_ref(), &scope, "post_1", counting_fetch).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store_reads.load(Ordering::SeqCst), 1, "second read should be served from cache");
}

/// S5: a timeline write invalidates the cached window, so a subsequent read
/// observes a real cache miss (not a stale hit) before it is rebuilt from
/// the store.
#[tokio::test]
async fn s5_timeline_write_invalidates_the_cached_window() {
    use cachefabric::services::timeline::TimelineService;

    let client = InternalCacheClient::new();
    let addr = spawn_bare_shard().await;
    client.register(addr).await.unwrap();

    let scope = Scope::unbounded();
    let timelines = TimelineService::new();

    timelines.write_timeline(client.as_ref(), &scope, 7, 1, 100).await.unwrap();
    let _ = timelines.read_timeline(client.as_ref(), &scope, 7, 0, 10).await.unwrap();

    // read_timeline backfilled "timeline_7"; writing again must invalidate it.
    timelines.write_timeline(client.as_ref(), &scope, 7, 2, 200).await.unwrap();
    assert!(matches!(
        client.get(&scope, "timeline_7").await.unwrap(),
        cachefabric::client::CacheLookup::Miss
    ));

    let rebuilt = timelines.read_timeline(client.as_ref(), &scope, 7, 0, 10).await.unwrap();
    assert_eq!(rebuilt, vec![2, 1]);
}

/// S6: calls made before any shard has registered fail with
/// `NoCachesRegistered` rather than hanging or panicking, and succeed once a
/// shard registers mid-retry.
#[tokio::test]
async fn s6_readiness_retry_succeeds_once_a_shard_registers() {
    let client = InternalCacheClient::new();
    let scope = Scope::unbounded();

    let retry_client = client.clone();
    let retry_scope = scope;
    let retry_handle = tokio::spawn(async move {
        cachefabric::aside::with_readiness_retry(
            || retry_client.get(&retry_scope, "x"),
            20,
            Duration::from_millis(20),
        )
        .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let addr = spawn_bare_shard().await;
    client.register(addr).await.unwrap();

    let result = retry_handle.await.unwrap();
    assert!(result.is_ok(), "retry should succeed once a shard is registered");
}
