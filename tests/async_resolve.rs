#![allow(dead_code)]

use depi::{async_factory, factory, injectable, shared_async_factory, Registry, ResolveErrorKind};
use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

struct Settings {
    name: &'static str,
}

struct Client {
    settings: Arc<Settings>,
}

struct Session {
    client: Arc<Client>,
}

injectable!(Session { client: Client });

#[tokio::test(flavor = "multi_thread")]
async fn test_build_async_awaits_factories() {
    let built = Arc::new(AtomicU8::new(0));
    let provider = Registry::new()
        .register_singleton_with(async_factory(|_| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(Settings { name: "async" })
        }))
        .unwrap()
        .register_singleton_with(
            async_factory({
                let built = built.clone();
                move |resolver| {
                    let built = built.clone();
                    async move {
                        built.fetch_add(1, Ordering::SeqCst);
                        Ok(Client {
                            settings: resolver.resolve_async::<Settings>().await?,
                        })
                    }
                }
            })
            .depends_on::<Settings>(),
        )
        .unwrap()
        .register_scoped::<Session>()
        .unwrap()
        .build_async()
        .await
        .unwrap();

    assert_eq!(built.load(Ordering::SeqCst), 1);

    let scope = provider.create_scope();
    let session = scope.resolve_async::<Session>().await.unwrap();
    assert!(Arc::ptr_eq(&session, &scope.resolve_async::<Session>().await.unwrap()));
    assert!(Arc::ptr_eq(&session.client, &provider.resolve_async::<Client>().await.unwrap()));
    assert_eq!(session.client.settings.name, "async");
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_scoped_activation_commits_once() {
    const TASKS: usize = 16;

    let built = Arc::new(AtomicU8::new(0));
    let provider = Registry::new()
        .register_scoped_with(async_factory({
            let built = built.clone();
            move |_| {
                let built = built.clone();
                async move {
                    built.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(Settings { name: "scoped" })
                }
            }
        }))
        .unwrap()
        .build_async()
        .await
        .unwrap();

    let scope = provider.create_scope();
    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let scope = scope.clone();
            tokio::spawn(async move { scope.resolve_async::<Settings>().await.unwrap() })
        })
        .collect();

    let mut instances = Vec::with_capacity(TASKS);
    for handle in handles {
        instances.push(handle.await.unwrap());
    }

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_and_async_resolves_share_activation() {
    let built = Arc::new(AtomicU8::new(0));
    let provider = Registry::new()
        .register_scoped_with(async_factory({
            let built = built.clone();
            move |_| {
                let built = built.clone();
                async move {
                    built.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(50));
                    Ok(Settings { name: "mixed" })
                }
            }
        }))
        .unwrap()
        .build_async()
        .await
        .unwrap();

    let scope = provider.create_scope();
    let blocking = std::thread::spawn({
        let scope = scope.clone();
        move || scope.resolve::<Settings>().unwrap()
    });
    let task = tokio::spawn({
        let scope = scope.clone();
        async move { scope.resolve_async::<Settings>().await.unwrap() }
    });

    let from_task = task.await.unwrap();
    let from_thread = tokio::task::spawn_blocking(move || blocking.join().unwrap()).await.unwrap();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&from_thread, &from_task));
    assert_eq!(scope.cached_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_finalizers_awaited_on_dispose() {
    let closed = Arc::new(Mutex::new(Vec::new()));
    let provider = Registry::new()
        .register_scoped_with(factory(|_| Ok(Settings { name: "first" })).async_finalizer({
            let closed = closed.clone();
            move |settings: Arc<Settings>| {
                let closed = closed.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    closed.lock().unwrap().push(settings.name);
                    Ok(())
                }
            }
        }))
        .unwrap()
        .register_scoped_with(
            shared_async_factory(|resolver| async move {
                Ok(Arc::new(Client {
                    settings: resolver.resolve_async::<Settings>().await?,
                }))
            })
            .finalizer({
                let closed = closed.clone();
                move |_| {
                    closed.lock().unwrap().push("client");
                    Ok(())
                }
            }),
        )
        .unwrap()
        .build_async()
        .await
        .unwrap();

    let scope = provider.create_scope();
    scope.resolve_async::<Client>().await.unwrap();
    assert_eq!(scope.cached_count(), 2);

    scope.dispose_async().await;
    scope.dispose_async().await;

    assert_eq!(scope.cached_count(), 0);
    assert_eq!(*closed.lock().unwrap(), ["client", "first"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancelled_activation_leaves_nothing_behind() {
    let calls = Arc::new(AtomicU8::new(0));
    let provider = Registry::new()
        .register_scoped_with(async_factory({
            let calls = calls.clone();
            move |_| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                    }
                    Ok(Settings { name: "retried" })
                }
            }
        }))
        .unwrap()
        .build_async()
        .await
        .unwrap();

    let scope = provider.create_scope();
    let cancelled = tokio::time::timeout(Duration::from_millis(20), scope.resolve_async::<Settings>()).await;
    assert!(cancelled.is_err());
    assert_eq!(scope.cached_count(), 0);

    let settings = tokio::time::timeout(Duration::from_secs(1), scope.resolve_async::<Settings>())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(settings.name, "retried");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scope_required_async() {
    let provider = Registry::new()
        .register_scoped_with(factory(|_| Ok(Settings { name: "scoped" })))
        .unwrap()
        .build_async()
        .await
        .unwrap();

    assert!(matches!(
        provider.resolve_async::<Settings>().await,
        Err(ResolveErrorKind::ScopeRequired { .. })
    ));
}

#[test]
fn test_async_factory_on_sync_path() {
    let provider = Registry::new()
        .register_singleton_with(async_factory(|_| async { Ok(Settings { name: "blocking" }) }))
        .unwrap()
        .register_transient_with(factory(|resolver| {
            Ok(Client {
                settings: resolver.resolve::<Settings>()?,
            })
        }))
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(provider.resolve::<Client>().unwrap().settings.name, "blocking");
}
