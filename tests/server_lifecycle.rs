//! End-to-end test against a real listener.

use std::net::SocketAddr;
use std::time::Duration;
use tracker_server::http::HttpServer;
use tracker_server::lifecycle::Shutdown;

mod common;
use common::*;

#[tokio::test]
async fn test_serve_login_and_flush_on_shutdown() {
    let store = InstrumentedStore::new();
    let mut config = test_config();
    // every touch is persisted
    config.session.debounce_secs = 1;

    let state = test_state(store.clone(), config);
    let server = HttpServer::new(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();
    let base = format!("http://{addr}");

    let res = client
        .post(format!("{base}/api/login"))
        .header("Referer", format!("{base}/login?ref=%2Fsprintboard"))
        .form(&[("pass", PASSWORD)])
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 303);
    assert_eq!(res.headers()["location"], "/sprintboard");
    let cookie = res.headers()["set-cookie"]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let token = cookie.trim_start_matches("session=").to_string();

    // let the debounce window pass so the next call queues an update
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let res = client
        .get(format!("{base}/api/get_tasks"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), "[]");

    let res = client
        .get(format!("{base}/api/get_tasks"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    assert_eq!(state.sessions.pending_updates().len(), 1);

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());

    assert!(state.sessions.pending_updates().is_empty());
    let batches = store.batches.lock().clone();
    assert_eq!(batches.len(), 1);
    assert!(batches[0].contains_key(&token));

    let stored = store.inner.stored_session(&token).unwrap();
    assert!(stored.last_accessed_at > stored.created_at);
}
