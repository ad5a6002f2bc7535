//! End-to-end tests against a real listener on an ephemeral port.

use std::fs;

use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;
use common::{Fixture, TestServer, INVALID_CONFIG, VALID_CONFIG};

async fn body(res: reqwest::Response) -> Value {
    res.json().await.unwrap()
}

#[tokio::test]
async fn test_put_invalid_config_rolls_back() {
    let fixture = Fixture::new();
    let server = TestServer::start(&fixture).await;

    let res = server
        .client
        .put(server.url("/api/config"))
        .json(&json!({ "content": INVALID_CONFIG }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err = body(res).await;
    assert!(err["output"].as_str().unwrap().contains("test failed"));
    let backup = err["backup"].as_str().unwrap().to_string();

    let list = body(server.client.get(server.url("/api/backups")).send().await.unwrap()).await;
    let names: Vec<&str> = list["backups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&backup.as_str()));

    let live = body(server.client.get(server.url("/api/config")).send().await.unwrap()).await;
    assert_eq!(live["content"], VALID_CONFIG);
}

#[tokio::test]
async fn test_put_valid_config_reloads() {
    let fixture = Fixture::new();
    let server = TestServer::start(&fixture).await;
    let next = "events {}\nhttp { keepalive_timeout 10; }\n";

    let res = server
        .client
        .put(server.url("/api/config"))
        .json(&json!({ "content": next }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ok = body(res).await;
    assert!(ok["reload"].is_string());
    assert!(ok["backup"].as_str().unwrap().starts_with("nginx.conf."));
    assert_eq!(fs::read_to_string(fixture.primary()).unwrap(), next);
    assert_eq!(fixture.nginx.count(&["-s", "reload"]), 1);
}

#[tokio::test]
async fn test_put_config_reload_failure_is_server_error() {
    let fixture = Fixture::new();
    fixture.nginx.fail_reload(true);
    let server = TestServer::start(&fixture).await;

    let res = server
        .client
        .put(server.url("/api/config"))
        .json(&json!({ "content": "events {}\n" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let err = body(res).await;
    assert!(err["output"].as_str().unwrap().contains("invalid PID"));
    assert_eq!(fs::read_to_string(fixture.primary()).unwrap(), "events {}\n");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let fixture = Fixture::new();
    let server = TestServer::start(&fixture).await;

    let res = server
        .client
        .put(server.url("/api/config"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(res).await["error"], "invalid request");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut fixture = Fixture::new();
    fixture.config.security.max_body_size = 1024;
    let server = TestServer::start(&fixture).await;

    let res = server
        .client
        .put(server.url("/api/config"))
        .json(&json!({ "content": "#".repeat(4096) }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(fs::read_to_string(fixture.primary()).unwrap(), VALID_CONFIG);
    assert!(fixture.backup_names().is_empty());
}

#[tokio::test]
async fn test_missing_primary_config_is_server_error() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.primary()).unwrap();
    let server = TestServer::start(&fixture).await;

    let res = server.client.get(server.url("/api/config")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body(res).await["error"].as_str().unwrap().ends_with("not found"));
}

#[tokio::test]
async fn test_config_test_and_reload() {
    let fixture = Fixture::new();
    let server = TestServer::start(&fixture).await;

    let res = server.client.post(server.url("/api/config/test")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await["success"], true);

    fs::write(fixture.primary(), INVALID_CONFIG).unwrap();
    let res = server.client.post(server.url("/api/config/test")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(res).await["success"], false);

    let res = server.client.post(server.url("/api/config/reload")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await["message"], "reloaded");
}

#[tokio::test]
async fn test_nginx_control() {
    let fixture = Fixture::new();
    let server = TestServer::start(&fixture).await;

    let status = body(server.client.get(server.url("/api/nginx/status")).send().await.unwrap()).await;
    assert_eq!(status, json!({ "running": true, "pids": ["101", "102"] }));

    for (action, message) in [("start", "started"), ("stop", "stopped"), ("restart", "restarted")] {
        let res = server
            .client
            .post(server.url(&format!("/api/nginx/{action}")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(res).await["message"], message);
    }
    assert_eq!(fixture.nginx.count(&["-s", "stop"]), 2);
}

#[tokio::test]
async fn test_server_file_lifecycle() {
    let fixture = Fixture::new();
    let server = TestServer::start(&fixture).await;
    let client = &server.client;

    let res = client
        .post(server.url("/api/servers"))
        .json(&json!({ "name": "shop" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created = body(res).await;
    assert_eq!(created["name"], "shop.conf");

    let res = client
        .post(server.url("/api/servers"))
        .json(&json!({ "name": "shop.conf", "content": "server {}" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let list = body(client.get(server.url("/api/servers")).send().await.unwrap()).await;
    assert_eq!(list["servers"].as_array().unwrap().len(), 1);
    assert_eq!(list["servers"][0]["name"], "shop.conf");

    let file = body(client.get(server.url("/api/servers/shop")).send().await.unwrap()).await;
    assert!(file["content"].as_str().unwrap().contains("listen 80;"));

    let res = client
        .put(server.url("/api/servers/shop.conf"))
        .json(&json!({ "content": "server { listen 8080; }" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body(res).await["backup"].as_str().unwrap().starts_with("shop.conf."));

    let res = client
        .patch(server.url("/api/servers/shop.conf"))
        .json(&json!({ "newName": "store" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let renamed = body(res).await;
    assert_eq!(renamed["oldName"], "shop.conf");
    assert_eq!(renamed["newName"], "store.conf");

    let res = client.delete(server.url("/api/servers/store")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let deleted = body(res).await;
    let backup = deleted["backup"].as_str().unwrap();
    let saved = fs::read_to_string(fixture.backups_dir().join(backup)).unwrap();
    assert_eq!(saved, "server { listen 8080; }");

    let res = client.get(server.url("/api/servers/store")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let err = body(res).await;
    assert!(err["error"].as_str().unwrap().ends_with("store.conf not found"));

    let res = client.delete(server.url("/api/servers/store")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_server_save_is_rejected() {
    let fixture = Fixture::new();
    let server = TestServer::start(&fixture).await;
    fs::write(fixture.servers_dir().join("edge.conf"), "server { listen 81; }").unwrap();

    let res = server
        .client
        .put(server.url("/api/servers/edge"))
        .json(&json!({ "content": "server { invalid; }" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let live = fs::read_to_string(fixture.servers_dir().join("edge.conf")).unwrap();
    assert_eq!(live, "server { listen 81; }");
}

#[tokio::test]
async fn test_unsafe_server_names_are_rejected() {
    let fixture = Fixture::new();
    let server = TestServer::start(&fixture).await;

    for name in ["", "../escape", "a b", ".."] {
        let res = server
            .client
            .post(server.url("/api/servers"))
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "name {name:?}");
    }
    assert_eq!(fs::read_dir(fixture.servers_dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_backup_endpoints() {
    let fixture = Fixture::new();
    let server = TestServer::start(&fixture).await;
    let client = &server.client;

    let res = client.post(server.url("/api/backups")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let name = body(res).await["name"].as_str().unwrap().to_string();
    assert!(name.starts_with("nginx.conf.") && name.ends_with(".backup"));

    fs::write(fixture.servers_dir().join("x.conf"), "server {}").unwrap();
    client.delete(server.url("/api/servers/x")).send().await.unwrap();

    let all = body(client.get(server.url("/api/backups")).send().await.unwrap()).await;
    assert_eq!(all["backups"].as_array().unwrap().len(), 2);
    let primary_only = body(
        client
            .get(server.url("/api/backups?artifact=nginx.conf"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(primary_only["backups"].as_array().unwrap().len(), 1);
    assert_eq!(primary_only["backups"][0]["name"], name.as_str());

    fs::write(fixture.primary(), "events {}\n# drifted\n").unwrap();
    let res = client
        .post(server.url(&format!("/api/backups/{name}/restore")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let restored = body(res).await;
    assert_eq!(restored["valid"], true);
    assert_eq!(fs::read_to_string(fixture.primary()).unwrap(), VALID_CONFIG);

    let res = client
        .post(server.url("/api/backups/nginx.conf.20000101_000000.backup/restore"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body(res).await["error"], "backup not found");

    let res = client
        .delete(server.url(&format!("/api/backups/{name}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await["name"], name.as_str());

    let res = client
        .delete(server.url(&format!("/api/backups/{name}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_api_key_guards_everything_but_health() {
    let mut fixture = Fixture::new();
    fixture.config.auth.api_key = Some("s3cret".to_string());
    let server = TestServer::start(&fixture).await;

    let res = server.client.get(server.url("/api/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body(res).await["status"], "ok");

    let res = server.client.get(server.url("/api/config")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/api/config"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.url("/api/config"))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let fixture = Fixture::new();
    let server = TestServer::start(&fixture).await;

    let res = server
        .client
        .get(server.url("/api/health"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me");

    let res = server.client.get(server.url("/api/health")).send().await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));
}
