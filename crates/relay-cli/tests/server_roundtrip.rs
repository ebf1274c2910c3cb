//! Round trips through the TCP transport

use std::path::PathBuf;

use relay_cli::{Client, Server};
use relay_runtime::{ComponentResolver, Dispatcher, Session};
use serde_json::{json, Value as JsonValue};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Start a server on an ephemeral port and return its address.
async fn start_server() -> String {
    let session = Session::new(ComponentResolver::new(vec![fixtures_dir()]));
    let server = Server::bind("127.0.0.1:0", Dispatcher::new(session))
        .await
        .expect("bind failed");
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(server.run());
    addr
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_operations_over_tcp() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await.unwrap();

    let hello = client.call("hello", json!([])).await.unwrap();
    assert_eq!(hello.result(), Some(&json!(true)));

    client.call("component.open", json!(["counter"])).await.unwrap();
    client
        .call("object.new", json!(["Counter", "c1", [5], {}]))
        .await
        .unwrap();
    let value = client
        .call("method.eval", json!({"id": "c1", "methodName": "increment"}))
        .await
        .unwrap();
    assert_eq!(value.result(), Some(&json!(6)));

    let failed = client.call("function.eval", json!(["fail"])).await.unwrap();
    assert_eq!(failed.error_type(), Some("InvocationError"));

    let missing = client.call("method.eval", json!(["missing", "foo"])).await.unwrap();
    assert_eq!(missing.error_type(), Some("ObjectNotFound"));
    let hello = client.call("hello", JsonValue::Null).await.unwrap();
    assert_eq!(hello.result(), Some(&json!(true)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_connections_share_one_session() {
    let addr = start_server().await;
    let mut first = Client::connect(&addr).await.unwrap();
    let mut second = Client::connect(&addr).await.unwrap();

    first.call("component.open", json!(["counter"])).await.unwrap();
    first.call("eval", json!(["shared = 41"])).await.unwrap();

    let seen = second.call("eval", json!(["shared + 1"])).await.unwrap();
    assert_eq!(seen.result(), Some(&json!(42)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_undecodable_lines_get_parse_errors() {
    let addr = start_server().await;
    let stream = TcpStream::connect(&addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    writer.write_all(b"this is not json\n").await.unwrap();
    writer
        .write_all(b"{\"id\": 9, \"method\": \"hello\", \"params\": []}\n")
        .await
        .unwrap();

    let first: JsonValue = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(first["id"], json!(0));
    assert_eq!(first["result"]["error"], json!(true));
    assert_eq!(first["result"]["errorType"], json!("ParseError"));

    let second: JsonValue = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(
        second,
        json!({"id": 9, "result": {"error": false, "result": true, "type": "bool"}})
    );
}
