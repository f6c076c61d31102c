//! HTTP-level tests against a mock sentinel: execution endpoint, JSON
//! submission, applet lookup and audit logging. Wire-format and streaming
//! timing tests use a one-shot raw socket server.

use std::io::Read;
use std::time::{Duration, Instant};

use flate2::read::GzDecoder;
use httpmock::Method::POST;
use httpmock::MockServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use weil_client::{
    Account, ClientConfig, ClientError, ContractCall, HttpSubmitter, SubmitOutcome, Submitter,
    TransactionBuilder, WeilClient,
};
use weil_crypto::address::AddressScheme;
use weil_crypto::keys::Keypair;
use weil_types::constants::{
    EXECUTE_SMARTCONTRACT_PATH, GET_APPLET_ADDRESS_PATH, MAX_RETRIES, NON_BLOCKING_HEADER,
    SUBMIT_TXN_PATH, TRANSACTION_FIELD_NAME, TRANSACTION_FILE_NAME, TRANSACTION_MIME,
};
use weil_types::contract::ContractId;
use weil_types::transaction::{SubmitTxnRequest, TransactionStatus};

const COMMITTED_BODY: &str =
    r#"{"status":"Committed","block_height":42,"tx_idx":0,"txn_result":"null"}"#;
const CONFLICT_BODY: &str =
    r#"{"expected_nonce":5,"received_nonce":1,"message":"nonce mismatch","status":"Failed"}"#;

/// Helper: a contract id whose pod counter is `counter`.
fn contract_id(counter: i32) -> String {
    let mut raw = [0x11u8; 36];
    raw[..4].copy_from_slice(&counter.to_be_bytes());
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &raw).to_lowercase()
}

/// Helper: a client with a fresh key pointed at the mock server.
fn client_for(server: &MockServer) -> WeilClient {
    let config = ClientConfig {
        sentinel_url: server.base_url(),
        ..ClientConfig::default()
    };
    let account = Account::new(Keypair::generate(), AddressScheme::Direct);
    WeilClient::new(account, &config).unwrap()
}

/// Helper: a signed envelope from a fresh account.
fn signed_envelope(counter: i32) -> SubmitTxnRequest {
    let account = Account::new(Keypair::generate(), AddressScheme::Direct);
    let call = ContractCall::new(
        ContractId::parse(&contract_id(counter)).unwrap(),
        "ask",
        r#"{"prompt":"why"}"#,
    );
    TransactionBuilder::new(&account)
        .build(&call, 1)
        .unwrap()
        .envelope()
        .clone()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Read one HTTP/1.1 request: head plus a `content-length` body.
async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    loop {
        let n = socket.read(&mut tmp).await.unwrap();
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(end) = find(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                return buf;
            }
        }
    }
}

/// Helper: a one-shot sentinel on a raw socket. It records the request, then
/// answers 200 with a chunked body, pausing `gap` between chunks. Resolves to
/// the raw request bytes.
async fn chunked_sentinel(
    chunks: Vec<&'static str>,
    gap: Duration,
) -> (String, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let head = "HTTP/1.1 200 OK\r\n\
                    content-type: text/plain\r\n\
                    transfer-encoding: chunked\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return request;
        }
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(gap).await;
            }
            let frame = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
            if socket.write_all(frame.as_bytes()).await.is_err() {
                return request;
            }
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
        request
    });
    (base_url, handle)
}

#[tokio::test]
async fn blocking_execute_returns_committed_result() {
    let server = MockServer::start_async().await;
    let execute = server
        .mock_async(|when, then| {
            when.method(POST).path(EXECUTE_SMARTCONTRACT_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .body(COMMITTED_BODY);
        })
        .await;

    let client = client_for(&server);
    let result = client
        .execute(
            ContractId::parse(&contract_id(5)).unwrap(),
            "transfer",
            r#"{"amount":100}"#,
        )
        .await
        .unwrap();

    assert_eq!(result.status, TransactionStatus::Committed);
    assert_eq!(result.block_height, 42);
    assert_eq!(result.txn_result, "null");
    execute.assert_hits_async(1).await;
}

#[tokio::test]
async fn non_blocking_execute_sets_header_and_skips_decode() {
    let server = MockServer::start_async().await;
    let execute = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(EXECUTE_SMARTCONTRACT_PATH)
                .header(NON_BLOCKING_HEADER, "true");
            then.status(200).body("queued");
        })
        .await;

    let client = client_for(&server);
    let contract = client.to_contract_client(ContractId::parse(&contract_id(1)).unwrap());
    let result = contract.execute_non_blocking("ping", "{}").await.unwrap();

    assert_eq!(result.status, TransactionStatus::InProgress);
    execute.assert_hits_async(1).await;
}

#[tokio::test]
async fn non_success_status_is_fatal() {
    let server = MockServer::start_async().await;
    let execute = server
        .mock_async(|when, then| {
            when.method(POST).path(EXECUTE_SMARTCONTRACT_PATH);
            then.status(500).body("sentinel exploded");
        })
        .await;

    let client = client_for(&server);
    let err = client
        .execute(ContractId::parse(&contract_id(1)).unwrap(), "ping", "{}")
        .await
        .unwrap_err();

    match err {
        ClientError::HttpStatus { status, body, .. } => {
            assert_eq!(status, 500);
            assert!(body.contains("exploded"));
        }
        other => panic!("expected HttpStatus, got {:?}", other),
    }
    execute.assert_hits_async(1).await;
}

#[tokio::test]
async fn unrecognised_body_is_not_retried() {
    let server = MockServer::start_async().await;
    let execute = server
        .mock_async(|when, then| {
            when.method(POST).path(EXECUTE_SMARTCONTRACT_PATH);
            then.status(200).body(r#"{"surprise":true}"#);
        })
        .await;

    let client = client_for(&server);
    let err = client
        .execute(ContractId::parse(&contract_id(1)).unwrap(), "ping", "{}")
        .await
        .unwrap_err();

    match err {
        ClientError::InvalidResponse { op, body } => {
            assert_eq!(op, "execute");
            assert_eq!(body, r#"{"surprise":true}"#);
        }
        other => panic!("expected InvalidResponse, got {:?}", other),
    }
    execute.assert_hits_async(1).await;
}

#[tokio::test]
async fn persistent_conflict_hits_sentinel_max_retries_times() {
    let server = MockServer::start_async().await;
    let execute = server
        .mock_async(|when, then| {
            when.method(POST).path(EXECUTE_SMARTCONTRACT_PATH);
            then.status(200).body(CONFLICT_BODY);
        })
        .await;

    let client = client_for(&server);
    let contract = ContractId::parse(&contract_id(7)).unwrap();
    let err = client
        .execute(contract, "transfer", "{}")
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::MaxRetriesReached { .. }));
    execute.assert_hits_async(MAX_RETRIES as usize).await;

    let key = weil_client::nonce::nonce_key(7, client.account().address());
    assert_eq!(client.tracker().get(&key), Some(6));
}

#[tokio::test]
async fn slow_sentinel_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(EXECUTE_SMARTCONTRACT_PATH);
            then.status(200)
                .delay(Duration::from_secs(2))
                .body(COMMITTED_BODY);
        })
        .await;

    let submitter = HttpSubmitter::new(reqwest::Client::new(), server.base_url())
        .with_request_timeout(Duration::from_millis(200));
    let account = Account::new(Keypair::generate(), AddressScheme::Direct);
    let call = ContractCall::new(ContractId::parse(&contract_id(1)).unwrap(), "ping", "{}");
    let signed = TransactionBuilder::new(&account).build(&call, 1).unwrap();

    let err = submitter.submit(signed.envelope(), true).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout { op: "execute" }));
}

#[tokio::test]
async fn submitter_classifies_conflict_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(EXECUTE_SMARTCONTRACT_PATH);
            then.status(200).body(CONFLICT_BODY);
        })
        .await;

    let submitter = HttpSubmitter::new(reqwest::Client::new(), server.base_url());
    let account = Account::new(Keypair::generate(), AddressScheme::Direct);
    let call = ContractCall::new(ContractId::parse(&contract_id(1)).unwrap(), "ping", "{}");
    let signed = TransactionBuilder::new(&account).build(&call, 1).unwrap();

    match submitter.submit(signed.envelope(), true).await.unwrap() {
        SubmitOutcome::NonceConflict(failure) => {
            assert_eq!(failure.expected_nonce, 5);
            assert_eq!(failure.received_nonce, 1);
        }
        other => panic!("expected NonceConflict, got {:?}", other),
    }
}

#[tokio::test]
async fn streaming_execute_yields_raw_body() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(EXECUTE_SMARTCONTRACT_PATH);
            then.status(200).body("token one, token two");
        })
        .await;

    let client = client_for(&server);
    let stream = client
        .to_contract_client(ContractId::parse(&contract_id(2)).unwrap())
        .execute_with_streaming("ask", r#"{"prompt":"why"}"#)
        .await
        .unwrap();

    let body = stream.collect_bytes().await.unwrap();
    assert_eq!(body, b"token one, token two");
}

#[tokio::test]
async fn submit_txn_decodes_tagged_result() {
    let server = MockServer::start_async().await;
    let submit = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SUBMIT_TXN_PATH)
                .header("content-type", "application/json");
            then.status(200).body(r#"{"Ok":"txn-accepted"}"#);
        })
        .await;

    let client = client_for(&server);
    let call = ContractCall::new(ContractId::parse(&contract_id(3)).unwrap(), "ping", "{}");
    assert_eq!(client.submit_txn(&call).await.unwrap(), "txn-accepted");
    submit.assert_hits_async(1).await;
}

#[tokio::test]
async fn submit_txn_err_is_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(SUBMIT_TXN_PATH);
            then.status(200).body(r#"{"Err":"bad signature"}"#);
        })
        .await;

    let client = client_for(&server);
    let call = ContractCall::new(ContractId::parse(&contract_id(3)).unwrap(), "ping", "{}");
    match client.submit_txn(&call).await.unwrap_err() {
        ClientError::Rejected { op, message } => {
            assert_eq!(op, "submit_txn");
            assert_eq!(message, "bad signature");
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn resolve_applet_parses_contract_id() {
    let server = MockServer::start_async().await;
    let id = contract_id(12);
    let lookup = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(GET_APPLET_ADDRESS_PATH)
                .json_body(serde_json::json!({ "svc_name": "auditor" }));
            then.status(200)
                .json_body(serde_json::json!({ "Ok": id.clone() }));
        })
        .await;

    let client = client_for(&server);
    let resolved = client.resolve_applet("auditor").await.unwrap();
    assert_eq!(resolved.as_str(), id);
    assert_eq!(resolved.pod_counter(), 12);
    lookup.assert_hits_async(1).await;
}

#[tokio::test]
async fn resolve_unknown_applet_is_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(GET_APPLET_ADDRESS_PATH);
            then.status(200).body(r#"{"Err":"no such applet"}"#);
        })
        .await;

    let client = client_for(&server);
    let err = client.resolve_applet("missing").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected { op: "resolve_applet", .. }));
}

#[tokio::test]
async fn audit_resolves_applet_once() {
    let server = MockServer::start_async().await;
    let id = contract_id(4);
    let lookup = server
        .mock_async(|when, then| {
            when.method(POST).path(GET_APPLET_ADDRESS_PATH);
            then.status(200)
                .json_body(serde_json::json!({ "Ok": id.clone() }));
        })
        .await;
    let execute = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(EXECUTE_SMARTCONTRACT_PATH)
                .header(NON_BLOCKING_HEADER, "true");
            then.status(200);
        })
        .await;

    let client = client_for(&server);
    client.audit("agent started").await.unwrap();
    client.audit("agent finished").await.unwrap();

    lookup.assert_hits_async(1).await;
    execute.assert_hits_async(2).await;
}

#[tokio::test]
async fn execute_posts_gzipped_envelope_as_multipart() {
    let (base_url, server) = chunked_sentinel(vec![COMMITTED_BODY], Duration::ZERO).await;
    let envelope = signed_envelope(8);

    let submitter = HttpSubmitter::new(reqwest::Client::new(), base_url);
    let outcome = submitter.submit(&envelope, true).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Committed(_)));

    let request = server.await.unwrap();
    let head_end = find(&request, b"\r\n\r\n").unwrap();
    let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
    assert!(head.starts_with(&format!("post {} http/1.1", EXECUTE_SMARTCONTRACT_PATH)));
    assert!(!head.contains(NON_BLOCKING_HEADER));
    let boundary = head
        .lines()
        .find_map(|line| line.strip_prefix("content-type: multipart/form-data; boundary="))
        .expect("multipart content type")
        .trim()
        .to_string();

    // One part: its headers, a blank line, the gzip payload, the closing boundary.
    let body = &request[head_end + 4..];
    let part_head_end = find(body, b"\r\n\r\n").unwrap();
    let part_head = String::from_utf8_lossy(&body[..part_head_end]).to_lowercase();
    assert!(part_head.contains(&format!(
        "content-disposition: form-data; name=\"{}\"; filename=\"{}\"",
        TRANSACTION_FIELD_NAME, TRANSACTION_FILE_NAME
    )));
    assert!(part_head.contains(&format!("content-type: {}", TRANSACTION_MIME)));

    let payload_start = part_head_end + 4;
    let closing = format!("\r\n--{}--", boundary);
    let payload_end = find(body, closing.as_bytes()).unwrap();
    let mut json = Vec::new();
    GzDecoder::new(&body[payload_start..payload_end])
        .read_to_end(&mut json)
        .unwrap();
    let decoded: SubmitTxnRequest = serde_json::from_slice(&json).unwrap();
    assert_eq!(decoded, envelope);
}

#[tokio::test]
async fn streaming_outlives_request_timeout_while_chunks_flow() {
    let chunks = vec!["one ", "two ", "three ", "four ", "five"];
    let (base_url, server) = chunked_sentinel(chunks, Duration::from_millis(250)).await;
    let submitter = HttpSubmitter::new(reqwest::Client::new(), base_url)
        .with_request_timeout(Duration::from_millis(600));

    let started = Instant::now();
    let stream = submitter
        .submit_streaming(&signed_envelope(2))
        .await
        .unwrap();
    let body = stream.collect_bytes().await.unwrap();

    assert_eq!(body, b"one two three four five");
    assert!(started.elapsed() > Duration::from_millis(600));
    server.await.unwrap();
}

#[tokio::test]
async fn streaming_stall_times_out() {
    let (base_url, _server) =
        chunked_sentinel(vec!["first", "too late"], Duration::from_secs(2)).await;
    let submitter = HttpSubmitter::new(reqwest::Client::new(), base_url)
        .with_request_timeout(Duration::from_millis(200));

    let stream = submitter
        .submit_streaming(&signed_envelope(2))
        .await
        .unwrap();
    let err = stream.collect_bytes().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Timeout {
            op: "execute_with_streaming"
        }
    ));
}
