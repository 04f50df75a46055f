#![allow(clippy::unwrap_used, clippy::expect_used)]

use breadcord_gateway::{Transport, WsTransport};

const UNREACHABLE: &str = "wss://127.0.0.1:9/";

#[tokio::test]
async fn unreachable_endpoint_is_an_error() {
    let outcome = tokio::spawn(async {
        match WsTransport.connect(UNREACHABLE).await {
            Ok(_) => None,
            Err(e) => Some(e.to_string()),
        }
    })
    .await
    .expect("connect must not panic");

    let message = outcome.expect("connect to a closed port must fail");
    assert!(message.starts_with("failed to connect to wss://127.0.0.1:9/"), "{message}");
}

#[tokio::test]
async fn repeated_connects_share_the_crypto_provider() {
    for _ in 0..2 {
        assert!(WsTransport.connect(UNREACHABLE).await.is_err());
    }
}
