use std::time::Duration;

use fetchkit::{Cancellation, ClientBuilder, Error, ResolveWith, Transformer};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("fetchkit=debug")
        .init();

    // A client whose requests all resolve against httpbin
    let client = ClientBuilder::new()
        .base_url("https://httpbin.org")
        .user_agent("fetchkit/0.1.0")
        .timeout(Duration::from_secs(10))
        .build()?;

    println!("=== Basic GET Request ===");

    let data = client.get("get").query([("page", "1")]).exec().await?;
    println!("Args: {}", data["args"]);

    println!("\n=== POST Request with JSON ===");

    let data = client
        .post("anything")
        .json(&json!({
            "name": "fetchkit",
            "version": "0.1.0",
            "language": "rust"
        }))?
        .resolve_with(ResolveWith::Json)
        .fetch()
        .await?
        .into_data()?;
    println!("Echoed body: {}", data["json"]);

    println!("\n=== Shared Base with Transformers ===");

    // Every request derived from `api` carries the signing header
    let api = client
        .request()
        .url("anything/v1")
        .add_transformer(Transformer::headers(|mut headers| {
            headers.insert("X-Signature", "demo");
            Ok(headers)
        }));

    let users = api.clone().url("users").exec().await?;
    println!("URL: {}", users["url"]);
    println!("Signature: {}", users["headers"]["X-Signature"]);

    println!("\n=== Cancellation ===");

    let cancellation = Cancellation::with_message("demo gave up waiting");
    let handle = cancellation.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.cancel();
    });

    match client.get("delay/5").cancellation(cancellation).fetch().await {
        Ok(reply) => println!("Unexpected success: {:?}", reply.response().map(|r| r.status())),
        Err(e) => println!("Cancelled: {}", e),
    }

    println!("\n=== Error Handling Example ===");

    let lenient = client
        .get("status/404")
        .add_transformer(Transformer::error(|e| match e {
            Error::HttpStatus { status, .. } => Error::custom(format!("not there ({})", status)),
            other => other,
        }));

    match lenient.fetch().await {
        Ok(reply) => println!("Unexpected success: {:?}", reply.response().map(|r| r.status())),
        Err(e) => println!("Expected error for 404: {}", e),
    }

    println!("\n=== All examples completed successfully! ===");

    Ok(())
}
