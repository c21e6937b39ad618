//! Raw request handlers for poking backend endpoints.

use anyhow::{Context, Result};
use artha_core::client::ApiPayload;
use serde_json::Value;

use crate::cli::open_session;

pub async fn get(path: &str) -> Result<()> {
    let (client, _store) = open_session()?;
    print_payload(client.get(path).await?);
    Ok(())
}

pub async fn post(path: &str, json: &str) -> Result<()> {
    let body: Value = serde_json::from_str(json).context("request body is not valid JSON")?;
    let (client, _store) = open_session()?;
    print_payload(client.post(path, body).await?);
    Ok(())
}

pub async fn put(path: &str, json: &str) -> Result<()> {
    let body: Value = serde_json::from_str(json).context("request body is not valid JSON")?;
    let (client, _store) = open_session()?;
    print_payload(client.put(path, body).await?);
    Ok(())
}

pub async fn delete(path: &str) -> Result<()> {
    let (client, _store) = open_session()?;
    print_payload(client.delete(path).await?);
    Ok(())
}

fn print_payload(payload: ApiPayload) {
    match payload {
        ApiPayload::Json(value) => {
            let pretty = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            println!("{pretty}");
        }
        ApiPayload::Text(text) => println!("{text}"),
        ApiPayload::NoContent => println!("(no content)"),
    }
}
