//! # cachectl
//!
//! Operational CLI for talking directly to a single `cached-server` shard:
//! issues raw Get/Set/Delete RPCs over the same length-prefixed bincode
//! frame the fabric uses internally, for poking at a shard without spinning
//! up a full application service.

use cachefabric::protocol::framing::{read_message, write_message};
use cachefabric::protocol::messages::{CacheRequest, CacheResponse};
use std::env;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> cachefabric::Result<()> {
    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║              cachectl - cache shard console              ║");
    println!("╚══════════════════════════════════════════════════════════╝");
    println!();

    let addr = env::args().nth(1).unwrap_or_else(|| "127.0.0.1:11211".to_string());
    println!("Connecting to cache shard at {addr}...");

    let mut stream = TcpStream::connect(&addr).await?;
    println!("Connected. Commands: get <key> | set <key> <value> | delete <key> | exit");
    println!();

    let mut reader = BufReader::new(stdin());
    let mut input = String::new();

    loop {
        print!("cachectl> ");
        std::io::Write::flush(&mut std::io::stdout()).ok();

        input.clear();
        if reader.read_line(&mut input).await? == 0 {
            break;
        }

        let mut parts = input.trim().splitn(3, ' ');
        let command = parts.next().unwrap_or("");

        let request = match command {
            "" => continue,
            "exit" | "quit" => {
                println!("Goodbye!");
                break;
            }
            "get" => match parts.next() {
                Some(key) => CacheRequest::Get { key: key.to_string() },
                None => {
                    println!("usage: get <key>");
                    continue;
                }
            },
            "set" => match (parts.next(), parts.next()) {
                (Some(key), Some(value)) => CacheRequest::Set {
                    key: key.to_string(),
                    value: value.as_bytes().to_vec(),
                },
                _ => {
                    println!("usage: set <key> <value>");
                    continue;
                }
            },
            "delete" => match parts.next() {
                Some(key) => CacheRequest::Delete { key: key.to_string() },
                None => {
                    println!("usage: delete <key>");
                    continue;
                }
            },
            other => {
                println!("unknown command: {other}");
                continue;
            }
        };

        write_message(&mut stream, &request).await?;
        let response: CacheResponse = read_message(&mut stream).await?;
        print_response(&response);
        println!();
    }

    Ok(())
}

fn print_response(response: &CacheResponse) {
    match response {
        CacheResponse::Get { value, ok: true } => {
            println!("{}", String::from_utf8_lossy(value));
        }
        CacheResponse::Get { ok: false, .. } => println!("(miss)"),
        CacheResponse::Set { ok } => println!("{}", if *ok { "OK" } else { "ERROR" }),
        CacheResponse::Delete { ok } => println!("{}", if *ok { "OK" } else { "ERROR" }),
    }
}
