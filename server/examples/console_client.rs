//
// Copyright 2025-2026 The Rovertel Authors. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Interactive console client for the telemetry server
//!
//! Connects to a running server, prints everything the server pushes
//! (command replies and the periodic DATA broadcast), and forwards each
//! line you type. Exits on `LOGOUT` or when the server closes the
//! connection.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example console_client -- localhost 7007
//! ```

use std::io::Write;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let host = args.get(1).map(|s| s.as_str()).unwrap_or("localhost");
    let port: u16 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(7007);

    println!("Rovertel Console Client");
    println!("=======================");
    println!("Connecting to: {}:{}", host, port);
    println!();

    let stream = TcpStream::connect((host, port)).await?;
    println!("Connected. Type commands and press Enter (LOGOUT to quit).");
    println!();

    let (read_half, mut write_half) = stream.into_split();

    // Print server lines as they arrive
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            print!("\r[server] {}\n> ", line);
            std::io::stdout().flush().ok();
        }
        println!("\r=== Server closed the connection ===");
    });

    // Forward stdin lines to the server
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    print!("> ");
    std::io::stdout().flush().ok();
    while let Ok(Some(line)) = stdin.next_line().await {
        let command = line.trim();
        if command.is_empty() {
            print!("> ");
            std::io::stdout().flush().ok();
            continue;
        }
        write_half.write_all(format!("{command}\n").as_bytes()).await?;
        if command.eq_ignore_ascii_case("LOGOUT") {
            break;
        }
        print!("> ");
        std::io::stdout().flush().ok();
    }

    reader.abort();
    Ok(())
}
