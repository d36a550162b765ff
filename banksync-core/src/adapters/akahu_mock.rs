//! Mock Akahu API server for testing
//!
//! Serves `GET /transactions` with the same envelope as the real API
//! (`{ success, items: [...], cursor: { next } }`), paginated by an opaque
//! cursor, so the client can be exercised without real tokens.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use chrono::{Duration, SecondsFormat, Utc};
use serde_json::json;

/// Mock Akahu server for testing
pub struct MockAkahuServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Configuration for mock data generation
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Number of connected accounts (`acc_1`, `acc_2`, ...)
    pub num_accounts: usize,
    /// Total transactions across all accounts
    pub num_transactions: usize,
    /// Items per page before a cursor is returned
    pub page_size: usize,
    /// Whether to simulate authentication failure
    pub fail_auth: bool,
    /// Whether to simulate rate limiting
    pub rate_limit: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_accounts: 2,
            num_transactions: 30,
            page_size: 100,
            fail_auth: false,
            rate_limit: false,
        }
    }
}

impl MockAkahuServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        // Non-blocking so the accept loop can observe shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        thread::spawn(move || handle_connection(stream, &cfg));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockAkahuServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig) {
    // The accepted socket inherits non-blocking mode on some platforms
    let _ = stream.set_nonblocking(false);

    let mut buffer = [0; 4096];
    let Ok(n) = stream.read(&mut buffer) else {
        return;
    };
    let request = String::from_utf8_lossy(&buffer[..n]);

    let first_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", r#"{"success": false, "message": "Invalid request"}"#);
        return;
    }
    let (method, target) = (parts[0], parts[1]);

    let request_lower = request.to_lowercase();
    let has_valid_auth = request_lower.contains("authorization: bearer user_")
        && request_lower.contains("x-akahu-id: app_");

    if config.fail_auth || !has_valid_auth {
        send_response(&mut stream, 401, "Unauthorized", r#"{"success": false, "message": "Unauthorized"}"#);
        return;
    }
    if config.rate_limit {
        send_response(&mut stream, 429, "Too Many Requests", r#"{"success": false, "message": "Rate limited"}"#);
        return;
    }

    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if method != "GET" {
        send_response(&mut stream, 405, "Method Not Allowed", r#"{"success": false}"#);
        return;
    }
    if path != "/transactions" {
        send_response(&mut stream, 404, "Not Found", r#"{"success": false, "message": "Not found"}"#);
        return;
    }
    if query_param(query, "start").is_none() || query_param(query, "end").is_none() {
        send_response(&mut stream, 400, "Bad Request", r#"{"success": false, "message": "start and end required"}"#);
        return;
    }

    let offset = query_param(query, "cursor")
        .and_then(|c| c.strip_prefix("page_").map(str::to_string))
        .and_then(|c| c.parse::<usize>().ok())
        .unwrap_or(0);

    let all = generate_mock_transactions(config.num_accounts, config.num_transactions);
    let page_size = config.page_size.max(1);
    let end = (offset + page_size).min(all.len());
    let items: Vec<_> = all.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
    let next = (end < all.len()).then(|| format!("page_{}", end));

    let body = json!({
        "success": true,
        "items": items,
        "cursor": { "next": next },
    });
    send_response(&mut stream, 200, "OK", &body.to_string());
}

fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn generate_mock_transactions(num_accounts: usize, count: usize) -> Vec<serde_json::Value> {
    let merchants = [
        (Some("New World"), "NEW WORLD KARORI WELLINGTON", -25.50),
        (Some("Countdown"), "COUNTDOWN KILBIRNIE", -62.10),
        (None, "INTEREST ADJUSTMENT", 0.15),
        (Some("Z Energy"), "Z ENERGY KILBIRNIE", -80.00),
        (None, "INTERNET XFR TO SAVINGS", -200.00),
        (Some("Mojo Coffee"), "MOJO LAMBTON QUAY", -5.50),
        (None, "SALARY ACME LTD", 3500.00),
    ];

    let now = Utc::now();
    let num_accounts = num_accounts.max(1);

    (0..count)
        .map(|i| {
            let (merchant, description, amount) = merchants[i % merchants.len()];
            let date = now - Duration::days((i % 60) as i64);
            let mut item = json!({
                "_id": format!("trans_{}", i + 1),
                "_account": format!("acc_{}", i % num_accounts + 1),
                "date": date.to_rfc3339_opts(SecondsFormat::Millis, true),
                "description": description,
                "amount": amount,
                "balance": 1000.0 + i as f64,
                "type": if amount < 0.0 { "EFTPOS" } else { "CREDIT" },
            });
            if let Some(name) = merchant {
                item["merchant"] = json!({ "_id": format!("merchant_{}", i % 7), "name": name });
            }
            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::akahu::{AkahuClient, AkahuProvider};
    use crate::domain::Transaction;
    use crate::ports::TransactionProvider;

    fn window() -> (chrono::DateTime<Utc>, chrono::DateTime<Utc>) {
        let end = Utc::now();
        (end - Duration::days(90), end)
    }

    #[test]
    fn test_mock_server_single_page() {
        let server = MockAkahuServer::start(MockConfig::default()).unwrap();
        let client =
            AkahuClient::new_with_base_url("app_test", "user_test", &server.base_url()).unwrap();

        let (start, end) = window();
        let result = client.get_transactions(start, end).unwrap();

        assert_eq!(result.payloads.len(), 30);
        assert!(result.warnings.is_empty());
        assert_eq!(result.payloads[0].account_id, "acc_1");
        assert_eq!(result.payloads[1].account_id, "acc_2");
    }

    #[test]
    fn test_mock_server_follows_cursor() {
        let server = MockAkahuServer::start(MockConfig {
            num_transactions: 25,
            page_size: 10,
            ..Default::default()
        })
        .unwrap();
        let client =
            AkahuClient::new_with_base_url("app_test", "user_test", &server.base_url()).unwrap();

        let (start, end) = window();
        let result = client.get_transactions(start, end).unwrap();

        assert_eq!(result.payloads.len(), 25);
        let first_id = result.payloads[0].payload["_id"].as_str().unwrap();
        let last_id = result.payloads[24].payload["_id"].as_str().unwrap();
        assert_eq!(first_id, "trans_1");
        assert_eq!(last_id, "trans_25");
    }

    #[test]
    fn test_mock_payloads_normalize() {
        let server = MockAkahuServer::start(MockConfig {
            num_transactions: 7,
            ..Default::default()
        })
        .unwrap();
        let client =
            AkahuClient::new_with_base_url("app_test", "user_test", &server.base_url()).unwrap();

        let (start, end) = window();
        let result = client.get_transactions(start, end).unwrap();

        let txs: Vec<Transaction> = result
            .payloads
            .iter()
            .map(|p| Transaction::from_payload(&p.payload, "akahu", &p.account_id).unwrap())
            .collect();
        assert_eq!(txs[0].merchant_normalised, "New World");
        assert_eq!(txs[2].merchant_normalised, "");
        assert_eq!(txs[2].description_raw, "INTEREST ADJUSTMENT");
    }

    #[test]
    fn test_mock_server_auth_failure() {
        let server = MockAkahuServer::start(MockConfig {
            fail_auth: true,
            ..Default::default()
        })
        .unwrap();
        let client =
            AkahuClient::new_with_base_url("app_test", "user_test", &server.base_url()).unwrap();

        let (start, end) = window();
        let err = client.get_transactions(start, end).unwrap_err();
        assert!(err.to_string().contains("authentication"), "{}", err);
    }

    #[test]
    fn test_mock_server_rejects_unknown_tokens() {
        let server = MockAkahuServer::start(MockConfig::default()).unwrap();
        let client =
            AkahuClient::new_with_base_url("wrong", "user_test", &server.base_url()).unwrap();

        let (start, end) = window();
        assert!(client.get_transactions(start, end).is_err());
    }

    #[test]
    fn test_mock_server_rate_limit() {
        let server = MockAkahuServer::start(MockConfig {
            rate_limit: true,
            ..Default::default()
        })
        .unwrap();
        let client =
            AkahuClient::new_with_base_url("app_test", "user_test", &server.base_url()).unwrap();

        let (start, end) = window();
        let err_msg = client
            .get_transactions(start, end)
            .unwrap_err()
            .to_string()
            .to_lowercase();
        assert!(err_msg.contains("rate limit"), "Expected 'rate limit' in error, got: {}", err_msg);
    }

    #[test]
    fn test_provider_with_mock() {
        let server = MockAkahuServer::start(MockConfig {
            num_transactions: 5,
            page_size: 2,
            ..Default::default()
        })
        .unwrap();
        let client =
            AkahuClient::new_with_base_url("app_test", "user_test", &server.base_url()).unwrap();
        let provider = AkahuProvider::new(client);

        let (start, end) = window();
        let result = provider.fetch_transactions(start, end).unwrap();
        assert_eq!(result.payloads.len(), 5);
    }
}
