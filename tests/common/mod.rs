#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use usecase_field_patcher::api::CustomFieldApi;
use usecase_field_patcher::config::Config;
use usecase_field_patcher::logging::{LogContext, LogSink};
use usecase_field_patcher::model::{CustomFieldDefinition, PatchReply, PatchRequest};
use usecase_field_patcher::{Result, ToolError};

pub const BASE_URL: &str = "https://api.example.test";
pub const TENANT: &str = "acme";

type Responder = Box<dyn Fn(&PatchRequest) -> Result<PatchReply>>;

/// In-memory stand-in for the remote service that records every call.
pub struct FakeApi {
    pub token: std::result::Result<String, u16>,
    pub catalog: std::result::Result<Vec<CustomFieldDefinition>, u16>,
    responder: Responder,
    pub exchanges: Cell<usize>,
    pub catalog_fetches: Cell<usize>,
    pub patches: RefCell<Vec<(String, PatchRequest)>>,
}

impl FakeApi {
    pub fn new(catalog: &[(&str, &str)]) -> Self {
        Self {
            token: Ok("bearer-1".to_string()),
            catalog: Ok(catalog
                .iter()
                .map(|(name, id)| CustomFieldDefinition {
                    id: id.to_string(),
                    name: name.to_string(),
                })
                .collect()),
            responder: Box::new(|_| {
                Ok(PatchReply {
                    status: 200,
                    body: "{}".to_string(),
                })
            }),
            exchanges: Cell::new(0),
            catalog_fetches: Cell::new(0),
            patches: RefCell::new(Vec::new()),
        }
    }

    pub fn responding(
        mut self,
        responder: impl Fn(&PatchRequest) -> Result<PatchReply> + 'static,
    ) -> Self {
        self.responder = Box::new(responder);
        self
    }

    pub fn patch_count(&self) -> usize {
        self.patches.borrow().len()
    }

    /// `(url, custom_field_id, value)` of every PATCH, in send order.
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.patches
            .borrow()
            .iter()
            .map(|(_, request)| {
                (
                    request.url.clone(),
                    request.payload.data.attributes.custom_field_id.clone(),
                    request.payload.data.attributes.value.clone(),
                )
            })
            .collect()
    }
}

impl CustomFieldApi for FakeApi {
    fn exchange_token(&self, _api_token: &str, _tenant: &str) -> Result<String> {
        self.exchanges.set(self.exchanges.get() + 1);
        self.token
            .clone()
            .map_err(ToolError::TokenExchangeRejected)
    }

    fn fetch_custom_fields(&self, _bearer: &str, tenant: &str) -> Result<Vec<CustomFieldDefinition>> {
        self.catalog_fetches.set(self.catalog_fetches.get() + 1);
        self.catalog.clone().map_err(|status| ToolError::CatalogRejected {
            tenant: tenant.to_string(),
            status,
        })
    }

    fn patch_custom_field(&self, bearer: &str, request: &PatchRequest) -> Result<PatchReply> {
        self.patches
            .borrow_mut()
            .push((bearer.to_string(), request.clone()));
        (self.responder)(request)
    }
}

pub fn reply(status: u16, body: &str) -> Result<PatchReply> {
    Ok(PatchReply {
        status,
        body: body.to_string(),
    })
}

pub fn write_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("fixture written");
    path
}

pub fn config_for(csv_path: PathBuf, fields: &[&str], num_ids: Option<usize>) -> Config {
    Config {
        csv_path,
        base_url: BASE_URL.to_string(),
        api_token: "api-token".to_string(),
        tenant: TENANT.to_string(),
        custom_field_names: fields.iter().map(|field| field.to_string()).collect(),
        num_ids,
    }
}

pub fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[derive(Clone)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with every log line captured, returning its result and the log text.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = SharedBuffer(Arc::new(Mutex::new(Vec::new())));
    let writer = buffer.clone();
    let context = LogContext::new(vec![LogSink::Writer(BoxMakeWriter::new(move || {
        writer.clone()
    }))])
    .expect("log context");
    let output = context.in_scope(f);
    let logs = String::from_utf8(buffer.0.lock().expect("log buffer").clone()).expect("utf-8 logs");
    (output, logs)
}

/// A complete HTTP/1.1 response closing the connection after `body`.
pub fn http_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Answers one connection per entry of `responses`, in order, and hands back
/// the raw text of every request received.
pub fn serve(responses: Vec<String>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("listener bound");
    let base_url = format!("http://{}", listener.local_addr().expect("local address"));

    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for response in responses {
            let (mut stream, _) = listener.accept().expect("connection accepted");
            let mut reader = BufReader::new(stream.try_clone().expect("stream cloned"));

            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header line read");
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().expect("numeric content length");
                    }
                }
                let end_of_head = line == "\r\n" || line.is_empty();
                head.push_str(&line);
                if end_of_head {
                    break;
                }
            }

            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).expect("request body read");

            stream
                .write_all(response.as_bytes())
                .expect("response written");
            stream.flush().expect("response flushed");
            requests.push(head + &String::from_utf8_lossy(&body));
        }
        requests
    });

    (base_url, handle)
}
