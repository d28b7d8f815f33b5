#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tiny_http::{Header, Response, Server};
use url::Url;

/// One request as seen by the fake upstream.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("recorded body is json")
    }
}

pub type Responder = dyn Fn(&Recorded) -> (u16, String) + Send + Sync;

/// Blocking HTTP server on a background thread that records every request
/// and answers through `responder`.
pub struct FakeUpstream {
    pub base: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeUpstream {
    pub fn start(responder: impl Fn(&Recorded) -> (u16, String) + Send + Sync + 'static) -> Self {
        let server = Server::http("127.0.0.1:0").expect("http server");
        let base = format!("http://{}", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        let responder: Box<Responder> = Box::new(responder);
        thread::spawn(move || {
            for mut request in server.incoming_requests() {
                let url = Url::parse(&format!("http://upstream{}", request.url()))
                    .expect("request url");
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let recorded = Recorded {
                    method: request.method().as_str().to_uppercase(),
                    path: url.path().to_string(),
                    query: url.query_pairs().into_owned().collect(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|header| {
                            (
                                header.field.as_str().as_str().to_ascii_lowercase(),
                                header.value.as_str().to_string(),
                            )
                        })
                        .collect(),
                    body,
                };
                let (status, payload) = responder(&recorded);
                log.lock().push(recorded);
                let response = Response::from_string(payload)
                    .with_status_code(status)
                    .with_header(
                        Header::from_bytes("content-type", "application/json")
                            .expect("content-type header"),
                    );
                let _ = request.respond(response);
            }
        });
        Self { base, requests }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}
