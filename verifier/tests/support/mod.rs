//! In-process fake of the run-execution service for integration tests.

use std::collections::{BTreeMap, VecDeque};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tiny_http::{Method, Response, Server};

/// Scripted behavior of the fake service.
#[derive(Default)]
pub struct Script {
    /// Status code and body for `POST /runs`.
    pub create: Option<(u16, String)>,
    /// States returned by successive status probes; the last one repeats.
    pub states: VecDeque<String>,
    /// Body of `GET /runs/{id}`. `$ENDPOINT` is replaced with the server's
    /// base address so records can point at served artifacts.
    pub record: String,
    /// Raw bytes served under `/artifacts/<name>`.
    pub artifacts: BTreeMap<String, Vec<u8>>,
}

pub struct FakeWes {
    pub endpoint: String,
    pub run_id: String,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
    forms: Arc<Mutex<Vec<String>>>,
    probes: Arc<Mutex<usize>>,
}

impl FakeWes {
    pub fn start(run_id: &str, script: Script) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let server = Arc::new(Server::from_listener(listener, None).expect("server"));
        let endpoint = format!("http://{}:{}", addr.ip(), addr.port());

        let forms = Arc::new(Mutex::new(Vec::new()));
        let probes = Arc::new(Mutex::new(0usize));
        let handle = {
            let server = server.clone();
            let forms = forms.clone();
            let probes = probes.clone();
            let run_id = run_id.to_string();
            let record = script.record.replace("$ENDPOINT", &endpoint);
            let mut script = script;
            let mut last_state = String::from("QUEUED");
            thread::spawn(move || {
                let runs = "/ga4gh/wes/v1/runs".to_string();
                let status_path = format!("{runs}/{run_id}/status");
                let record_path = format!("{runs}/{run_id}");
                for mut request in server.incoming_requests() {
                    let url = request.url().to_string();
                    let (code, body) = if *request.method() == Method::Post && url == runs {
                        let mut form = String::new();
                        let _ = request.as_reader().read_to_string(&mut form);
                        forms.lock().expect("forms").push(form);
                        let (code, body) = script
                            .create
                            .clone()
                            .unwrap_or((200, format!(r#"{{"run_id":"{run_id}"}}"#)));
                        (code, body.into_bytes())
                    } else if url == status_path {
                        *probes.lock().expect("probes") += 1;
                        if let Some(state) = script.states.pop_front() {
                            last_state = state;
                        }
                        (
                            200,
                            format!(r#"{{"run_id":"{run_id}","state":"{last_state}"}}"#).into_bytes(),
                        )
                    } else if url == record_path {
                        (200, record.clone().into_bytes())
                    } else if let Some(bytes) = url
                        .strip_prefix("/artifacts/")
                        .and_then(|name| script.artifacts.get(name))
                    {
                        (200, bytes.clone())
                    } else {
                        (404, b"not found".to_vec())
                    };
                    let _ = request.respond(Response::from_data(body).with_status_code(code));
                }
            })
        };

        Self {
            endpoint,
            run_id: run_id.to_string(),
            server,
            handle: Some(handle),
            forms,
            probes,
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}/ga4gh/wes/v1", self.endpoint)
    }

    pub fn forms(&self) -> Vec<String> {
        self.forms.lock().expect("forms").clone()
    }

    pub fn probes(&self) -> usize {
        *self.probes.lock().expect("probes")
    }
}

impl Drop for FakeWes {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
