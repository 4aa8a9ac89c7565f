//! Test-only transports, resolvers and fixtures.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::core::digest::md5_hex;
use crate::core::fixture::{ExpectedLog, ExpectedRequest, ExpectedRun};
use crate::core::reference::Reference;
use crate::core::types::{LogEntry, RequestEcho, RunId, RunRecord, RunRequest, RunState};
use crate::error::ResolveError;
use crate::io::resolver::Resolve;
use crate::io::transport::WesTransport;

pub const HELLO_WORKFLOW_URL: &str =
    "https://raw.githubusercontent.com/ga4gh-tech-team/wdl-hello-world/v0.1.2/Dockstore.wdl";

pub fn run_id(raw: &str) -> RunId {
    RunId::new(raw).expect("valid run id")
}

/// Transport that replays canned response bodies.
///
/// Status bodies are consumed one per probe; once exhausted, the last body is
/// repeated.
pub struct ScriptedTransport {
    create_body: Result<String, String>,
    status_bodies: RefCell<VecDeque<String>>,
    last_status: RefCell<Option<String>>,
    record_body: Option<String>,
    probes: Cell<usize>,
    record_fetches: Cell<usize>,
    forms: RefCell<Vec<Vec<(String, String)>>>,
}

impl ScriptedTransport {
    pub fn new(create_body: &str) -> Self {
        Self {
            create_body: Ok(create_body.to_string()),
            status_bodies: RefCell::new(VecDeque::new()),
            last_status: RefCell::new(None),
            record_body: None,
            probes: Cell::new(0),
            record_fetches: Cell::new(0),
            forms: RefCell::new(Vec::new()),
        }
    }

    pub fn failing_submission(reason: &str) -> Self {
        let mut transport = Self::new("");
        transport.create_body = Err(reason.to_string());
        transport
    }

    /// Status bodies for `run_id` walking through `states` in order.
    pub fn with_states(run_id: &str, states: &[RunState]) -> Self {
        let bodies = states
            .iter()
            .map(|state| status_json(run_id, *state))
            .collect();
        Self::new(&format!(r#"{{"run_id":"{run_id}"}}"#)).with_status_bodies(bodies)
    }

    pub fn with_status_bodies(self, bodies: Vec<String>) -> Self {
        *self.status_bodies.borrow_mut() = bodies.into();
        self
    }

    pub fn with_record(mut self, body: String) -> Self {
        self.record_body = Some(body);
        self
    }

    pub fn status_probes(&self) -> usize {
        self.probes.get()
    }

    pub fn record_fetches(&self) -> usize {
        self.record_fetches.get()
    }

    pub fn submitted_forms(&self) -> Vec<Vec<(String, String)>> {
        self.forms.borrow().clone()
    }
}

impl WesTransport for ScriptedTransport {
    fn create_run(&self, form: &[(&str, &str)]) -> Result<String> {
        self.forms.borrow_mut().push(
            form.iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        );
        self.create_body.clone().map_err(|reason| anyhow!(reason))
    }

    fn run_status(&self, _run_id: &RunId) -> Result<String> {
        self.probes.set(self.probes.get() + 1);
        let next = self.status_bodies.borrow_mut().pop_front();
        let mut last = self.last_status.borrow_mut();
        if let Some(body) = next {
            *last = Some(body);
        }
        last.clone()
            .ok_or_else(|| anyhow!("no scripted status body"))
    }

    fn run_record(&self, _run_id: &RunId) -> Result<String> {
        self.record_fetches.set(self.record_fetches.get() + 1);
        self.record_body
            .clone()
            .ok_or_else(|| anyhow!("no scripted run record"))
    }
}

pub fn status_json(run_id: &str, state: RunState) -> String {
    format!(r#"{{"run_id":"{run_id}","state":"{state}"}}"#)
}

/// Minimal record body with one task log and one literal output.
pub fn record_json(run_id: &str, state: &str) -> String {
    serde_json::json!({
        "run_id": run_id,
        "state": state,
        "request": {
            "workflow_type": "WDL",
            "workflow_type_version": "1.0",
            "workflow_url": HELLO_WORKFLOW_URL,
            "workflow_params": {}
        },
        "run_log": {"name": "helloWorld", "cmd": [], "exit_code": 0},
        "task_logs": [{"name": "helloWorld.sayHello.step-0", "cmd": ["echo \"hello\""], "exit_code": 0}],
        "outputs": {"helloWorld.sayHello.resultHello": "hello"}
    })
    .to_string()
}

/// Resolver backed by an in-memory map of location URLs.
///
/// Literals resolve to their own bytes; unknown locations fail like a
/// missing file.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    entries: BTreeMap<String, Vec<u8>>,
}

impl StaticResolver {
    pub fn insert(&mut self, url: &str, bytes: &[u8]) {
        self.entries.insert(url.to_string(), bytes.to_vec());
    }
}

impl Resolve for StaticResolver {
    fn resolve(&self, reference: &Reference) -> Result<Vec<u8>, ResolveError> {
        match reference {
            Reference::Literal(text) => Ok(text.as_bytes().to_vec()),
            Reference::LocalFile(url) | Reference::Remote(url) => self
                .entries
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| ResolveError::Io {
                    path: PathBuf::from(url.path()),
                    source: io::Error::new(io::ErrorKind::NotFound, "no such entry"),
                }),
        }
    }
}

pub fn hello_request() -> RunRequest {
    RunRequest {
        workflow_type: "WDL".to_string(),
        workflow_type_version: "1.0".to_string(),
        workflow_url: HELLO_WORKFLOW_URL.to_string(),
        workflow_params: "{}".to_string(),
    }
}

pub fn task_log(name: &str, cmd: &[&str], stdout: Option<&str>, stderr: Option<&str>) -> LogEntry {
    LogEntry {
        name: name.to_string(),
        cmd: cmd.iter().map(|part| part.to_string()).collect(),
        start_time: None,
        end_time: None,
        stdout: stdout.map(str::to_string),
        stderr: stderr.map(str::to_string),
        exit_code: Some(0),
    }
}

const HELLO_TASKS: [(&str, &str, &str, &[u8]); 3] = [
    ("sayHello", "echo \"hello\"", "resultHello", b"hello\n"),
    (
        "sayWorld",
        "echo \"hello -> world\"",
        "resultWorld",
        b"hello -> world\n",
    ),
    (
        "sayHelloWorld",
        "echo \"hello -> world -> hello world\"",
        "out",
        b"hello -> world -> hello world\n",
    ),
];

/// A completed three-task hello-world record plus a resolver holding its
/// artifacts. Matches [`hello_expected`].
pub fn hello_record() -> (RunRecord, StaticResolver) {
    let mut resolver = StaticResolver::default();
    let mut task_logs = Vec::new();
    let mut outputs = BTreeMap::new();
    for (task, cmd, output, stdout) in HELLO_TASKS {
        let stdout_url = format!("file:///runs/r1/{task}/stdout");
        let stderr_url = format!("file:///runs/r1/{task}/stderr");
        resolver.insert(&stdout_url, stdout);
        resolver.insert(&stderr_url, b"");
        task_logs.push(task_log(
            &format!("helloWorld.{task}.step-0"),
            &[cmd],
            Some(&stdout_url),
            Some(&stderr_url),
        ));

        let output_url = format!("file:///runs/r1/{task}/{output}.txt");
        resolver.insert(&output_url, stdout);
        outputs.insert(format!("helloWorld.{task}.{output}"), output_url.into());
    }

    let record = RunRecord {
        run_id: run_id("r1"),
        state: RunState::Complete,
        request: RequestEcho {
            workflow_type: "WDL".to_string(),
            workflow_type_version: "1.0".to_string(),
            workflow_url: HELLO_WORKFLOW_URL.to_string(),
            workflow_params: Some(serde_json::json!({})),
        },
        run_log: task_log(
            "helloWorld",
            &HELLO_TASKS.map(|(_, cmd, _, _)| cmd),
            Some("file:///runs/r1/stdout"),
            Some("file:///runs/r1/stderr"),
        ),
        task_logs,
        outputs,
    };
    (record, resolver)
}

pub fn hello_expected() -> ExpectedRun {
    let task_logs = HELLO_TASKS
        .into_iter()
        .map(|(task, cmd, _, stdout)| {
            ExpectedLog::new(&format!("helloWorld.{task}.step-0"), &[cmd], 0)
                .with_stdout_md5(&md5_hex(stdout))
                .with_stderr_md5(&md5_hex(b""))
        })
        .collect();
    let outputs = HELLO_TASKS
        .into_iter()
        .map(|(task, _, output, stdout)| (format!("helloWorld.{task}.{output}"), md5_hex(stdout)))
        .collect();
    ExpectedRun {
        request: ExpectedRequest {
            workflow_type: "WDL".to_string(),
            workflow_type_version: "1.0".to_string(),
            workflow_url: HELLO_WORKFLOW_URL.to_string(),
        },
        run_log: ExpectedLog::new(
            "helloWorld",
            &HELLO_TASKS.map(|(_, cmd, _, _)| cmd),
            0,
        ),
        task_logs,
        outputs,
    }
}
