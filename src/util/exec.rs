use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use wait_timeout::ChildExt;

/// Interval at which a running child is checked against the interrupt flag.
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Structured command execution with a bounded timeout.
///
/// Programs are spawned directly with an argv vector; no shell is involved, so prompt text and
/// paths are never subject to word splitting or expansion. Each child leads its own process
/// group so a timeout or interruption takes down anything it spawned as well.
#[derive(Debug, Clone)]
pub struct ExecService {
    timeout: Duration,
}

impl ExecService {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn run(&self, request: ExecRequest) -> Result<ExecOutput> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args);
        cmd.process_group(0);

        if !request.inherit_env {
            cmd.env_clear();
        }

        cmd.stdin(if request.input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        if request.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = cmd.spawn().with_context(|| {
            format!(
                "failed to spawn {:?} ({} args)",
                request.program,
                request.args.len()
            )
        })?;

        // Feed stdin and drain both pipes on helper threads; a child producing more than a pipe
        // buffer of output would otherwise block forever while we wait on it.
        let stdin_writer = match (child.stdin.take(), request.input) {
            (Some(mut stdin), Some(input)) => Some(thread::spawn(move || -> io::Result<()> {
                let res = stdin.write_all(&input);
                drop(stdin);
                match res {
                    // The child may legitimately exit without reading all input.
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                }
            })),
            _ => None,
        };
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let started = Instant::now();
        // On timeout or interruption the helper threads are left detached: a descendant that
        // escaped the group kill may still hold the pipes open.
        let status = wait_with_deadline(&mut child, self.timeout, &request.program)?;
        let duration = started.elapsed();

        if let Some(h) = stdin_writer {
            h.join()
                .map_err(|_| anyhow!("stdin writer thread panicked"))?
                .context("failed to write process input")?;
        }
        let stdout = join_reader(stdout_reader)?;
        let stderr = join_reader(stderr_reader)?;

        Ok(ExecOutput {
            status,
            duration,
            stdout,
            stderr,
        })
    }
}

/// SIGKILL the child's process group, then reap the child itself.
fn kill_group(child: &mut Child) {
    if killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL).is_err() {
        let _ = child.kill();
    }
    let _ = child.wait();
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    program: &OsString,
) -> Result<std::process::ExitStatus> {
    let started = Instant::now();
    loop {
        if crate::signals::interrupted() {
            kill_group(child);
            return Err(anyhow!("command {:?} interrupted by signal", program));
        }
        let slice = if timeout.is_zero() {
            POLL_SLICE
        } else {
            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                kill_group(child);
                return Err(anyhow!("command {:?} timed out after {:?}", program, timeout));
            }
            remaining.min(POLL_SLICE)
        };
        if let Some(status) = child
            .wait_timeout(slice)
            .context("failed to wait with timeout")?
        {
            return Ok(status);
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<io::Result<String>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

fn join_reader(handle: Option<JoinHandle<io::Result<String>>>) -> Result<String> {
    match handle {
        Some(h) => h
            .join()
            .map_err(|_| anyhow!("output reader thread panicked"))?
            .context("failed to read process output"),
        None => Ok(String::new()),
    }
}

#[derive(Debug, Default)]
pub struct ExecRequest {
    program: OsString,
    args: Vec<OsString>,
    inherit_env: bool,
    capture_output: bool,
    input: Option<Vec<u8>>,
}

impl ExecRequest {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            inherit_env: false,
            ..Self::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    pub fn capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    /// Bytes written to the child's stdin, which is closed afterwards.
    pub fn input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }
}

#[derive(Debug)]
pub struct ExecOutput {
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}
