//! Session selection and run allocation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, TimeDelta, Timelike};
use regex::Regex;

use super::record::{read_record, RunHandle};
use crate::models::{BrainstormResults, RunRecord, RunSummary, SessionSummary};
use crate::persist;

const SESSION_PREFIX: &str = "mflux_output_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const COUNTER_FILE: &str = "run_counter";
const SUMMARY_FILE: &str = "session.json";
const BRAINSTORM_FILE: &str = "brainstorm_results.json";

static SESSION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^mflux_output_(\d{8}_\d{6})$").expect("valid session regex"));
static RUN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^run_(\d+)$").expect("valid run regex"));

/// Directory name for a session created at `created_at`.
pub fn session_name(created_at: NaiveDateTime) -> String {
    format!("{SESSION_PREFIX}{}", created_at.format(TIMESTAMP_FORMAT))
}

/// Timestamp embedded in a session directory name, if it is one.
pub fn parse_session_name(name: &str) -> Option<NaiveDateTime> {
    let caps = SESSION_NAME.captures(name)?;
    NaiveDateTime::parse_from_str(&caps[1], TIMESTAMP_FORMAT).ok()
}

/// Run id of a `run_<n>` directory name, if it is one.
pub fn parse_run_name(name: &str) -> Option<u32> {
    let caps = RUN_NAME.captures(name)?;
    caps[1].parse().ok().filter(|id| *id > 0)
}

/// Finds or plans sessions under one base directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    base: PathBuf,
    timeout: TimeDelta,
}

impl SessionStore {
    pub fn new(base: impl Into<PathBuf>, timeout: TimeDelta) -> Self {
        Self {
            base: base.into(),
            timeout,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Every session directory with a parseable name, oldest first.
    pub fn sessions(&self) -> Vec<Session> {
        let Ok(entries) = fs::read_dir(&self.base) else {
            return Vec::new();
        };

        let mut sessions: Vec<Session> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|entry| {
                let name = entry.file_name();
                let name = name.to_str()?;
                match parse_session_name(name) {
                    Some(created_at) => Some(Session::new(entry.path(), created_at)),
                    None => {
                        if name.starts_with(SESSION_PREFIX) {
                            tracing::debug!(name, "skipping malformed session directory");
                        }
                        None
                    }
                }
            })
            .collect();

        sessions.sort_by_key(Session::created_at);
        sessions
    }

    /// The session closest to `now` that is still inside the timeout window.
    pub fn find_reusable(&self, now: NaiveDateTime) -> Option<Session> {
        self.sessions()
            .into_iter()
            .filter_map(|session| {
                let delta = (now - session.created_at).abs();
                (delta < self.timeout).then_some((delta, session))
            })
            .min_by(|(da, a), (db, b)| da.cmp(db).then_with(|| b.created_at.cmp(&a.created_at)))
            .map(|(_, session)| session)
    }

    /// Pick the session for this invocation without touching disk.
    ///
    /// A planned new session does not exist until [`Session::ensure_created`]
    /// or [`Session::allocate_run`] is called.
    pub fn resolve(&self, force_new: bool, now: NaiveDateTime) -> Session {
        if !force_new {
            if let Some(session) = self.find_reusable(now) {
                tracing::debug!(session = %session.name(), "reusing session");
                return session;
            }
        }

        // A forced new session in the same second as an existing one moves
        // to the next free second.
        let mut created_at = now.with_nanosecond(0).unwrap_or(now);
        while self.base.join(session_name(created_at)).exists() {
            created_at += TimeDelta::seconds(1);
        }
        let session = Session::new(self.base.join(session_name(created_at)), created_at);
        tracing::debug!(session = %session.name(), force_new, "planning new session");
        session
    }

    /// The session a gallery or server command should act on.
    pub fn current(&self, now: NaiveDateTime) -> Option<Session> {
        self.find_reusable(now)
            .or_else(|| self.sessions().into_iter().next_back())
    }
}

/// A session directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    root: PathBuf,
    created_at: NaiveDateTime,
}

impl Session {
    fn new(root: PathBuf, created_at: NaiveDateTime) -> Self {
        Self { root, created_at }
    }

    /// Open an existing directory as a session. Its name must carry a timestamp.
    pub fn open(root: impl Into<PathBuf>) -> Option<Self> {
        let root = root.into();
        let created_at = parse_session_name(root.file_name()?.to_str()?)?;
        root.is_dir().then(|| Self::new(root, created_at))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> String {
        session_name(self.created_at)
    }

    pub const fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn ensure_created(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create session directory {}", self.root.display()))
    }

    fn counter_path(&self) -> PathBuf {
        self.root.join(COUNTER_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join(SUMMARY_FILE)
    }

    pub fn run_dir(&self, id: u32) -> PathBuf {
        self.root.join(format!("run_{id}"))
    }

    /// Last allocated run id according to the counter file.
    pub fn read_counter(&self) -> Option<u32> {
        let path = self.counter_path();
        let content = fs::read_to_string(&path).ok()?;
        let parsed = content.trim().parse().ok();
        if parsed.is_none() {
            tracing::warn!(path = %path.display(), "corrupt run counter, ignoring");
        }
        parsed
    }

    /// Ids of existing `run_<n>` directories, ascending.
    pub fn run_ids(&self) -> Vec<u32> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut ids: Vec<u32> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|entry| parse_run_name(entry.file_name().to_str()?))
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Claim the next run directory and persist the counter.
    ///
    /// The next id is one past the larger of the counter and the highest
    /// existing run directory, so a lost or stale counter never reuses an id.
    pub fn allocate_run(&self) -> Result<RunHandle> {
        self.ensure_created()?;

        let counter = match self.read_counter() {
            Some(u32::MAX) => {
                tracing::warn!(session = %self.name(), "run counter cannot advance, ignoring it");
                0
            }
            counter => counter.unwrap_or(0),
        };
        let highest = self.run_ids().last().copied().unwrap_or(0);
        if counter < highest {
            tracing::warn!(
                session = %self.name(),
                counter,
                highest,
                "run counter behind existing runs, continuing after highest"
            );
        }

        let mut id = next_run_id(counter.max(highest))?;
        let dir = loop {
            let dir = self.run_dir(id);
            match fs::create_dir(&dir) {
                Ok(()) => break dir,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => id = next_run_id(id)?,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to create run directory {}", dir.display())
                    })
                }
            }
        };

        persist::write_atomic(&self.counter_path(), id.to_string().as_bytes())?;
        tracing::info!(session = %self.name(), run = id, "allocated run");
        Ok(RunHandle::new(id, dir))
    }

    /// Every readable run record, ordered by run id.
    pub fn records(&self) -> Vec<(u32, RunRecord)> {
        self.run_ids()
            .into_iter()
            .filter_map(|id| read_record(&self.run_dir(id)).map(|record| (id, record)))
            .collect()
    }

    /// The highest-numbered run whose record can be read.
    pub fn latest_record(&self) -> Option<(u32, RunRecord)> {
        self.run_ids()
            .into_iter()
            .rev()
            .find_map(|id| read_record(&self.run_dir(id)).map(|record| (id, record)))
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            name: self.name(),
            created_at: self.created_at,
            runs: self
                .records()
                .iter()
                .map(|(id, record)| RunSummary::from_record(*id, record))
                .collect(),
        }
    }

    /// Rewrite `session.json` from the run records on disk.
    pub fn write_summary(&self) -> Result<SessionSummary> {
        let summary = self.summary();
        persist::write_json(&self.summary_path(), &summary)?;
        Ok(summary)
    }

    pub fn brainstorm_path(&self) -> PathBuf {
        self.root.join(BRAINSTORM_FILE)
    }

    /// Prompts from the last brainstorm in this session.
    pub fn brainstorm(&self) -> Option<BrainstormResults> {
        persist::read_json(&self.brainstorm_path())
    }

    /// Replace the stored brainstorm, creating the session if needed.
    pub fn write_brainstorm(&self, results: &BrainstormResults) -> Result<()> {
        self.ensure_created()?;
        persist::write_json(&self.brainstorm_path(), results)
    }
}

fn next_run_id(after: u32) -> Result<u32> {
    after
        .checked_add(1)
        .with_context(|| format!("No run id left after run_{after}"))
}
