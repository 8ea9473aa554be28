//! Environment and process details exposed to templates.
//! Everything here is captured once, when the program starts, and handed around
//! as a read-only [`Snapshot`] instead of being queried from the OS on demand.

use crate::error::{Error, Result};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variables by name.
pub type EnvMap = BTreeMap<String, String>;

/// A grab bag of facts about the running process, available as `proc` in templates.
///
/// `user`, `shell`, `term` and `path` are read from the environment and are
/// therefore also reachable through `env`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessDetails {
    pub pid: u32,
    pub ppid: u32,
    pub uid: u32,
    pub gid: u32,
    pub cwd: String,
    pub hostname: String,
    pub executable: String,
    pub temp_dir: String,
    pub user_cache_dir: String,
    pub user_config_dir: String,
    pub user_home_dir: String,
    pub user: String,
    pub shell: String,
    pub term: String,
    pub path: String,
}

/// Values available at the top level of a template.
#[derive(Debug, Serialize)]
pub struct GlobalContext<'a> {
    pub env: &'a EnvMap,
    #[serde(rename = "proc")]
    pub process: &'a ProcessDetails,
    pub debug: bool,
}

/// Environment and process details captured at start-up.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    env: EnvMap,
    process: ProcessDetails,
}

impl Snapshot {
    /// Captures the current environment and process details.
    ///
    /// # Errors
    /// * `Error::ProcessError` if the working directory, hostname, executable
    ///   path or user directories cannot be determined
    pub fn capture() -> Result<Self> {
        let env = capture_env();
        let process = capture_process(&env)?;
        debug!(
            "Captured {} environment variables for pid {}",
            env.len(),
            process.pid
        );
        Ok(Self { env, process })
    }

    /// Builds a snapshot from explicit parts.
    pub fn from_parts(env: EnvMap, process: ProcessDetails) -> Self {
        Self { env, process }
    }

    /// Wraps the snapshot for sharing with template functions.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn env(&self) -> &EnvMap {
        &self.env
    }

    pub fn process(&self) -> &ProcessDetails {
        &self.process
    }

    /// Returns the value of `name`, or `""` when it is unset.
    pub fn getenv(&self, name: &str) -> &str {
        self.lookup_env(name).unwrap_or("")
    }

    /// Returns the value of `name`, distinguishing unset from empty.
    pub fn lookup_env(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    /// Builds the top-level template context.
    pub fn global_context(&self, debug: bool) -> GlobalContext<'_> {
        GlobalContext {
            env: &self.env,
            process: &self.process,
            debug,
        }
    }
}

fn capture_env() -> EnvMap {
    std::env::vars_os()
        .map(|(name, value)| {
            (
                name.to_string_lossy().into_owned(),
                value.to_string_lossy().into_owned(),
            )
        })
        .collect()
}

fn capture_process(env: &EnvMap) -> Result<ProcessDetails> {
    let from_env = |name: &str| env.get(name).cloned().unwrap_or_default();

    Ok(ProcessDetails {
        pid: std::process::id(),
        ppid: std::os::unix::process::parent_id(),
        uid: uid(),
        gid: gid(),
        cwd: path_string(
            std::env::current_dir()
                .map_err(|e| Error::ProcessError(format!("cannot determine working directory: {e}")))?,
        ),
        hostname: hostname()?,
        executable: path_string(
            std::env::current_exe()
                .map_err(|e| Error::ProcessError(format!("cannot determine executable: {e}")))?,
        ),
        temp_dir: path_string(std::env::temp_dir()),
        user_cache_dir: path_string(required_dir(dirs::cache_dir(), "cache")?),
        user_config_dir: path_string(required_dir(dirs::config_dir(), "config")?),
        user_home_dir: path_string(required_dir(dirs::home_dir(), "home")?),
        user: from_env("USER"),
        shell: from_env("SHELL"),
        term: from_env("TERM"),
        path: from_env("PATH"),
    })
}

fn required_dir(dir: Option<PathBuf>, kind: &str) -> Result<PathBuf> {
    dir.ok_or_else(|| Error::ProcessError(format!("cannot determine user {kind} directory")))
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

fn uid() -> u32 {
    // SAFETY: getuid cannot fail and touches no memory.
    unsafe { libc::getuid() }
}

fn gid() -> u32 {
    // SAFETY: getgid cannot fail and touches no memory.
    unsafe { libc::getgid() }
}

fn hostname() -> Result<String> {
    let mut buf = [0u8; 256];
    // SAFETY: the pointer and length describe `buf`, which outlives the call.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if rc != 0 {
        return Err(Error::ProcessError(format!(
            "cannot determine hostname: {}",
            std::io::Error::last_os_error()
        )));
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}
