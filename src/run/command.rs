use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::LaunchError;

pub const DRIVER_ENV: &str = "STRESS_RUNNER_DRIVER";
pub const DEFAULT_PROGRAM: &str = "java";
pub const DEFAULT_JVM_PARAMS: &str = "-Xmx4g";
pub const DEFAULT_TOOL_JAR: &str = "jdbc-stress-tool-1.0-jar-with-dependencies.jar";
pub const DEFAULT_MAIN_CLASS: &str = "com.clickzetta.jdbc_stress_tool.Main";
pub const DEFAULT_DRIVER_PREFIXES: [&str; 2] = ["clickzetta-jdbc-", "clickzetta-java-"];
pub const JAVA9_OPEN_FLAG: &str = "--add-opens=java.base/java.nio=ALL-UNNAMED";

/// How the JVM hosting the worker is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JvmSettings {
    pub program: String,
    pub jvm_params: Vec<String>,
    pub java9: bool,
    pub tool_jar: PathBuf,
    pub main_class: String,
}

impl Default for JvmSettings {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_owned(),
            jvm_params: split_jvm_params(DEFAULT_JVM_PARAMS),
            java9: false,
            tool_jar: PathBuf::from(DEFAULT_TOOL_JAR),
            main_class: DEFAULT_MAIN_CLASS.to_owned(),
        }
    }
}

#[must_use]
pub fn split_jvm_params(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_owned).collect()
}

/// One worker execution as requested by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    pub name: Option<String>,
    pub config: Option<PathBuf>,
    pub sql_files: Vec<String>,
    pub repeat: u32,
    pub concurrency: u32,
    pub failure_rate: u8,
    pub prefix: Option<String>,
    /// Resolved default driver; `None` when excluded.
    pub driver_jar: Option<PathBuf>,
    pub extra_jars: Vec<PathBuf>,
}

impl LaunchRequest {
    /// # Errors
    ///
    /// Returns `NoConfigSelected` / `NoSqlSelected` when the request is
    /// missing its config file or every SQL file.
    pub fn validate(&self) -> Result<&Path, LaunchError> {
        let config = self
            .config
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(LaunchError::NoConfigSelected)?;
        if self.sql_files.iter().all(|sql| sql.trim().is_empty()) {
            return Err(LaunchError::NoSqlSelected);
        }
        Ok(config)
    }
}

/// Fully resolved program and argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerInvocation {
    pub program: String,
    pub args: Vec<OsString>,
}

impl WorkerInvocation {
    /// `<program> <jvm params> [--add-opens] -cp <tool:driver:jars> <main>
    /// -c .. -q .. -r .. -t .. -f .. -o <results> [--prefix ..]`
    ///
    /// # Errors
    ///
    /// Returns `LaunchError::NoConfigSelected`/`NoSqlSelected` for
    /// incomplete requests and `LaunchError::Classpath` when a jar path
    /// contains the platform path separator.
    pub fn build(
        jvm: &JvmSettings,
        request: &LaunchRequest,
        results: &Path,
    ) -> Result<Self, LaunchError> {
        let config = request.validate()?;
        let classpath = std::env::join_paths(
            std::iter::once(jvm.tool_jar.as_path())
                .chain(request.driver_jar.as_deref())
                .chain(request.extra_jars.iter().map(PathBuf::as_path)),
        )
        .map_err(|source| LaunchError::Classpath { source })?;

        let sql = request
            .sql_files
            .iter()
            .map(|sql| sql.trim())
            .filter(|sql| !sql.is_empty())
            .collect::<Vec<_>>()
            .join(",");

        let mut args: Vec<OsString> = jvm.jvm_params.iter().map(OsString::from).collect();
        if jvm.java9 {
            args.push(JAVA9_OPEN_FLAG.into());
        }
        args.push("-cp".into());
        args.push(classpath);
        args.push(jvm.main_class.as_str().into());
        args.push("-c".into());
        args.push(config.as_os_str().to_owned());
        args.push("-q".into());
        args.push(sql.into());
        args.push("-r".into());
        args.push(request.repeat.to_string().into());
        args.push("-t".into());
        args.push(request.concurrency.to_string().into());
        args.push("-f".into());
        args.push(request.failure_rate.to_string().into());
        args.push("-o".into());
        args.push(results.as_os_str().to_owned());
        if let Some(prefix) = request.prefix.as_deref().filter(|prefix| !prefix.is_empty()) {
            args.push("--prefix".into());
            args.push(prefix.into());
        }

        Ok(Self {
            program: jvm.program.clone(),
            args,
        })
    }

    /// Shell-style rendering for log lines.
    #[must_use]
    pub fn display(&self) -> String {
        let mut rendered = self.program.clone();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(&arg.to_string_lossy());
        }
        rendered
    }
}

/// Where to find the default JDBC driver jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSearch {
    pub env_override: Option<PathBuf>,
    pub configured: Option<PathBuf>,
    pub dir: PathBuf,
    pub prefixes: Vec<String>,
}

impl Default for DriverSearch {
    fn default() -> Self {
        Self {
            env_override: None,
            configured: None,
            dir: PathBuf::from("."),
            prefixes: DEFAULT_DRIVER_PREFIXES
                .iter()
                .map(|prefix| (*prefix).to_owned())
                .collect(),
        }
    }
}

impl DriverSearch {
    /// Picks up the driver override from the environment.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        self.env_override = std::env::var_os(DRIVER_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        self
    }

    /// Environment override, then the configured jar, then the most recently
    /// modified `<prefix>*.jar` in the search directory.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError::DriverNotFound` when nothing matches and
    /// `LaunchError::Io` when the search directory cannot be listed.
    pub fn resolve(&self) -> Result<PathBuf, LaunchError> {
        if let Some(path) = self.env_override.as_ref().or(self.configured.as_ref()) {
            return Ok(path.clone());
        }

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(LaunchError::DriverNotFound {
                    dir: self.dir.clone(),
                });
            }
            Err(source) => {
                return Err(LaunchError::Io {
                    context: "listing driver directory",
                    source,
                });
            }
        };

        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            let matches = name.ends_with(".jar")
                && self
                    .prefixes
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str()));
            if !matches {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|meta| meta.modified()) else {
                continue;
            };
            let is_newer = newest
                .as_ref()
                .is_none_or(|(best, _)| modified > *best);
            if is_newer {
                newest = Some((modified, entry.path()));
            }
        }

        newest
            .map(|(_, path)| path)
            .ok_or_else(|| LaunchError::DriverNotFound {
                dir: self.dir.clone(),
            })
    }
}
