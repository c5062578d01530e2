use std::io::Write as _;

use crate::connection::ConnectionParams;
use crate::error::{LoaderError, Result};
use crate::template::{self, TemplateBindings};

/// Preamble prepended to every script so notice-level server chatter does not
/// pollute the captured output.
const SAFETY_DIRECTIVE: &str = "set client_min_messages=ERROR;\n";

/// Name shown in the log banner when the SQL source is literal text.
const INLINE_SOURCE: &str = "<inline>";

/// Loads SQL scripts into a PostGIS database by piping them into an external
/// command-line client (`psql` by default).
///
/// The SQL source is a single string resolved lazily: if it names an existing
/// file at `load()` time, that file's current contents are executed; otherwise
/// the string itself is the SQL text.
#[derive(Debug)]
pub struct SqlLoader {
    params: ConnectionParams,
    sql: String,
    bindings: TemplateBindings,
    logfile: Option<std::path::PathBuf>,
    client: std::path::PathBuf,
}

impl SqlLoader {
    /// Create a loader for the given connection descriptor and SQL source.
    ///
    /// The descriptor is parsed immediately; see [`ConnectionParams::parse`].
    /// `bindings` become the loader's default template bindings and `logfile`,
    /// when set, captures the client's stdout and stderr in append mode.
    pub fn new(
        descriptor: &str,
        sql: impl Into<String>,
        bindings: TemplateBindings,
        logfile: Option<std::path::PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            params: ConnectionParams::parse(descriptor)?,
            sql: sql.into(),
            bindings,
            logfile,
            client: std::path::PathBuf::from("psql"),
        })
    }

    /// Override the client executable (absolute path or PATH-resolved name).
    pub fn set_client(&mut self, client: impl Into<std::path::PathBuf>) {
        self.client = client.into();
    }

    /// Point the SQL source at a file. No I/O happens until `load()`.
    pub fn set_sql_file(&mut self, path: impl AsRef<std::path::Path>) {
        self.sql = path.as_ref().to_string_lossy().into_owned();
    }

    /// Replace the SQL source with literal text.
    pub fn set_sql(&mut self, sql: impl Into<String>) {
        self.sql = sql.into();
    }

    /// Replace the default template bindings.
    pub fn set_bindings(&mut self, bindings: TemplateBindings) {
        self.bindings = bindings;
    }

    /// Fill `template` from the stored bindings and keep the result as the
    /// literal SQL source. Unbound placeholders are an error; unused bindings
    /// are silently ignored.
    pub fn set_from_template(&mut self, template: &str) -> Result<()> {
        self.sql = template::fill_template(template, &self.bindings)?;
        Ok(())
    }

    /// Re-parse a new connection descriptor. On failure the existing
    /// parameters are left untouched.
    pub fn set_connection_params(&mut self, descriptor: &str) -> Result<()> {
        self.params = ConnectionParams::parse(descriptor)?;
        Ok(())
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Execute the SQL source against the database.
    ///
    /// Spawns one client process, pipes the safety directive plus the resolved
    /// SQL into its stdin, and waits for it to exit. Returns `Ok(true)` iff
    /// the client exited with code 0; launch failures and non-zero exits are
    /// diagnosed via `tracing` and yield `Ok(false)` so a batch of scripts can
    /// continue. Only setup problems (unreadable SQL file, unopenable log
    /// file) surface as `Err`.
    pub fn load(&self) -> Result<bool> {
        let path = std::path::Path::new(&self.sql);
        let (source_name, sql) = if path.is_file() {
            let text = std::fs::read_to_string(path).map_err(|e| {
                tracing::error!("could not read SQL file {}: {}", path.display(), e);
                LoaderError::SqlReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.sql.clone());
            (name, text)
        } else {
            (INLINE_SOURCE.to_string(), self.sql.clone())
        };

        let args = self.params.to_args();

        let mut log = match &self.logfile {
            Some(logfile) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(logfile)
                    .map_err(|e| {
                        tracing::error!(
                            "could not open log file {} for append: {}",
                            logfile.display(),
                            e
                        );
                        LoaderError::LogOpenFailed {
                            path: logfile.clone(),
                            source: e,
                        }
                    })?;
                LogTarget::File(file)
            }
            None => LogTarget::Inherit,
        };

        log.write_line(&format!("======= Executing SQL {}", source_name));

        let mut command = std::process::Command::new(&self.client);
        command.args(&args).stdin(std::process::Stdio::piped());
        match &log {
            LogTarget::File(file) => {
                let out = log_stdio(file, self.logfile.as_deref())?;
                let err = log_stdio(file, self.logfile.as_deref())?;
                command.stdout(out).stderr(err);
            }
            LogTarget::Inherit => {
                command
                    .stdout(std::process::Stdio::inherit())
                    .stderr(std::process::Stdio::inherit());
            }
        }

        let rendered = std::iter::once(self.client.display().to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("error calling {}: {}", rendered, e);
                log.write_line("");
                return Ok(false);
            }
        };

        // transient buffer: the stored source is never mutated, so repeated
        // load() calls do not stack directives
        let text = format!("{}{}", SAFETY_DIRECTIVE, sql);
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                // a child that exits early closes the pipe; the exit status
                // below is the authoritative outcome
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    tracing::error!("error writing SQL to {}: {}", rendered, e);
                }
            }
        }

        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => {
                tracing::error!("error waiting for {}: {}", rendered, e);
                log.write_line("");
                return Ok(false);
            }
        };

        log.write_line("");

        if status.success() {
            Ok(true)
        } else {
            tracing::error!("{} exited with {} while executing {}", rendered, status, source_name);
            Ok(false)
        }
    }
}

/// Where the client's output (and the loader's banner lines) go.
#[derive(Debug)]
enum LogTarget {
    Inherit,
    File(std::fs::File),
}

impl LogTarget {
    fn write_line(&mut self, line: &str) {
        match self {
            LogTarget::Inherit => {
                let _ = writeln!(std::io::stdout(), "{}", line);
            }
            LogTarget::File(file) => {
                let _ = writeln!(file, "{}", line);
                let _ = file.flush();
            }
        }
    }
}

fn log_stdio(
    file: &std::fs::File,
    path: Option<&std::path::Path>,
) -> Result<std::process::Stdio> {
    let clone = file.try_clone().map_err(|e| LoaderError::LogOpenFailed {
        path: path.unwrap_or(std::path::Path::new("")).to_path_buf(),
        source: e,
    })?;
    Ok(std::process::Stdio::from(clone))
}
