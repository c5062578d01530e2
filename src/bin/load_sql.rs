use anyhow::Context;
use clap::Parser;

use psql_loader::loader::SqlLoader;
use psql_loader::logging;
use psql_loader::template::TemplateBindings;

/// Command-line tool to load SQL scripts into a PostGIS database via psql.
#[derive(clap::Parser, Debug)]
#[command(author, version, about)]
struct Opt {
    /// Connection descriptor, e.g. "dbname='routing' host='localhost' port='5432' user='postgres'".
    #[arg(long, env = "DB_STRING")]
    dbstring: String,

    /// SQL script files to load, in order.
    #[arg(required = true)]
    sql_files: Vec<std::path::PathBuf>,

    /// Template binding, repeatable: --set srid=2154 --set schema=gis.
    /// Every %key% in a template is replaced by its value.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_binding)]
    bindings: Vec<(String, String)>,

    /// Treat each script as a template and fill %key% placeholders before loading.
    #[arg(long)]
    template: bool,

    /// File capturing psql output in append mode (default: inherit stdout/stderr).
    #[arg(long, env = "SQL_LOG")]
    sql_log: Option<std::path::PathBuf>,

    /// psql executable (default: discovered on PATH).
    #[arg(long, env = "PSQL")]
    psql: Option<std::path::PathBuf>,

    /// Path to log file (default: logs/loader.log).
    #[arg(long, env = "LOG_FILE")]
    log_file: Option<std::path::PathBuf>,
}

fn parse_binding(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("binding {s:?} is not KEY=VALUE"))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let opt = Opt::parse();
    let _guard = logging::setup_logging(opt.log_file.as_deref())?;

    let psql = match &opt.psql {
        Some(path) => path.clone(),
        None => which::which("psql").context(
            "psql executable not found in PATH. \
             Please ensure PostgreSQL client tools are installed, or pass --psql.",
        )?,
    };

    tracing::info!("{}", "=".repeat(50));
    tracing::info!("🚀 Loading {} SQL script(s)", opt.sql_files.len());
    tracing::info!("🔗 Database: {}", opt.dbstring);
    tracing::info!("🐘 Client: {}", psql.display());
    if let Some(sql_log) = &opt.sql_log {
        tracing::info!("📝 SQL output: {}", sql_log.display());
    }
    tracing::info!("{}", "=".repeat(50));

    let bindings: TemplateBindings = opt.bindings.iter().cloned().collect();
    let mut loader = SqlLoader::new(&opt.dbstring, "", bindings, opt.sql_log.clone())
        .context("invalid connection descriptor")?;
    loader.set_client(&psql);

    let mut failed = 0usize;
    for sql_file in &opt.sql_files {
        tracing::info!("📄 Loading {}", sql_file.display());
        if opt.template {
            let text = std::fs::read_to_string(sql_file)
                .with_context(|| format!("could not read template {}", sql_file.display()))?;
            loader
                .set_from_template(&text)
                .with_context(|| format!("could not fill template {}", sql_file.display()))?;
        } else {
            loader.set_sql_file(sql_file);
        }

        match loader.load() {
            Ok(true) => tracing::info!("✅ Loaded {}", sql_file.display()),
            Ok(false) => {
                tracing::error!("❌ Failed to load {}", sql_file.display());
                failed += 1;
            }
            Err(e) => {
                tracing::error!("❌ Failed to load {}: {}", sql_file.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} script(s) failed", failed, opt.sql_files.len());
    }
    tracing::info!("✅ All scripts loaded successfully!");
    Ok(())
}
