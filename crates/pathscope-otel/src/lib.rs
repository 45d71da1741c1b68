use once_cell::sync::OnceCell;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Minutely,
    Hourly,
    Daily,
}

impl Rotation {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "hourly" => Rotation::Hourly,
            "minutely" => Rotation::Minutely,
            _ => Rotation::Daily,
        }
    }
}

/// Rolling file log settings taken from `PATHSCOPE_LOG_*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLog {
    pub dir: String,
    pub prefix: String,
    pub rotation: Rotation,
}

impl FileLog {
    /// `None` unless `PATHSCOPE_LOG_ROLL=1`.
    pub fn from_env() -> Option<Self> {
        if std::env::var("PATHSCOPE_LOG_ROLL").ok().as_deref() != Some("1") {
            return None;
        }
        let dir = std::env::var("PATHSCOPE_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
        let prefix =
            std::env::var("PATHSCOPE_LOG_PREFIX").unwrap_or_else(|_| "pathscope".into());
        let rotation = std::env::var("PATHSCOPE_LOG_ROTATION")
            .map(|r| Rotation::parse(&r))
            .unwrap_or(Rotation::Daily);
        Some(Self {
            dir,
            prefix,
            rotation,
        })
    }
}

/// Installs the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(fmt_layer.with_filter(filter));
    match FileLog::from_env() {
        Some(file) => {
            if std::fs::create_dir_all(&file.dir).is_err() {
                tracing::warn!(directory = %file.dir, "failed to create log directory");
            }
            let writer = match file.rotation {
                Rotation::Hourly => tracing_appender::rolling::hourly(&file.dir, &file.prefix),
                Rotation::Minutely => tracing_appender::rolling::minutely(&file.dir, &file.prefix),
                Rotation::Daily => tracing_appender::rolling::daily(&file.dir, &file.prefix),
            };
            let (nb, guard) = tracing_appender::non_blocking(writer);
            let _ = FILE_GUARD.set(guard);
            let targets = Targets::new().with_target("pathscope", tracing::Level::DEBUG);
            let file_layer = fmt::layer()
                .with_ansi(false)
                .with_writer(nb)
                .with_filter(targets);
            let _ = registry.with(file_layer).try_init();
        }
        None => {
            let _ = registry.try_init();
        }
    }
}
