use ffmpeg_next as ffmpeg;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Logging configuration, shared by the Rust subscriber and FFmpeg's own `av_log`.
#[derive(Clone, Debug, clap::Args)]
pub struct Log {
	/// The minimum level to log; `RUST_LOG` directives refine it further.
	#[arg(id = "log-level", long = "log-level", default_value = "info", env = "FFVP8_LOG_LEVEL")]
	pub level: Level,
}

impl Default for Log {
	fn default() -> Self {
		Self { level: Level::INFO }
	}
}

impl Log {
	/// Install a global fmt subscriber and align FFmpeg's log level with it.
	///
	/// Calling this more than once is harmless; only the first subscriber sticks.
	pub fn init(&self) {
		let filter = EnvFilter::builder()
			.with_default_directive(LevelFilter::from_level(self.level).into())
			.from_env_lossy();

		let res = tracing_subscriber::fmt()
			.with_writer(std::io::stderr)
			.with_env_filter(filter)
			.try_init();

		if res.is_err() {
			tracing::debug!("subscriber already installed");
		}

		ffmpeg::log::set_level(ffmpeg_level(self.level));
	}
}

fn ffmpeg_level(level: Level) -> ffmpeg::log::Level {
	if level == Level::ERROR {
		ffmpeg::log::Level::Error
	} else if level == Level::WARN {
		ffmpeg::log::Level::Warning
	} else if level == Level::INFO {
		ffmpeg::log::Level::Info
	} else if level == Level::DEBUG {
		ffmpeg::log::Level::Debug
	} else {
		ffmpeg::log::Level::Trace
	}
}
