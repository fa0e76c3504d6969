/// Configuration for a [crate::Decoder].
#[derive(Clone, Debug, clap::Parser, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct DecoderConfig {
	/// The maximum number of released frame buffers kept for reuse.
	///
	/// Zero disables recycling; every frame then gets fresh storage.
	#[arg(
		id = "pool-capacity",
		long = "pool-capacity",
		default_value_t = 8,
		env = "FFVP8_POOL_CAPACITY"
	)]
	pub pool_capacity: usize,

	/// Refuse to allocate storage for frames with more pixels than this.
	///
	/// Such frames fail to decode instead of exhausting memory.
	#[serde(skip_serializing_if = "Option::is_none")]
	#[arg(id = "max-pixels", long = "max-pixels", env = "FFVP8_MAX_PIXELS")]
	pub max_pixels: Option<u64>,

	/// Skip the in-loop deblocking filter, trading quality for speed.
	#[arg(
		id = "skip-loop-filter",
		long = "skip-loop-filter",
		env = "FFVP8_SKIP_LOOP_FILTER"
	)]
	pub skip_loop_filter: bool,
}

impl Default for DecoderConfig {
	fn default() -> Self {
		Self {
			pool_capacity: 8,
			max_pixels: None,
			skip_loop_filter: false,
		}
	}
}
