/// Shared execution classes used for worker scheduling and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Single-writer coordination work (actor loops, timers).
	Foreground,
	/// Background async work that can be delayed or superseded.
	Background,
	/// CPU-intensive blocking work such as artifact generation.
	CpuBlocking,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Foreground => "foreground",
			Self::Background => "background",
			Self::CpuBlocking => "cpu_blocking",
		}
	}
}
