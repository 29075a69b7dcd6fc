/// Character encoding tagged onto generated text.
///
/// Consumers that apply byte-accurate edits to the generated text need to know
/// exactly how it is encoded, so the encoding is always explicit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextEncoding {
	/// UTF-8 without a byte order mark.
	#[default]
	Utf8,
	/// UTF-8 prefixed with the `EF BB BF` byte order mark.
	Utf8WithBom,
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

impl TextEncoding {
	/// Canonical encoding name.
	pub const fn name(self) -> &'static str {
		match self {
			Self::Utf8 | Self::Utf8WithBom => "utf-8",
		}
	}

	/// Byte preamble written before the encoded text.
	pub const fn preamble(self) -> &'static [u8] {
		match self {
			Self::Utf8 => &[],
			Self::Utf8WithBom => UTF8_BOM,
		}
	}

	/// Encodes `text`, including the preamble.
	pub fn encode(self, text: &str) -> Vec<u8> {
		let preamble = self.preamble();
		let mut out = Vec::with_capacity(preamble.len() + text.len());
		out.extend_from_slice(preamble);
		out.extend_from_slice(text.as_bytes());
		out
	}
}
