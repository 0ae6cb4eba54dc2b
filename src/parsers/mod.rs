pub mod coverage_py;
pub mod llvm_cov;

use std::io::BufRead;
use std::path::Path;

use crate::detect::{detect_format, Format};
use crate::error::{FuzzcovError, Result};
use crate::model::CoverageProfile;

/// Every report format parser implements this trait.
pub trait CoverageParser {
    /// The format this parser handles.
    fn format(&self) -> Format;

    /// Whether this parser can handle the given file, based on its path
    /// and the first few KB of content.
    fn can_parse(&self, path: &Path, content: &[u8]) -> bool;

    /// Fold one report read from `reader` into `profile`.
    fn parse_into(&self, reader: &mut dyn BufRead, profile: &mut CoverageProfile) -> Result<()>;
}

/// The parser for a given format.
pub fn parser_for(format: Format) -> &'static dyn CoverageParser {
    match format {
        Format::LlvmCov => &llvm_cov::LlvmCovParser,
        Format::CoveragePy => &coverage_py::CoveragePyParser,
    }
}

/// Parse one report file, either in the given format or in the one detected
/// from its name and content.
pub fn parse_file(path: &Path, format_override: Option<&str>) -> Result<(Format, CoverageProfile)> {
    let content = std::fs::read(path)?;

    let format = if let Some(fmt_str) = format_override {
        fmt_str.parse::<Format>()?
    } else {
        detect_format(path, &content).ok_or(FuzzcovError::UnknownFormat)?
    };

    let mut profile = CoverageProfile::new();
    parser_for(format).parse_into(&mut content.as_slice(), &mut profile)?;
    profile.add_source_report(path);
    Ok((format, profile))
}

/// Lossy view of the first 4 KB of `content`, for format sniffing.
pub(crate) fn sniff_head(content: &[u8]) -> std::borrow::Cow<'_, str> {
    let head_len = content.len().min(4096);
    String::from_utf8_lossy(&content[..head_len])
}

/// Parse a count as printed by `llvm-cov show`, where large values are
/// abbreviated (`1.2k`, `5.99M`).
///
/// The expansion is textual, not numeric: `k` becomes `00`, `M` becomes
/// `0000`, and every `.` is dropped. So `1.2k` is `1200` and `5.99M` is
/// `5990000`, while `12k` is `1200`. Returns `None` if what is left is not
/// an integer.
pub fn parse_scaled_count(token: &str) -> Option<u64> {
    let digits = token
        .trim()
        .replace('k', "00")
        .replace('M', "0000")
        .replace('.', "");
    digits.parse().ok()
}
