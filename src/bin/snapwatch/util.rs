use anyhow::{anyhow, Result};
use std::io::Read;
use std::path::PathBuf;

/// Resolve a payload argument: "-" reads stdin, "@path" reads a file,
/// anything else is taken literally.
pub fn read_payload_arg(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    if let Some(p) = arg.strip_prefix('@') {
        let path = PathBuf::from(p);
        return std::fs::read_to_string(&path)
            .map_err(|e| anyhow!("read payload file {}: {}", path.display(), e));
    }
    Ok(arg.to_string())
}

/// Shorten long free text for table output.
pub fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
