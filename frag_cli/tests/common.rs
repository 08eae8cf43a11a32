use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn frag_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("frag"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

/// Write `content` below the default pattern directory of `root`.
pub fn write_pattern(root: &Path, rel_path: &str, content: &str) -> std::io::Result<()> {
	let path = root.join("source/_patterns").join(rel_path);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)
}
