mod common;

use frag_core::AnyEmptyResult;
use serde_json::Value;

#[test]
fn build_lists_patterns() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pattern(tmp.path(), "00-atoms/button.jinja", "<button></button>")?;
	common::write_pattern(
		tmp.path(),
		"01-molecules/card.jinja",
		r#"<div>{% include "atoms-button" %}</div>"#,
	)?;

	let mut cmd = common::frag_cmd();
	let _ = cmd
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("atoms-button"))
		.stdout(predicates::str::contains("molecules-card"))
		.stdout(predicates::str::contains("Built 2 pattern(s)"));

	Ok(())
}

#[test]
fn build_reports_unresolved_partials_as_warnings() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pattern(
		tmp.path(),
		"01-molecules/card.jinja",
		r#"<div>{% include "atoms-nope" %}</div>"#,
	)?;

	let mut cmd = common::frag_cmd();
	let _ = cmd
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("warning: 01-molecules/card.jinja"))
		.stdout(predicates::str::contains(
			"could not find pattern with partial `atoms-nope`",
		));

	Ok(())
}

#[test]
fn build_strict_fails_on_diagnostics() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pattern(
		tmp.path(),
		"01-molecules/card.jinja",
		r#"<div>{% include "atoms-nope" %}</div>"#,
	)?;

	let mut cmd = common::frag_cmd();
	let _ = cmd
		.arg("build")
		.arg("--strict")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout(predicates::str::contains("error: 01-molecules/card.jinja"));

	Ok(())
}

#[test]
fn build_json_output() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_pattern(tmp.path(), "00-atoms/button.jinja", "<button></button>")?;
	common::write_pattern(
		tmp.path(),
		"01-molecules/card.jinja",
		r#"<div>{% include "atoms-button" %}</div>"#,
	)?;

	let mut cmd = common::frag_cmd();
	let output = cmd
		.arg("build")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.output()?;
	assert!(output.status.success());

	let json: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["ok"], Value::Bool(true));
	assert_eq!(json["patterns"].as_array().map(Vec::len), Some(2));
	assert_eq!(json["patterns"][1]["patternPartial"], "molecules-card");
	assert_eq!(
		json["patterns"][1]["extendedTemplate"],
		"<div><button></button></div>"
	);
	assert_eq!(
		json["links"]["atoms-button"],
		"/patterns/00-atoms-button/00-atoms-button.html"
	);
	assert_eq!(json["diagnostics"].as_array().map(Vec::len), Some(0));

	Ok(())
}

#[test]
fn missing_subcommand_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	let mut cmd = common::frag_cmd();
	let _ = cmd
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("No subcommand specified"));

	Ok(())
}

#[test]
fn invalid_config_is_reported() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("frag.toml"), "[paths\n")?;

	let mut cmd = common::frag_cmd();
	let _ = cmd
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("frag::config_parse"));

	Ok(())
}
