// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shell scripts that stand in for the optimizer binary in tests.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

fn install(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path.display().to_string()
}

/// Copies the input (last argument) to the `-sOutputFile=` target.
pub(crate) fn succeeding_tool(dir: &Path) -> String {
    install(
        dir,
        "fake-gs-ok",
        r#"out=""
for arg in "$@"; do
  case "$arg" in
    -sOutputFile=*) out="${arg#-sOutputFile=}" ;;
  esac
  last="$arg"
done
cp "$last" "$out""#,
    )
}

/// Prints to stderr and exits with status 3.
pub(crate) fn failing_tool(dir: &Path) -> String {
    install(dir, "fake-gs-fail", "echo boom >&2\nexit 3")
}

/// Exits 0 after writing something that is not a PDF.
pub(crate) fn garbage_tool(dir: &Path) -> String {
    install(
        dir,
        "fake-gs-garbage",
        r#"for arg in "$@"; do
  case "$arg" in
    -sOutputFile=*) printf 'not a pdf' > "${arg#-sOutputFile=}" ;;
  esac
done"#,
    )
}

/// Like [`succeeding_tool`], but sleeps for a second first.
pub(crate) fn slow_tool(dir: &Path) -> String {
    install(
        dir,
        "fake-gs-slow",
        r#"out=""
for arg in "$@"; do
  case "$arg" in
    -sOutputFile=*) out="${arg#-sOutputFile=}" ;;
  esac
  last="$arg"
done
sleep 1
cp "$last" "$out""#,
    )
}
