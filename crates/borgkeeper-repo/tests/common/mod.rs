//! Common test helpers for borgkeeper-repo integration tests
//!
//! Mock executables stand in for `borg` and `ssh-keygen`. Each script logs
//! its arguments (one invocation per line) next to itself so tests can assert
//! on the exact command lines.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Write an executable shell script and return its path
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    path
}

/// Mock `borg` that answers per subcommand
///
/// `cases` maps a subcommand to `(stdout, stderr, exit code)`; unknown
/// subcommands succeed silently. Every call appends `$*` to `borg.log`, the
/// relevant environment to `borg.env` and the working directory to `borg.cwd`.
pub fn create_mock_borg(dir: &Path, cases: &[(&str, &str, &str, i32)]) -> PathBuf {
    let log = dir.join("borg.log");
    let env = dir.join("borg.env");
    let cwd = dir.join("borg.cwd");

    let mut body = format!(
        r#"echo "$*" >> "{log}"
echo "PASS=${{BORG_PASSPHRASE-unset}} UNENC=${{BORG_UNKNOWN_UNENCRYPTED_REPO_ACCESS_IS_OK-unset}} BASE=$BORG_BASE_DIR CACHE=$BORG_CACHE_DIR REPAIR=${{BORG_CHECK_I_KNOW_WHAT_I_AM_DOING-unset}} RSH=$BORG_RSH" >> "{env}"
pwd >> "{cwd}"
case "$1" in
"#,
        log = log.display(),
        env = env.display(),
        cwd = cwd.display(),
    );

    for (subcommand, stdout, stderr, code) in cases {
        body.push_str(&format!(
            "  {sub})\n    cat <<'MOCK_STDOUT'\n{stdout}\nMOCK_STDOUT\n    cat >&2 <<'MOCK_STDERR'\n{stderr}\nMOCK_STDERR\n    exit {code}\n    ;;\n",
            sub = subcommand,
            stdout = stdout,
            stderr = stderr,
            code = code,
        ));
    }
    body.push_str("esac\nexit 0\n");

    write_script(dir, "borg", &body)
}

/// Lines logged by a mock script
pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
