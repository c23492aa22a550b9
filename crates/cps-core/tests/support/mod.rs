//! Shared fixtures for cps-core integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Monkey/Looker export: RFC 2822 times, flag bitmask, queue time in ms.
pub const MONKEY_CDR: &str = "\
DateCreated,Flags,QueueTime,To
\"Sat, 12 Sep 2020 10:30:05 -0700\",2,0,+15551230001
\"Sat, 12 Sep 2020 10:30:05 -0700\",3,2500,+15551230002
\"Sat, 12 Sep 2020 10:30:05 -0700\",1,0,+15551230003
\"Sat, 12 Sep 2020 10:30:07 -0700\",2,1000,+15551230004
";

/// Console export: wall time, zone abbreviation, then date.
pub const CONSOLE_CDR: &str = "\
Date,Direction,To
14:52:06 EDT 2020-09-10,Outgoing API,+1555
14:52:06 EDT 2020-09-10,Outgoing API,+1556
14:52:06 EDT 2020-09-10,Incoming,+1557
14:52:09 EDT 2020-09-10,outbound-api,+1558
";

/// Headerless ISO export with the start time in column 2.
pub const POSITIONAL_CDR: &str = "\
a1,2020-09-10 08:00:00,x
a2,2020-09-10 08:00:00,x
a3,2020-09-10 08:00:01,x
";

/// Canonical series with a burst of 5 and an out-of-order line.
pub const CANONICAL: &str = "\
2024-01-01 00:00:02,5
2024-01-01 00:00:00,1
2024-01-01 00:00:04,1
";

/// Scratch directory holding inputs and outputs for one test.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, body).expect("write fixture");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("read output")
    }

    /// `cps-core` isolated from any settings file on the host.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("cps-core").expect("cps-core binary should exist");
        cmd.env_remove("CPS_CONFIG")
            .env_remove("RUST_LOG")
            .env("CPS_CONFIG_DIR", self.dir.path().join("no-config"))
            .env("XDG_CONFIG_HOME", self.dir.path().join("xdg"))
            .env("CPS_LOG", "warn");
        cmd
    }
}

/// Canonical lines as a sorted set, for order-insensitive comparison.
pub fn canonical_lines(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    lines.sort();
    lines
}

pub fn display(path: &Path) -> String {
    path.display().to_string()
}
