// SPDX-License-Identifier: MIT

use tempfile::tempdir;

use super::*;
use crate::output::OutputFormat;

#[test]
fn list_with_no_projects_still_reports_inbox() {
    let dir = tempdir().unwrap();
    run(
        ProjectArgs { command: ProjectCommand::List { archived: false } },
        dir.path(),
        OutputFormat::Json,
    )
    .unwrap();
}
