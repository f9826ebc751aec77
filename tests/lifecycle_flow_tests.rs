use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

const HEADER: &str = "op, id, actor, at, date, start, end, family, educator, amount, pin";

fn write_commands(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}

fn bookline(file: &NamedTempFile) -> Command {
    let mut cmd = Command::new(cargo_bin!("bookline"));
    cmd.arg(file.path());
    cmd
}

#[test]
fn test_late_family_cancellation_captures_half() {
    // 200.00 authorized; family cancels 25h before the 14:00 start.
    let file = write_commands(&[
        "request, 1, , 2026-03-01T09:00, 2026-03-10, 14:00, 15:00, 10, 20, 20000, 4821",
        "accept, 1, , 2026-03-01T10:00, , , , , , ,",
        "cancel, 1, family, 2026-03-09T13:00, , , , , , ,",
    ]);
    bookline(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1,cancelled,partially_captured,10000,",
        ));
}

#[test]
fn test_timely_family_cancellation_leaves_authorization() {
    let file = write_commands(&[
        "request, 1, , 2026-03-01T09:00, 2026-03-10, 14:00, 15:00, 10, 20, 20000, 4821",
        "accept, 1, , 2026-03-01T10:00, , , , , , ,",
        "cancel, 1, family, 2026-03-05T13:00, , , , , , ,",
    ]);
    bookline(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("1,cancelled,authorized,,"));
}

#[test]
fn test_educator_cancellation_voids_even_last_minute() {
    let file = write_commands(&[
        "request, 1, , 2026-03-01T09:00, 2026-03-10, 14:00, 15:00, 10, 20, 20000, 4821",
        "accept, 1, , 2026-03-01T10:00, , , , , , ,",
        "cancel, 1, educator, 2026-03-10T13:00, , , , , , ,",
    ]);
    bookline(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("1,cancelled,cancelled,,"));
}

#[test]
fn test_second_cancellation_is_rejected_without_a_second_charge() {
    let file = write_commands(&[
        "request, 1, , 2026-03-01T09:00, 2026-03-10, 14:00, 15:00, 10, 20, 20000, 4821",
        "accept, 1, , 2026-03-01T10:00, , , , , , ,",
        "cancel, 1, family, 2026-03-09T13:00, , , , , , ,",
        "cancel, 1, family, 2026-03-09T14:00, , , , , , ,",
    ]);
    bookline(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1,cancelled,partially_captured,10000,",
        ))
        .stderr(predicate::str::contains("already_processed"));
}

#[test]
fn test_cancellation_from_pending_carries_no_fee() {
    let file = write_commands(&[
        "request, 1, , 2026-03-09T13:00, 2026-03-10, 14:00, 15:00, 10, 20, 20000, 4821",
        "cancel, 1, family, 2026-03-09T13:30, , , , , , ,",
    ]);
    bookline(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("1,cancelled,authorized,,"));
}

#[test]
fn test_family_no_show_report_after_session_end() {
    let file = write_commands(&[
        "request, 1, , 2026-03-01T09:00, 2026-03-10, 14:00, 15:00, 10, 20, 20000, 4821",
        "accept, 1, , 2026-03-01T10:00, , , , , , ,",
        "report_no_show, 1, family, 2026-03-10T16:01, , , , , , ,",
    ]);
    bookline(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1,no_show,partially_captured,10000,",
        ));
}

#[test]
fn test_no_show_report_before_window_is_rejected() {
    let file = write_commands(&[
        "request, 1, , 2026-03-01T09:00, 2026-03-10, 14:00, 15:00, 10, 20, 20000, 4821",
        "accept, 1, , 2026-03-01T10:00, , , , , , ,",
        "report_no_show, 1, educator, 2026-03-10T14:30, , , , , , ,",
    ]);
    bookline(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("1,accepted,authorized,,"))
        .stderr(predicate::str::contains("no_show_too_early"));
}

#[test]
fn test_independent_appointments_are_reported_separately() {
    let file = write_commands(&[
        "request, 1, , 2026-03-01T09:00, 2026-03-10, 14:00, 15:00, 10, 20, 20000, 4821",
        "request, 2, , 2026-03-01T09:05, 2026-03-11, 09:00, 10:00, 11, 20, 15000, 7777",
        "accept, 1, , 2026-03-01T10:00, , , , , , ,",
        "cancel, 1, family, 2026-03-09T13:00, , , , , , ,",
    ]);
    bookline(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "1,cancelled,partially_captured,10000,",
        ))
        .stdout(predicate::str::contains("2,pending,authorized,,"));
}
