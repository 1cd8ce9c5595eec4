//! Copy and move integration tests.

mod common;

use std::time::{Duration, UNIX_EPOCH};

use cascade_core::{EntryName, LocalVfs, OperationConfig, Vfs};
use cascade_ops::{
    DialogAnswer, OperationContext, OperationExecutor, OperationType, Outcome, OverwriteRule,
    TransferEngine, TransferMode,
};
use cascade_scan::prescan;
use common::{CountingVfs, Removal, ScriptedUi, TestFixture};
use tokio_util::sync::CancellationToken;

fn sample_source(fixture: &TestFixture) {
    fixture.write("src/a.txt", 100);
    fixture.write("src/b.txt", 200);
}

#[test]
fn test_move_directory_is_one_rename() {
    let fixture = TestFixture::new();
    sample_source(&fixture);

    let executor = OperationExecutor::new(CountingVfs::new(), OperationConfig::default());
    let mut ui = ScriptedUi::new();

    let complete = executor
        .move_to(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert_eq!(executor.vfs().renames.get(), 1);
    assert_eq!(executor.vfs().writes.get(), 0);
    assert!(executor.vfs().removals.borrow().is_empty());
    assert_eq!(complete.files_processed, 2);
    assert_eq!(complete.bytes_processed, 300);
    assert!(complete.is_success());

    assert!(!fixture.exists("src"));
    assert_eq!(fixture.read("dst/a.txt").len(), 100);
    assert_eq!(fixture.read("dst/b.txt").len(), 200);
    assert_eq!(ui.files, (2, 2));
    assert_eq!(ui.total_bytes, (300, 300));
}

#[test]
fn test_move_rename_leaves_nothing_deferred() {
    let fixture = TestFixture::new();
    sample_source(&fixture);

    let vfs = CountingVfs::new();
    let names = [EntryName::from("src")];
    let listing = prescan(&vfs, fixture.root.path(), &names).unwrap();
    let mut ui = ScriptedUi::new();
    let mut ctx = OperationContext::new(
        &mut ui,
        OperationConfig::default(),
        OperationType::Move,
        CancellationToken::new(),
    );

    let outcome = TransferEngine::new(&vfs, TransferMode::Move)
        .with_listing(Some(&listing))
        .walk(&mut ctx, fixture.root.path(), &names, &[fixture.path("dst")]);

    assert_eq!(outcome, Outcome::Ok);
    assert!(ctx.pending_deletes().is_empty());
    assert_eq!(ctx.progress().files_done, 2);
    assert_eq!(ctx.progress().bytes_done, 300);
}

#[test]
fn test_cross_device_move_copies_and_defers() {
    let fixture = TestFixture::new();
    sample_source(&fixture);

    let executor = OperationExecutor::new(CountingVfs::cross_device(), OperationConfig::default());
    let mut ui = ScriptedUi::new();

    let complete = executor
        .move_to(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    let vfs = executor.vfs();
    assert_eq!(vfs.renames.get(), 0);
    assert_eq!(vfs.writes.get(), 2);
    assert_eq!(
        *vfs.removals.borrow(),
        vec![
            Removal::Unlink(fixture.path("src/a.txt")),
            Removal::Unlink(fixture.path("src/b.txt")),
            Removal::Rmdir(fixture.path("src")),
        ]
    );
    assert_eq!(complete.files_processed, 2);
    assert_eq!(complete.bytes_processed, 300);
    assert!(!fixture.exists("src"));
    assert_eq!(fixture.read("dst/b.txt").len(), 200);
}

#[test]
fn test_rename_crossing_devices_falls_back_to_copy() {
    let fixture = TestFixture::new();
    fixture.write("data.bin", 4096);

    let vfs = CountingVfs {
        rename_crosses_devices: true,
        ..CountingVfs::new()
    };
    let executor = OperationExecutor::new(vfs, OperationConfig::default());
    let mut ui = ScriptedUi::new();

    let complete = executor
        .move_to(&mut ui, &[fixture.path("data.bin")], &fixture.path("moved.bin"))
        .unwrap();

    assert_eq!(executor.vfs().renames.get(), 1);
    assert_eq!(executor.vfs().writes.get(), 1);
    assert_eq!(ui.retry_calls, 0);
    assert!(complete.is_success());
    assert!(!fixture.exists("data.bin"));
    assert_eq!(fixture.read("moved.bin").len(), 4096);
}

#[test]
fn test_copy_preserves_contents_and_times() {
    let fixture = TestFixture::new();
    fixture.write("src/deep/nested/file.bin", 200_000);
    fixture.write_str("src/top.txt", "hello");
    let when = UNIX_EPOCH + Duration::from_secs(1_000_000);
    LocalVfs
        .utime(&fixture.path("src/top.txt"), when, when)
        .unwrap();

    let config = OperationConfig::builder().buffer_size(4096usize).build().unwrap();
    let executor = OperationExecutor::new(LocalVfs, config);
    let mut ui = ScriptedUi::new();

    let complete = executor
        .copy(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert!(complete.is_success());
    assert_eq!(complete.files_processed, 2);
    assert_eq!(
        fixture.read("dst/deep/nested/file.bin"),
        fixture.read("src/deep/nested/file.bin")
    );
    let copied = LocalVfs.stat(&fixture.path("dst/top.txt")).unwrap();
    assert_eq!(copied.modified, when);
    assert!(fixture.exists("src/top.txt"));
}

#[test]
fn test_copy_without_prescan() {
    let fixture = TestFixture::new();
    sample_source(&fixture);
    fixture.write("src/sub/c.txt", 10);

    let config = OperationConfig::builder().prescan(false).build().unwrap();
    let executor = OperationExecutor::new(LocalVfs, config);
    let mut ui = ScriptedUi::new();

    let complete = executor
        .copy(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert_eq!(complete.files_processed, 3);
    assert_eq!(complete.bytes_processed, 310);
    assert_eq!(ui.files.1, 0);
    assert_eq!(fixture.read("dst/sub/c.txt").len(), 10);
}

#[cfg(unix)]
#[test]
fn test_identical_symlink_is_left_alone() {
    let fixture = TestFixture::new();
    fixture.mkdir("src");
    fixture.mkdir("dst");
    fixture.symlink("target.txt", "src/link");
    fixture.symlink("target.txt", "dst/link");
    let before = LocalVfs.lstat(&fixture.path("dst/link")).unwrap();

    let executor = OperationExecutor::new(CountingVfs::new(), OperationConfig::default());
    let mut ui = ScriptedUi::new();

    let complete = executor
        .copy(&mut ui, &[fixture.path("src/link")], &fixture.path("dst"))
        .unwrap();

    assert_eq!(ui.overwrite_calls, 0);
    assert!(executor.vfs().removals.borrow().is_empty());
    assert_eq!(complete.files_processed, 1);
    let after = LocalVfs.lstat(&fixture.path("dst/link")).unwrap();
    assert_eq!(before.ino, after.ino);
}

#[cfg(unix)]
#[test]
fn test_symlink_is_copied_as_link() {
    let fixture = TestFixture::new();
    fixture.write_str("src/target.txt", "data");
    fixture.symlink("target.txt", "src/link");

    let executor = OperationExecutor::local();
    let mut ui = ScriptedUi::new();
    executor
        .copy(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    let link = LocalVfs.readlink(&fixture.path("dst/link")).unwrap();
    assert_eq!(link, std::path::PathBuf::from("target.txt"));
}

#[test]
fn test_progress_is_conserved_when_skipping() {
    let fixture = TestFixture::new();
    fixture.write("src/a.txt", 100);
    fixture.write("src/b.txt", 200);
    fixture.write("src/sub/c.txt", 300);
    fixture.write("dst/b.txt", 7);

    let executor = OperationExecutor::local();
    let mut ui = ScriptedUi::answering_overwrite(&[OverwriteRule::No]);

    let complete = executor
        .copy(
            &mut ui,
            &[
                fixture.path("src/a.txt"),
                fixture.path("src/b.txt"),
                fixture.path("src/sub"),
            ],
            &fixture.path("dst"),
        )
        .unwrap();

    assert_eq!(complete.files_processed, 3);
    assert_eq!(complete.bytes_processed, 600);
    assert_eq!(complete.skipped, 1);
    assert_eq!(ui.files, (3, 3));
    assert_eq!(fixture.read("dst/b.txt").len(), 7);
    assert_eq!(fixture.read("dst/sub/c.txt").len(), 300);
}

#[test]
fn test_overwrite_all_is_sticky() {
    let fixture = TestFixture::new();
    for name in ["a", "b", "c"] {
        fixture.write_str(&format!("src/{name}.txt"), "new");
        fixture.write_str(&format!("dst/src/{name}.txt"), "old!");
    }

    let executor = OperationExecutor::local();
    let mut ui = ScriptedUi::answering_overwrite(&[OverwriteRule::All]);

    let complete = executor
        .copy(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert_eq!(ui.overwrite_calls, 1);
    assert_eq!(complete.skipped, 0);
    for name in ["a", "b", "c"] {
        assert_eq!(fixture.read(&format!("dst/src/{name}.txt")), b"new");
    }
}

#[test]
fn test_overwrite_none_is_sticky() {
    let fixture = TestFixture::new();
    for name in ["a", "b", "c"] {
        fixture.write_str(&format!("src/{name}.txt"), "new");
        fixture.write_str(&format!("dst/src/{name}.txt"), "old!");
    }

    let executor = OperationExecutor::local();
    let mut ui = ScriptedUi::answering_overwrite(&[OverwriteRule::None]);

    let complete = executor
        .copy(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert_eq!(ui.overwrite_calls, 1);
    assert_eq!(complete.skipped, 3);
    for name in ["a", "b", "c"] {
        assert_eq!(fixture.read(&format!("dst/src/{name}.txt")), b"old!");
    }
}

#[test]
fn test_update_rule_compares_every_pair() {
    let fixture = TestFixture::new();
    fixture.write_str("src/old.txt", "source");
    fixture.write_str("src/new.txt", "source");
    fixture.write_str("dst/old.txt", "dest");
    fixture.write_str("dst/new.txt", "dest");

    let early = UNIX_EPOCH + Duration::from_secs(1_000);
    let late = UNIX_EPOCH + Duration::from_secs(2_000);
    LocalVfs.utime(&fixture.path("src/old.txt"), late, late).unwrap();
    LocalVfs.utime(&fixture.path("dst/old.txt"), early, early).unwrap();
    LocalVfs.utime(&fixture.path("src/new.txt"), early, early).unwrap();
    LocalVfs.utime(&fixture.path("dst/new.txt"), late, late).unwrap();

    let executor = OperationExecutor::local();
    let mut ui = ScriptedUi::answering_overwrite(&[OverwriteRule::Update]);

    executor
        .copy(
            &mut ui,
            &[fixture.path("src/new.txt"), fixture.path("src/old.txt")],
            &fixture.path("dst"),
        )
        .unwrap();

    assert_eq!(ui.overwrite_calls, 1);
    assert_eq!(fixture.read("dst/old.txt"), b"source");
    assert_eq!(fixture.read("dst/new.txt"), b"dest");
}

#[test]
fn test_preset_rule_skips_questions() {
    let fixture = TestFixture::new();
    fixture.write_str("src/a.txt", "new");
    fixture.write_str("dst/a.txt", "old");

    let executor = OperationExecutor::local().with_resolution(OverwriteRule::Yes);
    let mut ui = ScriptedUi::new();

    executor
        .copy(&mut ui, &[fixture.path("src/a.txt")], &fixture.path("dst"))
        .unwrap();

    assert_eq!(ui.overwrite_calls, 0);
    assert_eq!(fixture.read("dst/a.txt"), b"new");
}

#[test]
fn test_append_extends_destination() {
    let fixture = TestFixture::new();
    fixture.write_str("src/log.txt", "world");
    fixture.write_str("dst/log.txt", "hello ");

    let executor = OperationExecutor::local();
    let mut ui = ScriptedUi::answering_overwrite(&[OverwriteRule::Append]);

    executor
        .copy(&mut ui, &[fixture.path("src/log.txt")], &fixture.path("dst"))
        .unwrap();

    assert_eq!(fixture.read("dst/log.txt"), b"hello world");
}

#[test]
fn test_abort_stops_the_walk() {
    let fixture = TestFixture::new();
    for name in ["a", "b", "c"] {
        fixture.write(&format!("src/{name}.txt"), 10);
    }

    let executor = OperationExecutor::new(CountingVfs::cross_device(), OperationConfig::default());
    let mut ui = ScriptedUi {
        abort_after_files: Some(1),
        ..ScriptedUi::new()
    };

    let complete = executor
        .move_to(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert!(complete.aborted);
    assert_eq!(complete.files_processed, 1);
    assert_eq!(executor.vfs().writes.get(), 1);
    assert!(executor.vfs().removals.borrow().is_empty());
    assert!(fixture.exists("dst/a.txt"));
    assert!(!fixture.exists("dst/b.txt"));
    assert!(fixture.exists("src/a.txt"));
}

#[test]
fn test_cancel_in_dialog_aborts() {
    let fixture = TestFixture::new();
    fixture.write("src/a.txt", 10);
    fixture.write("src/b.txt", 10);
    fixture.write_str("dst/src", "a file in the way");

    let executor = OperationExecutor::local();
    let mut ui = ScriptedUi::answering_retry(&[DialogAnswer::Retry, DialogAnswer::Cancel]);

    let complete = executor
        .copy(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert!(complete.aborted);
    assert_eq!(ui.retry_calls, 2);
    assert_eq!(complete.errors.len(), 1);
}

#[test]
fn test_copy_into_itself_is_refused() {
    let fixture = TestFixture::new();
    fixture.write("src/a.txt", 10);
    fixture.mkdir("src/sub");

    let executor = OperationExecutor::local();
    let mut ui = ScriptedUi::new();

    let complete = executor
        .copy(&mut ui, &[fixture.path("src")], &fixture.path("src/sub"))
        .unwrap();

    assert_eq!(ui.retry_calls, 1);
    assert_eq!(complete.skipped, 1);
    assert!(!fixture.exists("src/sub/src"));
}

#[test]
fn test_skipped_partial_file_keeps_its_source() {
    let fixture = TestFixture::new();
    fixture.write("src/big.bin", 100);
    fixture.write("src/small.txt", 5);

    let config = OperationConfig::builder().buffer_size(16usize).build().unwrap();
    let executor = OperationExecutor::new(CountingVfs::cross_device(), config);
    let mut ui = ScriptedUi {
        skip_mid_file: true,
        keep_incomplete: false,
        ..ScriptedUi::new()
    };

    let complete = executor
        .move_to(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert_eq!(ui.incomplete_calls, 1);
    assert_eq!(complete.skipped, 1);
    assert_eq!(complete.files_processed, 2);
    assert_eq!(complete.bytes_processed, 105);
    assert!(!fixture.exists("dst/big.bin"));
    assert!(fixture.exists("src/big.bin"));
    assert!(fixture.exists("dst/small.txt"));
    assert!(!fixture.exists("src/small.txt"));
    assert_eq!(
        *executor.vfs().removals.borrow(),
        vec![
            Removal::Unlink(fixture.path("dst/big.bin")),
            Removal::Unlink(fixture.path("src/small.txt")),
        ]
    );
}

#[test]
fn test_kept_partial_file_stays() {
    let fixture = TestFixture::new();
    fixture.write("big.bin", 100);

    let config = OperationConfig::builder().buffer_size(16usize).build().unwrap();
    let executor = OperationExecutor::new(LocalVfs, config);
    let mut ui = ScriptedUi {
        skip_mid_file: true,
        keep_incomplete: true,
        ..ScriptedUi::new()
    };

    executor
        .copy(&mut ui, &[fixture.path("big.bin")], &fixture.path("copy.bin"))
        .unwrap();

    assert_eq!(fixture.read("copy.bin").len(), 16);
}

#[test]
fn test_multiple_sources_need_a_directory() {
    let fixture = TestFixture::new();
    fixture.write("a.txt", 1);
    fixture.write("b.txt", 1);

    let executor = OperationExecutor::local();
    let mut ui = ScriptedUi::new();

    let err = executor
        .copy(
            &mut ui,
            &[fixture.path("a.txt"), fixture.path("b.txt")],
            &fixture.path("nowhere"),
        )
        .unwrap_err();
    assert!(matches!(err, cascade_ops::EngineError::DestinationNotDirectory { .. }));

    let err = executor
        .copy(&mut ui, &[fixture.path("a.txt")], &fixture.path("missing/a.txt"))
        .unwrap_err();
    assert!(matches!(err, cascade_ops::EngineError::DestinationMissing { .. }));
}

#[cfg(unix)]
#[test]
fn test_copy_recreates_fifo() {
    let fixture = TestFixture::new();
    fixture.write("src/a.txt", 10);
    fixture.fifo("src/pipe");

    let executor = OperationExecutor::new(CountingVfs::new(), OperationConfig::default());
    let mut ui = ScriptedUi::new();

    let complete = executor
        .copy(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert!(complete.is_success());
    assert_eq!(complete.files_processed, 2);
    assert_eq!(executor.vfs().mknods.get(), 1);
    // one read for a.txt, the FIFO is never opened
    assert_eq!(executor.vfs().reads.get(), 1);
    let copied = LocalVfs.lstat(&fixture.path("dst/pipe")).unwrap();
    assert_eq!(copied.kind, cascade_core::EntryKind::Other);
    assert_eq!(copied.permissions(), 0o644);
    assert!(fixture.exists("src/pipe"));
}

#[cfg(unix)]
#[test]
fn test_cross_device_move_of_fifo() {
    let fixture = TestFixture::new();
    fixture.write("src/a.txt", 10);
    fixture.fifo("src/pipe");

    let executor = OperationExecutor::new(CountingVfs::cross_device(), OperationConfig::default());
    let mut ui = ScriptedUi::new();

    let complete = executor
        .move_to(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert!(complete.is_success());
    assert_eq!(executor.vfs().mknods.get(), 1);
    assert_eq!(
        *executor.vfs().removals.borrow(),
        vec![
            Removal::Unlink(fixture.path("src/a.txt")),
            Removal::Unlink(fixture.path("src/pipe")),
            Removal::Rmdir(fixture.path("src")),
        ]
    );
    assert!(!fixture.exists("src"));
    assert_eq!(
        LocalVfs.lstat(&fixture.path("dst/pipe")).unwrap().kind,
        cascade_core::EntryKind::Other
    );
}

#[test]
fn test_cross_device_move_removes_children_before_parents() {
    let fixture = TestFixture::new();
    fixture.write("src/a.txt", 1);
    fixture.write("src/sub/b.txt", 2);
    fixture.write("src/sub/deep/c.txt", 3);

    let executor = OperationExecutor::new(CountingVfs::cross_device(), OperationConfig::default());
    let mut ui = ScriptedUi::new();

    let complete = executor
        .move_to(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert!(complete.is_success());
    let removals = executor.vfs().removals.borrow();
    assert_eq!(
        *removals,
        vec![
            Removal::Unlink(fixture.path("src/a.txt")),
            Removal::Unlink(fixture.path("src/sub/b.txt")),
            Removal::Unlink(fixture.path("src/sub/deep/c.txt")),
            Removal::Rmdir(fixture.path("src/sub/deep")),
            Removal::Rmdir(fixture.path("src/sub")),
            Removal::Rmdir(fixture.path("src")),
        ]
    );

    for (index, removal) in removals.iter().enumerate() {
        let Removal::Rmdir(dir) = removal else {
            continue;
        };
        for later in &removals[index + 1..] {
            let (Removal::Unlink(path) | Removal::Rmdir(path)) = later;
            assert!(!path.starts_with(dir), "{} removed after {}", path.display(), dir.display());
        }
    }

    assert!(!fixture.exists("src"));
    assert_eq!(fixture.read("dst/sub/deep/c.txt").len(), 3);
}

#[cfg(unix)]
#[test]
fn test_move_onto_identical_symlink_clears_source() {
    let fixture = TestFixture::new();
    fixture.write("src/a.txt", 5);
    fixture.symlink("a.txt", "src/link");
    fixture.mkdir("dst/src");
    fixture.symlink("a.txt", "dst/src/link");
    let before = LocalVfs.lstat(&fixture.path("dst/src/link")).unwrap();

    let executor = OperationExecutor::new(CountingVfs::cross_device(), OperationConfig::default());
    let mut ui = ScriptedUi::new();

    let complete = executor
        .move_to(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert!(complete.is_success());
    assert_eq!(ui.overwrite_calls, 0);
    assert!(!fixture.exists("src"));
    let after = LocalVfs.lstat(&fixture.path("dst/src/link")).unwrap();
    assert_eq!(before.ino, after.ino);
    assert_eq!(fixture.read("dst/src/a.txt").len(), 5);
}

#[cfg(unix)]
fn non_utf8_name() -> &'static std::ffi::OsStr {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::OsStr::from_bytes(b"bad\xff.txt")
}

#[cfg(unix)]
#[test]
fn test_copy_non_utf8_names() {
    for prescan in [true, false] {
        let fixture = TestFixture::new();
        fixture.mkdir("src");
        std::fs::write(fixture.path("src").join(non_utf8_name()), "payload").unwrap();

        let config = OperationConfig {
            prescan,
            ..OperationConfig::default()
        };
        let executor = OperationExecutor::new(LocalVfs, config);
        let mut ui = ScriptedUi::new();

        let complete = executor
            .copy(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
            .unwrap();

        assert!(complete.is_success(), "prescan={prescan}: {:?}", complete.errors);
        assert_eq!(complete.files_processed, 1);
        assert_eq!(
            std::fs::read(fixture.path("dst").join(non_utf8_name())).unwrap(),
            b"payload"
        );
    }
}

#[cfg(unix)]
#[test]
fn test_cross_device_move_non_utf8_names() {
    let fixture = TestFixture::new();
    fixture.mkdir("src");
    std::fs::write(fixture.path("src").join(non_utf8_name()), "x").unwrap();

    let executor = OperationExecutor::new(CountingVfs::cross_device(), OperationConfig::default());
    let mut ui = ScriptedUi::new();

    let complete = executor
        .move_to(&mut ui, &[fixture.path("src")], &fixture.path("dst"))
        .unwrap();

    assert!(complete.is_success());
    assert!(!fixture.exists("src"));
    assert!(fixture.path("dst").join(non_utf8_name()).exists());
}
