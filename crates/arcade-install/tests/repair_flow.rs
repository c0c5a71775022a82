//! Repair of healthy, broken and non-repairable installs.

mod common;

use std::fs;

use arcade_core::{InstallError, PackageId};
use arcade_download::transport::testing::MirrorScript;

use common::{Fixture, STELLAR_QUEST, primary, secondary, stellar_quest};

async fn installed_fixture() -> Fixture {
    let fx = Fixture::new(vec![stellar_quest("2.2.3")]).await;
    fx.serve_game(&primary("2.2.3"), "2.2.3");
    fx.launcher
        .install(&PackageId::from(STELLAR_QUEST))
        .unwrap()
        .wait()
        .await
        .unwrap();
    fx.transport.clear_attempts();
    fx
}

#[tokio::test]
async fn repair_of_valid_install_is_a_noop() {
    let fx = installed_fixture().await;

    let report = fx
        .launcher
        .repair(&PackageId::from(STELLAR_QUEST))
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(report.success);
    assert!(report.repaired_files.is_empty());
    assert!(report.errors.is_empty());
    assert!(fx.transport.attempts().is_empty());
}

#[tokio::test]
async fn missing_executable_triggers_reinstall() {
    let fx = installed_fixture().await;
    let dir = fx.paths.package_dir(STELLAR_QUEST);
    fs::remove_file(dir.join("StellarQuest.exe")).unwrap();

    let report = fx
        .launcher
        .repair(&PackageId::from(STELLAR_QUEST))
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(report.success);
    assert!(
        report
            .repaired_files
            .iter()
            .any(|f| f.ends_with("StellarQuest.exe"))
    );
    assert!(dir.join("StellarQuest.exe").is_file());
    assert_eq!(fx.transport.attempts(), [primary("2.2.3").url]);
    assert!(fx.staging_is_empty());
}

#[tokio::test]
async fn failed_reinstall_restores_broken_install() {
    let fx = installed_fixture().await;
    let dir = fx.paths.package_dir(STELLAR_QUEST);
    fs::remove_file(dir.join("StellarQuest.exe")).unwrap();
    fx.transport.set(&primary("2.2.3").url, MirrorScript::Status(503));
    fx.transport.set(&secondary("2.2.3").url, MirrorScript::Status(503));

    let report = fx
        .launcher
        .repair(&PackageId::from(STELLAR_QUEST))
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.errors.len(), 2);
    assert!(dir.join("data/version.txt").is_file());
    assert_eq!(
        fx.launcher.installed().await.unwrap()[0].installed_version,
        "2.2.3"
    );
    assert!(fx.staging_is_empty());
}

#[tokio::test]
async fn registry_failure_after_reinstall_restores_quarantine() {
    let fx = installed_fixture().await;
    let dir = fx.paths.package_dir(STELLAR_QUEST);
    fs::remove_file(dir.join("StellarQuest.exe")).unwrap();

    fx.registry.fail_writes(true);
    let err = fx
        .launcher
        .repair(&PackageId::from(STELLAR_QUEST))
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    fx.registry.fail_writes(false);

    assert!(matches!(err, InstallError::Registry { .. }));
    assert!(dir.join("data/version.txt").is_file());
    assert!(!dir.join("StellarQuest.exe").exists());
    assert!(fx.staging_is_empty());
}

#[tokio::test]
async fn repair_requires_flag_and_install() {
    let mut entry = stellar_quest("2.2.3");
    entry.repair_enabled = false;
    let fx = Fixture::new(vec![entry, {
        let mut other = stellar_quest("1.0.0");
        other.id = PackageId::from("pixel_pilot");
        other
    }])
    .await;

    let err = fx
        .launcher
        .repair(&PackageId::from(STELLAR_QUEST))
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, InstallError::RepairDisabled { .. }));

    let err = fx
        .launcher
        .repair(&PackageId::from("pixel_pilot"))
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, InstallError::NotInstalled { .. }));
}
